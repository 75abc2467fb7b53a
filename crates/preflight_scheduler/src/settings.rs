//! Per-plugin overrides from configuration.
//!
//! ```yaml
//! plugins:
//!   ruff: false                 # disable
//!   headers: { priority: 5 }    # re-prioritize
//!   sanitize: { enabled: true, priority: 0 }
//! plugin_order: [sanitize, headers]   # position becomes priority
//! ```

use indexmap::IndexMap;
use preflight_plugin::ConfigMap;
use serde::Deserialize;
use serde_json::Value;

/// Override for a single plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PluginSetting {
    /// `id: true | false`
    Enabled(bool),
    /// `id: { enabled, priority }`, both optional.
    Detailed {
        /// Activity override.
        #[serde(default)]
        enabled: Option<bool>,
        /// Priority override.
        #[serde(default)]
        priority: Option<i32>,
    },
}

/// The `plugins` and `plugin_order` sections of a configuration map.
///
/// Applied with [`Registry::apply_settings`](crate::Registry::apply_settings).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginSettings {
    /// Overrides keyed by plugin id, in configuration order.
    pub plugins: IndexMap<String, PluginSetting>,
    /// Explicit order; the position of an id becomes its priority.
    pub plugin_order: Vec<String>,
}

impl PluginSettings {
    /// Reads the settings from a loaded configuration map.
    ///
    /// Malformed entries are skipped with a warning; the rest still apply.
    #[must_use]
    pub fn from_config(config: &ConfigMap) -> Self {
        let mut settings = Self::default();

        if let Some(section) = config.get("plugins") {
            match section {
                Value::Object(entries) => {
                    for (id, raw) in entries {
                        match PluginSetting::deserialize(raw) {
                            Ok(setting) => {
                                settings.plugins.insert(id.clone(), setting);
                            }
                            Err(error) => {
                                tracing::warn!(plugin = %id, %error, "ignoring malformed plugin setting");
                            }
                        }
                    }
                }
                Value::Null => {}
                other => tracing::warn!(value = %other, "`plugins` must be a map; ignoring"),
            }
        }

        if let Some(Value::Array(order)) = config.get("plugin_order") {
            settings.plugin_order = order
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect();
        }

        settings
    }

    /// Returns `true` if there is nothing to apply.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty() && self.plugin_order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> PluginSettings {
        PluginSettings::from_config(value.as_object().unwrap())
    }

    #[test]
    fn reads_both_setting_shapes() {
        let settings = parse(json!({
            "plugins": {
                "a": true,
                "b": { "priority": 4 },
                "c": { "enabled": false }
            }
        }));
        assert_eq!(settings.plugins["a"], PluginSetting::Enabled(true));
        assert_eq!(
            settings.plugins["b"],
            PluginSetting::Detailed { enabled: None, priority: Some(4) }
        );
        assert_eq!(
            settings.plugins["c"],
            PluginSetting::Detailed { enabled: Some(false), priority: None }
        );
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let settings = parse(json!({
            "plugins": { "a": "yes", "b": { "priority": "high" }, "c": false }
        }));
        assert_eq!(settings.plugins.len(), 1);
        assert!(settings.plugins.contains_key("c"));
    }

    #[test]
    fn plugin_order_keeps_strings_only() {
        let settings = parse(json!({ "plugin_order": ["x", 3, " ", " y "] }));
        assert_eq!(settings.plugin_order, ["x", "y"]);
    }

    #[test]
    fn missing_sections_are_empty() {
        assert!(parse(json!({ "options": {} })).is_empty());
        assert!(parse(json!({ "plugins": null })).is_empty());
    }
}
