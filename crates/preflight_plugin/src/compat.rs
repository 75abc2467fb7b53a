//! Version gating against the running host.
//!
//! Each plugin declares the minimum version of five host components in its
//! [`Requirements`](crate::Requirements). Before registration, a loader can
//! drop plugins whose requirements the host does not meet.
//!
//! # Example
//!
//! ```
//! use preflight_plugin::PluginMeta;
//! use preflight_plugin::compat::{HostComponent, HostVersions, check_compatibility};
//!
//! let meta = PluginMeta::new("spdx", "SPDX headers", "1.0.0")
//!     .unwrap()
//!     .with_requirement(HostComponent::Core, "2.1");
//!
//! let host = HostVersions::default().with(HostComponent::Core, "2.0.5");
//! let report = check_compatibility(&meta, &host);
//!
//! assert!(!report.compatible);
//! assert_eq!(report.missing_requirements, ["Core >= 2.1 (current: 2.0.5)"]);
//! ```

use core::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::meta::{DEFAULT_REQUIREMENT, PluginMeta};
use crate::plugin::Plugin;

// ─────────────────────────────────────────────────────────────────────────────
// Version
// ─────────────────────────────────────────────────────────────────────────────

/// A `major.minor.patch` triple, ordered numerically.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    /// Major component.
    pub major: u64,
    /// Minor component.
    pub minor: u64,
    /// Patch component.
    pub patch: u64,
}

impl Version {
    /// Creates a version.
    #[must_use]
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parses a version string, never failing.
    ///
    /// A trailing `+` ("or higher") is ignored, as are build metadata
    /// (`+build`) and pre-release suffixes (`-beta`). Missing components are
    /// zero. Anything unparsable yields `0.0.0`.
    ///
    /// ```
    /// use preflight_plugin::compat::Version;
    ///
    /// assert_eq!(Version::parse_lenient("1.2.3-beta"), Version::new(1, 2, 3));
    /// assert_eq!(Version::parse_lenient("2+"), Version::new(2, 0, 0));
    /// assert_eq!(Version::parse_lenient("v1"), Version::new(0, 0, 0));
    /// ```
    #[must_use]
    pub fn parse_lenient(raw: &str) -> Self {
        let mut s = raw.trim();
        if let Some(stripped) = s.strip_suffix('+') {
            s = stripped.trim();
        }
        let core = s.split('+').next().unwrap_or_default();
        let core = core.split('-').next().unwrap_or_default();

        let mut parts = [0u64; 3];
        for (slot, piece) in parts.iter_mut().zip(core.split('.')) {
            match piece.parse() {
                Ok(n) => *slot = n,
                Err(_) => return Self::default(),
            }
        }
        Self::new(parts[0], parts[1], parts[2])
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Host components
// ─────────────────────────────────────────────────────────────────────────────

/// A versioned component of the host a plugin can depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostComponent {
    /// The orchestrator itself.
    Orchestrator,
    /// The host application core.
    Core,
    /// The plugin SDK.
    Sdk,
    /// The pre-compile context API.
    PluginContext,
    /// The general application context API.
    GeneralContext,
}

impl HostComponent {
    /// All components, in reporting order.
    pub const ALL: [HostComponent; 5] = [
        HostComponent::Orchestrator,
        HostComponent::Core,
        HostComponent::Sdk,
        HostComponent::PluginContext,
        HostComponent::GeneralContext,
    ];

    /// Returns the configuration key of the component.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            HostComponent::Orchestrator => "orchestrator",
            HostComponent::Core => "core",
            HostComponent::Sdk => "sdk",
            HostComponent::PluginContext => "plugin_context",
            HostComponent::GeneralContext => "general_context",
        }
    }

    /// Returns the human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            HostComponent::Orchestrator => "Orchestrator",
            HostComponent::Core => "Core",
            HostComponent::Sdk => "Plugin SDK",
            HostComponent::PluginContext => "PluginContext",
            HostComponent::GeneralContext => "GeneralContext",
        }
    }
}

/// Versions of the running host components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostVersions {
    /// Orchestrator version.
    pub orchestrator: String,
    /// Core version.
    pub core: String,
    /// Plugin SDK version.
    pub sdk: String,
    /// Plugin context version.
    pub plugin_context: String,
    /// General context version.
    pub general_context: String,
}

impl Default for HostVersions {
    fn default() -> Self {
        Self {
            orchestrator: DEFAULT_REQUIREMENT.to_string(),
            core: DEFAULT_REQUIREMENT.to_string(),
            sdk: DEFAULT_REQUIREMENT.to_string(),
            plugin_context: DEFAULT_REQUIREMENT.to_string(),
            general_context: DEFAULT_REQUIREMENT.to_string(),
        }
    }
}

impl HostVersions {
    /// Returns the version of one component.
    #[must_use]
    pub fn get(&self, component: HostComponent) -> &str {
        match component {
            HostComponent::Orchestrator => &self.orchestrator,
            HostComponent::Core => &self.core,
            HostComponent::Sdk => &self.sdk,
            HostComponent::PluginContext => &self.plugin_context,
            HostComponent::GeneralContext => &self.general_context,
        }
    }

    /// Sets the version of one component.
    #[must_use]
    pub fn with(mut self, component: HostComponent, version: impl Into<String>) -> Self {
        let slot = match component {
            HostComponent::Orchestrator => &mut self.orchestrator,
            HostComponent::Core => &mut self.core,
            HostComponent::Sdk => &mut self.sdk,
            HostComponent::PluginContext => &mut self.plugin_context,
            HostComponent::GeneralContext => &mut self.general_context,
        };
        *slot = version.into();
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Checks
// ─────────────────────────────────────────────────────────────────────────────

/// Outcome of checking one plugin against the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompatibilityReport {
    /// Plugin id.
    pub plugin_id: String,
    /// Plugin display name.
    pub plugin_name: String,
    /// Whether every requirement is met.
    pub compatible: bool,
    /// One line per unmet requirement.
    pub missing_requirements: Vec<String>,
    /// Summary message, empty when compatible.
    pub error_message: String,
}

/// Checks a plugin's requirements against the host versions.
#[must_use]
pub fn check_compatibility(meta: &PluginMeta, host: &HostVersions) -> CompatibilityReport {
    let requirements = meta.requirements();
    let missing: Vec<String> = HostComponent::ALL
        .into_iter()
        .filter(|&c| {
            Version::parse_lenient(host.get(c)) < Version::parse_lenient(requirements.get(c))
        })
        .map(|c| {
            format!(
                "{} >= {} (current: {})",
                c.label(),
                requirements.get(c),
                host.get(c)
            )
        })
        .collect();

    let compatible = missing.is_empty();
    let error_message = if compatible {
        String::new()
    } else {
        format!(
            "Plugin '{}' ({}) is incompatible. Missing: {}",
            meta.name(),
            meta.id(),
            missing.join(", ")
        )
    };

    CompatibilityReport {
        plugin_id: meta.id().to_string(),
        plugin_name: meta.name().to_string(),
        compatible,
        missing_requirements: missing,
        error_message,
    }
}

/// Splits plugins into those the host can run and reports for the rest.
///
/// In `strict` mode a plugin that leaves every requirement at its default is
/// rejected as well.
pub fn partition_compatible<I>(
    plugins: I,
    host: &HostVersions,
    strict: bool,
) -> (Vec<Arc<dyn Plugin>>, Vec<CompatibilityReport>)
where
    I: IntoIterator<Item = Arc<dyn Plugin>>,
{
    let mut accepted = Vec::new();
    let mut rejected = Vec::new();

    for plugin in plugins {
        let meta = plugin.meta();
        if strict && meta.requirements().is_default() {
            rejected.push(CompatibilityReport {
                plugin_id: meta.id().to_string(),
                plugin_name: meta.name().to_string(),
                compatible: false,
                missing_requirements: vec!["No explicit version requirements specified".into()],
                error_message: format!(
                    "Plugin '{}' ({}) does not declare version requirements",
                    meta.name(),
                    meta.id()
                ),
            });
            continue;
        }

        let report = check_compatibility(meta, host);
        if report.compatible {
            accepted.push(plugin);
        } else {
            tracing::warn!(plugin = %report.plugin_id, "{}", report.error_message);
            rejected.push(report);
        }
    }

    (accepted, rejected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::PreCompileContext;
    use crate::error::HookError;

    struct Noop(PluginMeta);

    impl Plugin for Noop {
        fn meta(&self) -> &PluginMeta {
            &self.0
        }

        fn on_pre_compile(&self, _ctx: &PreCompileContext) -> Result<(), HookError> {
            Ok(())
        }
    }

    fn plugin(meta: PluginMeta) -> Arc<dyn Plugin> {
        Arc::new(Noop(meta))
    }

    #[test]
    fn parse_full_and_partial() {
        assert_eq!(Version::parse_lenient("1.2.3"), Version::new(1, 2, 3));
        assert_eq!(Version::parse_lenient(" 4.5 "), Version::new(4, 5, 0));
        assert_eq!(Version::parse_lenient("7"), Version::new(7, 0, 0));
    }

    #[test]
    fn parse_strips_suffixes() {
        assert_eq!(Version::parse_lenient("1.0.0+"), Version::new(1, 0, 0));
        assert_eq!(Version::parse_lenient("1.4.0+build.9"), Version::new(1, 4, 0));
        assert_eq!(Version::parse_lenient("2.0.0-rc.1"), Version::new(2, 0, 0));
    }

    #[test]
    fn parse_garbage_is_zero() {
        assert_eq!(Version::parse_lenient(""), Version::default());
        assert_eq!(Version::parse_lenient("one.two"), Version::default());
        assert_eq!(Version::parse_lenient("1.x.3"), Version::default());
    }

    #[test]
    fn extra_components_are_ignored() {
        assert_eq!(Version::parse_lenient("1.2.3.4"), Version::new(1, 2, 3));
    }

    #[test]
    fn versions_compare_numerically() {
        assert!(Version::parse_lenient("1.10.0") > Version::parse_lenient("1.9.9"));
    }

    #[test]
    fn default_requirements_are_compatible_with_default_host() {
        let meta = PluginMeta::new("a", "A", "1").unwrap();
        let report = check_compatibility(&meta, &HostVersions::default());
        assert!(report.compatible);
        assert!(report.missing_requirements.is_empty());
        assert!(report.error_message.is_empty());
    }

    #[test]
    fn every_unmet_component_is_listed() {
        let meta = PluginMeta::new("a", "Alpha", "1")
            .unwrap()
            .with_requirement(HostComponent::Sdk, "2.0")
            .with_requirement(HostComponent::GeneralContext, "1.5.0");
        let report = check_compatibility(&meta, &HostVersions::default());
        assert!(!report.compatible);
        assert_eq!(
            report.missing_requirements,
            [
                "Plugin SDK >= 2.0 (current: 1.0.0)",
                "GeneralContext >= 1.5.0 (current: 1.0.0)"
            ]
        );
        assert!(report.error_message.starts_with("Plugin 'Alpha' (a) is incompatible."));
    }

    #[test]
    fn strict_mode_rejects_undeclared_requirements() {
        let plain = plugin(PluginMeta::new("plain", "Plain", "1").unwrap());
        let declared = plugin(
            PluginMeta::new("declared", "Declared", "1")
                .unwrap()
                .with_requirement(HostComponent::Core, "1.0.1"),
        );
        let host = HostVersions::default().with(HostComponent::Core, "1.2");

        let (ok, rejected) = partition_compatible(vec![plain.clone(), declared.clone()], &host, true);
        assert_eq!(ok.len(), 1);
        assert_eq!(ok[0].meta().id(), "declared");
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].plugin_id, "plain");

        let (ok, rejected) = partition_compatible(vec![plain, declared], &host, false);
        assert_eq!(ok.len(), 2);
        assert!(rejected.is_empty());
    }

    #[test]
    fn incompatible_plugins_are_reported() {
        let needy = plugin(
            PluginMeta::new("needy", "Needy", "1")
                .unwrap()
                .with_requirement(HostComponent::Orchestrator, "9"),
        );
        let (ok, rejected) = partition_compatible(vec![needy], &HostVersions::default(), false);
        assert!(ok.is_empty());
        assert_eq!(rejected[0].missing_requirements.len(), 1);
    }
}
