//! Plugin identity and host requirements.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::compat::HostComponent;
use crate::error::MetaError;

/// Minimum version assumed for every host component when a plugin does not
/// declare one.
pub const DEFAULT_REQUIREMENT: &str = "1.0.0";

// ─────────────────────────────────────────────────────────────────────────────
// Requirements
// ─────────────────────────────────────────────────────────────────────────────

/// Minimum versions of the host components a plugin needs.
///
/// Every field defaults to [`DEFAULT_REQUIREMENT`]. Versions are compared
/// leniently, see [`Version::parse_lenient`](crate::compat::Version::parse_lenient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Requirements {
    /// Minimum orchestrator version.
    pub orchestrator: String,
    /// Minimum core version.
    pub core: String,
    /// Minimum plugin SDK version.
    pub sdk: String,
    /// Minimum plugin context version.
    pub plugin_context: String,
    /// Minimum general context version.
    pub general_context: String,
}

impl Default for Requirements {
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

impl Requirements {
    /// Returns the requirement for one host component.
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

    /// Sets the requirement for one host component.
    pub fn set(&mut self, component: HostComponent, version: impl Into<String>) {
        let slot = match component {
            HostComponent::Orchestrator => &mut self.orchestrator,
            HostComponent::Core => &mut self.core,
            HostComponent::Sdk => &mut self.sdk,
            HostComponent::PluginContext => &mut self.plugin_context,
            HostComponent::GeneralContext => &mut self.general_context,
        };
        *slot = version.into();
    }

    /// Returns `true` if no component requirement differs from the default.
    #[must_use]
    pub fn is_default(&self) -> bool {
        HostComponent::ALL
            .iter()
            .all(|&c| self.get(c) == DEFAULT_REQUIREMENT)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PluginMeta
// ─────────────────────────────────────────────────────────────────────────────

/// Immutable descriptive data about a plugin.
///
/// The id is the plugin's unique key in a registry. Tags are normalized on
/// the way in: comma-separated entries are split, trimmed and lower-cased, and
/// empty entries are dropped. Order is kept and duplicates are allowed.
///
/// # Example
///
/// ```
/// use preflight_plugin::PluginMeta;
///
/// let meta = PluginMeta::new("  ruff  ", "Ruff", "0.4.0")
///     .unwrap()
///     .with_tags(["Lint, format", " "]);
///
/// assert_eq!(meta.id(), "ruff");
/// assert_eq!(meta.tags(), ["lint", "format"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginMeta {
    id: String,
    name: String,
    version: String,
    description: String,
    author: String,
    tags: Vec<String>,
    requirements: Requirements,
}

impl PluginMeta {
    /// Creates metadata for a plugin.
    ///
    /// # Errors
    ///
    /// Returns [`MetaError::EmptyId`] if `id` is empty after trimming.
    pub fn new(
        id: impl AsRef<str>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Result<Self, MetaError> {
        let id = id.as_ref().trim();
        if id.is_empty() {
            return Err(MetaError::EmptyId);
        }
        Ok(Self {
            id: id.to_string(),
            name: name.into(),
            version: version.into(),
            description: String::new(),
            author: String::new(),
            tags: Vec::new(),
            requirements: Requirements::default(),
        })
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the author.
    #[must_use]
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    /// Replaces the tags, normalizing them.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = normalize_tags(tags);
        self
    }

    /// Replaces all host requirements.
    #[must_use]
    pub fn with_requirements(mut self, requirements: Requirements) -> Self {
        self.requirements = requirements;
        self
    }

    /// Sets the minimum version of a single host component.
    #[must_use]
    pub fn with_requirement(mut self, component: HostComponent, version: impl Into<String>) -> Self {
        self.requirements.set(component, version);
        self
    }

    /// Returns the unique plugin id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the human-readable name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the plugin's own version string.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the author.
    #[must_use]
    pub fn author(&self) -> &str {
        &self.author
    }

    /// Returns the normalized tags.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Returns the host requirements.
    #[must_use]
    pub fn requirements(&self) -> &Requirements {
        &self.requirements
    }
}

impl fmt::Display for PluginMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Plugin {} v{}", self.id, self.version)?;
        let custom: Vec<String> = HostComponent::ALL
            .iter()
            .filter(|&&c| self.requirements.get(c) != DEFAULT_REQUIREMENT)
            .map(|&c| format!("{}>={}", c.key(), self.requirements.get(c)))
            .collect();
        if !custom.is_empty() {
            write!(f, " [{}]", custom.join(", "))?;
        }
        f.write_str(">")
    }
}

/// Normalizes a list of tags.
///
/// Each entry may itself be a comma-separated list. Entries are trimmed and
/// lower-cased; empty ones are dropped.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .flat_map(|raw| {
            raw.as_ref()
                .split(',')
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
        })
        .collect()
}
