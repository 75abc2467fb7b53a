//! Plugin registry.

use core::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use preflight_plugin::{DEFAULT_PHASE_SCORE, Plugin, PluginMeta, TagPhases};
use serde::Serialize;

use crate::error::RegistryError;
use crate::schedule::CompositeKey;
use crate::settings::{PluginSetting, PluginSettings};

/// Priority given to plugins with neither an explicit priority nor a
/// recognized tag.
pub const DEFAULT_PRIORITY: i32 = 100;

// ─────────────────────────────────────────────────────────────────────────────
// PluginRecord
// ─────────────────────────────────────────────────────────────────────────────

/// Where a record's priority came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PrioritySource {
    /// Declared by the plugin or set through the registry.
    Explicit,
    /// Inherited from the plugin's tag phase.
    Tagged,
    /// Neither, so [`DEFAULT_PRIORITY`].
    Default,
}

/// Executable that can host a plugin in an isolated worker process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleTarget {
    /// Path of the executable to launch.
    pub path: PathBuf,
    /// Catalog name passed to the worker, if the executable hosts several.
    pub name: Option<String>,
}

/// A registered plugin plus the scheduling state the registry owns.
#[derive(Clone)]
pub struct PluginRecord {
    plugin: Arc<dyn Plugin>,
    active: bool,
    requires: Vec<String>,
    priority: i32,
    priority_source: PrioritySource,
    insertion_index: u64,
    module: Option<ModuleTarget>,
}

impl PluginRecord {
    fn new(plugin: Arc<dyn Plugin>, insertion_index: u64, phases: &TagPhases) -> Self {
        let mut requires: Vec<String> = Vec::new();
        for dep in plugin.requires() {
            let dep = dep.trim();
            if !dep.is_empty() && !requires.iter().any(|r| r == dep) {
                requires.push(dep.to_string());
            }
        }

        let (priority, priority_source) = match plugin.priority() {
            Some(p) => (p, PrioritySource::Explicit),
            None => match phases.score(plugin.meta().tags()) {
                DEFAULT_PHASE_SCORE => (DEFAULT_PRIORITY, PrioritySource::Default),
                score => (score, PrioritySource::Tagged),
            },
        };

        Self {
            plugin,
            active: true,
            requires,
            priority,
            priority_source,
            insertion_index,
            module: None,
        }
    }

    /// Returns the plugin id.
    #[must_use]
    pub fn id(&self) -> &str {
        self.plugin.meta().id()
    }

    /// Returns the plugin metadata.
    #[must_use]
    pub fn meta(&self) -> &PluginMeta {
        self.plugin.meta()
    }

    /// Returns a handle to the plugin.
    #[must_use]
    pub fn plugin(&self) -> &Arc<dyn Plugin> {
        &self.plugin
    }

    /// Returns `true` if the plugin takes part in runs.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Trimmed, de-duplicated ids this plugin requires.
    #[must_use]
    pub fn requires(&self) -> &[String] {
        &self.requires
    }

    /// Returns the effective priority.
    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Returns where the priority came from.
    #[must_use]
    pub fn priority_source(&self) -> PrioritySource {
        self.priority_source
    }

    /// Returns the registration sequence number.
    #[must_use]
    pub fn insertion_index(&self) -> u64 {
        self.insertion_index
    }

    /// Returns the worker executable, if one was recorded.
    #[must_use]
    pub fn module(&self) -> Option<&ModuleTarget> {
        self.module.as_ref()
    }
}

impl fmt::Debug for PluginRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRecord")
            .field("id", &self.id())
            .field("active", &self.active)
            .field("requires", &self.requires)
            .field("priority", &self.priority)
            .field("priority_source", &self.priority_source)
            .field("insertion_index", &self.insertion_index)
            .field("module", &self.module)
            .finish_non_exhaustive()
    }
}

/// Display row returned by [`Registry::list`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginSummary {
    /// Plugin id.
    pub id: String,
    /// Plugin metadata.
    pub meta: PluginMeta,
    /// Whether the plugin is active.
    pub active: bool,
    /// Effective priority.
    pub priority: i32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Caller-owned set of plugins, keyed by id in registration order.
///
/// Mutate between runs; executors only borrow it immutably.
///
/// # Example
///
/// ```
/// use preflight_plugin::{HookError, Plugin, PluginMeta, PreCompileContext};
/// use preflight_scheduler::{PrioritySource, Registry, RegistryError};
/// use std::sync::Arc;
///
/// struct Fmt(PluginMeta);
///
/// impl Plugin for Fmt {
///     fn meta(&self) -> &PluginMeta {
///         &self.0
///     }
///     fn on_pre_compile(&self, _ctx: &PreCompileContext) -> Result<(), HookError> {
///         Ok(())
///     }
/// }
///
/// let fmt = || Arc::new(Fmt(PluginMeta::new("fmt", "Format", "1.0").unwrap().with_tags(["format"])));
///
/// let mut registry = Registry::new();
/// registry.add(fmt()).unwrap();
/// assert_eq!(registry.add(fmt()), Err(RegistryError::DuplicateId("fmt".into())));
///
/// let record = registry.get("fmt").unwrap();
/// assert_eq!(record.priority(), 40);
/// assert_eq!(record.priority_source(), PrioritySource::Tagged);
///
/// assert!(registry.set_priority("fmt", 1));
/// assert!(!registry.disable("missing"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Registry {
    records: IndexMap<String, PluginRecord>,
    next_index: u64,
    phases: TagPhases,
}

impl Registry {
    /// Creates an empty registry using the built-in tag phases.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the tag phase table.
    ///
    /// Set this before adding plugins: tag-derived priorities are resolved at
    /// registration.
    #[must_use]
    pub fn with_phases(mut self, phases: TagPhases) -> Self {
        self.phases = phases;
        self
    }

    /// Returns the tag phase table.
    #[must_use]
    pub fn phases(&self) -> &TagPhases {
        &self.phases
    }

    /// Registers a plugin and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateId`] if the id is taken.
    pub fn add(&mut self, plugin: Arc<dyn Plugin>) -> Result<String, RegistryError> {
        let id = plugin.meta().id().to_string();
        if self.records.contains_key(&id) {
            return Err(RegistryError::DuplicateId(id));
        }

        let record = PluginRecord::new(plugin, self.next_index, &self.phases);
        self.next_index += 1;

        tracing::debug!(
            plugin = %id,
            priority = record.priority,
            source = ?record.priority_source,
            requires = ?record.requires,
            "registered plugin"
        );
        self.records.insert(id.clone(), record);
        Ok(id)
    }

    /// Registers a plugin that can also run inside a worker process launched
    /// from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateId`] if the id is taken.
    pub fn add_with_module(
        &mut self,
        plugin: Arc<dyn Plugin>,
        path: impl Into<PathBuf>,
        name: Option<String>,
    ) -> Result<String, RegistryError> {
        let id = self.add(plugin)?;
        self.set_module(&id, path, name);
        Ok(id)
    }

    /// Records the worker executable for a plugin. Returns `false` for
    /// unknown ids.
    pub fn set_module(&mut self, id: &str, path: impl Into<PathBuf>, name: Option<String>) -> bool {
        match self.records.get_mut(id) {
            Some(record) => {
                record.module = Some(ModuleTarget {
                    path: path.into(),
                    name,
                });
                true
            }
            None => false,
        }
    }

    /// Removes a plugin. Returns `false` for unknown ids.
    pub fn remove(&mut self, id: &str) -> bool {
        self.records.shift_remove(id).is_some()
    }

    /// Marks a plugin active. Returns `false` for unknown ids.
    pub fn enable(&mut self, id: &str) -> bool {
        self.set_active(id, true)
    }

    /// Marks a plugin inactive. Returns `false` for unknown ids.
    pub fn disable(&mut self, id: &str) -> bool {
        self.set_active(id, false)
    }

    fn set_active(&mut self, id: &str, active: bool) -> bool {
        match self.records.get_mut(id) {
            Some(record) => {
                record.active = active;
                true
            }
            None => false,
        }
    }

    /// Overrides a plugin's priority. Returns `false` for unknown ids.
    pub fn set_priority(&mut self, id: &str, priority: i32) -> bool {
        match self.records.get_mut(id) {
            Some(record) => {
                record.priority = priority;
                record.priority_source = PrioritySource::Explicit;
                true
            }
            None => false,
        }
    }

    /// Applies per-plugin overrides, then the explicit `plugin_order`.
    ///
    /// Ids not in the registry are skipped.
    pub fn apply_settings(&mut self, settings: &PluginSettings) {
        for (id, setting) in &settings.plugins {
            if !self.contains(id) {
                tracing::debug!(plugin = %id, "settings for unregistered plugin ignored");
                continue;
            }
            match *setting {
                PluginSetting::Enabled(active) => {
                    self.set_active(id, active);
                }
                PluginSetting::Detailed { enabled, priority } => {
                    if let Some(active) = enabled {
                        self.set_active(id, active);
                    }
                    if let Some(priority) = priority {
                        self.set_priority(id, priority);
                    }
                }
            }
        }

        for (position, id) in settings.plugin_order.iter().enumerate() {
            let priority = i32::try_from(position).unwrap_or(i32::MAX);
            if !self.set_priority(id, priority) {
                tracing::debug!(plugin = %id, "plugin_order entry for unregistered plugin ignored");
            }
        }
    }

    /// Returns a record by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&PluginRecord> {
        self.records.get(id)
    }

    /// Returns `true` if the id is registered.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    /// Number of registered plugins, active or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records in registration order.
    pub fn records(&self) -> impl Iterator<Item = &PluginRecord> {
        self.records.values()
    }

    /// Active records in registration order.
    pub fn active_records(&self) -> impl Iterator<Item = &PluginRecord> {
        self.records.values().filter(|r| r.active)
    }

    /// Returns `true` if `id` is registered and active.
    #[must_use]
    pub fn is_active(&self, id: &str) -> bool {
        self.records.get(id).is_some_and(|r| r.active)
    }

    /// Plugins sorted by `(priority, id)`, for display.
    #[must_use]
    pub fn list(&self, include_inactive: bool) -> Vec<PluginSummary> {
        let mut rows: Vec<PluginSummary> = self
            .records
            .values()
            .filter(|r| include_inactive || r.active)
            .map(|r| PluginSummary {
                id: r.id().to_string(),
                meta: r.meta().clone(),
                active: r.active,
                priority: r.priority,
            })
            .collect();
        rows.sort_by(|a, b| (a.priority, &a.id).cmp(&(b.priority, &b.id)));
        rows
    }

    /// Composite scheduling key of a registered plugin.
    #[must_use]
    pub fn key(&self, id: &str) -> Option<CompositeKey> {
        self.records.get(id).map(|r| CompositeKey::of(r, &self.phases))
    }

    /// Tag phase score of a registered plugin.
    #[must_use]
    pub fn phase_score(&self, id: &str) -> Option<i32> {
        self.records
            .get(id)
            .map(|r| self.phases.score(r.meta().tags()))
    }
}
