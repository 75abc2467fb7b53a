//! Plugin registry and execution ordering for preflight (Layer 2).
//!
//! - [`Registry`] - caller-owned, insertion-ordered set of plugin records
//! - [`PluginSettings`] - per-plugin overrides read from configuration
//! - [`resolve_order`] - dependency-aware order with a deterministic tie-break
//!
//! # Ordering
//!
//! Only active plugins are ordered. A plugin never runs before the active
//! plugins it requires. Among plugins that are ready at the same time, the
//! one with the smallest [`CompositeKey`] wins:
//!
//! 1. tag phase score (see [`TagPhases`](preflight_plugin::TagPhases))
//! 2. priority
//! 3. registration order
//! 4. id
//!
//! Unknown dependencies are ignored with a warning. Cycles are logged and
//! their members appended in key order, so every active plugin appears
//! exactly once.
//!
//! # Example
//!
//! ```
//! use preflight_plugin::{HookError, Plugin, PluginMeta, PreCompileContext};
//! use preflight_scheduler::{Registry, resolve_order};
//! use std::sync::Arc;
//!
//! struct Step {
//!     meta: PluginMeta,
//!     requires: Vec<String>,
//! }
//!
//! impl Plugin for Step {
//!     fn meta(&self) -> &PluginMeta {
//!         &self.meta
//!     }
//!     fn requires(&self) -> Vec<String> {
//!         self.requires.clone()
//!     }
//!     fn on_pre_compile(&self, _ctx: &PreCompileContext) -> Result<(), HookError> {
//!         Ok(())
//!     }
//! }
//!
//! let step = |id: &str, tags: &[&str], requires: &[&str]| {
//!     Arc::new(Step {
//!         meta: PluginMeta::new(id, id, "1.0.0").unwrap().with_tags(tags),
//!         requires: requires.iter().map(|s| s.to_string()).collect(),
//!     })
//! };
//!
//! let mut registry = Registry::new();
//! registry.add(step("ruff", &["lint"], &[])).unwrap();
//! registry.add(step("headers", &["license"], &["gen"])).unwrap();
//! registry.add(step("gen", &["codegen"], &[])).unwrap();
//! registry.add(step("wipe", &["clean"], &[])).unwrap();
//!
//! assert_eq!(resolve_order(&registry), ["wipe", "gen", "headers", "ruff"]);
//! ```

mod error;
mod registry;
mod schedule;
mod settings;

pub use error::RegistryError;
pub use registry::{ModuleTarget, PluginRecord, PluginSummary, PrioritySource, Registry};
pub use schedule::{CompositeKey, DependencyGraph, resolve_order};
pub use settings::{PluginSetting, PluginSettings};

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::{PluginSettings, Registry, RegistryError, resolve_order};
}
