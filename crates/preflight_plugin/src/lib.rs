//! Plugin contract for preflight (Layer 1).
//!
//! A preflight plugin is a small, independently authored unit of work that runs
//! once before a build. This crate defines everything a plugin author touches:
//!
//! - [`PluginMeta`] - identity, category tags and host version requirements
//! - [`Plugin`] - the capability trait with its single `on_pre_compile` hook
//! - [`PreCompileContext`] - the project view handed to every hook
//! - [`TagPhases`] - maps category tags to coarse execution phases
//! - [`compat`] - version gating against the running host
//!
//! Ordering and execution live in `preflight_scheduler` and
//! `preflight_executor` (Layer 2).
//!
//! # Example
//!
//! ```
//! use preflight_plugin::{HookError, Plugin, PluginMeta, PreCompileContext};
//!
//! struct RequireReadme {
//!     meta: PluginMeta,
//! }
//!
//! impl Plugin for RequireReadme {
//!     fn meta(&self) -> &PluginMeta {
//!         &self.meta
//!     }
//!
//!     fn on_pre_compile(&self, ctx: &PreCompileContext) -> Result<(), HookError> {
//!         if ctx.project_root().join("README.md").is_file() {
//!             Ok(())
//!         } else {
//!             Err(HookError::msg("README.md is missing"))
//!         }
//!     }
//! }
//!
//! let plugin = RequireReadme {
//!     meta: PluginMeta::new("require_readme", "Require README", "1.0.0")
//!         .unwrap()
//!         .with_tags(["check"]),
//! };
//! assert_eq!(plugin.meta().tags(), ["check"]);
//! ```

pub mod compat;
pub mod context;
mod error;
mod meta;
pub mod phase;
mod plugin;

pub use context::{ConfigMap, PreCompileContext, WorkspaceMetadata};
pub use error::{HookError, MetaError};
pub use meta::{DEFAULT_REQUIREMENT, PluginMeta, Requirements, normalize_tags};
pub use phase::{DEFAULT_PHASE_SCORE, Phase, TagPhases};
pub use plugin::Plugin;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::compat::{HostVersions, Version};
    pub use crate::{
        ConfigMap, HookError, Phase, Plugin, PluginMeta, PreCompileContext, Requirements,
        TagPhases,
    };
}
