//! The plugin capability trait.

use crate::context::PreCompileContext;
use crate::error::HookError;
use crate::meta::PluginMeta;

/// A unit of pre-build work.
///
/// Implementors expose their [`PluginMeta`], optionally declare dependencies
/// and an explicit priority, and implement the single
/// [`on_pre_compile`](Plugin::on_pre_compile) hook.
///
/// # Ordering
///
/// A registry orders active plugins by dependencies first, then by
/// `(tag phase, priority, registration order, id)`. Lower priorities run
/// earlier. A plugin returning `None` from [`priority`](Plugin::priority)
/// inherits the score of its tag phase when its tags are recognized.
///
/// # Example
///
/// ```
/// use preflight_plugin::{HookError, Plugin, PluginMeta, PreCompileContext};
///
/// struct Headers {
///     meta: PluginMeta,
/// }
///
/// impl Plugin for Headers {
///     fn meta(&self) -> &PluginMeta {
///         &self.meta
///     }
///
///     fn requires(&self) -> Vec<String> {
///         vec!["clean".to_string()]
///     }
///
///     fn priority(&self) -> Option<i32> {
///         Some(5)
///     }
///
///     fn on_pre_compile(&self, _ctx: &PreCompileContext) -> Result<(), HookError> {
///         Ok(())
///     }
/// }
/// ```
pub trait Plugin: Send + Sync + 'static {
    /// Returns the plugin's metadata.
    fn meta(&self) -> &PluginMeta;

    /// Ids of plugins that must run before this one.
    ///
    /// Ids that are not registered or not active are ignored with a warning.
    fn requires(&self) -> Vec<String> {
        Vec::new()
    }

    /// Explicit priority, lower runs earlier. `None` means "not set".
    fn priority(&self) -> Option<i32> {
        None
    }

    /// Runs the plugin against the project.
    ///
    /// # Errors
    ///
    /// Any error is recorded as a failed item in the execution report.
    fn on_pre_compile(&self, ctx: &PreCompileContext) -> Result<(), HookError>;
}
