//! Error types raised by plugin metadata and hooks.

use thiserror::Error;

/// Errors raised while building a [`PluginMeta`](crate::PluginMeta).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetaError {
    /// The plugin id was empty after trimming whitespace.
    #[error("plugin id must not be empty")]
    EmptyId,
}

/// Failure reported by a plugin's `on_pre_compile` hook.
///
/// The executor records the `Display` rendering of this error in the
/// execution report; the run itself continues.
#[derive(Debug, Error)]
pub enum HookError {
    /// A plain failure message.
    #[error("{0}")]
    Failed(String),
    /// An I/O error raised while inspecting or rewriting the project.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Any other error type.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl HookError {
    /// Creates a [`HookError::Failed`] from a message.
    #[must_use]
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Wraps an arbitrary error.
    #[must_use]
    pub fn other(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Other(Box::new(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_displays_message_verbatim() {
        assert_eq!(HookError::msg("missing LICENSE").to_string(), "missing LICENSE");
    }

    #[test]
    fn io_error_is_transparent() {
        let err: HookError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(err.to_string(), "gone");
    }

    #[test]
    fn other_wraps_foreign_errors() {
        let parse = "x".parse::<i32>().unwrap_err();
        let err = HookError::other(parse);
        assert!(matches!(err, HookError::Other(_)));
        assert_eq!(err.to_string(), "invalid digit found in string");
    }
}
