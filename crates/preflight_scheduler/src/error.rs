use thiserror::Error;

/// Errors raised while registering plugins.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A plugin with the same id is already registered.
    #[error("plugin '{0}' is already registered; remove it first or choose a different id")]
    DuplicateId(String),
}
