//! Orchestrates pre-build plugins: registration, dependency-aware ordering
//! and sandboxed parallel execution.
//!

pub use preflight_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use preflight_internal::prelude::*;
}
