//! # Preflight Internal Library
//!
//! Re-exports the preflight crates for convenience.

/// Layer 1: plugin contract, hook context and tag phases.
pub use preflight_plugin;

/// Layer 2: registry and dependency scheduling.
pub use preflight_scheduler;

/// Layer 2: sequential and sandboxed parallel execution.
pub use preflight_executor;

/// Host infrastructure (logging).
pub use preflight_core;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use preflight_core::prelude::*;
    pub use preflight_executor::prelude::*;
    pub use preflight_plugin::prelude::*;
    pub use preflight_scheduler::prelude::*;
}
