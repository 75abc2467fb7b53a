//! Host-side infrastructure shared by preflight binaries.
//!
//! Currently this is the [`Logging`] builder, which installs the global
//! `tracing` subscriber that every other preflight crate logs through.

mod logging;

pub use logging::{LogFormat, Logging};

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::logging::{LogFormat, Logging};
}
