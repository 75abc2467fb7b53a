//! Plugin execution for preflight (Layer 2).
//!
//! [`Executor`] runs the active plugins of a
//! [`Registry`](preflight_scheduler::Registry) in the order computed by
//! [`resolve_order`](preflight_scheduler::resolve_order) and collects an
//! [`ExecutionReport`].
//!
//! Two modes exist:
//!
//! - **Sequential**: every hook runs in-process on the caller's thread, in
//!   scheduler order. Used when sandboxing is off or parallelism is 1.
//! - **Sandboxed parallel**: up to N workers in flight. A plugin whose record
//!   names a worker executable runs in a child process (resource limits,
//!   hard kill on timeout); any other plugin runs on a dedicated thread,
//!   which on timeout is asked to stop through
//!   [`PreCompileContext::is_cancelled`](preflight_plugin::PreCompileContext::is_cancelled).
//!
//! A failing, panicking, crashing or timed-out plugin becomes a failed
//! [`ExecutionItem`]; the run always continues.
//!
//! # Example
//!
//! ```no_run
//! use preflight_executor::{Executor, RunConfig};
//! use preflight_plugin::PreCompileContext;
//! use preflight_scheduler::Registry;
//! use std::sync::Arc;
//!
//! # async fn demo(registry: Registry) {
//! let ctx = Arc::new(PreCompileContext::new("."));
//! let executor = Executor::new(RunConfig::default().with_parallelism(4));
//!
//! let report = executor.run(&registry, ctx).await;
//! if !report.ok() {
//!     for item in report.failures() {
//!         eprintln!("{}: {}", item.plugin_id, item.error);
//!     }
//! }
//! # }
//! ```

mod config;
mod error;
mod executor;
mod hook;
mod limits;
pub mod protocol;
mod report;
mod sandbox;
pub mod worker;

pub use config::{DEFAULT_TIMEOUT_SECS, PARALLELISM_ENV, RunConfig, TIMEOUT_ENV, available_cores};
pub use error::WorkerError;
pub use executor::Executor;
pub use limits::ResourceLimits;
pub use report::{ExecutionItem, ExecutionReport};
pub use worker::serve_if_worker;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::{ExecutionItem, ExecutionReport, Executor, ResourceLimits, RunConfig};
}
