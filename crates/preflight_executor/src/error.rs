use std::io;

use thiserror::Error;

/// Failure to drive a worker.
///
/// Never returned from a run: the executor records it as the failed item of
/// the plugin the worker was running.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The worker process or thread could not be started.
    #[error("failed to launch worker: {0}")]
    Spawn(#[source] io::Error),
    /// Reading from or waiting on the worker failed.
    #[error("worker i/o failed: {0}")]
    Io(#[from] io::Error),
    /// The request could not be encoded.
    #[error("failed to encode worker request: {0}")]
    Encode(#[from] serde_json::Error),
    /// A standard stream of the worker process was not captured.
    #[error("worker {0} is not available")]
    Pipe(&'static str),
}
