//! Messages exchanged with process workers.
//!
//! The host launches the worker executable with [`WORKER_FLAG`] as its first
//! argument and writes one JSON [`WorkerRequest`] to its stdin, then closes
//! it. The worker prints exactly one line starting with [`RESULT_MARKER`]
//! followed by a JSON [`WorkerResponse`]. Any other stdout line is treated
//! as plugin chatter and forwarded to the host's log.

use core::time::Duration;
use std::path::PathBuf;

use preflight_plugin::ConfigMap;
use serde::{Deserialize, Serialize};

use crate::limits::ResourceLimits;

/// First argument that switches a host executable into worker mode.
pub const WORKER_FLAG: &str = "--preflight-worker";

/// Prefix of the result line on a worker's stdout.
pub const RESULT_MARKER: &str = "@@preflight-result ";

/// Everything a worker needs to run one hook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerRequest {
    /// Id of the plugin to run.
    pub plugin_id: String,
    /// Catalog the worker should load, when its executable hosts several.
    #[serde(default)]
    pub module_name: Option<String>,
    /// Project root for the hook context.
    pub project_root: PathBuf,
    /// Merged configuration for the hook context.
    #[serde(default)]
    pub config: ConfigMap,
    /// Limits to apply before the hook runs.
    #[serde(default)]
    pub limits: ResourceLimits,
}

/// Outcome of one hook, as reported by the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerResponse {
    /// Whether the hook succeeded.
    pub ok: bool,
    /// Failure message, empty on success.
    #[serde(default)]
    pub error: String,
    /// Hook duration in milliseconds.
    #[serde(default)]
    pub duration_ms: f64,
}

impl WorkerResponse {
    /// Builds a response from a hook result.
    #[must_use]
    pub fn from_result(result: Result<(), String>, elapsed: Duration) -> Self {
        let duration_ms = elapsed.as_secs_f64() * 1000.0;
        match result {
            Ok(()) => Self {
                ok: true,
                error: String::new(),
                duration_ms,
            },
            Err(error) => Self {
                ok: false,
                error,
                duration_ms,
            },
        }
    }

    /// Renders the stdout line carrying this response.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        Ok(format!("{RESULT_MARKER}{}", serde_json::to_string(self)?))
    }

    /// Parses a stdout line. Returns `None` for lines without the marker.
    #[must_use]
    pub fn parse_line(line: &str) -> Option<Result<Self, serde_json::Error>> {
        line.strip_prefix(RESULT_MARKER)
            .map(|payload| serde_json::from_str(payload.trim_end()))
    }
}
