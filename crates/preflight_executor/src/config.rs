//! Run options.

use core::num::NonZeroUsize;
use core::time::Duration;

use preflight_plugin::ConfigMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::limits::ResourceLimits;

/// Environment variable overriding the worker count.
pub const PARALLELISM_ENV: &str = "PREFLIGHT_PARALLELISM";

/// Environment variable supplying the per-plugin timeout when the
/// configuration leaves it unset.
pub const TIMEOUT_ENV: &str = "PREFLIGHT_PLUGIN_TIMEOUT";

/// Per-plugin timeout used when neither configuration nor environment sets
/// one.
pub const DEFAULT_TIMEOUT_SECS: f64 = 3.0;

/// Execution options, read from the `options` section of the configuration.
///
/// | Key | Default | Meaning |
/// |-----|---------|---------|
/// | `enabled` | `true` | Global on/off switch |
/// | `sandbox` | `true` | Isolate plugins in workers |
/// | `plugin_parallelism` | auto | Worker count |
/// | `plugin_timeout_s` | unset | Per-plugin timeout in seconds, `<= 0` = none; unset = environment or 3 s |
/// | `plugin_limits` | none | [`ResourceLimits`] for process workers |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Whether plugins run at all.
    pub enabled: bool,
    /// Whether plugins run in isolated workers.
    pub sandbox: bool,
    /// Worker count. `None` or `0` picks one fewer than the core count.
    #[serde(rename = "plugin_parallelism")]
    pub parallelism: Option<usize>,
    /// Per-plugin timeout in seconds. Non-positive disables the timeout.
    pub plugin_timeout_s: Option<f64>,
    /// Limits applied inside process workers.
    #[serde(rename = "plugin_limits")]
    pub limits: ResourceLimits,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sandbox: true,
            parallelism: None,
            plugin_timeout_s: None,
            limits: ResourceLimits::default(),
        }
    }
}

impl RunConfig {
    /// Reads the `options` section of a loaded configuration map.
    ///
    /// A malformed section is logged and replaced by defaults.
    #[must_use]
    pub fn from_config(config: &ConfigMap) -> Self {
        match config.get("options") {
            None | Some(Value::Null) => Self::default(),
            Some(options) => Self::deserialize(options).unwrap_or_else(|error| {
                tracing::warn!(%error, "invalid `options` section, using defaults");
                Self::default()
            }),
        }
    }

    /// Enables or disables sandboxing.
    #[must_use]
    pub fn with_sandbox(mut self, sandbox: bool) -> Self {
        self.sandbox = sandbox;
        self
    }

    /// Sets the worker count.
    #[must_use]
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = Some(parallelism);
        self
    }

    /// Sets the per-plugin timeout. `None` or a zero duration disables it.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.plugin_timeout_s = Some(timeout.map_or(0.0, |t| t.as_secs_f64()));
        self
    }

    /// Sets the process worker limits.
    #[must_use]
    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Resolves the worker count from an environment value and a core count.
    ///
    /// A positive environment value wins, then a positive configured value,
    /// then `max(1, cores - 1)`.
    #[must_use]
    pub fn resolve_parallelism(&self, env_value: Option<&str>, cores: usize) -> usize {
        if let Some(n) = env_value
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|&n| n > 0)
        {
            return n;
        }
        match self.parallelism {
            Some(n) if n > 0 => n,
            _ => cores.saturating_sub(1).max(1),
        }
    }

    /// Worker count for this process, honoring [`PARALLELISM_ENV`].
    #[must_use]
    pub fn effective_parallelism(&self) -> usize {
        let env = std::env::var(PARALLELISM_ENV).ok();
        self.resolve_parallelism(env.as_deref(), available_cores())
    }

    /// Resolves the per-plugin timeout from an environment value.
    ///
    /// A configured value wins, then a parseable environment value, then
    /// [`DEFAULT_TIMEOUT_SECS`]. Non-positive results mean no timeout.
    #[must_use]
    pub fn resolve_timeout(&self, env_value: Option<&str>) -> Option<Duration> {
        let seconds = self.plugin_timeout_s.unwrap_or_else(|| {
            env_value
                .and_then(|v| v.trim().parse::<f64>().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS)
        });
        (seconds.is_finite() && seconds > 0.0).then(|| Duration::from_secs_f64(seconds))
    }

    /// Per-plugin timeout for this process, honoring [`TIMEOUT_ENV`].
    #[must_use]
    pub fn effective_timeout(&self) -> Option<Duration> {
        let env = std::env::var(TIMEOUT_ENV).ok();
        self.resolve_timeout(env.as_deref())
    }
}

/// Logical cores available to this process, at least 1.
#[must_use]
pub fn available_cores() -> usize {
    std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
}
