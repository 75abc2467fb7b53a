//! Resource limits for process workers.

use serde::{Deserialize, Serialize};

/// OS resource limits applied inside a worker process before the hook runs.
///
/// A zero field is left unlimited. Limits are advisory hardening: a failed
/// `setrlimit` is logged and skipped. On non-unix targets [`apply`](Self::apply)
/// does nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceLimits {
    /// Address space in MiB (`RLIMIT_AS`).
    pub mem_mb: u64,
    /// CPU time in seconds (`RLIMIT_CPU`).
    #[serde(alias = "cpu_time_s")]
    pub cpu_seconds: u64,
    /// Open file descriptors (`RLIMIT_NOFILE`).
    #[serde(alias = "nofile")]
    pub max_open_files: u64,
    /// Largest writable file in MiB (`RLIMIT_FSIZE`).
    #[serde(alias = "fsize_mb")]
    pub max_file_size_mb: u64,
}

#[cfg(unix)]
const MIB: u64 = 1024 * 1024;

// Expanded in place: the type of the resource constant differs between libc flavors.
#[cfg(unix)]
macro_rules! set_limit {
    ($resource:expr, $value:expr, $name:literal) => {{
        let value = $value as libc::rlim_t;
        let limit = libc::rlimit {
            rlim_cur: value,
            rlim_max: value,
        };
        // SAFETY: `limit` is a fully initialized rlimit that lives for the
        // duration of the call, and the resource is a libc constant.
        let rc = unsafe { libc::setrlimit($resource, &limit) };
        if rc == 0 {
            tracing::debug!(resource = $name, value, "resource limit applied");
            true
        } else {
            tracing::warn!(
                resource = $name,
                value,
                error = %std::io::Error::last_os_error(),
                "failed to apply resource limit"
            );
            false
        }
    }};
}

impl ResourceLimits {
    /// Returns `true` if no limit is set.
    #[must_use]
    pub fn is_unlimited(&self) -> bool {
        *self == Self::default()
    }

    /// Applies the limits to the current process and returns how many were
    /// set.
    ///
    /// Only call this in a dedicated worker process: the limits constrain
    /// the whole process and cannot be raised again.
    pub fn apply(&self) -> usize {
        #[cfg(unix)]
        {
            let mut applied = 0;
            if self.mem_mb > 0 {
                applied += usize::from(set_limit!(libc::RLIMIT_AS, self.mem_mb.saturating_mul(MIB), "RLIMIT_AS"));
            }
            if self.cpu_seconds > 0 {
                applied += usize::from(set_limit!(libc::RLIMIT_CPU, self.cpu_seconds, "RLIMIT_CPU"));
            }
            if self.max_open_files > 0 {
                applied += usize::from(set_limit!(libc::RLIMIT_NOFILE, self.max_open_files, "RLIMIT_NOFILE"));
            }
            if self.max_file_size_mb > 0 {
                applied += usize::from(set_limit!(
                    libc::RLIMIT_FSIZE,
                    self.max_file_size_mb.saturating_mul(MIB),
                    "RLIMIT_FSIZE"
                ));
            }
            applied
        }

        #[cfg(not(unix))]
        {
            if !self.is_unlimited() {
                tracing::debug!("resource limits are not supported on this platform");
            }
            0
        }
    }
}
