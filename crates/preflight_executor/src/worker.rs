//! Worker side of the process sandbox.
//!
//! A host executable that registers plugins with
//! [`Registry::add_with_module`](preflight_scheduler::Registry::add_with_module)
//! pointing at itself must call [`serve_if_worker`] first thing in `main`:
//!
//! ```no_run
//! use preflight_scheduler::Registry;
//! use std::process::ExitCode;
//!
//! fn catalog(_module: Option<&str>) -> Registry {
//!     // register the same plugins the host registers
//!     Registry::new()
//! }
//!
//! fn main() -> ExitCode {
//!     if let Some(code) = preflight_executor::serve_if_worker(catalog) {
//!         return code;
//!     }
//!     // ... regular host startup ...
//!     ExitCode::SUCCESS
//! }
//! ```

use std::io::{self, Read, Write};
use std::process::ExitCode;
use std::time::Instant;

use preflight_plugin::PreCompileContext;
use preflight_scheduler::Registry;

use crate::hook;
use crate::protocol::{WORKER_FLAG, WorkerRequest, WorkerResponse};

/// Exit code when the request cannot be read.
const EXIT_BAD_REQUEST: u8 = 2;

/// Exit code when the response cannot be written.
const EXIT_BAD_RESPONSE: u8 = 3;

/// Serves one hook if this process was launched as a worker.
///
/// Returns `None` in a regular process. In worker mode, reads the
/// [`WorkerRequest`] from stdin, applies its resource limits, builds the
/// catalog for the requested module, runs the plugin's hook and prints the
/// result line, then returns the exit code for `main`.
pub fn serve_if_worker<F>(catalog: F) -> Option<ExitCode>
where
    F: FnOnce(Option<&str>) -> Registry,
{
    if std::env::args().nth(1).as_deref() != Some(WORKER_FLAG) {
        return None;
    }
    Some(serve(catalog))
}

fn serve<F>(catalog: F) -> ExitCode
where
    F: FnOnce(Option<&str>) -> Registry,
{
    let mut input = String::new();
    if let Err(error) = io::stdin().read_to_string(&mut input) {
        tracing::error!(%error, "failed to read worker request");
        return ExitCode::from(EXIT_BAD_REQUEST);
    }
    let request: WorkerRequest = match serde_json::from_str(&input) {
        Ok(request) => request,
        Err(error) => {
            tracing::error!(%error, "malformed worker request");
            return ExitCode::from(EXIT_BAD_REQUEST);
        }
    };

    respond(&handle(request, catalog))
}

/// Runs the requested hook inside this process.
fn handle<F>(request: WorkerRequest, catalog: F) -> WorkerResponse
where
    F: FnOnce(Option<&str>) -> Registry,
{
    request.limits.apply();

    let registry = catalog(request.module_name.as_deref());
    let start = Instant::now();
    let result = match registry.get(&request.plugin_id) {
        Some(record) => {
            let ctx = PreCompileContext::new(request.project_root).with_config(request.config);
            hook::invoke(record.plugin().as_ref(), &ctx)
        }
        None => Err(format!(
            "plugin '{}' not found in worker catalog",
            request.plugin_id
        )),
    };
    WorkerResponse::from_result(result, start.elapsed())
}

fn respond(response: &WorkerResponse) -> ExitCode {
    let written = response
        .to_line()
        .map_err(io::Error::other)
        .and_then(|line| {
            let mut out = io::stdout().lock();
            writeln!(out, "{line}")?;
            out.flush()
        });
    match written {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "failed to write worker result");
            ExitCode::from(EXIT_BAD_RESPONSE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limits::ResourceLimits;
    use preflight_plugin::{HookError, Plugin, PluginMeta};
    use std::sync::Arc;

    struct ReadsConfig(PluginMeta);

    impl Plugin for ReadsConfig {
        fn meta(&self) -> &PluginMeta {
            &self.0
        }

        fn on_pre_compile(&self, ctx: &PreCompileContext) -> Result<(), HookError> {
            match ctx.config().get("marker") {
                Some(_) => Ok(()),
                None => Err(HookError::msg("marker missing")),
            }
        }
    }

    fn catalog(module: Option<&str>) -> Registry {
        let mut registry = Registry::new();
        if module == Some("main") {
            registry
                .add(Arc::new(ReadsConfig(PluginMeta::new("reader", "Reader", "1").unwrap())))
                .unwrap();
        }
        registry
    }

    fn request(plugin: &str, module: Option<&str>, with_marker: bool) -> WorkerRequest {
        let mut config = preflight_plugin::ConfigMap::new();
        if with_marker {
            config.insert("marker".into(), true.into());
        }
        WorkerRequest {
            plugin_id: plugin.into(),
            module_name: module.map(str::to_string),
            project_root: ".".into(),
            config,
            limits: ResourceLimits::default(),
        }
    }

    #[test]
    fn runs_the_requested_plugin_with_its_config() {
        let response = handle(request("reader", Some("main"), true), catalog);
        assert!(response.ok, "{}", response.error);

        let response = handle(request("reader", Some("main"), false), catalog);
        assert!(!response.ok);
        assert_eq!(response.error, "marker missing");
    }

    #[test]
    fn unknown_plugin_is_reported() {
        let response = handle(request("reader", Some("other"), true), catalog);
        assert!(!response.ok);
        assert_eq!(response.error, "plugin 'reader' not found in worker catalog");
    }

    #[test]
    fn regular_process_is_not_a_worker() {
        assert!(serve_if_worker(catalog).is_none());
    }
}
