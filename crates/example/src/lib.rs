//! Plugin catalogs for the `preflight-demo` binary.
//!
//! The binary is both the host and, when relaunched with the worker flag, the
//! sandbox worker. Both sides build their plugins from [`plugins`], so a
//! worker can find any plugin the host registered under the same module name.
//!
//! ```text
//!   host: preflight-demo ./project             worker: preflight-demo --preflight-worker
//!   ┌─────────────────────────────┐            ┌──────────────────────────────┐
//!   │ plugins("demo") → Registry  │── spawn ──▶│ stdin: WorkerRequest         │
//!   │ resolve_order, Executor     │            │ limits, plugins("demo")      │
//!   │                             │◀─ stdout ──│ run hook, print result line  │
//!   └─────────────────────────────┘            └──────────────────────────────┘
//! ```

pub mod demo;
pub mod fixtures;

use std::path::Path;
use std::sync::Arc;

use preflight_plugin::compat::{CompatibilityReport, HostComponent, HostVersions, partition_compatible};
use preflight_plugin::{MetaError, Plugin, TagPhases};
use preflight_scheduler::Registry;

/// Module name of the demo catalog (the default).
pub const DEMO_MODULE: &str = "demo";

/// Module name of the sandbox fixtures.
pub const FIXTURES_MODULE: &str = "fixtures";

/// Versions of the host components this binary provides.
#[must_use]
pub fn host_versions() -> HostVersions {
    HostVersions::default()
        .with(HostComponent::Orchestrator, "2.1.0")
        .with(HostComponent::Core, "1.4.2")
        .with(HostComponent::Sdk, "1.2.0")
}

fn collect<P: Plugin>(plugins: &mut Vec<Arc<dyn Plugin>>, plugin: Result<P, MetaError>) {
    match plugin {
        Ok(plugin) => plugins.push(Arc::new(plugin)),
        Err(error) => tracing::error!(%error, "skipping plugin with invalid metadata"),
    }
}

/// Builds the plugins of a module. `None` means the demo catalog; unknown
/// names yield nothing.
#[must_use]
pub fn plugins(module: Option<&str>) -> Vec<Arc<dyn Plugin>> {
    let mut plugins = Vec::new();
    match module.unwrap_or(DEMO_MODULE) {
        DEMO_MODULE => {
            collect(&mut plugins, demo::Cleaner::new());
            collect(&mut plugins, demo::RequiredFiles::new());
            collect(&mut plugins, demo::Manifest::new());
            collect(&mut plugins, demo::LicenseHeaders::new());
            collect(&mut plugins, demo::TrailingWhitespace::new());
        }
        FIXTURES_MODULE => {
            plugins.extend(fixtures::IDS.iter().filter_map(|id| fixtures::Fixture::plugin(id)));
        }
        other => tracing::warn!(module = other, "unknown plugin module"),
    }
    plugins
}

fn register(registry: &mut Registry, plugin: Arc<dyn Plugin>, worker: Option<(&Path, &str)>) {
    let added = match worker {
        Some((exe, module)) => registry.add_with_module(plugin, exe, Some(module.to_string())),
        None => registry.add(plugin),
    };
    if let Err(error) = added {
        tracing::error!(%error, "failed to register plugin");
    }
}

/// Registry of a module's plugins, as rebuilt inside a worker process.
#[must_use]
pub fn catalog(module: Option<&str>) -> Registry {
    let mut registry = Registry::new();
    for plugin in plugins(module) {
        register(&mut registry, plugin, None);
    }
    registry
}

/// Builds the host-side registry for `module`.
///
/// Plugins failing the version gate are left out and returned as reports.
/// With `worker_exe`, every plugin is marked to run in a worker process
/// launched from that executable. `phases` must be final here: tag scores
/// are resolved at registration.
pub fn host_registry(
    module: Option<&str>,
    worker_exe: Option<&Path>,
    phases: TagPhases,
    strict: bool,
) -> (Registry, Vec<CompatibilityReport>) {
    let module_name = module.unwrap_or(DEMO_MODULE);
    let (accepted, rejected) = partition_compatible(plugins(Some(module_name)), &host_versions(), strict);

    let mut registry = Registry::new().with_phases(phases);
    for plugin in accepted {
        register(&mut registry, plugin, worker_exe.map(|exe| (exe, module_name)));
    }
    (registry, rejected)
}
