//! Preflight demo CLI.
//!
//! Runs the demo catalog (or the sandbox fixtures) against a project
//! directory and prints the execution report.
//!
//! # Usage
//!
//! ```bash
//! preflight-demo <project_dir> [--config <file.json>] [--fixtures <id,id,...>]
//!                [--sequential] [--in-process] [--parallelism <n>]
//!                [--timeout <secs>] [--strict] [--list]
//!                [--log-format <pretty|compact|json>] [--verbose]
//! ```
//!
//! # Example
//!
//! ```bash
//! preflight-demo ./my-project --parallelism 4 --timeout 10
//! ```

use core::time::Duration;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use example::{FIXTURES_MODULE, catalog, host_registry};
use preflight_core::{LogFormat, Logging};
use preflight_executor::{Executor, ExecutionReport, RunConfig, serve_if_worker};
use preflight_plugin::{ConfigMap, PreCompileContext, TagPhases};
use preflight_scheduler::{PluginSettings, Registry};
use tracing::Level;

/// Runs preflight plugins against a project directory.
#[derive(Parser, Debug)]
#[command(name = "preflight-demo", version, about, long_about = None)]
struct Args {
    /// Project directory the hooks run against.
    project: PathBuf,

    /// JSON configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run these sandbox fixtures instead of the demo catalog.
    #[arg(long, value_delimiter = ',')]
    fixtures: Option<Vec<String>>,

    /// Run every hook in-process, in scheduler order.
    #[arg(long)]
    sequential: bool,

    /// Use thread workers instead of relaunching this binary.
    #[arg(long)]
    in_process: bool,

    /// Worker count.
    #[arg(long)]
    parallelism: Option<usize>,

    /// Per-plugin timeout in seconds; 0 or less disables it.
    #[arg(long, allow_negative_numbers = true)]
    timeout: Option<f64>,

    /// Leave out plugins that declare no version requirements.
    #[arg(long)]
    strict: bool,

    /// List the registered plugins and exit.
    #[arg(long)]
    list: bool,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Log at debug level.
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn run_config(&self, config: &ConfigMap) -> RunConfig {
        let mut run = RunConfig::from_config(config);
        if self.sequential {
            run = run.with_sandbox(false);
        }
        if let Some(n) = self.parallelism {
            run = run.with_parallelism(n);
        }
        if let Some(secs) = self.timeout {
            run = run.with_timeout(Duration::try_from_secs_f64(secs).ok());
        }
        run
    }
}

fn load_config(path: Option<&Path>) -> Result<ConfigMap, String> {
    let Some(path) = path else {
        return Ok(ConfigMap::new());
    };
    let text = std::fs::read_to_string(path).map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    serde_json::from_str(&text).map_err(|e| format!("invalid config {}: {e}", path.display()))
}

/// Catalog used when this binary runs as a sandbox worker.
fn worker_catalog(module: Option<&str>) -> Registry {
    Logging::new()
        .with_level(Level::WARN)
        .with_format(LogFormat::Compact)
        .install();
    catalog(module)
}

fn build_registry(args: &Args, config: &ConfigMap, sandbox: bool) -> Registry {
    let module = args.fixtures.as_ref().map(|_| FIXTURES_MODULE);

    let exe = if sandbox && !args.in_process {
        std::env::current_exe()
            .inspect_err(|error| tracing::warn!(%error, "cannot locate own executable, using thread workers"))
            .ok()
    } else {
        None
    };

    let phases = TagPhases::from_config(config);
    let (mut registry, rejected) = host_registry(module, exe.as_deref(), phases, args.strict);
    for report in &rejected {
        tracing::warn!(plugin = %report.plugin_id, "{}", report.error_message);
    }

    if let Some(ids) = &args.fixtures {
        let unwanted: Vec<String> = registry
            .records()
            .map(|r| r.id().to_string())
            .filter(|id| !ids.contains(id))
            .collect();
        for id in unwanted {
            registry.remove(&id);
        }
    }
    registry.apply_settings(&PluginSettings::from_config(config));
    registry
}

fn print_list(registry: &Registry) {
    for summary in registry.list(true) {
        let state = if summary.active { "active" } else { "disabled" };
        eprintln!(
            "{:<22} {:<9} priority={:<4} {}",
            summary.id,
            state,
            summary.priority,
            registry.phases().describe(&summary.id, summary.meta.tags())
        );
    }
}

fn print_report(report: &ExecutionReport) {
    for item in report {
        let status = if item.success { "ok" } else { "FAILED" };
        eprintln!("{:<22} {:<6} {:>9.1} ms  {}", item.plugin_id, status, item.duration_ms, item.error);
    }
    eprintln!("{report}");
}

fn main() -> ExitCode {
    if let Some(code) = serve_if_worker(worker_catalog) {
        return code;
    }

    let args = Args::parse();

    Logging::new()
        .with_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .with_format(args.log_format)
        .install();

    if !args.project.is_dir() {
        eprintln!("Error: {} is not a directory", args.project.display());
        return ExitCode::from(2);
    }

    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("Error: {message}");
            return ExitCode::from(2);
        }
    };

    let run_config = args.run_config(&config);
    let registry = build_registry(&args, &config, run_config.sandbox);

    if args.list {
        print_list(&registry);
        return ExitCode::SUCCESS;
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("Error: cannot start runtime: {error}");
            return ExitCode::FAILURE;
        }
    };

    let ctx = Arc::new(PreCompileContext::new(&args.project).with_config(config));
    let executor = Executor::new(run_config);
    let report = runtime.block_on(executor.run(&registry, ctx));

    print_report(&report);
    if report.ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
