//! Isolated workers used by the parallel executor.
//!
//! A [`Worker`] runs exactly one hook and reports back over a one-shot
//! channel: a `tokio::sync::oneshot` for thread workers, the result line on
//! stdout for process workers. Both are awaited under the per-plugin
//! deadline.

use core::time::Duration;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Instant;

use preflight_plugin::{Plugin, PreCompileContext};
use preflight_scheduler::{ModuleTarget, PluginRecord};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::oneshot;

use crate::error::WorkerError;
use crate::hook;
use crate::limits::ResourceLimits;
use crate::protocol::{WORKER_FLAG, WorkerRequest, WorkerResponse};
use crate::report::ExecutionItem;

/// How a worker ended.
#[derive(Debug)]
pub(crate) enum WorkerOutcome {
    /// The worker delivered a result.
    Completed(WorkerResponse),
    /// The deadline passed first.
    TimedOut(Duration),
    /// The worker ended without delivering a result.
    NoResult(String),
    /// The worker could not be driven.
    Failed(WorkerError),
}

impl WorkerOutcome {
    pub(crate) fn into_item(self, plugin_id: String, name: String, elapsed: Duration) -> ExecutionItem {
        match self {
            WorkerOutcome::Completed(response) => {
                let elapsed = Duration::try_from_secs_f64(response.duration_ms / 1000.0).unwrap_or(elapsed);
                if response.ok {
                    ExecutionItem::succeeded(plugin_id, name, elapsed)
                } else {
                    ExecutionItem::failed(plugin_id, name, elapsed, response.error)
                }
            }
            WorkerOutcome::TimedOut(limit) => {
                ExecutionItem::failed(plugin_id, name, elapsed, format!("timed out after {limit:?}"))
            }
            WorkerOutcome::NoResult(reason) => ExecutionItem::failed(
                plugin_id,
                name,
                elapsed,
                format!("no result returned ({reason})"),
            ),
            WorkerOutcome::Failed(error) => ExecutionItem::failed(plugin_id, name, elapsed, error.to_string()),
        }
    }
}

/// One hook invocation in isolation.
pub(crate) enum Worker {
    /// Runs the hook on a dedicated OS thread of this process.
    Thread(Arc<dyn Plugin>),
    /// Runs the hook in a child process launched from the module target.
    Process(ModuleTarget),
}

impl Worker {
    /// Picks the worker kind for a record.
    pub(crate) fn for_record(record: &PluginRecord) -> Self {
        match record.module() {
            Some(target) => Worker::Process(target.clone()),
            None => Worker::Thread(Arc::clone(record.plugin())),
        }
    }

    /// Runs the worker to completion or until the deadline.
    pub(crate) async fn run(
        self,
        plugin_id: &str,
        ctx: Arc<PreCompileContext>,
        limits: ResourceLimits,
        timeout: Option<Duration>,
    ) -> WorkerOutcome {
        match self {
            Worker::Thread(plugin) => run_thread(plugin, ctx, timeout).await,
            Worker::Process(target) => {
                let request = WorkerRequest {
                    plugin_id: plugin_id.to_string(),
                    module_name: target.name.clone(),
                    project_root: ctx.project_root().to_path_buf(),
                    config: ctx.config().clone(),
                    limits,
                };
                match run_process(&target, &request, timeout).await {
                    Ok(outcome) => outcome,
                    Err(error) => WorkerOutcome::Failed(error),
                }
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Thread worker
// ─────────────────────────────────────────────────────────────────────────────

/// A thread cannot be killed. The hook gets its own child of the context's
/// cancellation token; on timeout that token is cancelled, the thread is
/// detached and its late result dropped with the receiver.
async fn run_thread(
    plugin: Arc<dyn Plugin>,
    ctx: Arc<PreCompileContext>,
    timeout: Option<Duration>,
) -> WorkerOutcome {
    let (tx, rx) = oneshot::channel();
    let plugin_id = plugin.meta().id().to_string();
    let token = ctx.cancellation().child_token();
    let worker_ctx = ctx.as_ref().clone().with_cancellation(token.clone());

    let spawned = std::thread::Builder::new()
        .name(format!("preflight-{plugin_id}"))
        .spawn(move || {
            let start = Instant::now();
            let result = hook::invoke(plugin.as_ref(), &worker_ctx);
            let _ = tx.send(WorkerResponse::from_result(result, start.elapsed()));
        });
    if let Err(error) = spawned {
        return WorkerOutcome::Failed(WorkerError::Spawn(error));
    }

    let received = match timeout {
        Some(limit) => match tokio::time::timeout(limit, rx).await {
            Ok(received) => received,
            Err(_) => {
                token.cancel();
                tracing::warn!(
                    plugin = %plugin_id,
                    timeout = ?limit,
                    "thread worker timed out; cancellation requested, thread left detached"
                );
                return WorkerOutcome::TimedOut(limit);
            }
        },
        None => rx.await,
    };

    match received {
        Ok(response) => WorkerOutcome::Completed(response),
        Err(_) => WorkerOutcome::NoResult("worker thread dropped its result channel".to_string()),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Process worker
// ─────────────────────────────────────────────────────────────────────────────

async fn run_process(
    target: &ModuleTarget,
    request: &WorkerRequest,
    timeout: Option<Duration>,
) -> Result<WorkerOutcome, WorkerError> {
    let payload = serde_json::to_vec(request)?;

    let mut child = Command::new(&target.path)
        .arg(WORKER_FLAG)
        .current_dir(&request.project_root)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
        .map_err(WorkerError::Spawn)?;

    tracing::debug!(
        plugin = %request.plugin_id,
        pid = child.id(),
        executable = %target.path.display(),
        "worker process started"
    );

    let mut stdin = child.stdin.take().ok_or(WorkerError::Pipe("stdin"))?;
    let stdout = child.stdout.take().ok_or(WorkerError::Pipe("stdout"))?;
    let plugin_id = request.plugin_id.as_str();

    let exchange = async {
        // A worker that dies before reading its request closes the pipe;
        // the exit status tells the rest.
        if let Err(error) = stdin.write_all(&payload).await {
            tracing::debug!(plugin = %plugin_id, %error, "failed to send worker request");
        }
        drop(stdin);

        let (status, response) = tokio::join!(child.wait(), read_response(stdout, plugin_id));
        Ok::<_, WorkerError>((status?, response?))
    };

    let finished = match timeout {
        Some(limit) => {
            let result = tokio::time::timeout(limit, exchange).await;
            match result {
                Ok(finished) => finished?,
                Err(_) => {
                    terminate(&mut child, plugin_id).await;
                    return Ok(WorkerOutcome::TimedOut(limit));
                }
            }
        }
        None => exchange.await?,
    };

    let (status, response) = finished;
    Ok(match response {
        Some(response) => WorkerOutcome::Completed(response),
        None => WorkerOutcome::NoResult(exit_reason(status)),
    })
}

async fn read_response(stdout: ChildStdout, plugin_id: &str) -> std::io::Result<Option<WorkerResponse>> {
    let mut lines = BufReader::new(stdout).lines();
    let mut response = None;
    while let Some(line) = lines.next_line().await? {
        match WorkerResponse::parse_line(&line) {
            Some(Ok(parsed)) => response = Some(parsed),
            Some(Err(error)) => {
                tracing::warn!(plugin = %plugin_id, %error, "malformed worker result line");
            }
            None => tracing::debug!(plugin = %plugin_id, "{line}"),
        }
    }
    Ok(response)
}

async fn terminate(child: &mut Child, plugin_id: &str) {
    match child.kill().await {
        Ok(()) => tracing::debug!(plugin = %plugin_id, "worker process killed"),
        Err(error) => tracing::warn!(plugin = %plugin_id, %error, "failed to kill worker process"),
    }
}

fn exit_reason(status: ExitStatus) -> String {
    format!("worker exited with {status}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicBool, Ordering};
    use preflight_plugin::{HookError, PluginMeta};

    struct Sleepy {
        meta: PluginMeta,
        nap: Duration,
    }

    impl Plugin for Sleepy {
        fn meta(&self) -> &PluginMeta {
            &self.meta
        }

        fn on_pre_compile(&self, _ctx: &PreCompileContext) -> Result<(), HookError> {
            std::thread::sleep(self.nap);
            Ok(())
        }
    }

    fn sleepy(nap: Duration) -> Arc<dyn Plugin> {
        Arc::new(Sleepy {
            meta: PluginMeta::new("sleepy", "Sleepy", "1").unwrap(),
            nap,
        })
    }

    /// Works until cancelled, recording whether it saw the request.
    struct Cooperative {
        meta: PluginMeta,
        stopped: Arc<AtomicBool>,
    }

    impl Plugin for Cooperative {
        fn meta(&self) -> &PluginMeta {
            &self.meta
        }

        fn on_pre_compile(&self, ctx: &PreCompileContext) -> Result<(), HookError> {
            let start = Instant::now();
            while start.elapsed() < Duration::from_secs(5) {
                if ctx.is_cancelled() {
                    self.stopped.store(true, Ordering::SeqCst);
                    return Err(HookError::msg("cancelled"));
                }
                std::thread::sleep(Duration::from_millis(5));
            }
            Ok(())
        }
    }

    fn ctx() -> Arc<PreCompileContext> {
        Arc::new(PreCompileContext::new("."))
    }

    #[tokio::test]
    async fn thread_worker_completes() {
        let outcome = run_thread(sleepy(Duration::ZERO), ctx(), Some(Duration::from_secs(5))).await;
        assert!(matches!(outcome, WorkerOutcome::Completed(ref r) if r.ok));
    }

    #[tokio::test]
    async fn thread_worker_times_out() {
        let limit = Duration::from_millis(50);
        let outcome = run_thread(sleepy(Duration::from_millis(500)), ctx(), Some(limit)).await;
        assert!(matches!(outcome, WorkerOutcome::TimedOut(l) if l == limit));
    }

    #[tokio::test]
    async fn timed_out_thread_worker_is_cancelled() {
        let stopped = Arc::new(AtomicBool::new(false));
        let plugin: Arc<dyn Plugin> = Arc::new(Cooperative {
            meta: PluginMeta::new("cooperative", "Cooperative", "1").unwrap(),
            stopped: Arc::clone(&stopped),
        });
        let shared = ctx();

        let outcome = run_thread(plugin, Arc::clone(&shared), Some(Duration::from_millis(50))).await;
        assert!(matches!(outcome, WorkerOutcome::TimedOut(_)));

        let deadline = Instant::now() + Duration::from_secs(2);
        while !stopped.load(Ordering::SeqCst) && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(stopped.load(Ordering::SeqCst), "hook never observed cancellation");
        assert!(!shared.is_cancelled(), "only the worker's own token is cancelled");
    }

    #[tokio::test]
    async fn missing_executable_fails_to_spawn() {
        let target = ModuleTarget {
            path: "/nonexistent/preflight-host".into(),
            name: None,
        };
        let request = WorkerRequest {
            plugin_id: "x".into(),
            module_name: None,
            project_root: ".".into(),
            config: Default::default(),
            limits: ResourceLimits::default(),
        };
        let err = run_process(&target, &request, None).await.unwrap_err();
        assert!(matches!(err, WorkerError::Spawn(_)));
    }

    #[test]
    fn outcomes_map_to_items() {
        let elapsed = Duration::from_millis(7);
        let item = WorkerOutcome::TimedOut(Duration::from_secs(3)).into_item("a".into(), "A".into(), elapsed);
        assert!(!item.success);
        assert_eq!(item.error, "timed out after 3s");

        let item = WorkerOutcome::NoResult("worker exited with signal: 9".into()).into_item("a".into(), "A".into(), elapsed);
        assert_eq!(item.error, "no result returned (worker exited with signal: 9)");

        let response = WorkerResponse {
            ok: true,
            error: String::new(),
            duration_ms: 2.0,
        };
        let item = WorkerOutcome::Completed(response).into_item("a".into(), "A".into(), elapsed);
        assert!(item.success);
        assert!((item.duration_ms - 2.0).abs() < 1e-9);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn process_without_result_line_reports_exit_status() {
        let target = ModuleTarget {
            path: "/bin/sh".into(),
            name: None,
        };
        let request = WorkerRequest {
            plugin_id: "x".into(),
            module_name: None,
            project_root: std::env::temp_dir(),
            config: Default::default(),
            limits: ResourceLimits::default(),
        };
        // `sh --preflight-worker` rejects the unknown option and exits non-zero.
        let outcome = run_process(&target, &request, Some(Duration::from_secs(5))).await.unwrap();
        match outcome {
            WorkerOutcome::NoResult(reason) => assert!(reason.starts_with("worker exited with")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
