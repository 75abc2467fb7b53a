//! Sequential and bounded-parallel execution.

use core::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use preflight_plugin::PreCompileContext;
use preflight_scheduler::{CompositeKey, DependencyGraph, Registry, resolve_order};

use crate::config::RunConfig;
use crate::hook;
use crate::report::{ExecutionItem, ExecutionReport};
use crate::sandbox::Worker;

/// Runs the active plugins of a registry.
///
/// Cheap to construct; holds only the [`RunConfig`].
#[derive(Debug, Clone, Default)]
pub struct Executor {
    config: RunConfig,
}

impl Executor {
    /// Creates an executor.
    #[must_use]
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Runs every active plugin and reports the outcomes.
    ///
    /// Picks the sandboxed parallel mode when sandboxing is on and more
    /// than one worker is allowed; otherwise runs sequentially in-process.
    /// Must be called within a tokio runtime.
    pub async fn run(&self, registry: &Registry, ctx: Arc<PreCompileContext>) -> ExecutionReport {
        if !self.config.enabled {
            tracing::info!("plugin execution disabled by configuration");
            return ExecutionReport::default();
        }

        let order = resolve_order(registry);
        let parallelism = self.config.effective_parallelism();

        let report = if self.config.sandbox && parallelism > 1 {
            tracing::info!(parallelism, plugins = order.len(), "running plugins in sandboxed workers");
            self.run_parallel(registry, ctx, &order, parallelism).await
        } else {
            tracing::info!(
                sandbox = self.config.sandbox,
                parallelism,
                plugins = order.len(),
                "running plugins sequentially"
            );
            run_in_order(registry, &ctx, &order)
        };

        tracing::info!("{}", report.summary());
        report
    }

    /// Runs every active plugin in-process, one at a time, in scheduler
    /// order. No timeout applies.
    pub fn run_sequential(&self, registry: &Registry, ctx: &PreCompileContext) -> ExecutionReport {
        if !self.config.enabled {
            tracing::info!("plugin execution disabled by configuration");
            return ExecutionReport::default();
        }
        let order = resolve_order(registry);
        let report = run_in_order(registry, ctx, &order);
        tracing::info!("{}", report.summary());
        report
    }

    async fn run_parallel(
        &self,
        registry: &Registry,
        ctx: Arc<PreCompileContext>,
        order: &[String],
        parallelism: usize,
    ) -> ExecutionReport {
        let timeout = self.config.effective_timeout();
        let limits = self.config.limits;

        let mut graph = DependencyGraph::flattened(registry, order);
        let mut ready: BinaryHeap<Reverse<CompositeKey>> = graph
            .roots()
            .filter_map(|id| registry.key(id))
            .map(Reverse)
            .collect();
        let mut running: FuturesUnordered<BoxFuture<'static, ExecutionItem>> = FuturesUnordered::new();
        let mut report = ExecutionReport::default();

        loop {
            while running.len() < parallelism {
                let Some(Reverse(key)) = ready.pop() else {
                    break;
                };
                let Some(record) = registry.get(&key.id) else {
                    continue;
                };

                let plugin_id = key.id;
                let name = record.meta().name().to_string();
                let worker = Worker::for_record(record);
                let ctx = Arc::clone(&ctx);
                tracing::debug!(plugin = %plugin_id, "launching worker");

                running.push(
                    async move {
                        let start = Instant::now();
                        let outcome = worker.run(&plugin_id, ctx, limits, timeout).await;
                        outcome.into_item(plugin_id, name, start.elapsed())
                    }
                    .boxed(),
                );
            }

            let Some(item) = running.next().await else {
                break;
            };

            for child in graph.complete(&item.plugin_id) {
                if let Some(key) = registry.key(&child) {
                    ready.push(Reverse(key));
                }
            }
            log_item(&item);
            report.push(item);
        }

        if report.len() < order.len() {
            let unreached: Vec<&str> = order
                .iter()
                .map(String::as_str)
                .filter(|id| report.get(id).is_none())
                .collect();
            tracing::error!(plugins = ?unreached, "plugins never became ready");
        }

        report
    }
}

fn run_in_order(registry: &Registry, ctx: &PreCompileContext, order: &[String]) -> ExecutionReport {
    let mut report = ExecutionReport::default();
    for id in order {
        let Some(record) = registry.get(id) else {
            continue;
        };
        let start = Instant::now();
        let result = hook::invoke(record.plugin().as_ref(), ctx);
        let item = ExecutionItem::from_result(
            id.clone(),
            record.meta().name().to_string(),
            start.elapsed(),
            result,
        );
        log_item(&item);
        report.push(item);
    }
    report
}

fn log_item(item: &ExecutionItem) {
    if item.success {
        tracing::info!(
            plugin = %item.plugin_id,
            duration_ms = item.duration_ms,
            "plugin succeeded"
        );
    } else {
        tracing::warn!(
            plugin = %item.plugin_id,
            duration_ms = item.duration_ms,
            error = %item.error,
            "plugin failed"
        );
    }
}
