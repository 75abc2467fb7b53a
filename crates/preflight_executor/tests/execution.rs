//! End-to-end runs of the sequential and parallel executors with in-process
//! (thread) workers.


use core::time::Duration;

use preflight_executor::{Executor, RunConfig};
use preflight_scheduler::resolve_order;
use test_utils::{Behavior, Event, Journal, Probe, context, registry_of};

fn sequential() -> Executor {
    Executor::new(RunConfig::default().with_sandbox(false))
}

fn parallel(workers: usize) -> Executor {
    Executor::new(
        RunConfig::default()
            .with_parallelism(workers)
            .with_timeout(Some(Duration::from_secs(10))),
    )
}

// ═══════════════════════════════════════════════════════════════════════════════
// SEQUENTIAL
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn sequential_follows_scheduler_order_and_continues_after_failure() {
    let journal = Journal::new();
    let registry = registry_of([
        Probe::new("lint", &journal).tags(&["lint"]),
        Probe::new("check", &journal).tags(&["check"]).behavior(Behavior::Fail),
        Probe::new("headers", &journal).tags(&["license"]).requires(&["check"]),
        Probe::new("wipe", &journal).tags(&["clean"]),
    ]);

    let report = sequential().run_sequential(&registry, &context());

    assert_eq!(report.plugin_ids(), ["wipe", "check", "headers", "lint"]);
    assert_eq!(report.plugin_ids(), resolve_order(&registry));
    assert!(!report.ok());
    assert_eq!(report.failures().count(), 1);
    assert_eq!(report.get("check").unwrap().error, "check failed on purpose");
    assert!(report.get("headers").unwrap().success);
}

#[test]
fn sequential_catches_panics() {
    let journal = Journal::new();
    let registry = registry_of([
        Probe::new("boom", &journal).priority(0).behavior(Behavior::Panic),
        Probe::new("after", &journal).priority(1),
    ]);

    let report = sequential().run_sequential(&registry, &context());

    let boom = report.get("boom").unwrap();
    assert!(!boom.success);
    assert_eq!(boom.error, "panicked: boom panicked on purpose");
    assert!(report.get("after").unwrap().success);
    assert_eq!(report.summary().split(',').next(), Some("Plugins: 1/2 ok"));
}

#[test]
fn inactive_plugins_do_not_run() {
    let journal = Journal::new();
    let mut registry = registry_of([Probe::new("a", &journal), Probe::new("b", &journal)]);
    registry.disable("a");

    let report = sequential().run_sequential(&registry, &context());

    assert_eq!(report.plugin_ids(), ["b"]);
    assert_eq!(journal.started(), ["b"]);
}

#[tokio::test]
async fn disabled_configuration_runs_nothing() {
    let journal = Journal::new();
    let registry = registry_of([Probe::new("a", &journal)]);
    let executor = Executor::new(RunConfig {
        enabled: false,
        ..RunConfig::default()
    });

    let report = executor.run(&registry, context()).await;

    assert!(report.is_empty());
    assert!(report.ok());
    assert!(journal.events().is_empty());
}

#[tokio::test]
async fn unsandboxed_run_matches_sequential_run() {
    let journal = Journal::new();
    let build = || {
        registry_of([
            Probe::new("c", &journal).requires(&["a"]),
            Probe::new("a", &journal).tags(&["setup"]),
            Probe::new("b", &journal).tags(&["clean"]).behavior(Behavior::Fail),
        ])
    };

    let direct = sequential().run_sequential(&build(), &context());
    let via_run = sequential().run(&build(), context()).await;
    let single_worker = parallel(1).run(&build(), context()).await;

    assert_eq!(direct.plugin_ids(), via_run.plugin_ids());
    assert_eq!(direct.plugin_ids(), single_worker.plugin_ids());
    let outcomes = |r: &preflight_executor::ExecutionReport| {
        r.iter().map(|i| (i.plugin_id.clone(), i.success)).collect::<Vec<_>>()
    };
    assert_eq!(outcomes(&direct), outcomes(&via_run));
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARALLEL
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn parallel_respects_worker_bound() {
    let journal = Journal::new();
    let nap = Behavior::Sleep(Duration::from_millis(60));
    let registry = registry_of((0..6).map(|i| Probe::new(&format!("p{i}"), &journal).behavior(nap)));

    let report = parallel(2).run(&registry, context()).await;

    assert!(report.ok());
    assert_eq!(report.len(), 6);
    assert!(journal.peak() <= 2, "peak concurrency was {}", journal.peak());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn parallel_runs_independent_plugins_concurrently() {
    let journal = Journal::new();
    let nap = Behavior::Sleep(Duration::from_millis(200));
    let registry = registry_of((0..3).map(|i| Probe::new(&format!("p{i}"), &journal).behavior(nap)));

    let report = parallel(3).run(&registry, context()).await;

    assert!(report.ok());
    assert!(journal.peak() >= 2, "peak concurrency was {}", journal.peak());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dependencies_finish_before_dependents_start() {
    let journal = Journal::new();
    let nap = Behavior::Sleep(Duration::from_millis(30));
    let registry = registry_of([
        Probe::new("top", &journal).requires(&["left", "right"]),
        Probe::new("left", &journal).requires(&["base"]).behavior(nap),
        Probe::new("right", &journal).requires(&["base"]).behavior(nap),
        Probe::new("base", &journal).behavior(nap),
        Probe::new("loner", &journal).behavior(nap),
    ]);

    let report = parallel(4).run(&registry, context()).await;

    assert!(report.ok());
    assert_eq!(report.len(), 5);
    let at = |e: Event| journal.index_of(&e).unwrap();
    for (dep, child) in [("base", "left"), ("base", "right"), ("left", "top"), ("right", "top")] {
        assert!(
            at(Event::End(dep.into())) < at(Event::Start(child.into())),
            "{child} started before {dep} finished"
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_dependency_still_releases_dependents() {
    let journal = Journal::new();
    let registry = registry_of([
        Probe::new("gen", &journal).behavior(Behavior::Fail),
        Probe::new("use", &journal).requires(&["gen"]),
    ]);

    let report = parallel(2).run(&registry, context()).await;

    assert_eq!(report.plugin_ids(), ["gen", "use"]);
    assert!(!report.get("gen").unwrap().success);
    assert!(report.get("use").unwrap().success);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn timed_out_plugin_is_reported_and_siblings_finish() {
    let journal = Journal::new();
    let registry = registry_of([
        Probe::new("slow", &journal).behavior(Behavior::Sleep(Duration::from_secs(2))),
        Probe::new("quick", &journal),
        Probe::new("after", &journal).requires(&["slow"]),
    ]);
    let executor = Executor::new(
        RunConfig::default()
            .with_parallelism(2)
            .with_timeout(Some(Duration::from_millis(100))),
    );

    let report = executor.run(&registry, context()).await;

    let slow = report.get("slow").unwrap();
    assert!(!slow.success);
    assert_eq!(slow.error, "timed out after 100ms");
    assert!(report.get("quick").unwrap().success);
    assert!(report.get("after").unwrap().success);
    assert_eq!(report.len(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn panicking_worker_becomes_failed_item() {
    let journal = Journal::new();
    let registry = registry_of([
        Probe::new("boom", &journal).behavior(Behavior::Panic),
        Probe::new("fine", &journal),
    ]);

    let report = parallel(2).run(&registry, context()).await;

    assert_eq!(report.get("boom").unwrap().error, "panicked: boom panicked on purpose");
    assert!(report.get("fine").unwrap().success);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cyclic_plugins_each_run_once() {
    let journal = Journal::new();
    let registry = registry_of([
        Probe::new("a", &journal).requires(&["b"]).priority(2),
        Probe::new("b", &journal).requires(&["a"]).priority(1),
        Probe::new("c", &journal).requires(&["a", "missing"]),
    ]);

    let report = parallel(3).run(&registry, context()).await;

    let mut ids = report.plugin_ids();
    ids.sort_unstable();
    assert_eq!(ids, ["a", "b", "c"]);
    assert!(
        journal.index_of(&Event::End("b".into())) < journal.index_of(&Event::Start("a".into()))
    );
    assert!(
        journal.index_of(&Event::End("a".into())) < journal.index_of(&Event::Start("c".into()))
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn ready_plugins_launch_in_key_order() {
    let journal = Journal::new();
    let registry = registry_of([
        Probe::new("lint", &journal).tags(&["lint"]),
        Probe::new("minify", &journal).tags(&["minify"]),
        Probe::new("verify", &journal).tags(&["verify"]),
        Probe::new("clean", &journal).tags(&["clean"]),
    ]);

    let report = parallel(2).run(&registry, context()).await;

    assert!(report.ok());
    let started = journal.started();
    let pos = |id: &str| started.iter().position(|s| s == id).unwrap();
    assert!(pos("clean") < pos("lint"));
    assert!(pos("verify") < pos("minify"));
}
