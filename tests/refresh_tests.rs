//! Tests for the refresh orchestrator under real concurrency.
//!
//! Tests cover: overlapping refresh suppression while collectors are held
//! in flight, one Idle transition per completed batch, and operation
//! reports on the event channel.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;

use dockdash::dashboard::{
    DashboardEvent, RefreshBundle, RefreshOrchestrator, RefreshPlan, RefreshState,
};
use dockdash::docker::{DockerCli, Operation};
use dockdash::test_utils::{FakeExecutor, Gate};

const WAIT: Duration = Duration::from_secs(5);

fn scripted() -> FakeExecutor {
    FakeExecutor::new()
        .respond(&["ps", "--all"], "abc|web|running|Up|nginx\n", 0)
        .respond(&["images"], "sha256:1|nginx|latest|187MB\n", 0)
        .respond(&["volume", "ls"], "pgdata|local\n", 0)
        .respond(&["stats"], "1.0%|10MiB\n", 0)
        .respond(&["ps", "--quiet"], "", 0)
}

fn orchestrator(
    fake: &Arc<FakeExecutor>,
) -> (
    Arc<RefreshOrchestrator>,
    mpsc::UnboundedReceiver<DashboardEvent>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let cli = Arc::new(DockerCli::new(fake.clone(), "docker"));
    let orch = RefreshOrchestrator::new(cli, RefreshPlan::default(), tx, Handle::current());
    (Arc::new(orch), rx)
}

async fn wait_for_idle(orch: &RefreshOrchestrator) {
    let deadline = tokio::time::Instant::now() + WAIT;
    while orch.state() != RefreshState::Idle {
        assert!(tokio::time::Instant::now() < deadline, "refresh never returned to idle");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

async fn next_bundle(rx: &mut mpsc::UnboundedReceiver<DashboardEvent>) -> RefreshBundle {
    loop {
        let event = tokio::time::timeout(WAIT, rx.recv())
            .await
            .expect("timed out waiting for refresh")
            .expect("channel closed");
        if let DashboardEvent::Refreshed(bundle) = event {
            return bundle;
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_second_request_while_refreshing_spawns_nothing() {
    let gate = Gate::new();
    let fake = Arc::new(scripted().with_gate(Arc::clone(&gate)));
    let (orch, mut rx) = orchestrator(&fake);

    assert!(orch.request_refresh());

    // All four collectors are now blocked inside the executor.
    let held = {
        let gate = Arc::clone(&gate);
        tokio::task::spawn_blocking(move || gate.wait_for_waiters(4, WAIT))
            .await
            .expect("join")
    };
    assert!(held);
    assert_eq!(orch.state(), RefreshState::Refreshing);
    assert_eq!(fake.call_count(), 4);

    for _ in 0..10 {
        assert!(!orch.request_refresh());
    }
    assert_eq!(fake.call_count(), 4);
    assert_eq!(orch.completed_cycles(), 0);

    gate.open();
    let bundle = next_bundle(&mut rx).await;

    assert_eq!(bundle.containers.len(), 1);
    wait_for_idle(&orch).await;
    assert_eq!(orch.completed_cycles(), 1);
    assert_eq!(fake.call_count(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_one_idle_transition_per_batch() {
    let fake = Arc::new(scripted());
    let (orch, mut rx) = orchestrator(&fake);

    for cycle in 1..=3u64 {
        assert!(orch.request_refresh());
        let _ = next_bundle(&mut rx).await;
        wait_for_idle(&orch).await;
        assert_eq!(orch.completed_cycles(), cycle);
    }

    assert_eq!(fake.call_count(), 12);
    assert_eq!(fake.count_calls(&["stats", "--no-stream"]), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stop_all_with_nothing_running_reports_failure() {
    let fake = Arc::new(scripted());
    let (orch, mut rx) = orchestrator(&fake);

    let report = orch.run_operation(&Operation::StopAll);
    assert!(!report.success);
    assert_eq!(report.operation, "stop all containers");

    let first = tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("timed out")
        .expect("channel closed");
    assert!(matches!(first, DashboardEvent::OperationCompleted(ref r) if *r == report));

    let _ = next_bundle(&mut rx).await;
    assert_eq!(fake.count_calls(&["stop"]), 0);
}
