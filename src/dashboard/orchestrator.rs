//! Background refresh orchestration.
//!
//! A refresh runs the four snapshot collectors concurrently on tokio's
//! blocking pool, joins their results into one [`RefreshBundle`] and sends
//! it to the presentation layer. At most one refresh is in flight; requests
//! made while one is running are dropped, not queued.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task;
use tracing::{debug, error, info, warn};

use super::events::{DashboardEvent, OperationReport};
pub use crate::docker::Listing;
use crate::docker::{
    ContainerRecord, DockerCli, ImageRecord, Operation, SystemSnapshot, VolumeRecord,
};

/// Which image and volume listings a refresh collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefreshPlan {
    /// Image listing.
    pub images: Listing,
    /// Volume listing.
    pub volumes: Listing,
}

impl RefreshPlan {
    /// Plan that lists only dangling images and volumes.
    #[must_use]
    pub fn cleanup() -> Self {
        Self {
            images: Listing::Dangling,
            volumes: Listing::Dangling,
        }
    }
}

/// One complete snapshot produced by a refresh cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RefreshBundle {
    /// Every container, whatever its state.
    pub containers: Vec<ContainerRecord>,
    /// Images, per the plan.
    pub images: Vec<ImageRecord>,
    /// Volumes, per the plan.
    pub volumes: Vec<VolumeRecord>,
    /// Aggregated resource usage.
    pub snapshot: SystemSnapshot,
}

impl RefreshBundle {
    /// Running containers.
    pub fn running(&self) -> impl Iterator<Item = &ContainerRecord> {
        self.containers.iter().filter(|c| c.state.is_running())
    }

    /// Exited, created and dead containers.
    pub fn stopped(&self) -> impl Iterator<Item = &ContainerRecord> {
        self.containers.iter().filter(|c| c.state.is_stopped())
    }
}

/// Whether a refresh is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    /// No refresh running; the next request starts one.
    Idle,
    /// A refresh is running; requests are dropped.
    Refreshing,
}

#[derive(Debug, Default)]
struct Shared {
    refreshing: AtomicBool,
    completed: AtomicU64,
}

/// Returns the orchestrator to Idle however the refresh task ends.
struct RefreshGuard {
    shared: Arc<Shared>,
}

impl RefreshGuard {
    /// Counts the cycle as completed, then releases the refresh slot.
    fn finish(self) {
        self.shared.completed.fetch_add(1, Ordering::AcqRel);
    }
}

impl Drop for RefreshGuard {
    fn drop(&mut self) {
        self.shared.refreshing.store(false, Ordering::Release);
    }
}

/// Runs refresh cycles and lifecycle operations for the presentation layer.
pub struct RefreshOrchestrator {
    cli: Arc<DockerCli>,
    plan: RefreshPlan,
    events: mpsc::UnboundedSender<DashboardEvent>,
    handle: Handle,
    shared: Arc<Shared>,
}

impl fmt::Debug for RefreshOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshOrchestrator")
            .field("cli", &self.cli)
            .field("plan", &self.plan)
            .field("state", &self.state())
            .field("completed_cycles", &self.completed_cycles())
            .finish_non_exhaustive()
    }
}

impl RefreshOrchestrator {
    /// Creates an orchestrator that spawns refreshes on `handle` and
    /// delivers events on `events`.
    #[must_use]
    pub fn new(
        cli: Arc<DockerCli>,
        plan: RefreshPlan,
        events: mpsc::UnboundedSender<DashboardEvent>,
        handle: Handle,
    ) -> Self {
        Self {
            cli,
            plan,
            events,
            handle,
            shared: Arc::new(Shared::default()),
        }
    }

    /// The runtime front end used for collection and operations.
    #[must_use]
    pub fn cli(&self) -> &Arc<DockerCli> {
        &self.cli
    }

    /// The tokio runtime refreshes are spawned on.
    #[must_use]
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// The listings each refresh collects.
    #[must_use]
    pub fn plan(&self) -> RefreshPlan {
        self.plan
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> RefreshState {
        if self.shared.refreshing.load(Ordering::Acquire) {
            RefreshState::Refreshing
        } else {
            RefreshState::Idle
        }
    }

    /// Number of refresh cycles that have produced a bundle.
    #[must_use]
    pub fn completed_cycles(&self) -> u64 {
        self.shared.completed.load(Ordering::Acquire)
    }

    /// Starts a refresh unless one is already running.
    ///
    /// Returns true if a refresh was launched.
    pub fn request_refresh(&self) -> bool {
        if self
            .shared
            .refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Refresh already in flight, request dropped");
            return false;
        }

        // Created before spawning so a runtime that refuses the task still
        // drops it and releases the slot.
        let guard = RefreshGuard {
            shared: Arc::clone(&self.shared),
        };
        let cli = Arc::clone(&self.cli);
        let plan = self.plan;
        let events = self.events.clone();

        self.handle.spawn(async move {
            let bundle = collect(cli, plan).await;
            debug!(
                "Refresh collected {} containers, {} images, {} volumes",
                bundle.containers.len(),
                bundle.images.len(),
                bundle.volumes.len()
            );

            // Bundles are queued in cycle order: send, then release the slot.
            if events.send(DashboardEvent::Refreshed(bundle)).is_err() {
                warn!("Refresh bundle dropped: event receiver is gone");
            }

            guard.finish();
        });

        true
    }

    /// Runs a lifecycle operation on the calling thread, reports it and
    /// requests a refresh.
    pub fn run_operation(&self, operation: &Operation) -> OperationReport {
        info!("Operation requested: {}", operation);
        let result = self.cli.perform(operation);
        let report = OperationReport::new(operation, &result);

        if self
            .events
            .send(DashboardEvent::OperationCompleted(report.clone()))
            .is_err()
        {
            warn!("Operation report dropped: event receiver is gone");
        }

        self.request_refresh();
        report
    }
}

/// Runs the four collectors concurrently and joins their results.
async fn collect(cli: Arc<DockerCli>, plan: RefreshPlan) -> RefreshBundle {
    let (containers, images, volumes, snapshot) = tokio::join!(
        blocking(&cli, "containers", |cli| cli.all_containers()),
        blocking(&cli, "images", move |cli| cli.images(plan.images)),
        blocking(&cli, "volumes", move |cli| cli.volumes(plan.volumes)),
        blocking(&cli, "stats", |cli| cli.system_snapshot()),
    );

    RefreshBundle {
        containers,
        images,
        volumes,
        snapshot,
    }
}

/// Runs one collector on the blocking pool; a panicked collector yields
/// its empty value.
async fn blocking<T, F>(cli: &Arc<DockerCli>, name: &'static str, collector: F) -> T
where
    T: Default + Send + 'static,
    F: FnOnce(&DockerCli) -> T + Send + 'static,
{
    let cli = Arc::clone(cli);
    match task::spawn_blocking(move || collector(&cli)).await {
        Ok(value) => value,
        Err(e) => {
            error!("{} collector failed: {}", name, e);
            T::default()
        }
    }
}
