//! Dashboard core: refresh orchestration and presentation events.
//!
//! The presentation layer owns the receiving end of an unbounded channel of
//! [`DashboardEvent`]s. Bundles move through the channel; nothing is shared
//! mutably between the core and the display.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use dockdash::dashboard::{DashboardEvent, RefreshOrchestrator, RefreshPlan, spawn_poller};
//! use dockdash::docker::DockerCli;
//!
//! # async fn run() {
//! let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
//! let orchestrator = Arc::new(RefreshOrchestrator::new(
//!     Arc::new(DockerCli::system()),
//!     RefreshPlan::default(),
//!     tx,
//!     tokio::runtime::Handle::current(),
//! ));
//! let _poller = spawn_poller(orchestrator, Duration::from_secs(5));
//!
//! while let Some(DashboardEvent::Refreshed(bundle)) = rx.recv().await {
//!     println!("{} containers", bundle.containers.len());
//! }
//! # }
//! ```

pub mod events;
pub mod orchestrator;
pub mod poller;

pub use events::{DashboardEvent, OperationReport};
pub use orchestrator::{Listing, RefreshBundle, RefreshOrchestrator, RefreshPlan, RefreshState};
pub use poller::{DEFAULT_POLL_INTERVAL, spawn_poller};
