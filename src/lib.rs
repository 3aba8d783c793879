//! Dockdash
//!
//! A polling dashboard core for a local container runtime. It shells out to
//! the runtime CLI, parses its listings into typed snapshots and hands them
//! to a presentation layer without blocking it.
//!
//! # Architecture
//!
//! - **Docker Module**: command execution, runtime discovery, identifier
//!   validation, snapshot collectors and lifecycle operations
//! - **Dashboard Module**: background refresh orchestration, polling and
//!   presentation events
//! - **Config / Logging**: `~/.dockdash/config.toml` and file logs
//!
//! # Usage
//!
//! ```no_run
//! use dockdash::docker::{DockerCli, Operation};
//!
//! let cli = DockerCli::system();
//! if cli.is_available() {
//!     for container in cli.running_containers() {
//!         println!("{} {}", container.name, container.status);
//!     }
//!     let _ = cli.perform(&Operation::StopAll);
//! } else {
//!     eprintln!("{}", cli.last_error());
//! }
//! ```

// Clippy configuration - allow common patterns
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

pub mod config;
pub mod dashboard;
pub mod docker;
pub mod logging;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export main types
pub use config::{Config, ConfigError};
pub use dashboard::{DashboardEvent, OperationReport, RefreshBundle, RefreshOrchestrator};
pub use docker::{DockerCli, LifecycleError, Operation, RuntimeAvailability};
