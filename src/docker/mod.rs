//! Container runtime access through its command-line client.
//!
//! Provides functionality for:
//! - Running runtime commands as argument vectors (or shell lines)
//! - Locating the runtime executable and classifying its availability
//! - Validating identifiers before they reach a command line
//! - Collecting container, image, volume and resource snapshots
//! - Stopping and removing containers, images and volumes
//!
//! # Failure model
//!
//! Nothing here panics on runtime failure. Collectors return empty
//! collections when a query fails; lifecycle operations return
//! [`LifecycleError`].

pub mod cli;
pub mod command;
pub mod identifier;
pub mod lifecycle;
pub mod locator;
pub mod parse;
pub mod records;

pub use cli::{CONTAINER_FORMAT, DockerCli, IMAGE_FORMAT, Listing, STATS_FORMAT, VOLUME_FORMAT};
pub use command::{
    CommandOutcome, Executor, ProcessExecutor, RuntimeCommand, SPAWN_FAILURE_EXIT_CODE,
    ShellExecutor, execute_shell,
};
pub use identifier::{MAX_IDENTIFIER_LEN, is_valid_identifier};
pub use lifecycle::{LifecycleError, Operation};
pub use locator::{RuntimeAvailability, RuntimeLocator, locate_runtime};
pub use records::{ContainerRecord, ContainerState, ImageRecord, SystemSnapshot, VolumeRecord};
