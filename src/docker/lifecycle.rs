//! Lifecycle operations: stop, remove and prune.
//!
//! Every user-supplied identifier is validated before a command is built;
//! an invalid one fails the operation without spawning anything.

use thiserror::Error;
use tracing::{info, warn};

use super::cli::DockerCli;
use super::identifier::is_valid_identifier;
use super::parse::parse_id_list;

/// Why a lifecycle operation failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// The identifier failed validation and never reached the runtime.
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    /// Stop-all found no running containers.
    #[error("no running containers to stop")]
    NothingToStop,

    /// The running-container query for stop-all failed.
    #[error("listing running containers failed with exit code {exit_code}")]
    QueryFailed {
        /// Exit code of the query.
        exit_code: i32,
    },

    /// The runtime rejected the command.
    #[error("{operation} failed with exit code {exit_code}")]
    CommandFailed {
        /// Short name of the operation.
        operation: &'static str,
        /// Exit code of the command.
        exit_code: i32,
        /// Whatever the command printed.
        output: String,
    },
}

/// A lifecycle operation requested by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Stop one container.
    Stop(String),
    /// Stop every running container in one batch.
    StopAll,
    /// Remove one container.
    RemoveContainer(String),
    /// Remove one image.
    RemoveImage(String),
    /// Remove one volume.
    RemoveVolume(String),
    /// Remove all unused containers, images, volumes and build cache.
    PruneAll,
}

impl Operation {
    /// Short name used in reports and logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Stop(_) => "stop container",
            Self::StopAll => "stop all containers",
            Self::RemoveContainer(_) => "remove container",
            Self::RemoveImage(_) => "remove image",
            Self::RemoveVolume(_) => "remove volume",
            Self::PruneAll => "prune system",
        }
    }

    /// The identifier this operation targets, if any.
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Stop(id)
            | Self::RemoveContainer(id)
            | Self::RemoveImage(id)
            | Self::RemoveVolume(id) => Some(id),
            Self::StopAll | Self::PruneAll => None,
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.target() {
            Some(target) => write!(f, "{} {}", self.label(), target),
            None => f.write_str(self.label()),
        }
    }
}

fn validate(token: &str) -> Result<(), LifecycleError> {
    if is_valid_identifier(token) {
        Ok(())
    } else {
        warn!("Rejected identifier {:?}", token);
        Err(LifecycleError::InvalidIdentifier(token.to_string()))
    }
}

/// Ends option parsing so identifiers starting with `-` stay operands.
const END_OF_OPTIONS: &str = "--";

/// Builds `subcommand -- operands...`.
fn with_operands<I, S>(subcommand: &[&str], operands: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    subcommand
        .iter()
        .map(|s| (*s).to_string())
        .chain(std::iter::once(END_OF_OPTIONS.to_string()))
        .chain(operands.into_iter().map(Into::into))
        .collect()
}

impl DockerCli {
    /// Runs one mutating command; `Ok` iff it exits 0.
    fn mutate(&self, operation: &'static str, args: Vec<String>) -> Result<(), LifecycleError> {
        let command = self.command(args);
        info!("Running {}: {}", operation, command.command_line());

        let outcome = self.run(&command);
        if outcome.is_success() {
            return Ok(());
        }

        warn!("{} failed with exit code {}", operation, outcome.exit_code);
        Err(LifecycleError::CommandFailed {
            operation,
            exit_code: outcome.exit_code,
            output: outcome.output.trim().to_string(),
        })
    }

    /// Stops one container.
    pub fn stop_container(&self, id: &str) -> Result<(), LifecycleError> {
        validate(id)?;
        self.mutate("stop", with_operands(&["stop"], [id]))
    }

    /// Stops every running container with a single batch command.
    ///
    /// Fails with [`LifecycleError::NothingToStop`] when nothing is running;
    /// no stop command is issued in that case.
    pub fn stop_all(&self) -> Result<(), LifecycleError> {
        let outcome = self.run(&self.command(["ps", "--quiet"]));
        if !outcome.is_success() {
            warn!("Listing running containers failed with exit code {}", outcome.exit_code);
            return Err(LifecycleError::QueryFailed {
                exit_code: outcome.exit_code,
            });
        }

        let ids = parse_id_list(&outcome.output);
        if ids.is_empty() {
            info!("Stop all requested with nothing running");
            return Err(LifecycleError::NothingToStop);
        }

        for id in &ids {
            validate(id)?;
        }

        self.mutate("stop all", with_operands(&["stop"], ids))
    }

    /// Removes one container.
    pub fn remove_container(&self, id: &str) -> Result<(), LifecycleError> {
        validate(id)?;
        self.mutate("rm", with_operands(&["rm"], [id]))
    }

    /// Removes one image.
    pub fn remove_image(&self, id: &str) -> Result<(), LifecycleError> {
        validate(id)?;
        self.mutate("rmi", with_operands(&["rmi"], [id]))
    }

    /// Removes one volume.
    pub fn remove_volume(&self, name: &str) -> Result<(), LifecycleError> {
        validate(name)?;
        self.mutate("volume rm", with_operands(&["volume", "rm"], [name]))
    }

    /// Removes all unused containers, images, volumes and build cache.
    ///
    /// Asks for no confirmation; that belongs to the caller.
    pub fn prune_all(&self) -> Result<(), LifecycleError> {
        self.mutate(
            "system prune",
            ["system", "prune", "--all", "--force", "--volumes"]
                .map(String::from)
                .to_vec(),
        )
    }

    /// Dispatches an [`Operation`].
    pub fn perform(&self, operation: &Operation) -> Result<(), LifecycleError> {
        match operation {
            Operation::Stop(id) => self.stop_container(id),
            Operation::StopAll => self.stop_all(),
            Operation::RemoveContainer(id) => self.remove_container(id),
            Operation::RemoveImage(id) => self.remove_image(id),
            Operation::RemoveVolume(name) => self.remove_volume(name),
            Operation::PruneAll => self.prune_all(),
        }
    }
}
