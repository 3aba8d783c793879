//! Runtime CLI front end: snapshot collectors and availability checks.
//!
//! Each collector issues one fixed query with diagnostics discarded and
//! parses the `|`-delimited output. A failed query yields an empty
//! collection (or [`SystemSnapshot::default`]), never an error.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, warn};

use super::command::{CommandOutcome, Executor, ProcessExecutor, RuntimeCommand};
use super::locator::{RuntimeAvailability, locate_runtime};
use super::parse::{
    aggregate_stats, parse_container_line, parse_image_line, parse_lines, parse_volume_line,
};
use super::records::{ContainerRecord, ImageRecord, SystemSnapshot, VolumeRecord};

/// Format template for container listings.
pub const CONTAINER_FORMAT: &str = "{{.ID}}|{{.Names}}|{{.State}}|{{.Status}}|{{.Image}}";

/// Format template for image listings.
pub const IMAGE_FORMAT: &str = "{{.ID}}|{{.Repository}}|{{.Tag}}|{{.Size}}";

/// Format template for volume listings.
pub const VOLUME_FORMAT: &str = "{{.Name}}|{{.Driver}}";

/// Format template for the stats poll.
pub const STATS_FORMAT: &str = "{{.CPUPerc}}|{{.MemUsage}}";

/// Which images or volumes a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Listing {
    /// Everything the runtime knows about.
    #[default]
    All,
    /// Only resources nothing references.
    Dangling,
}

/// Talks to the container runtime through its CLI.
pub struct DockerCli {
    executor: Arc<dyn Executor>,
    binary: PathBuf,
    last_error: Mutex<String>,
    availability: Mutex<RuntimeAvailability>,
}

impl fmt::Debug for DockerCli {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DockerCli")
            .field("binary", &self.binary)
            .field("availability", &self.availability())
            .finish_non_exhaustive()
    }
}

impl DockerCli {
    /// Creates a front end that runs `binary` through `executor`.
    #[must_use]
    pub fn new(executor: Arc<dyn Executor>, binary: impl Into<PathBuf>) -> Self {
        Self {
            executor,
            binary: binary.into(),
            last_error: Mutex::new(String::new()),
            availability: Mutex::new(RuntimeAvailability::Unknown),
        }
    }

    /// Creates a front end for the located runtime, spawned without a shell.
    #[must_use]
    pub fn system() -> Self {
        Self::new(Arc::new(ProcessExecutor), locate_runtime())
    }

    /// Returns the runtime executable in use.
    #[must_use]
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Builds a command for the runtime with the given arguments.
    pub(crate) fn command<I, S>(&self, args: I) -> RuntimeCommand
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RuntimeCommand::new(&self.binary).args(args)
    }

    /// Runs a command through the executor.
    pub(crate) fn run(&self, command: &RuntimeCommand) -> CommandOutcome {
        self.executor.execute(command)
    }

    /// Runs a data query, returning its output only on exit code 0.
    fn query(&self, args: &[&str]) -> Option<String> {
        let outcome = self.run(&self.command(args.iter().copied()));
        if outcome.is_success() {
            Some(outcome.output)
        } else {
            debug!(
                "Query `{}` failed with exit code {}",
                args.join(" "),
                outcome.exit_code
            );
            None
        }
    }

    fn containers(&self, filters: &[&str]) -> Vec<ContainerRecord> {
        let mut args = vec!["ps"];
        args.extend_from_slice(filters);
        args.extend_from_slice(&["--format", CONTAINER_FORMAT]);

        self.query(&args)
            .map(|out| parse_lines(&out, parse_container_line))
            .unwrap_or_default()
    }

    /// Lists running containers.
    #[must_use]
    pub fn running_containers(&self) -> Vec<ContainerRecord> {
        self.containers(&["--filter", "status=running"])
    }

    /// Lists every container regardless of state.
    #[must_use]
    pub fn all_containers(&self) -> Vec<ContainerRecord> {
        self.containers(&["--all"])
    }

    /// Lists exited, created and dead containers.
    #[must_use]
    pub fn stopped_containers(&self) -> Vec<ContainerRecord> {
        self.containers(&[
            "--all",
            "--filter",
            "status=exited",
            "--filter",
            "status=created",
            "--filter",
            "status=dead",
        ])
    }

    /// Lists images, all or dangling only.
    #[must_use]
    pub fn images(&self, listing: Listing) -> Vec<ImageRecord> {
        let mut args = vec!["images"];
        if listing == Listing::Dangling {
            args.extend_from_slice(&["--filter", "dangling=true"]);
        }
        args.extend_from_slice(&["--format", IMAGE_FORMAT]);

        self.query(&args)
            .map(|out| parse_lines(&out, parse_image_line))
            .unwrap_or_default()
    }

    /// Lists untagged images nothing references.
    #[must_use]
    pub fn dangling_images(&self) -> Vec<ImageRecord> {
        self.images(Listing::Dangling)
    }

    /// Lists every image.
    #[must_use]
    pub fn all_images(&self) -> Vec<ImageRecord> {
        self.images(Listing::All)
    }

    /// Lists volumes, all or dangling only.
    #[must_use]
    pub fn volumes(&self, listing: Listing) -> Vec<VolumeRecord> {
        let mut args = vec!["volume", "ls"];
        if listing == Listing::Dangling {
            args.extend_from_slice(&["--filter", "dangling=true"]);
        }
        args.extend_from_slice(&["--format", VOLUME_FORMAT]);

        self.query(&args)
            .map(|out| parse_lines(&out, parse_volume_line))
            .unwrap_or_default()
    }

    /// Lists volumes no container uses.
    #[must_use]
    pub fn dangling_volumes(&self) -> Vec<VolumeRecord> {
        self.volumes(Listing::Dangling)
    }

    /// Lists every volume.
    #[must_use]
    pub fn all_volumes(&self) -> Vec<VolumeRecord> {
        self.volumes(Listing::All)
    }

    /// Polls CPU and memory usage once across running containers.
    #[must_use]
    pub fn system_snapshot(&self) -> SystemSnapshot {
        self.query(&["stats", "--no-stream", "--format", STATS_FORMAT])
            .map(|out| aggregate_stats(&out))
            .unwrap_or_default()
    }

    /// Runs the info query with diagnostics captured and records the result.
    ///
    /// On failure the captured text becomes [`DockerCli::last_error`]; on
    /// success the stored text is cleared.
    pub fn check_availability(&self) -> RuntimeAvailability {
        let outcome = self.run(&self.command(["info"]).capture_diagnostics());
        let availability = RuntimeAvailability::classify(&outcome);

        let diagnostic = if availability.is_available() {
            String::new()
        } else {
            let text = outcome.output.trim();
            warn!(
                "Runtime unavailable ({}): exit code {}",
                availability.label(),
                outcome.exit_code
            );
            if text.is_empty() {
                format!("{} exited with code {}", self.binary.display(), outcome.exit_code)
            } else {
                text.to_string()
            }
        };

        *self.last_error.lock().unwrap_or_else(PoisonError::into_inner) = diagnostic;
        *self
            .availability
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = availability.clone();

        availability
    }

    /// Returns true if the info query succeeds.
    pub fn is_available(&self) -> bool {
        self.check_availability().is_available()
    }

    /// Classification from the most recent availability check.
    #[must_use]
    pub fn availability(&self) -> RuntimeAvailability {
        self.availability
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Diagnostic text from the most recent failed check, empty otherwise.
    #[must_use]
    pub fn last_error(&self) -> String {
        self.last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docker::ContainerState;
    use crate::test_utils::FakeExecutor;

    fn cli(fake: FakeExecutor) -> (Arc<FakeExecutor>, DockerCli) {
        let fake = Arc::new(fake);
        let cli = DockerCli::new(fake.clone(), "docker");
        (fake, cli)
    }

    #[test]
    fn test_running_containers_query() {
        let (fake, cli) = cli(FakeExecutor::new().respond(
            &["ps"],
            "abc123|web|running|Up 2 minutes|nginx:latest\n",
            0,
        ));

        let containers = cli.running_containers();
        assert_eq!(containers.len(), 1);
        assert_eq!(containers[0].state, ContainerState::Running);
        assert_eq!(
            fake.calls()[0],
            ["ps", "--filter", "status=running", "--format", CONTAINER_FORMAT]
        );
    }

    #[test]
    fn test_stopped_containers_filters() {
        let (fake, cli) = cli(FakeExecutor::new());
        let _ = cli.stopped_containers();

        let args = &fake.calls()[0];
        assert_eq!(args[..2], ["ps", "--all"]);
        for filter in ["status=exited", "status=created", "status=dead"] {
            assert!(args.iter().any(|a| a == filter), "missing {}", filter);
        }
    }

    #[test]
    fn test_image_and_volume_listings() {
        let (fake, cli) = cli(
            FakeExecutor::new()
                .respond(&["images"], "sha256:1|<none>|<none>|10MB\n", 0)
                .respond(&["volume", "ls"], "pgdata|local\n", 0),
        );

        assert_eq!(cli.dangling_images().len(), 1);
        assert_eq!(cli.all_volumes()[0].name, "pgdata");

        let calls = fake.calls();
        assert_eq!(calls[0][..3], ["images", "--filter", "dangling=true"]);
        assert_eq!(calls[1][..3], ["volume", "ls", "--format"]);
    }

    #[test]
    fn test_failed_queries_yield_empty() {
        let (_, cli) = cli(
            FakeExecutor::new()
                .respond(&["ps"], "abc|web|running|Up|nginx\n", 1)
                .respond(&["stats"], "10%|1MiB\n", 125),
        );

        assert!(cli.all_containers().is_empty());
        assert!(cli.all_images().is_empty());
        assert!(cli.dangling_volumes().is_empty());
        assert_eq!(cli.system_snapshot(), SystemSnapshot::default());
    }

    #[test]
    fn test_system_snapshot_aggregates() {
        let (fake, cli) = cli(FakeExecutor::new().respond(
            &["stats"],
            "12.5%|100MiB / 1GiB\n3.0%|1.5GiB / 8GiB\n",
            0,
        ));

        let snapshot = cli.system_snapshot();
        assert!((snapshot.cpu_percent - 15.5).abs() < 1e-9);
        assert_eq!(snapshot.memory_usage, "1.60 GiB");
        assert_eq!(snapshot.container_count, 2);
        assert_eq!(fake.calls()[0][..2], ["stats", "--no-stream"]);
    }

    #[test]
    fn test_availability_success_clears_error() {
        let (_, cli) = cli(FakeExecutor::new().respond(&["info"], "Server Version: 27", 0));
        assert_eq!(cli.availability(), RuntimeAvailability::Unknown);

        assert!(cli.is_available());
        assert_eq!(cli.availability(), RuntimeAvailability::Available);
        assert!(cli.last_error().is_empty());
    }

    #[test]
    fn test_availability_failure_records_diagnostic() {
        let message = "Cannot connect to the Docker daemon at unix:///var/run/docker.sock. Is the docker daemon running?";
        let (_, cli) = cli(FakeExecutor::new().respond(&["info"], message, 1));

        assert!(!cli.is_available());
        assert_eq!(cli.availability(), RuntimeAvailability::NotRunning);
        assert_eq!(cli.last_error(), message);
    }

    #[test]
    fn test_availability_spawn_failure() {
        let cli = DockerCli::new(Arc::new(ProcessExecutor), "/nonexistent/dockdash-docker");

        assert_eq!(cli.check_availability(), RuntimeAvailability::NotInstalled);
        assert!(cli.last_error().contains("/nonexistent/dockdash-docker"));
    }
}
