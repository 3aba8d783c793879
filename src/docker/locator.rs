//! Runtime executable discovery and availability classification.
//!
//! The runtime path is probed once per process and cached; installations are
//! assumed not to move while the dashboard runs.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing::debug;

use super::command::{CommandOutcome, SPAWN_FAILURE_EXIT_CODE};

/// Well-known install locations, probed in order.
#[cfg(not(windows))]
pub const DEFAULT_CANDIDATES: &[&str] = &[
    "/usr/local/bin/docker",
    "/usr/bin/docker",
    "/opt/homebrew/bin/docker",
    "/Applications/Docker.app/Contents/Resources/bin/docker",
    "/snap/bin/docker",
];

/// Well-known install locations, probed in order.
#[cfg(windows)]
pub const DEFAULT_CANDIDATES: &[&str] =
    &[r"C:\Program Files\Docker\Docker\resources\bin\docker.exe"];

/// Bare command name used when no candidate is executable.
pub const FALLBACK_COMMAND: &str = if cfg!(windows) { "docker.exe" } else { "docker" };

/// Longest diagnostic kept in [`RuntimeAvailability::DaemonError`].
const MAX_DIAGNOSTIC_CHARS: usize = 200;

/// Process-wide cached runtime path.
static SYSTEM_RUNTIME: OnceLock<PathBuf> = OnceLock::new();

/// Returns the runtime executable for this machine, probing on first use.
#[must_use]
pub fn locate_runtime() -> &'static Path {
    SYSTEM_RUNTIME.get_or_init(|| RuntimeLocator::system().probe())
}

/// Probes a list of candidate paths for an executable runtime.
#[derive(Debug)]
pub struct RuntimeLocator {
    candidates: Vec<PathBuf>,
    fallback: PathBuf,
    cached: OnceLock<PathBuf>,
}

impl RuntimeLocator {
    /// Creates a locator over explicit candidates.
    #[must_use]
    pub fn new<I, P>(candidates: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            candidates: candidates.into_iter().map(Into::into).collect(),
            fallback: PathBuf::from(FALLBACK_COMMAND),
            cached: OnceLock::new(),
        }
    }

    /// Creates a locator over [`DEFAULT_CANDIDATES`].
    #[must_use]
    pub fn system() -> Self {
        Self::new(DEFAULT_CANDIDATES.iter().copied())
    }

    /// Replaces the bare command returned when nothing matches.
    #[must_use]
    pub fn with_fallback(mut self, fallback: impl Into<PathBuf>) -> Self {
        let fallback = fallback.into();
        assert!(
            !fallback.as_os_str().is_empty(),
            "fallback must not be empty"
        );
        self.fallback = fallback;
        self
    }

    /// Returns the located runtime, probing only on the first call.
    #[must_use]
    pub fn locate(&self) -> &Path {
        self.cached.get_or_init(|| self.probe())
    }

    /// Probes the candidates without consulting the cache.
    #[must_use]
    pub fn probe(&self) -> PathBuf {
        if let Some(found) = self.candidates.iter().find(|c| is_executable(c)) {
            debug!("Runtime found at {}", found.display());
            return found.clone();
        }

        debug!(
            "No runtime candidate is executable, falling back to `{}`",
            self.fallback.display()
        );
        self.fallback.clone()
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Outcome of the runtime availability check.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RuntimeAvailability {
    /// Not checked yet.
    #[default]
    Unknown,
    /// The runtime answered the info query.
    Available,
    /// The runtime executable could not be started.
    NotInstalled,
    /// The CLI is present but the daemon is not reachable.
    NotRunning,
    /// The current user may not talk to the daemon.
    PermissionDenied,
    /// Any other failure, with the (truncated) diagnostic text.
    DaemonError(String),
}

impl RuntimeAvailability {
    /// Classifies the outcome of an info query run with diagnostics captured.
    #[must_use]
    pub fn classify(outcome: &CommandOutcome) -> Self {
        if outcome.is_success() {
            return Self::Available;
        }

        // 127 is the shell's "command not found".
        if outcome.exit_code == SPAWN_FAILURE_EXIT_CODE || outcome.exit_code == 127 {
            return Self::NotInstalled;
        }

        let text = outcome.output.trim();
        let lower = text.to_lowercase();

        if lower.contains("permission denied") {
            Self::PermissionDenied
        } else if lower.contains("cannot connect to the docker daemon")
            || lower.contains("is the docker daemon running")
            || lower.contains("docker daemon is not running")
        {
            Self::NotRunning
        } else if lower.contains("command not found") {
            Self::NotInstalled
        } else if text.is_empty() {
            Self::NotRunning
        } else {
            Self::DaemonError(truncate_diagnostic(text))
        }
    }

    /// Returns true if the runtime answered.
    #[must_use]
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }

    /// Short label for status displays.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Available => "available",
            Self::NotInstalled => "not installed",
            Self::NotRunning => "daemon not running",
            Self::PermissionDenied => "permission denied",
            Self::DaemonError(_) => "daemon error",
        }
    }

    /// Actionable hint for the user.
    #[must_use]
    pub fn guidance(&self) -> &'static str {
        match self {
            Self::Unknown => "Runtime status has not been checked yet.",
            Self::Available => "Runtime is ready.",
            Self::NotInstalled => {
                "Docker does not appear to be installed. Install Docker or set `runtime_path` in the config."
            }
            Self::NotRunning => {
                "The Docker daemon is not running. Start Docker Desktop or run `systemctl start docker`."
            }
            Self::PermissionDenied => {
                "Permission denied on the Docker socket. Add your user to the `docker` group and log in again."
            }
            Self::DaemonError(_) => "The Docker daemon reported an error; see the diagnostic text.",
        }
    }
}

fn truncate_diagnostic(text: &str) -> String {
    if text.chars().count() > MAX_DIAGNOSTIC_CHARS {
        let head: String = text.chars().take(MAX_DIAGNOSTIC_CHARS).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}
