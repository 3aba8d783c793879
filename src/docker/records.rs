//! Snapshot records parsed from runtime listings.
//!
//! Records are plain values rebuilt on every refresh; nothing is carried
//! over between snapshots.

use serde::{Serialize, Serializer};

/// Container lifecycle state as reported by the runtime's `State` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerState {
    /// Container is running.
    Running,
    /// Container is paused.
    Paused,
    /// Container has exited.
    Exited,
    /// Container was created but never started.
    Created,
    /// Container is dead (removal failed or similar).
    Dead,
    /// Container is restarting.
    Restarting,
    /// Container is being removed.
    Removing,
    /// Any state this crate does not know about, verbatim.
    Other(String),
}

impl ContainerState {
    /// Parses a state token such as `running` or `exited`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "running" => Self::Running,
            "paused" => Self::Paused,
            "exited" => Self::Exited,
            "created" => Self::Created,
            "dead" => Self::Dead,
            "restarting" => Self::Restarting,
            "removing" => Self::Removing,
            _ => Self::Other(s.to_string()),
        }
    }

    /// Returns the runtime token for this state.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Exited => "exited",
            Self::Created => "created",
            Self::Dead => "dead",
            Self::Restarting => "restarting",
            Self::Removing => "removing",
            Self::Other(s) => s,
        }
    }

    /// Returns true if the container is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Returns true for the states listed as stopped: exited, created, dead.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Exited | Self::Created | Self::Dead)
    }
}

impl Serialize for ContainerState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One line of a container listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerRecord {
    /// Container ID (never empty).
    pub id: String,
    /// Container name.
    pub name: String,
    /// Machine-readable state.
    pub state: ContainerState,
    /// Human status, e.g. "Up 2 minutes".
    pub status: String,
    /// Image reference the container was created from.
    pub image: String,
}

impl ContainerRecord {
    /// Returns true if the container is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }
}

/// One line of an image listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRecord {
    /// Image ID (never empty).
    pub id: String,
    /// Repository, `<none>` for dangling images.
    pub repository: String,
    /// Tag, `<none>` for dangling images.
    pub tag: String,
    /// Human-readable size, e.g. "187MB".
    pub size: String,
}

impl ImageRecord {
    /// Returns `repository:tag`.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}:{}", self.repository, self.tag)
    }
}

/// One line of a volume listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeRecord {
    /// Volume name (never empty).
    pub name: String,
    /// Volume driver, usually `local`.
    pub driver: String,
}

/// Aggregated resource usage from one stats poll.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemSnapshot {
    /// Sum of per-container CPU percentages; may exceed 100 on multi-core hosts.
    pub cpu_percent: f64,
    /// Total memory in use, rendered as MiB or GiB.
    pub memory_usage: String,
    /// Number of stat lines read.
    pub container_count: usize,
}

impl Default for SystemSnapshot {
    fn default() -> Self {
        Self {
            cpu_percent: 0.0,
            memory_usage: "0.0 MiB".to_string(),
            container_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_parse_known_tokens() {
        assert_eq!(ContainerState::parse("running"), ContainerState::Running);
        assert_eq!(ContainerState::parse("Exited"), ContainerState::Exited);
        assert_eq!(ContainerState::parse(" paused "), ContainerState::Paused);
        assert_eq!(ContainerState::parse("created"), ContainerState::Created);
        assert_eq!(ContainerState::parse("dead"), ContainerState::Dead);
        assert_eq!(ContainerState::parse("restarting"), ContainerState::Restarting);
        assert_eq!(ContainerState::parse("removing"), ContainerState::Removing);
    }

    #[test]
    fn test_state_keeps_unknown_text() {
        let state = ContainerState::parse("hibernating");
        assert_eq!(state, ContainerState::Other("hibernating".to_string()));
        assert_eq!(state.as_str(), "hibernating");
        assert!(!state.is_running());
        assert!(!state.is_stopped());
    }

    #[test]
    fn test_stopped_states() {
        assert!(ContainerState::Exited.is_stopped());
        assert!(ContainerState::Created.is_stopped());
        assert!(ContainerState::Dead.is_stopped());
        assert!(!ContainerState::Paused.is_stopped());
        assert!(!ContainerState::Running.is_stopped());
    }

    #[test]
    fn test_state_serializes_as_token() {
        let record = ContainerRecord {
            id: "abc123".to_string(),
            name: "web".to_string(),
            state: ContainerState::Running,
            status: "Up 2 minutes".to_string(),
            image: "nginx:latest".to_string(),
        };
        let json = serde_json::to_string(&record).expect("serialize");
        assert!(json.contains(r#""state":"running""#));
    }

    #[test]
    fn test_image_full_name() {
        let image = ImageRecord {
            id: "sha256:abc".to_string(),
            repository: "nginx".to_string(),
            tag: "latest".to_string(),
            size: "187MB".to_string(),
        };
        assert_eq!(image.full_name(), "nginx:latest");
    }

    #[test]
    fn test_default_snapshot() {
        let snapshot = SystemSnapshot::default();
        assert_eq!(snapshot.cpu_percent, 0.0);
        assert_eq!(snapshot.memory_usage, "0.0 MiB");
        assert_eq!(snapshot.container_count, 0);
    }
}
