use std::fmt;

use serde::{Deserialize, Serialize};

use super::snapshot::Keyed;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainerState {
    Running,
    Stopped,
    Paused,
    Restarting,
    Other(String),
}

impl ContainerState {
    /// Map a container engine state string ("running", "exited", ...).
    pub fn from_engine(state: &str) -> Self {
        match state.to_ascii_lowercase().as_str() {
            "running" => ContainerState::Running,
            "exited" | "stopped" | "created" | "dead" => ContainerState::Stopped,
            "paused" => ContainerState::Paused,
            "restarting" => ContainerState::Restarting,
            "" => ContainerState::Other("unknown".to_string()),
            other => ContainerState::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerState::Running => write!(f, "Running"),
            ContainerState::Stopped => write!(f, "Stopped"),
            ContainerState::Paused => write!(f, "Paused"),
            ContainerState::Restarting => write!(f, "Restarting"),
            ContainerState::Other(s) => write!(f, "{}", s),
        }
    }
}

/// A running container, keyed by `id`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInfo {
    pub id: String,    // short ID (first 12 chars)
    pub name: String,
    pub image: String,
    pub owner: String, // empty when no owner could be derived
    pub status: ContainerState,
}

impl Keyed for ContainerInfo {
    fn identity(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_engine_maps_known_states() {
        assert_eq!(ContainerState::from_engine("running"), ContainerState::Running);
        assert_eq!(ContainerState::from_engine("Exited"), ContainerState::Stopped);
        assert_eq!(
            ContainerState::from_engine("removing"),
            ContainerState::Other("removing".into())
        );
    }
}
