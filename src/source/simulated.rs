//! Stand-in collaborators for `--demo` mode and tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::error::{FetchError, MutationError};
use crate::model::{ContainerInfo, ContainerState, ServerStat};

use super::{ContainerRuntime, DataSource, UserRecord};

/// Users matching the container fixture: `user1` pinged recently, `user2`
/// went quiet two hours before `now`, `user3` never connected.
pub fn demo_users(now: DateTime<Utc>) -> Vec<UserRecord> {
    vec![
        UserRecord::new("client-123-abc", "user1").seen_at(now - Duration::seconds(30)),
        UserRecord::new("client-456-def", "user2").seen_at(now - Duration::hours(2)),
        UserRecord::new("client-789-ghi", "user3"),
    ]
}

/// In-memory container engine.
pub struct SimulatedRuntime {
    containers: Mutex<Vec<ContainerInfo>>,
}

impl SimulatedRuntime {
    pub fn new(containers: Vec<ContainerInfo>) -> Self {
        Self { containers: Mutex::new(containers) }
    }

    /// Three running containers owned by `user1` and `user2`.
    pub fn with_fixture() -> Self {
        let running = |id: &str, name: &str, image: &str, owner: &str| ContainerInfo {
            id: id.to_string(),
            name: name.to_string(),
            image: image.to_string(),
            owner: owner.to_string(),
            status: ContainerState::Running,
        };
        Self::new(vec![
            running("abc123", "lsl-ubuntu-123", "ubuntu:latest", "user1"),
            running("def456", "lsl-nginx-456", "nginx:latest", "user1"),
            running("ghi789", "lsl-python-789", "python:3.9", "user2"),
        ])
    }

    /// Every container, running or not.
    pub fn all(&self) -> Vec<ContainerInfo> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ContainerInfo>> {
        self.containers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ContainerRuntime for SimulatedRuntime {
    async fn running_containers(&self) -> Result<Vec<ContainerInfo>, FetchError> {
        Ok(self
            .lock()
            .iter()
            .filter(|c| c.status == ContainerState::Running)
            .cloned()
            .collect())
    }

    async fn stop_container(&self, id: &str) -> Result<(), MutationError> {
        let mut containers = self.lock();
        let container = containers
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| MutationError::NotFound { kind: "container", identity: id.to_string() })?;
        container.status = ContainerState::Stopped;
        Ok(())
    }

    async fn remove_container(&self, name: &str) -> Result<bool, MutationError> {
        let mut containers = self.lock();
        let before = containers.len();
        containers.retain(|c| c.name != name);
        Ok(containers.len() != before)
    }
}

/// Server stats that drift on every fetch.
#[derive(Default)]
pub struct SimulatedStats {
    tick: AtomicU64,
}

impl SimulatedStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn at(tick: u64) -> ServerStat {
        ServerStat {
            cpu: ((tick * 37 + 11) % 100) as u8,
            memory: (40 + (tick * 13) % 45) as u8,
            disk: (60 + (tick / 10) % 30) as u8,
        }
    }
}

#[async_trait]
impl DataSource for SimulatedStats {
    type Output = ServerStat;

    async fn fetch(&self) -> Result<ServerStat, FetchError> {
        let tick = self.tick.fetch_add(1, Ordering::Relaxed);
        Ok(Self::at(tick))
    }
}
