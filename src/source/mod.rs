//! Collaborators the monitoring view polls and mutates.
//!
//! `DataSource` adapters are stateless from the view's point of view: each
//! `fetch` returns the latest snapshot or a `FetchError`, and retrying is left
//! to the next scheduled tick.

pub mod backend;
pub mod docker;
pub mod host;
pub mod roster;
pub mod simulated;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{FetchError, MutationError};
use crate::model::{ContainerInfo, ResourceSnapshot};

pub use backend::{ContainerCatalog, ContainerDefinition, FleetBackend, Payload};
pub use docker::DockerRuntime;
pub use host::HostStats;
pub use roster::{Roster, RosterSource, UserRecord};
pub use simulated::{SimulatedRuntime, SimulatedStats, demo_users};

/// Fetches one collection from a backend.
#[async_trait]
pub trait DataSource: Send + Sync {
    type Output: Send;

    async fn fetch(&self) -> Result<Self::Output, FetchError>;
}

/// A source producing a snapshot of keyed entities.
pub type SnapshotSource<T> = Arc<dyn DataSource<Output = ResourceSnapshot<T>>>;

/// The local container engine (or a stand-in for it).
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Containers currently running, in engine order.
    async fn running_containers(&self) -> Result<Vec<ContainerInfo>, FetchError>;

    async fn stop_container(&self, id: &str) -> Result<(), MutationError>;

    /// Force-remove the container with this name. `Ok(false)` when no such
    /// container exists.
    async fn remove_container(&self, name: &str) -> Result<bool, MutationError>;
}

/// The side-effecting calls row actions and forms are forwarded to.
#[async_trait]
pub trait MutationBackend: Send + Sync {
    async fn stop_container(&self, id: &str) -> Result<(), MutationError>;
    async fn delete_container(&self, name: &str) -> Result<(), MutationError>;
    async fn delete_user(&self, uuid: &str) -> Result<(), MutationError>;
    async fn reset_user_token(&self, uuid: &str) -> Result<(), MutationError>;
    async fn create_or_update_container(&self, payload: Payload) -> Result<(), MutationError>;
    async fn create_or_update_user(&self, payload: Payload) -> Result<(), MutationError>;
}

/// Adapts a `ContainerRuntime` into the running-containers data source.
pub struct RunningContainers {
    runtime: Arc<dyn ContainerRuntime>,
}

impl RunningContainers {
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self { runtime }
    }
}

#[async_trait]
impl DataSource for RunningContainers {
    type Output = ResourceSnapshot<ContainerInfo>;

    async fn fetch(&self) -> Result<Self::Output, FetchError> {
        let containers = self.runtime.running_containers().await?;
        Ok(ResourceSnapshot::new(containers))
    }
}
