use async_trait::async_trait;
use bollard::Docker;
use bollard::container::{ListContainersOptions, RemoveContainerOptions, StopContainerOptions};
use bollard::errors::Error as BollardError;
use bollard::models::ContainerSummary;

use crate::error::{FetchError, MutationError};
use crate::model::{ContainerInfo, ContainerState};

use super::ContainerRuntime;

/// Prefix of containers launched for fleet clients: `lsl_<type>_<owner>`.
const FLEET_PREFIX: &str = "lsl_";

/// Label that names the owning user explicitly, when present.
const OWNER_LABEL: &str = "owner";

/// Wrapper around bollard's Docker client.
pub struct DockerRuntime {
    client: Docker,
}

impl DockerRuntime {
    /// Try to connect to the Docker daemon and verify it answers a ping.
    /// Returns None if Docker is not available.
    pub async fn connect() -> Option<Self> {
        let client = Docker::connect_with_local_defaults().ok()?;
        client.ping().await.ok()?;
        Some(Self { client })
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn running_containers(&self) -> Result<Vec<ContainerInfo>, FetchError> {
        let options: ListContainersOptions<String> = ListContainersOptions {
            all: false, // only running
            ..Default::default()
        };

        let summaries = self
            .client
            .list_containers(Some(options))
            .await
            .map_err(|e| FetchError::Backend(e.to_string()))?;

        Ok(summaries.iter().map(summary_to_info).collect())
    }

    async fn stop_container(&self, id: &str) -> Result<(), MutationError> {
        let options = StopContainerOptions { t: 10 };
        self.client
            .stop_container(id, Some(options))
            .await
            .map_err(|e| mutation_error("container", id, e))
    }

    async fn remove_container(&self, name: &str) -> Result<bool, MutationError> {
        let options = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };
        match self.client.remove_container(name, Some(options)).await {
            Ok(()) => Ok(true),
            Err(BollardError::DockerResponseServerError { status_code: 404, .. }) => Ok(false),
            Err(e) => Err(MutationError::Backend(e.to_string())),
        }
    }
}

fn mutation_error(kind: &'static str, identity: &str, err: BollardError) -> MutationError {
    match err {
        BollardError::DockerResponseServerError { status_code: 404, .. } => MutationError::NotFound {
            kind,
            identity: identity.to_string(),
        },
        other => MutationError::Backend(other.to_string()),
    }
}

// --- Free helper functions ---

fn summary_to_info(s: &ContainerSummary) -> ContainerInfo {
    let id_full = s.id.clone().unwrap_or_default();
    let id_short = id_full.chars().take(12).collect::<String>();

    let name = s.names.as_ref()
        .and_then(|n| n.first())
        .map(|n| n.trim_start_matches('/').to_string())
        .unwrap_or_else(|| id_short.clone());

    let image = s.image.clone().unwrap_or_default();

    let label_owner = s.labels.as_ref().and_then(|l| l.get(OWNER_LABEL)).cloned();
    let owner = label_owner
        .or_else(|| owner_from_name(&name))
        .unwrap_or_default();

    let status = ContainerState::from_engine(s.state.as_deref().unwrap_or_default());

    ContainerInfo {
        id: id_short,
        name,
        image,
        owner,
        status,
    }
}

/// Owner encoded in a fleet container name: `lsl_ubuntu_alice` -> `alice`.
pub(crate) fn owner_from_name(name: &str) -> Option<String> {
    let rest = name.strip_prefix(FLEET_PREFIX)?;
    let mut parts = rest.splitn(2, '_');
    let _kind = parts.next()?;
    parts.next()
        .filter(|owner| !owner.is_empty())
        .map(|owner| owner.to_string())
}
