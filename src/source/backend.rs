use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::error::MutationError;

use super::{ContainerRuntime, MutationBackend, Roster};

/// Opaque key/value record submitted by the create/update forms.
pub type Payload = serde_json::Map<String, Value>;

/// A container type users may launch, keyed by name.
#[derive(Clone, Debug, PartialEq)]
pub struct ContainerDefinition {
    pub name: String,
    pub image: String,
    pub shared: bool,
    pub extra: Payload,
}

/// In-memory registry of container definitions.
#[derive(Default)]
pub struct ContainerCatalog {
    definitions: Mutex<Vec<ContainerDefinition>>,
}

impl ContainerCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ContainerDefinition>> {
        self.definitions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn definitions(&self) -> Vec<ContainerDefinition> {
        self.lock().clone()
    }

    pub fn get(&self, name: &str) -> Option<ContainerDefinition> {
        self.lock().iter().find(|d| d.name == name).cloned()
    }

    /// Insert or replace the definition named in the payload.
    pub fn upsert(&self, mut payload: Payload) -> Result<String, MutationError> {
        let name = match payload.remove("name") {
            Some(Value::String(s)) if !s.trim().is_empty() => s,
            _ => return Err(MutationError::InvalidPayload("name is required".to_string())),
        };
        let image = match payload.remove("image") {
            Some(Value::String(s)) => s,
            Some(Value::Null) | None => String::new(),
            Some(other) => return Err(MutationError::InvalidPayload(format!("image must be a string, got {}", other))),
        };
        let shared = match payload.remove("shared") {
            Some(Value::Bool(b)) => b,
            Some(Value::Null) | None => false,
            Some(other) => return Err(MutationError::InvalidPayload(format!("shared must be a boolean, got {}", other))),
        };

        let mut definitions = self.lock();
        match definitions.iter_mut().find(|d| d.name == name) {
            Some(existing) => {
                existing.image = image;
                existing.shared = shared;
                existing.extra.extend(payload);
            }
            None => definitions.push(ContainerDefinition {
                name: name.clone(),
                image,
                shared,
                extra: payload,
            }),
        }
        Ok(name)
    }

    /// Remove a definition. Returns whether it existed.
    pub fn remove(&self, name: &str) -> bool {
        let mut definitions = self.lock();
        let before = definitions.len();
        definitions.retain(|d| d.name != name);
        definitions.len() != before
    }
}

/// Routes mutations to the user roster, the container catalog and the
/// container engine.
pub struct FleetBackend {
    roster: Arc<Roster>,
    catalog: Arc<ContainerCatalog>,
    runtime: Arc<dyn ContainerRuntime>,
}

impl FleetBackend {
    pub fn new(roster: Arc<Roster>, catalog: Arc<ContainerCatalog>, runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self { roster, catalog, runtime }
    }
}

#[async_trait]
impl MutationBackend for FleetBackend {
    async fn stop_container(&self, id: &str) -> Result<(), MutationError> {
        self.runtime.stop_container(id).await?;
        info!(container = id, "container stopped");
        Ok(())
    }

    /// Drops the definition and force-removes a container with that name.
    async fn delete_container(&self, name: &str) -> Result<(), MutationError> {
        let defined = self.catalog.remove(name);
        let removed = self.runtime.remove_container(name).await?;
        if !defined && !removed {
            return Err(MutationError::NotFound { kind: "container", identity: name.to_string() });
        }
        info!(container = name, defined, removed, "container deleted");
        Ok(())
    }

    async fn delete_user(&self, uuid: &str) -> Result<(), MutationError> {
        self.roster.delete(uuid)?;
        info!(user = uuid, "user deleted");
        Ok(())
    }

    async fn reset_user_token(&self, uuid: &str) -> Result<(), MutationError> {
        self.roster.reset_token(uuid)?;
        info!(user = uuid, "user token reset");
        Ok(())
    }

    async fn create_or_update_container(&self, payload: Payload) -> Result<(), MutationError> {
        let name = self.catalog.upsert(payload)?;
        info!(container = %name, "container definition saved");
        Ok(())
    }

    async fn create_or_update_user(&self, payload: Payload) -> Result<(), MutationError> {
        let uuid = self.roster.upsert(payload)?;
        info!(user = %uuid, "user saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::source::{SimulatedRuntime, UserRecord};

    fn backend() -> (FleetBackend, Arc<Roster>, Arc<ContainerCatalog>, Arc<SimulatedRuntime>) {
        let roster = Arc::new(Roster::with_users(vec![UserRecord::new("client-123-abc", "user1")]));
        let catalog = Arc::new(ContainerCatalog::new());
        let runtime = Arc::new(SimulatedRuntime::with_fixture());
        let backend = FleetBackend::new(Arc::clone(&roster), Arc::clone(&catalog), runtime.clone());
        (backend, roster, catalog, runtime)
    }

    #[test]
    fn catalog_upsert_requires_name_and_bool_shared() {
        let catalog = ContainerCatalog::new();
        let missing = json!({"image": "ubuntu"}).as_object().cloned().unwrap();
        assert!(catalog.upsert(missing).is_err());
        let bad_shared = json!({"name": "x", "shared": "on"}).as_object().cloned().unwrap();
        assert!(catalog.upsert(bad_shared).is_err());
    }

    #[tokio::test]
    async fn delete_container_removes_definition_and_running_container() {
        let (backend, _, catalog, runtime) = backend();
        let def = json!({"name": "lsl-nginx-456", "image": "nginx:latest", "shared": true});
        backend.create_or_update_container(def.as_object().cloned().unwrap()).await.unwrap();
        assert!(catalog.get("lsl-nginx-456").unwrap().shared);

        backend.delete_container("lsl-nginx-456").await.unwrap();
        assert!(catalog.get("lsl-nginx-456").is_none());
        assert_eq!(runtime.all().len(), 2);
    }

    #[tokio::test]
    async fn delete_unknown_container_is_not_found() {
        let (backend, ..) = backend();
        assert!(matches!(
            backend.delete_container("nope").await,
            Err(MutationError::NotFound { kind: "container", .. })
        ));
    }

    #[tokio::test]
    async fn user_mutations_hit_roster() {
        let (backend, roster, ..) = backend();
        backend.reset_user_token("client-123-abc").await.unwrap();
        backend.delete_user("client-123-abc").await.unwrap();
        assert!(roster.users().is_empty());
        assert!(backend.delete_user("client-123-abc").await.is_err());
    }
}
