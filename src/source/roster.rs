use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::error::{FetchError, MutationError};
use crate::model::{ClientState, ClientStatus, ResourceSnapshot};

use super::{ContainerRuntime, DataSource, Payload};

/// A registered user and the last time their client pinged in.
#[derive(Clone, Debug, PartialEq)]
pub struct UserRecord {
    pub uuid: String,
    pub username: String,
    pub token: String,
    pub last_seen: Option<DateTime<Utc>>,
    pub extra: Payload,
}

impl UserRecord {
    pub fn new(uuid: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            username: username.into(),
            token: Uuid::new_v4().to_string(),
            last_seen: None,
            extra: Payload::new(),
        }
    }

    pub fn seen_at(mut self, at: DateTime<Utc>) -> Self {
        self.last_seen = Some(at);
        self
    }
}

/// In-memory user registry with client last-seen tracking.
#[derive(Default)]
pub struct Roster {
    users: Mutex<Vec<UserRecord>>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: Vec<UserRecord>) -> Self {
        Self { users: Mutex::new(users) }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<UserRecord>> {
        self.users.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn users(&self) -> Vec<UserRecord> {
        self.lock().clone()
    }

    pub fn get(&self, uuid: &str) -> Option<UserRecord> {
        self.lock().iter().find(|u| u.uuid == uuid).cloned()
    }

    /// Record a ping from the client identified by `uuid`. Returns false for
    /// unknown clients.
    pub fn ping(&self, uuid: &str, at: DateTime<Utc>) -> bool {
        match self.lock().iter_mut().find(|u| u.uuid == uuid) {
            Some(user) => {
                user.last_seen = Some(at);
                true
            }
            None => false,
        }
    }

    pub fn delete(&self, uuid: &str) -> Result<(), MutationError> {
        let mut users = self.lock();
        let before = users.len();
        users.retain(|u| u.uuid != uuid);
        if users.len() == before {
            return Err(not_found(uuid));
        }
        Ok(())
    }

    /// Issue a fresh token for the user and return it.
    pub fn reset_token(&self, uuid: &str) -> Result<String, MutationError> {
        let mut users = self.lock();
        let user = users.iter_mut().find(|u| u.uuid == uuid).ok_or_else(|| not_found(uuid))?;
        user.token = Uuid::new_v4().to_string();
        Ok(user.token.clone())
    }

    /// Create a user (no or empty `uuid` in the payload) or update the user
    /// with that uuid. Returns the user's uuid.
    pub fn upsert(&self, mut payload: Payload) -> Result<String, MutationError> {
        let uuid = take_string(&mut payload, "uuid").filter(|s| !s.is_empty());
        let username = take_string(&mut payload, "username")
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| MutationError::InvalidPayload("username is required".to_string()))?;

        let mut users = self.lock();
        let taken = |users: &[UserRecord], except: Option<&str>| {
            users.iter().any(|u| u.username == username && Some(u.uuid.as_str()) != except)
        };

        match uuid {
            Some(uuid) => {
                if taken(&users, Some(&uuid)) {
                    return Err(MutationError::Conflict(format!("user '{}'", username)));
                }
                let user = users.iter_mut().find(|u| u.uuid == uuid).ok_or_else(|| not_found(&uuid))?;
                user.username = username;
                user.extra.extend(payload);
                Ok(uuid)
            }
            None => {
                if taken(&users, None) {
                    return Err(MutationError::Conflict(format!("user '{}'", username)));
                }
                let mut user = UserRecord::new(Uuid::new_v4().to_string(), username);
                user.extra = payload;
                let uuid = user.uuid.clone();
                users.push(user);
                Ok(uuid)
            }
        }
    }
}

fn not_found(uuid: &str) -> MutationError {
    MutationError::NotFound { kind: "user", identity: uuid.to_string() }
}

fn take_string(payload: &mut Payload, key: &str) -> Option<String> {
    match payload.remove(key)? {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Client roster as shown in the monitoring view: every registered user,
/// most recently seen first. Users whose client never pinged come last,
/// offline, in registration order.
pub struct RosterSource {
    roster: Arc<Roster>,
    runtime: Arc<dyn ContainerRuntime>,
    offline_after: Duration,
}

impl RosterSource {
    pub fn new(roster: Arc<Roster>, runtime: Arc<dyn ContainerRuntime>, offline_after: Duration) -> Self {
        Self { roster, runtime, offline_after }
    }
}

#[async_trait]
impl DataSource for RosterSource {
    type Output = ResourceSnapshot<ClientStatus>;

    async fn fetch(&self) -> Result<Self::Output, FetchError> {
        let running = self.runtime.running_containers().await?;
        let now = Utc::now();

        let mut users = self.roster.users();
        // Stable, so never-seen users keep registration order.
        users.sort_by(|a, b| b.last_seen.cmp(&a.last_seen));

        Ok(users
            .into_iter()
            .map(|user| {
                let running_containers =
                    running.iter().filter(|c| c.owner == user.username).count() as u32;
                let status = match user.last_seen {
                    Some(at) if now - at <= self.offline_after => ClientState::Online,
                    _ => ClientState::Offline,
                };
                ClientStatus {
                    last_ping: relative_label(now, user.last_seen),
                    uuid: user.uuid,
                    username: user.username,
                    status,
                    running_containers,
                }
            })
            .collect())
    }
}

/// Human-readable age of `then` relative to `now`, e.g. "5 minutes ago".
pub fn relative_label(now: DateTime<Utc>, then: Option<DateTime<Utc>>) -> String {
    let Some(then) = then else { return "never".to_string() };
    let secs = (now - then).num_seconds().max(0);

    let (value, unit) = if secs < 5 {
        return "just now".to_string();
    } else if secs < 60 {
        (secs, "second")
    } else if secs < 3600 {
        (secs / 60, "minute")
    } else if secs < 86400 {
        (secs / 3600, "hour")
    } else {
        (secs / 86400, "day")
    };

    if value == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", value, unit)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::source::SimulatedRuntime;

    fn payload(value: serde_json::Value) -> Payload {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn relative_label_units() {
        let now = Utc::now();
        assert_eq!(relative_label(now, None), "never");
        assert_eq!(relative_label(now, Some(now)), "just now");
        assert_eq!(relative_label(now, Some(now - Duration::seconds(42))), "42 seconds ago");
        assert_eq!(relative_label(now, Some(now - Duration::seconds(60))), "1 minute ago");
        assert_eq!(relative_label(now, Some(now - Duration::minutes(5))), "5 minutes ago");
        assert_eq!(relative_label(now, Some(now - Duration::hours(3))), "3 hours ago");
        assert_eq!(relative_label(now, Some(now - Duration::days(2))), "2 days ago");
    }

    #[test]
    fn upsert_creates_then_updates() {
        let roster = Roster::new();
        let uuid = roster.upsert(payload(json!({"uuid": "", "username": "alice", "group": "a"}))).unwrap();
        assert_eq!(roster.users().len(), 1);

        roster.upsert(payload(json!({"uuid": uuid, "username": "alice2"}))).unwrap();
        let user = roster.get(&uuid).unwrap();
        assert_eq!(user.username, "alice2");
        assert_eq!(user.extra.get("group"), Some(&json!("a")));
    }

    #[test]
    fn upsert_rejects_missing_username_and_duplicates() {
        let roster = Roster::with_users(vec![UserRecord::new("u1", "alice")]);
        assert!(matches!(
            roster.upsert(payload(json!({"username": " "}))),
            Err(MutationError::InvalidPayload(_))
        ));
        assert!(matches!(
            roster.upsert(payload(json!({"username": "alice"}))),
            Err(MutationError::Conflict(_))
        ));
        assert!(matches!(
            roster.upsert(payload(json!({"uuid": "nope", "username": "bob"}))),
            Err(MutationError::NotFound { .. })
        ));
    }

    #[test]
    fn reset_token_changes_token() {
        let roster = Roster::with_users(vec![UserRecord::new("u1", "alice")]);
        let before = roster.get("u1").unwrap().token;
        let after = roster.reset_token("u1").unwrap();
        assert_ne!(before, after);
        assert!(roster.reset_token("u2").is_err());
    }

    #[test]
    fn delete_unknown_user_is_not_found() {
        let roster = Roster::with_users(vec![UserRecord::new("u1", "alice")]);
        assert!(roster.delete("u2").is_err());
        assert!(roster.delete("u1").is_ok());
        assert!(roster.users().is_empty());
    }

    #[tokio::test]
    async fn roster_source_lists_most_recent_first() {
        let now = Utc::now();
        let roster = Arc::new(Roster::with_users(vec![
            UserRecord::new("client-456-def", "user2").seen_at(now - Duration::minutes(20)),
            UserRecord::new("client-789-ghi", "user3"),
            UserRecord::new("client-123-abc", "user1").seen_at(now - Duration::minutes(2)),
        ]));
        let runtime = Arc::new(SimulatedRuntime::with_fixture());
        let source = RosterSource::new(roster, runtime, Duration::minutes(10));

        let clients = source.fetch().await.unwrap().into_inner();
        let ids: Vec<&str> = clients.iter().map(|c| c.uuid.as_str()).collect();
        assert_eq!(ids, vec!["client-123-abc", "client-456-def", "client-789-ghi"]);
        assert_eq!(clients[0].status, ClientState::Online);
        assert_eq!(clients[0].running_containers, 2);
        assert_eq!(clients[0].last_ping, "2 minutes ago");
        assert_eq!(clients[1].status, ClientState::Offline);
        assert_eq!(clients[1].running_containers, 1);
        assert_eq!(clients[2].status, ClientState::Offline);
        assert_eq!(clients[2].last_ping, "never");
    }

    #[tokio::test]
    async fn created_user_appears_in_next_snapshot() {
        let roster = Arc::new(Roster::new());
        let runtime = Arc::new(SimulatedRuntime::new(Vec::new()));
        let source = RosterSource::new(Arc::clone(&roster), runtime, Duration::minutes(10));
        assert!(source.fetch().await.unwrap().is_empty());

        let uuid = roster.upsert(payload(json!({"username": "alice"}))).unwrap();

        let clients = source.fetch().await.unwrap().into_inner();
        assert_eq!(clients.len(), 1);
        assert_eq!(clients[0].uuid, uuid);
        assert_eq!(clients[0].username, "alice");
        assert_eq!(clients[0].last_ping, "never");
        assert_eq!(clients[0].status, ClientState::Offline);
    }
}
