use std::fmt;

use serde::{Deserialize, Serialize};

use super::snapshot::Keyed;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientState {
    Online,
    Offline,
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientState::Online => write!(f, "Online"),
            ClientState::Offline => write!(f, "Offline"),
        }
    }
}

/// One connected (or recently seen) client, keyed by `uuid`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientStatus {
    pub uuid: String,
    pub username: String,
    pub last_ping: String, // relative label, e.g. "2 minutes ago"
    pub status: ClientState,
    pub running_containers: u32,
}

impl Keyed for ClientStatus {
    fn identity(&self) -> &str {
        &self.uuid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_roster_wire_shape() {
        let json = r#"{
            "uuid": "client-123-abc",
            "username": "user1",
            "lastPing": "2 minutes ago",
            "status": "Online",
            "runningContainers": 2
        }"#;
        let c: ClientStatus = serde_json::from_str(json).unwrap();
        assert_eq!(c.identity(), "client-123-abc");
        assert_eq!(c.status, ClientState::Online);
        assert_eq!(c.running_containers, 2);
    }
}
