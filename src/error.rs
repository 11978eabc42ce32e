use std::path::PathBuf;

use thiserror::Error;

use crate::model::TableId;

/// A collection could not be fetched during a poll. Recovered locally: the
/// table keeps its last good render until the next successful tick.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("backend call failed: {0}")]
    Backend(String),

    #[error("fetch task panicked or was cancelled")]
    Aborted,
}

/// A user-triggered mutation failed. Surfaced on the status line; no view
/// state changes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MutationError {
    #[error("{kind} '{identity}' not found")]
    NotFound { kind: &'static str, identity: String },

    #[error("{0} already exists")]
    Conflict(String),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("{0} is not supported here")]
    Unsupported(String),

    #[error("backend call failed: {0}")]
    Backend(String),
}

/// Two entities in one snapshot share an identity. Fatal to that table's poll
/// cycle only.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("duplicate identity '{identity}' in {table} snapshot")]
pub struct DuplicateIdentityError {
    pub table: TableId,
    pub identity: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("poll interval must be greater than zero")]
    ZeroInterval,

    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
