//! Typed error hierarchy for the board client.
//!
//! `BoardError` covers two families:
//! - remote failures (transport, non-success status, malformed response),
//!   which the store absorbs through its recovery policies
//! - local preconditions (unknown ids, no active project, bad values),
//!   which are returned to the caller before anything is sent

use thiserror::Error;

pub type Result<T, E = BoardError> = std::result::Result<T, E>;

/// Errors from the board store and the remote board service.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("Request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned status {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Malformed response from {endpoint}: {message}")]
    Malformed { endpoint: String, message: String },

    #[error("Project {id} not found")]
    ProjectNotFound { id: String },

    #[error("Column {id} not found")]
    ColumnNotFound { id: String },

    #[error("Task {id} not found")]
    TaskNotFound { id: String },

    #[error("No project is selected")]
    NoActiveProject,

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BoardError {
    /// True for the three remote failure classes (transport, status,
    /// malformed response).
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Status { .. } | Self::Malformed { .. }
        )
    }

    pub(crate) fn malformed(endpoint: &str, message: impl Into<String>) -> Self {
        Self::Malformed {
            endpoint: endpoint.to_string(),
            message: message.into(),
        }
    }
}
