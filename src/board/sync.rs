//! Per-entity synchronization state machine.
//!
//! Every project, column and task carries a [`SyncState`]. Mutations move it
//! through the table below; the store never assigns a state directly.
//!
//! | From            | Begin           | Acknowledged | Failed |
//! |-----------------|-----------------|--------------|--------|
//! | `PendingCreate` | `PendingCreate` | `Synced`     | `Error`|
//! | `Synced`        | `PendingUpdate` | `Synced`     | `Error`|
//! | `PendingUpdate` | `PendingUpdate` | `Synced`     | `Error`|
//! | `Error`         | `PendingUpdate` | `Synced`     | `Error`|
//!
//! Overlapping calls on the same entity are last-resolve-wins: whichever
//! call settles last decides the final state.

use serde::{Deserialize, Serialize};

use super::models::SyncStatus;

/// Prefix of client-generated identifiers awaiting a server id.
pub const TEMP_ID_PREFIX: &str = "temp-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// Created locally, create call in flight.
    PendingCreate,
    #[default]
    Synced,
    /// Update/delete-class call in flight.
    PendingUpdate,
    /// Last call failed; the optimistic value is kept.
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEvent {
    /// A mutating remote call was issued.
    Begin,
    /// The remote call succeeded.
    Acknowledged,
    /// The remote call failed.
    Failed,
}

impl SyncState {
    pub fn apply(self, event: SyncEvent) -> SyncState {
        match (self, event) {
            (SyncState::PendingCreate, SyncEvent::Begin) => SyncState::PendingCreate,
            (_, SyncEvent::Begin) => SyncState::PendingUpdate,
            (_, SyncEvent::Acknowledged) => SyncState::Synced,
            (_, SyncEvent::Failed) => SyncState::Error,
        }
    }

    /// The three-valued status shown to readers.
    pub fn status(self) -> SyncStatus {
        match self {
            SyncState::PendingCreate | SyncState::PendingUpdate => SyncStatus::Syncing,
            SyncState::Synced => SyncStatus::Synced,
            SyncState::Error => SyncStatus::Error,
        }
    }

    pub fn is_pending(self) -> bool {
        matches!(self, SyncState::PendingCreate | SyncState::PendingUpdate)
    }
}

/// What a failed remote call does to local state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recovery {
    /// Mark the entity `Error` and keep the optimistic value.
    KeepWithError,
    /// Refetch the project list, then the active board.
    RefetchProjects,
    /// Refetch one project's columns and tasks.
    RefetchBoard(String),
}

/// Generate a temporary identifier for an entity awaiting its server id.
pub fn temp_id() -> String {
    format!("{}{}", TEMP_ID_PREFIX, uuid::Uuid::new_v4())
}

pub fn is_temp_id(id: &str) -> bool {
    id.starts_with(TEMP_ID_PREFIX)
}
