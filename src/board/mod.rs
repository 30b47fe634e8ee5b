//! Board synchronization: a client-side model of projects, columns and
//! tasks that applies edits optimistically and reconciles them with the
//! remote board service.
//!
//! ## Module Map
//!
//! ```text
//! ┌────────────┐  snapshot()/subscribe()  ┌───────────────────────────────┐
//! │  Caller    │ <─────────────────────── │  store.rs   (BoardStore)      │
//! │  (CLI/UI)  │ ───────────────────────> │    ├─ ordering.rs (moves)     │
//! └────────────┘   add_task, move_task…   │    └─ sync.rs  (SyncState)    │
//!                                         │         │                     │
//!                                         │         │ RemoteBoard trait   │
//!                                         │         v                     │
//!                                         │  remote.rs  (records/payloads)│
//!                                         │    ├─ http.rs  (HttpRemote)   │
//!                                         │    └─ normalize.rs (legacy)   │
//!                                         └───────────────────────────────┘
//! ```
//!
//! ## Supporting Modules
//!
//! | Module      | Responsibility                                          |
//! |-------------|---------------------------------------------------------|
//! | `models`    | `Project`, `Column`, `Task`, `Tag`, counts and activity |
//! | `sync`      | Per-entity sync state machine, recovery policies        |
//! | `normalize` | Tolerant parsing of the service's legacy shapes         |
//! | `ordering`  | Stable moves and dense position renumbering             |

pub mod http;
pub mod models;
pub mod normalize;
pub mod ordering;
pub mod remote;
pub mod store;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

pub use http::HttpRemote;
pub use models::{
    ActivityEntry, ActivityKind, ChecklistItem, Column, Priority, Project, ProjectProgress,
    ProjectStatus, SyncStatus, Tag, Task, TaskCounts,
};
pub use remote::RemoteBoard;
pub use store::{BoardState, BoardStore, ProjectUpdate, TaskDraft, TaskUpdate};
pub use sync::{Recovery, SyncState};
