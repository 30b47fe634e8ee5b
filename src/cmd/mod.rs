//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module   | Commands handled                                        |
//! |----------|---------------------------------------------------------|
//! | `view`   | `Projects`, `Board`, `Counts`                           |
//! | `edit`   | `NewProject`, `Archive`, `AddColumn`, `AddTask`, `MoveTask` |
//! | `config` | `Config`                                                |

pub mod config;
pub mod edit;
pub mod view;

pub use config::{cmd_config, resolve_config};
pub use edit::{
    AddTaskArgs, cmd_add_column, cmd_add_task, cmd_archive, cmd_move_task, cmd_new_project,
};
pub use view::{cmd_board, cmd_counts, cmd_projects};

use std::sync::Arc;

use anyhow::{Context, Result};
use console::style;
use taskboard::board::{BoardStore, HttpRemote};
use taskboard::config::BoardConfig;

/// Build a store backed by the configured HTTP service.
pub fn connect(config: &BoardConfig) -> Result<BoardStore> {
    let remote = HttpRemote::new(&config.remote).context("Failed to build HTTP client")?;
    Ok(BoardStore::new(Arc::new(remote), config.user.name.clone()))
}

/// Load projects, select `project_id` and load its board.
pub async fn open_project(store: &BoardStore, project_id: &str) -> Result<()> {
    store
        .load_projects()
        .await
        .context("Failed to load projects")?;
    store.set_active_project(Some(project_id))?;
    store
        .load_board(project_id)
        .await
        .with_context(|| format!("Failed to load board for project {}", project_id))?;
    Ok(())
}

/// Fail the command if any entity ended in the error state.
pub fn ensure_synced(store: &BoardStore) -> Result<()> {
    let state = store.snapshot();
    let errors = state.errors();
    if errors.is_empty() {
        return Ok(());
    }
    for (kind, id) in &errors {
        eprintln!("{} {} {} failed to sync", style("✗").red(), kind, id);
    }
    anyhow::bail!("{} change(s) failed to sync", errors.len())
}
