//! Mutating commands: `new-project`, `archive`, `add-column`, `add-task`,
//! `move-task`.
//!
//! Each command reports remote failures that the store absorbed into sync
//! state by exiting non-zero.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use console::style;

use taskboard::board::models::DEFAULT_TAG_COLOR;
use taskboard::board::{BoardStore, ChecklistItem, Priority, Tag, TaskDraft};
use taskboard::config::BoardConfig;

use super::view::print_board;
use super::{connect, ensure_synced, open_project};

pub async fn cmd_new_project(config: &BoardConfig, title: &str, description: &str) -> Result<()> {
    let store = connect(config)?;
    let id = store
        .create_project(title, description)
        .await
        .context("Failed to create project")?;
    println!("{} Created project {} ({})", style("✓").green(), title, id);
    Ok(())
}

pub async fn cmd_archive(config: &BoardConfig, project_id: &str) -> Result<()> {
    let store = connect(config)?;
    store
        .load_projects()
        .await
        .context("Failed to load projects")?;
    store.archive_project(project_id).await?;

    // A failed archive refetches the list, which brings the project back.
    if store.snapshot().project(project_id).is_some() {
        anyhow::bail!("Failed to archive project {}", project_id);
    }
    println!("{} Archived project {}", style("✓").green(), project_id);
    Ok(())
}

pub async fn cmd_add_column(
    config: &BoardConfig,
    project_id: &str,
    title: Option<&str>,
) -> Result<()> {
    let store = connect(config)?;
    open_project(&store, project_id).await?;

    let id = store.add_column().await?;
    if let Some(title) = title {
        store.rename_column(&id, title).await?;
    }
    ensure_synced(&store)?;
    println!("{} Added column {}", style("✓").green(), id);
    Ok(())
}

/// Arguments of `taskboard add-task`, borrowed from the parsed CLI.
pub struct AddTaskArgs<'a> {
    pub column: &'a str,
    pub content: &'a str,
    pub description: Option<&'a str>,
    pub priority: &'a str,
    pub assignee: Option<&'a str>,
    pub tags: &'a [String],
    pub checklist: &'a [String],
    pub start: Option<NaiveDate>,
    pub due: Option<NaiveDate>,
}

impl AddTaskArgs<'_> {
    fn draft(&self) -> Result<TaskDraft> {
        let priority: Priority = self.priority.parse()?;
        let tags = self
            .tags
            .iter()
            .map(|name| Tag::new(name.trim(), name.trim(), DEFAULT_TAG_COLOR))
            .collect();
        let checklist = self
            .checklist
            .iter()
            .enumerate()
            .map(|(i, text)| ChecklistItem {
                id: format!("check-{}", i),
                text: text.clone(),
                completed: false,
            })
            .collect();
        Ok(TaskDraft {
            content: self.content.to_string(),
            description: self.description.unwrap_or_default().to_string(),
            tags,
            priority,
            assignee: self.assignee.map(str::to_string),
            start_date: self.start,
            end_date: self.due,
            checklist,
        })
    }
}

pub async fn cmd_add_task(
    config: &BoardConfig,
    project_id: &str,
    args: AddTaskArgs<'_>,
) -> Result<()> {
    let draft = args.draft()?;
    let store = connect(config)?;
    open_project(&store, project_id).await?;

    let id = store.add_task(args.column, draft).await?;
    ensure_synced(&store)?;
    println!("{} Added task {}", style("✓").green(), id);
    Ok(())
}

pub async fn cmd_move_task(
    config: &BoardConfig,
    project_id: &str,
    task_id: &str,
    from: &str,
    to: &str,
    over: Option<&str>,
) -> Result<()> {
    let store = connect(config)?;
    open_project(&store, project_id).await?;

    store
        .move_task(task_id, over.unwrap_or(to), from, to)
        .await?;
    ensure_landed(&store, task_id, to)?;

    if let Some(project) = store.snapshot().project(project_id) {
        print_board(project);
    }
    Ok(())
}

/// A failed move refetches the board, putting the task back where the
/// service has it.
fn ensure_landed(store: &BoardStore, task_id: &str, column_id: &str) -> Result<()> {
    let state = store.snapshot();
    match state.find_task(task_id) {
        Some((_, column, _)) if column.id == column_id => ensure_synced(store),
        _ => anyhow::bail!("Failed to move task {}; the board was reloaded", task_id),
    }
}
