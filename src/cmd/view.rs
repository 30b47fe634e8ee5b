//! Read-only commands: `projects`, `board`, `counts`.

use anyhow::{Context, Result};
use console::style;

use taskboard::board::{Column, Priority, Project, SyncStatus, Task};
use taskboard::config::BoardConfig;

use super::{connect, open_project};

pub async fn cmd_projects(config: &BoardConfig) -> Result<()> {
    let store = connect(config)?;
    store
        .load_projects()
        .await
        .context("Failed to load projects")?;

    let state = store.snapshot();
    if state.projects.is_empty() {
        println!("No active projects.");
        return Ok(());
    }
    for project in &state.projects {
        let progress = match store.project_progress(&project.id) {
            Some(p) => format!("{}/{} done ({}%)", p.completed, p.total, p.percent),
            None => style("no counts").dim().to_string(),
        };
        println!(
            "{}  {}  [{}]  {}",
            style(&project.id).dim(),
            style(&project.title).bold(),
            project.status.as_str(),
            progress
        );
    }
    Ok(())
}

pub async fn cmd_board(config: &BoardConfig, project_id: &str) -> Result<()> {
    let store = connect(config)?;
    open_project(&store, project_id).await?;

    let state = store.snapshot();
    let Some(project) = state.project(project_id) else {
        anyhow::bail!("Project {} disappeared while loading", project_id);
    };
    print_board(project);
    Ok(())
}

pub async fn cmd_counts(config: &BoardConfig) -> Result<()> {
    let store = connect(config)?;
    store
        .load_projects()
        .await
        .context("Failed to load projects")?;
    store
        .refresh_counts()
        .await
        .context("Failed to fetch task counts")?;

    let state = store.snapshot();
    let mut ids: Vec<&String> = state.counts.keys().collect();
    ids.sort();
    for id in ids {
        let counts = &state.counts[id];
        let title = state.project(id).map(|p| p.title.as_str()).unwrap_or("?");
        let by_priority: Vec<String> = [Priority::High, Priority::Medium, Priority::Low]
            .iter()
            .map(|p| {
                let n = counts.by_priority.get(p.as_str()).copied().unwrap_or(0);
                format!("{} {}", n, p.as_str())
            })
            .collect();
        println!(
            "{}  {}  {} tasks  ({})",
            style(id).dim(),
            title,
            counts.total,
            by_priority.join(", ")
        );
    }
    Ok(())
}

pub(crate) fn print_board(project: &Project) {
    println!(
        "{} {}",
        style(&project.title).bold(),
        style(format!("({})", project.id)).dim()
    );
    if !project.description.is_empty() {
        println!("{}", project.description);
    }
    for column in &project.columns {
        print_column(column);
    }
}

fn print_column(column: &Column) {
    let marker = if column.is_done { " ✓" } else { "" };
    println!();
    println!(
        "{}{} {}",
        style(&column.title).cyan().bold(),
        marker,
        style(format!("[{}] {}", column.id, sync_badge(column.sync_status()))).dim()
    );
    if column.tasks.is_empty() {
        println!("  {}", style("(empty)").dim());
    }
    for task in &column.tasks {
        print_task(task);
    }
}

fn print_task(task: &Task) {
    let priority = match task.priority {
        Priority::High => style(task.priority.label()).red(),
        Priority::Medium => style(task.priority.label()).yellow(),
        Priority::Low => style(task.priority.label()).green(),
    };
    let tags: Vec<String> = task.tags.iter().map(|t| format!("#{}", t.name)).collect();
    println!(
        "  {}. {}  {}  {}  {} {}",
        task.position + 1,
        task.content,
        priority,
        task.assignee,
        style(tags.join(" ")).magenta(),
        style(format!("[{}]", task.id)).dim()
    );
    let done = task.checklist.iter().filter(|i| i.completed).count();
    if !task.checklist.is_empty() {
        println!(
            "     {}",
            style(format!("checklist {}/{}", done, task.checklist.len())).dim()
        );
    }
}

fn sync_badge(status: SyncStatus) -> &'static str {
    match status {
        SyncStatus::Synced => "",
        SyncStatus::Syncing => "syncing",
        SyncStatus::Error => "sync error",
    }
}
