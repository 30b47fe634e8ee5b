//! The board store: a shared, observable tree of projects, columns and tasks
//! kept in step with the remote board service.
//!
//! Every mutation runs in three phases:
//!
//! 1. apply the change to the local tree and mark the touched entities
//!    pending (readers see `Syncing` immediately)
//! 2. issue the remote call(s)
//! 3. reconcile on success (swap temporary ids, mark `Synced`), or run the
//!    operation's [`Recovery`] policy on failure
//!
//! The tree lives behind a `std::sync::Mutex` that is only ever held inside
//! a synchronous closure, never across an `.await`. Each mutation bumps a
//! revision counter that observers follow through [`BoardStore::subscribe`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{NaiveDate, Utc};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::models::{
    ActivityEntry, ActivityKind, ChecklistItem, Column, Priority, Project, ProjectProgress,
    ProjectStatus, Tag, Task, TaskCounts, palette_color,
};
use super::normalize;
use super::ordering;
use super::remote::{
    ColumnPatch, NewColumn, NewProject, NewTask, ProjectPatch, RemoteBoard, TaskPatch,
};
use super::sync::{Recovery, SyncEvent, SyncState, is_temp_id, temp_id};
use crate::errors::{BoardError, Result};

/// Title given to columns created by [`BoardStore::add_column`].
pub const NEW_COLUMN_TITLE: &str = "New column";

/// The observable tree plus derived counts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardState {
    pub projects: Vec<Project>,
    pub active_project_id: Option<String>,
    pub counts: HashMap<String, TaskCounts>,
}

impl BoardState {
    pub fn project(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn active_project(&self) -> Option<&Project> {
        self.active_project_id
            .as_deref()
            .and_then(|id| self.project(id))
    }

    /// Find a column anywhere in the tree, with its owning project.
    pub fn find_column(&self, id: &str) -> Option<(&Project, &Column)> {
        self.projects
            .iter()
            .find_map(|p| p.column(id).map(|c| (p, c)))
    }

    /// Find a task anywhere in the tree, with its column and project.
    pub fn find_task(&self, id: &str) -> Option<(&Project, &Column, &Task)> {
        self.projects.iter().find_map(|p| {
            p.columns
                .iter()
                .find_map(|c| c.task(id).map(|t| (p, c, t)))
        })
    }

    /// Every entity whose last remote call failed, as `(kind, id)`.
    pub fn errors(&self) -> Vec<(&'static str, &str)> {
        let mut out = Vec::new();
        for project in &self.projects {
            if project.sync == SyncState::Error {
                out.push(("project", project.id.as_str()));
            }
            for column in &project.columns {
                if column.sync == SyncState::Error {
                    out.push(("column", column.id.as_str()));
                }
                for task in &column.tasks {
                    if task.sync == SyncState::Error {
                        out.push(("task", task.id.as_str()));
                    }
                }
            }
        }
        out
    }

    fn project_mut(&mut self, id: &str) -> Option<&mut Project> {
        self.projects.iter_mut().find(|p| p.id == id)
    }

    fn column_mut(&mut self, id: &str) -> Option<&mut Column> {
        self.projects
            .iter_mut()
            .flat_map(|p| p.columns.iter_mut())
            .find(|c| c.id == id)
    }

    fn task_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.projects
            .iter_mut()
            .flat_map(|p| p.columns.iter_mut())
            .flat_map(|c| c.tasks.iter_mut())
            .find(|t| t.id == id)
    }

    fn column_owner(&self, column_id: &str) -> Option<String> {
        self.find_column(column_id).map(|(p, _)| p.id.clone())
    }

    fn sync_mut(&mut self, entity: &Entity) -> Option<&mut SyncState> {
        match entity {
            Entity::Project(id) => self.project_mut(id).map(|p| &mut p.sync),
            Entity::Column(id) => self.column_mut(id).map(|c| &mut c.sync),
            Entity::Task(id) => self.task_mut(id).map(|t| &mut t.sync),
        }
    }

    fn apply(&mut self, entity: &Entity, event: SyncEvent) {
        if let Some(sync) = self.sync_mut(entity) {
            *sync = sync.apply(event);
        }
    }

    /// Swap a temporary id for the server id and acknowledge. Returns false
    /// when the entity has since left the tree.
    fn assign_id(&mut self, entity: &Entity, server_id: &str) -> bool {
        match entity {
            Entity::Project(temp) => match self.project_mut(temp) {
                Some(project) => {
                    project.id = server_id.to_string();
                    project.sync = project.sync.apply(SyncEvent::Acknowledged);
                    if self.active_project_id.as_deref() == Some(temp.as_str()) {
                        self.active_project_id = Some(server_id.to_string());
                    }
                    true
                }
                None => false,
            },
            Entity::Column(temp) => match self.column_mut(temp) {
                Some(column) => {
                    column.id = server_id.to_string();
                    column.sync = column.sync.apply(SyncEvent::Acknowledged);
                    true
                }
                None => false,
            },
            Entity::Task(temp) => match self.task_mut(temp) {
                Some(task) => {
                    task.id = server_id.to_string();
                    task.sync = task.sync.apply(SyncEvent::Acknowledged);
                    true
                }
                None => false,
            },
        }
    }
}

/// Keep columns and tasks that only exist locally (temporary ids) across a
/// board replacement. Unsaved tasks follow their column when it survives.
fn carry_unsaved(previous: Vec<Column>, board: &mut Vec<Column>) {
    for mut column in previous {
        if is_temp_id(&column.id) {
            board.push(column);
            continue;
        }
        let Some(target) = board.iter_mut().find(|c| c.id == column.id) else {
            continue;
        };
        column.tasks.retain(|t| is_temp_id(&t.id));
        target.tasks.append(&mut column.tasks);
    }
}

/// A tree node addressed by kind and id.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Entity {
    Project(String),
    Column(String),
    Task(String),
}

impl Entity {
    fn id(&self) -> &str {
        match self {
            Entity::Project(id) | Entity::Column(id) | Entity::Task(id) => id,
        }
    }
}

/// Fields a caller may change on a project. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
}

/// Input for [`BoardStore::add_task`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskDraft {
    pub content: String,
    pub description: String,
    pub tags: Vec<Tag>,
    pub priority: Priority,
    /// Defaults to the acting user when absent or blank.
    pub assignee: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub checklist: Vec<ChecklistItem>,
}

/// Fields a caller may change on a task. `None` leaves a field as is; for
/// dates `Some(None)` clears them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskUpdate {
    pub content: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<Tag>>,
    pub priority: Option<Priority>,
    pub assignee: Option<String>,
    pub start_date: Option<Option<NaiveDate>>,
    pub end_date: Option<Option<NaiveDate>>,
    pub checklist: Option<Vec<ChecklistItem>>,
}

/// Shared handle to the board tree. Clones observe the same state.
#[derive(Clone)]
pub struct BoardStore {
    remote: Arc<dyn RemoteBoard>,
    user: String,
    state: Arc<Mutex<BoardState>>,
    revision: Arc<watch::Sender<u64>>,
}

impl BoardStore {
    pub fn new(remote: Arc<dyn RemoteBoard>, user: impl Into<String>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            remote,
            user: user.into(),
            state: Arc::new(Mutex::new(BoardState::default())),
            revision: Arc::new(revision),
        }
    }

    /// The acting user: default assignee and author of activity entries.
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Owned copy of the current tree.
    pub fn snapshot(&self) -> BoardState {
        self.read(BoardState::clone)
    }

    /// Receiver whose value increments after every change to the tree.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn read<R>(&self, f: impl FnOnce(&BoardState) -> R) -> R {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut BoardState) -> R) -> R {
        let result = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            f(&mut state)
        };
        self.revision.send_modify(|rev| *rev += 1);
        result
    }

    /// Like [`mutate`](Self::mutate), but observers are only notified when
    /// `f` succeeds. `f` must leave the tree untouched when it fails.
    fn try_mutate<R>(&self, f: impl FnOnce(&mut BoardState) -> Result<R>) -> Result<R> {
        let result = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            f(&mut state)
        };
        if result.is_ok() {
            self.revision.send_modify(|rev| *rev += 1);
        }
        result
    }

    fn mark(&self, entity: &Entity, event: SyncEvent) {
        self.mutate(|state| state.apply(entity, event));
    }

    fn mark_all(&self, entities: &[Entity], event: SyncEvent) {
        self.mutate(|state| {
            for entity in entities {
                state.apply(entity, event);
            }
        });
    }

    /// Run a failed call's recovery policy. Refetch failures are logged.
    async fn recover(&self, recovery: Recovery) {
        match recovery {
            Recovery::KeepWithError => {}
            Recovery::RefetchProjects => {
                if let Err(e) = self.load_projects().await {
                    warn!(error = %e, "Refetch of projects failed");
                    return;
                }
                let active = self.read(|s| s.active_project_id.clone());
                if let Some(project_id) = active
                    && let Err(e) = self.load_board(&project_id).await
                {
                    warn!(project_id = %project_id, error = %e, "Refetch of board failed");
                }
            }
            Recovery::RefetchBoard(project_id) => {
                if let Err(e) = self.load_board(&project_id).await {
                    warn!(project_id = %project_id, error = %e, "Refetch of board failed");
                }
            }
        }
    }

    /// Settle a single-entity call: acknowledge, or mark failed and recover.
    async fn settle(
        &self,
        entity: Entity,
        result: Result<()>,
        recovery: Recovery,
        action: &str,
    ) -> bool {
        match result {
            Ok(()) => {
                self.mark(&entity, SyncEvent::Acknowledged);
                debug!(id = %entity.id(), action, "Remote acknowledged");
                true
            }
            Err(e) => {
                warn!(id = %entity.id(), action, error = %e, "Remote call failed");
                self.mark(&entity, SyncEvent::Failed);
                self.recover(recovery).await;
                false
            }
        }
    }

    async fn log_activity(&self, entry: ActivityEntry) {
        if let Err(e) = self.remote.log_activity(&entry).await {
            warn!(task_id = %entry.task_id, error = %e, "Failed to record activity");
        }
    }

    fn activity(
        &self,
        task_id: &str,
        project_id: &str,
        action: ActivityKind,
        description: String,
    ) -> ActivityEntry {
        ActivityEntry {
            task_id: task_id.to_string(),
            project_id: project_id.to_string(),
            user: self.user.clone(),
            action,
            description,
            created_at: Utc::now(),
        }
    }

    // ── Loading ───────────────────────────────────────────────────────

    /// Replace the project list with the service's, dropping archived
    /// projects, then refresh task counts.
    pub async fn load_projects(&self) -> Result<()> {
        let records = self.remote.list_projects().await?;
        let projects: Vec<Project> = records
            .iter()
            .filter_map(normalize::project_from_record)
            .filter(|p| p.status != ProjectStatus::Inactive)
            .collect();
        let count = projects.len();

        self.mutate(|state| {
            let keep = state
                .active_project_id
                .as_ref()
                .is_some_and(|id| projects.iter().any(|p| &p.id == id));
            if !keep {
                state.active_project_id = None;
            }
            state.projects = projects;
        });
        info!(count, "Loaded projects");

        if let Err(e) = self.refresh_counts().await {
            warn!(error = %e, "Failed to refresh task counts");
        }
        Ok(())
    }

    pub async fn refresh_counts(&self) -> Result<()> {
        let counts = self.remote.count_tasks().await?;
        self.mutate(|state| state.counts = counts);
        Ok(())
    }

    /// Fetch one project's columns and tasks and replace its board.
    pub async fn load_board(&self, project_id: &str) -> Result<()> {
        if self.read(|s| s.project(project_id).is_none()) {
            return Err(BoardError::ProjectNotFound {
                id: project_id.to_string(),
            });
        }

        let (columns, tasks) = tokio::try_join!(
            self.remote.list_columns(project_id),
            self.remote.list_tasks(project_id)
        )?;
        let board = normalize::assemble_board(&columns, &tasks);
        let column_count = board.len();

        let replaced = self.mutate(|state| match state.project_mut(project_id) {
            Some(project) => {
                let previous = std::mem::replace(&mut project.columns, board);
                carry_unsaved(previous, &mut project.columns);
                true
            }
            None => false,
        });
        if !replaced {
            debug!(project_id, "Project left the tree during board load");
            return Ok(());
        }
        info!(project_id, columns = column_count, "Loaded board");
        Ok(())
    }

    pub fn set_active_project(&self, project_id: Option<&str>) -> Result<()> {
        if let Some(id) = project_id
            && self.read(|s| s.project(id).is_none())
        {
            return Err(BoardError::ProjectNotFound { id: id.to_string() });
        }
        self.mutate(|state| state.active_project_id = project_id.map(str::to_string));
        Ok(())
    }

    /// Derived progress for a project, if counts are known for it.
    pub fn project_progress(&self, project_id: &str) -> Option<ProjectProgress> {
        self.read(|state| {
            let counts = state.counts.get(project_id)?;
            let completed = state
                .project(project_id)
                .map(|p| {
                    p.columns
                        .iter()
                        .filter(|c| c.is_done)
                        .map(|c| counts.by_column.get(&c.id).copied().unwrap_or(0))
                        .sum::<u64>()
                })
                .unwrap_or(0);
            Some(ProjectProgress::new(counts.total, completed))
        })
    }

    // ── Projects ──────────────────────────────────────────────────────

    /// Create a project and make it active. Returns the server id; on
    /// failure the project stays in the tree marked as errored.
    pub async fn create_project(&self, title: &str, description: &str) -> Result<String> {
        let temp = temp_id();
        let now = Utc::now();
        let project = Project {
            id: temp.clone(),
            title: title.to_string(),
            description: description.to_string(),
            status: ProjectStatus::Active,
            columns: Vec::new(),
            created_at: Some(now),
            updated_at: Some(now),
            sync: SyncState::PendingCreate,
        };
        self.mutate(|state| {
            state.projects.push(project);
            state.active_project_id = Some(temp.clone());
        });

        let payload = NewProject {
            title: title.to_string(),
            description: description.to_string(),
            status: ProjectStatus::Active,
        };
        let entity = Entity::Project(temp);
        match self.remote.create_project(&payload).await {
            Ok(server_id) => {
                if !self.mutate(|state| state.assign_id(&entity, &server_id)) {
                    debug!(id = %server_id, "Created project no longer in tree");
                }
                info!(id = %server_id, title, "Created project");
                Ok(server_id)
            }
            Err(e) => {
                warn!(title, error = %e, "Failed to create project");
                self.mark(&entity, SyncEvent::Failed);
                Err(e)
            }
        }
    }

    /// Merge `update` into a project. Remote failure is returned after the
    /// project is marked as errored; the edits are kept.
    pub async fn update_project(&self, id: &str, update: ProjectUpdate) -> Result<()> {
        if update.status == Some(ProjectStatus::Inactive) {
            return self.archive_project(id).await;
        }
        let entity = Entity::Project(id.to_string());
        self.try_mutate(|state| {
            let project = state
                .project_mut(id)
                .ok_or_else(|| BoardError::ProjectNotFound { id: id.to_string() })?;
            if let Some(title) = &update.title {
                project.title = title.clone();
            }
            if let Some(description) = &update.description {
                project.description = description.clone();
            }
            if let Some(status) = update.status {
                project.status = status;
            }
            project.updated_at = Some(Utc::now());
            project.sync = project.sync.apply(SyncEvent::Begin);
            Ok(())
        })?;

        let patch = ProjectPatch {
            title: update.title,
            description: update.description,
            status: update.status,
        };
        match self.remote.update_project(id, &patch).await {
            Ok(()) => {
                self.mark(&entity, SyncEvent::Acknowledged);
                Ok(())
            }
            Err(e) => {
                warn!(id, error = %e, "Failed to update project");
                self.mark(&entity, SyncEvent::Failed);
                Err(e)
            }
        }
    }

    /// Remove a project from the tree and mark it inactive remotely.
    pub async fn archive_project(&self, id: &str) -> Result<()> {
        self.try_mutate(|state| {
            let index = state
                .projects
                .iter()
                .position(|p| p.id == id)
                .ok_or_else(|| BoardError::ProjectNotFound { id: id.to_string() })?;
            state.projects.remove(index);
            state.counts.remove(id);
            if state.active_project_id.as_deref() == Some(id) {
                state.active_project_id = None;
            }
            Ok(())
        })?;

        if is_temp_id(id) {
            debug!(id, "Archived project was never created remotely");
            return Ok(());
        }

        let patch = ProjectPatch {
            status: Some(ProjectStatus::Inactive),
            ..Default::default()
        };
        match self.remote.update_project(id, &patch).await {
            Ok(()) => info!(id, "Archived project"),
            Err(e) => {
                warn!(id, error = %e, "Failed to archive project");
                self.recover(Recovery::RefetchProjects).await;
            }
        }
        Ok(())
    }

    // ── Columns ───────────────────────────────────────────────────────

    /// Append a column to the active project. Returns the server id, or the
    /// temporary id when the create failed.
    pub async fn add_column(&self) -> Result<String> {
        let temp = temp_id();
        let payload = self.try_mutate(|state| {
            let project_id = state
                .active_project_id
                .clone()
                .ok_or(BoardError::NoActiveProject)?;
            let project = state
                .project_mut(&project_id)
                .ok_or(BoardError::NoActiveProject)?;
            let count = project.columns.len();
            let column = Column {
                id: temp.clone(),
                title: NEW_COLUMN_TITLE.to_string(),
                color: palette_color(count).to_string(),
                is_done: false,
                position: count as i64,
                tasks: Vec::new(),
                sync: SyncState::PendingCreate,
            };
            let payload = NewColumn {
                project_id,
                title: column.title.clone(),
                color: column.color.clone(),
                position: column.position,
                completed: false,
            };
            project.columns.push(column);
            Ok(payload)
        })?;

        let entity = Entity::Column(temp.clone());
        match self.remote.create_column(&payload).await {
            Ok(server_id) => {
                if !self.mutate(|state| state.assign_id(&entity, &server_id)) {
                    debug!(id = %server_id, "Created column no longer in tree");
                }
                info!(id = %server_id, project_id = %payload.project_id, "Created column");
                Ok(server_id)
            }
            Err(e) => {
                warn!(project_id = %payload.project_id, error = %e, "Failed to create column");
                self.mark(&entity, SyncEvent::Failed);
                Ok(temp)
            }
        }
    }

    async fn patch_column(
        &self,
        id: &str,
        edit: impl FnOnce(&mut Column) -> ColumnPatch,
    ) -> Result<()> {
        let patch = self.try_mutate(|state| {
            let column = state
                .column_mut(id)
                .ok_or_else(|| BoardError::ColumnNotFound { id: id.to_string() })?;
            let patch = edit(column);
            column.sync = column.sync.apply(SyncEvent::Begin);
            Ok(patch)
        })?;

        let result = self.remote.update_column(id, &patch).await;
        self.settle(
            Entity::Column(id.to_string()),
            result,
            Recovery::KeepWithError,
            "update column",
        )
        .await;
        Ok(())
    }

    pub async fn rename_column(&self, id: &str, title: &str) -> Result<()> {
        let title = title.trim();
        if title.is_empty() {
            return Err(BoardError::InvalidValue(
                "column title cannot be empty".to_string(),
            ));
        }
        self.patch_column(id, |column| {
            column.title = title.to_string();
            ColumnPatch {
                title: Some(title.to_string()),
                ..Default::default()
            }
        })
        .await
    }

    pub async fn recolor_column(&self, id: &str, color: &str) -> Result<()> {
        self.patch_column(id, |column| {
            column.color = color.to_string();
            ColumnPatch {
                color: Some(color.to_string()),
                ..Default::default()
            }
        })
        .await
    }

    /// Flip the column's done flag, then refresh counts so progress
    /// reflects it.
    pub async fn toggle_column_done(&self, id: &str) -> Result<()> {
        self.patch_column(id, |column| {
            column.is_done = !column.is_done;
            ColumnPatch {
                completed: Some(column.is_done),
                ..Default::default()
            }
        })
        .await?;
        if let Err(e) = self.refresh_counts().await {
            warn!(error = %e, "Failed to refresh task counts");
        }
        Ok(())
    }

    /// Remove a column and its tasks.
    pub async fn delete_column(&self, id: &str) -> Result<()> {
        self.try_mutate(|state| {
            let project = state
                .projects
                .iter_mut()
                .find(|p| p.columns.iter().any(|c| c.id == id))
                .ok_or_else(|| BoardError::ColumnNotFound { id: id.to_string() })?;
            project.columns.retain(|c| c.id != id);
            ordering::renumber(&mut project.columns);
            Ok(())
        })?;

        if is_temp_id(id) {
            debug!(id, "Deleted column was never created remotely");
            return Ok(());
        }

        match self.remote.delete_column(id).await {
            Ok(()) => info!(id, "Deleted column"),
            Err(e) => {
                warn!(id, error = %e, "Failed to delete column");
                self.recover(Recovery::RefetchProjects).await;
            }
        }
        Ok(())
    }

    /// Sequential per-column position updates for one project.
    pub async fn reorder_columns(&self, active_id: &str, over_id: &str) -> Result<()> {
        let (project_id, positions) = self.try_mutate(|state| {
            let project_id = state
                .column_owner(active_id)
                .ok_or_else(|| BoardError::ColumnNotFound {
                    id: active_id.to_string(),
                })?;
            let Some(project) = state.project_mut(&project_id) else {
                return Err(BoardError::ProjectNotFound { id: project_id });
            };
            if !ordering::reorder_columns(&mut project.columns, active_id, over_id) {
                return Err(BoardError::ColumnNotFound {
                    id: over_id.to_string(),
                });
            }
            let mut positions = Vec::with_capacity(project.columns.len());
            for column in project.columns.iter_mut().filter(|c| !is_temp_id(&c.id)) {
                column.sync = column.sync.apply(SyncEvent::Begin);
                positions.push((column.id.clone(), column.position));
            }
            Ok((project_id, positions))
        })?;

        let entities: Vec<Entity> = positions
            .iter()
            .map(|(id, _)| Entity::Column(id.clone()))
            .collect();
        for (id, position) in &positions {
            let patch = ColumnPatch {
                position: Some(*position),
                ..Default::default()
            };
            if let Err(e) = self.remote.update_column(id, &patch).await {
                warn!(id = %id, error = %e, "Failed to sync column position");
                self.mark_all(&entities, SyncEvent::Failed);
                self.recover(Recovery::RefetchBoard(project_id)).await;
                return Ok(());
            }
        }
        self.mark_all(&entities, SyncEvent::Acknowledged);
        debug!(project_id = %project_id, columns = positions.len(), "Synced column order");
        Ok(())
    }

    // ── Tasks ─────────────────────────────────────────────────────────

    /// Append a task to a column. Returns the server id, or the temporary
    /// id when the create failed.
    pub async fn add_task(&self, column_id: &str, draft: TaskDraft) -> Result<String> {
        let temp = temp_id();
        let assignee = draft
            .assignee
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(&self.user)
            .to_string();
        let tags = normalize::sanitize_tags(&draft.tags);

        let payload = self.try_mutate(|state| {
            let project_id = state
                .column_owner(column_id)
                .ok_or_else(|| BoardError::ColumnNotFound {
                    id: column_id.to_string(),
                })?;
            let column = state
                .column_mut(column_id)
                .ok_or_else(|| BoardError::ColumnNotFound {
                    id: column_id.to_string(),
                })?;
            let position = column.tasks.len() as i64;
            column.tasks.push(Task {
                id: temp.clone(),
                content: draft.content.clone(),
                description: draft.description.clone(),
                tags: tags.clone(),
                priority: draft.priority,
                assignee: assignee.clone(),
                start_date: draft.start_date,
                end_date: draft.end_date,
                checklist: draft.checklist.clone(),
                position,
                sync: SyncState::PendingCreate,
            });
            Ok(NewTask {
                project_id,
                column_id: column_id.to_string(),
                content: draft.content.clone(),
                description: draft.description.clone(),
                tags,
                priority: draft.priority,
                assignee,
                start_date: draft.start_date,
                end_date: draft.end_date,
                position,
            })
        })?;

        let entity = Entity::Task(temp.clone());
        let server_id = match self.remote.create_task(&payload).await {
            Ok(server_id) => server_id,
            Err(e) => {
                warn!(column_id, error = %e, "Failed to create task");
                self.mark(&entity, SyncEvent::Failed);
                return Ok(temp);
            }
        };

        if !self.mutate(|state| state.assign_id(&entity, &server_id)) {
            debug!(id = %server_id, "Created task no longer in tree");
            return Ok(server_id);
        }
        info!(id = %server_id, column_id, "Created task");

        if !draft.checklist.is_empty() {
            let result = self.remote.save_checklist(&server_id, &draft.checklist).await;
            self.settle(
                Entity::Task(server_id.clone()),
                result,
                Recovery::KeepWithError,
                "save checklist",
            )
            .await;
        }
        Ok(server_id)
    }

    /// Merge `update` into a task. Priority and assignee changes are
    /// recorded in the activity log.
    pub async fn update_task(&self, id: &str, update: TaskUpdate) -> Result<()> {
        let tags = update.tags.as_deref().map(normalize::sanitize_tags);
        let (project_id, before) = self.try_mutate(|state| {
            let (project, _, _) = state
                .find_task(id)
                .ok_or_else(|| BoardError::TaskNotFound { id: id.to_string() })?;
            let project_id = project.id.clone();
            let task = state
                .task_mut(id)
                .ok_or_else(|| BoardError::TaskNotFound { id: id.to_string() })?;
            let before = task.clone();
            if let Some(content) = &update.content {
                task.content = content.clone();
            }
            if let Some(description) = &update.description {
                task.description = description.clone();
            }
            if let Some(tags) = &tags {
                task.tags = tags.clone();
            }
            if let Some(priority) = update.priority {
                task.priority = priority;
            }
            if let Some(assignee) = &update.assignee {
                task.assignee = assignee.clone();
            }
            if let Some(start_date) = update.start_date {
                task.start_date = start_date;
            }
            if let Some(end_date) = update.end_date {
                task.end_date = end_date;
            }
            if let Some(checklist) = &update.checklist {
                task.checklist = checklist.clone();
            }
            task.sync = task.sync.apply(SyncEvent::Begin);
            Ok((project_id, before))
        })?;

        let mut entries = Vec::new();
        if let Some(priority) = update.priority
            && priority != before.priority
        {
            entries.push(self.activity(
                id,
                &project_id,
                ActivityKind::PriorityChanged,
                format!(
                    "changed priority from {} to {}",
                    before.priority.label(),
                    priority.label()
                ),
            ));
        }
        if let Some(assignee) = &update.assignee
            && *assignee != before.assignee
        {
            entries.push(self.activity(
                id,
                &project_id,
                ActivityKind::AssigneeChanged,
                format!("changed assignee from {} to {}", before.assignee, assignee),
            ));
        }

        let patch = TaskPatch {
            content: update.content,
            description: update.description,
            tags,
            priority: update.priority,
            assignee: update.assignee,
            start_date: update.start_date,
            end_date: update.end_date,
            column_id: None,
            position: None,
        };

        let mut result = Ok(());
        if patch != TaskPatch::default() {
            result = self.remote.update_task(id, &patch).await;
        }
        if result.is_ok()
            && let Some(checklist) = &update.checklist
        {
            result = self.remote.save_checklist(id, checklist).await;
        }
        let ok = self
            .settle(
                Entity::Task(id.to_string()),
                result,
                Recovery::KeepWithError,
                "update task",
            )
            .await;

        if ok {
            for entry in entries {
                self.log_activity(entry).await;
            }
        }
        Ok(())
    }

    /// Remove a task from the tree.
    pub async fn delete_task(&self, id: &str) -> Result<()> {
        let project_id = self.try_mutate(|state| {
            let project = state
                .projects
                .iter_mut()
                .find(|p| p.columns.iter().any(|c| c.task(id).is_some()))
                .ok_or_else(|| BoardError::TaskNotFound { id: id.to_string() })?;
            for column in &mut project.columns {
                if let Some(index) = column.tasks.iter().position(|t| t.id == id) {
                    column.tasks.remove(index);
                    ordering::renumber(&mut column.tasks);
                    break;
                }
            }
            Ok(project.id.clone())
        })?;

        if is_temp_id(id) {
            debug!(id, "Deleted task was never created remotely");
            return Ok(());
        }

        match self.remote.delete_task(id).await {
            Ok(()) => info!(id, "Deleted task"),
            Err(e) => {
                warn!(id, error = %e, "Failed to delete task");
                self.recover(Recovery::RefetchBoard(project_id)).await;
            }
        }
        Ok(())
    }

    /// Drag-and-drop a task onto `over_id` (a task, or a column when
    /// dropped on empty space), then sync the new placement.
    pub async fn move_task(
        &self,
        active_id: &str,
        over_id: &str,
        source_column_id: &str,
        dest_column_id: &str,
    ) -> Result<()> {
        let (project_id, moved, dest_title, positions) = self.try_mutate(|state| {
            let project_id = state
                .column_owner(source_column_id)
                .ok_or_else(|| BoardError::ColumnNotFound {
                    id: source_column_id.to_string(),
                })?;
            let Some(project) = state.project_mut(&project_id) else {
                return Err(BoardError::ProjectNotFound { id: project_id });
            };
            let Some(dest) = project.column(dest_column_id) else {
                return Err(BoardError::ColumnNotFound {
                    id: dest_column_id.to_string(),
                });
            };
            let dest_title = dest.title.clone();
            let moved = ordering::move_task(
                &mut project.columns,
                active_id,
                over_id,
                source_column_id,
                dest_column_id,
            )
            .ok_or_else(|| BoardError::TaskNotFound {
                id: active_id.to_string(),
            })?;

            let mut positions = Vec::new();
            for column_id in moved.affected_columns() {
                if let Some(column) = project.columns.iter_mut().find(|c| c.id == column_id) {
                    for task in column.tasks.iter_mut().filter(|t| !is_temp_id(&t.id)) {
                        task.sync = task.sync.apply(SyncEvent::Begin);
                        positions.push((task.id.clone(), task.position));
                    }
                }
            }
            Ok((project_id, moved, dest_title, positions))
        })?;

        let entities: Vec<Entity> = positions
            .iter()
            .map(|(id, _)| Entity::Task(id.clone()))
            .collect();

        if let Err(e) = self
            .sync_move(&project_id, &moved, &dest_title, &positions)
            .await
        {
            warn!(task_id = active_id, error = %e, "Failed to sync task move");
            self.mark_all(&entities, SyncEvent::Failed);
            self.recover(Recovery::RefetchBoard(project_id)).await;
            return Ok(());
        }
        self.mark_all(&entities, SyncEvent::Acknowledged);
        debug!(task_id = active_id, tasks = positions.len(), "Synced task move");
        Ok(())
    }

    async fn sync_move(
        &self,
        project_id: &str,
        moved: &ordering::TaskMove,
        dest_title: &str,
        positions: &[(String, i64)],
    ) -> Result<()> {
        if moved.crosses_columns() && !is_temp_id(&moved.task_id) {
            self.remote
                .update_task(&moved.task_id, &TaskPatch::column(&moved.dest_column_id))
                .await?;
            let entry = self.activity(
                &moved.task_id,
                project_id,
                ActivityKind::Moved,
                format!("moved task to {}", dest_title),
            );
            self.log_activity(entry).await;
        }
        for (task_id, position) in positions {
            self.remote
                .update_task(task_id, &TaskPatch::position(*position))
                .await?;
        }
        Ok(())
    }
}
