//! In-memory `RemoteBoard` for store tests.
//!
//! Holds server-side records so refetches observe earlier writes, records
//! every call for ordering assertions, and can fail or hold any operation.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Semaphore;

use super::models::{ActivityEntry, ChecklistItem, TaskCounts};
use super::remote::*;
use crate::errors::{BoardError, Result};

#[derive(Default)]
struct MockData {
    projects: Vec<ProjectRecord>,
    columns: Vec<(String, ColumnRecord)>,
    tasks: Vec<(String, TaskRecord)>,
    counts: HashMap<String, TaskCounts>,
    next_id: u64,
    failing: HashSet<&'static str>,
    held: HashSet<&'static str>,
    calls: Vec<String>,
    activity: Vec<ActivityEntry>,
    checklists: HashMap<String, Vec<ChecklistItem>>,
}

pub struct MockRemote {
    data: Mutex<MockData>,
    gate: Semaphore,
}

impl MockRemote {
    pub fn new() -> Self {
        Self {
            data: Mutex::new(MockData {
                next_id: 100,
                ..Default::default()
            }),
            gate: Semaphore::new(0),
        }
    }

    fn data(&self) -> std::sync::MutexGuard<'_, MockData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_project(self, id: &str, title: &str) -> Self {
        self.data().projects.push(ProjectRecord {
            id: Some(id.to_string()),
            title: Some(title.to_string()),
            description: Some(String::new()),
            status: Some("active".to_string()),
            ..Default::default()
        });
        self
    }

    pub fn with_archived_project(self, id: &str, title: &str) -> Self {
        self.data().projects.push(ProjectRecord {
            id: Some(id.to_string()),
            title: Some(title.to_string()),
            status: Some("inactive".to_string()),
            ..Default::default()
        });
        self
    }

    pub fn with_column(self, project_id: &str, id: &str, title: &str, position: i64) -> Self {
        self.data().columns.push((
            project_id.to_string(),
            ColumnRecord {
                id: Some(id.to_string()),
                title: Some(title.to_string()),
                color: Some("#3b82f6".to_string()),
                position: Some(json!(position)),
                completed: Some(json!(DONE_FLAG_NO)),
                tasks: None,
            },
        ));
        self
    }

    pub fn with_task(
        self,
        project_id: &str,
        column_id: &str,
        id: &str,
        content: &str,
        position: i64,
    ) -> Self {
        self.data().tasks.push((
            project_id.to_string(),
            TaskRecord {
                id: Some(id.to_string()),
                column_id: Some(column_id.to_string()),
                content: Some(content.to_string()),
                priority: Some("medium".to_string()),
                assignee: Some("Ana".to_string()),
                position: Some(json!(position)),
                ..Default::default()
            },
        ));
        self
    }

    pub fn with_counts(self, project_id: &str, counts: TaskCounts) -> Self {
        self.data().counts.insert(project_id.to_string(), counts);
        self
    }

    /// Make every later call to `op` fail with a 500.
    pub fn fail(&self, op: &'static str) {
        self.data().failing.insert(op);
    }

    pub fn heal(&self, op: &'static str) {
        self.data().failing.remove(op);
    }

    /// Park calls to `op` until [`release`](Self::release).
    pub fn hold(&self, op: &'static str) {
        self.data().held.insert(op);
    }

    pub fn release(&self) {
        self.data().held.clear();
        self.gate.add_permits(1024);
    }

    pub fn calls(&self) -> Vec<String> {
        self.data().calls.clone()
    }

    pub fn calls_starting_with(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }

    pub fn activity(&self) -> Vec<ActivityEntry> {
        self.data().activity.clone()
    }

    pub fn checklist(&self, task_id: &str) -> Option<Vec<ChecklistItem>> {
        self.data().checklists.get(task_id).cloned()
    }

    pub fn task_record(&self, id: &str) -> Option<TaskRecord> {
        self.data()
            .tasks
            .iter()
            .find(|(_, t)| t.id.as_deref() == Some(id))
            .map(|(_, t)| t.clone())
    }

    pub fn remove_task_record(&self, id: &str) {
        self.data().tasks.retain(|(_, t)| t.id.as_deref() != Some(id));
    }

    async fn enter(&self, op: &'static str, label: String) -> Result<()> {
        let held = {
            let mut data = self.data();
            data.calls.push(label);
            data.held.contains(op)
        };
        if held
            && let Ok(permit) = self.gate.acquire().await
        {
            permit.forget();
        }
        if self.data().failing.contains(op) {
            return Err(BoardError::Status {
                endpoint: op.to_string(),
                status: 500,
                body: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn next_id(&self) -> String {
        let mut data = self.data();
        data.next_id += 1;
        data.next_id.to_string()
    }
}

#[async_trait]
impl RemoteBoard for MockRemote {
    async fn list_projects(&self) -> Result<Vec<ProjectRecord>> {
        self.enter("list_projects", "list_projects".into()).await?;
        Ok(self.data().projects.clone())
    }

    async fn list_columns(&self, project_id: &str) -> Result<Vec<ColumnRecord>> {
        self.enter("list_columns", format!("list_columns {}", project_id))
            .await?;
        Ok(self
            .data()
            .columns
            .iter()
            .filter(|(p, _)| p == project_id)
            .map(|(_, c)| c.clone())
            .collect())
    }

    async fn list_tasks(&self, project_id: &str) -> Result<Vec<TaskRecord>> {
        self.enter("list_tasks", format!("list_tasks {}", project_id))
            .await?;
        Ok(self
            .data()
            .tasks
            .iter()
            .filter(|(p, _)| p == project_id)
            .map(|(_, t)| t.clone())
            .collect())
    }

    async fn count_tasks(&self) -> Result<HashMap<String, TaskCounts>> {
        self.enter("count_tasks", "count_tasks".into()).await?;
        Ok(self.data().counts.clone())
    }

    async fn create_project(&self, project: &NewProject) -> Result<String> {
        self.enter("create_project", format!("create_project {}", project.title))
            .await?;
        let id = self.next_id();
        self.data().projects.push(ProjectRecord {
            id: Some(id.clone()),
            title: Some(project.title.clone()),
            description: Some(project.description.clone()),
            status: Some(project.status.as_str().to_string()),
            ..Default::default()
        });
        Ok(id)
    }

    async fn update_project(&self, id: &str, patch: &ProjectPatch) -> Result<()> {
        self.enter("update_project", format!("update_project {}", id))
            .await?;
        let mut data = self.data();
        if let Some(record) = data
            .projects
            .iter_mut()
            .find(|p| p.id.as_deref() == Some(id))
        {
            if let Some(title) = &patch.title {
                record.title = Some(title.clone());
            }
            if let Some(description) = &patch.description {
                record.description = Some(description.clone());
            }
            if let Some(status) = patch.status {
                record.status = Some(status.as_str().to_string());
            }
        }
        Ok(())
    }

    async fn create_column(&self, column: &NewColumn) -> Result<String> {
        self.enter("create_column", format!("create_column {}", column.title))
            .await?;
        let id = self.next_id();
        self.data().columns.push((
            column.project_id.clone(),
            ColumnRecord {
                id: Some(id.clone()),
                title: Some(column.title.clone()),
                color: Some(column.color.clone()),
                position: Some(json!(column.position)),
                completed: Some(json!(column.completed)),
                tasks: None,
            },
        ));
        Ok(id)
    }

    async fn update_column(&self, id: &str, patch: &ColumnPatch) -> Result<()> {
        let label = match patch.position {
            Some(position) if patch.title.is_none() && patch.color.is_none() => {
                format!("column_position {}={}", id, position)
            }
            _ => format!("update_column {}", id),
        };
        self.enter("update_column", label).await?;
        let mut data = self.data();
        if let Some((_, record)) = data
            .columns
            .iter_mut()
            .find(|(_, c)| c.id.as_deref() == Some(id))
        {
            if let Some(title) = &patch.title {
                record.title = Some(title.clone());
            }
            if let Some(color) = &patch.color {
                record.color = Some(color.clone());
            }
            if let Some(done) = patch.completed {
                record.completed = Some(json!(done));
            }
            if let Some(position) = patch.position {
                record.position = Some(json!(position));
            }
        }
        Ok(())
    }

    async fn delete_column(&self, id: &str) -> Result<()> {
        self.enter("delete_column", format!("delete_column {}", id))
            .await?;
        let mut data = self.data();
        data.columns.retain(|(_, c)| c.id.as_deref() != Some(id));
        data.tasks.retain(|(_, t)| t.column_id.as_deref() != Some(id));
        Ok(())
    }

    async fn create_task(&self, task: &NewTask) -> Result<String> {
        self.enter("create_task", format!("create_task {}", task.content))
            .await?;
        let id = self.next_id();
        self.data().tasks.push((
            task.project_id.clone(),
            TaskRecord {
                id: Some(id.clone()),
                column_id: Some(task.column_id.clone()),
                content: Some(task.content.clone()),
                description: Some(task.description.clone()),
                priority: Some(task.priority.as_str().to_string()),
                tags: Some(json!(task.tags)),
                assignee: Some(task.assignee.clone()),
                position: Some(json!(task.position)),
                ..Default::default()
            },
        ));
        Ok(id)
    }

    async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<()> {
        let label = if *patch == TaskPatch::position(patch.position.unwrap_or_default()) {
            format!("task_position {}={}", id, patch.position.unwrap_or_default())
        } else if let Some(column_id) = patch
            .column_id
            .as_ref()
            .filter(|c| *patch == TaskPatch::column(c))
        {
            format!("task_column {}={}", id, column_id)
        } else {
            format!("update_task {}", id)
        };
        self.enter("update_task", label).await?;
        let mut data = self.data();
        if let Some((_, record)) = data
            .tasks
            .iter_mut()
            .find(|(_, t)| t.id.as_deref() == Some(id))
        {
            if let Some(content) = &patch.content {
                record.content = Some(content.clone());
            }
            if let Some(priority) = patch.priority {
                record.priority = Some(priority.as_str().to_string());
            }
            if let Some(assignee) = &patch.assignee {
                record.assignee = Some(assignee.clone());
            }
            if let Some(column_id) = &patch.column_id {
                record.column_id = Some(column_id.clone());
            }
            if let Some(position) = patch.position {
                record.position = Some(json!(position));
            }
        }
        Ok(())
    }

    async fn delete_task(&self, id: &str) -> Result<()> {
        self.enter("delete_task", format!("delete_task {}", id)).await?;
        self.remove_task_record(id);
        Ok(())
    }

    async fn save_checklist(&self, task_id: &str, items: &[ChecklistItem]) -> Result<()> {
        self.enter("save_checklist", format!("save_checklist {}", task_id))
            .await?;
        self.data()
            .checklists
            .insert(task_id.to_string(), items.to_vec());
        Ok(())
    }

    async fn log_activity(&self, entry: &ActivityEntry) -> Result<()> {
        self.enter("log_activity", format!("log_activity {}", entry.task_id))
            .await?;
        self.data().activity.push(entry.clone());
        Ok(())
    }
}
