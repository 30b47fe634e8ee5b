//! Contract with the Remote Board Service.
//!
//! `RemoteBoard` is the seam between the store and the network. The real
//! implementation is [`HttpRemote`](super::http::HttpRemote); tests use
//! `MockRemote`. Records are the loose shapes the service returns and are
//! only ever read through [`normalize`](super::normalize). Payloads are the
//! canonical shapes the store writes.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::models::{ActivityEntry, ChecklistItem, Priority, ProjectStatus, Tag, TaskCounts};
use super::normalize::id_from_value;
use crate::errors::Result;

#[async_trait]
pub trait RemoteBoard: Send + Sync {
    async fn list_projects(&self) -> Result<Vec<ProjectRecord>>;

    async fn list_columns(&self, project_id: &str) -> Result<Vec<ColumnRecord>>;

    async fn list_tasks(&self, project_id: &str) -> Result<Vec<TaskRecord>>;

    /// Per-project task counts keyed by project id.
    async fn count_tasks(&self) -> Result<HashMap<String, TaskCounts>>;

    /// Returns the server-assigned id.
    async fn create_project(&self, project: &NewProject) -> Result<String>;

    async fn update_project(&self, id: &str, patch: &ProjectPatch) -> Result<()>;

    /// Returns the server-assigned id.
    async fn create_column(&self, column: &NewColumn) -> Result<String>;

    async fn update_column(&self, id: &str, patch: &ColumnPatch) -> Result<()>;

    async fn delete_column(&self, id: &str) -> Result<()>;

    /// Returns the server-assigned id.
    async fn create_task(&self, task: &NewTask) -> Result<String>;

    async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<()>;

    async fn delete_task(&self, id: &str) -> Result<()>;

    async fn save_checklist(&self, task_id: &str, items: &[ChecklistItem]) -> Result<()>;

    async fn log_activity(&self, entry: &ActivityEntry) -> Result<()>;
}

// ── Records (service → store) ─────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "created_at")]
    pub created_at: Option<String>,
    #[serde(default, alias = "updated_at")]
    pub updated_at: Option<String>,
    /// Serialized column list: a JSON string, a native array, or absent.
    #[serde(default)]
    pub columns: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnRecord {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub position: Option<Value>,
    /// Legacy completion flag, `"Sim"`/`"Não"` or a boolean.
    #[serde(default, alias = "isDone", alias = "is_done")]
    pub completed: Option<Value>,
    /// Present when columns arrive embedded in a project record.
    #[serde(default)]
    pub tasks: Option<Vec<TaskRecord>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub id: Option<String>,
    #[serde(default, alias = "column_id", deserialize_with = "de_opt_id")]
    pub column_id: Option<String>,
    #[serde(default, alias = "title")]
    pub content: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    /// Legacy single-tag field.
    #[serde(default)]
    pub tag: Option<Value>,
    #[serde(default)]
    pub tags: Option<Value>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default, alias = "created_by")]
    pub created_by: Option<String>,
    #[serde(default, alias = "start_date")]
    pub start_date: Option<String>,
    #[serde(default, alias = "end_date")]
    pub end_date: Option<String>,
    #[serde(default)]
    pub checklist: Option<Value>,
    #[serde(default)]
    pub position: Option<Value>,
}

fn de_opt_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(id_from_value))
}

// ── Payloads (store → service) ────────────────────────────────────────

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub title: String,
    pub description: String,
    pub status: ProjectStatus,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewColumn {
    pub project_id: String,
    pub title: String,
    pub color: String,
    pub position: i64,
    #[serde(serialize_with = "ser_done_flag")]
    pub completed: bool,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ColumnPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "ser_opt_done_flag"
    )]
    pub completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub project_id: String,
    pub column_id: String,
    pub content: String,
    pub description: String,
    pub tags: Vec<Tag>,
    pub priority: Priority,
    pub assignee: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub position: i64,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Tag>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    /// `Some(None)` clears the date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<Option<NaiveDate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
}

impl TaskPatch {
    pub fn position(position: i64) -> Self {
        Self {
            position: Some(position),
            ..Default::default()
        }
    }

    pub fn column(column_id: &str) -> Self {
        Self {
            column_id: Some(column_id.to_string()),
            ..Default::default()
        }
    }
}

pub const DONE_FLAG_YES: &str = "Sim";
pub const DONE_FLAG_NO: &str = "Não";

fn ser_done_flag<S: Serializer>(done: &bool, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(if *done { DONE_FLAG_YES } else { DONE_FLAG_NO })
}

fn ser_opt_done_flag<S: Serializer>(
    done: &Option<bool>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match done {
        Some(done) => ser_done_flag(done, serializer),
        None => serializer.serialize_none(),
    }
}
