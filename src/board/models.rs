use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::sync::SyncState;
use crate::errors::BoardError;

/// Colors handed out to new columns, cycled by column count.
pub const COLUMN_PALETTE: &[&str] = &[
    "#3b82f6", "#22c55e", "#f59e0b", "#ef4444", "#8b5cf6", "#ec4899", "#14b8a6", "#64748b",
];

pub const DEFAULT_TAG_COLOR: &str = "#64748b";

pub fn palette_color(index: usize) -> &'static str {
    COLUMN_PALETTE[index % COLUMN_PALETTE.len()]
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Syncing,
    Synced,
    Error,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Syncing => "syncing",
            Self::Synced => "synced",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Active,
    Paused,
    Inactive,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Inactive => "inactive",
        }
    }
}

impl FromStr for ProjectStatus {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "paused" => Ok(Self::Paused),
            "inactive" => Ok(Self::Inactive),
            _ => Err(BoardError::InvalidValue(format!(
                "project status '{}' (expected active, paused or inactive)",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Capitalized form used in activity descriptions.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl FromStr for Priority {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(BoardError::InvalidValue(format!(
                "priority '{}' (expected low, medium or high)",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub id: String,
    pub name: String,
    pub color: String,
}

impl Tag {
    pub fn new(id: impl Into<String>, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: color.into(),
        }
    }

    /// Empty names and the `"undefined"`/`"null"` sentinels are never persisted.
    pub fn is_valid(&self) -> bool {
        let name = self.name.trim();
        !name.is_empty() && name != "undefined" && name != "null"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChecklistItem {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: String,
    pub content: String,
    pub description: String,
    pub tags: Vec<Tag>,
    pub priority: Priority,
    pub assignee: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub checklist: Vec<ChecklistItem>,
    pub position: i64,
    pub sync: SyncState,
}

impl Task {
    pub fn sync_status(&self) -> SyncStatus {
        self.sync.status()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Column {
    pub id: String,
    pub title: String,
    pub color: String,
    pub is_done: bool,
    pub position: i64,
    pub tasks: Vec<Task>,
    pub sync: SyncState,
}

impl Column {
    pub fn sync_status(&self) -> SyncStatus {
        self.sync.status()
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: ProjectStatus,
    pub columns: Vec<Column>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub sync: SyncState,
}

impl Project {
    pub fn sync_status(&self) -> SyncStatus {
        self.sync.status()
    }

    pub fn column(&self, id: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == id)
    }

    pub fn task_count(&self) -> usize {
        self.columns.iter().map(|c| c.tasks.len()).sum()
    }
}

/// Per-project task counts served by the count endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskCounts {
    #[serde(default)]
    pub total: u64,
    #[serde(default, alias = "by_column")]
    pub by_column: HashMap<String, u64>,
    #[serde(default, alias = "by_priority")]
    pub by_priority: HashMap<String, u64>,
}

/// Dashboard progress for one project, derived from [`TaskCounts`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProjectProgress {
    pub total: u64,
    pub completed: u64,
    pub percent: u8,
}

impl ProjectProgress {
    pub fn new(total: u64, completed: u64) -> Self {
        let percent = if total == 0 {
            0
        } else {
            ((completed.min(total) * 100) / total) as u8
        };
        Self {
            total,
            completed,
            percent,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    PriorityChanged,
    AssigneeChanged,
    Moved,
}

/// Audit-trail entry sent to the activity endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub task_id: String,
    pub project_id: String,
    pub user: String,
    pub action: ActivityKind,
    pub description: String,
    pub created_at: DateTime<Utc>,
}
