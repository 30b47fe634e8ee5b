//! Normalization boundary between service records and canonical models.
//!
//! The board service has accumulated several encodings over time:
//! tags as a single string, a JSON-encoded string or a native array;
//! completion flags as `"Sim"`/`"Não"`; ids as strings or numbers; dates
//! with or without a time part. Everything is resolved here so the store
//! only ever sees the typed shapes in [`models`](super::models).

use std::collections::HashSet;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::warn;

use super::models::{
    ChecklistItem, Column, DEFAULT_TAG_COLOR, Priority, Project, ProjectStatus, Tag, Task,
    palette_color,
};
use super::remote::{ColumnRecord, ProjectRecord, TaskRecord};
use super::sync::SyncState;

/// Read an identifier that may be a string or a number.
pub fn id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn is_sentinel(s: &str) -> bool {
    s.is_empty() || s == "undefined" || s == "null"
}

// ── Tags ──────────────────────────────────────────────────────────────

/// Normalize any tag encoding into a deduplicated tag list.
pub fn parse_tags(raw: Option<&Value>) -> Vec<Tag> {
    match raw {
        Some(value) => sanitize_tags(&tags_from_value(value)),
        None => Vec::new(),
    }
}

fn tags_from_value(value: &Value) -> Vec<Tag> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if is_sentinel(s) {
                return Vec::new();
            }
            if (s.starts_with('[') || s.starts_with('{'))
                && let Ok(parsed) = serde_json::from_str::<Value>(s)
                && !parsed.is_string()
            {
                return tags_from_value(&parsed);
            }
            vec![Tag::new(s, s, DEFAULT_TAG_COLOR)]
        }
        Value::Array(items) => items.iter().filter_map(tag_from_value).collect(),
        Value::Object(_) => tag_from_value(value).into_iter().collect(),
        _ => Vec::new(),
    }
}

fn tag_from_value(value: &Value) -> Option<Tag> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            Some(Tag::new(s, s, DEFAULT_TAG_COLOR))
        }
        Value::Object(map) => {
            let name = map
                .get("name")
                .or_else(|| map.get("label"))
                .and_then(Value::as_str)?
                .trim()
                .to_string();
            let id = map
                .get("id")
                .and_then(id_from_value)
                .unwrap_or_else(|| name.clone());
            let color = map
                .get("color")
                .and_then(Value::as_str)
                .filter(|c| !c.trim().is_empty())
                .unwrap_or(DEFAULT_TAG_COLOR)
                .to_string();
            Some(Tag { id, name, color })
        }
        _ => None,
    }
}

/// Drop invalid tags and duplicates (by id), keeping first-seen order.
/// Applied to every tag list before it is written to the service.
pub fn sanitize_tags(tags: &[Tag]) -> Vec<Tag> {
    let mut seen = HashSet::new();
    tags.iter()
        .filter(|t| t.is_valid())
        .filter(|t| seen.insert(t.id.clone()))
        .cloned()
        .collect()
}

// ── Scalars ───────────────────────────────────────────────────────────

/// Read the legacy completion flag. `"Sim"` (any case), `true`, `"true"`
/// and non-zero numbers mean done.
pub fn parse_done_flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => matches!(
            s.trim().to_lowercase().as_str(),
            "sim" | "true" | "yes" | "1"
        ),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => false,
    }
}

pub fn parse_position(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Unknown or missing priorities read as medium.
pub fn parse_priority(value: Option<&str>) -> Priority {
    let Some(raw) = value else {
        return Priority::default();
    };
    if let Ok(priority) = Priority::from_str(raw) {
        return priority;
    }
    match raw.trim().to_lowercase().as_str() {
        "baixa" => Priority::Low,
        "alta" => Priority::High,
        _ => Priority::default(),
    }
}

/// Accepts `YYYY-MM-DD`, a full timestamp starting with one, or `DD/MM/YYYY`.
pub fn parse_date(value: Option<&str>) -> Option<NaiveDate> {
    let s = value?.trim();
    if is_sentinel(s) {
        return None;
    }
    if let Some(prefix) = s.get(..10)
        && let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d")
    {
        return Some(date);
    }
    NaiveDate::parse_from_str(s, "%d/%m/%Y").ok()
}

pub fn parse_timestamp(value: Option<&str>) -> Option<DateTime<Utc>> {
    let s = value?.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|dt| dt.and_utc())
}

pub fn parse_checklist(value: Option<&Value>) -> Vec<ChecklistItem> {
    let items = match value {
        Some(Value::Array(items)) => items.clone(),
        Some(Value::String(s)) => match serde_json::from_str::<Value>(s.trim()) {
            Ok(Value::Array(items)) => items,
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let map = item.as_object()?;
            let text = map
                .get("text")
                .or_else(|| map.get("title"))
                .and_then(Value::as_str)?
                .to_string();
            let id = map
                .get("id")
                .and_then(id_from_value)
                .unwrap_or_else(|| format!("check-{}", index));
            let completed = map
                .get("completed")
                .or_else(|| map.get("checked"))
                .is_some_and(|v| parse_done_flag(Some(v)));
            Some(ChecklistItem {
                id,
                text,
                completed,
            })
        })
        .collect()
}

// ── Entities ──────────────────────────────────────────────────────────

/// Build a column, or `None` when the record lacks an id or title.
/// `index` is the record's arrival order, used when position is missing.
pub fn column_from_record(record: &ColumnRecord, index: usize) -> Option<Column> {
    let id = record.id.clone()?;
    let title = record
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())?
        .to_string();
    let color = record
        .color
        .clone()
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| palette_color(index).to_string());

    Some(Column {
        id,
        title,
        color,
        is_done: parse_done_flag(record.completed.as_ref()),
        position: parse_position(record.position.as_ref()).unwrap_or(index as i64),
        tasks: Vec::new(),
        sync: SyncState::Synced,
    })
}

pub fn task_from_record(record: &TaskRecord, index: usize) -> Option<Task> {
    let id = record.id.clone()?;
    let tags_raw = record
        .tags
        .as_ref()
        .filter(|v| !v.is_null())
        .or(record.tag.as_ref());
    let assignee = record
        .assignee
        .as_deref()
        .filter(|a| !is_sentinel(a.trim()))
        .or(record.created_by.as_deref())
        .unwrap_or_default()
        .to_string();

    Some(Task {
        id,
        content: record.content.clone().unwrap_or_default(),
        description: record.description.clone().unwrap_or_default(),
        tags: parse_tags(tags_raw),
        priority: parse_priority(record.priority.as_deref()),
        assignee,
        start_date: parse_date(record.start_date.as_deref()),
        end_date: parse_date(record.end_date.as_deref()),
        checklist: parse_checklist(record.checklist.as_ref()),
        position: parse_position(record.position.as_ref()).unwrap_or(index as i64),
        sync: SyncState::Synced,
    })
}

/// Nest tasks under their columns and order both levels by position.
///
/// Columns without an id or title are dropped, as are tasks whose column
/// reference does not match a kept column. Sorting is stable, so equal
/// positions keep arrival order and repeated loads produce the same tree.
pub fn assemble_board(columns: &[ColumnRecord], tasks: &[TaskRecord]) -> Vec<Column> {
    let mut board: Vec<Column> = columns
        .iter()
        .enumerate()
        .filter_map(|(index, record)| {
            let column = column_from_record(record, index);
            if column.is_none() {
                warn!(id = ?record.id, "Dropping column record missing id or title");
            }
            column
        })
        .collect();

    for (index, record) in tasks.iter().enumerate() {
        let Some(task) = task_from_record(record, index) else {
            warn!("Dropping task record without id");
            continue;
        };
        let owner = record
            .column_id
            .as_deref()
            .and_then(|cid| board.iter_mut().find(|c| c.id == cid));
        match owner {
            Some(column) => column.tasks.push(task),
            None => warn!(
                task_id = %task.id,
                column_id = ?record.column_id,
                "Dropping task that references an unknown column"
            ),
        }
    }

    sort_board(&mut board);
    board
}

/// Columns embedded in a project record, possibly with nested tasks.
pub fn columns_from_serialized(value: Option<&Value>) -> Vec<Column> {
    let items = match value {
        Some(Value::Array(items)) => items.clone(),
        Some(Value::String(s)) => match serde_json::from_str::<Value>(s.trim()) {
            Ok(Value::Array(items)) => items,
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    let mut board: Vec<Column> = items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let record: ColumnRecord = serde_json::from_value(item).ok()?;
            let mut column = column_from_record(&record, index)?;
            column.tasks = record
                .tasks
                .iter()
                .flatten()
                .enumerate()
                .filter_map(|(i, t)| task_from_record(t, i))
                .collect();
            Some(column)
        })
        .collect();
    sort_board(&mut board);
    board
}

fn sort_board(board: &mut [Column]) {
    board.sort_by_key(|c| c.position);
    for column in board.iter_mut() {
        column.tasks.sort_by_key(|t| t.position);
    }
}

pub fn project_from_record(record: &ProjectRecord) -> Option<Project> {
    let id = record.id.clone()?;
    let status = record
        .status
        .as_deref()
        .and_then(|s| ProjectStatus::from_str(s).ok())
        .unwrap_or_default();

    Some(Project {
        id,
        title: record.title.clone().unwrap_or_default(),
        description: record.description.clone().unwrap_or_default(),
        status,
        columns: columns_from_serialized(record.columns.as_ref()),
        created_at: parse_timestamp(record.created_at.as_deref()),
        updated_at: parse_timestamp(record.updated_at.as_deref()),
        sync: SyncState::Synced,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tags_from_json_string() {
        let raw = json!(r##"[{"id":"1","name":"Bug","color":"#ef4444"}]"##);
        let tags = parse_tags(Some(&raw));
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "Bug");
        assert_eq!(tags[0].color, "#ef4444");
    }

    #[test]
    fn test_tags_from_parsed_object() {
        let raw = json!({"id": "1", "name": "Bug", "color": "#ef4444"});
        let tags = parse_tags(Some(&raw));
        assert_eq!(tags, vec![Tag::new("1", "Bug", "#ef4444")]);
    }

    #[test]
    fn test_tags_sentinels_are_empty() {
        assert!(parse_tags(Some(&json!("undefined"))).is_empty());
        assert!(parse_tags(Some(&json!("[]"))).is_empty());
        assert!(parse_tags(Some(&json!(""))).is_empty());
        assert!(parse_tags(Some(&Value::Null)).is_empty());
        assert!(parse_tags(None).is_empty());
    }

    #[test]
    fn test_tags_legacy_single_string() {
        let tags = parse_tags(Some(&json!("Frontend")));
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "Frontend");
        assert_eq!(tags[0].id, "Frontend");
        assert_eq!(tags[0].color, DEFAULT_TAG_COLOR);
    }

    #[test]
    fn test_tags_native_array_dedupes_by_id_in_order() {
        let raw = json!([
            {"id": "2", "name": "UX", "color": "#8b5cf6"},
            {"id": 1, "name": "Bug"},
            {"id": "2", "name": "UX again"},
            {"id": "3", "name": "undefined"}
        ]);
        let tags = parse_tags(Some(&raw));
        let names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["UX", "Bug"]);
        assert_eq!(tags[1].id, "1");
    }

    #[test]
    fn test_sanitize_tags_strips_invalid() {
        let tags = vec![
            Tag::new("a", "", "#000"),
            Tag::new("b", "Ok", "#000"),
            Tag::new("c", "undefined", "#000"),
        ];
        let clean = sanitize_tags(&tags);
        assert_eq!(clean, vec![Tag::new("b", "Ok", "#000")]);
    }

    #[test]
    fn test_done_flag_variants() {
        assert!(parse_done_flag(Some(&json!("Sim"))));
        assert!(parse_done_flag(Some(&json!("sim"))));
        assert!(parse_done_flag(Some(&json!(true))));
        assert!(!parse_done_flag(Some(&json!("Não"))));
        assert!(!parse_done_flag(Some(&json!(false))));
        assert!(!parse_done_flag(None));
    }

    #[test]
    fn test_position_from_string_or_number() {
        assert_eq!(parse_position(Some(&json!(3))), Some(3));
        assert_eq!(parse_position(Some(&json!("4"))), Some(4));
        assert_eq!(parse_position(Some(&json!(2.0))), Some(2));
        assert_eq!(parse_position(Some(&json!("x"))), None);
    }

    #[test]
    fn test_priority_fallbacks() {
        assert_eq!(parse_priority(Some("high")), Priority::High);
        assert_eq!(parse_priority(Some("Alta")), Priority::High);
        assert_eq!(parse_priority(Some("???")), Priority::Medium);
        assert_eq!(parse_priority(None), Priority::Medium);
    }

    #[test]
    fn test_dates() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(parse_date(Some("2024-03-09")), Some(d));
        assert_eq!(parse_date(Some("2024-03-09T10:00:00.000Z")), Some(d));
        assert_eq!(parse_date(Some("09/03/2024")), Some(d));
        assert_eq!(parse_date(Some("")), None);
        assert_eq!(parse_date(Some("null")), None);
    }

    #[test]
    fn test_checklist_from_json_string() {
        let raw = json!(r#"[{"id":"c1","text":"Write","completed":true},{"text":"Review"}]"#);
        let items = parse_checklist(Some(&raw));
        assert_eq!(items.len(), 2);
        assert!(items[0].completed);
        assert_eq!(items[1].id, "check-1");
        assert!(!items[1].completed);
    }

    #[test]
    fn test_assemble_board_nests_sorts_and_drops() {
        let columns: Vec<ColumnRecord> = serde_json::from_value(json!([
            {"id": "c2", "title": "Done", "position": 1, "completed": "Sim"},
            {"id": "c1", "title": "Todo", "position": 0, "completed": "Não"},
            {"id": "c3", "position": 2}
        ]))
        .unwrap();
        let tasks: Vec<TaskRecord> = serde_json::from_value(json!([
            {"id": "t2", "columnId": "c1", "content": "Second", "position": 1},
            {"id": "t1", "columnId": "c1", "content": "First", "position": 0},
            {"id": "t3", "columnId": "c2", "content": "Shipped", "position": 0},
            {"id": "t4", "columnId": "c3", "content": "Orphan", "position": 0}
        ]))
        .unwrap();

        let board = assemble_board(&columns, &tasks);
        assert_eq!(board.len(), 2);
        assert_eq!(board[0].id, "c1");
        assert!(!board[0].is_done);
        assert!(board[1].is_done);
        let todo: Vec<&str> = board[0].tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(todo, vec!["t1", "t2"]);
        assert_eq!(board[1].tasks[0].content, "Shipped");
    }

    #[test]
    fn test_task_assignee_falls_back_to_creator() {
        let record: TaskRecord = serde_json::from_value(json!({
            "id": "t1", "assignee": "undefined", "createdBy": "Ana"
        }))
        .unwrap();
        let task = task_from_record(&record, 0).unwrap();
        assert_eq!(task.assignee, "Ana");
    }

    #[test]
    fn test_task_prefers_tags_over_legacy_tag() {
        let record: TaskRecord = serde_json::from_value(json!({
            "id": "t1",
            "tag": "Legacy",
            "tags": [{"id": "9", "name": "Modern"}]
        }))
        .unwrap();
        let task = task_from_record(&record, 0).unwrap();
        assert_eq!(task.tags.len(), 1);
        assert_eq!(task.tags[0].name, "Modern");

        let legacy: TaskRecord =
            serde_json::from_value(json!({"id": "t2", "tag": "Legacy", "tags": null})).unwrap();
        assert_eq!(task_from_record(&legacy, 0).unwrap().tags[0].name, "Legacy");
    }

    #[test]
    fn test_project_with_serialized_columns() {
        let record: ProjectRecord = serde_json::from_value(json!({
            "id": 5,
            "title": "Launch",
            "status": "paused",
            "createdAt": "2024-01-02T03:04:05Z",
            "columns": r#"[{"id":"c1","title":"Todo","position":0,"tasks":[{"id":"t1","content":"A"}]}]"#
        }))
        .unwrap();
        let project = project_from_record(&record).unwrap();
        assert_eq!(project.id, "5");
        assert_eq!(project.status, ProjectStatus::Paused);
        assert_eq!(project.columns.len(), 1);
        assert_eq!(project.columns[0].tasks[0].id, "t1");
        assert!(project.created_at.is_some());
    }

    #[test]
    fn test_project_without_id_is_dropped() {
        let record = ProjectRecord {
            title: Some("No id".into()),
            ..Default::default()
        };
        assert!(project_from_record(&record).is_none());
    }
}
