//! Ordering algorithms over the board tree.
//!
//! All functions here are pure with respect to the network: they rearrange
//! the local tree and renumber positions so that siblings always hold
//! `0..n-1` in list order. The store decides what to send afterwards.

use super::models::{Column, Task};

/// Entities that carry a dense sibling position.
pub trait Positioned {
    fn set_position(&mut self, position: i64);
}

impl Positioned for Task {
    fn set_position(&mut self, position: i64) {
        self.position = position;
    }
}

impl Positioned for Column {
    fn set_position(&mut self, position: i64) {
        self.position = position;
    }
}

/// Rewrite positions to match list order.
pub fn renumber<T: Positioned>(items: &mut [T]) {
    for (index, item) in items.iter_mut().enumerate() {
        item.set_position(index as i64);
    }
}

/// Stable move: take the element at `from` and reinsert it at `to`, both
/// indices referring to the list before the move. `to` past the end
/// appends.
pub fn array_move<T>(items: &mut Vec<T>, from: usize, to: usize) {
    if from >= items.len() {
        return;
    }
    let item = items.remove(from);
    let to = to.min(items.len());
    items.insert(to, item);
}

/// Outcome of a successful [`move_task`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskMove {
    pub task_id: String,
    pub source_column_id: String,
    pub dest_column_id: String,
}

impl TaskMove {
    pub fn crosses_columns(&self) -> bool {
        self.source_column_id != self.dest_column_id
    }

    /// Columns whose task positions changed.
    pub fn affected_columns(&self) -> Vec<&str> {
        if self.crosses_columns() {
            vec![self.source_column_id.as_str(), self.dest_column_id.as_str()]
        } else {
            vec![self.source_column_id.as_str()]
        }
    }
}

/// Move `active_id` to the slot held by `over_id`.
///
/// Within one column this is a stable move to the index of `over_id`.
/// Across columns the task is removed from the source and inserted at the
/// index of `over_id` in the destination, or appended when `over_id` is not
/// a task there (a drop on the column itself, or on an empty column). When
/// `over_id` is not in a same-column list the task moves to the end.
///
/// Returns `None`, leaving the tree untouched, if the task is not in the
/// source column or either column is unknown.
pub fn move_task(
    columns: &mut [Column],
    active_id: &str,
    over_id: &str,
    source_column_id: &str,
    dest_column_id: &str,
) -> Option<TaskMove> {
    let source_idx = columns.iter().position(|c| c.id == source_column_id)?;
    let task_idx = columns[source_idx]
        .tasks
        .iter()
        .position(|t| t.id == active_id)?;

    if source_column_id == dest_column_id {
        let tasks = &mut columns[source_idx].tasks;
        let to = tasks
            .iter()
            .position(|t| t.id == over_id)
            .unwrap_or(tasks.len().saturating_sub(1));
        array_move(tasks, task_idx, to);
        renumber(tasks);
    } else {
        let dest_idx = columns.iter().position(|c| c.id == dest_column_id)?;
        let task = columns[source_idx].tasks.remove(task_idx);
        let dest = &mut columns[dest_idx].tasks;
        let insert_at = dest
            .iter()
            .position(|t| t.id == over_id)
            .unwrap_or(dest.len());
        dest.insert(insert_at, task);
        renumber(dest);
        renumber(&mut columns[source_idx].tasks);
    }

    Some(TaskMove {
        task_id: active_id.to_string(),
        source_column_id: source_column_id.to_string(),
        dest_column_id: dest_column_id.to_string(),
    })
}

/// Move column `active_id` to the slot held by `over_id` and renumber.
/// Returns `false`, leaving the list untouched, if either id is unknown.
pub fn reorder_columns(columns: &mut Vec<Column>, active_id: &str, over_id: &str) -> bool {
    let Some(from) = columns.iter().position(|c| c.id == active_id) else {
        return false;
    };
    let Some(to) = columns.iter().position(|c| c.id == over_id) else {
        return false;
    };
    array_move(columns, from, to);
    renumber(columns);
    true
}
