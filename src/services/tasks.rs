use std::collections::HashSet;

use thiserror::Error;

use crate::models::task::{Task, TaskIdGenerator, TaskMeta};

/// Completed-step counts that unlock a milestone, in display order.
pub const MILESTONE_THRESHOLDS: [u32; 3] = [5, 10, 20];

pub fn milestone_message(value: u32) -> &'static str {
    match value {
        5 => "You found your rhythm!",
        10 => "Momentum unlocked, keep moving.",
        20 => "Your story is unfolding fast!",
        _ => "Milestone unlocked",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectAllState {
    pub checked: bool,
    pub indeterminate: bool,
}

pub fn select_all_state(tasks: &[Task]) -> SelectAllState {
    let total = tasks.len();
    if total == 0 {
        return SelectAllState {
            checked: false,
            indeterminate: false,
        };
    }

    let selected = tasks.iter().filter(|task| task.selected).count();
    SelectAllState {
        checked: selected == total,
        indeterminate: selected > 0 && selected < total,
    }
}

/// Merges recently deleted tasks back into the live collection.
///
/// Current tasks always win on id conflicts, so re-applying with an
/// already-merged result inserts nothing. The merged list is sorted
/// ascending by id.
pub fn restore_deleted_tasks(current: &[Task], deleted: &[Task]) -> Vec<Task> {
    if deleted.is_empty() {
        return current.to_vec();
    }

    let existing_ids: HashSet<i64> = current.iter().map(|task| task.id).collect();
    let mut merged: Vec<Task> = current.to_vec();
    for task in deleted {
        if existing_ids.contains(&task.id) {
            continue;
        }
        merged.push(task.clone());
    }

    merged.sort_by_key(|task| task.id);
    merged
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MilestoneState {
    /// Thresholds at or below the completed count, in threshold order
    pub unlocked: Vec<u32>,
    /// First threshold still ahead, if any
    pub next: Option<u32>,
    pub last_unlocked: Option<u32>,
}

pub fn derive_milestone_state(completed_count: u32, thresholds: &[u32]) -> MilestoneState {
    let unlocked: Vec<u32> = thresholds
        .iter()
        .copied()
        .filter(|value| completed_count >= *value)
        .collect();
    let next = thresholds
        .iter()
        .copied()
        .find(|value| completed_count < *value);
    let last_unlocked = unlocked.last().copied();

    MilestoneState {
        unlocked,
        next,
        last_unlocked,
    }
}

/// Picks the completed task a milestone marker points at.
///
/// `milestone` is the 1-indexed completed-step count of the marker,
/// clamped to the number of completed tasks; `None` or `Some(0)` selects
/// the most recently completed task (highest id).
pub fn completed_task_for_milestone(tasks: &[Task], milestone: Option<u32>) -> Option<&Task> {
    let mut completed: Vec<&Task> = tasks.iter().filter(|task| task.completed).collect();
    if completed.is_empty() {
        return None;
    }
    completed.sort_by_key(|task| task.id);

    match milestone {
        None | Some(0) => completed.last().copied(),
        Some(count) => {
            let index = (count as usize).min(completed.len()) - 1;
            Some(completed[index])
        }
    }
}

/// Replaces the note of the matching task; unknown ids are a no-op.
pub fn update_task_note(tasks: &[Task], task_id: i64, note: &str) -> Vec<Task> {
    tasks
        .iter()
        .map(|task| {
            if task.id == task_id {
                Task {
                    note: note.to_string(),
                    ..task.clone()
                }
            } else {
                task.clone()
            }
        })
        .collect()
}

/// At most one note panel is open at a time: toggling the open one
/// closes it, toggling any other switches to it.
pub fn next_open_note_id(current_open: Option<i64>, toggled: i64) -> Option<i64> {
    if current_open == Some(toggled) {
        None
    } else {
        Some(toggled)
    }
}

#[derive(Debug, Error)]
pub enum AddTaskError {
    #[error("Please enter a step before adding.")]
    EmptyDescription,

    #[error("That step already exists. Try a different description.")]
    DuplicateDescription(String),
}

/// Appends a new task with a freshly minted id. Descriptions are trimmed
/// and must be unique case-insensitively across the collection.
pub fn add_task(
    tasks: &[Task],
    description: &str,
    meta: TaskMeta,
    ids: &mut TaskIdGenerator,
) -> Result<Vec<Task>, AddTaskError> {
    let description = description.trim();
    if description.is_empty() {
        return Err(AddTaskError::EmptyDescription);
    }

    let lowered = description.to_lowercase();
    let duplicate = tasks
        .iter()
        .any(|task| task.description.trim().to_lowercase() == lowered);
    if duplicate {
        return Err(AddTaskError::DuplicateDescription(description.to_string()));
    }

    let mut next = tasks.to_vec();
    next.push(Task {
        id: ids.next(),
        description: description.to_string(),
        completed: false,
        selected: false,
        mood: meta.mood,
        category: meta.category,
        priority: meta.priority,
        note: String::new(),
    });
    Ok(next)
}

pub fn toggle_complete(tasks: &[Task], task_id: i64) -> Vec<Task> {
    tasks
        .iter()
        .map(|task| {
            if task.id == task_id {
                Task {
                    completed: !task.completed,
                    ..task.clone()
                }
            } else {
                task.clone()
            }
        })
        .collect()
}

pub fn set_selected(tasks: &[Task], task_id: i64, selected: bool) -> Vec<Task> {
    tasks
        .iter()
        .map(|task| {
            if task.id == task_id {
                Task {
                    selected,
                    ..task.clone()
                }
            } else {
                task.clone()
            }
        })
        .collect()
}

pub fn set_all_selected(tasks: &[Task], selected: bool) -> Vec<Task> {
    tasks
        .iter()
        .map(|task| Task {
            selected,
            ..task.clone()
        })
        .collect()
}

/// Removes one task; returns the remaining collection and the removed
/// batch (for the undo buffer).
pub fn remove_task(tasks: &[Task], task_id: i64) -> (Vec<Task>, Vec<Task>) {
    partition_out(tasks, |task| task.id == task_id)
}

pub fn clear_completed(tasks: &[Task]) -> (Vec<Task>, Vec<Task>) {
    partition_out(tasks, |task| task.completed)
}

pub fn clear_selected(tasks: &[Task]) -> (Vec<Task>, Vec<Task>) {
    partition_out(tasks, |task| task.selected)
}

fn partition_out(tasks: &[Task], removes: impl Fn(&Task) -> bool) -> (Vec<Task>, Vec<Task>) {
    let mut remaining = Vec::with_capacity(tasks.len());
    let mut removed = Vec::new();
    for task in tasks {
        if removes(task) {
            removed.push(task.clone());
        } else {
            remaining.push(task.clone());
        }
    }
    (remaining, removed)
}
