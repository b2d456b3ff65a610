//! Mutations of the base task list.
//!
//! These only ever touch base tasks. Occurrences are derived afterwards and
//! nothing here writes them back.

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::{Error, Result};
use crate::models::{Priority, Recurrence, Status, Task, TaskId};
use crate::recurrence::{cap_reaching, expand, Window};

/// User input for a new task.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub name: String,
    pub description: Option<String>,
    pub deadline: NaiveDate,
    pub priority: Priority,
    pub status: Status,
    pub recurrence: Option<Recurrence>,
}

/// Partial update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub priority: Option<Priority>,
    pub status: Option<Status>,
    pub recurrence: Option<Recurrence>,
    /// Turns a recurring task back into a one-off task.
    pub clear_recurrence: bool,
}

fn validate_rule(deadline: NaiveDate, rule: &Recurrence) -> Result<()> {
    if rule.interval < 1 {
        return Err(Error::Validation("repeat interval must be at least 1".into()));
    }
    if let Some(end) = rule.end_date {
        if end < deadline {
            return Err(Error::Validation(format!(
                "end date {} is before the first occurrence {}",
                end, deadline
            )));
        }
    }
    Ok(())
}

/// Checks a new task before it is stored.
pub fn validate(new: &NewTask, today: NaiveDate) -> Result<()> {
    if new.name.trim().is_empty() {
        return Err(Error::Validation("task name is required".into()));
    }
    if new.deadline < today {
        return Err(Error::Validation(format!(
            "deadline {} cannot be in the past",
            new.deadline
        )));
    }
    if let Some(rule) = &new.recurrence {
        validate_rule(new.deadline, rule)?;
    }
    Ok(())
}

fn next_id(tasks: &[Task]) -> TaskId {
    let max = tasks
        .iter()
        .filter_map(|t| match t.id {
            TaskId::Num(n) => Some(n),
            TaskId::Text(_) => None,
        })
        .max()
        .unwrap_or(0);
    TaskId::Num(max + 1)
}

fn find_mut<'a>(tasks: &'a mut [Task], id: &TaskId) -> Result<&'a mut Task> {
    tasks
        .iter_mut()
        .find(|t| &t.id == id)
        .ok_or_else(|| Error::TaskNotFound(id.clone()))
}

/// Validates `new` and appends it to `tasks`, returning the new id.
pub fn add_task(tasks: &mut Vec<Task>, new: NewTask, now: DateTime<Utc>, today: NaiveDate) -> Result<TaskId> {
    let id = next_id(tasks);
    insert_task(tasks, id, new, now, today)
}

/// Like [`add_task`], with the id chosen by the caller.
pub fn insert_task(
    tasks: &mut Vec<Task>,
    id: TaskId,
    new: NewTask,
    now: DateTime<Utc>,
    today: NaiveDate,
) -> Result<TaskId> {
    validate(&new, today)?;
    if tasks.iter().any(|t| t.id == id) {
        return Err(Error::Validation(format!("task id {} is already taken", id)));
    }
    let is_recurring = new.recurrence.is_some();
    tasks.push(Task {
        id: id.clone(),
        name: new.name.trim().to_string(),
        description: new.description.filter(|d| !d.trim().is_empty()),
        deadline: new.deadline,
        priority: new.priority,
        status: new.status,
        is_recurring,
        recurrence: new.recurrence,
        skipped_dates: Vec::new(),
        created_at: now,
        updated_at: now,
    });
    Ok(id)
}

/// Applies `patch` to the task with `id`.
///
/// Past deadlines are allowed here so that old tasks stay editable.
pub fn update_task(tasks: &mut [Task], id: &TaskId, patch: TaskPatch, now: DateTime<Utc>) -> Result<()> {
    let task = find_mut(tasks, id)?;
    let mut updated = task.clone();
    if let Some(name) = patch.name {
        if name.trim().is_empty() {
            return Err(Error::Validation("task name is required".into()));
        }
        updated.name = name.trim().to_string();
    }
    if let Some(description) = patch.description {
        updated.description = Some(description).filter(|d| !d.trim().is_empty());
    }
    if let Some(deadline) = patch.deadline {
        updated.deadline = deadline;
    }
    if let Some(priority) = patch.priority {
        updated.priority = priority;
    }
    if let Some(status) = patch.status {
        updated.status = status;
    }
    if patch.clear_recurrence {
        updated.is_recurring = false;
        updated.recurrence = None;
        updated.skipped_dates.clear();
    } else if let Some(rule) = patch.recurrence {
        updated.is_recurring = true;
        updated.recurrence = Some(rule);
    }
    if let Some(rule) = updated.rule()? {
        validate_rule(updated.deadline, rule)?;
    }
    updated.updated_at = now;
    *task = updated;
    Ok(())
}

/// Sets the status of a base task.
pub fn set_status(tasks: &mut [Task], id: &TaskId, status: Status, now: DateTime<Utc>) -> Result<()> {
    let task = find_mut(tasks, id)?;
    task.status = status;
    task.updated_at = now;
    Ok(())
}

/// Flips a base task between completed and pending, returning the new status.
pub fn toggle_status(tasks: &mut [Task], id: &TaskId, now: DateTime<Utc>) -> Result<Status> {
    let task = find_mut(tasks, id)?;
    task.status = task.status.toggled();
    task.updated_at = now;
    Ok(task.status)
}

/// Removes a task. For a recurring task this removes the whole series.
pub fn delete_task(tasks: &mut Vec<Task>, id: &TaskId) -> Result<Task> {
    let idx = tasks
        .iter()
        .position(|t| &t.id == id)
        .ok_or_else(|| Error::TaskNotFound(id.clone()))?;
    Ok(tasks.remove(idx))
}

/// Suppresses the single occurrence of series `id` on `date`.
///
/// The rest of the series is unaffected. `max_instances` counts from `date`,
/// so occurrences of a long-running series can still be skipped.
pub fn skip_occurrence(
    tasks: &mut [Task],
    id: &TaskId,
    date: NaiveDate,
    max_instances: usize,
    now: DateTime<Utc>,
) -> Result<()> {
    let task = find_mut(tasks, id)?;
    if task.rule()?.is_none() {
        return Err(Error::Validation(format!(
            "task {} is not recurring; remove it instead",
            id
        )));
    }
    if task.skipped_dates.contains(&date) {
        return Err(Error::Validation(format!(
            "occurrence of task {} on {} is already skipped",
            id, date
        )));
    }
    let on_date = Window::new(date, date);
    let cap = cap_reaching(task, date, max_instances);
    if expand(task, &on_date, cap)?.is_empty() {
        return Err(Error::Validation(format!(
            "task {} has no occurrence on {}",
            id, date
        )));
    }
    task.skipped_dates.push(date);
    task.skipped_dates.sort();
    task.updated_at = now;
    Ok(())
}

/// Brings back a previously skipped occurrence.
pub fn restore_occurrence(tasks: &mut [Task], id: &TaskId, date: NaiveDate, now: DateTime<Utc>) -> Result<()> {
    let task = find_mut(tasks, id)?;
    let before = task.skipped_dates.len();
    task.skipped_dates.retain(|d| *d != date);
    if task.skipped_dates.len() == before {
        return Err(Error::Validation(format!(
            "occurrence of task {} on {} is not skipped",
            id, date
        )));
    }
    task.updated_at = now;
    Ok(())
}
