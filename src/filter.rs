//! Search, filter and ordering for task lists.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{Priority, Schedulable, Status};

/// List ordering.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum SortKey {
    /// Earliest deadline first.
    #[default]
    Deadline,
    /// High before medium before low.
    Priority,
    /// Byte-wise ascending, case-sensitive.
    Name,
    /// Newest first.
    Created,
}

impl SortKey {
    pub const ALL: [SortKey; 4] = [SortKey::Deadline, SortKey::Priority, SortKey::Name, SortKey::Created];

    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Deadline => "deadline",
            SortKey::Priority => "priority",
            SortKey::Name => "name",
            SortKey::Created => "created",
        }
    }

    fn compare<T: Schedulable>(self, a: &T, b: &T) -> Ordering {
        match self {
            SortKey::Deadline => a.deadline().cmp(&b.deadline()),
            SortKey::Priority => b.priority().rank().cmp(&a.priority().rank()),
            SortKey::Name => a.name().cmp(b.name()),
            SortKey::Created => b.created_at().cmp(&a.created_at()),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "deadline" => Ok(SortKey::Deadline),
            "priority" => Ok(SortKey::Priority),
            "name" => Ok(SortKey::Name),
            "created" => Ok(SortKey::Created),
            other => Err(Error::Configuration(format!(
                "unknown sort key '{}'. Supported: deadline, priority, name, created",
                other
            ))),
        }
    }
}

impl TryFrom<String> for SortKey {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

/// Filter and ordering applied to a task list.
///
/// `None` for priority or status means "all".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskFilter {
    pub search: String,
    pub priority: Option<Priority>,
    pub status: Option<Status>,
    pub sort_by: SortKey,
}

fn parse_choice<T: FromStr<Err = Error>>(raw: &str) -> Result<Option<T>> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("all") {
        Ok(None)
    } else {
        raw.parse().map(Some)
    }
}

impl TaskFilter {
    /// Builds a filter from raw option strings, where `"all"` disables a field.
    pub fn parse(search: &str, priority: &str, status: &str, sort_by: &str) -> Result<Self> {
        Ok(TaskFilter {
            search: search.to_string(),
            priority: parse_choice(priority)?,
            status: parse_choice(status)?,
            sort_by: sort_by.parse()?,
        })
    }

    /// True if `item` passes every active field.
    pub fn matches<T: Schedulable>(&self, item: &T) -> bool {
        let search_ok = self.search.is_empty() || {
            let needle = self.search.to_lowercase();
            item.name().to_lowercase().contains(&needle)
                || item
                    .description()
                    .is_some_and(|d| d.to_lowercase().contains(&needle))
        };
        search_ok
            && self.priority.map_or(true, |p| item.priority() == p)
            && self.status.map_or(true, |s| item.status() == s)
    }
}

/// Returns the items passing `filter`, ordered by its sort key.
///
/// The sort is stable: items with equal keys keep their input order.
pub fn apply<T: Schedulable + Clone>(items: &[T], filter: &TaskFilter) -> Vec<T> {
    let mut selected: Vec<T> = items.iter().filter(|t| filter.matches(*t)).cloned().collect();
    selected.sort_by(|a, b| filter.sort_by.compare(a, b));
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::parse_date;
    use crate::models::{Task, TaskId};
    use chrono::{TimeZone, Utc};

    fn task(id: u64, name: &str, priority: Priority, status: Status, deadline: &str) -> Task {
        let ts = Utc.with_ymd_and_hms(2025, 10, 1, 0, 0, id as u32).unwrap();
        Task {
            id: TaskId::Num(id),
            name: name.into(),
            description: None,
            deadline: parse_date(deadline).unwrap(),
            priority,
            status,
            is_recurring: false,
            recurrence: None,
            skipped_dates: Vec::new(),
            created_at: ts,
            updated_at: ts,
        }
    }

    fn ids(list: &[Task]) -> Vec<TaskId> {
        list.iter().map(|t| t.id.clone()).collect()
    }

    fn sample() -> Vec<Task> {
        vec![
            task(1, "Integrate authentication", Priority::High, Status::Pending, "2025-10-01"),
            task(2, "Design UI", Priority::Low, Status::Completed, "2025-09-25"),
            task(3, "deploy", Priority::High, Status::Completed, "2025-10-05"),
            task(4, "Backend API", Priority::Medium, Status::InProgress, "2025-09-28"),
        ]
    }

    #[test]
    fn search_is_case_insensitive() {
        let filter = TaskFilter::parse("AUTH", "all", "all", "name").unwrap();
        assert_eq!(ids(&apply(&sample(), &filter)), [TaskId::Num(1)]);
    }

    #[test]
    fn search_matches_description() {
        let mut tasks = sample();
        tasks[1].description = Some("Mockups for the login screen".into());
        let filter = TaskFilter::parse("login", "all", "all", "deadline").unwrap();
        assert_eq!(ids(&apply(&tasks, &filter)), [TaskId::Num(2)]);
    }

    #[test]
    fn fields_combine_with_and() {
        let filter = TaskFilter::parse("", "high", "completed", "deadline").unwrap();
        assert_eq!(ids(&apply(&sample(), &filter)), [TaskId::Num(3)]);
    }

    #[test]
    fn sorts_by_each_key() {
        let tasks = sample();
        let by = |key: &str| ids(&apply(&tasks, &TaskFilter::parse("", "all", "all", key).unwrap()));
        assert_eq!(by("deadline"), [2, 4, 1, 3].map(TaskId::Num));
        assert_eq!(by("priority"), [1, 3, 4, 2].map(TaskId::Num));
        assert_eq!(by("name"), [4, 2, 1, 3].map(TaskId::Num));
        assert_eq!(by("created"), [4, 3, 2, 1].map(TaskId::Num));
    }

    #[test]
    fn unknown_sort_key_is_a_configuration_error() {
        assert!(matches!(
            TaskFilter::parse("", "all", "all", "urgency"),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            TaskFilter::parse("", "urgent", "all", "name"),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn default_filter_keeps_everything_by_deadline() {
        let filter = TaskFilter::default();
        assert_eq!(filter.sort_by, SortKey::Deadline);
        assert_eq!(apply(&sample(), &filter).len(), 4);
    }
}
