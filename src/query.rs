//! Queries over an expanded occurrence set.
//!
//! "Today" is always passed in by the caller; nothing here reads the clock.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::models::{Occurrence, Status};
use crate::recurrence::Window;

/// Aggregate counts shown on the dashboard.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub overdue: usize,
}

/// Occurrences due exactly on `date`.
pub fn tasks_for_date(occurrences: &[Occurrence], date: NaiveDate) -> Vec<Occurrence> {
    occurrences.iter().filter(|o| o.deadline == date).cloned().collect()
}

/// Occurrences due in the seven days starting at `week_start`.
pub fn tasks_for_week(occurrences: &[Occurrence], week_start: NaiveDate) -> Vec<Occurrence> {
    let week = Window::week(week_start);
    occurrences.iter().filter(|o| week.contains(o.deadline)).cloned().collect()
}

/// Occurrences due in the given calendar month.
pub fn tasks_for_month(occurrences: &[Occurrence], year: i32, month: u32) -> Vec<Occurrence> {
    occurrences
        .iter()
        .filter(|o| o.deadline.year() == year && o.deadline.month() == month)
        .cloned()
        .collect()
}

/// Unfinished occurrences due today or later, soonest first, at most `limit`.
///
/// Occurrences sharing a deadline keep their input order.
pub fn upcoming(occurrences: &[Occurrence], today: NaiveDate, limit: usize) -> Vec<Occurrence> {
    let mut due: Vec<Occurrence> = occurrences
        .iter()
        .filter(|o| o.deadline >= today && o.status != Status::Completed)
        .cloned()
        .collect();
    due.sort_by_key(|o| o.deadline);
    due.truncate(limit);
    due
}

/// Unfinished occurrences whose deadline is before `today`.
pub fn overdue(occurrences: &[Occurrence], today: NaiveDate) -> Vec<Occurrence> {
    occurrences
        .iter()
        .filter(|o| is_overdue(o, today))
        .cloned()
        .collect()
}

fn is_overdue(o: &Occurrence, today: NaiveDate) -> bool {
    o.deadline < today && o.status != Status::Completed
}

/// Counts by status, plus the overdue count as of `today`.
pub fn stats(occurrences: &[Occurrence], today: NaiveDate) -> TaskStats {
    occurrences.iter().fold(TaskStats::default(), |mut acc, o| {
        acc.total += 1;
        match o.status {
            Status::Pending => acc.pending += 1,
            Status::InProgress => acc.in_progress += 1,
            Status::Completed => acc.completed += 1,
        }
        if is_overdue(o, today) {
            acc.overdue += 1;
        }
        acc
    })
}

/// Number of occurrences per day inside `window`, for calendar cells.
pub fn calendar_counts(occurrences: &[Occurrence], window: &Window) -> BTreeMap<NaiveDate, usize> {
    let mut counts = BTreeMap::new();
    for o in occurrences.iter().filter(|o| window.contains(o.deadline)) {
        *counts.entry(o.deadline).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::parse_date;
    use crate::models::{Priority, TaskId};
    use chrono::{TimeZone, Utc};

    fn d(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn occ(id: u64, deadline: &str, status: Status) -> Occurrence {
        let ts = Utc.with_ymd_and_hms(2025, 10, 1, 0, 0, 0).unwrap();
        Occurrence {
            id: TaskId::Num(id),
            parent_id: None,
            is_instance: false,
            name: format!("Task {}", id),
            description: None,
            deadline: d(deadline),
            priority: Priority::Low,
            status,
            is_recurring: false,
            recurrence: None,
            created_at: ts,
            updated_at: ts,
        }
    }

    fn ids(list: &[Occurrence]) -> Vec<TaskId> {
        list.iter().map(|o| o.id.clone()).collect()
    }

    #[test]
    fn overdue_ignores_completed() {
        let set = vec![
            occ(1, "2025-10-05", Status::Pending),
            occ(2, "2025-10-05", Status::Completed),
        ];
        assert_eq!(ids(&overdue(&set, d("2025-10-10"))), [TaskId::Num(1)]);
        assert!(overdue(&set, d("2025-10-05")).is_empty());
    }

    #[test]
    fn stats_counts_every_occurrence() {
        let set = vec![
            occ(1, "2025-10-01", Status::Pending),
            occ(2, "2025-10-20", Status::Pending),
            occ(3, "2025-10-11", Status::InProgress),
            occ(4, "2025-10-01", Status::Completed),
            occ(5, "2025-10-12", Status::Completed),
        ];
        let s = stats(&set, d("2025-10-10"));
        assert_eq!(
            s,
            TaskStats { total: 5, pending: 2, in_progress: 1, completed: 2, overdue: 1 }
        );
        let json = serde_json::to_value(s).unwrap();
        assert_eq!(json["inProgress"], 1);
    }

    #[test]
    fn upcoming_is_sorted_stable_and_limited() {
        let set = vec![
            occ(1, "2025-10-20", Status::Pending),
            occ(2, "2025-10-12", Status::Pending),
            occ(3, "2025-10-12", Status::InProgress),
            occ(4, "2025-10-11", Status::Completed),
            occ(5, "2025-10-01", Status::Pending),
            occ(6, "2025-10-10", Status::Pending),
        ];
        let list = upcoming(&set, d("2025-10-10"), 3);
        assert_eq!(ids(&list), [TaskId::Num(6), TaskId::Num(2), TaskId::Num(3)]);
        assert!(upcoming(&set, d("2025-10-10"), 0).is_empty());
    }

    #[test]
    fn date_week_and_month_lookups() {
        let set = vec![
            occ(1, "2025-10-06", Status::Pending),
            occ(2, "2025-10-12", Status::Pending),
            occ(3, "2025-10-13", Status::Pending),
            occ(4, "2025-11-01", Status::Pending),
        ];
        assert_eq!(ids(&tasks_for_date(&set, d("2025-10-12"))), [TaskId::Num(2)]);
        assert_eq!(
            ids(&tasks_for_week(&set, d("2025-10-06"))),
            [TaskId::Num(1), TaskId::Num(2)]
        );
        assert_eq!(tasks_for_month(&set, 2025, 10).len(), 3);
    }

    #[test]
    fn calendar_counts_group_by_day() {
        let set = vec![
            occ(1, "2025-10-06", Status::Pending),
            occ(2, "2025-10-06", Status::Completed),
            occ(3, "2025-11-06", Status::Pending),
        ];
        let counts = calendar_counts(&set, &Window::month(2025, 10).unwrap());
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[&d("2025-10-06")], 2);
    }
}
