//! Property-based tests for expansion and filtering

use std::cmp::Ordering;

use chrono::{Days, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use schedulr::filter::{apply, SortKey, TaskFilter};
use schedulr::models::{Priority, Recurrence, RecurrenceKind, Status, Task, TaskId};
use schedulr::recurrence::{expand, expand_all, Window};

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
}

fn kind_strategy() -> impl Strategy<Value = RecurrenceKind> {
    prop_oneof![
        Just(RecurrenceKind::Daily),
        Just(RecurrenceKind::Weekly),
        Just(RecurrenceKind::Monthly),
        Just(RecurrenceKind::Yearly),
    ]
}

fn priority_strategy() -> impl Strategy<Value = Priority> {
    prop_oneof![Just(Priority::Low), Just(Priority::Medium), Just(Priority::High)]
}

fn status_strategy() -> impl Strategy<Value = Status> {
    prop_oneof![Just(Status::Pending), Just(Status::InProgress), Just(Status::Completed)]
}

/// Recurring tasks anchored somewhere in 2020-2029.
fn recurring_strategy() -> impl Strategy<Value = Task> {
    (
        0u64..3650,
        kind_strategy(),
        0u32..5,
        prop::option::of(0u64..2000),
        status_strategy(),
    )
        .prop_map(|(offset, kind, interval, end_offset, status)| {
            let deadline = base_date() + Days::new(offset);
            let end_date = end_offset.map(|e| deadline + Days::new(e));
            let at = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
            Task {
                id: TaskId::Num(offset + 1),
                name: format!("task {}", offset),
                description: None,
                deadline,
                priority: Priority::Medium,
                status,
                is_recurring: true,
                recurrence: Some(Recurrence::new(kind, interval, end_date)),
                skipped_dates: Vec::new(),
                created_at: at,
                updated_at: at,
            }
        })
}

fn window_strategy() -> impl Strategy<Value = Window> {
    (0u64..4000, 0u64..2000).prop_map(|(start, len)| {
        let start = base_date() + Days::new(start);
        Window::new(start, start + Days::new(len))
    })
}

/// One-off tasks drawn from small ranges so that sort keys often tie.
fn plain_strategy() -> impl Strategy<Value = Task> {
    (
        "[a-cA-C ]{0,3}",
        prop::option::of("[a-zA-Z ]{0,12}"),
        0u64..30,
        priority_strategy(),
        status_strategy(),
        0i64..100,
    )
        .prop_map(|(name, description, offset, priority, status, created)| {
            let at = Utc.timestamp_opt(created, 0).unwrap();
            Task {
                id: TaskId::Num(offset),
                name,
                description,
                deadline: base_date() + Days::new(offset),
                priority,
                status,
                is_recurring: false,
                recurrence: None,
                skipped_dates: Vec::new(),
                created_at: at,
                updated_at: at,
            }
        })
}

fn sort_strategy() -> impl Strategy<Value = SortKey> {
    prop_oneof![
        Just(SortKey::Deadline),
        Just(SortKey::Priority),
        Just(SortKey::Name),
        Just(SortKey::Created),
    ]
}

/// Property: expansion is bounded by the cap, stays inside the window and the
/// end date, yields pending instances only, and is strictly increasing.
#[test]
fn prop_expansion_is_bounded_and_ordered() {
    proptest!(|(task in recurring_strategy(), window in window_strategy(), cap in 0usize..60)| {
        let out = expand(&task, &window, cap).unwrap();
        let rule = task.recurrence.clone().unwrap();

        prop_assert!(out.len() <= cap);
        for o in &out {
            prop_assert!(window.contains(o.deadline));
            prop_assert!(o.deadline >= task.deadline);
            if let Some(end) = rule.end_date {
                prop_assert!(o.deadline <= end);
            }
            prop_assert_eq!(o.status, Status::Pending);
            prop_assert!(o.is_instance);
            prop_assert_eq!(o.parent_id.as_ref(), Some(&task.id));
        }
        for pair in out.windows(2) {
            prop_assert!(pair[0].deadline < pair[1].deadline);
        }
    });
}

/// Property: expanding the same input twice gives the same output.
#[test]
fn prop_expansion_is_deterministic() {
    proptest!(|(tasks in prop::collection::vec(recurring_strategy(), 0..8), window in window_strategy())| {
        let first = expand_all(&tasks, &window, 50).unwrap();
        let second = expand_all(&tasks, &window, 50).unwrap();
        prop_assert_eq!(first, second);
    });
}

/// Property: a wider window never loses occurrences of a narrower one.
#[test]
fn prop_narrow_window_is_subset() {
    proptest!(|(task in recurring_strategy(), window in window_strategy())| {
        let wide = expand(&task, &Window::unbounded(), 50).unwrap();
        let narrow = expand(&task, &window, 50).unwrap();
        for o in &narrow {
            prop_assert!(wide.iter().any(|w| w.id == o.id));
        }
    });
}

/// Property: every filtered item satisfies every active criterion, and any
/// item satisfying them all is kept.
#[test]
fn prop_filter_is_conjunction() {
    proptest!(|(
        tasks in prop::collection::vec(plain_strategy(), 0..30),
        search in "[a-z]{0,2}",
        priority in prop::option::of(priority_strategy()),
        status in prop::option::of(status_strategy()),
        sort_by in sort_strategy()
    )| {
        let filter = TaskFilter { search: search.clone(), priority, status, sort_by };
        let out = apply(&tasks, &filter);

        let needle = search.to_lowercase();
        let expected = tasks.iter().filter(|t| {
            let text = needle.is_empty()
                || t.name.to_lowercase().contains(&needle)
                || t.description.as_deref().is_some_and(|d| d.to_lowercase().contains(&needle));
            text && priority.map_or(true, |p| t.priority == p) && status.map_or(true, |s| t.status == s)
        }).count();
        prop_assert_eq!(out.len(), expected);
    });
}

/// Expected order of two tasks under `key`.
fn key_order(key: SortKey, a: &Task, b: &Task) -> Ordering {
    match key {
        SortKey::Deadline => a.deadline.cmp(&b.deadline),
        SortKey::Priority => b.priority.rank().cmp(&a.priority.rank()),
        SortKey::Name => a.name.cmp(&b.name),
        SortKey::Created => b.created_at.cmp(&a.created_at),
    }
}

/// Property: every sort key orders the output, and items with equal keys
/// keep their input order.
#[test]
fn prop_sort_is_stable() {
    proptest!(|(
        mut tasks in prop::collection::vec(plain_strategy(), 0..30),
        sort_by in sort_strategy()
    )| {
        for (i, t) in tasks.iter_mut().enumerate() {
            t.id = TaskId::Num(i as u64);
        }
        let filter = TaskFilter { sort_by, ..TaskFilter::default() };
        let out = apply(&tasks, &filter);
        prop_assert_eq!(out.len(), tasks.len());

        for pair in out.windows(2) {
            match key_order(sort_by, &pair[0], &pair[1]) {
                Ordering::Less => {}
                Ordering::Equal => prop_assert!(pair[0].id < pair[1].id, "tie reordered under {}", sort_by),
                Ordering::Greater => prop_assert!(false, "out of order under {}", sort_by),
            }
        }
    });
}
