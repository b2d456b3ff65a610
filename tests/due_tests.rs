use chrono::{Duration, NaiveDate};
use schedulr::due::{due_state, DueState};
use schedulr::models::Status;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 10, 10).unwrap()
}

#[test]
fn test_due_labels() {
    let t = today();
    assert_eq!(due_state(t, Status::Pending, t), DueState::Today);
    assert_eq!(due_state(t + Duration::days(1), Status::Pending, t), DueState::Tomorrow);
    assert_eq!(due_state(t + Duration::days(5), Status::InProgress, t), DueState::InDays(5));
    assert_eq!(due_state(t + Duration::days(5), Status::Pending, t).to_string(), "5 days left");
}

#[test]
fn test_due_overdue() {
    let t = today();
    let state = due_state(t - Duration::days(3), Status::Pending, t);
    assert_eq!(state, DueState::Overdue(3));
    assert_eq!(state.to_string(), "3 days overdue");
    assert!(state.is_pressing());
}

#[test]
fn test_completed_is_never_overdue() {
    let t = today();
    let state = due_state(t - Duration::days(3), Status::Completed, t);
    assert_eq!(state, DueState::Done);
    assert!(!state.is_pressing());
}
