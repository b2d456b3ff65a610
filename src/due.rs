use std::fmt;

use chrono::NaiveDate;

use crate::models::Status;

/// Where a deadline falls relative to today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueState {
    /// Already finished; the deadline no longer matters.
    Done,
    /// Deadline passed this many days ago.
    Overdue(i64),
    Today,
    Tomorrow,
    /// Due in this many days (two or more).
    InDays(i64),
}

/// Classifies a deadline for display.
///
/// # Returns
/// - `Done` if the task is completed.
/// - `Overdue(n)` if the deadline was `n` days before `today`.
/// - `Today`, `Tomorrow` or `InDays(n)` otherwise.
pub fn due_state(deadline: NaiveDate, status: Status, today: NaiveDate) -> DueState {
    if status == Status::Completed {
        return DueState::Done;
    }
    let days_left = (deadline - today).num_days();
    match days_left {
        n if n < 0 => DueState::Overdue(-n),
        0 => DueState::Today,
        1 => DueState::Tomorrow,
        n => DueState::InDays(n),
    }
}

impl DueState {
    /// Overdue or due within three days.
    pub fn is_pressing(self) -> bool {
        match self {
            DueState::Overdue(_) | DueState::Today | DueState::Tomorrow => true,
            DueState::InDays(n) => n <= 3,
            DueState::Done => false,
        }
    }
}

impl fmt::Display for DueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DueState::Done => f.write_str("Done"),
            DueState::Overdue(1) => f.write_str("1 day overdue"),
            DueState::Overdue(n) => write!(f, "{} days overdue", n),
            DueState::Today => f.write_str("Today"),
            DueState::Tomorrow => f.write_str("Tomorrow"),
            DueState::InDays(n) => write!(f, "{} days left", n),
        }
    }
}
