//! Expansion of recurring tasks into dated occurrences.
//!
//! Every view works on the expanded occurrence set produced here. The set is
//! recomputed from the base tasks on each read and is never written back.

use chrono::{Datelike, Days, NaiveDate};
use tracing::{debug, trace};

use crate::dates::{advance, date_key, days_in_month};
use crate::error::{Error, Result};
use crate::models::{Occurrence, RecurrenceKind, Task};

/// Default cap on generated dates per series.
pub const DEFAULT_MAX_INSTANCES: usize = 50;

/// Inclusive range of dates a caller is interested in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Window {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Window { start, end }
    }

    /// Window covering every representable date.
    pub fn unbounded() -> Self {
        Window { start: NaiveDate::MIN, end: NaiveDate::MAX }
    }

    /// The seven days starting at `start`.
    pub fn week(start: NaiveDate) -> Self {
        let end = start.checked_add_days(Days::new(6)).unwrap_or(NaiveDate::MAX);
        Window { start, end }
    }

    /// Every day of the given calendar month.
    pub fn month(year: i32, month: u32) -> Result<Self> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| Error::Validation(format!("invalid month {}-{:02}", year, month)))?;
        let end = NaiveDate::from_ymd_opt(year, month, days_in_month(year, month))
            .ok_or_else(|| Error::Validation(format!("invalid month {}-{:02}", year, month)))?;
        Ok(Window { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl Default for Window {
    fn default() -> Self {
        Window::unbounded()
    }
}

/// Expands one task into its occurrences within `window`.
///
/// A non-recurring task comes back unchanged as its single occurrence. For a
/// recurring task, dates are generated from the anchor (`deadline`) onwards
/// and generation stops at the rule's end date, at the end of the window, or
/// after `max_instances` generated dates, whichever comes first. Dates before
/// the window and skipped dates still count against `max_instances`.
pub fn expand(task: &Task, window: &Window, max_instances: usize) -> Result<Vec<Occurrence>> {
    let rule = match task.rule()? {
        Some(rule) => rule,
        None => return Ok(vec![Occurrence::from_task(task)]),
    };
    let interval = rule.interval.max(1);

    let mut occurrences = Vec::new();
    let mut count = 0usize;
    while count < max_instances {
        // Offsets are measured from the anchor so month-end clamping never drifts.
        let steps = match u32::try_from(count).ok().and_then(|n| n.checked_mul(interval)) {
            Some(steps) => steps,
            None => break,
        };
        let current = match advance(task.deadline, rule.kind, steps) {
            Ok(date) => date,
            Err(Error::DateOutOfRange(msg)) => {
                debug!(task = %task.id, %msg, "series ran past the calendar range");
                break;
            }
            Err(e) => return Err(e),
        };
        if rule.end_date.is_some_and(|end| current > end) || current > window.end {
            break;
        }
        if current >= window.start && !task.skipped_dates.contains(&current) {
            trace!(task = %task.id, date = %date_key(current), "occurrence");
            occurrences.push(Occurrence::instance(task, current));
        }
        count += 1;
    }
    Ok(occurrences)
}

/// Cap that lets `expand` reach `date` and then yield up to `extra` more dates.
///
/// The cap in [`expand`] counts from the anchor, so a long-running series
/// would otherwise run out before reaching today. The period count is an
/// upper bound; overshooting only costs a few skipped iterations.
pub fn cap_reaching(task: &Task, date: NaiveDate, extra: usize) -> usize {
    let rule = match task.recurrence.as_ref() {
        Some(rule) if task.is_recurring && date > task.deadline => rule,
        _ => return extra,
    };
    let from = task.deadline;
    let days = (date - from).num_days().max(0) as u64;
    let months = |a: NaiveDate, b: NaiveDate| {
        let diff = (b.year() as i64 - a.year() as i64) * 12 + b.month() as i64 - a.month() as i64;
        diff.max(0) as u64
    };
    let periods = match rule.kind {
        RecurrenceKind::Daily => days,
        RecurrenceKind::Weekly => days / 7 + 1,
        RecurrenceKind::Monthly => months(from, date) + 1,
        RecurrenceKind::Yearly => months(from, date) / 12 + 1,
    };
    let steps = periods / u64::from(rule.interval.max(1)) + 1;
    usize::try_from(steps).unwrap_or(usize::MAX).saturating_add(extra)
}

/// Expands every task in `tasks` and concatenates the results.
///
/// The input is left untouched; identical inputs always give identical
/// output, occurrence ids included.
pub fn expand_all(tasks: &[Task], window: &Window, max_instances: usize) -> Result<Vec<Occurrence>> {
    let mut all = Vec::with_capacity(tasks.len());
    for task in tasks {
        all.extend(expand(task, window, max_instances)?);
    }
    debug!(
        tasks = tasks.len(),
        occurrences = all.len(),
        start = %date_key(window.start),
        end = %date_key(window.end),
        "expanded task set"
    );
    Ok(all)
}
