//! Calendar date helpers shared by the expander and the query layer.
//!
//! Dates are plain local calendar dates (`NaiveDate`) with no time or zone.

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::RecurrenceKind;

/// Canonical `YYYY-MM-DD` form of a date.
///
/// Zero-padded ISO strings order the same way as the dates themselves.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| Error::Validation(format!("invalid date '{}': {}. Use YYYY-MM-DD.", s, e)))
}

/// Parses a `YYYY-MM` month into `(year, month)`.
pub fn parse_month(s: &str) -> Result<(i32, u32)> {
    let first = format!("{}-01", s.trim());
    let date = NaiveDate::parse_from_str(&first, "%Y-%m-%d")
        .map_err(|e| Error::Validation(format!("invalid month '{}': {}. Use YYYY-MM.", s, e)))?;
    Ok((date.year(), date.month()))
}

/// Moves `date` forward by `steps` periods of `kind`.
///
/// Month and year steps keep the day of month where it exists and clamp to
/// the last day of the target month otherwise (Jan 31 + 1 month = Feb 28/29,
/// Feb 29 + 1 year = Feb 28).
pub fn advance(date: NaiveDate, kind: RecurrenceKind, steps: u32) -> Result<NaiveDate> {
    let next = match kind {
        RecurrenceKind::Daily => date.checked_add_days(Days::new(u64::from(steps))),
        RecurrenceKind::Weekly => date.checked_add_days(Days::new(u64::from(steps) * 7)),
        RecurrenceKind::Monthly => date.checked_add_months(Months::new(steps)),
        RecurrenceKind::Yearly => steps
            .checked_mul(12)
            .and_then(|months| date.checked_add_months(Months::new(months))),
    };
    next.ok_or_else(|| {
        Error::DateOutOfRange(format!("{} + {} x {}", date_key(date), steps, kind))
    })
}

/// Day a calendar week begins on.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeekStart {
    #[default]
    Monday,
    Sunday,
}

/// First day of the week containing `date`.
pub fn week_start(date: NaiveDate, start: WeekStart) -> NaiveDate {
    let offset = match start {
        WeekStart::Monday => date.weekday().num_days_from_monday(),
        WeekStart::Sunday => date.weekday().num_days_from_sunday(),
    };
    date.checked_sub_days(Days::new(u64::from(offset)))
        .unwrap_or(NaiveDate::MIN)
}

/// Number of days in the given month.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.checked_add_months(Months::new(1)))
        .and_then(|next| next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(31)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn date_keys_order_chronologically() {
        assert_eq!(date_key(d("2025-03-07")), "2025-03-07");
        assert!(date_key(d("2025-09-30")) < date_key(d("2025-10-01")));
    }

    #[test]
    fn daily_and_weekly_add_days() {
        assert_eq!(advance(d("2025-12-30"), RecurrenceKind::Daily, 3).unwrap(), d("2026-01-02"));
        assert_eq!(advance(d("2025-10-07"), RecurrenceKind::Weekly, 2).unwrap(), d("2025-10-21"));
    }

    #[test]
    fn monthly_clamps_to_end_of_month() {
        assert_eq!(advance(d("2025-01-31"), RecurrenceKind::Monthly, 1).unwrap(), d("2025-02-28"));
        assert_eq!(advance(d("2024-01-31"), RecurrenceKind::Monthly, 1).unwrap(), d("2024-02-29"));
        assert_eq!(advance(d("2025-01-31"), RecurrenceKind::Monthly, 3).unwrap(), d("2025-04-30"));
        assert_eq!(advance(d("2025-01-29"), RecurrenceKind::Monthly, 2).unwrap(), d("2025-03-29"));
    }

    #[test]
    fn yearly_clamps_leap_day() {
        assert_eq!(advance(d("2024-02-29"), RecurrenceKind::Yearly, 1).unwrap(), d("2025-02-28"));
        assert_eq!(advance(d("2024-02-29"), RecurrenceKind::Yearly, 4).unwrap(), d("2028-02-29"));
    }

    #[test]
    fn zero_steps_is_identity() {
        for kind in [
            RecurrenceKind::Daily,
            RecurrenceKind::Weekly,
            RecurrenceKind::Monthly,
            RecurrenceKind::Yearly,
        ] {
            assert_eq!(advance(d("2025-05-05"), kind, 0).unwrap(), d("2025-05-05"));
        }
    }

    #[test]
    fn overflow_is_reported() {
        let err = advance(NaiveDate::MAX, RecurrenceKind::Daily, 1).unwrap_err();
        assert!(matches!(err, Error::DateOutOfRange(_)));
        assert!(advance(d("2025-01-01"), RecurrenceKind::Yearly, u32::MAX).is_err());
    }

    #[test]
    fn week_start_respects_preference() {
        // 2025-10-08 is a Wednesday
        assert_eq!(week_start(d("2025-10-08"), WeekStart::Monday), d("2025-10-06"));
        assert_eq!(week_start(d("2025-10-08"), WeekStart::Sunday), d("2025-10-05"));
        assert_eq!(week_start(d("2025-10-05"), WeekStart::Sunday), d("2025-10-05"));
    }

    #[test]
    fn parses_months_and_rejects_garbage() {
        assert_eq!(parse_month("2025-02").unwrap(), (2025, 2));
        assert_eq!(days_in_month(2025, 2), 28);
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2025, 12), 31);
        assert!(parse_date("10/05/2025").is_err());
        assert!(parse_month("2025-13").is_err());
    }
}
