//! Due-time computation for medication orders.
//!
//! One scheduler replaces the near-identical switch statements that used
//! to live in every administration form. The computation is pure: the
//! caller supplies the reference instant (from [`crate::clock::Clock`]),
//! so for fixed inputs the result is unique and reproducible.

pub mod frequency;

pub use frequency::FrequencyClass;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use thiserror::Error;

/// Registration-time configuration errors. Fatal: a misconfigured order
/// is rejected when it is registered, never at administration time.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Trigger time count mismatch: expected {expected}, got {actual}")]
    TriggerCountMismatch { expected: usize, actual: usize },

    #[error("No trigger times resolvable for frequency {class}")]
    EmptyTriggerSet { class: String },

    #[error("Interval frequency needs exactly one anchor time, got {supplied}")]
    AnchorRequired { supplied: usize },

    #[error("Interval hours out of range 1..=24: {hours}")]
    InvalidInterval { hours: u8 },

    #[error("End date {end} precedes start date {start}")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },

    #[error("Unknown frequency shorthand: {0:?}")]
    UnknownFrequency(String),
}

/// Check the order's calendar bounds.
pub fn validate_dates(
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
) -> Result<(), ConfigError> {
    match end_date {
        Some(end) if end < start_date => Err(ConfigError::EndBeforeStart {
            start: start_date,
            end,
        }),
        _ => Ok(()),
    }
}

/// Compute the next due instant strictly after `reference`.
///
/// `triggers` is the effective trigger set from
/// [`FrequencyClass::resolve_triggers`] — ascending and non-empty for
/// every scheduled class. Returns `None` for PRN (always due, nothing to
/// schedule).
///
/// Rules, in order:
/// - a start date after the reference instant wins outright: the result
///   is the start date at the first trigger time;
/// - otherwise the earliest trigger today strictly greater than
///   `reference` (an attempt at exactly the trigger instant is already
///   due, so computing from it rolls forward);
/// - otherwise the first trigger on the next dose day — tomorrow, or the
///   next weekday-anniversary of the start date for weekly orders.
pub fn next_due(
    frequency: &FrequencyClass,
    start_date: NaiveDate,
    triggers: &[NaiveTime],
    reference: NaiveDateTime,
) -> Option<NaiveDateTime> {
    if frequency.is_prn() {
        return None;
    }
    let first = *triggers.first()?;

    if start_date > reference.date() {
        return Some(start_date.and_time(first));
    }

    if matches!(frequency, FrequencyClass::Weekly) {
        return Some(next_weekly(start_date, triggers, first, reference));
    }

    let today = reference.date();
    for &t in triggers {
        let candidate = today.and_time(t);
        if candidate > reference {
            return Some(candidate);
        }
    }
    Some((today + Duration::days(1)).and_time(first))
}

/// Weekly orders dose only on whole-week anniversaries of the start date.
fn next_weekly(
    start_date: NaiveDate,
    triggers: &[NaiveTime],
    first: NaiveTime,
    reference: NaiveDateTime,
) -> NaiveDateTime {
    let offset = (reference.date() - start_date).num_days().rem_euclid(7);
    let cycle_day = reference.date() - Duration::days(offset);
    if offset == 0 {
        for &t in triggers {
            let candidate = cycle_day.and_time(t);
            if candidate > reference {
                return candidate;
            }
        }
    }
    (cycle_day + Duration::days(7)).and_time(first)
}
