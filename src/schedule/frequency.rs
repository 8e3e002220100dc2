//! Dosing frequency classes and effective trigger-set resolution.
//!
//! The dashboard's forms historically passed frequencies around as free
//! strings, each call site re-interpreting them with its own switch. Here
//! the vocabulary is a closed enum; the only string surface left is the
//! shorthand parser for prescription entry (`FromStr`).

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveTime};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Closed set of dosing frequency semantics the scheduler understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyClass {
    /// Single administration, order completes after it is given.
    Once,
    /// Fixed number of doses per day at prescriber-supplied times.
    NTimesDaily(u8),
    /// Fixed-hour interval derived from a single anchor time.
    EveryNHours(u8),
    /// One dose day per week, anchored to the start date's weekday.
    Weekly,
    AtBedtime,
    BeforeMeals,
    AfterMeals,
    /// As needed — no schedule, never a due instant.
    Prn,
}

impl FrequencyClass {
    pub fn is_prn(&self) -> bool {
        matches!(self, Self::Prn)
    }

    /// Resolve the prescriber-supplied times into the effective trigger
    /// set: ascending, deduplicated, defaults applied where the class
    /// implies them. Registration-time validation lives here — a resolved
    /// order always has a usable trigger set.
    pub fn resolve_triggers(
        &self,
        supplied: &[NaiveTime],
    ) -> Result<Vec<NaiveTime>, ConfigError> {
        match self {
            Self::Prn => Ok(Vec::new()),
            Self::NTimesDaily(n) => {
                let expected = *n as usize;
                if expected == 0 {
                    return Err(ConfigError::EmptyTriggerSet {
                        class: self.to_string(),
                    });
                }
                let times = sorted_dedup(supplied);
                if times.len() != expected {
                    return Err(ConfigError::TriggerCountMismatch {
                        expected,
                        actual: times.len(),
                    });
                }
                Ok(times)
            }
            Self::EveryNHours(n) => {
                if !(1..=24).contains(n) {
                    return Err(ConfigError::InvalidInterval { hours: *n });
                }
                let [anchor] = supplied else {
                    return Err(ConfigError::AnchorRequired {
                        supplied: supplied.len(),
                    });
                };
                Ok(derive_interval_triggers(*anchor, i64::from(*n)))
            }
            Self::Once | Self::Weekly => {
                let times = sorted_dedup(supplied);
                if times.is_empty() {
                    return Err(ConfigError::EmptyTriggerSet {
                        class: self.to_string(),
                    });
                }
                Ok(times)
            }
            Self::AtBedtime => Ok(defaulted(supplied, bedtime_triggers())),
            Self::BeforeMeals => Ok(defaulted(supplied, before_meal_triggers())),
            Self::AfterMeals => Ok(defaulted(supplied, after_meal_triggers())),
        }
    }
}

/// `{anchor, anchor+n, anchor+2n, …}` with hour arithmetic wrapped across
/// midnight, stopping when the sequence cycles back on itself. When `n`
/// does not evenly divide 24 the wrapped set is denser than one day's
/// literal interval walk; it is sorted so the earliest-future rule still
/// applies cleanly.
fn derive_interval_triggers(anchor: NaiveTime, hours: i64) -> Vec<NaiveTime> {
    let mut times = Vec::new();
    let mut t = anchor;
    loop {
        if times.contains(&t) {
            break;
        }
        times.push(t);
        t += Duration::hours(hours); // NaiveTime addition wraps at midnight
    }
    times.sort();
    times
}

fn sorted_dedup(supplied: &[NaiveTime]) -> Vec<NaiveTime> {
    let mut times = supplied.to_vec();
    times.sort();
    times.dedup();
    times
}

fn defaulted(supplied: &[NaiveTime], default: Vec<NaiveTime>) -> Vec<NaiveTime> {
    if supplied.is_empty() {
        default
    } else {
        sorted_dedup(supplied)
    }
}

fn time_of_day(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

/// HS — conventional 21:00 unless the prescriber says otherwise.
fn bedtime_triggers() -> Vec<NaiveTime> {
    vec![time_of_day(21, 0)]
}

/// AC — half an hour before the unit's standard meal times.
fn before_meal_triggers() -> Vec<NaiveTime> {
    vec![time_of_day(7, 30), time_of_day(11, 30), time_of_day(17, 30)]
}

/// PC — half an hour after the unit's standard meal times.
fn after_meal_triggers() -> Vec<NaiveTime> {
    vec![time_of_day(8, 30), time_of_day(12, 30), time_of_day(18, 30)]
}

impl fmt::Display for FrequencyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Once => write!(f, "once"),
            Self::NTimesDaily(1) => write!(f, "daily"),
            Self::NTimesDaily(n) => write!(f, "{n}x_daily"),
            Self::EveryNHours(n) => write!(f, "q{n}h"),
            Self::Weekly => write!(f, "weekly"),
            Self::AtBedtime => write!(f, "bedtime"),
            Self::BeforeMeals => write!(f, "before_meals"),
            Self::AfterMeals => write!(f, "after_meals"),
            Self::Prn => write!(f, "prn"),
        }
    }
}

impl FromStr for FrequencyClass {
    type Err = ConfigError;

    /// Parse the clinical shorthand the dashboard's prescription forms
    /// send. Unknown strings are a typed error, never a silent default.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_ascii_lowercase();
        match norm.as_str() {
            "once" => return Ok(Self::Once),
            "daily" | "qd" | "1x_daily" => return Ok(Self::NTimesDaily(1)),
            "bid" | "2x_daily" | "twice_daily" => return Ok(Self::NTimesDaily(2)),
            "tid" | "3x_daily" => return Ok(Self::NTimesDaily(3)),
            "qid" | "4x_daily" => return Ok(Self::NTimesDaily(4)),
            "weekly" => return Ok(Self::Weekly),
            "hs" | "qhs" | "bedtime" | "at_bedtime" => return Ok(Self::AtBedtime),
            "ac" | "before_meals" => return Ok(Self::BeforeMeals),
            "pc" | "after_meals" => return Ok(Self::AfterMeals),
            "prn" | "as_needed" => return Ok(Self::Prn),
            _ => {}
        }

        let interval = Regex::new(r"^q(\d{1,2})h$").unwrap();
        if let Some(caps) = interval.captures(&norm) {
            if let Ok(n) = caps[1].parse::<u8>() {
                return Ok(Self::EveryNHours(n));
            }
        }
        let per_day = Regex::new(r"^(\d{1,2})x_daily$").unwrap();
        if let Some(caps) = per_day.captures(&norm) {
            if let Ok(n) = caps[1].parse::<u8>() {
                return Ok(Self::NTimesDaily(n));
            }
        }

        Err(ConfigError::UnknownFrequency(s.trim().to_string()))
    }
}
