//! Repository layer — entity-scoped database operations.
//!
//! Free functions over a `rusqlite::Connection`, shared by
//! [`crate::db::SqliteStore`] and by tests that want direct access.
//! Everything is stored as TEXT: ISO dates and datetimes, hyphenated
//! UUIDs, JSON for the frequency class and trigger-time list.

mod event;
mod order;

pub use event::{
    events_for_order, events_for_patient, insert_event, record_administration,
};
pub use order::{due_orders, get_order, insert_order, update_order};

use std::error::Error;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Type;
use uuid::Uuid;

pub(crate) const DATE_FMT: &str = "%Y-%m-%d";
pub(crate) const DATETIME_FMT: &str = "%Y-%m-%dT%H:%M:%S";

pub(crate) fn fmt_datetime(dt: NaiveDateTime) -> String {
    dt.format(DATETIME_FMT).to_string()
}

/// Map a stored-text parse failure to the rusqlite error shape so it can
/// surface from inside `query_map` closures instead of being papered over.
fn conversion_error(
    idx: usize,
    err: impl Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

pub(crate) fn parse_uuid(idx: usize, s: &str) -> Result<Uuid, rusqlite::Error> {
    s.parse().map_err(|e: uuid::Error| conversion_error(idx, e))
}

pub(crate) fn parse_date(idx: usize, s: &str) -> Result<NaiveDate, rusqlite::Error> {
    NaiveDate::parse_from_str(s, DATE_FMT).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn parse_datetime(
    idx: usize,
    s: &str,
) -> Result<NaiveDateTime, rusqlite::Error> {
    NaiveDateTime::parse_from_str(s, DATETIME_FMT).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn parse_json<T: serde::de::DeserializeOwned>(
    idx: usize,
    s: &str,
) -> Result<T, rusqlite::Error> {
    serde_json::from_str(s).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn parse_enum<T>(idx: usize, s: &str) -> Result<T, rusqlite::Error>
where
    T: std::str::FromStr<Err = crate::db::StoreError>,
{
    s.parse().map_err(|e| conversion_error(idx, e))
}
