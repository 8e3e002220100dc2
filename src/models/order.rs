use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::OrderStatus;
use crate::schedule::FrequencyClass;

/// A prescription as the engine sees it: identity, opaque display fields,
/// and the scheduling state the ledger owns.
///
/// `next_due` is derived, never hand-edited: it is recomputed whole after
/// every accepted administration and on registration. PRN orders and
/// terminal orders carry `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicationOrder {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub name: String,
    pub dose: String,
    pub route: String,
    pub frequency: FrequencyClass,
    /// Prescriber-supplied times of day. May be empty for classes with
    /// implied defaults (bedtime, meal-relative); always empty for PRN.
    pub trigger_times: Vec<NaiveTime>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: OrderStatus,
    pub next_due: Option<NaiveDateTime>,
    pub last_administered: Option<NaiveDateTime>,
    pub stop_reason: Option<String>,
}

impl MedicationOrder {
    pub fn is_active(&self) -> bool {
        self.status == OrderStatus::Active
    }

    /// Completed and discontinued orders produce no administration windows.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            OrderStatus::Completed | OrderStatus::Discontinued
        )
    }
}
