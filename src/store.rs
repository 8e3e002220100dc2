//! Narrow persistence boundary for the ledger.
//!
//! The engine owns no storage technology: the ledger reads and writes
//! orders and events through this trait, and the host wires in whatever
//! backs it. [`crate::db::SqliteStore`] is the bundled reference
//! implementation.

use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::db::StoreError;
use crate::models::{AdministrationEvent, MedicationOrder};

/// Everything the ledger needs from persistence.
pub trait RecordStore: Send + Sync {
    fn insert_order(&self, order: &MedicationOrder) -> Result<(), StoreError>;

    fn load_order(&self, id: &Uuid) -> Result<MedicationOrder, StoreError>;

    /// Persist the mutable scheduling fields and status of an order.
    fn update_order(&self, order: &MedicationOrder) -> Result<(), StoreError>;

    /// Persist an accepted administration atomically: the event append
    /// and the order update land together or not at all.
    fn record_administration(
        &self,
        order: &MedicationOrder,
        event: &AdministrationEvent,
    ) -> Result<(), StoreError>;

    /// Active orders due at or before `before`, soonest first. Overdue
    /// orders qualify by construction.
    fn due_orders(&self, before: NaiveDateTime) -> Result<Vec<MedicationOrder>, StoreError>;

    /// Audit trail for one order, newest first.
    fn events_for_order(
        &self,
        order_id: &Uuid,
    ) -> Result<Vec<AdministrationEvent>, StoreError>;

    /// Audit trail for one patient since `since`, newest first.
    fn events_for_patient(
        &self,
        patient_id: &Uuid,
        since: NaiveDateTime,
    ) -> Result<Vec<AdministrationEvent>, StoreError>;
}
