use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{VerificationOutcome, WindowOutcome};

/// One accepted administration attempt — the audit trail of record.
///
/// Events are append-only: the repository layer exposes no update or
/// delete path, and the ledger writes exactly one event per accepted
/// attempt. Rejected attempts leave no event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdministrationEvent {
    pub id: Uuid,
    pub order_id: Uuid,
    pub patient_id: Uuid,
    /// Raw barcode payloads as scanned, preserved for audit fidelity.
    pub scanned_patient_code: String,
    pub scanned_medication_code: String,
    pub attempt_at: NaiveDateTime,
    pub verification: VerificationOutcome,
    /// `None` for PRN attempts — there is no scheduled instant to
    /// classify against.
    pub window: Option<WindowOutcome>,
    /// Caregiver's justification when policy demanded an override.
    pub override_reason: Option<String>,
    pub actor_id: Uuid,
}
