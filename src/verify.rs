//! Five-rights identifier verification.
//!
//! Checks the two scanned barcodes against the targeted order: right
//! patient, right medication, and an order that is still administrable.
//! Right dose, route, and time are presentational — validated upstream at
//! prescription entry, not here. A mismatch is fatal for the attempt: the
//! caller must re-scan; nothing is recorded.

use uuid::Uuid;

use crate::models::{MedicationOrder, MismatchReason, VerificationOutcome};

/// Compare scanned identifier payloads against the order.
///
/// Scanners pad and some encode uppercase hex, so codes are compared
/// whitespace-trimmed and case-insensitively against the hyphenated UUID
/// form. Terminal orders can never be verified, PRN included.
pub fn verify(
    scanned_patient_code: &str,
    scanned_medication_code: &str,
    order: &MedicationOrder,
) -> VerificationOutcome {
    if !code_matches(scanned_patient_code, &order.patient_id) {
        return VerificationOutcome::Mismatch(MismatchReason::WrongPatient);
    }
    if !code_matches(scanned_medication_code, &order.id) {
        return VerificationOutcome::Mismatch(MismatchReason::WrongMedication);
    }
    if !order.is_active() {
        return VerificationOutcome::Mismatch(MismatchReason::OrderInactive);
    }
    VerificationOutcome::Verified
}

fn code_matches(scanned: &str, id: &Uuid) -> bool {
    scanned.trim().eq_ignore_ascii_case(&id.to_string())
}
