use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use super::{fmt_datetime, parse_datetime, parse_enum, parse_uuid};
use crate::db::StoreError;
use crate::models::{AdministrationEvent, MedicationOrder};

const EVENT_COLUMNS: &str = "id, order_id, patient_id, scanned_patient_code,
     scanned_medication_code, attempt_at, verification, window_outcome,
     override_reason, actor_id";

/// Append one administration event. The table is the audit trail of
/// record: no update or delete counterpart exists.
pub fn insert_event(conn: &Connection, event: &AdministrationEvent) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO administration_events (
            id, order_id, patient_id, scanned_patient_code,
            scanned_medication_code, attempt_at, verification, window_outcome,
            override_reason, actor_id
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            event.id.to_string(),
            event.order_id.to_string(),
            event.patient_id.to_string(),
            event.scanned_patient_code,
            event.scanned_medication_code,
            fmt_datetime(event.attempt_at),
            event.verification.as_str(),
            event.window.map(|w| w.as_str()),
            event.override_reason,
            event.actor_id.to_string(),
        ],
    )?;
    Ok(())
}

/// Atomic accepted-administration write: the event append and the order's
/// scheduling-state update commit together or roll back together.
pub fn record_administration(
    conn: &mut Connection,
    order: &MedicationOrder,
    event: &AdministrationEvent,
) -> Result<(), StoreError> {
    let tx = conn.transaction()?;
    insert_event(&tx, event)?;
    super::update_order(&tx, order)?;
    tx.commit()?;
    Ok(())
}

pub fn events_for_order(
    conn: &Connection,
    order_id: &Uuid,
) -> Result<Vec<AdministrationEvent>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {EVENT_COLUMNS} FROM administration_events
         WHERE order_id = ?1
         ORDER BY attempt_at DESC"
    ))?;
    let events = stmt
        .query_map(params![order_id.to_string()], map_event_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(events)
}

pub fn events_for_patient(
    conn: &Connection,
    patient_id: &Uuid,
    since: NaiveDateTime,
) -> Result<Vec<AdministrationEvent>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {EVENT_COLUMNS} FROM administration_events
         WHERE patient_id = ?1 AND attempt_at >= ?2
         ORDER BY attempt_at DESC"
    ))?;
    let events = stmt
        .query_map(
            params![patient_id.to_string(), fmt_datetime(since)],
            map_event_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(events)
}

fn map_event_row(row: &Row<'_>) -> Result<AdministrationEvent, rusqlite::Error> {
    Ok(AdministrationEvent {
        id: parse_uuid(0, &row.get::<_, String>(0)?)?,
        order_id: parse_uuid(1, &row.get::<_, String>(1)?)?,
        patient_id: parse_uuid(2, &row.get::<_, String>(2)?)?,
        scanned_patient_code: row.get(3)?,
        scanned_medication_code: row.get(4)?,
        attempt_at: parse_datetime(5, &row.get::<_, String>(5)?)?,
        verification: parse_enum(6, &row.get::<_, String>(6)?)?,
        window: row
            .get::<_, Option<String>>(7)?
            .map(|s| parse_enum(7, &s))
            .transpose()?,
        override_reason: row.get(8)?,
        actor_id: parse_uuid(9, &row.get::<_, String>(9)?)?,
    })
}
