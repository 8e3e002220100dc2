use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use super::{fmt_datetime, parse_date, parse_datetime, parse_enum, parse_json, parse_uuid, DATE_FMT};
use crate::db::StoreError;
use crate::models::MedicationOrder;

const ORDER_COLUMNS: &str = "id, patient_id, name, dose, route, frequency, trigger_times,
     start_date, end_date, status, next_due, last_administered, stop_reason";

pub fn insert_order(conn: &Connection, order: &MedicationOrder) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO medication_orders (
            id, patient_id, name, dose, route, frequency, trigger_times,
            start_date, end_date, status, next_due, last_administered, stop_reason
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            order.id.to_string(),
            order.patient_id.to_string(),
            order.name,
            order.dose,
            order.route,
            serde_json::to_string(&order.frequency)?,
            serde_json::to_string(&order.trigger_times)?,
            order.start_date.format(DATE_FMT).to_string(),
            order.end_date.map(|d| d.format(DATE_FMT).to_string()),
            order.status.as_str(),
            order.next_due.map(fmt_datetime),
            order.last_administered.map(fmt_datetime),
            order.stop_reason,
        ],
    )?;
    Ok(())
}

pub fn get_order(conn: &Connection, id: &Uuid) -> Result<MedicationOrder, StoreError> {
    let result = conn.query_row(
        &format!("SELECT {ORDER_COLUMNS} FROM medication_orders WHERE id = ?1"),
        params![id.to_string()],
        map_order_row,
    );
    match result {
        Ok(order) => Ok(order),
        Err(rusqlite::Error::QueryReturnedNoRows) => Err(StoreError::NotFound {
            entity_type: "medication_order".into(),
            id: id.to_string(),
        }),
        Err(e) => Err(StoreError::from(e)),
    }
}

/// Persist the mutable fields of an order. Identity, display fields, and
/// schedule configuration are fixed at registration.
pub fn update_order(conn: &Connection, order: &MedicationOrder) -> Result<(), StoreError> {
    let updated = conn.execute(
        "UPDATE medication_orders
         SET status = ?2, next_due = ?3, last_administered = ?4, stop_reason = ?5
         WHERE id = ?1",
        params![
            order.id.to_string(),
            order.status.as_str(),
            order.next_due.map(fmt_datetime),
            order.last_administered.map(fmt_datetime),
            order.stop_reason,
        ],
    )?;
    if updated == 0 {
        return Err(StoreError::NotFound {
            entity_type: "medication_order".into(),
            id: order.id.to_string(),
        });
    }
    Ok(())
}

/// Active orders with a due instant at or before `before`, soonest first.
/// The ISO datetime encoding is fixed-width, so TEXT comparison orders
/// chronologically.
pub fn due_orders(
    conn: &Connection,
    before: NaiveDateTime,
) -> Result<Vec<MedicationOrder>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ORDER_COLUMNS} FROM medication_orders
         WHERE status = 'active' AND next_due IS NOT NULL AND next_due <= ?1
         ORDER BY next_due ASC"
    ))?;
    let orders = stmt
        .query_map(params![fmt_datetime(before)], map_order_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(orders)
}

fn map_order_row(row: &Row<'_>) -> Result<MedicationOrder, rusqlite::Error> {
    Ok(MedicationOrder {
        id: parse_uuid(0, &row.get::<_, String>(0)?)?,
        patient_id: parse_uuid(1, &row.get::<_, String>(1)?)?,
        name: row.get(2)?,
        dose: row.get(3)?,
        route: row.get(4)?,
        frequency: parse_json(5, &row.get::<_, String>(5)?)?,
        trigger_times: parse_json(6, &row.get::<_, String>(6)?)?,
        start_date: parse_date(7, &row.get::<_, String>(7)?)?,
        end_date: row
            .get::<_, Option<String>>(8)?
            .map(|s| parse_date(8, &s))
            .transpose()?,
        status: parse_enum(9, &row.get::<_, String>(9)?)?,
        next_due: row
            .get::<_, Option<String>>(10)?
            .map(|s| parse_datetime(10, &s))
            .transpose()?,
        last_administered: row
            .get::<_, Option<String>>(11)?
            .map(|s| parse_datetime(11, &s))
            .transpose()?,
        stop_reason: row.get(12)?,
    })
}
