use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDateTime;
use rusqlite::Connection;
use uuid::Uuid;

use super::{repository, StoreError};
use crate::models::{AdministrationEvent, MedicationOrder};
use crate::store::RecordStore;

/// Open a SQLite connection to the given path and run migrations
pub fn open_database(path: &Path) -> Result<Connection, StoreError> {
    let conn = Connection::open(path)?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing)
pub fn open_memory_database() -> Result<Connection, StoreError> {
    let conn = Connection::open_in_memory()?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

fn configure_pragmas(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "PRAGMA journal_mode=DELETE;
         PRAGMA foreign_keys=ON;",
    )?;
    Ok(())
}

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    let current_version = get_current_version(conn);

    let migrations: Vec<(i64, &str)> = vec![(
        1,
        include_str!("../../resources/migrations/001_initial.sql"),
    )];

    for (version, sql) in migrations {
        if version > current_version {
            tracing::info!("Running migration v{version}");
            conn.execute_batch(sql)
                .map_err(|e| StoreError::MigrationFailed {
                    version,
                    reason: e.to_string(),
                })?;
        }
    }

    Ok(())
}

/// Get the current schema version (0 if no schema exists yet)
fn get_current_version(conn: &Connection) -> i64 {
    conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
        row.get::<_, i64>(0)
    })
    .unwrap_or(0)
}

/// Reference [`RecordStore`] implementation over a single SQLite
/// connection. The connection lives behind a mutex; the ledger's
/// per-order locks serialize administration flows above this, so the
/// connection lock only guards raw statement execution.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Ok(Self {
            conn: Mutex::new(open_database(path)?),
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self {
            conn: Mutex::new(open_memory_database()?),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

impl RecordStore for SqliteStore {
    fn insert_order(&self, order: &MedicationOrder) -> Result<(), StoreError> {
        repository::insert_order(&*self.conn()?, order)
    }

    fn load_order(&self, id: &Uuid) -> Result<MedicationOrder, StoreError> {
        repository::get_order(&*self.conn()?, id)
    }

    fn update_order(&self, order: &MedicationOrder) -> Result<(), StoreError> {
        repository::update_order(&*self.conn()?, order)
    }

    fn record_administration(
        &self,
        order: &MedicationOrder,
        event: &AdministrationEvent,
    ) -> Result<(), StoreError> {
        repository::record_administration(&mut *self.conn()?, order, event)
    }

    fn due_orders(&self, before: NaiveDateTime) -> Result<Vec<MedicationOrder>, StoreError> {
        repository::due_orders(&*self.conn()?, before)
    }

    fn events_for_order(
        &self,
        order_id: &Uuid,
    ) -> Result<Vec<AdministrationEvent>, StoreError> {
        repository::events_for_order(&*self.conn()?, order_id)
    }

    fn events_for_patient(
        &self,
        patient_id: &Uuid,
        since: NaiveDateTime,
    ) -> Result<Vec<AdministrationEvent>, StoreError> {
        repository::events_for_patient(&*self.conn()?, patient_id, since)
    }
}
