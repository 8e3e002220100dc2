//! Medication administration scheduling and verification engine.
//!
//! Computes when a dose is next due from its frequency class and trigger
//! times, checks an administration attempt against the due window and the
//! scanned patient/medication identifiers, and records accepted attempts
//! as immutable audit events with at-most-once semantics per order.
//!
//! [`ledger::Ledger`] is the stateful entry point (register, administer,
//! audit queries). [`schedule::next_due`], [`window::classify`] and
//! [`verify::verify`] are the pure pieces underneath it.

pub mod clock;
pub mod config;
pub mod db;
pub mod ledger;
pub mod models;
pub mod schedule;
pub mod store;
pub mod verify;
pub mod window;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::DeploymentPolicy;
pub use db::{SqliteStore, StoreError};
pub use ledger::{
    AdministrationOutcome, AdministrationRequest, Ledger, LedgerError, OrderDraft,
    RejectionReason,
};
pub use models::{
    AdministrationEvent, MedicationOrder, MismatchReason, OrderStatus, VerificationOutcome,
    WindowOutcome,
};
pub use schedule::{next_due, ConfigError, FrequencyClass};
pub use store::RecordStore;
