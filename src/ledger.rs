//! The administration ledger — owner of the authoritative scheduling
//! state and the append-only administration log.
//!
//! Everything else in the engine is a pure function; this is the one
//! shared-mutable boundary. Administration runs under a per-order
//! exclusive lock so two concurrent scans of the same medication cannot
//! both succeed and double-advance the schedule. Unrelated orders never
//! contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, TryLockError};

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::DeploymentPolicy;
use crate::db::StoreError;
use crate::models::{
    AdministrationEvent, MedicationOrder, MismatchReason, OrderStatus, VerificationOutcome,
    WindowOutcome,
};
use crate::schedule::{self, ConfigError, FrequencyClass};
use crate::store::RecordStore;
use crate::verify::verify;
use crate::window::classify;

/// Infrastructure-level ledger faults. Domain rejections are not errors —
/// they come back as [`AdministrationOutcome::Rejected`] values.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Order misconfigured: {0}")]
    Config(#[from] ConfigError),

    #[error("Order lock poisoned")]
    LockPoisoned,
}

/// Why an administration attempt was turned away. Every rejection names
/// its reason; nothing is dropped silently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    /// The five-rights identifier check failed. Fatal for the attempt;
    /// the caregiver must re-scan.
    Identity(MismatchReason),
    /// Outside the administration window under a policy that demands an
    /// explicit override reason, and none was supplied.
    OverrideRequired,
    /// Another attempt currently holds this order's lock. Retryable once
    /// the first attempt completes.
    OrderBusy,
    /// The order is active but carries no due instant to administer
    /// against (schedule state was altered out of band).
    NotAdministrable,
}

/// Result of an administration attempt.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdministrationOutcome {
    Accepted {
        event: AdministrationEvent,
        next_due: Option<NaiveDateTime>,
    },
    Rejected(RejectionReason),
}

impl AdministrationOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

/// A prescription as submitted for registration, before the engine
/// derives identity and scheduling state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDraft {
    pub patient_id: Uuid,
    pub name: String,
    pub dose: String,
    pub route: String,
    pub frequency: FrequencyClass,
    pub trigger_times: Vec<NaiveTime>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

/// One caregiver administration attempt: the two scanned barcodes, who is
/// administering, and an override justification if policy demands one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdministrationRequest {
    pub scanned_patient_code: String,
    pub scanned_medication_code: String,
    pub actor_id: Uuid,
    pub override_reason: Option<String>,
}

pub struct Ledger<S: RecordStore> {
    store: S,
    clock: Arc<dyn Clock>,
    policy: DeploymentPolicy,
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl<S: RecordStore> Ledger<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>, policy: DeploymentPolicy) -> Self {
        Self {
            store,
            clock,
            policy,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> &DeploymentPolicy {
        &self.policy
    }

    /// Validate and persist a new order, with its first due instant
    /// computed from the current clock. Configuration problems are
    /// rejected here, never at administration time.
    pub fn register(&self, draft: OrderDraft) -> Result<MedicationOrder, LedgerError> {
        schedule::validate_dates(draft.start_date, draft.end_date)?;
        let triggers = draft.frequency.resolve_triggers(&draft.trigger_times)?;

        let mut order = MedicationOrder {
            id: Uuid::new_v4(),
            patient_id: draft.patient_id,
            name: draft.name,
            dose: draft.dose,
            route: draft.route,
            frequency: draft.frequency,
            trigger_times: draft.trigger_times,
            start_date: draft.start_date,
            end_date: draft.end_date,
            status: OrderStatus::Active,
            next_due: None,
            last_administered: None,
            stop_reason: None,
        };
        reschedule(&mut order, &triggers, self.clock.now());

        self.store.insert_order(&order)?;
        tracing::info!(
            order_id = %order.id,
            patient_id = %order.patient_id,
            frequency = %order.frequency,
            next_due = ?order.next_due,
            "Medication order registered"
        );
        Ok(order)
    }

    /// Run one administration attempt end to end under the order's
    /// exclusive lock: verify identity, classify the window, apply the
    /// override policy, append the event, and reschedule from the actual
    /// attempt instant.
    ///
    /// Exactly one event is appended per accepted attempt; a rejected
    /// attempt appends nothing.
    pub fn administer(
        &self,
        order_id: &Uuid,
        request: AdministrationRequest,
    ) -> Result<AdministrationOutcome, LedgerError> {
        let lock = self.order_lock(*order_id)?;
        let _guard = match lock.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => {
                tracing::warn!(order_id = %order_id, "Administration attempt while order busy");
                return Ok(AdministrationOutcome::Rejected(RejectionReason::OrderBusy));
            }
            Err(TryLockError::Poisoned(_)) => return Err(LedgerError::LockPoisoned),
        };

        let mut order = self.store.load_order(order_id)?;

        let verification = verify(
            &request.scanned_patient_code,
            &request.scanned_medication_code,
            &order,
        );
        if let VerificationOutcome::Mismatch(reason) = verification {
            tracing::warn!(
                order_id = %order_id,
                reason = reason.as_str(),
                "Administration attempt failed identity verification"
            );
            return Ok(AdministrationOutcome::Rejected(RejectionReason::Identity(
                reason,
            )));
        }

        let now = self.clock.now();
        let window = if order.frequency.is_prn() {
            None
        } else if let Some(due) = order.next_due {
            Some(classify(due, now, self.policy.tolerance_minutes))
        } else {
            return Ok(AdministrationOutcome::Rejected(
                RejectionReason::NotAdministrable,
            ));
        };

        if window == Some(WindowOutcome::OutsideWindow)
            && self.policy.outside_window_requires_override
            && request.override_reason.is_none()
        {
            tracing::warn!(
                order_id = %order_id,
                "Attempt outside administration window without an override reason"
            );
            return Ok(AdministrationOutcome::Rejected(
                RejectionReason::OverrideRequired,
            ));
        }

        let triggers = order.frequency.resolve_triggers(&order.trigger_times)?;

        let event = AdministrationEvent {
            id: Uuid::new_v4(),
            order_id: order.id,
            patient_id: order.patient_id,
            scanned_patient_code: request.scanned_patient_code,
            scanned_medication_code: request.scanned_medication_code,
            attempt_at: now,
            verification,
            window,
            override_reason: request.override_reason,
            actor_id: request.actor_id,
        };

        order.last_administered = Some(now);
        if matches!(order.frequency, FrequencyClass::Once) {
            // A single-dose order is complete the moment it is given.
            order.status = OrderStatus::Completed;
            order.next_due = None;
        } else {
            reschedule(&mut order, &triggers, now);
        }

        self.store.record_administration(&order, &event)?;
        tracing::info!(
            order_id = %order.id,
            patient_id = %order.patient_id,
            window = ?window,
            next_due = ?order.next_due,
            "Administration recorded"
        );
        Ok(AdministrationOutcome::Accepted {
            event,
            next_due: order.next_due,
        })
    }

    /// Stop an order before its course ends. No further due instants are
    /// produced; the reason is kept on the order.
    pub fn discontinue(
        &self,
        order_id: &Uuid,
        reason: Option<String>,
    ) -> Result<MedicationOrder, LedgerError> {
        self.transition(order_id, OrderStatus::Discontinued, reason)
    }

    /// Mark an order's course as finished.
    pub fn complete(&self, order_id: &Uuid) -> Result<MedicationOrder, LedgerError> {
        self.transition(order_id, OrderStatus::Completed, None)
    }

    /// Caregiver work list: active orders due inside the horizon, soonest
    /// first. Overdue orders are included by construction.
    pub fn due_within(&self, horizon_minutes: i64) -> Result<Vec<MedicationOrder>, LedgerError> {
        let before = self.clock.now() + Duration::minutes(horizon_minutes);
        Ok(self.store.due_orders(before)?)
    }

    /// Audit trail for one order, newest first.
    pub fn events_for_order(
        &self,
        order_id: &Uuid,
    ) -> Result<Vec<AdministrationEvent>, LedgerError> {
        Ok(self.store.events_for_order(order_id)?)
    }

    /// Audit trail for one patient since `since`, newest first.
    pub fn events_for_patient(
        &self,
        patient_id: &Uuid,
        since: NaiveDateTime,
    ) -> Result<Vec<AdministrationEvent>, LedgerError> {
        Ok(self.store.events_for_patient(patient_id, since)?)
    }

    fn transition(
        &self,
        order_id: &Uuid,
        status: OrderStatus,
        reason: Option<String>,
    ) -> Result<MedicationOrder, LedgerError> {
        let lock = self.order_lock(*order_id)?;
        let _guard = lock.lock().map_err(|_| LedgerError::LockPoisoned)?;

        let mut order = self.store.load_order(order_id)?;
        order.status = status;
        order.next_due = None;
        order.stop_reason = reason;
        self.store.update_order(&order)?;
        tracing::info!(
            order_id = %order.id,
            status = status.as_str(),
            "Medication order status changed"
        );
        Ok(order)
    }

    fn order_lock(&self, order_id: Uuid) -> Result<Arc<Mutex<()>>, LedgerError> {
        let mut locks = self.locks.lock().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(locks.entry(order_id).or_default().clone())
    }
}

/// Recompute `next_due` whole from `from`, honoring the end date: an
/// order whose next dose would land past its end date has run its course
/// and completes.
fn reschedule(order: &mut MedicationOrder, triggers: &[NaiveTime], from: NaiveDateTime) {
    if order.frequency.is_prn() {
        order.next_due = None;
        return;
    }
    let due = schedule::next_due(&order.frequency, order.start_date, triggers, from);
    match (due, order.end_date) {
        (Some(d), Some(end)) if d.date() > end => {
            order.status = OrderStatus::Completed;
            order.next_due = None;
        }
        _ => order.next_due = due,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::db::SqliteStore;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn today() -> NaiveDate {
        d(2026, 3, 10)
    }

    fn make_ledger() -> (Ledger<SqliteStore>, Arc<FixedClock>) {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let clock = Arc::new(FixedClock::new(today().and_hms_opt(9, 0, 0).unwrap()));
        let ledger = Ledger::new(
            SqliteStore::open_in_memory().unwrap(),
            clock.clone(),
            DeploymentPolicy::default(),
        );
        (ledger, clock)
    }

    fn tid_draft() -> OrderDraft {
        OrderDraft {
            patient_id: Uuid::new_v4(),
            name: "Metformin".into(),
            dose: "500mg".into(),
            route: "oral".into(),
            frequency: FrequencyClass::NTimesDaily(3),
            trigger_times: vec![t(8, 0), t(14, 0), t(20, 0)],
            start_date: today(),
            end_date: None,
        }
    }

    fn request_for(order: &MedicationOrder) -> AdministrationRequest {
        AdministrationRequest {
            scanned_patient_code: order.patient_id.to_string(),
            scanned_medication_code: order.id.to_string(),
            actor_id: Uuid::new_v4(),
            override_reason: None,
        }
    }

    #[test]
    fn register_computes_first_due_instant() {
        let (ledger, _clock) = make_ledger();
        let order = ledger.register(tid_draft()).unwrap();
        assert_eq!(order.status, OrderStatus::Active);
        assert_eq!(order.next_due, Some(today().and_hms_opt(14, 0, 0).unwrap()));
    }

    #[test]
    fn register_future_start_uses_first_trigger() {
        let (ledger, _clock) = make_ledger();
        let mut draft = tid_draft();
        draft.start_date = d(2026, 4, 1);
        let order = ledger.register(draft).unwrap();
        assert_eq!(
            order.next_due,
            Some(d(2026, 4, 1).and_hms_opt(8, 0, 0).unwrap())
        );
    }

    #[test]
    fn register_rejects_misconfiguration() {
        let (ledger, _clock) = make_ledger();

        let mut draft = tid_draft();
        draft.end_date = Some(d(2026, 3, 1));
        assert!(matches!(
            ledger.register(draft).unwrap_err(),
            LedgerError::Config(ConfigError::EndBeforeStart { .. })
        ));

        let mut draft = tid_draft();
        draft.trigger_times = vec![t(8, 0)];
        assert!(matches!(
            ledger.register(draft).unwrap_err(),
            LedgerError::Config(ConfigError::TriggerCountMismatch { .. })
        ));
    }

    #[test]
    fn register_prn_has_no_due_instant() {
        let (ledger, _clock) = make_ledger();
        let mut draft = tid_draft();
        draft.frequency = FrequencyClass::Prn;
        draft.trigger_times.clear();
        let order = ledger.register(draft).unwrap();
        assert_eq!(order.next_due, None);
    }

    #[test]
    fn on_time_administration_records_and_reschedules() {
        let (ledger, clock) = make_ledger();
        let order = ledger.register(tid_draft()).unwrap();

        clock.set(today().and_hms_opt(14, 0, 0).unwrap());
        let outcome = ledger.administer(&order.id, request_for(&order)).unwrap();
        let AdministrationOutcome::Accepted { event, next_due } = outcome else {
            panic!("expected acceptance");
        };
        assert_eq!(event.window, Some(WindowOutcome::OnTime));
        assert_eq!(next_due, Some(today().and_hms_opt(20, 0, 0).unwrap()));

        let stored = ledger.events_for_order(&order.id).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, event.id);

        let reloaded = ledger.store.load_order(&order.id).unwrap();
        assert_eq!(
            reloaded.last_administered,
            Some(today().and_hms_opt(14, 0, 0).unwrap())
        );
        assert_eq!(reloaded.next_due, next_due);
    }

    #[test]
    fn late_within_tolerance_is_accepted_with_flag() {
        let (ledger, clock) = make_ledger();
        let order = ledger.register(tid_draft()).unwrap();

        clock.set(today().and_hms_opt(14, 20, 0).unwrap());
        let outcome = ledger.administer(&order.id, request_for(&order)).unwrap();
        let AdministrationOutcome::Accepted { event, next_due } = outcome else {
            panic!("expected acceptance");
        };
        assert_eq!(event.window, Some(WindowOutcome::Late));
        assert_eq!(next_due, Some(today().and_hms_opt(20, 0, 0).unwrap()));
    }

    #[test]
    fn outside_window_needs_override_reason() {
        // Worked example 4: attempt at next_due + 45min, tolerance 30.
        let (ledger, clock) = make_ledger();
        let order = ledger.register(tid_draft()).unwrap();
        clock.set(today().and_hms_opt(14, 45, 0).unwrap());

        let outcome = ledger.administer(&order.id, request_for(&order)).unwrap();
        assert!(matches!(
            outcome,
            AdministrationOutcome::Rejected(RejectionReason::OverrideRequired)
        ));
        assert!(ledger.events_for_order(&order.id).unwrap().is_empty());

        let mut request = request_for(&order);
        request.override_reason = Some("patient returned late from imaging".into());
        let outcome = ledger.administer(&order.id, request).unwrap();
        let AdministrationOutcome::Accepted { event, .. } = outcome else {
            panic!("expected acceptance with override");
        };
        assert_eq!(event.window, Some(WindowOutcome::OutsideWindow));
        assert_eq!(
            event.override_reason.as_deref(),
            Some("patient returned late from imaging")
        );

        let stored = ledger.events_for_order(&order.id).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(
            stored[0].override_reason.as_deref(),
            Some("patient returned late from imaging")
        );
    }

    #[test]
    fn outside_window_accepted_outright_when_policy_relaxed() {
        let clock = Arc::new(FixedClock::new(today().and_hms_opt(9, 0, 0).unwrap()));
        let ledger = Ledger::new(
            SqliteStore::open_in_memory().unwrap(),
            clock.clone(),
            DeploymentPolicy {
                tolerance_minutes: 30,
                outside_window_requires_override: false,
            },
        );
        let order = ledger.register(tid_draft()).unwrap();
        clock.set(today().and_hms_opt(15, 0, 0).unwrap());

        let outcome = ledger.administer(&order.id, request_for(&order)).unwrap();
        let AdministrationOutcome::Accepted { event, .. } = outcome else {
            panic!("expected acceptance");
        };
        assert_eq!(event.window, Some(WindowOutcome::OutsideWindow));
        assert_eq!(event.override_reason, None);
    }

    #[test]
    fn rescheduling_follows_the_actual_attempt_instant() {
        let (ledger, clock) = make_ledger();
        let order = ledger.register(tid_draft()).unwrap();

        // Administered very late, with override: the next dose is computed
        // from 20:31, skipping what remains of today.
        clock.set(today().and_hms_opt(14, 0, 0).unwrap());
        ledger.administer(&order.id, request_for(&order)).unwrap();

        clock.set(today().and_hms_opt(20, 31, 0).unwrap());
        let mut request = request_for(&order);
        request.override_reason = Some("pump occlusion resolved".into());
        let outcome = ledger.administer(&order.id, request).unwrap();
        let AdministrationOutcome::Accepted { next_due, .. } = outcome else {
            panic!("expected acceptance");
        };
        assert_eq!(next_due, Some(d(2026, 3, 11).and_hms_opt(8, 0, 0).unwrap()));
    }

    #[test]
    fn wrong_patient_scan_is_fatal_and_unrecorded() {
        // Worked example 5.
        let (ledger, clock) = make_ledger();
        let order = ledger.register(tid_draft()).unwrap();
        clock.set(today().and_hms_opt(14, 0, 0).unwrap());

        let mut request = request_for(&order);
        request.scanned_patient_code = Uuid::new_v4().to_string();
        let outcome = ledger.administer(&order.id, request).unwrap();
        assert!(matches!(
            outcome,
            AdministrationOutcome::Rejected(RejectionReason::Identity(
                MismatchReason::WrongPatient
            ))
        ));
        assert!(ledger.events_for_order(&order.id).unwrap().is_empty());

        let reloaded = ledger.store.load_order(&order.id).unwrap();
        assert_eq!(reloaded.last_administered, None);
        assert_eq!(reloaded.next_due, order.next_due);
    }

    #[test]
    fn discontinued_order_rejects_administration() {
        let (ledger, clock) = make_ledger();
        let order = ledger.register(tid_draft()).unwrap();
        ledger
            .discontinue(&order.id, Some("adverse reaction".into()))
            .unwrap();
        clock.set(today().and_hms_opt(14, 0, 0).unwrap());

        let outcome = ledger.administer(&order.id, request_for(&order)).unwrap();
        assert!(matches!(
            outcome,
            AdministrationOutcome::Rejected(RejectionReason::Identity(
                MismatchReason::OrderInactive
            ))
        ));

        let reloaded = ledger.store.load_order(&order.id).unwrap();
        assert_eq!(reloaded.status, OrderStatus::Discontinued);
        assert_eq!(reloaded.next_due, None);
        assert_eq!(reloaded.stop_reason.as_deref(), Some("adverse reaction"));
    }

    #[test]
    fn prn_administers_without_window_or_due_instant() {
        let (ledger, clock) = make_ledger();
        let mut draft = tid_draft();
        draft.frequency = FrequencyClass::Prn;
        draft.trigger_times.clear();
        let order = ledger.register(draft).unwrap();

        clock.set(today().and_hms_opt(3, 17, 0).unwrap());
        let outcome = ledger.administer(&order.id, request_for(&order)).unwrap();
        let AdministrationOutcome::Accepted { event, next_due } = outcome else {
            panic!("expected acceptance");
        };
        assert_eq!(event.window, None);
        assert_eq!(next_due, None);

        let reloaded = ledger.store.load_order(&order.id).unwrap();
        assert_eq!(
            reloaded.last_administered,
            Some(today().and_hms_opt(3, 17, 0).unwrap())
        );
        assert_eq!(reloaded.status, OrderStatus::Active);
    }

    #[test]
    fn once_order_completes_after_single_dose() {
        let (ledger, clock) = make_ledger();
        let mut draft = tid_draft();
        draft.frequency = FrequencyClass::Once;
        draft.trigger_times = vec![t(14, 0)];
        let order = ledger.register(draft).unwrap();

        clock.set(today().and_hms_opt(14, 0, 0).unwrap());
        let outcome = ledger.administer(&order.id, request_for(&order)).unwrap();
        assert!(outcome.is_accepted());

        let reloaded = ledger.store.load_order(&order.id).unwrap();
        assert_eq!(reloaded.status, OrderStatus::Completed);
        assert_eq!(reloaded.next_due, None);

        // The second scan finds a terminal order.
        let outcome = ledger.administer(&order.id, request_for(&order)).unwrap();
        assert!(matches!(
            outcome,
            AdministrationOutcome::Rejected(RejectionReason::Identity(
                MismatchReason::OrderInactive
            ))
        ));
        assert_eq!(ledger.events_for_order(&order.id).unwrap().len(), 1);
    }

    #[test]
    fn order_completes_when_schedule_passes_end_date() {
        let (ledger, clock) = make_ledger();
        let mut draft = tid_draft();
        draft.frequency = FrequencyClass::NTimesDaily(1);
        draft.trigger_times = vec![t(20, 0)];
        draft.end_date = Some(today());
        let order = ledger.register(draft).unwrap();
        assert_eq!(order.next_due, Some(today().and_hms_opt(20, 0, 0).unwrap()));

        clock.set(today().and_hms_opt(20, 0, 0).unwrap());
        let outcome = ledger.administer(&order.id, request_for(&order)).unwrap();
        let AdministrationOutcome::Accepted { next_due, .. } = outcome else {
            panic!("expected acceptance");
        };
        // Tomorrow's dose would fall past the end date.
        assert_eq!(next_due, None);
        let reloaded = ledger.store.load_order(&order.id).unwrap();
        assert_eq!(reloaded.status, OrderStatus::Completed);
    }

    #[test]
    fn due_within_lists_soonest_first_including_overdue() {
        let (ledger, clock) = make_ledger();
        let morning = ledger.register(tid_draft()).unwrap();

        let mut evening_draft = tid_draft();
        evening_draft.frequency = FrequencyClass::NTimesDaily(1);
        evening_draft.trigger_times = vec![t(9, 30)];
        let soon = ledger.register(evening_draft).unwrap();

        // 09:00 now; morning order due 14:00, soon order due 09:30.
        let due = ledger.due_within(45).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, soon.id);

        clock.set(today().and_hms_opt(15, 0, 0).unwrap());
        let due = ledger.due_within(30).unwrap();
        // Both are now at-or-before the horizon: 09:30 (overdue) and 14:00 (overdue).
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].id, soon.id);
        assert_eq!(due[1].id, morning.id);
    }

    #[test]
    fn events_for_patient_spans_orders() {
        let (ledger, clock) = make_ledger();
        let patient_id = Uuid::new_v4();

        let mut a = tid_draft();
        a.patient_id = patient_id;
        let mut b = tid_draft();
        b.patient_id = patient_id;
        b.trigger_times = vec![t(9, 30), t(15, 30), t(21, 30)];
        let order_a = ledger.register(a).unwrap();
        let order_b = ledger.register(b).unwrap();

        clock.set(today().and_hms_opt(9, 30, 0).unwrap());
        ledger.administer(&order_b.id, request_for(&order_b)).unwrap();
        clock.set(today().and_hms_opt(14, 0, 0).unwrap());
        ledger.administer(&order_a.id, request_for(&order_a)).unwrap();

        let events = ledger
            .events_for_patient(&patient_id, today().and_hms_opt(0, 0, 0).unwrap())
            .unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].order_id, order_a.id); // newest first
        assert_eq!(events[1].order_id, order_b.id);
    }

    #[test]
    fn concurrent_attempts_accept_exactly_once() {
        use std::sync::Barrier;
        use std::thread;

        let (ledger, clock) = make_ledger();
        let order = ledger.register(tid_draft()).unwrap();
        clock.set(today().and_hms_opt(14, 0, 0).unwrap());

        let ledger = Arc::new(ledger);
        let barrier = Arc::new(Barrier::new(8));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let ledger = ledger.clone();
            let barrier = barrier.clone();
            let order = order.clone();
            handles.push(thread::spawn(move || {
                barrier.wait();
                ledger.administer(&order.id, request_for(&order)).unwrap()
            }));
        }

        let outcomes: Vec<AdministrationOutcome> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        let accepted = outcomes.iter().filter(|o| o.is_accepted()).count();
        assert_eq!(accepted, 1, "exactly one attempt may succeed");

        // Losers are either turned away at the lock or re-evaluated
        // against the advanced due instant (20:00, far outside window).
        for outcome in &outcomes {
            if let AdministrationOutcome::Rejected(reason) = outcome {
                assert!(matches!(
                    reason,
                    RejectionReason::OrderBusy | RejectionReason::OverrideRequired
                ));
            }
        }

        assert_eq!(ledger.events_for_order(&order.id).unwrap().len(), 1);
    }

    #[test]
    fn abandoned_attempt_leaves_no_trace() {
        let (ledger, clock) = make_ledger();
        let order = ledger.register(tid_draft()).unwrap();
        clock.set(today().and_hms_opt(14, 0, 0).unwrap());
        // The caregiver scans, then walks away: administer is never
        // invoked, so nothing changed.
        let reloaded = ledger.store.load_order(&order.id).unwrap();
        assert_eq!(reloaded.next_due, order.next_due);
        assert!(ledger.events_for_order(&order.id).unwrap().is_empty());
    }
}
