//! Administration window classification.
//!
//! Pure comparison of an attempt instant against the scheduled due
//! instant. `OutsideWindow` is a flag, not a block — whether it stops the
//! administration is the deployment policy's call (see
//! [`crate::config::DeploymentPolicy`]).

use chrono::{Duration, NaiveDateTime};

use crate::models::WindowOutcome;

/// Classify an attempt against the scheduled instant.
///
/// The tolerance bound is strict: an attempt exactly `tolerance_minutes`
/// from the scheduled instant is still inside the window (`Early`/`Late`);
/// one second beyond is `OutsideWindow`. Comparison keeps full sub-minute
/// precision.
pub fn classify(
    scheduled: NaiveDateTime,
    attempt: NaiveDateTime,
    tolerance_minutes: i64,
) -> WindowOutcome {
    let delta = attempt - scheduled;
    let tolerance = Duration::minutes(tolerance_minutes);

    if delta.abs() > tolerance {
        WindowOutcome::OutsideWindow
    } else if delta < Duration::zero() {
        WindowOutcome::Early
    } else if delta > Duration::zero() {
        WindowOutcome::Late
    } else {
        WindowOutcome::OnTime
    }
}
