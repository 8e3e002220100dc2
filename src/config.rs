//! Deployment-wide administration policy.
//!
//! Tolerance and override rules are set once per deployment, never per
//! call, so every medication on the unit is held to the same window.

use serde::{Deserialize, Serialize};

/// Default administration window tolerance in minutes.
pub const DEFAULT_TOLERANCE_MINUTES: i64 = 30;

/// Policy knobs a deployment configures for the whole care unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentPolicy {
    /// Half-width of the administration window around the due instant.
    #[serde(default = "default_tolerance")]
    pub tolerance_minutes: i64,
    /// When true, an attempt classified outside the window is rejected
    /// unless the caregiver supplies an explicit override reason.
    #[serde(default = "default_override_required")]
    pub outside_window_requires_override: bool,
}

fn default_tolerance() -> i64 {
    DEFAULT_TOLERANCE_MINUTES
}

fn default_override_required() -> bool {
    true
}

impl Default for DeploymentPolicy {
    fn default() -> Self {
        Self {
            tolerance_minutes: DEFAULT_TOLERANCE_MINUTES,
            outside_window_requires_override: true,
        }
    }
}

impl DeploymentPolicy {
    /// Parse a policy from the host application's JSON config fragment.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
