use crate::db::StoreError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = StoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(StoreError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(OrderStatus {
    Active => "active",
    Completed => "completed",
    Discontinued => "discontinued",
});

str_enum!(WindowOutcome {
    OnTime => "on_time",
    Early => "early",
    Late => "late",
    OutsideWindow => "outside_window",
});

str_enum!(MismatchReason {
    WrongPatient => "wrong_patient",
    WrongMedication => "wrong_medication",
    OrderInactive => "order_inactive",
});

/// Result of the five-rights identifier check. Carried on every recorded
/// administration event; a mismatch is fatal for the attempt, so in
/// practice only `Verified` reaches storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationOutcome {
    Verified,
    Mismatch(MismatchReason),
}

impl VerificationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verified => "verified",
            Self::Mismatch(reason) => reason.as_str(),
        }
    }

    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified)
    }
}

impl std::str::FromStr for VerificationOutcome {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "verified" {
            return Ok(Self::Verified);
        }
        s.parse::<MismatchReason>()
            .map(Self::Mismatch)
            .map_err(|_| StoreError::InvalidEnum {
                field: "VerificationOutcome".into(),
                value: s.into(),
            })
    }
}
