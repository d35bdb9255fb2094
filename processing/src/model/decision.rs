use serde::{Deserialize, Serialize};
use strum_macros::Display as EnumDisplay;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumDisplay)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Cancelled,
    NotCancelled,
}

impl Outcome {
    /// Maps a classifier label (1 = cancelled) to an outcome.
    pub fn from_label(label: u8) -> Self {
        if label == 1 {
            Outcome::Cancelled
        } else {
            Outcome::NotCancelled
        }
    }
}

/// The fixed set of rationales a decision can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumDisplay)]
pub enum Reason {
    #[serde(rename = "unknown category business override")]
    #[strum(to_string = "unknown category business override")]
    UnknownCategory,
    #[serde(rename = "low driver availability at this hour")]
    #[strum(to_string = "low driver availability at this hour")]
    LateNight,
    #[serde(rename = "low driver acceptance for short cash rides")]
    #[strum(to_string = "low driver acceptance for short cash rides")]
    ShortCashRide,
    #[serde(rename = "statistical prediction")]
    #[strum(to_string = "statistical prediction")]
    StatisticalPrediction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    outcome: Outcome,
    reason: Reason,
}

impl Decision {
    pub fn new(outcome: Outcome, reason: Reason) -> Self {
        Self { outcome, reason }
    }

    pub fn cancelled(reason: Reason) -> Self {
        Self::new(Outcome::Cancelled, reason)
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn reason(&self) -> Reason {
        self.reason
    }
}
