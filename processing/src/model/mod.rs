pub mod booking;
pub mod decision;
pub mod features;

pub use booking::{BookingRecord, InferenceRequest, ValidatedRequest};
pub use decision::{Decision, Outcome, Reason};
pub use features::{FeatureKind, FeatureVector};

/// Binary classifier label: 1 means the booking was cancelled.
pub type Label = u8;
