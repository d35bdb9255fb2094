use serde::{Deserialize, Serialize};

use crate::{error::ValidationError, normalize::normalize_category};

/// One cleaned historical booking, as consumed by training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRecord {
    pub vehicle_type: String,
    pub payment_method: String,
    pub ride_distance: f64,
    pub booking_hour: u8,
    pub cancelled: u8,
}

/// A raw booking request as received at the inference boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceRequest {
    pub vehicle_type: String,
    pub payment_method: String,
    pub ride_distance: f64,
    pub booking_hour: i64,
}

impl InferenceRequest {
    pub fn new(
        vehicle_type: impl Into<String>,
        payment_method: impl Into<String>,
        ride_distance: f64,
        booking_hour: i64,
    ) -> Self {
        Self {
            vehicle_type: vehicle_type.into(),
            payment_method: payment_method.into(),
            ride_distance,
            booking_hour,
        }
    }

    /// Builds a request from textual numeric fields, e.g. CLI input.
    pub fn parse(
        vehicle_type: &str,
        payment_method: &str,
        ride_distance: &str,
        booking_hour: &str,
    ) -> Result<Self, ValidationError> {
        let distance = ride_distance
            .trim()
            .parse::<f64>()
            .map_err(|_| ValidationError::UnparsableDistance(ride_distance.to_string()))?;
        let hour = booking_hour
            .trim()
            .parse::<i64>()
            .map_err(|_| ValidationError::UnparsableHour(booking_hour.to_string()))?;

        Ok(Self::new(vehicle_type, payment_method, distance, hour))
    }

    pub fn validate(&self) -> Result<ValidatedRequest, ValidationError> {
        if !self.ride_distance.is_finite() || self.ride_distance < 0.0 {
            return Err(ValidationError::InvalidDistance(self.ride_distance));
        }
        let booking_hour = u8::try_from(self.booking_hour)
            .ok()
            .filter(|h| *h <= 23)
            .ok_or(ValidationError::HourOutOfRange(self.booking_hour))?;

        Ok(ValidatedRequest {
            vehicle_type: normalize_category(&self.vehicle_type),
            payment_method: normalize_category(&self.payment_method),
            ride_distance: self.ride_distance,
            booking_hour,
        })
    }
}

/// A request whose numeric fields are in range and whose categories are
/// normalized. Only produced by [`InferenceRequest::validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    vehicle_type: String,
    payment_method: String,
    ride_distance: f64,
    booking_hour: u8,
}

impl ValidatedRequest {
    pub fn vehicle_type(&self) -> &str {
        &self.vehicle_type
    }

    pub fn payment_method(&self) -> &str {
        &self.payment_method
    }

    pub fn ride_distance(&self) -> f64 {
        self.ride_distance
    }

    pub fn booking_hour(&self) -> u8 {
        self.booking_hour
    }
}
