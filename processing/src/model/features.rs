use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::{encoder::CategoryEncoder, error::EncoderError};

/// Named model inputs. Trees refer to features through this enum rather than
/// by column position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FeatureKind {
    VehicleCode,
    PaymentCode,
    RideDistance,
    BookingHour,
}

impl FeatureKind {
    pub const ALL: [FeatureKind; 4] = [
        FeatureKind::VehicleCode,
        FeatureKind::PaymentCode,
        FeatureKind::RideDistance,
        FeatureKind::BookingHour,
    ];
}

/// Model input for one booking.
///
/// The only constructor is [`FeatureVector::encode`], which takes the raw
/// categorical values together with the encoder pair of the artifact set, so
/// the codes always come from the same encoders the model was trained with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    vehicle_code: u32,
    payment_code: u32,
    ride_distance: f64,
    booking_hour: u8,
}

impl FeatureVector {
    pub fn encode(
        vehicle_type: &str,
        payment_method: &str,
        ride_distance: f64,
        booking_hour: u8,
        vehicle_encoder: &CategoryEncoder,
        payment_encoder: &CategoryEncoder,
    ) -> Result<Self, EncoderError> {
        Ok(Self {
            vehicle_code: vehicle_encoder.encode(vehicle_type)?,
            payment_code: payment_encoder.encode(payment_method)?,
            ride_distance,
            booking_hour,
        })
    }

    pub fn value(&self, kind: FeatureKind) -> f64 {
        match kind {
            FeatureKind::VehicleCode => f64::from(self.vehicle_code),
            FeatureKind::PaymentCode => f64::from(self.payment_code),
            FeatureKind::RideDistance => self.ride_distance,
            FeatureKind::BookingHour => f64::from(self.booking_hour),
        }
    }

    pub fn vehicle_code(&self) -> u32 {
        self.vehicle_code
    }

    pub fn payment_code(&self) -> u32 {
        self.payment_code
    }

    pub fn ride_distance(&self) -> f64 {
        self.ride_distance
    }

    pub fn booking_hour(&self) -> u8 {
        self.booking_hour
    }
}
