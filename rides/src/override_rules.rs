use processing::{
    model::Reason,
    rules::OverrideCascade,
};

/// Bookings from this hour onwards are treated as night bookings.
pub const NIGHT_START_HOUR: u8 = 23;
/// Last hour of the night window.
pub const NIGHT_END_HOUR: u8 = 5;
/// Cash rides strictly shorter than this are rarely accepted by drivers.
pub const SHORT_RIDE_DISTANCE: f64 = 2.0;
pub const CASH_PAYMENT: &str = "cash";

pub fn is_late_night(booking_hour: u8) -> bool {
    booking_hour >= NIGHT_START_HOUR || booking_hour <= NIGHT_END_HOUR
}

pub fn is_short_cash_ride(payment_method: &str, ride_distance: f64) -> bool {
    ride_distance < SHORT_RIDE_DISTANCE && payment_method == CASH_PAYMENT
}

/// Business overrides applied before the model, in priority order.
pub fn get_override_cascade() -> OverrideCascade {
    let mut cascade = OverrideCascade::new();

    // Few drivers are on the road overnight
    cascade.add_rule(|input| {
        is_late_night(input.booking_hour).then_some(Reason::LateNight)
    });

    cascade.add_rule(|input| {
        is_short_cash_ride(input.payment_method, input.ride_distance).then_some(Reason::ShortCashRide)
    });

    cascade
}
