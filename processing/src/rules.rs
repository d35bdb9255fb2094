use crate::model::{Reason, ValidatedRequest};

/// What an override rule gets to look at. Categories are already normalized
/// and known to the encoders.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleInput<'a> {
    pub vehicle_type: &'a str,
    pub payment_method: &'a str,
    pub ride_distance: f64,
    pub booking_hour: u8,
}

impl<'a> From<&'a ValidatedRequest> for RuleInput<'a> {
    fn from(request: &'a ValidatedRequest) -> Self {
        Self {
            vehicle_type: request.vehicle_type(),
            payment_method: request.payment_method(),
            ride_distance: request.ride_distance(),
            booking_hour: request.booking_hour(),
        }
    }
}

type OverrideRule = Box<dyn Fn(&RuleInput) -> Option<Reason> + Send + Sync>;

/// Ordered business overrides. Rules are tried in insertion order and the
/// first one returning a reason decides the booking.
#[derive(Default)]
pub struct OverrideCascade {
    rules: Vec<OverrideRule>,
}

impl OverrideCascade {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_rule<F>(&mut self, rule: F) -> &mut Self
    where
        F: Fn(&RuleInput) -> Option<Reason> + Send + Sync + 'static,
    {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn evaluate(&self, input: &RuleInput) -> Option<Reason> {
        self.rules.iter().find_map(|rule| rule(input))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl std::fmt::Debug for OverrideCascade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverrideCascade")
            .field("rules", &self.rules.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(payment_method: &str, ride_distance: f64, booking_hour: u8) -> RuleInput<'_> {
        RuleInput {
            vehicle_type: "sedan",
            payment_method,
            ride_distance,
            booking_hour,
        }
    }

    #[test]
    fn test_empty_cascade_never_fires() {
        let cascade = OverrideCascade::new();
        assert!(cascade.is_empty());
        assert_eq!(cascade.evaluate(&input("cash", 0.5, 3)), None);
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let mut cascade = OverrideCascade::new();
        cascade
            .add_rule(|i| (i.booking_hour < 6).then_some(Reason::LateNight))
            .add_rule(|i| (i.payment_method == "cash").then_some(Reason::ShortCashRide));

        assert_eq!(cascade.len(), 2);
        assert_eq!(cascade.evaluate(&input("cash", 1.0, 3)), Some(Reason::LateNight));
        assert_eq!(cascade.evaluate(&input("cash", 1.0, 12)), Some(Reason::ShortCashRide));
        assert_eq!(cascade.evaluate(&input("online", 1.0, 12)), None);
    }
}
