use std::sync::Arc;
use tracing::debug;

use crate::{
    classifier::{CancellationModel, Classifier},
    error::EngineError,
    model::{Decision, InferenceRequest, Outcome, Reason, ValidatedRequest},
    rules::{OverrideCascade, RuleInput},
    storage::ArtifactSet,
};

/// Decides whether a booking request will be cancelled.
///
/// Precedence is fixed: categories unknown to the trained encoders are
/// cancelled outright, then the override cascade runs, and only requests no
/// override claims reach the classifier.
pub struct DecisionEngine<M: Classifier = CancellationModel> {
    artifacts: Arc<ArtifactSet<M>>,
    cascade: OverrideCascade,
}

impl<M: Classifier> DecisionEngine<M> {
    pub fn new(artifacts: Arc<ArtifactSet<M>>, cascade: OverrideCascade) -> Self {
        debug!(
            "Decision engine using artifact set {} with {} override rules",
            artifacts.version(),
            cascade.len()
        );
        Self { artifacts, cascade }
    }

    pub fn artifacts(&self) -> &Arc<ArtifactSet<M>> {
        &self.artifacts
    }

    pub fn decide(&self, request: &InferenceRequest) -> Result<Decision, EngineError> {
        let validated = request.validate()?;
        let decision = self.decide_validated(&validated)?;
        debug!(
            vehicle_type = validated.vehicle_type(),
            payment_method = validated.payment_method(),
            ride_distance = validated.ride_distance(),
            booking_hour = validated.booking_hour(),
            outcome = %decision.outcome(),
            reason = %decision.reason(),
            "Decided booking request"
        );
        Ok(decision)
    }

    /// One result per request, in input order.
    pub fn decide_batch(&self, requests: &[InferenceRequest]) -> Vec<Result<Decision, EngineError>> {
        requests.iter().map(|request| self.decide(request)).collect()
    }

    fn decide_validated(&self, request: &ValidatedRequest) -> Result<Decision, EngineError> {
        let artifacts = &self.artifacts;
        if !artifacts.vehicle_encoder().contains(request.vehicle_type())
            || !artifacts.payment_encoder().contains(request.payment_method())
        {
            return Ok(Decision::cancelled(Reason::UnknownCategory));
        }

        if let Some(reason) = self.cascade.evaluate(&RuleInput::from(request)) {
            return Ok(Decision::cancelled(reason));
        }

        let features = artifacts.features_for(request)?;
        let label = artifacts.model().predict(&features);
        Ok(Decision::new(Outcome::from_label(label), Reason::StatisticalPrediction))
    }
}
