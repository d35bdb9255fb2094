use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Classifier, metrics::accuracy, tree::{DecisionTree, TreeParams}};
use crate::{
    error::ModelError,
    model::{FeatureKind, FeatureVector, Label},
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

impl ForestParams {
    fn validate(&self) -> Result<(), ModelError> {
        if self.n_estimators == 0 {
            return Err(ModelError::InvalidParams("n_estimators must be positive".to_string()));
        }
        if self.min_samples_split < 2 {
            return Err(ModelError::InvalidParams(format!(
                "min_samples_split must be at least 2, got {}",
                self.min_samples_split
            )));
        }
        if self.max_depth == Some(0) {
            return Err(ModelError::InvalidParams("max_depth must be positive".to_string()));
        }
        Ok(())
    }

    fn tree_params(&self) -> TreeParams {
        TreeParams {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            max_features: (FeatureKind::ALL.len() as f64).sqrt().ceil() as usize,
        }
    }
}

/// Random forest predicting whether a booking gets cancelled.
///
/// Each tree is grown on a bootstrap draw of the training rows; the
/// cancellation probability is the mean of the trees' leaf cancellation
/// rates. Training is fully determined by `ForestParams::seed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancellationModel {
    params: ForestParams,
    trees: Vec<DecisionTree>,
}

impl CancellationModel {
    pub fn fit(features: &[FeatureVector], labels: &[Label], params: ForestParams) -> Result<Self, ModelError> {
        params.validate()?;
        if features.len() != labels.len() {
            return Err(ModelError::LengthMismatch {
                features: features.len(),
                labels: labels.len(),
            });
        }
        if features.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }
        if let Some(&label) = labels.iter().find(|&&l| l > 1) {
            return Err(ModelError::InvalidLabel(label));
        }

        let tree_params = params.tree_params();
        let mut master = StdRng::seed_from_u64(params.seed);
        let rows = features.len();

        let trees = (0..params.n_estimators)
            .map(|_| {
                let mut rng = StdRng::seed_from_u64(master.random::<u64>());
                let sample: Vec<usize> = (0..rows).map(|_| rng.random_range(0..rows)).collect();
                DecisionTree::fit(features, labels, &sample, &tree_params, &mut rng)
            })
            .collect::<Vec<_>>();

        debug!(
            trees = trees.len(),
            rows,
            max_depth = trees.iter().map(DecisionTree::depth).max().unwrap_or(0),
            "Fitted cancellation forest"
        );

        Ok(Self { params, trees })
    }

    pub fn predict_batch(&self, features: &[FeatureVector]) -> Vec<Label> {
        features.iter().map(|f| self.predict(f)).collect()
    }

    /// Fraction of rows whose predicted label matches. Reporting only.
    pub fn evaluate(&self, features: &[FeatureVector], labels: &[Label]) -> Result<f64, ModelError> {
        accuracy(&self.predict_batch(features), labels)
    }

    /// Structural check for a model read back from storage.
    pub fn is_well_formed(&self) -> bool {
        !self.trees.is_empty() && self.trees.iter().all(DecisionTree::is_well_formed)
    }
}

impl Classifier for CancellationModel {
    fn predict_proba(&self, features: &FeatureVector) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.predict_proba(features)).sum();
        sum / self.trees.len() as f64
    }
}
