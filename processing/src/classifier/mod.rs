pub mod forest;
pub mod metrics;
pub mod tree;

pub use forest::{CancellationModel, ForestParams};
pub use metrics::accuracy;
pub use tree::{DecisionTree, TreeParams};

use crate::model::{FeatureVector, Label};

/// Decision threshold applied to the cancellation probability.
pub const CANCEL_THRESHOLD: f64 = 0.5;

/// Trained binary classifier consumed by the decision engine.
///
/// Inputs must come from the encoder pair the classifier was trained with;
/// implementations do not (and cannot) check this.
pub trait Classifier: Send + Sync {
    fn predict_proba(&self, features: &FeatureVector) -> f64;

    fn predict(&self, features: &FeatureVector) -> Label {
        if self.predict_proba(features) > CANCEL_THRESHOLD {
            1
        } else {
            0
        }
    }
}
