use crate::{error::ModelError, model::Label};

/// Classification accuracy: proportion of exact label matches.
pub fn accuracy(predicted: &[Label], expected: &[Label]) -> Result<f64, ModelError> {
    if predicted.len() != expected.len() {
        return Err(ModelError::LengthMismatch {
            features: predicted.len(),
            labels: expected.len(),
        });
    }
    if expected.is_empty() {
        return Err(ModelError::EmptyEvaluationSet);
    }

    let correct = predicted
        .iter()
        .zip(expected)
        .filter(|(p, e)| p == e)
        .count();

    Ok(correct as f64 / expected.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy() {
        assert_eq!(accuracy(&[1, 0, 1, 1], &[1, 0, 0, 1]).unwrap(), 0.75);
        assert_eq!(accuracy(&[0], &[0]).unwrap(), 1.0);
    }

    #[test]
    fn test_accuracy_rejects_empty_and_mismatched() {
        assert_eq!(accuracy(&[], &[]), Err(ModelError::EmptyEvaluationSet));
        assert!(matches!(accuracy(&[1], &[1, 0]), Err(ModelError::LengthMismatch { .. })));
    }
}
