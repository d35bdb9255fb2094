use common::config::TrainingConfig;
use serde::Serialize;
use std::path::Path;
#[cfg(not(test))]
use tracing::{debug, info, warn};
#[cfg(test)]
use {println as debug, println as info, println as warn};

use crate::{
    classifier::{CancellationModel, ForestParams},
    dataset::{load_cleaned_dataset, train_test_split},
    encoder::CategoryEncoder,
    error::{DatasetError, TrainingError},
    model::{BookingRecord, FeatureVector, Label},
    storage::{
        ArtifactManifest, ArtifactSet, ArtifactStore, BlobWriter, FsBlobWriter,
        artifacts::{PAYMENT_ENCODER_NAME, VEHICLE_ENCODER_NAME},
    },
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingReport {
    pub version: String,
    pub rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub accuracy: f64,
    pub vehicle_categories: Vec<String>,
    pub payment_categories: Vec<String>,
}

/// Fits encoders and model on a cleaned dataset and publishes them as one
/// artifact set. Nothing is written unless every step before publishing
/// succeeds.
pub struct TrainingPipeline<W: BlobWriter = FsBlobWriter> {
    config: TrainingConfig,
    store: ArtifactStore<W>,
}

impl<W: BlobWriter> TrainingPipeline<W> {
    pub fn new(config: TrainingConfig, store: ArtifactStore<W>) -> Self {
        Self { config, store }
    }

    pub fn store(&self) -> &ArtifactStore<W> {
        &self.store
    }

    pub fn forest_params(&self) -> ForestParams {
        ForestParams {
            n_estimators: self.config.n_estimators,
            max_depth: self.config.max_depth,
            min_samples_split: self.config.min_samples_split,
            seed: self.config.seed,
        }
    }

    pub fn run(&self) -> Result<TrainingReport, TrainingError> {
        info!("Loading cleaned dataset from {}", self.config.dataset_path);
        let records = load_cleaned_dataset(Path::new(&self.config.dataset_path))?;
        self.train(&records)
    }

    pub fn train(&self, records: &[BookingRecord]) -> Result<TrainingReport, TrainingError> {
        if records.is_empty() {
            return Err(DatasetError::Empty.into());
        }

        let vehicle_encoder =
            CategoryEncoder::fit(VEHICLE_ENCODER_NAME, records.iter().map(|r| r.vehicle_type.as_str()))?;
        let payment_encoder =
            CategoryEncoder::fit(PAYMENT_ENCODER_NAME, records.iter().map(|r| r.payment_method.as_str()))?;
        debug!(
            "Fitted encoders: {} vehicle types, {} payment methods",
            vehicle_encoder.len(),
            payment_encoder.len()
        );

        let features = records
            .iter()
            .map(|r| {
                FeatureVector::encode(
                    &r.vehicle_type,
                    &r.payment_method,
                    r.ride_distance,
                    r.booking_hour,
                    &vehicle_encoder,
                    &payment_encoder,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        let labels: Vec<Label> = records.iter().map(|r| r.cancelled).collect();

        let (train_idx, test_idx) = train_test_split(records.len(), self.config.test_fraction, self.config.seed);
        if train_idx.is_empty() || test_idx.is_empty() {
            return Err(TrainingError::SplitTooSmall {
                rows: records.len(),
                test_fraction: self.config.test_fraction,
            });
        }
        let (train_x, train_y) = select(&features, &labels, &train_idx);
        let (test_x, test_y) = select(&features, &labels, &test_idx);

        info!(
            "Training on {} rows, holding out {} rows",
            train_idx.len(),
            test_idx.len()
        );
        let model = CancellationModel::fit(&train_x, &train_y, self.forest_params())?;
        let accuracy = model.evaluate(&test_x, &test_y)?;
        info!("Holdout accuracy: {:.4}", accuracy);

        if let Some(min_accuracy) = self.config.min_accuracy {
            if accuracy < min_accuracy {
                warn!(
                    "Holdout accuracy {:.4} below minimum {:.4}, not publishing",
                    accuracy, min_accuracy
                );
                return Err(TrainingError::AccuracyBelowThreshold { accuracy, min_accuracy });
            }
        }

        let vehicle_categories = vehicle_encoder.categories().to_vec();
        let payment_categories = payment_encoder.categories().to_vec();
        let manifest = ArtifactManifest::new(accuracy, train_idx.len(), &vehicle_encoder, &payment_encoder);
        let artifacts = ArtifactSet::new(manifest, vehicle_encoder, payment_encoder, model);
        let version = self.store.publish(&artifacts)?;

        Ok(TrainingReport {
            version,
            rows: records.len(),
            train_rows: train_idx.len(),
            test_rows: test_idx.len(),
            accuracy,
            vehicle_categories,
            payment_categories,
        })
    }
}

fn select(features: &[FeatureVector], labels: &[Label], indices: &[usize]) -> (Vec<FeatureVector>, Vec<Label>) {
    indices.iter().map(|&i| (features[i], labels[i])).unzip()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Classifier;
    use tempfile::TempDir;

    fn record(vehicle: &str, payment: &str, distance: f64, hour: u8, cancelled: u8) -> BookingRecord {
        BookingRecord {
            vehicle_type: vehicle.to_string(),
            payment_method: payment.to_string(),
            ride_distance: distance,
            booking_hour: hour,
            cancelled,
        }
    }

    fn separable_records() -> Vec<BookingRecord> {
        (0..60u8)
            .map(|i| {
                let vehicle = ["sedan", "suv", "mini"][usize::from(i % 3)];
                let payment = if i % 2 == 0 { "cash" } else { "online" };
                let distance = f64::from(i) * 0.25;
                record(vehicle, payment, distance, 8 + i % 12, u8::from(distance < 7.5))
            })
            .collect()
    }

    fn pipeline(dir: &TempDir, config: TrainingConfig) -> TrainingPipeline {
        TrainingPipeline::new(config, ArtifactStore::new(dir.path()))
    }

    fn small_config() -> TrainingConfig {
        TrainingConfig {
            n_estimators: 10,
            ..TrainingConfig::default()
        }
    }

    #[test]
    fn test_train_publishes_loadable_set() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(&dir, small_config());
        let report = pipeline.train(&separable_records()).unwrap();
        println!("report: {:?}", report);

        assert_eq!(report.rows, 60);
        assert_eq!(report.test_rows, 12);
        assert_eq!(report.train_rows, 48);
        assert!((0.0..=1.0).contains(&report.accuracy));
        assert_eq!(report.vehicle_categories, vec!["mini", "sedan", "suv"]);
        assert_eq!(report.payment_categories, vec!["cash", "online"]);

        let loaded = pipeline.store().load().unwrap();
        assert_eq!(loaded.version(), report.version);
        assert_eq!(loaded.manifest().training_rows, 48);
        assert_eq!(loaded.vehicle_encoder().categories(), report.vehicle_categories.as_slice());

        let features = FeatureVector::encode("sedan", "cash", 0.5, 9, loaded.vehicle_encoder(), loaded.payment_encoder())
            .unwrap();
        assert!((0.0..=1.0).contains(&loaded.model().predict_proba(&features)));
    }

    #[test]
    fn test_accuracy_gate_blocks_publishing() {
        let dir = TempDir::new().unwrap();
        // Identical features with evenly mixed labels: no model can be right
        // on every held-out row.
        let records: Vec<BookingRecord> = (0..200u32)
            .map(|i| record("sedan", "online", 5.0, 12, u8::from(i % 2 == 0)))
            .collect();
        let config = TrainingConfig {
            n_estimators: 5,
            min_accuracy: Some(1.0),
            ..TrainingConfig::default()
        };

        let result = pipeline(&dir, config).train(&records);
        assert!(matches!(result, Err(TrainingError::AccuracyBelowThreshold { .. })));
        assert_eq!(ArtifactStore::new(dir.path()).current_version().unwrap(), None);
    }

    #[test]
    fn test_empty_dataset_keeps_previous_set() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(&dir, small_config());
        let first = pipeline.train(&separable_records()).unwrap();

        let result = pipeline.train(&[]);
        assert!(matches!(result, Err(TrainingError::Dataset(DatasetError::Empty))));
        assert_eq!(pipeline.store().current_version().unwrap(), Some(first.version));
    }

    #[test]
    fn test_single_row_cannot_be_split() {
        let dir = TempDir::new().unwrap();
        let result = pipeline(&dir, small_config()).train(&[record("sedan", "cash", 1.0, 3, 1)]);
        assert!(matches!(result, Err(TrainingError::SplitTooSmall { rows: 1, .. })));
    }

    #[test]
    fn test_missing_dataset_file_is_fatal() {
        let dir = TempDir::new().unwrap();
        let config = TrainingConfig {
            dataset_path: dir.path().join("absent.csv").display().to_string(),
            ..small_config()
        };
        let result = pipeline(&dir, config).run();
        assert!(matches!(result, Err(TrainingError::Dataset(DatasetError::Io { .. }))));
    }
}
