#![allow(dead_code)]

use std::{error::Error, path::Path, sync::Arc};

use processing::{
    classifier::{CancellationModel, Classifier, ForestParams},
    dataset::CLEANED_COLUMNS,
    encoder::CategoryEncoder,
    model::{BookingRecord, FeatureVector},
    storage::{ArtifactManifest, ArtifactSet},
};

pub type TestResult = Result<(), Box<dyn Error + Send + Sync>>;

pub const VEHICLES: [&str; 4] = ["auto", "mini", "sedan", "suv"];
pub const PAYMENTS: [&str; 2] = ["cash", "online"];

pub fn encoders() -> (CategoryEncoder, CategoryEncoder) {
    let vehicles = CategoryEncoder::fit("vehicle_type", VEHICLES).expect("vehicle encoder");
    let payments = CategoryEncoder::fit("payment_method", PAYMENTS).expect("payment encoder");
    (vehicles, payments)
}

pub fn artifact_set<M: Classifier>(model: M) -> ArtifactSet<M> {
    let (vehicles, payments) = encoders();
    let manifest = ArtifactManifest::new(0.9, 100, &vehicles, &payments);
    ArtifactSet::new(manifest, vehicles, payments, model)
}

pub fn shared_set<M: Classifier>(model: M) -> Arc<ArtifactSet<M>> {
    Arc::new(artifact_set(model))
}

/// Bookings where long rides are cancelled and short ones are not.
pub fn booking_records() -> Vec<BookingRecord> {
    (0..80u32)
        .map(|i| {
            let ride_distance = f64::from(i % 20) + 0.5;
            BookingRecord {
                vehicle_type: VEHICLES[(i % 4) as usize].to_string(),
                payment_method: PAYMENTS[(i % 2) as usize].to_string(),
                ride_distance,
                booking_hour: (6 + i % 17) as u8,
                cancelled: u8::from(ride_distance > 10.0),
            }
        })
        .collect()
}

pub fn trained_set() -> ArtifactSet {
    let (vehicles, payments) = encoders();
    let records = booking_records();
    let features: Vec<FeatureVector> = records
        .iter()
        .map(|r| {
            FeatureVector::encode(
                &r.vehicle_type,
                &r.payment_method,
                r.ride_distance,
                r.booking_hour,
                &vehicles,
                &payments,
            )
            .expect("fixture categories are known")
        })
        .collect();
    let labels: Vec<u8> = records.iter().map(|r| r.cancelled).collect();
    let params = ForestParams {
        n_estimators: 10,
        ..ForestParams::default()
    };
    let model = CancellationModel::fit(&features, &labels, params).expect("fixture model");
    let manifest = ArtifactManifest::new(1.0, records.len(), &vehicles, &payments);
    ArtifactSet::new(manifest, vehicles, payments, model)
}

pub fn write_cleaned_csv(path: &Path, records: &[BookingRecord]) -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(CLEANED_COLUMNS)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}
