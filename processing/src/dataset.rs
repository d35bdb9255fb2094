use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use serde::Deserialize;
use std::{collections::BTreeSet, fs::File, io::Read, path::Path};
use tracing::{debug, info};

use crate::{error::DatasetError, model::BookingRecord, normalize::normalize_category};

pub const CLEANED_COLUMNS: [&str; 5] = [
    "vehicle_type",
    "payment_method",
    "ride_distance",
    "booking_hour",
    "cancelled",
];

#[derive(Debug, Deserialize)]
struct CleanedRow {
    vehicle_type: String,
    payment_method: String,
    ride_distance: String,
    booking_hour: String,
    cancelled: String,
}

pub fn load_cleaned_dataset(path: &Path) -> Result<Vec<BookingRecord>, DatasetError> {
    let file = File::open(path).map_err(|source| DatasetError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let records = read_cleaned_dataset(file)?;
    info!("Loaded {} booking records from {:?}", records.len(), path);
    Ok(records)
}

/// Reads a cleaned dataset. The header must hold exactly the cleaned
/// columns (in any order) and every row must validate.
pub fn read_cleaned_dataset<R: Read>(reader: R) -> Result<Vec<BookingRecord>, DatasetError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = reader.headers()?.clone();
    check_columns(&headers)?;

    let mut records = Vec::new();
    for result in reader.records() {
        let row = result?;
        let line = row.position().map(|p| p.line()).unwrap_or_default();
        let raw: CleanedRow = row.deserialize(Some(&headers))?;
        let record = validate_row(raw).map_err(|reason| DatasetError::InvalidRow { line, reason })?;
        records.push(record);
    }

    if records.is_empty() {
        return Err(DatasetError::Empty);
    }
    debug!("Validated {} cleaned rows", records.len());
    Ok(records)
}

fn check_columns(headers: &csv::StringRecord) -> Result<(), DatasetError> {
    let present: BTreeSet<&str> = headers.iter().collect();
    let required: BTreeSet<&str> = CLEANED_COLUMNS.into_iter().collect();

    let missing: Vec<String> = required.difference(&present).map(|c| c.to_string()).collect();
    if !missing.is_empty() {
        return Err(DatasetError::MissingColumns(missing));
    }
    let unexpected: Vec<String> = present.difference(&required).map(|c| c.to_string()).collect();
    if !unexpected.is_empty() || headers.len() != CLEANED_COLUMNS.len() {
        return Err(DatasetError::UnexpectedColumns(unexpected));
    }
    Ok(())
}

fn parse_integral(field: &str, value: &str) -> Result<i64, String> {
    let parsed: f64 = value
        .parse()
        .map_err(|_| format!("{} '{}' is not a number", field, value))?;
    if !parsed.is_finite() || parsed.fract() != 0.0 {
        return Err(format!("{} '{}' is not an integer", field, value));
    }
    Ok(parsed as i64)
}

fn validate_row(raw: CleanedRow) -> Result<BookingRecord, String> {
    let vehicle_type = normalize_category(&raw.vehicle_type);
    let payment_method = normalize_category(&raw.payment_method);
    if vehicle_type.is_empty() {
        return Err("vehicle_type is empty".to_string());
    }
    if payment_method.is_empty() {
        return Err("payment_method is empty".to_string());
    }

    let ride_distance: f64 = raw
        .ride_distance
        .parse()
        .map_err(|_| format!("ride_distance '{}' is not a number", raw.ride_distance))?;
    if !ride_distance.is_finite() || ride_distance < 0.0 {
        return Err(format!("ride_distance {} must be finite and non-negative", ride_distance));
    }

    let booking_hour = parse_integral("booking_hour", &raw.booking_hour)?;
    if !(0..=23).contains(&booking_hour) {
        return Err(format!("booking_hour {} is outside 0..=23", booking_hour));
    }

    let cancelled = parse_integral("cancelled", &raw.cancelled)?;
    if cancelled != 0 && cancelled != 1 {
        return Err(format!("cancelled {} is not 0 or 1", cancelled));
    }

    Ok(BookingRecord {
        vehicle_type,
        payment_method,
        ride_distance,
        booking_hour: booking_hour as u8,
        cancelled: cancelled as u8,
    })
}

/// Seeded shuffle of `0..rows` split into (train, test) index lists, with
/// `ceil(rows * test_fraction)` rows held out.
pub fn train_test_split(rows: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..rows).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let test_rows = ((rows as f64) * test_fraction).ceil() as usize;
    let test_rows = test_rows.min(rows);
    let train = indices.split_off(test_rows);
    (train, indices)
}
