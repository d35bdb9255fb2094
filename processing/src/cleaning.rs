use chrono::{NaiveDateTime, Timelike};
use serde::Serialize;
use std::{
    collections::HashSet,
    fs::{self, File},
    io::{Read, Write},
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

use crate::{error::CleaningError, model::BookingRecord, normalize::normalize_category};

const DATE: &str = "Date";
const TIME: &str = "Time";
const VEHICLE_TYPE: &str = "Vehicle_Type";
const PAYMENT_METHOD: &str = "Payment_Method";
const RIDE_DISTANCE: &str = "Ride_Distance";
const BOOKING_STATUS: &str = "Booking_Status";

pub const RAW_COLUMNS: [&str; 6] = [
    DATE,
    TIME,
    VEHICLE_TYPE,
    PAYMENT_METHOD,
    RIDE_DISTANCE,
    BOOKING_STATUS,
];

// Month-first before day-first for slash dates, matching common tabular tooling.
const DATETIME_FORMATS: [&str; 10] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %I:%M:%S %p",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleaningReport {
    pub rows_read: usize,
    pub duplicates_dropped: usize,
    pub missing_dropped: usize,
    pub unparseable_dropped: usize,
    pub rows_written: usize,
}

struct ColumnIndex {
    date: usize,
    time: usize,
    vehicle_type: usize,
    payment_method: usize,
    ride_distance: usize,
    booking_status: usize,
}

impl ColumnIndex {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, CleaningError> {
        let find = |name: &str| headers.iter().position(|h| h == name);
        let missing: Vec<String> = RAW_COLUMNS
            .into_iter()
            .filter(|&c| find(c).is_none())
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(CleaningError::MissingColumns(missing));
        }

        let index = |name: &str| find(name).unwrap_or_default();
        Ok(Self {
            date: index(DATE),
            time: index(TIME),
            vehicle_type: index(VEHICLE_TYPE),
            payment_method: index(PAYMENT_METHOD),
            ride_distance: index(RIDE_DISTANCE),
            booking_status: index(BOOKING_STATUS),
        })
    }

    fn required(&self) -> [usize; 6] {
        [
            self.date,
            self.time,
            self.vehicle_type,
            self.payment_method,
            self.ride_distance,
            self.booking_status,
        ]
    }
}

pub fn parse_booking_hour(date: &str, time: &str) -> Option<u8> {
    let combined = format!("{} {}", date.trim(), time.trim());
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(&combined, format).ok())
        .map(|datetime| datetime.hour() as u8)
}

pub fn is_cancelled_status(status: &str) -> bool {
    status.trim().to_lowercase() == "cancelled"
}

/// Turns the raw bookings export into the cleaned training dataset.
///
/// Rows go to a sibling `.tmp` file that replaces `cleaned_path` only once
/// cleaning succeeded, so a failed run keeps the previous dataset.
pub fn clean_rides(raw_path: &Path, cleaned_path: &Path) -> Result<CleaningReport, CleaningError> {
    let input = File::open(raw_path).map_err(|source| CleaningError::Io {
        path: raw_path.display().to_string(),
        source,
    })?;

    let mut tmp_name = cleaned_path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);
    let output = File::create(&tmp_path).map_err(|source| CleaningError::Io {
        path: tmp_path.display().to_string(),
        source,
    })?;

    let report = match clean_records(input, output) {
        Ok(report) => report,
        Err(e) => {
            if let Err(remove_err) = fs::remove_file(&tmp_path) {
                warn!("Failed to remove {:?}: {}", tmp_path, remove_err);
            }
            return Err(e);
        }
    };
    fs::rename(&tmp_path, cleaned_path).map_err(|source| CleaningError::Io {
        path: cleaned_path.display().to_string(),
        source,
    })?;
    info!(
        rows_read = report.rows_read,
        rows_written = report.rows_written,
        "Cleaned data saved to {:?}",
        cleaned_path
    );
    Ok(report)
}

pub fn clean_records<R: Read, W: Write>(input: R, output: W) -> Result<CleaningReport, CleaningError> {
    let mut reader = csv::Reader::from_reader(input);
    let columns = ColumnIndex::from_headers(reader.headers()?)?;
    // Header is written by hand so it is present even when every row is dropped.
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(output);
    writer.write_record(crate::dataset::CLEANED_COLUMNS)?;

    let mut report = CleaningReport::default();
    let mut seen: HashSet<Vec<String>> = HashSet::new();

    for result in reader.records() {
        let row = result?;
        report.rows_read += 1;

        if !seen.insert(row.iter().map(str::to_string).collect()) {
            report.duplicates_dropped += 1;
            continue;
        }

        let field = |i: usize| row.get(i).unwrap_or("").trim();
        if columns.required().iter().any(|&i| field(i).is_empty()) {
            report.missing_dropped += 1;
            continue;
        }

        let Some(booking_hour) = parse_booking_hour(field(columns.date), field(columns.time)) else {
            debug!("Dropping row with unparseable datetime: {:?}", row);
            report.unparseable_dropped += 1;
            continue;
        };
        let ride_distance = match field(columns.ride_distance).parse::<f64>() {
            Ok(d) if d.is_finite() && d >= 0.0 => d,
            _ => {
                debug!("Dropping row with invalid distance: {:?}", row);
                report.unparseable_dropped += 1;
                continue;
            }
        };

        let record = BookingRecord {
            vehicle_type: normalize_category(field(columns.vehicle_type)),
            payment_method: normalize_category(field(columns.payment_method)),
            ride_distance,
            booking_hour,
            cancelled: u8::from(is_cancelled_status(field(columns.booking_status))),
        };
        writer.serialize(&record)?;
        report.rows_written += 1;
    }

    writer.flush().map_err(|source| CleaningError::Io {
        path: "cleaned output".to_string(),
        source,
    })?;
    Ok(report)
}
