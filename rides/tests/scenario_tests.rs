use std::{error::Error, fmt::Write as _, fs, path::Path, sync::Arc};

use common::config::{Config, TrainingConfig};
use processing::{
    classifier::{CancellationModel, Classifier},
    cleaning::clean_rides,
    engine::DecisionEngine,
    model::{Decision, InferenceRequest, Outcome, Reason},
    storage::ArtifactStore,
    training::TrainingPipeline,
};
use rides::{
    override_rules::get_override_cascade,
    requests::run_requests,
};
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn Error + Send + Sync>>;

const VEHICLES: [&str; 4] = ["Auto", "Mini", "Sedan", "SUV"];
const PAYMENTS: [&str; 3] = ["Cash", "Online", "UPI"];

/// Raw export in which long afternoon rides get cancelled.
fn raw_export() -> String {
    let mut raw = String::from("Date,Time,Booking_ID,Booking_Status,Vehicle_Type,Payment_Method,Ride_Distance\n");
    for i in 0..120u32 {
        let distance = f64::from(i % 30) * 0.5 + 0.25;
        let status = if distance > 7.0 { "Cancelled" } else { "Success" };
        let _ = writeln!(
            raw,
            "2024-07-{:02},{:02}:{:02}:00,CNR{:05},{},{},{},{}",
            1 + i % 28,
            7 + i % 15,
            i % 60,
            i,
            status,
            VEHICLES[(i % 4) as usize],
            PAYMENTS[(i % 3) as usize],
            distance
        );
    }
    raw
}

struct Trained {
    _dir: TempDir,
    engine: DecisionEngine<CancellationModel>,
}

fn train_engine() -> Result<Trained, Box<dyn Error + Send + Sync>> {
    let dir = TempDir::new()?;
    let raw = dir.path().join("raw.csv");
    let cleaned = dir.path().join("cleaned.csv");
    fs::write(&raw, raw_export())?;

    let report = clean_rides(&raw, &cleaned)?;
    assert_eq!(report.rows_written, 120);

    let config = TrainingConfig {
        dataset_path: cleaned.display().to_string(),
        n_estimators: 20,
        ..TrainingConfig::default()
    };
    let store = ArtifactStore::new(dir.path().join("model"));
    let training = TrainingPipeline::new(config, store).run()?;
    println!("training report: {:?}", training);
    assert_eq!(training.vehicle_categories, vec!["auto", "mini", "sedan", "suv"]);
    assert_eq!(training.payment_categories, vec!["cash", "online", "upi"]);

    let artifacts = ArtifactStore::new(dir.path().join("model")).load()?;
    let engine = DecisionEngine::new(Arc::new(artifacts), get_override_cascade());
    Ok(Trained { _dir: dir, engine })
}

#[test]
fn test_unknown_vehicle_is_cancelled() -> TestResult {
    let trained = train_engine()?;
    let decision = trained
        .engine
        .decide(&InferenceRequest::new("Helicopter", "Cash", 5.0, 14))?;
    assert_eq!(decision, Decision::cancelled(Reason::UnknownCategory));
    Ok(())
}

#[test]
fn test_short_cash_ride_is_cancelled() -> TestResult {
    let trained = train_engine()?;
    let decision = trained
        .engine
        .decide(&InferenceRequest::new("Sedan", "Cash", 1.5, 14))?;
    assert_eq!(decision, Decision::cancelled(Reason::ShortCashRide));
    Ok(())
}

#[test]
fn test_late_night_ride_is_cancelled() -> TestResult {
    let trained = train_engine()?;
    let decision = trained
        .engine
        .decide(&InferenceRequest::new("SUV", "Online", 10.0, 1))?;
    assert_eq!(decision, Decision::cancelled(Reason::LateNight));
    Ok(())
}

#[test]
fn test_regular_ride_follows_model() -> TestResult {
    let trained = train_engine()?;
    let request = InferenceRequest::new("Mini", "Online", 8.0, 14);
    let decision = trained.engine.decide(&request)?;

    let artifacts = trained.engine.artifacts();
    let features = artifacts.features_for(&request.validate()?)?;
    let expected = Outcome::from_label(artifacts.model().predict(&features));
    assert_eq!(decision, Decision::new(expected, Reason::StatisticalPrediction));
    Ok(())
}

#[test]
fn test_night_window_boundaries() -> TestResult {
    let trained = train_engine()?;
    for (hour, night) in [(22, false), (23, true), (5, true), (6, false)] {
        let decision = trained
            .engine
            .decide(&InferenceRequest::new("sedan", "online", 6.0, hour))?;
        println!("hour {} -> {:?}", hour, decision);
        assert_eq!(decision.reason() == Reason::LateNight, night, "hour {}", hour);
        if !night {
            assert_eq!(decision.reason(), Reason::StatisticalPrediction);
        }
    }
    Ok(())
}

#[test]
fn test_short_cash_boundaries() -> TestResult {
    let trained = train_engine()?;
    let cases = [
        ("cash", 1.999, Reason::ShortCashRide),
        ("cash", 2.0, Reason::StatisticalPrediction),
        ("online", 1.0, Reason::StatisticalPrediction),
        (" CASH ", 0.5, Reason::ShortCashRide),
    ];
    for (payment, distance, reason) in cases {
        let decision = trained
            .engine
            .decide(&InferenceRequest::new("auto", payment, distance, 12))?;
        assert_eq!(decision.reason(), reason, "{} {}", payment, distance);
    }
    Ok(())
}

#[test]
fn test_jsonl_requests_produce_one_line_each() -> TestResult {
    let trained = train_engine()?;
    let input = concat!(
        r#"{"vehicle_type":"Sedan","payment_method":"Cash","ride_distance":1.5,"booking_hour":14}"#,
        "\n\n",
        r#"{"vehicle_type":"Sedan","payment_method":"Cash","ride_distance":1.5,"booking_hour":30}"#,
        "\n",
        "not json\n",
        r#"{"vehicle_type":"Helicopter","payment_method":"Cash","ride_distance":3,"booking_hour":10}"#,
        "\n",
    );
    let mut output = Vec::new();
    let failures = run_requests(&trained.engine, input.as_bytes(), &mut output)?;
    assert_eq!(failures, 2);

    let lines: Vec<serde_json::Value> = String::from_utf8(output)?
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()?;
    assert_eq!(lines.len(), 4);
    assert_eq!(
        lines[0],
        serde_json::json!({"outcome": "CANCELLED", "reason": "low driver acceptance for short cash rides"})
    );
    assert_eq!(lines[1]["line"], 3);
    assert!(lines[1]["error"].as_str().unwrap_or_default().contains("booking hour"));
    assert_eq!(lines[2]["line"], 4);
    assert_eq!(lines[3]["reason"], "unknown category business override");
    Ok(())
}

#[test]
fn test_config_files_resolve_includes() -> TestResult {
    let config_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("config");

    let dev = Config::load_with_includes(&config_dir.join("dev.yaml"))?;
    assert_eq!(dev.common.project_name, "rides");
    assert_eq!(dev.common.artifact_dir, "model");
    assert_eq!(dev.inference.log_level, "debug");
    assert_eq!(dev.training.seed, 42);
    assert!(dev.training.min_accuracy.is_none());

    let prod = Config::load_with_includes(&config_dir.join("prod.yaml"))?;
    assert_eq!(prod.training.min_accuracy, Some(0.7));
    assert_eq!(prod.common.keep_versions, Some(5));
    assert_eq!(prod.training.n_estimators, 100);
    Ok(())
}
