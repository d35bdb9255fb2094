use anyhow::{Context, bail};
use clap::Parser;
use processing::{
    executable_utils::{ConfigArgs, initialize_executable, load_engine},
    model::InferenceRequest,
};
use rides::{
    override_rules::get_override_cascade,
    requests::{PredictionLine, run_requests, write_line},
};
use std::{
    fs::File,
    io::{self, BufReader},
    path::PathBuf,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Predicts whether bookings will be cancelled", long_about = None)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[arg(long, requires_all = ["payment_method", "ride_distance", "booking_hour"])]
    vehicle_type: Option<String>,

    #[arg(long)]
    payment_method: Option<String>,

    #[arg(long, allow_hyphen_values = true)]
    ride_distance: Option<String>,

    #[arg(long, allow_hyphen_values = true)]
    booking_hour: Option<String>,

    /// File with one JSON request per line
    #[arg(long, conflicts_with = "vehicle_type")]
    requests: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = initialize_executable(&cli.config)?;
    let engine = load_engine(&cli.config, &config, get_override_cascade())?;

    if let Some(path) = &cli.requests {
        let file = File::open(path).with_context(|| format!("failed to open {:?}", path))?;
        let failures = run_requests(&engine, BufReader::new(file), io::stdout().lock())?;
        if failures > 0 {
            bail!("{} request(s) could not be decided", failures);
        }
        return Ok(());
    }

    let (Some(vehicle_type), Some(payment_method), Some(ride_distance), Some(booking_hour)) = (
        cli.vehicle_type.as_deref(),
        cli.payment_method.as_deref(),
        cli.ride_distance.as_deref(),
        cli.booking_hour.as_deref(),
    ) else {
        bail!("either --requests or all of --vehicle-type, --payment-method, --ride-distance, --booking-hour are required");
    };

    let request = InferenceRequest::parse(vehicle_type, payment_method, ride_distance, booking_hour)?;
    let decision = engine.decide(&request)?;
    write_line(&mut io::stdout().lock(), &PredictionLine::Decision(decision))?;
    Ok(())
}
