use anyhow::Context;
use clap::Parser;
use processing::{
    cleaning::clean_rides,
    executable_utils::{ConfigArgs, initialize_executable},
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Cleans the raw bookings export into the training dataset", long_about = None)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    /// Raw bookings csv, defaults to cleaning.raw_path
    #[arg(long)]
    raw: Option<PathBuf>,

    /// Output csv, defaults to cleaning.cleaned_path
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = initialize_executable(&cli.config)?;

    let raw = cli.raw.unwrap_or_else(|| PathBuf::from(&config.cleaning.raw_path));
    let output = cli
        .output
        .unwrap_or_else(|| PathBuf::from(&config.cleaning.cleaned_path));

    let report = clean_rides(&raw, &output).with_context(|| format!("failed to clean {:?}", raw))?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
