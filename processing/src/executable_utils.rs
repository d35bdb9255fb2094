use anyhow::Context;
use clap::Args;
use common::config::Config;
use std::{path::PathBuf, sync::Arc};
use tracing_subscriber::EnvFilter;

use crate::{
    engine::DecisionEngine,
    rules::OverrideCascade,
    storage::ArtifactStore,
};

/// Flags shared by every binary.
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Path to config file
    #[arg(short, long, default_value = "target/debug/config/total_config.yaml")]
    pub config: String,

    /// Overrides the configured artifact directory
    #[arg(long)]
    pub artifact_dir: Option<PathBuf>,
}

impl ConfigArgs {
    pub fn artifact_dir(&self, config: &Config) -> PathBuf {
        self.artifact_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(&config.common.artifact_dir))
    }
}

/// Loads the config and installs the tracing subscriber. `RUST_LOG` takes
/// precedence over the configured log level.
pub fn initialize_executable(args: &ConfigArgs) -> anyhow::Result<Config> {
    let config = Config::load(&args.config)
        .with_context(|| format!("failed to load config from {}", args.config))?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.inference.log_level))
        .with_context(|| format!("invalid log level '{}'", config.inference.log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!(
        config = %args.config,
        project = %config.common.project_name,
        "Loaded configuration"
    );
    tracing::debug!("Config: {:#?}", config);
    Ok(config)
}

/// Loads the current artifact set and wraps it in an engine with `cascade`.
pub fn load_engine(args: &ConfigArgs, config: &Config, cascade: OverrideCascade) -> anyhow::Result<DecisionEngine> {
    let artifact_dir = args.artifact_dir(config);
    let artifacts = ArtifactStore::new(&artifact_dir)
        .load()
        .with_context(|| format!("failed to load artifacts from {:?}", artifact_dir))?;
    Ok(DecisionEngine::new(Arc::new(artifacts), cascade))
}
