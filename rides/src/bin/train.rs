use anyhow::{Context, bail};
use clap::Parser;
use processing::{
    executable_utils::{ConfigArgs, initialize_executable},
    storage::ArtifactStore,
    training::TrainingPipeline,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Trains and publishes the cancellation model", long_about = None)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    /// Cleaned dataset, defaults to training.dataset_path
    #[arg(long)]
    dataset: Option<String>,

    /// Overrides training.min_accuracy
    #[arg(long)]
    min_accuracy: Option<f64>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = initialize_executable(&cli.config)?;

    if let Some(dataset) = cli.dataset {
        config.training.dataset_path = dataset;
    }
    if let Some(min_accuracy) = cli.min_accuracy {
        if !(0.0..=1.0).contains(&min_accuracy) {
            bail!("--min-accuracy must be within [0, 1], got {}", min_accuracy);
        }
        config.training.min_accuracy = Some(min_accuracy);
    }
    config.validate().context("invalid training overrides")?;

    let artifact_dir = cli.config.artifact_dir(&config);
    let pipeline = TrainingPipeline::new(config.training.clone(), ArtifactStore::new(&artifact_dir));
    let report = pipeline
        .run()
        .with_context(|| format!("training failed, artifacts in {:?} left unchanged", artifact_dir))?;

    if let Some(keep) = config.common.keep_versions {
        let store = pipeline.store();
        let pruned = store
            .prune(keep)
            .with_context(|| format!("failed to prune old versions in {:?}", store.root()))?;
        tracing::info!(root = ?store.root(), keep, pruned = pruned.len(), "Pruned old artifact versions");
    }

    tracing::info!(
        version = %report.version,
        accuracy = report.accuracy,
        "Training finished"
    );
    println!("Model Accuracy: {:.4}", report.accuracy);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
