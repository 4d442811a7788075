//! Fine-tune a model on a pose directory and save the artifact.
//!
//! Run with:
//! ```bash
//! HF_TOKEN=... cargo run --release -p posegen --bin posegen-train -- --data-dir ../pose_dataset
//! ```

use anyhow::Context;
use clap::Parser;
use posegen::dataset::{load_all, PoseSample};
use posegen::logging::init_tracing;
use posegen::model::{HubConfig, ModelSource, Tokenizer, DEFAULT_TOKEN_VAR};
use posegen::train::{fine_tune, initial_model, select_device, TrainingConfig};
use std::path::PathBuf;

/// Pose model fine-tuning
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory of pose JSON files
    #[arg(long, default_value = "../pose_dataset")]
    data_dir: PathBuf,

    /// JSON file with training settings; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Base model directory or hub repository id
    #[arg(long)]
    base_model: Option<String>,

    /// Artifact directory
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Passes over the dataset
    #[arg(long)]
    epochs: Option<usize>,

    /// Peak learning rate
    #[arg(long)]
    learning_rate: Option<f64>,

    /// Environment variable holding the hub token
    #[arg(long, default_value = DEFAULT_TOKEN_VAR)]
    token_var: String,

    /// Hub cache directory
    #[arg(long)]
    cache_dir: Option<PathBuf>,
}

impl Args {
    fn training_config(&self) -> anyhow::Result<TrainingConfig> {
        let mut config = match &self.config {
            Some(path) => TrainingConfig::from_file(path)
                .with_context(|| format!("failed to read training config {}", path.display()))?,
            None => TrainingConfig::default(),
        };
        if let Some(base_model) = &self.base_model {
            config.base_model = base_model.clone();
        }
        if let Some(output_dir) = &self.output_dir {
            config.output_dir = output_dir.clone();
        }
        if let Some(epochs) = self.epochs {
            config.epochs = epochs;
        }
        if let Some(learning_rate) = self.learning_rate {
            config.learning_rate = learning_rate;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing()?;
    let args = Args::parse();
    let config = args.training_config()?;

    let mut hub = HubConfig::from_env(&args.token_var);
    if let Some(dir) = &args.cache_dir {
        hub = hub.with_cache_dir(dir);
    }
    let source = ModelSource::resolve(&config.base_model, &hub)
        .with_context(|| format!("failed to load base model {}", config.base_model))?;
    let tokenizer = Tokenizer::from_file(&source.tokenizer)?;
    tracing::info!(model = %source.name, vocab_size = tokenizer.vocab_size(), "loaded tokenizer");

    let report = load_all(&args.data_dir)
        .with_context(|| format!("failed to read {}", args.data_dir.display()))?;
    println!("{report}");
    let samples: Vec<PoseSample> = report.usable().cloned().collect();
    if samples.len() < report.samples.len() {
        tracing::warn!(
            dropped = report.samples.len() - samples.len(),
            "skipping records without pose data"
        );
    }
    if samples.is_empty() {
        anyhow::bail!("no usable pose files in {}", args.data_dir.display());
    }

    let device = select_device()?;
    let model = initial_model(&source, &tokenizer, &config, &device)
        .with_context(|| format!("failed to initialize from {}", source.name))?;
    let (artifact, training) = fine_tune(&samples, model, &tokenizer, config)?;
    println!("{training}");
    println!("Model saved to {}", artifact.dir().display());
    Ok(())
}
