//! Generate a pose for a description with a fine-tuned model.
//!
//! Run with:
//! ```bash
//! cargo run --release -p posegen --bin posegen-infer -- --model ./pose-llm-gemma "Waving with the right hand"
//! ```

use anyhow::Context;
use clap::Parser;
use posegen::inference::{GenerationConfig, LocalGenerator};
use posegen::logging::init_tracing;
use posegen::prompt::TemplateVariant;
use posegen::train::{select_device, ModelArtifact};
use posegen::{PoseEngine, PosegenError};
use std::path::PathBuf;

/// Pose generation from a description
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Pose description
    #[arg(default_value = "Standing with both arms extended forward, palms open and fingers spread")]
    description: String,

    /// Fine-tuned model directory
    #[arg(long, default_value = "./pose-llm-gemma")]
    model: PathBuf,

    /// Prompt skeleton variant (verbose or compact)
    #[arg(long, default_value = "verbose")]
    variant: TemplateVariant,

    /// JSON file with decoding settings
    #[arg(long)]
    generation_config: Option<PathBuf>,

    /// Sampling temperature; 0 decodes greedily
    #[arg(long)]
    temperature: Option<f64>,
}

fn main() -> anyhow::Result<()> {
    init_tracing()?;
    let args = Args::parse();

    let mut generation = match &args.generation_config {
        Some(path) => GenerationConfig::from_file(path)
            .with_context(|| format!("failed to read generation config {}", path.display()))?,
        None => GenerationConfig::default(),
    };
    if let Some(temperature) = args.temperature {
        generation.temperature = temperature;
    }

    let device = select_device()?;
    let artifact = ModelArtifact::open(&args.model)
        .with_context(|| format!("failed to open model {}", args.model.display()))?;
    let generator = LocalGenerator::from_artifact(&artifact, generation, &device)?;

    let engine = PoseEngine::builder()
        .variant(args.variant)
        .generator(generator)
        .build()?;

    match engine.generate(&args.description) {
        Ok(pose) => {
            for issue in &pose.issues {
                eprintln!("warning: {issue}");
            }
            println!("{}", serde_json::to_string_pretty(&pose.value)?);
            Ok(())
        }
        Err(PosegenError::NoJsonFound { raw }) => {
            eprintln!("No JSON object found in output.\nRaw output:\n{raw}");
            anyhow::bail!("generation produced no pose")
        }
        Err(PosegenError::JsonParse { message, slice }) => {
            eprintln!("Failed to decode JSON: {message}\nRaw output:\n{slice}");
            anyhow::bail!("generation produced malformed JSON")
        }
        Err(other) => Err(other.into()),
    }
}
