//! Convert a pose directory into chat-format JSONL for hosted fine-tuning.
//!
//! Run with:
//! ```bash
//! cargo run -p posegen --bin posegen-convert -- --input pose_dataset --output pose_training_data.jsonl
//! ```

use anyhow::Context;
use clap::Parser;
use posegen::convert::{convert_dataset, ChatFormat};
use posegen::logging::init_tracing;
use std::path::PathBuf;

/// Pose dataset to JSONL converter
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory of pose JSON files
    #[arg(long, default_value = "pose_dataset")]
    input: PathBuf,

    /// JSONL file to write
    #[arg(long, default_value = "pose_training_data.jsonl")]
    output: PathBuf,

    /// JSON file overriding the system message and user template
    #[arg(long)]
    chat_format: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    init_tracing()?;
    let args = Args::parse();

    let format = match &args.chat_format {
        Some(path) => ChatFormat::from_file(path)
            .with_context(|| format!("failed to read chat format {}", path.display()))?,
        None => ChatFormat::default(),
    };

    let report = convert_dataset(&args.input, &args.output, &format)
        .with_context(|| format!("failed to convert {}", args.input.display()))?;

    for failure in &report.failures {
        eprintln!("skipped {}: {}", failure.path.display(), failure.error);
    }
    for issue in &report.validation.issues {
        eprintln!("{issue}");
    }
    println!("{report}");
    if report.validation.all_valid() {
        println!("All examples are valid for fine-tuning.");
    } else {
        println!("Some examples have issues; fix them before uploading.");
    }
    Ok(())
}
