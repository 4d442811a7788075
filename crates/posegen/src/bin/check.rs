//! Load a pose directory and report records that fail validation.
//!
//! Run with:
//! ```bash
//! cargo run -p posegen --bin posegen-check -- --input pose_dataset --variant compact
//! ```

use anyhow::Context;
use clap::Parser;
use posegen::dataset::load_all;
use posegen::logging::init_tracing;
use posegen::pose::ValidationRules;
use posegen::prompt::TemplateVariant;
use posegen::vocab::Vocabulary;
use std::path::PathBuf;

/// Pose dataset checker
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory of pose JSON files
    #[arg(long, default_value = "pose_dataset")]
    input: PathBuf,

    /// Built-in vocabulary to check against (verbose or compact)
    #[arg(long, default_value = "compact")]
    variant: TemplateVariant,

    /// JSON vocabulary file replacing the built-in one
    #[arg(long)]
    vocabulary: Option<PathBuf>,

    /// Allowed deviation of quaternion norms from one
    #[arg(long, default_value_t = 1e-2)]
    quaternion_tolerance: f64,
}

fn main() -> anyhow::Result<()> {
    init_tracing()?;
    let args = Args::parse();

    let vocabulary = match &args.vocabulary {
        Some(path) => Vocabulary::from_file(path)
            .with_context(|| format!("failed to read vocabulary {}", path.display()))?,
        None => Vocabulary::for_variant(args.variant),
    };
    let rules = ValidationRules {
        quaternion_tolerance: args.quaternion_tolerance,
        ..ValidationRules::default()
    };

    let report = load_all(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    for failure in &report.failures {
        println!("{}: {}", failure.path.display(), failure.error);
    }

    let mut flagged = 0;
    for sample in &report.samples {
        let issues = sample.record.validate(&vocabulary, &rules);
        if issues.is_empty() {
            continue;
        }
        flagged += 1;
        println!("{}:", sample.name());
        for issue in issues {
            println!("  {issue}");
        }
    }

    println!("{report}; {flagged} with issues");
    if flagged > 0 || !report.failures.is_empty() {
        anyhow::bail!("dataset has problems");
    }
    Ok(())
}
