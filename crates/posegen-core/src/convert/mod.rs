//! Chat-format dataset conversion.
//!
//! Repackages a pose directory as JSONL for hosted fine-tuning services: one
//! line per pose with a system message, a user request carrying the
//! description, and the pose (minus its description) as the assistant reply.
//! The file is read back and validated once fully written.

mod chat;
mod validate;

pub use chat::{
    ChatExample, ChatFormat, ChatMessage, Role, DEFAULT_SYSTEM_MESSAGE, DEFAULT_USER_TEMPLATE,
    DESCRIPTION_PLACEHOLDER,
};
pub use validate::{validate_jsonl, validate_lines, LineIssue, LineProblem, ValidationReport};

use crate::dataset::{LoadFailure, PoseDataset};
use crate::error::Result;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Outcome of a conversion run.
#[derive(Debug)]
pub struct ConversionReport {
    /// Examples written.
    pub converted: usize,
    /// Pose files skipped.
    pub failures: Vec<LoadFailure>,
    /// JSONL file written.
    pub output: PathBuf,
    /// Read-back validation of `output`.
    pub validation: ValidationReport,
}

impl fmt::Display for ConversionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "converted {} examples into {} ({} skipped), valid {}, ~{} tokens",
            self.converted,
            self.output.display(),
            self.failures.len(),
            self.validation,
            self.validation.estimated_tokens
        )
    }
}

/// Convert every pose file in `input_dir` into `output`, in file-name order.
///
/// A file is converted when it holds a JSON object with a string
/// `description`; the mappings are copied as written. Any other file is
/// logged and skipped. Errors creating or writing `output` abort the run.
pub fn convert_dataset(
    input_dir: &Path,
    output: &Path,
    format: &ChatFormat,
) -> Result<ConversionReport> {
    let dataset = PoseDataset::open(input_dir)?.sorted();
    let mut writer = BufWriter::new(File::create(output)?);
    let mut converted = 0;
    let mut failures = Vec::new();

    for (path, loaded) in dataset.raw_with_results() {
        match loaded.and_then(|pose| format.example(&pose).map(|ex| (pose, ex))) {
            Ok((pose, example)) => {
                serde_json::to_writer(&mut writer, &example)?;
                writer.write_all(b"\n")?;
                converted += 1;
                tracing::debug!(file = %pose.name(), "converted");
            }
            Err(error) if error.is_per_file() => {
                failures.push(LoadFailure { path, error });
            }
            Err(error) => return Err(error),
        }
    }
    writer.flush()?;
    drop(writer);

    tracing::info!(
        output = %output.display(),
        converted,
        skipped = failures.len(),
        "conversion complete"
    );

    let validation = validate_jsonl(output)?;
    Ok(ConversionReport {
        converted,
        failures,
        output: output.to_path_buf(),
        validation,
    })
}
