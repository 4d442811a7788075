//! Training configuration.

use crate::error::{PosegenError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Hyperparameters and paths for a fine-tuning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Base model: a local directory or a hub repository id.
    pub base_model: String,
    /// Artifact directory.
    pub output_dir: PathBuf,
    /// Token limit per example (prompt plus target).
    pub max_length: usize,
    /// Passes over the dataset.
    pub epochs: usize,
    /// Examples per optimizer step.
    pub batch_size: usize,
    /// Peak learning rate.
    pub learning_rate: f64,
    /// AdamW weight decay.
    pub weight_decay: f64,
    /// Global gradient norm cap; `0` disables clipping.
    pub max_grad_norm: f64,
    /// Linear warmup steps.
    pub warmup_steps: usize,
    /// Log every this many steps.
    pub logging_steps: usize,
    /// Shuffle seed.
    pub seed: u64,
    /// Text between the description prompt and the pose JSON.
    pub separator: String,
    /// Marker appended to every target.
    pub end_marker: String,
    /// Hidden size of the reference model.
    pub hidden_size: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            base_model: "google/gemma-3-1b-it".to_string(),
            output_dir: PathBuf::from("./pose-llm-gemma"),
            max_length: 2048,
            epochs: 3,
            batch_size: 1,
            learning_rate: 1e-4,
            weight_decay: 0.01,
            max_grad_norm: 1.0,
            warmup_steps: 0,
            logging_steps: 1,
            seed: 42,
            separator: "\nJSON: ".to_string(),
            end_marker: "<|endoftext|>".to_string(),
            hidden_size: 64,
        }
    }
}

impl TrainingConfig {
    /// Load from JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that cannot run.
    pub fn validate(&self) -> Result<()> {
        let bad = |what: &str| Err(PosegenError::Config(format!("{what} must be positive")));
        if self.max_length < 2 {
            return Err(PosegenError::Config("max_length must be at least 2".into()));
        }
        if self.epochs == 0 {
            return bad("epochs");
        }
        if self.batch_size == 0 {
            return bad("batch_size");
        }
        if self.logging_steps == 0 {
            return bad("logging_steps");
        }
        if self.hidden_size == 0 {
            return bad("hidden_size");
        }
        if self.learning_rate.is_nan() || self.learning_rate <= 0.0 {
            return bad("learning_rate");
        }
        if self.weight_decay < 0.0 || self.max_grad_norm < 0.0 {
            return Err(PosegenError::Config(
                "weight_decay and max_grad_norm must not be negative".into(),
            ));
        }
        Ok(())
    }

    /// Learning rate for `step` (0-based) of `total_steps`: linear warmup,
    /// then linear decay to zero.
    pub fn learning_rate_at(&self, step: usize, total_steps: usize) -> f64 {
        if step < self.warmup_steps {
            return self.learning_rate * (step + 1) as f64 / self.warmup_steps as f64;
        }
        let decay_span = total_steps.saturating_sub(self.warmup_steps).max(1);
        let remaining = total_steps.saturating_sub(step);
        self.learning_rate * remaining as f64 / decay_span as f64
    }
}
