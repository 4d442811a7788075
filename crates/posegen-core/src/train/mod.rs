//! Fine-tuning driver.
//!
//! Turns loaded pose samples into `Description: ...` → pose JSON pairs,
//! trains a causal model on them with AdamW, and saves a [`ModelArtifact`].
//! Training resumes from a saved artifact when the base model is one;
//! otherwise the base model only supplies the tokenizer.

mod artifact;
mod config;
mod data;
mod trainer;

pub use artifact::{
    ArtifactManifest, ModelArtifact, TensorInfo, MANIFEST_FILE, TOKENIZER_FILE, WEIGHTS_FILE,
};
pub use config::TrainingConfig;
pub use data::{build_pairs, collate, encode_pair, EncodedExample, TrainingPair, IGNORE_INDEX};
pub use trainer::{masked_cross_entropy, select_device, Trainer, TrainingReport};

use crate::dataset::PoseSample;
use crate::error::{PosegenError, Result};
use crate::model::{ModelSource, ReferenceLm, ReferenceLmConfig, Tokenizer};
use candle_core::Device;

/// Model to start training from.
///
/// A source with checkpoint weights is reopened as a [`ModelArtifact`] and
/// must share `tokenizer`'s vocabulary size. Any other source gets a fresh
/// model of `config.hidden_size`.
pub fn initial_model(
    source: &ModelSource,
    tokenizer: &Tokenizer,
    config: &TrainingConfig,
    device: &Device,
) -> Result<ReferenceLm> {
    if source.weights.is_none() {
        tracing::info!(base = %source.name, "starting from freshly initialized weights");
        return ReferenceLm::new(
            ReferenceLmConfig {
                vocab_size: tokenizer.vocab_size(),
                hidden_size: config.hidden_size,
            },
            device,
        );
    }

    let artifact = ModelArtifact::open(&source.dir)?;
    let stored = artifact.manifest().model;
    if stored.vocab_size != tokenizer.vocab_size() {
        return Err(PosegenError::Config(format!(
            "checkpoint {} has vocabulary size {}, tokenizer has {}",
            source.name,
            stored.vocab_size,
            tokenizer.vocab_size()
        )));
    }
    if stored.hidden_size != config.hidden_size {
        tracing::warn!(
            stored = stored.hidden_size,
            configured = config.hidden_size,
            "hidden size taken from checkpoint"
        );
    }
    tracing::info!(base = %source.name, "resuming from checkpoint");
    artifact.load_model(device)
}

/// Train `model` on `samples` and save it to `config.output_dir`.
pub fn fine_tune(
    samples: &[PoseSample],
    model: ReferenceLm,
    tokenizer: &Tokenizer,
    config: TrainingConfig,
) -> Result<(ModelArtifact, TrainingReport)> {
    config.validate()?;
    let pairs = build_pairs(samples, &config)?;

    let model_config = model.config();
    let report = Trainer::new(&model, tokenizer, config.clone())?.train(&pairs)?;
    tracing::info!(%report, "training finished");

    let manifest = ArtifactManifest {
        base_model: config.base_model.clone(),
        model: model_config,
        training: config.clone(),
    };
    let artifact = ModelArtifact::save(&config.output_dir, &model, tokenizer, manifest)?;
    Ok((artifact, report))
}
