//! Fine-tuned model artifacts on disk.
//!
//! An artifact directory holds:
//! - `model.safetensors`: trained weights
//! - `tokenizer.json`: the tokenizer used for training
//! - `training_config.json`: an [`ArtifactManifest`]

use super::TrainingConfig;
use crate::error::{PosegenError, Result};
use crate::model::{ReferenceLm, ReferenceLmConfig, Tokenizer, TrainableLm};
use candle_core::Device;
use safetensors::SafeTensors;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Weights file name.
pub const WEIGHTS_FILE: &str = "model.safetensors";
/// Tokenizer file name.
pub const TOKENIZER_FILE: &str = "tokenizer.json";
/// Manifest file name.
pub const MANIFEST_FILE: &str = "training_config.json";

/// What was trained and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    /// Base model the tokenizer came from.
    pub base_model: String,
    /// Shape of the trained model.
    pub model: ReferenceLmConfig,
    /// Settings of the run.
    pub training: TrainingConfig,
}

/// Name, shape and dtype of a stored tensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorInfo {
    /// Tensor name.
    pub name: String,
    /// Dimensions.
    pub shape: Vec<usize>,
    /// Stored dtype.
    pub dtype: String,
}

/// A saved fine-tuned model.
#[derive(Debug, Clone)]
pub struct ModelArtifact {
    dir: PathBuf,
    manifest: ArtifactManifest,
}

impl ModelArtifact {
    /// Write weights, tokenizer and manifest into `dir`.
    pub fn save<M: TrainableLm>(
        dir: &Path,
        model: &M,
        tokenizer: &Tokenizer,
        manifest: ArtifactManifest,
    ) -> Result<Self> {
        fs::create_dir_all(dir)?;
        model.var_map().save(dir.join(WEIGHTS_FILE))?;
        tokenizer.save(&dir.join(TOKENIZER_FILE))?;
        fs::write(dir.join(MANIFEST_FILE), serde_json::to_string_pretty(&manifest)?)?;
        tracing::info!(dir = %dir.display(), "saved model artifact");
        Ok(Self {
            dir: dir.to_path_buf(),
            manifest,
        })
    }

    /// Open an artifact directory.
    pub fn open(dir: &Path) -> Result<Self> {
        for file in [WEIGHTS_FILE, TOKENIZER_FILE, MANIFEST_FILE] {
            if !dir.join(file).is_file() {
                return Err(PosegenError::model_unavailable(
                    dir.display().to_string(),
                    format!("{file} not found"),
                ));
            }
        }
        let contents = fs::read_to_string(dir.join(MANIFEST_FILE))?;
        let manifest = serde_json::from_str(&contents).map_err(|e| {
            PosegenError::model_unavailable(dir.display().to_string(), format!("bad manifest: {e}"))
        })?;
        Ok(Self {
            dir: dir.to_path_buf(),
            manifest,
        })
    }

    /// Artifact directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Manifest.
    pub fn manifest(&self) -> &ArtifactManifest {
        &self.manifest
    }

    /// Load the tokenizer.
    pub fn tokenizer(&self) -> Result<Tokenizer> {
        Tokenizer::from_file(self.dir.join(TOKENIZER_FILE))
    }

    /// Load the trained model.
    pub fn load_model(&self, device: &Device) -> Result<ReferenceLm> {
        ReferenceLm::load(self.manifest.model, &self.dir.join(WEIGHTS_FILE), device)
    }

    /// Stored tensors, sorted by name.
    pub fn tensors(&self) -> Result<Vec<TensorInfo>> {
        let path = self.dir.join(WEIGHTS_FILE);
        let data = fs::read(&path)?;
        let safetensors = SafeTensors::deserialize(&data).map_err(|e| {
            PosegenError::model_unavailable(path.display().to_string(), format!("failed to deserialize: {e}"))
        })?;

        let mut tensors: Vec<TensorInfo> = safetensors
            .tensors()
            .into_iter()
            .map(|(name, view)| TensorInfo {
                name,
                shape: view.shape().to_vec(),
                dtype: format!("{:?}", view.dtype()),
            })
            .collect();
        tensors.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tensors)
    }
}
