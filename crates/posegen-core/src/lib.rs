//! # Posegen Core
//!
//! Building blocks for turning natural-language pose descriptions into MMD
//! pose data with a fine-tuned language model.
//!
//! This crate provides:
//! - **Pose records** with canonical quaternion/offset types and validation
//! - **Dataset loading** with per-file failure isolation
//! - **Prompt formatting** in verbose and compact skeleton variants
//! - **JSON recovery** from free-form generated text
//! - **Chat-format conversion** of a pose directory to JSONL, with read-back validation
//! - **Fine-tuning and inference drivers** over candle models

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod convert;
pub mod dataset;
pub mod error;
pub mod extract;
pub mod inference;
pub mod model;
pub mod pose;
pub mod prompt;
pub mod train;
pub mod vocab;

pub use error::{PosegenError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::convert::{convert_dataset, validate_jsonl, ChatFormat, ConversionReport};
    pub use crate::dataset::{load_all, LoadReport, PoseDataset, PoseSample, RawPose};
    pub use crate::error::{PosegenError, Result};
    pub use crate::extract::{extract_json, round_floats};
    pub use crate::inference::{GenerationConfig, LocalGenerator, TextGenerator};
    pub use crate::model::{CausalLm, HubConfig, ModelSource, Tokenizer, TrainableLm};
    pub use crate::pose::{PoseRecord, Quat, RecordIssue, ValidationRules, Vec3};
    pub use crate::prompt::{PromptFormatter, TemplateVariant};
    pub use crate::train::{ModelArtifact, Trainer, TrainingConfig};
    pub use crate::vocab::Vocabulary;
}
