//! # Posegen
//!
//! Natural-language descriptions in, MMD pose data out.
//!
//! Posegen fine-tunes a causal language model on pose files and recovers
//! pose JSON from what it generates:
//! - **Dataset conversion**: pose directory to chat-format JSONL, validated on read-back
//! - **Fine-tuning**: description → pose pairs with masked prompt labels
//! - **Inference**: skeleton prompt, generation, JSON recovery and record validation
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use posegen::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let artifact = ModelArtifact::open("./pose-llm-gemma".as_ref())?;
//!     let generator =
//!         LocalGenerator::from_artifact(&artifact, GenerationConfig::default(), &Device::Cpu)?;
//!
//!     let engine = PoseEngine::builder()
//!         .variant(TemplateVariant::Verbose)
//!         .generator(generator)
//!         .build()?;
//!
//!     let pose = engine.generate("Standing with both arms raised")?;
//!     println!("{}", serde_json::to_string_pretty(&pose.value)?);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

// Re-export core crate
pub use posegen_core::*;

mod engine;
pub mod logging;

pub use engine::{GeneratedPose, PoseEngine, PoseEngineBuilder, PoseEngineConfig};

/// Commonly used types.
pub mod prelude {
    pub use crate::engine::{GeneratedPose, PoseEngine, PoseEngineBuilder, PoseEngineConfig};
    pub use posegen_core::prelude::*;

    // Re-export useful external types
    pub use anyhow;
    pub use candle_core::Device;
    pub use tracing;
}
