//! Model loading and the language-model seam.
//!
//! Provides:
//! - Tokenizer wrapper
//! - Base model resolution (local directory or hub)
//! - The [`CausalLm`] / [`TrainableLm`] traits and a reference model

mod hub;
mod lm;
mod tokenizer;

pub use hub::{HubConfig, ModelSource, DEFAULT_TOKEN_VAR};
pub use lm::{CausalLm, ReferenceLm, ReferenceLmConfig, TrainableLm};
pub use tokenizer::Tokenizer;

#[cfg(test)]
pub(crate) use tokenizer::word_level;
