//! Inference driver: prompt in, raw generated text out.
//!
//! Backends implement [`TextGenerator`]. [`LocalGenerator`] runs any
//! [`CausalLm`](crate::model::CausalLm) with greedy or temperature sampling.
//! Recovering a pose from the text is the job of [`crate::extract`].

mod generate;

pub use generate::LocalGenerator;

use crate::error::{PosegenError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Produces raw text for a prompt.
pub trait TextGenerator {
    /// Generate a continuation of `prompt`. The returned text excludes the
    /// prompt itself.
    fn generate(&self, prompt: &str) -> Result<String>;
}

impl<G: TextGenerator + ?Sized> TextGenerator for Box<G> {
    fn generate(&self, prompt: &str) -> Result<String> {
        (**self).generate(prompt)
    }
}

/// Decoding settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Prompt tokens kept; the rest of the prompt is cut.
    pub max_prompt_tokens: usize,
    /// Upper bound on prompt plus generated tokens.
    pub max_length: usize,
    /// `0` decodes greedily.
    pub temperature: f64,
    /// Sampling seed.
    pub seed: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_prompt_tokens: 1024,
            max_length: 1024,
            temperature: 0.0,
            seed: 42,
        }
    }
}

impl GenerationConfig {
    /// Load from JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that cannot run.
    pub fn validate(&self) -> Result<()> {
        if self.max_prompt_tokens == 0 || self.max_length == 0 {
            return Err(PosegenError::Config(
                "max_prompt_tokens and max_length must be positive".into(),
            ));
        }
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return Err(PosegenError::Config(format!(
                "temperature must be a non-negative number, got {}",
                self.temperature
            )));
        }
        Ok(())
    }

    /// Whether decoding is greedy.
    pub fn is_greedy(&self) -> bool {
        self.temperature == 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl TextGenerator for Echo {
        fn generate(&self, prompt: &str) -> Result<String> {
            Ok(prompt.to_uppercase())
        }
    }

    #[test]
    fn boxed_generators_delegate() {
        let boxed: Box<dyn TextGenerator> = Box::new(Echo);
        assert_eq!(boxed.generate("wave").unwrap(), "WAVE");
    }

    #[test]
    fn defaults_are_greedy_with_1024_tokens() {
        let config = GenerationConfig::default();
        assert!(config.is_greedy());
        assert_eq!(config.max_prompt_tokens, 1024);
        assert_eq!(config.max_length, 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_negative_temperature() {
        let config = GenerationConfig {
            temperature: -0.5,
            ..GenerationConfig::default()
        };
        assert!(matches!(config.validate(), Err(PosegenError::Config(_))));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gen.json");
        std::fs::write(&path, r#"{"temperature": 0.7}"#).unwrap();
        let config = GenerationConfig::from_file(&path).unwrap();
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.seed, 42);
    }
}
