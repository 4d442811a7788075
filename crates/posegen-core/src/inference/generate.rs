//! Autoregressive decoding over a [`CausalLm`].

use super::{GenerationConfig, TextGenerator};
use crate::error::{PosegenError, Result};
use crate::model::{CausalLm, ReferenceLm, Tokenizer};
use crate::train::ModelArtifact;
use candle_core::{Device, Tensor};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Generates text with a local model.
///
/// Every call re-seeds its RNG from [`GenerationConfig::seed`], so the same
/// prompt always yields the same text.
pub struct LocalGenerator<M: CausalLm> {
    model: M,
    tokenizer: Tokenizer,
    config: GenerationConfig,
}

impl<M: CausalLm> LocalGenerator<M> {
    /// Create a generator; the config is validated here.
    pub fn new(model: M, tokenizer: Tokenizer, config: GenerationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            model,
            tokenizer,
            config,
        })
    }

    /// Decoding settings.
    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Tokenizer.
    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Token ids produced after the prompt, excluding EOS.
    pub fn generate_ids(&self, prompt: &str) -> Result<Vec<u32>> {
        let mut ids =
            self.tokenizer
                .encode_truncated(prompt, true, self.config.max_prompt_tokens)?;
        if ids.len() == self.config.max_prompt_tokens {
            tracing::debug!(kept = ids.len(), "prompt at token limit, may be truncated");
        }
        if ids.is_empty() {
            return Err(PosegenError::Tokenizer("prompt encodes to no tokens".into()));
        }

        let prompt_len = ids.len();
        let eos = self.tokenizer.eos_token_id();
        let device = self.model.device();
        let mut rng = StdRng::seed_from_u64(self.config.seed);

        while ids.len() < self.config.max_length {
            let input = Tensor::new(ids.as_slice(), device)?.unsqueeze(0)?;
            let logits = self.model.forward(&input)?;
            let last = logits.get(0)?.get(ids.len() - 1)?;
            let next = self.sample(&last, &mut rng)?;
            if Some(next) == eos {
                break;
            }
            ids.push(next);
        }

        tracing::debug!(
            prompt_tokens = prompt_len,
            generated_tokens = ids.len() - prompt_len,
            "generation finished"
        );
        Ok(ids.split_off(prompt_len))
    }

    fn sample(&self, logits: &Tensor, rng: &mut StdRng) -> Result<u32> {
        if self.config.is_greedy() {
            return Ok(logits.argmax(0)?.to_scalar::<u32>()?);
        }
        let scaled = (logits / self.config.temperature)?;
        let probs: Vec<f32> = candle_nn::ops::softmax(&scaled, 0)?.to_vec1()?;
        let dist = WeightedIndex::new(&probs)
            .map_err(|e| PosegenError::Training(format!("cannot sample from logits: {e}")))?;
        Ok(dist.sample(rng) as u32)
    }
}

impl LocalGenerator<ReferenceLm> {
    /// Generator over a saved fine-tuned model.
    pub fn from_artifact(
        artifact: &ModelArtifact,
        config: GenerationConfig,
        device: &Device,
    ) -> Result<Self> {
        let tokenizer = artifact.tokenizer()?;
        let model = artifact.load_model(device)?;
        tracing::info!(dir = %artifact.dir().display(), "loaded model artifact");
        Self::new(model, tokenizer, config)
    }
}

impl<M: CausalLm> TextGenerator for LocalGenerator<M> {
    fn generate(&self, prompt: &str) -> Result<String> {
        let ids = self.generate_ids(prompt)?;
        self.tokenizer.decode(&ids, true)
    }
}

impl<M: CausalLm> std::fmt::Debug for LocalGenerator<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalGenerator")
            .field("tokenizer", &self.tokenizer)
            .field("config", &self.config)
            .finish()
    }
}
