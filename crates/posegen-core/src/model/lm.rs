//! Causal language model seam.
//!
//! Training and generation only need next-token logits, so the model is a
//! trait. [`ReferenceLm`] is a small candle model (token embedding plus an
//! output projection) that implements it end to end; larger backends plug in
//! behind the same traits.

use crate::error::{PosegenError, Result};
use candle_core::{DType, Device, Module, Tensor};
use candle_nn::{Embedding, Linear, VarBuilder, VarMap};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A model producing next-token logits.
pub trait CausalLm {
    /// Logits of shape `[batch, seq, vocab]` for `input_ids` of shape
    /// `[batch, seq]` (`u32`).
    fn forward(&self, input_ids: &Tensor) -> Result<Tensor>;

    /// Output vocabulary size.
    fn vocab_size(&self) -> usize;

    /// Device the weights live on.
    fn device(&self) -> &Device;
}

/// A [`CausalLm`] whose weights live in a [`VarMap`] and can be optimized.
pub trait TrainableLm: CausalLm {
    /// Trainable variables.
    fn var_map(&self) -> &VarMap;
}

/// Shape of a [`ReferenceLm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceLmConfig {
    /// Vocabulary size.
    pub vocab_size: usize,
    /// Hidden dimension.
    pub hidden_size: usize,
}

impl ReferenceLmConfig {
    /// Config for a vocabulary, with the default hidden size.
    pub fn for_vocab(vocab_size: usize) -> Self {
        Self {
            vocab_size,
            ..Self::default()
        }
    }
}

impl Default for ReferenceLmConfig {
    fn default() -> Self {
        Self {
            vocab_size: 0,
            hidden_size: 64,
        }
    }
}

/// Token embedding followed by a projection back to the vocabulary.
pub struct ReferenceLm {
    config: ReferenceLmConfig,
    embed_tokens: Embedding,
    lm_head: Linear,
    var_map: VarMap,
    device: Device,
}

impl ReferenceLm {
    /// Freshly initialized model.
    pub fn new(config: ReferenceLmConfig, device: &Device) -> Result<Self> {
        if config.vocab_size == 0 || config.hidden_size == 0 {
            return Err(PosegenError::Config(format!(
                "reference model needs a non-empty shape, got {config:?}"
            )));
        }
        let var_map = VarMap::new();
        let vb = VarBuilder::from_varmap(&var_map, DType::F32, device);
        let embed_tokens =
            candle_nn::embedding(config.vocab_size, config.hidden_size, vb.pp("embed_tokens"))?;
        let lm_head = candle_nn::linear(config.hidden_size, config.vocab_size, vb.pp("lm_head"))?;

        Ok(Self {
            config,
            embed_tokens,
            lm_head,
            var_map,
            device: device.clone(),
        })
    }

    /// Model with weights restored from a safetensors file.
    pub fn load(config: ReferenceLmConfig, weights: &Path, device: &Device) -> Result<Self> {
        let mut model = Self::new(config, device)?;
        model
            .var_map
            .load(weights)
            .map_err(|e| PosegenError::model_unavailable(weights.display().to_string(), e))?;
        Ok(model)
    }

    /// Model shape.
    pub fn config(&self) -> ReferenceLmConfig {
        self.config
    }
}

impl CausalLm for ReferenceLm {
    fn forward(&self, input_ids: &Tensor) -> Result<Tensor> {
        let hidden = self.embed_tokens.forward(input_ids)?.tanh()?;
        Ok(self.lm_head.forward(&hidden)?)
    }

    fn vocab_size(&self) -> usize {
        self.config.vocab_size
    }

    fn device(&self) -> &Device {
        &self.device
    }
}

impl TrainableLm for ReferenceLm {
    fn var_map(&self) -> &VarMap {
        &self.var_map
    }
}

impl std::fmt::Debug for ReferenceLm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceLm")
            .field("config", &self.config)
            .field("device", &self.device)
            .finish()
    }
}
