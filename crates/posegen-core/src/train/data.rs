//! Training pairs and their token encoding.

use super::TrainingConfig;
use crate::dataset::PoseSample;
use crate::error::{PosegenError, Result};
use crate::model::Tokenizer;

/// Label value excluded from the loss.
pub const IGNORE_INDEX: i64 = -100;

/// One supervised example: the model sees `input` and learns `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingPair {
    /// `Description: {description}`.
    pub input: String,
    /// The pose file's JSON followed by the end marker.
    pub target: String,
}

impl TrainingPair {
    /// Pair for a loaded sample.
    pub fn from_sample(sample: &PoseSample, end_marker: &str) -> Result<Self> {
        let json = serde_json::to_string(&sample.source)?;
        Ok(Self {
            input: format!("Description: {}", sample.record.description),
            target: format!("{json}{end_marker}"),
        })
    }

    /// Prompt and target joined by `separator`.
    pub fn text(&self, separator: &str) -> String {
        format!("{}{separator}{}", self.input, self.target)
    }

    /// Rough token count: whitespace words plus a quarter of the characters.
    pub fn estimated_tokens(&self, separator: &str) -> usize {
        let text = self.text(separator);
        text.split_whitespace().count() + text.chars().count() / 4
    }
}

/// Build pairs for every sample, logging token estimates.
pub fn build_pairs(samples: &[PoseSample], config: &TrainingConfig) -> Result<Vec<TrainingPair>> {
    let mut pairs = Vec::with_capacity(samples.len());
    let mut total_tokens = 0;
    for sample in samples {
        let pair = TrainingPair::from_sample(sample, &config.end_marker)?;
        let tokens = pair.estimated_tokens(&config.separator);
        tracing::debug!(file = %sample.name(), tokens, "training sample");
        total_tokens += tokens;
        pairs.push(pair);
    }
    let average = if pairs.is_empty() { 0 } else { total_tokens / pairs.len() };
    tracing::info!(
        samples = pairs.len(),
        average_tokens = average,
        total_tokens,
        "prepared training pairs"
    );
    Ok(pairs)
}

/// Token ids and labels for one example, unpadded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedExample {
    /// Prompt ids followed by target ids.
    pub input_ids: Vec<u32>,
    /// [`IGNORE_INDEX`] over the prompt, target ids elsewhere.
    pub labels: Vec<i64>,
}

impl EncodedExample {
    /// Sequence length.
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    /// Whether the sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }

    /// Whether any label past the first position contributes to the loss.
    pub fn has_targets(&self) -> bool {
        self.labels.iter().skip(1).any(|&l| l != IGNORE_INDEX)
    }
}

/// Encode a pair: prompt ids (with BOS), target ids, then EOS when the
/// tokenizer has one; truncated to `max_length`.
pub fn encode_pair(
    pair: &TrainingPair,
    tokenizer: &Tokenizer,
    separator: &str,
    max_length: usize,
) -> Result<EncodedExample> {
    let prompt = tokenizer.encode(&format!("{}{separator}", pair.input), true)?;
    let mut target = tokenizer.encode(&pair.target, false)?;
    if let Some(eos) = tokenizer.eos_token_id() {
        target.push(eos);
    }

    let mut input_ids = prompt.clone();
    input_ids.extend_from_slice(&target);
    let mut labels: Vec<i64> = std::iter::repeat(IGNORE_INDEX)
        .take(prompt.len())
        .chain(target.iter().map(|&id| i64::from(id)))
        .collect();

    input_ids.truncate(max_length);
    labels.truncate(max_length);
    Ok(EncodedExample { input_ids, labels })
}

/// Pad a batch to its longest sequence.
///
/// Returns flattened `[batch, len]` ids and labels plus `len`.
pub fn collate(batch: &[&EncodedExample], pad_id: u32) -> (Vec<u32>, Vec<i64>, usize) {
    let len = batch.iter().map(|e| e.len()).max().unwrap_or(0);
    let mut ids = Vec::with_capacity(batch.len() * len);
    let mut labels = Vec::with_capacity(batch.len() * len);
    for example in batch {
        let pad = len - example.len();
        ids.extend_from_slice(&example.input_ids);
        ids.extend(std::iter::repeat(pad_id).take(pad));
        labels.extend_from_slice(&example.labels);
        labels.extend(std::iter::repeat(IGNORE_INDEX).take(pad));
    }
    (ids, labels, len)
}

/// Pad id for a tokenizer, falling back to EOS.
pub fn pad_id(tokenizer: &Tokenizer) -> Result<u32> {
    tokenizer
        .pad_token_id()
        .ok_or_else(|| PosegenError::Tokenizer("tokenizer defines neither a pad nor an eos token".into()))
}
