//! Tokenizer integration for text-to-token and token-to-text conversion.
//!
//! Wraps the HuggingFace tokenizers library and resolves the special tokens
//! the training and generation loops need.

use crate::error::{PosegenError, Result};
use std::path::Path;
use std::str::FromStr;
use tokenizers::Tokenizer as HfTokenizer;

const BOS_CANDIDATES: &[&str] = &["<bos>", "<s>", "<|begin_of_text|>"];
const EOS_CANDIDATES: &[&str] = &["<eos>", "<|endoftext|>", "</s>", "<|end_of_text|>"];
const PAD_CANDIDATES: &[&str] = &["<pad>", "<|pad|>", "[PAD]"];

/// Tokenizer for encoding text to tokens and decoding tokens to text.
#[derive(Clone)]
pub struct Tokenizer {
    /// Underlying HuggingFace tokenizer.
    inner: HfTokenizer,
    /// BOS token ID.
    bos_token_id: Option<u32>,
    /// EOS token ID.
    eos_token_id: Option<u32>,
    /// PAD token ID; falls back to EOS.
    pad_token_id: Option<u32>,
}

fn first_known(inner: &HfTokenizer, candidates: &[&str]) -> Option<u32> {
    candidates.iter().find_map(|t| inner.token_to_id(t))
}

impl Tokenizer {
    /// Wrap an already constructed HuggingFace tokenizer.
    pub fn new(inner: HfTokenizer) -> Self {
        let bos_token_id = first_known(&inner, BOS_CANDIDATES);
        let eos_token_id = first_known(&inner, EOS_CANDIDATES);
        let pad_token_id = first_known(&inner, PAD_CANDIDATES).or(eos_token_id);

        Self {
            inner,
            bos_token_id,
            eos_token_id,
            pad_token_id,
        }
    }

    /// Load a tokenizer from a tokenizer.json file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let inner = HfTokenizer::from_file(path)
            .map_err(|e| PosegenError::model_unavailable(path.display().to_string(), e))?;
        Ok(Self::new(inner))
    }

    /// Load a tokenizer from a model directory.
    ///
    /// Looks for tokenizer.json in the directory.
    pub fn from_dir<P: AsRef<Path>>(model_dir: P) -> Result<Self> {
        let tokenizer_path = model_dir.as_ref().join("tokenizer.json");
        if !tokenizer_path.exists() {
            return Err(PosegenError::model_unavailable(
                model_dir.as_ref().display().to_string(),
                "tokenizer.json not found",
            ));
        }
        Self::from_file(tokenizer_path)
    }

    /// Parse a tokenizer from its JSON definition.
    pub fn from_json(json: &str) -> Result<Self> {
        let inner = HfTokenizer::from_str(json)
            .map_err(|e| PosegenError::Tokenizer(format!("invalid tokenizer definition: {e}")))?;
        Ok(Self::new(inner))
    }

    /// Write the tokenizer definition to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.inner
            .save(path, false)
            .map_err(|e| PosegenError::Tokenizer(format!("failed to save {}: {e}", path.display())))
    }

    /// Encode text to token IDs.
    ///
    /// # Arguments
    ///
    /// * `text` - Text to encode
    /// * `add_bos` - Whether to prepend BOS token
    pub fn encode(&self, text: &str, add_bos: bool) -> Result<Vec<u32>> {
        let encoding = self
            .inner
            .encode(text, false)
            .map_err(|e| PosegenError::Tokenizer(format!("failed to encode text: {e}")))?;

        let mut ids: Vec<u32> = encoding.get_ids().to_vec();

        if add_bos {
            if let Some(bos) = self.bos_token_id {
                ids.insert(0, bos);
            }
        }

        Ok(ids)
    }

    /// Encode and keep at most `max_len` leading tokens.
    pub fn encode_truncated(&self, text: &str, add_bos: bool, max_len: usize) -> Result<Vec<u32>> {
        let mut ids = self.encode(text, add_bos)?;
        ids.truncate(max_len);
        Ok(ids)
    }

    /// Decode token IDs to text.
    pub fn decode(&self, ids: &[u32], skip_special: bool) -> Result<String> {
        let ids: Vec<u32> = if skip_special {
            ids.iter().copied().filter(|&id| !self.is_special_token(id)).collect()
        } else {
            ids.to_vec()
        };
        self.inner
            .decode(&ids, skip_special)
            .map_err(|e| PosegenError::Tokenizer(format!("failed to decode tokens: {e}")))
    }

    /// Get vocabulary size.
    pub fn vocab_size(&self) -> usize {
        self.inner.get_vocab_size(true)
    }

    /// Get BOS token ID.
    pub fn bos_token_id(&self) -> Option<u32> {
        self.bos_token_id
    }

    /// Get EOS token ID.
    pub fn eos_token_id(&self) -> Option<u32> {
        self.eos_token_id
    }

    /// Get PAD token ID.
    pub fn pad_token_id(&self) -> Option<u32> {
        self.pad_token_id
    }

    /// Check if a token is a special token.
    pub fn is_special_token(&self, id: u32) -> bool {
        Some(id) == self.bos_token_id || Some(id) == self.eos_token_id || Some(id) == self.pad_token_id
    }

    /// String to token ID.
    pub fn token_to_id(&self, token: &str) -> Option<u32> {
        self.inner.token_to_id(token)
    }
}

impl std::fmt::Debug for Tokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tokenizer")
            .field("vocab_size", &self.vocab_size())
            .field("bos_token_id", &self.bos_token_id)
            .field("eos_token_id", &self.eos_token_id)
            .field("pad_token_id", &self.pad_token_id)
            .finish()
    }
}

/// Word-level tokenizer over a fixed word list, for tests.
#[cfg(test)]
pub(crate) fn word_level(words: &[&str]) -> Tokenizer {
    let vocab: serde_json::Map<String, serde_json::Value> = words
        .iter()
        .enumerate()
        .map(|(i, w)| (w.to_string(), serde_json::Value::from(i as u32)))
        .collect();
    let definition = serde_json::json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": null,
        "pre_tokenizer": {"type": "Whitespace"},
        "post_processor": null,
        "decoder": null,
        "model": {"type": "WordLevel", "vocab": vocab, "unk_token": "[UNK]"}
    });
    Tokenizer::from_json(&definition.to_string()).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORDS: &[&str] = &["[UNK]", "<eos>", "Description", ":", "raise", "arms", "JSON"];

    #[test]
    fn resolves_special_tokens() {
        let tokenizer = word_level(WORDS);
        assert_eq!(tokenizer.eos_token_id(), Some(1));
        assert_eq!(tokenizer.bos_token_id(), None);
        // No pad token in the vocabulary: falls back to EOS.
        assert_eq!(tokenizer.pad_token_id(), Some(1));
        assert!(tokenizer.is_special_token(1));
        assert!(!tokenizer.is_special_token(4));
    }

    #[test]
    fn encode_decode() {
        let tokenizer = word_level(WORDS);
        let ids = tokenizer.encode("Description: raise arms", false).unwrap();
        assert_eq!(ids, vec![2, 3, 4, 5]);
        assert_eq!(tokenizer.decode(&[4, 5, 1], true).unwrap(), "raise arms");
        assert!(tokenizer.decode(&[4, 5, 1], false).unwrap().contains("<eos>"));
    }

    #[test]
    fn unknown_words_map_to_unk() {
        let tokenizer = word_level(WORDS);
        assert_eq!(tokenizer.encode("wave", false).unwrap(), vec![0]);
    }

    #[test]
    fn truncates() {
        let tokenizer = word_level(WORDS);
        let ids = tokenizer.encode_truncated("raise arms raise arms", false, 3).unwrap();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let tokenizer = word_level(WORDS);
        tokenizer.save(&dir.path().join("tokenizer.json")).unwrap();
        let reloaded = Tokenizer::from_dir(dir.path()).unwrap();
        assert_eq!(reloaded.vocab_size(), tokenizer.vocab_size());
        assert_eq!(reloaded.eos_token_id(), Some(1));
    }

    #[test]
    fn missing_tokenizer_is_model_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = Tokenizer::from_dir(dir.path()).unwrap_err();
        assert!(matches!(err, PosegenError::ModelUnavailable { .. }));
    }
}
