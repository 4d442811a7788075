//! High-level pose generation engine.

use anyhow::{anyhow, Result};
use posegen_core::{
    extract::{extract_json_with, DEFAULT_DECIMALS},
    inference::TextGenerator,
    pose::{PoseRecord, RecordIssue, ValidationRules},
    prompt::{PromptFormatter, TemplateVariant},
    vocab::Vocabulary,
};
use serde_json::Value;

/// Configuration for the pose engine.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseEngineConfig {
    /// Skeleton variant used in prompts.
    pub variant: TemplateVariant,
    /// Decimal places kept in recovered numbers.
    pub decimals: u32,
    /// Thresholds for checking generated records.
    pub rules: ValidationRules,
}

impl Default for PoseEngineConfig {
    fn default() -> Self {
        Self {
            variant: TemplateVariant::default(),
            decimals: DEFAULT_DECIMALS,
            rules: ValidationRules::default(),
        }
    }
}

/// Builder for creating a [`PoseEngine`].
pub struct PoseEngineBuilder {
    config: PoseEngineConfig,
    vocabulary: Option<Vocabulary>,
    generator: Option<Box<dyn TextGenerator>>,
}

impl PoseEngineBuilder {
    /// Create a new engine builder.
    pub fn new() -> Self {
        Self {
            config: PoseEngineConfig::default(),
            vocabulary: None,
            generator: None,
        }
    }

    /// Set the template variant.
    pub fn variant(mut self, variant: TemplateVariant) -> Self {
        self.config.variant = variant;
        self
    }

    /// Replace the variant's built-in vocabulary.
    pub fn vocabulary(mut self, vocabulary: Vocabulary) -> Self {
        self.vocabulary = Some(vocabulary);
        self
    }

    /// Set rounding precision.
    pub fn decimals(mut self, decimals: u32) -> Self {
        self.config.decimals = decimals;
        self
    }

    /// Set validation thresholds.
    pub fn rules(mut self, rules: ValidationRules) -> Self {
        self.config.rules = rules;
        self
    }

    /// Set the text generation backend.
    pub fn generator(mut self, generator: impl TextGenerator + 'static) -> Self {
        self.generator = Some(Box::new(generator));
        self
    }

    /// Build the engine.
    pub fn build(self) -> Result<PoseEngine> {
        let generator = self
            .generator
            .ok_or_else(|| anyhow!("pose engine needs a text generator"))?;
        let vocabulary = self
            .vocabulary
            .unwrap_or_else(|| Vocabulary::for_variant(self.config.variant));
        let formatter = PromptFormatter::with_vocabulary(self.config.variant, vocabulary);

        Ok(PoseEngine {
            config: self.config,
            formatter,
            generator,
        })
    }
}

impl Default for PoseEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A recovered pose and what was wrong with it.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedPose {
    /// Typed record; the description is filled in when the model left it out.
    pub record: PoseRecord,
    /// Recovered JSON after rounding, with the model's keys and spelling.
    pub value: Value,
    /// Validation findings; empty when the record is clean.
    pub issues: Vec<RecordIssue>,
    /// Raw generated text.
    pub raw_text: String,
}

impl GeneratedPose {
    /// Whether validation found nothing.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Description → pose pipeline: format, generate, extract, validate.
pub struct PoseEngine {
    config: PoseEngineConfig,
    formatter: PromptFormatter,
    generator: Box<dyn TextGenerator>,
}

impl PoseEngine {
    /// Create a new engine builder.
    pub fn builder() -> PoseEngineBuilder {
        PoseEngineBuilder::new()
    }

    /// Get engine configuration.
    pub fn config(&self) -> &PoseEngineConfig {
        &self.config
    }

    /// Get the prompt formatter.
    pub fn formatter(&self) -> &PromptFormatter {
        &self.formatter
    }

    /// Prompt sent to the generator for `description`.
    pub fn prompt(&self, description: &str) -> String {
        self.formatter.format(description)
    }

    /// Generate a pose for `description`.
    ///
    /// Fails with `NoJsonFound` or `JsonParse` when no pose can be recovered;
    /// a recovered pose with problems is returned with its issues.
    pub fn generate(&self, description: &str) -> posegen_core::Result<GeneratedPose> {
        let prompt = self.prompt(description);
        let raw_text = self.generator.generate(&prompt)?;
        tracing::debug!(chars = raw_text.len(), "generated text");

        let value = extract_json_with(&raw_text, self.config.decimals)?;
        let record = PoseRecord::from_generated(&value, description)?;
        let issues = record.validate(self.formatter.vocabulary(), &self.config.rules);
        for issue in &issues {
            tracing::warn!(%issue, "generated pose issue");
        }

        Ok(GeneratedPose {
            record,
            value,
            issues,
            raw_text,
        })
    }
}

impl std::fmt::Debug for PoseEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoseEngine")
            .field("config", &self.config)
            .field("formatter", &self.formatter)
            .finish()
    }
}
