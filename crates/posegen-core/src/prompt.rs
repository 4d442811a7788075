//! Prompt rendering.
//!
//! Every prompt carries an instructional preamble, a zero-valued skeleton that
//! lists each known key, and the description line. The skeleton doubles as the
//! authoritative key list, so it is rendered from the formatter's
//! [`Vocabulary`] rather than kept as a literal.

use crate::error::PosegenError;
use crate::pose::{BoneLayout, PoseRecord};
use crate::vocab::Vocabulary;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::{self, Write as _};
use std::str::FromStr;

const VERBOSE_PREAMBLE: &str = "You are an expert at generating facial expressions and body poses \
for MMD (MikuMikuDance) models in 3D scenes. Your task is to convert any natural language \
description into a valid JSON object with this exact structure (use short float values, e.g., \
-0.01, 0.12):";

const COMPACT_PREAMBLE: &str = "You are an expert at generating MMD (MikuMikuDance) poses. Convert \
the description into a JSON object with this structure. Rotations are [x, y, z, w] quaternions, \
positions are [x, y, z] offsets. Use short float values, e.g., -0.01, 0.12:";

const CLOSING: &str = "Return only the JSON object.";

/// Face keys per skeleton line.
const FACE_KEYS_PER_LINE: usize = 10;

/// Prompt template variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateVariant {
    /// Named-field skeleton: `{"x":0,"y":0,"z":0,"w":1}`.
    #[default]
    Verbose,
    /// Sequence skeleton with finger joints: `[0, 0, 0, 1]`.
    Compact,
}

impl TemplateVariant {
    /// Bone layout used by the skeleton.
    pub fn layout(self) -> BoneLayout {
        match self {
            TemplateVariant::Verbose => BoneLayout::Verbose,
            TemplateVariant::Compact => BoneLayout::Compact,
        }
    }

    /// Lowercase tag.
    pub fn as_str(self) -> &'static str {
        match self {
            TemplateVariant::Verbose => "verbose",
            TemplateVariant::Compact => "compact",
        }
    }
}

impl fmt::Display for TemplateVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateVariant {
    type Err = PosegenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "verbose" => Ok(TemplateVariant::Verbose),
            "compact" => Ok(TemplateVariant::Compact),
            other => Err(PosegenError::Config(format!(
                "unknown template variant '{other}' (expected verbose or compact)"
            ))),
        }
    }
}

/// Renders descriptions into model prompts.
#[derive(Debug, Clone)]
pub struct PromptFormatter {
    variant: TemplateVariant,
    vocabulary: Vocabulary,
    system: String,
}

impl PromptFormatter {
    /// Formatter with the variant's built-in vocabulary.
    pub fn new(variant: TemplateVariant) -> Self {
        Self::with_vocabulary(variant, Vocabulary::for_variant(variant))
    }

    /// Formatter with an explicit vocabulary.
    pub fn with_vocabulary(variant: TemplateVariant, vocabulary: Vocabulary) -> Self {
        let system = render_system(variant, &vocabulary);
        Self {
            variant,
            vocabulary,
            system,
        }
    }

    /// Template variant.
    pub fn variant(&self) -> TemplateVariant {
        self.variant
    }

    /// Vocabulary listed in the skeleton.
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Preamble, skeleton and closing instruction.
    pub fn system_prompt(&self) -> &str {
        &self.system
    }

    /// The description line.
    pub fn user_prompt(&self, description: &str) -> String {
        format!("Pose description: {description}")
    }

    /// Full prompt for a description.
    pub fn format(&self, description: &str) -> String {
        format!("{}\n{}", self.system, self.user_prompt(description))
    }

    /// Full prompt for a record's description.
    pub fn format_record(&self, record: &PoseRecord) -> String {
        self.format(&record.description)
    }

    /// The skeleton as a JSON value.
    pub fn skeleton(&self) -> Value {
        skeleton_value(&self.vocabulary, self.variant.layout())
    }
}

impl Default for PromptFormatter {
    fn default() -> Self {
        Self::new(TemplateVariant::default())
    }
}

fn json_key(key: &str) -> String {
    Value::String(key.to_string()).to_string()
}

fn rest_rotation(layout: BoneLayout) -> &'static str {
    match layout {
        BoneLayout::Verbose => r#"{"x": 0, "y": 0, "z": 0, "w": 1}"#,
        BoneLayout::Compact => "[0, 0, 0, 1]",
    }
}

fn rest_offset(layout: BoneLayout) -> &'static str {
    match layout {
        BoneLayout::Verbose => r#"{"x": 0, "y": 0, "z": 0}"#,
        BoneLayout::Compact => "[0, 0, 0]",
    }
}

fn skeleton_value(vocab: &Vocabulary, layout: BoneLayout) -> Value {
    let zero = || match layout {
        BoneLayout::Verbose => serde_json::json!({"x": 0, "y": 0, "z": 0}),
        BoneLayout::Compact => serde_json::json!([0, 0, 0]),
    };
    let rest = || match layout {
        BoneLayout::Verbose => serde_json::json!({"x": 0, "y": 0, "z": 0, "w": 1}),
        BoneLayout::Compact => serde_json::json!([0, 0, 0, 1]),
    };

    let mut object = Map::new();
    object.insert("description".into(), Value::String(String::new()));
    object.insert(
        "face".into(),
        Value::Object(vocab.face.iter().map(|k| (k.clone(), Value::from(0))).collect()),
    );
    object.insert(
        "rotatableBones".into(),
        Value::Object(vocab.rotatable_bones.iter().map(|k| (k.clone(), rest())).collect()),
    );
    object.insert(
        "movableBones".into(),
        Value::Object(vocab.movable_bones.iter().map(|k| (k.clone(), zero())).collect()),
    );
    Value::Object(object)
}

/// Section of `name: {...}` lines, one entry per key.
fn push_section(out: &mut String, name: &str, keys: &[String], value: &str, last: bool) {
    let _ = writeln!(out, "  \"{name}\": {{");
    for (i, key) in keys.iter().enumerate() {
        let sep = if i + 1 == keys.len() { "" } else { "," };
        let _ = writeln!(out, "    {}: {value}{sep}", json_key(key));
    }
    out.push_str(if last { "  }\n" } else { "  },\n" });
}

fn render_skeleton(vocab: &Vocabulary, layout: BoneLayout) -> String {
    let mut out = String::from("{\n  \"description\": \"\",\n  \"face\": {\n");
    let lines: Vec<String> = vocab
        .face
        .chunks(FACE_KEYS_PER_LINE)
        .map(|chunk| {
            let entries: Vec<String> = chunk.iter().map(|k| format!("{}: 0", json_key(k))).collect();
            format!("    {}", entries.join(", "))
        })
        .collect();
    out.push_str(&lines.join(",\n"));
    if !lines.is_empty() {
        out.push('\n');
    }
    out.push_str("  },\n");

    push_section(&mut out, "rotatableBones", &vocab.rotatable_bones, rest_rotation(layout), false);
    push_section(&mut out, "movableBones", &vocab.movable_bones, rest_offset(layout), true);
    out.push('}');
    out
}

fn render_system(variant: TemplateVariant, vocab: &Vocabulary) -> String {
    let preamble = match variant {
        TemplateVariant::Verbose => VERBOSE_PREAMBLE,
        TemplateVariant::Compact => COMPACT_PREAMBLE,
    };
    format!(
        "{preamble}\n\n{}\n{CLOSING}\n",
        render_skeleton(vocab, variant.layout())
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract_json;

    #[test]
    fn prompt_is_deterministic() {
        let formatter = PromptFormatter::new(TemplateVariant::Verbose);
        let a = formatter.format("Waving with the right hand");
        let b = PromptFormatter::new(TemplateVariant::Verbose).format("Waving with the right hand");
        assert_eq!(a, b);
    }

    #[test]
    fn description_line_comes_last() {
        let prompt = PromptFormatter::default().format("Sitting cross-legged");
        assert!(prompt.ends_with("\nPose description: Sitting cross-legged"));
        assert!(prompt.contains("Return only the JSON object."));
    }

    #[test]
    fn skeleton_text_parses_to_skeleton_value() {
        for variant in [TemplateVariant::Verbose, TemplateVariant::Compact] {
            let formatter = PromptFormatter::new(variant);
            let parsed = extract_json(formatter.system_prompt()).unwrap();
            assert_eq!(parsed, formatter.skeleton(), "{variant}");
        }
    }

    #[test]
    fn skeleton_lists_every_key() {
        let formatter = PromptFormatter::new(TemplateVariant::Compact);
        let skeleton = formatter.skeleton();
        let vocab = Vocabulary::compact();
        assert_eq!(skeleton["face"].as_object().unwrap().len(), vocab.face.len());
        assert_eq!(
            skeleton["rotatableBones"].as_object().unwrap().len(),
            vocab.rotatable_bones.len()
        );
        for key in &vocab.rotatable_bones {
            assert!(formatter.system_prompt().contains(&format!("\"{key}\"")), "{key}");
        }
    }

    #[test]
    fn variants_use_their_layout() {
        let verbose = PromptFormatter::new(TemplateVariant::Verbose);
        assert!(verbose.system_prompt().contains(r#""首": {"x": 0, "y": 0, "z": 0, "w": 1}"#));
        assert!(!verbose.system_prompt().contains("左人指１"));

        let compact = PromptFormatter::new(TemplateVariant::Compact);
        assert!(compact.system_prompt().contains(r#""首": [0, 0, 0, 1]"#));
        assert!(compact.system_prompt().contains(r#""センター": [0, 0, 0]"#));
        assert!(compact.system_prompt().contains("左人指１"));
    }

    #[test]
    fn custom_vocabulary_drives_skeleton() {
        let vocab = Vocabulary {
            face: vec!["あ".into()],
            rotatable_bones: vec!["首".into()],
            movable_bones: vec![],
        };
        let formatter = PromptFormatter::with_vocabulary(TemplateVariant::Verbose, vocab);
        let parsed = extract_json(formatter.system_prompt()).unwrap();
        assert_eq!(parsed["face"], serde_json::json!({"あ": 0}));
        assert_eq!(parsed["movableBones"], serde_json::json!({}));
    }

    #[test]
    fn variant_parses_case_insensitively() {
        assert_eq!("Compact".parse::<TemplateVariant>().unwrap(), TemplateVariant::Compact);
        assert_eq!(TemplateVariant::Verbose.to_string(), "verbose");
        assert!("dense".parse::<TemplateVariant>().is_err());
    }
}
