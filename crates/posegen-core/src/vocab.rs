//! Key vocabularies for facial morphs, joints and root/IK bones.
//!
//! The skeleton embedded in every prompt lists these keys, and record
//! validation flags any key outside them. The two prompt variants do not
//! share one joint list (the compact one adds finger joints), so the
//! vocabulary is data: the built-in sets can be replaced from a JSON file.

use crate::error::{PosegenError, Result};
use crate::prompt::TemplateVariant;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Facial morphs listed in the skeleton.
pub const FACE_MORPHS: &[&str] = &[
    "真面目", "困る", "にこり", "怒り", "あ", "い", "う", "え", "お", "お1",
    "にやり２", "にやり２1", "口横広げ", "口横缩げ", "口角上げ", "口角下げ1", "口角下げ",
    "まばたき", "笑い", "ウィンク", "ウィンク右", "ウィンク２", "ｳｨﾝｸ２右", "びっくり",
    "恐ろしい子！", "なごみ", "はちゅ目", "はぅ", "ｷﾘｯ", "眼角下", "眼睑上", "じと目", "じと目1",
    "照れ",
];

/// Body joints shared by both skeleton variants.
pub const BODY_JOINTS: &[&str] = &[
    "上半身", "首", "頭", "下半身",
    "左腕", "右腕", "左ひじ", "右ひじ", "左手首", "右手首",
    "左足", "右足", "左ひざ", "右ひざ", "左足首", "右足首",
    "左親指１", "右親指１",
];

/// Finger joints present only in the compact skeleton.
pub const FINGER_JOINTS: &[&str] = &[
    "左親指２", "左人指１", "左人指２", "左人指３", "左中指１", "左中指２", "左中指３",
    "左薬指１", "左薬指２", "左薬指３", "左小指１", "左小指２", "左小指３",
    "右親指２", "右人指１", "右人指２", "右人指３", "右中指１", "右中指２", "右中指３",
    "右薬指１", "右薬指２", "右薬指３", "右小指１", "右小指２", "右小指３",
];

/// Root and IK bones.
pub const ROOT_BONES: &[&str] = &["センター", "左足ＩＫ", "右足ＩＫ", "左つま先ＩＫ", "右つま先ＩＫ"];

/// Ordered key sets for the three pose mappings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    /// Facial morph names.
    pub face: Vec<String>,
    /// Joint names (rotations).
    pub rotatable_bones: Vec<String>,
    /// Root/IK bone names (offsets).
    pub movable_bones: Vec<String>,
}

fn owned(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|k| k.to_string()).collect()
}

impl Vocabulary {
    /// Key set of the verbose skeleton.
    pub fn verbose() -> Self {
        Self {
            face: owned(FACE_MORPHS),
            rotatable_bones: owned(BODY_JOINTS),
            movable_bones: owned(ROOT_BONES),
        }
    }

    /// Key set of the compact skeleton (verbose joints plus fingers).
    pub fn compact() -> Self {
        let mut vocab = Self::verbose();
        vocab.rotatable_bones.extend(owned(FINGER_JOINTS));
        vocab
    }

    /// Built-in key set for a template variant.
    pub fn for_variant(variant: TemplateVariant) -> Self {
        match variant {
            TemplateVariant::Verbose => Self::verbose(),
            TemplateVariant::Compact => Self::compact(),
        }
    }

    /// Load from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let vocab: Self = serde_json::from_str(&contents)?;
        if vocab.face.is_empty() && vocab.rotatable_bones.is_empty() && vocab.movable_bones.is_empty()
        {
            return Err(PosegenError::Config(format!(
                "vocabulary {} lists no keys",
                path.display()
            )));
        }
        Ok(vocab)
    }

    /// Keys of both vocabularies, in order, without duplicates.
    pub fn union(&self, other: &Vocabulary) -> Vocabulary {
        fn merge(a: &[String], b: &[String]) -> Vec<String> {
            let mut out = a.to_vec();
            for key in b {
                if !out.contains(key) {
                    out.push(key.clone());
                }
            }
            out
        }
        Vocabulary {
            face: merge(&self.face, &other.face),
            rotatable_bones: merge(&self.rotatable_bones, &other.rotatable_bones),
            movable_bones: merge(&self.movable_bones, &other.movable_bones),
        }
    }

    /// Whether `key` is a known facial morph.
    pub fn contains_face(&self, key: &str) -> bool {
        self.face.iter().any(|k| k == key)
    }

    /// Whether `key` is a known joint.
    pub fn contains_rotatable(&self, key: &str) -> bool {
        self.rotatable_bones.iter().any(|k| k == key)
    }

    /// Whether `key` is a known root/IK bone.
    pub fn contains_movable(&self, key: &str) -> bool {
        self.movable_bones.iter().any(|k| k == key)
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::verbose()
    }
}
