//! The pose record and its validation.

use super::{BoneLayout, Quat, Vec3};
use crate::error::{PosegenError, Result};
use crate::extract::round_to;
use crate::vocab::Vocabulary;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// One pose sample: a description plus facial weights, joint rotations and
/// root/IK offsets.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PoseRecord {
    /// Natural-language pose description.
    pub description: String,
    /// Facial morph weights.
    #[serde(default)]
    pub face: BTreeMap<String, f64>,
    /// Joint rotations.
    #[serde(default, rename = "rotatableBones")]
    pub rotatable_bones: BTreeMap<String, Quat>,
    /// Root/IK offsets.
    #[serde(default, rename = "movableBones")]
    pub movable_bones: BTreeMap<String, Vec3>,
}

impl PoseRecord {
    /// Build a record from parsed JSON.
    ///
    /// `origin` names the source in the error when the value is not a JSON
    /// object or lacks `description`.
    pub fn from_value(value: &Value, origin: &Path) -> Result<Self> {
        if !value.is_object() {
            return Err(PosegenError::malformed(origin, "top-level value is not an object"));
        }
        serde_json::from_value(value.clone())
            .map_err(|e| PosegenError::malformed(origin, e.to_string()))
    }

    /// Build a record from a generated object, which usually carries only the
    /// three mappings. A missing description is filled from `description`.
    pub fn from_generated(value: &Value, description: &str) -> Result<Self> {
        let Some(object) = value.as_object() else {
            return Err(PosegenError::JsonParse {
                message: "generated JSON is not an object".to_string(),
                slice: value.to_string(),
            });
        };
        let mut object = object.clone();
        if !matches!(object.get("description"), Some(Value::String(_))) {
            object.insert("description".to_string(), Value::String(description.to_string()));
        }
        serde_json::from_value(Value::Object(object)).map_err(|e| PosegenError::JsonParse {
            message: e.to_string(),
            slice: value.to_string(),
        })
    }

    /// Whether all three mappings are empty.
    pub fn is_empty_pose(&self) -> bool {
        self.face.is_empty() && self.rotatable_bones.is_empty() && self.movable_bones.is_empty()
    }

    /// Usable as training data: non-empty description and some pose data.
    pub fn is_usable(&self) -> bool {
        !self.description.trim().is_empty() && !self.is_empty_pose()
    }

    /// Copy with every number rounded to `decimals` places.
    pub fn rounded(&self, decimals: u32) -> Self {
        let r = |v: f64| round_to(v, decimals);
        Self {
            description: self.description.clone(),
            face: self.face.iter().map(|(k, v)| (k.clone(), r(*v))).collect(),
            rotatable_bones: self
                .rotatable_bones
                .iter()
                .map(|(k, q)| (k.clone(), q.map(r)))
                .collect(),
            movable_bones: self
                .movable_bones
                .iter()
                .map(|(k, p)| (k.clone(), p.map(r)))
                .collect(),
        }
    }

    /// Render as JSON with rotations/offsets in the given layout.
    pub fn to_value(&self, layout: BoneLayout) -> Value {
        let mut object = Map::new();
        object.insert("description".into(), Value::String(self.description.clone()));
        object.insert("face".into(), self.face_value());
        object.insert(
            "rotatableBones".into(),
            Value::Object(
                self.rotatable_bones
                    .iter()
                    .map(|(k, q)| (k.clone(), q.to_value(layout)))
                    .collect(),
            ),
        );
        object.insert(
            "movableBones".into(),
            Value::Object(
                self.movable_bones
                    .iter()
                    .map(|(k, p)| (k.clone(), p.to_value(layout)))
                    .collect(),
            ),
        );
        Value::Object(object)
    }

    fn face_value(&self) -> Value {
        Value::Object(
            self.face
                .iter()
                .map(|(k, v)| (k.clone(), Value::from(*v)))
                .collect(),
        )
    }

    /// Check the record against a vocabulary.
    pub fn validate(&self, vocab: &Vocabulary, rules: &ValidationRules) -> Vec<RecordIssue> {
        let mut issues = Vec::new();

        if self.description.trim().is_empty() {
            issues.push(RecordIssue::EmptyDescription);
        }
        if self.is_empty_pose() {
            issues.push(RecordIssue::NoPoseData);
        }

        for (key, &weight) in &self.face {
            if !vocab.contains_face(key) {
                issues.push(RecordIssue::UnknownFace(key.clone()));
            }
            if !weight.is_finite() {
                issues.push(RecordIssue::NonFinite(key.clone()));
            } else if weight < rules.face_min || weight > rules.face_max {
                issues.push(RecordIssue::FaceWeightOutOfRange {
                    key: key.clone(),
                    weight,
                });
            }
        }

        for (key, quat) in &self.rotatable_bones {
            if !vocab.contains_rotatable(key) {
                issues.push(RecordIssue::UnknownRotatable(key.clone()));
            }
            if !quat.is_finite() {
                issues.push(RecordIssue::NonFinite(key.clone()));
            } else if !quat.is_unit(rules.quaternion_tolerance) {
                issues.push(RecordIssue::NonUnitQuaternion {
                    bone: key.clone(),
                    norm: quat.norm(),
                });
            }
        }

        for (key, offset) in &self.movable_bones {
            if !vocab.contains_movable(key) {
                issues.push(RecordIssue::UnknownMovable(key.clone()));
            }
            if !offset.is_finite() {
                issues.push(RecordIssue::NonFinite(key.clone()));
            }
        }

        issues
    }
}

/// Thresholds used by [`PoseRecord::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidationRules {
    /// Allowed deviation of a quaternion norm from one.
    pub quaternion_tolerance: f64,
    /// Lowest accepted facial weight.
    pub face_min: f64,
    /// Highest accepted facial weight.
    pub face_max: f64,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            quaternion_tolerance: 1e-2,
            face_min: -1.0,
            face_max: 1.0,
        }
    }
}

/// A problem found in a pose record.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordIssue {
    /// Description is empty or whitespace.
    EmptyDescription,
    /// All three mappings are empty.
    NoPoseData,
    /// Facial key outside the vocabulary.
    UnknownFace(String),
    /// Joint key outside the vocabulary.
    UnknownRotatable(String),
    /// Root/IK key outside the vocabulary.
    UnknownMovable(String),
    /// Quaternion norm too far from one.
    NonUnitQuaternion {
        /// Joint name.
        bone: String,
        /// Measured norm.
        norm: f64,
    },
    /// Facial weight outside the accepted range.
    FaceWeightOutOfRange {
        /// Morph name.
        key: String,
        /// Offending weight.
        weight: f64,
    },
    /// NaN or infinite component.
    NonFinite(String),
}

impl fmt::Display for RecordIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordIssue::EmptyDescription => write!(f, "description is empty"),
            RecordIssue::NoPoseData => write!(f, "face, rotatableBones and movableBones are all empty"),
            RecordIssue::UnknownFace(k) => write!(f, "unknown facial morph '{k}'"),
            RecordIssue::UnknownRotatable(k) => write!(f, "unknown joint '{k}'"),
            RecordIssue::UnknownMovable(k) => write!(f, "unknown root/IK bone '{k}'"),
            RecordIssue::NonUnitQuaternion { bone, norm } => {
                write!(f, "rotation of '{bone}' is not unit length (norm {norm:.4})")
            }
            RecordIssue::FaceWeightOutOfRange { key, weight } => {
                write!(f, "facial weight '{key}' = {weight} is out of range")
            }
            RecordIssue::NonFinite(k) => write!(f, "'{k}' has a non-finite component"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    fn origin() -> PathBuf {
        PathBuf::from("sample.json")
    }

    fn sample() -> Value {
        json!({
            "description": "Standing with both arms extended forward",
            "face": {"お": 0.6, "まばたき": 0},
            "rotatableBones": {
                "首": {"x": 0, "y": 0, "z": 0, "w": 1},
                "左腕": [0.38, 0.2, 0.15, 0.89]
            },
            "movableBones": {"センター": [-3.35, 7.44, 0.4]}
        })
    }

    #[test]
    fn parses_mixed_layouts() {
        let record = PoseRecord::from_value(&sample(), &origin()).unwrap();
        assert_eq!(record.face["お"], 0.6);
        assert_eq!(record.rotatable_bones["首"], Quat::IDENTITY);
        assert_eq!(record.rotatable_bones["左腕"], Quat::new(0.38, 0.2, 0.15, 0.89));
        assert_eq!(record.movable_bones["センター"], Vec3::new(-3.35, 7.44, 0.4));
        assert!(record.is_usable());
    }

    #[test]
    fn mappings_default_to_empty() {
        let record = PoseRecord::from_value(&json!({"description": "idle"}), &origin()).unwrap();
        assert!(record.is_empty_pose());
        assert!(!record.is_usable());
    }

    #[test]
    fn missing_description_is_malformed() {
        let err = PoseRecord::from_value(&json!({"face": {}}), &origin()).unwrap_err();
        match err {
            PosegenError::MalformedRecord { path, reason } => {
                assert_eq!(path, origin());
                assert!(reason.contains("description"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_object_is_malformed() {
        let err = PoseRecord::from_value(&json!([1, 2]), &origin()).unwrap_err();
        assert!(matches!(err, PosegenError::MalformedRecord { .. }));
    }

    #[test]
    fn generated_value_gets_description() {
        let value = json!({"face": {"にこり": 1.0}, "rotatableBones": {}, "movableBones": {}});
        let record = PoseRecord::from_generated(&value, "smile").unwrap();
        assert_eq!(record.description, "smile");
        assert_eq!(record.face["にこり"], 1.0);
    }

    #[test]
    fn generated_value_with_bad_shape_is_parse_error() {
        let value = json!({"rotatableBones": {"首": [0, 0, 1]}});
        let err = PoseRecord::from_generated(&value, "nod").unwrap_err();
        assert!(matches!(err, PosegenError::JsonParse { .. }));
    }

    #[test]
    fn layout_round_trip_preserves_values() {
        let record = PoseRecord::from_value(&sample(), &origin()).unwrap();
        for layout in [BoneLayout::Verbose, BoneLayout::Compact] {
            let back = PoseRecord::from_value(&record.to_value(layout), &origin()).unwrap();
            assert_eq!(back, record);
        }
    }

    #[test]
    fn compact_layout_uses_sequences() {
        let record = PoseRecord::from_value(&sample(), &origin()).unwrap();
        let value = record.to_value(BoneLayout::Compact);
        assert_eq!(value["rotatableBones"]["首"], json!([0.0, 0.0, 0.0, 1.0]));
        assert_eq!(value["movableBones"]["センター"], json!([-3.35, 7.44, 0.4]));
    }

    #[test]
    fn rounding_is_idempotent() {
        let mut record = PoseRecord::from_value(&sample(), &origin()).unwrap();
        record.face.insert("笑い".into(), 0.123456);
        let once = record.rounded(2);
        assert_eq!(once.face["笑い"], 0.12);
        assert_eq!(once.rounded(2), once);
    }

    #[test]
    fn clean_record_has_no_issues() {
        let record = PoseRecord::from_value(&sample(), &origin()).unwrap();
        let issues = record.validate(&Vocabulary::verbose(), &ValidationRules::default());
        assert!(issues.is_empty(), "{issues:?}");
    }

    #[test]
    fn validation_flags_each_problem() {
        let value = json!({
            "description": " ",
            "face": {"wink": 0.5, "にこり": 1.5},
            "rotatableBones": {"首": [0.5, 0.5, 0.5, 0.9], "tail": [0, 0, 0, 1]},
            "movableBones": {"hover": [0, 1, 0]}
        });
        let record = PoseRecord::from_value(&value, &origin()).unwrap();
        let issues = record.validate(&Vocabulary::verbose(), &ValidationRules::default());

        assert!(issues.contains(&RecordIssue::EmptyDescription));
        assert!(issues.contains(&RecordIssue::UnknownFace("wink".into())));
        assert!(issues.contains(&RecordIssue::UnknownRotatable("tail".into())));
        assert!(issues.contains(&RecordIssue::UnknownMovable("hover".into())));
        assert!(issues.contains(&RecordIssue::FaceWeightOutOfRange {
            key: "にこり".into(),
            weight: 1.5
        }));
        assert!(issues
            .iter()
            .any(|i| matches!(i, RecordIssue::NonUnitQuaternion { bone, .. } if bone == "首")));
        assert!(!issues.contains(&RecordIssue::NoPoseData));
    }

    #[test]
    fn finger_joints_need_compact_vocabulary() {
        let value = json!({
            "description": "point",
            "rotatableBones": {"右人指１": [0, 0, 0, 1]}
        });
        let record = PoseRecord::from_value(&value, &origin()).unwrap();
        let rules = ValidationRules::default();
        assert_eq!(record.validate(&Vocabulary::verbose(), &rules).len(), 1);
        assert!(record.validate(&Vocabulary::compact(), &rules).is_empty());
    }
}
