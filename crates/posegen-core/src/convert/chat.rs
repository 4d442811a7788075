//! Chat-message training examples.

use crate::dataset::RawPose;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Default system message of every converted example.
pub const DEFAULT_SYSTEM_MESSAGE: &str = "You are an expert in MMD (MikuMikuDance) pose generation. \
Given a description of a pose, you generate the corresponding bone rotations, positions, and \
facial morphs in JSON format.";

/// Default user message; `{description}` is replaced by the record's description.
pub const DEFAULT_USER_TEMPLATE: &str = "Generate MMD pose data for: {description}";

/// Placeholder substituted in [`ChatFormat::user_template`].
pub const DESCRIPTION_PLACEHOLDER: &str = "{description}";

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Task instructions.
    System,
    /// The request.
    User,
    /// The expected answer.
    Assistant,
}

impl Role {
    /// Parse a role tag.
    pub fn parse(tag: &str) -> Option<Role> {
        match tag {
            "system" => Some(Role::System),
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        })
    }
}

/// One chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Speaker.
    pub role: Role,
    /// Text.
    pub content: String,
}

impl ChatMessage {
    /// Build a message.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// One JSONL line: system, user and assistant messages in that order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatExample {
    /// The conversation.
    pub messages: Vec<ChatMessage>,
}

/// Fixed texts of the chat format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatFormat {
    /// System message.
    pub system_message: String,
    /// User message template containing `{description}`.
    pub user_template: String,
}

impl Default for ChatFormat {
    fn default() -> Self {
        Self {
            system_message: DEFAULT_SYSTEM_MESSAGE.to_string(),
            user_template: DEFAULT_USER_TEMPLATE.to_string(),
        }
    }
}

impl ChatFormat {
    /// Load from a JSON file; missing fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// User message for a description.
    pub fn user_message(&self, description: &str) -> String {
        self.user_template.replace(DESCRIPTION_PLACEHOLDER, description)
    }

    /// Chat example for a pose file. The assistant content is the pose
    /// without its description, serialized as it appears in the source file.
    pub fn example(&self, pose: &RawPose) -> Result<ChatExample> {
        let assistant = serde_json::to_string(&pose.pose_value())?;
        Ok(ChatExample {
            messages: vec![
                ChatMessage::new(Role::System, self.system_message.as_str()),
                ChatMessage::new(Role::User, self.user_message(&pose.description)),
                ChatMessage::new(Role::Assistant, assistant),
            ],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    fn sample(source: serde_json::Value) -> RawPose {
        RawPose {
            path: PathBuf::from("x.json"),
            description: source["description"].as_str().unwrap().to_string(),
            source,
        }
    }

    #[test]
    fn strips_description_from_assistant_content() {
        let sample = sample(json!({
            "description": "X",
            "face": {"a": 0},
            "rotatableBones": {},
            "movableBones": {}
        }));
        let example = ChatFormat::default().example(&sample).unwrap();
        let expected =
            serde_json::to_string(&json!({"face": {"a": 0}, "rotatableBones": {}, "movableBones": {}}))
                .unwrap();
        assert_eq!(example.messages[2].content, expected);
        assert_eq!(example.messages[1].content, "Generate MMD pose data for: X");
        assert_eq!(example.messages[0].content, DEFAULT_SYSTEM_MESSAGE);
    }

    #[test]
    fn roles_in_fixed_order() {
        let sample = sample(json!({"description": "wave", "face": {"あ": 1}}));
        let example = ChatFormat::default().example(&sample).unwrap();
        let roles: Vec<Role> = example.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
    }

    #[test]
    fn non_ascii_is_written_verbatim() {
        let sample = sample(json!({"description": "首を傾げる", "rotatableBones": {"首": [0, 0, 0.1, 0.99]}}));
        let example = ChatFormat::default().example(&sample).unwrap();
        let line = serde_json::to_string(&example).unwrap();
        assert!(line.contains("首を傾げる"));
        assert!(line.contains("首"));
        assert!(!line.contains("\\u"));
    }

    #[test]
    fn custom_format_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.json");
        std::fs::write(&path, r#"{"user_template": "Pose: {description}!"}"#).unwrap();
        let format = ChatFormat::from_file(&path).unwrap();
        assert_eq!(format.system_message, DEFAULT_SYSTEM_MESSAGE);
        assert_eq!(format.user_message("jump"), "Pose: jump!");
    }

    #[test]
    fn role_tags() {
        assert_eq!(Role::parse("assistant"), Some(Role::Assistant));
        assert_eq!(Role::parse("tool"), None);
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
    }
}
