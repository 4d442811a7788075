//! Recovering a pose object from generated text.
//!
//! Generated text rarely holds only JSON: models echo instructions, add
//! commentary, or keep going after the object closes. The extractor takes the
//! first balanced object (see [`find_json_object`]), parses it, and rounds
//! every float leaf to [`DEFAULT_DECIMALS`] places.
//!
//! # Example
//!
//! ```
//! use posegen_core::extract::extract_json;
//! use serde_json::json;
//!
//! let value = extract_json(r#"Sure! {"face": {"あ": 0.4567}} Hope this helps."#).unwrap();
//! assert_eq!(value, json!({"face": {"あ": 0.46}}));
//! ```

mod round;
mod scanner;

pub use round::{round_floats, round_to};
pub use scanner::{find_json_object, object_span};

use crate::error::{PosegenError, Result};
use serde_json::Value;

/// Decimal places kept by [`extract_json`].
pub const DEFAULT_DECIMALS: u32 = 2;

/// Parse the first balanced JSON object in `text` without rounding.
pub fn parse_first_object(text: &str) -> Result<Value> {
    let slice = find_json_object(text).ok_or_else(|| PosegenError::NoJsonFound {
        raw: text.to_string(),
    })?;
    serde_json::from_str(slice).map_err(|e| PosegenError::JsonParse {
        message: e.to_string(),
        slice: slice.to_string(),
    })
}

/// Recover the first balanced JSON object in `text`, rounded to
/// [`DEFAULT_DECIMALS`] places.
pub fn extract_json(text: &str) -> Result<Value> {
    extract_json_with(text, DEFAULT_DECIMALS)
}

/// Like [`extract_json`] with a caller-chosen precision.
pub fn extract_json_with(text: &str, decimals: u32) -> Result<Value> {
    let value = parse_first_object(text)?;
    Ok(round_floats(&value, decimals))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn discards_surrounding_noise() {
        let value = extract_json(r#"noise {"a": 1.005, "b": {"c": 2.0}} trailing"#).unwrap();
        assert_eq!(value, json!({"a": 1.0, "b": {"c": 2.0}}));
    }

    #[test]
    fn no_object_keeps_raw_text() {
        match extract_json("nothing here") {
            Err(PosegenError::NoJsonFound { raw }) => assert_eq!(raw, "nothing here"),
            other => panic!("expected NoJsonFound, got {other:?}"),
        }
    }

    #[test]
    fn unbalanced_object_is_not_found() {
        let err = extract_json(r#"{"face": {"あ": 0.5}"#).unwrap_err();
        assert!(matches!(err, PosegenError::NoJsonFound { .. }));
    }

    #[test]
    fn malformed_object_keeps_slice() {
        match extract_json("{unquoted: 1}") {
            Err(PosegenError::JsonParse { slice, message }) => {
                assert_eq!(slice, "{unquoted: 1}");
                assert!(!message.is_empty());
            }
            other => panic!("expected JsonParse, got {other:?}"),
        }
    }

    #[test]
    fn returns_outer_object() {
        let value = extract_json(r#"{"rotatableBones": {"首": [0,0,0,1]}}"#).unwrap();
        assert_eq!(value, json!({"rotatableBones": {"首": [0, 0, 0, 1]}}));
    }

    #[test]
    fn braces_in_description_do_not_confuse() {
        let text = r#"Result: {"description": "hands form a } shape", "face": {"お": 0.333}}"#;
        let value = extract_json(text).unwrap();
        assert_eq!(value["description"], "hands form a } shape");
        assert_eq!(value["face"]["お"], json!(0.33));
    }

    #[test]
    fn custom_precision() {
        let value = extract_json_with(r#"{"x": 0.98765}"#, 3).unwrap();
        assert_eq!(value, json!({"x": 0.988}));
    }

    #[test]
    fn extraction_is_idempotent_on_its_output() {
        let first = extract_json(r#"text {"w": 0.99999, "v": [-0.126, 3]} text"#).unwrap();
        let second = extract_json(&first.to_string()).unwrap();
        assert_eq!(first, second);
    }
}
