//! Locates the first balanced JSON object in free-form text.

/// Scanner state while walking an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Between tokens.
    Structural,
    /// Inside a string literal.
    InString,
    /// Right after a backslash inside a string literal.
    Escape,
}

/// Byte range of the first balanced `{...}` in `text`.
///
/// The scan starts at the first `{`. Braces inside string literals (with
/// backslash escapes honored) do not count toward depth. Returns `None` when
/// the text has no `{` or the first object never closes.
pub fn object_span(text: &str) -> Option<(usize, usize)> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut mode = Mode::Structural;

    // Every byte that matters is ASCII, so byte iteration never splits a
    // multibyte character at a reported boundary.
    for (offset, byte) in text.as_bytes()[start..].iter().enumerate() {
        mode = match (mode, byte) {
            (Mode::Escape, _) => Mode::InString,
            (Mode::InString, b'\\') => Mode::Escape,
            (Mode::InString, b'"') => Mode::Structural,
            (Mode::InString, _) => Mode::InString,
            (Mode::Structural, b'"') => Mode::InString,
            (Mode::Structural, b'{') => {
                depth += 1;
                Mode::Structural
            }
            (Mode::Structural, b'}') => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + 1;
                    return Some((start, end));
                }
                Mode::Structural
            }
            (Mode::Structural, _) => Mode::Structural,
        };
    }

    None
}

/// The first balanced `{...}` slice in `text`, if any.
pub fn find_json_object(text: &str) -> Option<&str> {
    object_span(text).map(|(start, end)| &text[start..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_object_between_noise() {
        let text = r#"noise {"a": 1} trailing"#;
        assert_eq!(find_json_object(text), Some(r#"{"a": 1}"#));
    }

    #[test]
    fn matches_outermost_brace() {
        let text = r#"{"rotatableBones": {"首": [0,0,0,1]}} and more }"#;
        assert_eq!(
            find_json_object(text),
            Some(r#"{"rotatableBones": {"首": [0,0,0,1]}}"#)
        );
    }

    #[test]
    fn ignores_braces_in_strings() {
        let text = r#"out: {"description": "arms {raised} high }", "face": {}} done"#;
        assert_eq!(
            find_json_object(text),
            Some(r#"{"description": "arms {raised} high }", "face": {}}"#)
        );
    }

    #[test]
    fn honors_escaped_quotes() {
        let text = r#"{"q": "say \"}\" now", "n": 1}"#;
        assert_eq!(find_json_object(text), Some(text));
    }

    #[test]
    fn escaped_backslash_ends_escape() {
        let text = r#"{"path": "C:\\", "n": {"m": 2}} tail"#;
        assert_eq!(
            find_json_object(text),
            Some(r#"{"path": "C:\\", "n": {"m": 2}}"#)
        );
    }

    #[test]
    fn no_brace_or_unbalanced() {
        assert_eq!(find_json_object("nothing here"), None);
        assert_eq!(find_json_object(r#"{"a": {"b": 1}"#), None);
        assert_eq!(find_json_object(""), None);
    }

    #[test]
    fn stray_close_before_open_is_ignored() {
        let text = "} then {\"x\": 1}";
        assert_eq!(object_span(text), Some((7, text.len())));
    }

    #[test]
    fn span_offsets_are_bytes() {
        let text = "ポーズ: {\"首\": 1}";
        let (start, end) = object_span(text).unwrap();
        assert_eq!(&text[start..end], "{\"首\": 1}");
    }
}
