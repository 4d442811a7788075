//! Read-back validation of chat JSONL files.

use super::chat::Role;
use crate::error::Result;
use serde_json::Value;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Characters per estimated token.
const CHARS_PER_TOKEN: usize = 4;

/// Why a line was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineProblem {
    /// Bytes that are not UTF-8.
    InvalidUtf8,
    /// Not parseable JSON.
    InvalidJson(String),
    /// No `messages` key.
    MissingMessages,
    /// `messages` is not a list.
    MessagesNotList,
    /// A message lacks `role` or `content`.
    MissingRoleOrContent {
        /// Position within `messages`.
        index: usize,
    },
    /// A role outside system/user/assistant.
    InvalidRole {
        /// Position within `messages`.
        index: usize,
        /// The role as written.
        role: String,
    },
}

impl fmt::Display for LineProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineProblem::InvalidUtf8 => write!(f, "not valid UTF-8"),
            LineProblem::InvalidJson(msg) => write!(f, "invalid JSON ({msg})"),
            LineProblem::MissingMessages => write!(f, "missing 'messages' key"),
            LineProblem::MessagesNotList => write!(f, "'messages' should be a list"),
            LineProblem::MissingRoleOrContent { index } => {
                write!(f, "message {index} missing 'role' or 'content'")
            }
            LineProblem::InvalidRole { index, role } => {
                write!(f, "message {index} has invalid role '{role}'")
            }
        }
    }
}

/// A rejected line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIssue {
    /// 1-based line number.
    pub line: usize,
    /// What was wrong.
    pub problem: LineProblem,
}

impl fmt::Display for LineIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.problem)
    }
}

/// Summary of a validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Lines that passed.
    pub valid: usize,
    /// Lines read, blank ones included.
    pub total: usize,
    /// Rejected lines in file order.
    pub issues: Vec<LineIssue>,
    /// Rough token count of valid lines.
    pub estimated_tokens: usize,
}

impl ValidationReport {
    /// Whether every line passed.
    pub fn all_valid(&self) -> bool {
        self.valid == self.total
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.valid, self.total)
    }
}

/// Check one line; `Ok` carries the summed content length.
fn check_line(line: &str) -> std::result::Result<usize, LineProblem> {
    let example: Value =
        serde_json::from_str(line.trim()).map_err(|e| LineProblem::InvalidJson(e.to_string()))?;
    let messages = example
        .get("messages")
        .ok_or(LineProblem::MissingMessages)?
        .as_array()
        .ok_or(LineProblem::MessagesNotList)?;

    let mut content_chars = 0;
    for (index, message) in messages.iter().enumerate() {
        let (Some(role), Some(content)) = (message.get("role"), message.get("content")) else {
            return Err(LineProblem::MissingRoleOrContent { index });
        };
        if role.as_str().and_then(Role::parse).is_none() {
            let role = role.as_str().map_or_else(|| role.to_string(), str::to_string);
            return Err(LineProblem::InvalidRole { index, role });
        }
        content_chars += match content {
            Value::String(s) => s.chars().count(),
            other => other.to_string().chars().count(),
        };
    }
    Ok(content_chars)
}

/// Validate JSONL read from `reader`.
///
/// Only read errors abort; a line that is not UTF-8 is reported like any
/// other bad line.
pub fn validate_lines(reader: impl BufRead) -> Result<ValidationReport> {
    let mut report = ValidationReport::default();
    for (i, bytes) in reader.split(b'\n').enumerate() {
        let mut bytes = bytes?;
        if bytes.last() == Some(&b'\r') {
            bytes.pop();
        }
        report.total += 1;
        let checked = String::from_utf8(bytes)
            .map_err(|_| LineProblem::InvalidUtf8)
            .and_then(|line| check_line(&line));
        match checked {
            Ok(chars) => {
                report.valid += 1;
                report.estimated_tokens += chars / CHARS_PER_TOKEN;
            }
            Err(problem) => {
                let issue = LineIssue { line: i + 1, problem };
                tracing::warn!(%issue, "invalid training example");
                report.issues.push(issue);
            }
        }
    }
    Ok(report)
}

/// Validate a JSONL file on disk.
pub fn validate_jsonl(path: &Path) -> Result<ValidationReport> {
    let report = validate_lines(BufReader::new(File::open(path)?))?;
    tracing::info!(
        file = %path.display(),
        valid = %report,
        estimated_tokens = report.estimated_tokens,
        "validated training examples"
    );
    if report.all_valid() {
        tracing::info!("all examples are valid");
    } else {
        tracing::warn!(invalid = report.issues.len(), "some examples have issues");
    }
    Ok(report)
}
