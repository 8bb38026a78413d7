//! Finding types representing review results from the model.
//!
//! A finding arrives as one loosely-typed JSON object. It only becomes a
//! [`ReviewFinding`] after [`ReviewFinding::from_value`] has checked every
//! required field; nothing downstream looks at raw JSON.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Severity level of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational suggestion.
    Info,
    /// Potential issue that should be addressed.
    Warning,
    /// Critical issue that must be fixed.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            _ => Err(format!("unknown severity: {s}")),
        }
    }
}

/// A proposed fix attached to a finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    /// What the replacement does.
    pub description: String,
    /// Replacement code, verbatim.
    #[serde(rename = "code")]
    pub replacement_code: String,
}

/// A validated review comment for one line of one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewFinding {
    /// Workspace-relative path of the file the finding targets.
    pub file_path: String,
    /// 1-based line number.
    pub line: u32,
    /// Code the model expects to find on that line. May be empty.
    #[serde(rename = "code")]
    pub snippet: String,
    pub message: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<Suggestion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub praise: Option<String>,
}

/// Why a JSON object was rejected as a finding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FindingError {
    #[error("finding is not a JSON object")]
    NotAnObject,

    #[error("finding is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("finding field `{field}` has the wrong type (expected {expected})")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("finding line must be a positive integer, got {0}")]
    InvalidLine(String),

    #[error("finding severity must be error, warning or info, got '{0}'")]
    InvalidSeverity(String),
}

impl ReviewFinding {
    /// Validate a parsed JSON value against the finding schema.
    ///
    /// `filePath`, `line`, `message` and `severity` are mandatory; a
    /// failure on any of them rejects the whole object. Optional fields
    /// degrade instead: a non-string `code` becomes empty, and malformed
    /// `suggestions` entries are skipped one by one.
    pub fn from_value(value: &Value) -> Result<Self, FindingError> {
        let obj = value.as_object().ok_or(FindingError::NotAnObject)?;

        let file_path = required_str(obj, "filePath")?;
        let line = required_line(obj)?;
        let message = required_str(obj, "message")?;
        let severity_raw = required_str(obj, "severity")?;
        let severity = severity_raw
            .parse::<Severity>()
            .map_err(|_| FindingError::InvalidSeverity(severity_raw.clone()))?;

        let snippet = obj
            .get("code")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let suggestions = obj
            .get("suggestions")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(parse_suggestion).collect())
            .unwrap_or_default();

        let praise = obj
            .get("praise")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);

        Ok(Self {
            file_path,
            line,
            snippet,
            message,
            severity,
            suggestions,
            praise,
        })
    }

    /// The file path with any leading `./` removed, used as the
    /// diagnostics key.
    pub fn normalized_path(&self) -> &str {
        self.file_path.trim_start_matches("./")
    }
}

fn required_str(obj: &Map<String, Value>, field: &'static str) -> Result<String, FindingError> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(FindingError::MissingField(field)),
        Some(Value::String(s)) if s.trim().is_empty() => Err(FindingError::MissingField(field)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(FindingError::WrongType {
            field,
            expected: "string",
        }),
    }
}

fn required_line(obj: &Map<String, Value>) -> Result<u32, FindingError> {
    let value = match obj.get("line") {
        None | Some(Value::Null) => return Err(FindingError::MissingField("line")),
        Some(v) => v,
    };
    let number = value.as_u64().ok_or_else(|| match value {
        Value::Number(n) => FindingError::InvalidLine(n.to_string()),
        _ => FindingError::WrongType {
            field: "line",
            expected: "integer",
        },
    })?;
    if number == 0 {
        return Err(FindingError::InvalidLine("0".to_string()));
    }
    u32::try_from(number).map_err(|_| FindingError::InvalidLine(number.to_string()))
}

fn parse_suggestion(value: &Value) -> Option<Suggestion> {
    let obj = value.as_object()?;
    let description = obj
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let code = obj.get("code").and_then(Value::as_str).unwrap_or_default();
    if description.is_empty() && code.is_empty() {
        return None;
    }
    Some(Suggestion {
        description: description.to_string(),
        replacement_code: code.to_string(),
    })
}

/// Summary statistics for a set of findings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub errors: usize,
    pub warnings: usize,
    pub info: usize,
}

impl Summary {
    /// Tally severities.
    pub fn from_severities(severities: impl IntoIterator<Item = Severity>) -> Self {
        let mut s = Summary::default();
        for severity in severities {
            s.total += 1;
            match severity {
                Severity::Error => s.errors += 1,
                Severity::Warning => s.warnings += 1,
                Severity::Info => s.info += 1,
            }
        }
        s
    }
}
