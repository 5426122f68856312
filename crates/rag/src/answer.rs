//! Answer shapes returned by the query endpoints
//!
//! The service answers either with a plain string or with a list of
//! `{section_num, content}` fragments. Anything else is kept verbatim as
//! [`Answer::Unrecognized`] so that a malformed payload never becomes an error.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reply text used when the `answer` field has an unknown shape
pub const UNRECOGNIZED_ANSWER: &str = "Received an unrecognized response format.";

/// Placeholder for a section fragment without content
pub const MISSING_SECTION_CONTENT: &str = "No content available";

/// Section number as sent by the service (usually an integer, sometimes a string)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionNumber(pub Value);

impl From<i64> for SectionNumber {
    fn from(n: i64) -> Self {
        Self(Value::from(n))
    }
}

impl From<&str> for SectionNumber {
    fn from(s: &str) -> Self {
        Self(Value::from(s))
    }
}

impl std::fmt::Display for SectionNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Value::String(s) => write!(f, "{}", s),
            Value::Null => write!(f, "?"),
            other => write!(f, "{}", other),
        }
    }
}

/// Structured answer unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionFragment {
    #[serde(default)]
    pub section_num: SectionNumber,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
}

impl SectionFragment {
    pub fn new(section_num: impl Into<SectionNumber>, content: Option<&str>) -> Self {
        Self {
            section_num: section_num.into(),
            content: content.map(Value::from),
        }
    }

    /// Render as `Section <n>: <content>`; empty content counts as missing.
    /// Non-string content is shown as its JSON text.
    pub fn render(&self) -> String {
        let content = match &self.content {
            None | Some(Value::Null) => MISSING_SECTION_CONTENT.to_string(),
            Some(Value::String(text)) if text.is_empty() => MISSING_SECTION_CONTENT.to_string(),
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
        };
        format!("Section {}: {}", self.section_num, content)
    }
}

/// The `answer` field of a query response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Sections(Vec<SectionFragment>),
    Text(String),
    Unrecognized(Value),
}

impl Default for Answer {
    fn default() -> Self {
        Answer::Unrecognized(Value::Null)
    }
}

impl Answer {
    /// Classify an arbitrary JSON value
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or(Answer::Unrecognized(value))
    }

    /// Extract and classify the `answer` field of a response body.
    /// Bodies that are not objects, or lack the field, are unrecognized.
    pub fn from_body(body: &Value) -> Self {
        body.get("answer")
            .cloned()
            .map(Self::from_value)
            .unwrap_or_default()
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Answer::Unrecognized(_))
    }

    /// Display text for the assistant message
    pub fn render(&self) -> String {
        match self {
            Answer::Sections(sections) => sections
                .iter()
                .map(SectionFragment::render)
                .collect::<Vec<_>>()
                .join("\n"),
            Answer::Text(text) => text.clone(),
            Answer::Unrecognized(_) => UNRECOGNIZED_ANSWER.to_string(),
        }
    }
}
