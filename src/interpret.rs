//! Interpreting model replies.
//!
//! The reasoning contract asks the model for a JSON object with an `answer`
//! field. Models often wrap that object in a Markdown code fence, and some
//! replies are not JSON at all. Both cases are handled here without ever
//! failing: anything that does not decode to an object is kept as raw text.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

/// The structured side of one reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedReply {
    /// Decoded object with a usable `answer` field.
    Answered {
        answer: String,
        object: Map<String, Value>,
    },
    /// Decoded object whose `answer` is missing or null.
    Unanswered(Map<String, Value>),
    /// Reply that did not decode to a JSON object.
    Unstructured(String),
}

impl ParsedReply {
    pub fn answer(&self) -> Option<&str> {
        match self {
            Self::Answered { answer, .. } => Some(answer),
            _ => None,
        }
    }

    pub fn is_structured(&self) -> bool {
        !matches!(self, Self::Unstructured(_))
    }

    /// JSON form used by the structured log view.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Answered { object, .. } | Self::Unanswered(object) => Value::Object(object.clone()),
            Self::Unstructured(text) => {
                let mut map = Map::new();
                map.insert("raw".to_string(), Value::String(text.clone()));
                Value::Object(map)
            }
        }
    }
}

impl Serialize for ParsedReply {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Answered { object, .. } | Self::Unanswered(object) => object.serialize(serializer),
            Self::Unstructured(text) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("raw", text)?;
                map.end()
            }
        }
    }
}

/// Result of interpreting one reply.
#[derive(Debug, Clone, PartialEq)]
pub struct Interpretation {
    /// Reply text after fence stripping. This is what the raw log stores.
    pub text: String,
    pub parsed: ParsedReply,
}

impl Interpretation {
    /// What the chat shows: the answer when there is one, else the text.
    pub fn display_answer(&self) -> &str {
        self.parsed.answer().unwrap_or(&self.text)
    }
}

/// Remove a single surrounding Markdown code fence.
///
/// Only handles one fence whose first line may carry a language tag such
/// as `json`. Backticks are stripped from both ends, then everything up to
/// and including the first newline is dropped. Nested fences are not
/// special-cased.
pub fn strip_code_fence(raw: &str) -> String {
    let trimmed = raw.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }

    let inner = trimmed.trim_matches('`');
    match inner.split_once('\n') {
        Some((_tag, body)) => body.trim().to_string(),
        None => inner.to_string(),
    }
}

/// Strip fences, decode, and pull out the answer.
pub fn interpret(raw: &str) -> Interpretation {
    let text = strip_code_fence(raw);

    let parsed = match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(object)) => match object.get("answer") {
            None | Some(Value::Null) => ParsedReply::Unanswered(object),
            Some(Value::String(answer)) => ParsedReply::Answered {
                answer: answer.clone(),
                object,
            },
            Some(other) => ParsedReply::Answered {
                answer: other.to_string(),
                object,
            },
        },
        _ => ParsedReply::Unstructured(text.clone()),
    };

    Interpretation { text, parsed }
}
