use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub front: String,
    pub back: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GenerationFailure {
    #[serde(rename = "parse failure")]
    ParseFailure,
    #[serde(rename = "incomplete response")]
    IncompleteResponse,
}

impl fmt::Display for GenerationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationFailure::ParseFailure => write!(f, "parse failure"),
            GenerationFailure::IncompleteResponse => write!(f, "incomplete response"),
        }
    }
}

/// Stands in for a chunk's cards when that chunk could not be turned into any.
/// Serializes as `{"error": "<reason>"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GenerationError {
    pub error: GenerationFailure,
}

impl GenerationError {
    pub fn new(error: GenerationFailure) -> Self {
        Self { error }
    }
}

/// One element of the generator's output.
///
/// Cards are kept as the raw JSON the completion service produced; shape
/// checks happen at publish time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GeneratedEntry {
    Card(Value),
    Failed(GenerationError),
}

impl GeneratedEntry {
    /// `Some` only for cards carrying both `front` and `back`.
    pub fn as_flashcard(&self) -> Option<Flashcard> {
        let GeneratedEntry::Card(Value::Object(fields)) = self else {
            return None;
        };

        let front = fields.get("front")?;
        let back = fields.get("back")?;

        Some(Flashcard {
            front: field_text(front),
            back: field_text(back),
        })
    }
}

fn field_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
