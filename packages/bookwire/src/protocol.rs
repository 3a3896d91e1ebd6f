use std::fmt;

use serde::{Deserialize, Serialize};

/// Form payload sent as the first frame once the connection is open.
///
/// Field values travel as strings exactly as the user submitted them; the
/// server owns validation and answers bad input with a `message` notice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReadingForm {
    pub book: String,
    pub words: String,
    pub order: String,
}

/// Control frame asking the server to stop the current construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopRequest {
    pub stop: bool,
}

impl StopRequest {
    pub fn new() -> Self {
        Self { stop: true }
    }
}

impl Default for StopRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// Book/order values arrive as JSON numbers from the reference server but
/// are not guaranteed to stay that way; accept both shapes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Label {
    Number(serde_json::Number),
    Text(String),
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Number(n) => write!(f, "{n}"),
            Label::Text(s) => f.write_str(s),
        }
    }
}

/// One inbound frame. The wire carries no type tag; frames are classified
/// by which fields are present, and the variant order here is the fixed
/// priority when a frame could match more than one shape: session
/// handshake first, then construction updates, then status notices.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ServerEvent {
    /// Server-issued session identifier, first frame of a connection.
    Session { session_id: String },
    /// Incremental construction update; `constructed_text` is cumulative.
    Construction {
        constructed_text: String,
        book: Label,
        order: Label,
        finished_constructing: bool,
    },
    /// Human-readable status notice, e.g. a validation error.
    Notice { message: String },
}
