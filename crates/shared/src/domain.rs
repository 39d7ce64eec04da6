use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ValidationError;

/// Backend-assigned identifier. The spreadsheet backend emits either a row
/// number or a string key depending on how the sheet was populated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageId {
    Number(i64),
    Text(String),
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

/// One row of the sheet. Cells are decoded leniently: numbers, booleans and
/// blanks come through as text so a single odd cell cannot hide the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default = "MessageId::blank", deserialize_with = "id_cell")]
    pub id: MessageId,
    #[serde(default, deserialize_with = "text_cell")]
    pub username: String,
    #[serde(default, deserialize_with = "text_cell")]
    pub message: String,
    /// Kept verbatim; see [`Message::posted_at`].
    #[serde(default, deserialize_with = "text_cell")]
    pub timestamp: String,
}

/// Scalar values a spreadsheet cell can hold once exported as JSON.
#[derive(Deserialize)]
#[serde(untagged)]
enum SheetCell {
    Integer(i64),
    Float(f64),
    Flag(bool),
    Text(String),
}

impl SheetCell {
    fn into_text(self) -> String {
        match self {
            Self::Integer(value) => value.to_string(),
            Self::Float(value) => value.to_string(),
            Self::Flag(value) => value.to_string(),
            Self::Text(value) => value,
        }
    }
}

fn text_cell<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<SheetCell>::deserialize(deserializer)?
        .map(SheetCell::into_text)
        .unwrap_or_default())
}

fn id_cell<'de, D: Deserializer<'de>>(deserializer: D) -> Result<MessageId, D::Error> {
    Ok(match Option::<SheetCell>::deserialize(deserializer)? {
        Some(SheetCell::Integer(value)) => MessageId::Number(value),
        Some(other) => MessageId::Text(other.into_text()),
        None => MessageId::blank(),
    })
}

impl MessageId {
    /// Stand-in for an empty id cell.
    pub fn blank() -> Self {
        Self::Text(String::new())
    }
}

impl Message {
    /// Parses `timestamp`. Accepts RFC 3339 and, as the sheet sometimes
    /// stores, a bare `YYYY-MM-DD HH:MM:SS` which is taken as UTC.
    pub fn posted_at(&self) -> Option<DateTime<FixedOffset>> {
        let raw = self.timestamp.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed);
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
            .ok()
            .map(|naive| naive.and_utc().fixed_offset())
    }
}

/// A post waiting to be sent. Only constructible with non-blank fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    username: String,
    message: String,
}

impl Submission {
    pub fn new(raw_username: &str, raw_message: &str) -> Result<Self, ValidationError> {
        let username = raw_username.trim();
        let message = raw_message.trim();
        if username.is_empty() {
            return Err(ValidationError::MissingUsername);
        }
        if message.is_empty() {
            return Err(ValidationError::MissingMessage);
        }
        Ok(Self {
            username: username.to_string(),
            message: message.to_string(),
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
