use serde::{de::IgnoredAny, Deserialize, Serialize};

use crate::domain::Message;

pub const STATUS_SUCCESS: &str = "success";

/// Wrapper every backend response uses. `T` is the payload carried in
/// `messages`; submit responses use [`StatusEnvelope`] so a stray payload is
/// never decoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T = Vec<Message>> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<T>,
}

pub type ListEnvelope = Envelope<Vec<Message>>;
pub type StatusEnvelope = Envelope<IgnoredAny>;

impl<T> Envelope<T> {
    pub fn success(messages: Option<T>) -> Self {
        Self {
            status: Some(STATUS_SUCCESS.to_string()),
            message: None,
            messages,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: Some("error".to_string()),
            message: Some(message.into()),
            messages: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some(STATUS_SUCCESS)
    }

    /// Splits the envelope into its payload or the text to show the user.
    /// An absent or blank server message falls back to `fallback`.
    pub fn into_payload(self, fallback: &str) -> Result<Option<T>, String> {
        if self.is_success() {
            return Ok(self.messages);
        }
        Err(self
            .message
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| fallback.to_string()))
    }
}

/// Request body for a post, encoded either as form fields or JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub username: String,
    pub message: String,
}
