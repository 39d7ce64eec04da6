//! HTTP access to the board endpoint and envelope validation.

use std::{fmt, str::FromStr};

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use shared::{
    domain::Message,
    protocol::{ListEnvelope, StatusEnvelope, SubmitRequest},
};
use tracing::{debug, warn};
use url::Url;

use crate::error::{ConfigError, FetchError, SubmitError};

/// Marker left in the endpoint URL by the deployment template.
pub const DEPLOYMENT_PLACEHOLDER: &str = "YOUR_DEPLOYMENT_ID";
pub const LIST_FAILED_FALLBACK: &str = "メッセージの取得に失敗しました";
pub const SUBMIT_FAILED_FALLBACK: &str = "投稿に失敗しました";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint(Url);

impl Endpoint {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ConfigError::MissingEndpoint);
        }
        if raw.contains(DEPLOYMENT_PLACEHOLDER) {
            return Err(ConfigError::PlaceholderEndpoint(raw.to_string()));
        }

        let url = Url::parse(raw)?;
        match url.scheme() {
            "http" | "https" => Ok(Self(url)),
            other => Err(ConfigError::UnsupportedScheme(other.to_string())),
        }
    }

    pub fn url(&self) -> &Url {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for Endpoint {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body encoding for submit requests. Form fields avoid the CORS preflight
/// the script backend cannot answer; JSON suits backends that accept it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitEncoding {
    #[default]
    Form,
    Json,
}

impl FromStr for SubmitEncoding {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "form" | "urlencoded" => Ok(Self::Form),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::UnknownSubmitEncoding(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub endpoint: Endpoint,
    pub submit_encoding: SubmitEncoding,
}

impl StoreConfig {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            submit_encoding: SubmitEncoding::default(),
        }
    }

    pub fn with_submit_encoding(mut self, submit_encoding: SubmitEncoding) -> Self {
        self.submit_encoding = submit_encoding;
        self
    }
}

/// Read/write access to the remote board. Calls are issued exactly once;
/// nothing here retries.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Returns the messages in whatever order the backend produced them.
    async fn list_messages(&self) -> Result<Vec<Message>, FetchError>;
    /// Posts a message. Callers re-list to observe it.
    async fn submit_message(&self, username: &str, message: &str) -> Result<(), SubmitError>;
}

pub struct HttpMessageStore {
    http: Client,
    config: StoreConfig,
}

impl HttpMessageStore {
    pub fn new(config: StoreConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(http: Client, config: StoreConfig) -> Self {
        Self { http, config }
    }
}

/// Decodes an envelope from any response, whatever its HTTP status: the
/// backend reports failures in the body.
async fn read_envelope<T: DeserializeOwned>(response: Response) -> Result<T, String> {
    let http_status = response.status();
    let body = response
        .text()
        .await
        .map_err(|err| format!("failed to read response body: {err}"))?;
    serde_json::from_str(&body)
        .map_err(|err| format!("invalid response body (HTTP {http_status}): {err}"))
}

#[async_trait]
impl MessageStore for HttpMessageStore {
    async fn list_messages(&self) -> Result<Vec<Message>, FetchError> {
        let endpoint = &self.config.endpoint;
        debug!(%endpoint, "requesting message list");

        let response = self
            .http
            .get(endpoint.url().clone())
            .send()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;
        let envelope: ListEnvelope = read_envelope(response)
            .await
            .map_err(FetchError::Transport)?;

        match envelope.into_payload(LIST_FAILED_FALLBACK) {
            Ok(messages) => {
                let messages = messages.unwrap_or_default();
                debug!(count = messages.len(), "message list received");
                Ok(messages)
            }
            Err(reason) => {
                warn!(%endpoint, %reason, "backend rejected list request");
                Err(FetchError::Domain(reason))
            }
        }
    }

    async fn submit_message(&self, username: &str, message: &str) -> Result<(), SubmitError> {
        let endpoint = &self.config.endpoint;
        let body = SubmitRequest {
            username: username.to_string(),
            message: message.to_string(),
        };
        debug!(%endpoint, encoding = ?self.config.submit_encoding, "submitting message");

        let request = self.http.post(endpoint.url().clone());
        let request = match self.config.submit_encoding {
            SubmitEncoding::Form => request.form(&body),
            SubmitEncoding::Json => request.json(&body),
        };
        let response = request
            .send()
            .await
            .map_err(|err| SubmitError::Transport(err.to_string()))?;
        let envelope: StatusEnvelope = read_envelope(response)
            .await
            .map_err(SubmitError::Transport)?;

        envelope
            .into_payload(SUBMIT_FAILED_FALLBACK)
            .map(|_| ())
            .map_err(|reason| {
                warn!(%endpoint, %reason, "backend rejected submit request");
                SubmitError::Domain(reason)
            })
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
