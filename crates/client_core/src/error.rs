use thiserror::Error;

/// Failure of a list request. Both variants carry text fit for display.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("{0}")]
    Transport(String),
    #[error("{0}")]
    Domain(String),
}

impl FetchError {
    pub fn message(&self) -> &str {
        match self {
            Self::Transport(message) | Self::Domain(message) => message,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Failure of a submit request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("{0}")]
    Transport(String),
    #[error("{0}")]
    Domain(String),
}

impl SubmitError {
    pub fn message(&self) -> &str {
        match self {
            Self::Transport(message) | Self::Domain(message) => message,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("endpoint URL is not configured")]
    MissingEndpoint,
    #[error("endpoint URL still contains the deployment placeholder `{0}`")]
    PlaceholderEndpoint(String),
    #[error("endpoint URL is invalid: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
    #[error("endpoint URL must use http or https, got `{0}`")]
    UnsupportedScheme(String),
    #[error("unknown submit encoding `{0}` (expected `form` or `json`)")]
    UnknownSubmitEncoding(String),
}
