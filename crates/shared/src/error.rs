use thiserror::Error;

/// Client-side input rejection, raised before any request is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("username is required")]
    MissingUsername,
    #[error("message is required")]
    MissingMessage,
}
