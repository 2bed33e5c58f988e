// Error taxonomy for calls against the remote lucky-draw service.

use serde_json::Value;
use thiserror::Error;

/// Failure of a remote call as seen by the component that issued it.
///
/// An expired access credential that is refreshed successfully never shows
/// up here: the session manager recovers it before the caller sees a result.
/// `Clone` so one refresh failure can be handed to every request that was
/// waiting on it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// 401 with no way to refresh (no refresh token, or still 401 after a
    /// successful refresh).
    #[error("not authorized: {message}")]
    Unauthorized { message: String },

    /// The refresh endpoint rejected the stored refresh token.
    #[error("session expired: {message}")]
    AuthInvalid { message: String },

    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Transport(String),

    #[error("not found: {message}")]
    NotFound { message: String },

    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// The payload does not have the expected nested envelope.
    #[error("unexpected response shape: {0}")]
    Shape(String),
}

impl ApiError {
    /// Map a non-2xx response to its error kind. The server-provided
    /// `message` field is kept when present.
    pub fn from_status(status: u16, body: &Value) -> Self {
        let message = server_message(body).unwrap_or_default();
        match status {
            401 => ApiError::Unauthorized { message },
            404 => ApiError::NotFound { message },
            _ => ApiError::Server { status, message },
        }
    }

    /// True when the operator has to sign in again.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            ApiError::Unauthorized { .. } | ApiError::AuthInvalid { .. }
        )
    }

    /// Short operator-facing message.
    ///
    /// A message from the server wins; otherwise 404 and 500 get fixed
    /// wording, transport failures report their own text, and everything
    /// else falls back to `fallback`.
    pub fn user_message(&self, not_found: &str, fallback: &str) -> String {
        match self {
            ApiError::Unauthorized { message }
            | ApiError::AuthInvalid { message }
            | ApiError::NotFound { message }
            | ApiError::Server { message, .. }
                if !message.is_empty() =>
            {
                message.clone()
            }
            ApiError::NotFound { .. } => not_found.to_string(),
            ApiError::Server { status: 500, .. } => "Server error occurred".to_string(),
            ApiError::Timeout => "Request timed out".to_string(),
            ApiError::Transport(msg) if !msg.is_empty() => msg.clone(),
            _ => fallback.to_string(),
        }
    }
}

/// Extract the top-level `message` string from a response body.
pub(crate) fn server_message(body: &Value) -> Option<String> {
    body.get("message")?
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
