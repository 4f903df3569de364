//! Error types for the Data API client.
//!
//! # Design
//! The four statuses the service uses to reject a request (400, 401, 403,
//! 500) get a variant each with a fixed display string; the server's own
//! message is kept on the variant for debugging. 404 has no fixed string and
//! displays the server message instead. Transport failures, unreadable
//! bodies and redirect loops each get their own variant so callers can match
//! on them.

use thiserror::Error;

/// Reason used when an error body has neither `message` nor `error.msg`.
pub const DEFAULT_REASON: &str = "no error message in response";

/// Errors returned by the executor and the facade operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a complete response.
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("400 Bad Request")]
    BadRequest { message: String },

    #[error("401 Unauthorized")]
    Unauthorized { message: String },

    #[error("403 Forbidden")]
    Forbidden { message: String },

    /// The addressed content, index or session does not exist.
    #[error("HTTP 404: {message}")]
    NotFound { message: String },

    #[error("500 Internal Server Error")]
    InternalServerError { message: String },

    /// The body could not be read as JSON, or lacked a field the call needs.
    #[error("malformed response (HTTP {status}): {message}")]
    MalformedResponse { status: u16, message: String },

    /// More consecutive 303 hops than the configured maximum.
    #[error("too many redirects (limit {max}), last location {location}")]
    TooManyRedirects { max: usize, location: String },

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response body did not match the expected record.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request cannot be put on the wire (bad header name or value).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// Map a rejecting status code to its error, or `None` if the status is
    /// not one the service uses to reject requests.
    ///
    /// `body` is the decoded response body, if any. The message is read from
    /// `message`, then `error.msg`, then falls back to [`DEFAULT_REASON`].
    pub fn classify(status: u16, body: Option<&serde_json::Value>) -> Option<Self> {
        let message = || server_message(body);
        let err = match status {
            400 => ApiError::BadRequest { message: message() },
            401 => ApiError::Unauthorized { message: message() },
            403 => ApiError::Forbidden { message: message() },
            404 => ApiError::NotFound { message: message() },
            500 => ApiError::InternalServerError { message: message() },
            _ => return None,
        };
        Some(err)
    }

    /// The HTTP status behind a classified error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::BadRequest { .. } => Some(400),
            ApiError::Unauthorized { .. } => Some(401),
            ApiError::Forbidden { .. } => Some(403),
            ApiError::NotFound { .. } => Some(404),
            ApiError::InternalServerError { .. } => Some(500),
            ApiError::MalformedResponse { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The message the server sent with a classified error.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::BadRequest { message }
            | ApiError::Unauthorized { message }
            | ApiError::Forbidden { message }
            | ApiError::NotFound { message }
            | ApiError::InternalServerError { message } => Some(message),
            _ => None,
        }
    }
}

fn server_message(body: Option<&serde_json::Value>) -> String {
    let Some(body) = body else {
        return DEFAULT_REASON.to_string();
    };
    non_empty_str(body, "/message")
        .or_else(|| non_empty_str(body, "/error/msg"))
        .unwrap_or(DEFAULT_REASON)
        .to_string()
}

fn non_empty_str<'a>(body: &'a serde_json::Value, pointer: &str) -> Option<&'a str> {
    body.pointer(pointer)
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.is_empty())
}

/// A connection-level failure: refused connection, DNS failure, a body
/// stream aborted midway. Displays the underlying description unchanged.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        // reqwest's Display drops the cause ("error sending request"), so
        // walk the chain to keep e.g. "Connection refused".
        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Self { message }
    }
}

/// Invalid configuration values, e.g. from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}
