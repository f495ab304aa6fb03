//! Centralized error types for the Estate workspace.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// One field-level complaint from a 422 response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    #[serde(default, alias = "param", alias = "path")]
    pub field: String,
    #[serde(default, alias = "msg")]
    pub message: String,
}

/// Top-level error enum. HTTP variants follow the status taxonomy of the API.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum EstateError {
    /// The request never produced a response (connect failure, timeout).
    #[error("Network error: {0}")]
    Network(String),

    /// 401. The session is evicted whenever this is produced by the client.
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String, data: Option<Value> },

    #[error("Forbidden: {message}")]
    Forbidden { message: String, data: Option<Value> },

    #[error("Not found: {message}")]
    NotFound { message: String, data: Option<Value> },

    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        fields: Vec<FieldError>,
        data: Option<Value>,
    },

    #[error("Server error ({status}): {message}")]
    Server {
        status: u16,
        message: String,
        data: Option<Value>,
    },

    /// Any other non-2xx status.
    #[error("HTTP {status}: {message}")]
    Http {
        status: u16,
        message: String,
        data: Option<Value>,
    },

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type EstateResult<T> = Result<T, EstateError>;

/// The `{message, status, data}` triple every failure can be flattened into.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedError {
    pub message: String,
    pub status: Option<u16>,
    pub data: Option<Value>,
}

impl EstateError {
    /// Classify a non-2xx response.
    ///
    /// `message` is taken from the body's `message`, then `error`, falling
    /// back to the canonical reason phrase.
    pub fn from_status(status: u16, body: Option<Value>) -> Self {
        let message = body
            .as_ref()
            .and_then(body_message)
            .unwrap_or_else(|| default_reason(status).to_owned());

        match status {
            401 => Self::Unauthorized {
                message,
                data: body,
            },
            403 => Self::Forbidden {
                message,
                data: body,
            },
            404 => Self::NotFound {
                message,
                data: body,
            },
            422 => {
                let fields = body.as_ref().map(field_errors).unwrap_or_default();
                Self::Validation {
                    message,
                    fields,
                    data: body,
                }
            }
            500..=599 => Self::Server {
                status,
                message,
                data: body,
            },
            _ => Self::Http {
                status,
                message,
                data: body,
            },
        }
    }

    /// HTTP status this error came from, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { .. } => Some(401),
            Self::Forbidden { .. } => Some(403),
            Self::NotFound { .. } => Some(404),
            Self::Validation { .. } => Some(422),
            Self::Server { status, .. } | Self::Http { status, .. } => Some(*status),
            Self::Network(_)
            | Self::InvalidPayload(_)
            | Self::InvalidInput(_)
            | Self::Storage(_) => None,
        }
    }

    /// Human-readable message without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Unauthorized { message, .. }
            | Self::Forbidden { message, .. }
            | Self::NotFound { message, .. }
            | Self::Validation { message, .. }
            | Self::Server { message, .. }
            | Self::Http { message, .. } => message,
            Self::Network(message)
            | Self::InvalidPayload(message)
            | Self::InvalidInput(message)
            | Self::Storage(message) => message,
        }
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            Self::Unauthorized { data, .. }
            | Self::Forbidden { data, .. }
            | Self::NotFound { data, .. }
            | Self::Validation { data, .. }
            | Self::Server { data, .. }
            | Self::Http { data, .. } => data.as_ref(),
            _ => None,
        }
    }

    pub fn normalized(&self) -> NormalizedError {
        NormalizedError {
            message: self.message().to_owned(),
            status: self.status(),
            data: self.data().cloned(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

/// First non-empty string among the body's `message` and `error` fields.
pub fn body_message(body: &Value) -> Option<String> {
    ["message", "error"].iter().find_map(|key| {
        body.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
    })
}

fn field_errors(body: &Value) -> Vec<FieldError> {
    body.get("errors")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}

fn default_reason(status: u16) -> &'static str {
    match status {
        400 => "Bad request",
        401 => "Session expired, please log in again",
        403 => "You do not have permission to perform this action",
        404 => "Resource not found",
        409 => "Conflict",
        422 => "Validation failed",
        429 => "Too many requests",
        500..=599 => "Server error, please try again later",
        _ => "Request failed",
    }
}
