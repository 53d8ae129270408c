use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const NETWORK_ERROR_MESSAGE: &str =
    "Unable to reach the server. Check your connection and try again.";

/// Errors from the battery-swap REST API layer.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// No response arrived (connectivity, DNS, timeout).
    #[error("{message}")]
    Network { message: String },

    /// The backend refused the request's preconditions (400, 409, 422, or a
    /// 2xx envelope with `success: false`).
    #[error("{message}")]
    BadRequest {
        status: u16,
        message: String,
        errors: Option<Value>,
    },

    /// 401. The stored token has already been invalidated.
    #[error("{message}")]
    Unauthorized { message: String },

    #[error("{message}")]
    Forbidden { message: String },

    #[error("{message}")]
    NotFound { message: String },

    #[error("{message}")]
    Server { status: u16, message: String },

    /// The response does not match the documented envelope or payload.
    #[error("Malformed response: {detail}")]
    MalformedResponse { detail: String },

    /// The client could not be built or the request could not be encoded.
    #[error("Client setup failed: {message}")]
    Setup { message: String },
}

/// The single error shape handed to presentation code.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Value>,
}

/// Fields read from a non-2xx body when it carries the usual envelope.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorPayload {
    pub message: Option<String>,
    pub errors: Option<Value>,
}

impl ApiError {
    pub(crate) fn network() -> Self {
        ApiError::Network {
            message: NETWORK_ERROR_MESSAGE.to_string(),
        }
    }

    pub(crate) fn malformed(detail: impl Into<String>) -> Self {
        ApiError::MalformedResponse {
            detail: detail.into(),
        }
    }

    pub(crate) fn from_status(status: StatusCode, payload: ErrorPayload) -> Self {
        let message = payload
            .message
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| default_message(status));

        match status {
            StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
                ApiError::BadRequest {
                    status: status.as_u16(),
                    message,
                    errors: payload.errors,
                }
            }
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized { message },
            StatusCode::FORBIDDEN => ApiError::Forbidden { message },
            StatusCode::NOT_FOUND => ApiError::NotFound { message },
            _ => ApiError::Server {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// HTTP status behind the error, when a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::BadRequest { status, .. } | ApiError::Server { status, .. } => Some(*status),
            ApiError::Unauthorized { .. } => Some(401),
            ApiError::Forbidden { .. } => Some(403),
            ApiError::NotFound { .. } => Some(404),
            ApiError::Network { .. }
            | ApiError::MalformedResponse { .. }
            | ApiError::Setup { .. } => None,
        }
    }

    pub fn body(&self) -> ErrorBody {
        let errors = match self {
            ApiError::BadRequest { errors, .. } => errors.clone(),
            _ => None,
        };
        ErrorBody {
            message: self.to_string(),
            errors,
        }
    }
}

fn default_message(status: StatusCode) -> String {
    match status {
        StatusCode::UNAUTHORIZED => "Your session has expired. Please sign in again.".to_string(),
        StatusCode::FORBIDDEN => "You do not have permission to perform this action.".to_string(),
        StatusCode::NOT_FOUND => "The requested resource was not found.".to_string(),
        _ => format!("Request failed with status {}", status.as_u16()),
    }
}
