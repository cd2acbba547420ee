use thiserror::Error;

use crate::auth::SessionError;

#[derive(Error, Debug)]
pub enum ApiError {
    /// 401/403 on an authenticated call. The session has already been
    /// routed into expiry by the time the caller sees this.
    #[error("Session expired - please log in again")]
    Unauthorized { status: u16 },

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rejected client-side before any request was made.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Pull the server's `message` (or `error`) field out of a JSON body.
    pub(crate) fn server_message(body: &str) -> Option<String> {
        let value: serde_json::Value = serde_json::from_str(body).ok()?;
        value
            .get("message")
            .or_else(|| value.get("error"))
            .and_then(|m| m.as_str())
            .map(str::to_string)
    }

    /// Map a non-2xx status that is not an auth failure. Auth statuses
    /// are classified by the gateway before this is reached.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            400 => ApiError::BadRequest(Self::server_message(body).unwrap_or(truncated)),
            401 | 403 => ApiError::Unauthorized {
                status: status.as_u16(),
            },
            404 => ApiError::NotFound(truncated),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    /// Transport failures, throttling and 5xx are worth retrying;
    /// everything else is a definitive answer.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Network(_) | ApiError::RateLimited => true,
            ApiError::ServerError(_) => true,
            _ => false,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    /// Message suitable for showing next to a form.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Unauthorized { .. } => "Session expired. Please login again.".to_string(),
            ApiError::InvalidCredentials => "Invalid email or password.".to_string(),
            ApiError::BadRequest(msg) | ApiError::Validation(msg) => msg.clone(),
            ApiError::NotFound(_) => "Not found.".to_string(),
            ApiError::ServerError(_) => "Internal server error. Please try again later.".to_string(),
            ApiError::Network(_)
            | ApiError::RateLimited
            | ApiError::InvalidResponse(_)
            | ApiError::Session(_) => "An error occurred, please try again later.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_mapping() {
        assert!(matches!(
            ApiError::from_status(StatusCode::NOT_FOUND, "missing"),
            ApiError::NotFound(ref b) if b == "missing"
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, ""),
            ApiError::RateLimited
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_GATEWAY, "oops"),
            ApiError::ServerError(_)
        ));
        assert!(ApiError::from_status(StatusCode::FORBIDDEN, "").is_unauthorized());
        assert!(matches!(
            ApiError::from_status(StatusCode::CONFLICT, "dup"),
            ApiError::InvalidResponse(_)
        ));
    }

    #[test]
    fn test_bad_request_uses_server_message() {
        let err = ApiError::from_status(
            StatusCode::BAD_REQUEST,
            r#"{"message":"Email already exists"}"#,
        );
        assert_eq!(err.user_message(), "Email already exists");

        let err = ApiError::from_status(StatusCode::BAD_REQUEST, "plain text");
        assert_eq!(err.user_message(), "plain text");
    }

    #[test]
    fn test_truncate_body() {
        let long = "é".repeat(400);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.contains("truncated, 800 total bytes"));
        assert!(ApiError::truncate_body("short") == "short");
    }

    #[test]
    fn test_retryable() {
        assert!(ApiError::RateLimited.is_retryable());
        assert!(!ApiError::InvalidCredentials.is_retryable());
        assert!(!ApiError::Unauthorized { status: 401 }.is_retryable());
    }
}
