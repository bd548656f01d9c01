// Error handling module
// Defines error types and the short messages paired with them

use thiserror::Error;

/// Errors that can occur while talking to the Toggl Plan API
#[derive(Error, Debug)]
pub enum ApiError {
    /// Token acquisition failed or returned an unusable response
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// The API answered 401
    #[error("Unauthorized")]
    Unauthorized,

    /// Terminal non-2xx response other than 401
    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    /// Network-level failure after retries were exhausted
    #[error("Transport error: {0}")]
    TransportError(String),

    /// The response arrived but its body could not be read
    #[error("Failed to read response: {0}")]
    ResponseRead(String),

    /// The request could not be built (bad URL, header name or value)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Short message describing which stage of the call failed.
    ///
    /// For terminal HTTP statuses this is the numeric code, so callers that
    /// only look at the text still see e.g. `"404"`.
    pub fn partial_message(&self) -> String {
        match self {
            ApiError::AuthError(_) => "Couldn't authenticate".to_string(),
            ApiError::Unauthorized => "Unauthorized".to_string(),
            ApiError::HttpStatus { status, .. } => status.to_string(),
            ApiError::TransportError(_) => "Error running request".to_string(),
            ApiError::ResponseRead(_) => "Error reading response".to_string(),
            ApiError::InvalidRequest(_) => "Error building request".to_string(),
            ApiError::Internal(_) => "Internal error".to_string(),
        }
    }

    /// `InvalidRequest` carrying the full source chain of `err`, since
    /// builder errors only say "builder error" at the top level
    pub fn invalid_request(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        ApiError::InvalidRequest(message)
    }

    /// HTTP status associated with this error, if the server produced one
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized => Some(401),
            ApiError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias for API operations
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ApiError::AuthError("access_token not found in response".to_string());
        assert_eq!(
            err.to_string(),
            "Authentication failed: access_token not found in response"
        );

        let err = ApiError::HttpStatus {
            status: 404,
            message: "Not Found".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 404: Not Found");

        assert_eq!(ApiError::Unauthorized.to_string(), "Unauthorized");
    }

    #[test]
    fn test_internal_error_message() {
        let err = ApiError::Internal(anyhow::anyhow!("Something went wrong"));
        assert_eq!(err.to_string(), "Internal error: Something went wrong");
    }

    #[test]
    fn test_partial_messages() {
        assert_eq!(
            ApiError::AuthError("x".to_string()).partial_message(),
            "Couldn't authenticate"
        );
        assert_eq!(ApiError::Unauthorized.partial_message(), "Unauthorized");
        assert_eq!(
            ApiError::TransportError("x".to_string()).partial_message(),
            "Error running request"
        );
        assert_eq!(
            ApiError::ResponseRead("x".to_string()).partial_message(),
            "Error reading response"
        );
        assert_eq!(
            ApiError::InvalidRequest("x".to_string()).partial_message(),
            "Error building request"
        );
    }

    #[test]
    fn test_http_status_partial_message_is_code() {
        let err = ApiError::HttpStatus {
            status: 503,
            message: "Service Unavailable".to_string(),
        };
        assert_eq!(err.partial_message(), "503");
        assert_eq!(err.status(), Some(503));
    }

    #[test]
    fn test_invalid_request_keeps_source_chain() {
        let err = reqwest::Client::new().get("not a url").build().unwrap_err();
        let api_err = ApiError::invalid_request(&err);

        let message = api_err.to_string();
        assert!(message.starts_with("Invalid request: builder error"));
        assert!(message.contains("relative URL without a base"));
        assert_eq!(api_err.partial_message(), "Error building request");
    }

    #[test]
    fn test_status() {
        assert_eq!(ApiError::Unauthorized.status(), Some(401));
        assert_eq!(ApiError::TransportError("reset".to_string()).status(), None);
        assert_eq!(ApiError::AuthError("bad".to_string()).status(), None);
    }
}
