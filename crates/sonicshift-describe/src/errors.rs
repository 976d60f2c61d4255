//! Description error types.
//!
//! These never cross the [`Describer`](crate::Describer) boundary; they exist
//! so failures can be logged with their cause before the fallback is used.

use thiserror::Error;

/// Errors raised while requesting a description.
#[derive(Debug, Error)]
pub enum DescribeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error description.
        message: String,
    },

    /// The response body could not be decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No API key is configured.
    #[error("no Gemini API key configured")]
    MissingApiKey,

    /// The request exceeded the configured timeout.
    #[error("request timed out")]
    Timeout,
}

impl DescribeError {
    /// Map a transport error, separating timeouts from other failures.
    ///
    /// The request URL is stripped so it never reaches the logs.
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(err.without_url())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display() {
        let err = DescribeError::Api {
            status: 503,
            message: "overloaded".into(),
        };
        assert_eq!(err.to_string(), "API error (503): overloaded");
    }

    #[test]
    fn missing_key_display() {
        assert_eq!(
            DescribeError::MissingApiKey.to_string(),
            "no Gemini API key configured"
        );
    }

    #[test]
    fn json_error_converts() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: DescribeError = json_err.into();
        assert!(matches!(err, DescribeError::Json(_)));
    }
}
