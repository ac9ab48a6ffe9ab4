use std::path::PathBuf;

use thiserror::Error;

use crate::auth::CredentialError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Cannot load credential file {0}, it does not exist - run `taurus configure` first")]
    ConfigurationMissing(PathBuf),

    #[error("Credential error: {0}")]
    Credentials(#[from] CredentialError),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Not connected - call connect() first")]
    NotConnected,

    #[error("HTTP {status}: {body}")]
    Http {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;

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

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        ApiError::Http {
            status,
            body: Self::truncate_body(body),
        }
    }
}
