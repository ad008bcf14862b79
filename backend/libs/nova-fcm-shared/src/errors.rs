use push_credentials::RenewalFailure;
use thiserror::Error;

/// FCM Credential Error Types
#[derive(Error, Debug)]
pub enum FCMError {
    #[error("Failed to parse private key: {0}")]
    KeyParseError(String),

    #[error("Failed to load service account key: {0}")]
    KeyFileError(String),

    #[error("Failed to encode JWT: {0}")]
    JwtEncodeError(String),

    #[error("Failed to get access token: {0}")]
    TokenError(String),

    #[error("Token request failed with status {status}: {body}")]
    TokenRequestFailed { status: u16, body: String },

    #[error("Failed to parse token response: {0}")]
    TokenParseError(String),
}

impl From<FCMError> for RenewalFailure {
    fn from(err: FCMError) -> Self {
        match err {
            FCMError::TokenError(_) => RenewalFailure::io(err.to_string()),
            FCMError::TokenParseError(_) => RenewalFailure::invalid_response(err.to_string()),
            _ => RenewalFailure::rejected(err.to_string()),
        }
    }
}
