use thiserror::Error;

/// Error type for APNs credential operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApnsError {
    #[error("APNs configuration error: {0}")]
    Config(String),

    #[error("Failed to parse PEM: {0}")]
    Pem(String),

    #[error("Failed to parse X.509 certificate: {0}")]
    Certificate(String),

    #[error("Invalid private key: {0}")]
    PrivateKey(String),
}
