/// Nova APNs Shared Library
///
/// Certificate-backed credentials for the Apple Push Notification service.
///
/// It handles:
/// - Loading the client certificate and private key from disk
/// - Reading the certificate validity window (timezone independent)
/// - Plugging into `push_credentials::CredentialRefreshManager` so rotated
///   files are picked up before the old certificate expires
pub mod certificate;
pub mod config;
pub mod error;
pub mod source;

pub use certificate::{will_expire_within, CertificateInfo};
pub use config::ApnsConfig;
pub use error::ApnsError;
pub use source::{ApnsIdentity, CertificateSource};
