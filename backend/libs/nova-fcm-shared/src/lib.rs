/// Nova FCM Shared Library
///
/// OAuth2 credentials for Firebase Cloud Messaging.
///
/// It handles:
/// - Loading Google service account keys
/// - Signing RS256 assertions and exchanging them for access tokens
/// - Plugging into `push_credentials::CredentialRefreshManager` so the token
///   is replaced before it expires

pub mod errors;
pub mod models;
pub mod token;

pub use errors::FCMError;
pub use models::ServiceAccountKey;
pub use token::{AccessToken, OAuth2TokenSource, CLOUD_PLATFORM_SCOPE, FIREBASE_MESSAGING_SCOPE};
