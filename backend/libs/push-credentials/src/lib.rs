/// Nova Push Credentials Library
///
/// This library keeps the credentials used to talk to push gateways (APNs
/// client certificates, FCM OAuth2 access tokens) valid while notifications
/// are being dispatched.
///
/// It handles:
/// - Blocking startup until the first credential has been issued
/// - Proactive renewal before expiry
/// - Exponential backoff with jitter after failed renewals
/// - Lock-free reads and change notifications for the connection layer
/// - A single, explicit fatal error once renewal is truly exhausted
///
/// # Example
///
/// ```rust,ignore
/// use push_credentials::{presets, CredentialRefreshManager};
///
/// let manager = CredentialRefreshManager::start(token_source, presets::fcm_token_config()).await?;
/// let token = manager.current_credential();
///
/// tokio::select! {
///     err = manager.stopped() => { /* renewal gave up: fail the process */ }
///     _ = tokio::signal::ctrl_c() => manager.shutdown().await,
/// }
/// ```
pub mod config;
pub mod credential;
pub mod error;
pub mod expiry;
pub mod manager;
pub mod metrics;
pub mod presets;
pub mod source;

pub use config::RefreshConfig;
pub use credential::{Credential, FailureKind, RenewalFailure, RenewalOutcome};
pub use error::{ConfigError, RefreshError};
pub use expiry::{should_renew, ExpiryPolicy};
pub use manager::{CredentialHandle, CredentialRefreshManager, ManagerState};
pub use source::CredentialSource;

pub use resilience::{BackOffStrategy, BackoffConfig, ExponentialBackOff};
