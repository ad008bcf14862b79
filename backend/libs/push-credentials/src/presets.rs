/// Preset refresh configurations for the supported push gateways
use crate::config::RefreshConfig;
use resilience::BackoffConfig;
use std::time::Duration;

/// APNs client certificates (mutual TLS)
///
/// - Lookahead: 30 days (certificates are issued for a year; rotate well before
///   handshakes start failing)
/// - Refresh cap: 6h (picks up certificate files replaced on disk)
/// - Backoff: 1s → 5min, give up after 24h of consecutive failures
pub fn apns_certificate_config() -> RefreshConfig {
    RefreshConfig {
        lookahead: Duration::from_secs(30 * 24 * 60 * 60),
        refresh_interval: Some(Duration::from_secs(6 * 60 * 60)),
        min_refresh_interval: Duration::from_secs(60),
        startup_retry_delay: Duration::from_secs(2),
        renew_timeout: Duration::from_secs(10),
        backoff: BackoffConfig {
            initial_interval: Duration::from_secs(1),
            multiplier: 2.0,
            max_interval: Duration::from_secs(5 * 60),
            randomization_factor: 0.3,
            max_elapsed_time: Some(Duration::from_secs(24 * 60 * 60)),
            max_attempts: None,
        },
    }
}

/// FCM OAuth2 access tokens
///
/// - Lookahead: 5min
/// - Refresh cap: 45min (tokens live 1h; renew well after issuance and well
///   before expiry)
/// - Backoff: 500ms → 60s, give up after 15min of consecutive failures
pub fn fcm_token_config() -> RefreshConfig {
    RefreshConfig {
        lookahead: Duration::from_secs(5 * 60),
        refresh_interval: Some(Duration::from_secs(45 * 60)),
        min_refresh_interval: Duration::from_secs(1),
        startup_retry_delay: Duration::from_secs(2),
        renew_timeout: Duration::from_secs(30),
        backoff: BackoffConfig::default(),
    }
}
