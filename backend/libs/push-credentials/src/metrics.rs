/// Prometheus metrics for credential renewal
#[cfg(feature = "metrics")]
use prometheus::{register_int_counter_vec, register_int_gauge_vec, IntCounterVec, IntGaugeVec};

#[cfg(feature = "metrics")]
use once_cell::sync::Lazy;

#[cfg(feature = "metrics")]
static RENEWALS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "push_credential_renewals_total",
        "Total number of credential renewal attempts",
        &["source", "result"]
    )
    .expect("Failed to register credential renewals metric")
});

#[cfg(feature = "metrics")]
static EXPIRY: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "push_credential_expiry_timestamp_seconds",
        "Expiry of the currently published credential (unix seconds)",
        &["source"]
    )
    .expect("Failed to register credential expiry metric")
});

#[cfg(feature = "metrics")]
static EXHAUSTED: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "push_credential_backoff_exhausted_total",
        "Number of refresh managers stopped by backoff exhaustion",
        &["source"]
    )
    .expect("Failed to register backoff exhausted metric")
});

/// Metrics collector for credential renewal
#[cfg(feature = "metrics")]
pub struct CredentialMetrics;

#[cfg(feature = "metrics")]
impl CredentialMetrics {
    pub fn record_renewal(source: &str, result: &str) {
        RENEWALS.with_label_values(&[source, result]).inc();
    }

    pub fn record_expiry(source: &str, expires_at_secs: i64) {
        EXPIRY.with_label_values(&[source]).set(expires_at_secs);
    }

    pub fn record_exhausted(source: &str) {
        EXHAUSTED.with_label_values(&[source]).inc();
    }
}

// No-op implementation when metrics feature is disabled
#[cfg(not(feature = "metrics"))]
pub struct CredentialMetrics;

#[cfg(not(feature = "metrics"))]
impl CredentialMetrics {
    pub fn record_renewal(_source: &str, _result: &str) {}
    pub fn record_expiry(_source: &str, _expires_at_secs: i64) {}
    pub fn record_exhausted(_source: &str) {}
}
