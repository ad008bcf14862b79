use resilience::BackoffConfig;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Tuning for one [`crate::CredentialRefreshManager`]
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshConfig {
    /// Renew once the credential is this close to expiry
    pub lookahead: Duration,
    /// Upper bound on the wait between successful renewals
    pub refresh_interval: Option<Duration>,
    /// Lower bound on the wait between successful renewals
    pub min_refresh_interval: Duration,
    /// Fixed delay between attempts while waiting for the first credential
    pub startup_retry_delay: Duration,
    /// Deadline for a single renewal call
    pub renew_timeout: Duration,
    /// Retry spacing after failed renewals in the background loop
    pub backoff: BackoffConfig,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            lookahead: Duration::from_secs(5 * 60),
            refresh_interval: None,
            min_refresh_interval: Duration::from_secs(1),
            startup_retry_delay: Duration::from_secs(2),
            renew_timeout: Duration::from_secs(30),
            backoff: BackoffConfig::default(),
        }
    }
}

impl RefreshConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.startup_retry_delay.is_zero() {
            return Err(ConfigError::Zero("startup_retry_delay"));
        }
        if self.min_refresh_interval.is_zero() {
            return Err(ConfigError::Zero("min_refresh_interval"));
        }
        if self.renew_timeout.is_zero() {
            return Err(ConfigError::Zero("renew_timeout"));
        }
        if self.refresh_interval.is_some_and(|interval| interval.is_zero()) {
            return Err(ConfigError::Zero("refresh_interval"));
        }
        self.backoff.validate()?;
        Ok(())
    }

    /// Load configuration from `<PREFIX>_*` environment variables on top of `base`.
    ///
    /// **Environment Variables** (all optional):
    /// - `<PREFIX>_LOOKAHEAD_SECS`
    /// - `<PREFIX>_REFRESH_INTERVAL_SECS`
    /// - `<PREFIX>_MIN_REFRESH_INTERVAL_MS`
    /// - `<PREFIX>_STARTUP_RETRY_DELAY_MS`
    /// - `<PREFIX>_RENEW_TIMEOUT_SECS`
    /// - `<PREFIX>_BACKOFF_INITIAL_MS`
    /// - `<PREFIX>_BACKOFF_MULTIPLIER`
    /// - `<PREFIX>_BACKOFF_MAX_MS`
    /// - `<PREFIX>_BACKOFF_RANDOMIZATION`
    /// - `<PREFIX>_BACKOFF_MAX_ELAPSED_SECS` (0 disables the elapsed-time limit)
    /// - `<PREFIX>_BACKOFF_MAX_ATTEMPTS` (0 disables the attempt limit)
    pub fn from_env_with(prefix: &str, base: RefreshConfig) -> Result<Self, ConfigError> {
        let key = |suffix: &str| format!("{prefix}_{suffix}");
        let mut config = base;

        if let Some(secs) = parse_env::<u64>(&key("LOOKAHEAD_SECS"))? {
            config.lookahead = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_env::<u64>(&key("REFRESH_INTERVAL_SECS"))? {
            config.refresh_interval = Some(Duration::from_secs(secs));
        }
        if let Some(ms) = parse_env::<u64>(&key("MIN_REFRESH_INTERVAL_MS"))? {
            config.min_refresh_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_env::<u64>(&key("STARTUP_RETRY_DELAY_MS"))? {
            config.startup_retry_delay = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_env::<u64>(&key("RENEW_TIMEOUT_SECS"))? {
            config.renew_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = parse_env::<u64>(&key("BACKOFF_INITIAL_MS"))? {
            config.backoff.initial_interval = Duration::from_millis(ms);
        }
        if let Some(multiplier) = parse_env::<f64>(&key("BACKOFF_MULTIPLIER"))? {
            config.backoff.multiplier = multiplier;
        }
        if let Some(ms) = parse_env::<u64>(&key("BACKOFF_MAX_MS"))? {
            config.backoff.max_interval = Duration::from_millis(ms);
        }
        if let Some(factor) = parse_env::<f64>(&key("BACKOFF_RANDOMIZATION"))? {
            config.backoff.randomization_factor = factor;
        }
        if let Some(secs) = parse_env::<u64>(&key("BACKOFF_MAX_ELAPSED_SECS"))? {
            config.backoff.max_elapsed_time = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(attempts) = parse_env::<u32>(&key("BACKOFF_MAX_ATTEMPTS"))? {
            config.backoff.max_attempts = (attempts > 0).then_some(attempts);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        Self::from_env_with(prefix, RefreshConfig::default())
    }
}

/// Read and parse an optional environment variable.
///
/// Unset or empty means `None`; a value that fails to parse is an error rather
/// than a silent fallback to the default.
pub fn parse_env<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw,
            }),
        Err(_) => Ok(None),
    }
}
