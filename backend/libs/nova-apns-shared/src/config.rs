use std::time::Duration;

use crate::error::ApnsError;

/// APNs Configuration
#[derive(Debug, Clone)]
pub struct ApnsConfig {
    /// PEM certificate chain, leaf first
    pub certificate_path: String,
    /// PEM private key (unencrypted PKCS#8) matching the leaf certificate
    pub private_key_path: String,
    pub bundle_id: String,
    pub is_production: bool,
    /// Warn when the certificate on disk expires within this window
    pub expiry_warning: Duration,
}

impl ApnsConfig {
    /// Create new APNs configuration
    pub fn new(
        certificate_path: String,
        private_key_path: String,
        bundle_id: String,
        is_production: bool,
    ) -> Self {
        Self {
            certificate_path,
            private_key_path,
            bundle_id,
            is_production,
            expiry_warning: Duration::from_secs(30 * 24 * 60 * 60),
        }
    }

    /// Set the expiry warning window
    pub fn with_expiry_warning(mut self, window: Duration) -> Self {
        self.expiry_warning = window;
        self
    }

    /// Load APNs configuration from environment variables
    ///
    /// **Environment Variables**:
    /// - `APNS_CERTIFICATE_PATH`: PEM certificate chain
    /// - `APNS_PRIVATE_KEY_PATH`: PEM private key
    /// - `APNS_BUNDLE_ID`: App bundle id (APNs topic)
    /// - `APNS_PRODUCTION`: Use the production gateway (default: false)
    pub fn from_env() -> Result<Self, ApnsError> {
        let var = |key: &str| {
            std::env::var(key).map_err(|_| ApnsError::Config(format!("{key} not set")))
        };

        let is_production = match std::env::var("APNS_PRODUCTION") {
            Ok(raw) => raw.parse::<bool>().map_err(|_| {
                ApnsError::Config(format!("APNS_PRODUCTION must be true or false, got {raw:?}"))
            })?,
            Err(_) => false,
        };

        let config = Self::new(
            var("APNS_CERTIFICATE_PATH")?,
            var("APNS_PRIVATE_KEY_PATH")?,
            var("APNS_BUNDLE_ID")?,
            is_production,
        );
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ApnsError> {
        if self.certificate_path.trim().is_empty() {
            return Err(ApnsError::Config("certificate path is empty".to_string()));
        }
        if self.private_key_path.trim().is_empty() {
            return Err(ApnsError::Config("private key path is empty".to_string()));
        }
        if self.bundle_id.trim().is_empty() {
            return Err(ApnsError::Config("bundle id is empty".to_string()));
        }
        Ok(())
    }

    /// Get APNs API endpoint based on environment
    pub fn endpoint(&self) -> &str {
        if self.is_production {
            "api.push.apple.com"
        } else {
            "api.sandbox.push.apple.com"
        }
    }
}
