//! X.509 inspection for APNs client certificates.
//!
//! All instants are compared as UTC timestamps, so the result never depends on
//! the host timezone.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use push_credentials::should_renew;
use x509_parser::prelude::*;

use crate::error::ApnsError;

/// Validity window and identity of a leaf certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateInfo {
    pub subject: String,
    pub serial: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    /// Raw subjectPublicKey bits of the leaf
    pub public_key: Vec<u8>,
}

impl CertificateInfo {
    /// Parse the first `CERTIFICATE` block of a PEM bundle.
    pub fn from_pem(pem_data: &str) -> Result<Self, ApnsError> {
        let blocks = ::pem::parse_many(pem_data).map_err(|e| ApnsError::Pem(e.to_string()))?;
        let leaf = blocks
            .iter()
            .find(|block| block.tag() == "CERTIFICATE")
            .ok_or_else(|| ApnsError::Pem("no CERTIFICATE block found".to_string()))?;

        Self::from_der(leaf.contents())
    }

    pub fn from_der(der: &[u8]) -> Result<Self, ApnsError> {
        let (_, cert) = X509Certificate::from_der(der)
            .map_err(|e| ApnsError::Certificate(e.to_string()))?;

        let validity = cert.validity();
        Ok(Self {
            subject: cert.subject().to_string(),
            serial: cert.raw_serial_as_string(),
            not_before: to_utc(validity.not_before.timestamp())?,
            not_after: to_utc(validity.not_after.timestamp())?,
            public_key: cert.public_key().subject_public_key.data.to_vec(),
        })
    }

    /// Whether `not_after` falls at or before now + `within`.
    pub fn will_expire_within(&self, within: Duration) -> bool {
        self.will_expire_within_at(within, Utc::now())
    }

    pub fn will_expire_within_at(&self, within: Duration, now: DateTime<Utc>) -> bool {
        should_renew(self.not_after, now, within)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.not_after <= now
    }

    pub fn is_not_yet_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.not_before
    }
}

/// Check whether the leaf certificate in `cert_pem` expires within `within`.
///
/// Fails if the PEM or the certificate cannot be parsed.
pub fn will_expire_within(cert_pem: &str, within: Duration) -> Result<bool, ApnsError> {
    Ok(CertificateInfo::from_pem(cert_pem)?.will_expire_within(within))
}

fn to_utc(timestamp: i64) -> Result<DateTime<Utc>, ApnsError> {
    Utc.timestamp_opt(timestamp, 0).single().ok_or_else(|| {
        ApnsError::Certificate(format!("validity timestamp {timestamp} out of range"))
    })
}
