use std::fmt;

use async_trait::async_trait;
use chrono::Utc;
use push_credentials::{Credential, CredentialSource, RenewalFailure, RenewalOutcome};
use rcgen::KeyPair;
use tracing::{debug, warn};

use crate::certificate::CertificateInfo;
use crate::config::ApnsConfig;
use crate::error::ApnsError;

/// Client identity presented to the APNs gateway
#[derive(Clone)]
pub struct ApnsIdentity {
    pub cert_pem: String,
    pub key_pem: String,
    pub info: CertificateInfo,
}

impl fmt::Debug for ApnsIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApnsIdentity")
            .field("subject", &self.info.subject)
            .field("serial", &self.info.serial)
            .field("not_after", &self.info.not_after)
            .field("key_pem", &"<redacted>")
            .finish()
    }
}

/// Certificate-backed APNs credential source
///
/// Every renewal re-reads the certificate and key from disk, so rotating the
/// files is enough for the refresh manager to pick up the new identity.
pub struct CertificateSource {
    config: ApnsConfig,
    name: String,
}

impl CertificateSource {
    pub fn new(config: ApnsConfig) -> Result<Self, ApnsError> {
        config.validate()?;
        let name = format!("apns:{}", config.bundle_id);
        Ok(Self { config, name })
    }

    pub fn config(&self) -> &ApnsConfig {
        &self.config
    }

    async fn load(&self) -> Result<Credential<ApnsIdentity>, RenewalFailure> {
        let cert_pem = read(&self.config.certificate_path).await?;
        let key_pem = read(&self.config.private_key_path).await?;

        let info = CertificateInfo::from_pem(&cert_pem)
            .map_err(|e| RenewalFailure::rejected(e.to_string()))?;
        check_private_key(&key_pem, &info).map_err(|e| RenewalFailure::rejected(e.to_string()))?;

        let now = Utc::now();
        if info.is_expired_at(now) {
            return Err(RenewalFailure::rejected(format!(
                "certificate {} expired at {}",
                info.serial, info.not_after
            )));
        }
        if info.is_not_yet_valid_at(now) {
            return Err(RenewalFailure::rejected(format!(
                "certificate {} not valid before {}",
                info.serial, info.not_before
            )));
        }

        if info.will_expire_within_at(self.config.expiry_warning, now) {
            warn!(
                source = %self.name,
                subject = %info.subject,
                expires_at = %info.not_after,
                "APNs certificate expiring soon, rotate the file on disk"
            );
        } else {
            debug!(
                source = %self.name,
                subject = %info.subject,
                expires_at = %info.not_after,
                "Loaded APNs certificate"
            );
        }

        let expires_at = info.not_after;
        Ok(Credential::new(
            ApnsIdentity {
                cert_pem,
                key_pem,
                info,
            },
            expires_at,
        ))
    }
}

#[async_trait]
impl CredentialSource for CertificateSource {
    type Secret = ApnsIdentity;

    fn name(&self) -> &str {
        &self.name
    }

    async fn renew(&self) -> RenewalOutcome<ApnsIdentity> {
        self.load().await.into()
    }
}

async fn read(path: &str) -> Result<String, RenewalFailure> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| RenewalFailure::io(format!("failed to read {path}: {e}")))
}

/// The key must be an unencrypted PKCS#8 key whose public half is the leaf's.
fn check_private_key(key_pem: &str, leaf: &CertificateInfo) -> Result<(), ApnsError> {
    let blocks = pem::parse_many(key_pem).map_err(|e| ApnsError::Pem(e.to_string()))?;
    match blocks.iter().find(|b| b.tag().ends_with("PRIVATE KEY")) {
        Some(block) if block.tag() == "ENCRYPTED PRIVATE KEY" => {
            return Err(ApnsError::PrivateKey(
                "encrypted private keys are not supported".to_string(),
            ))
        }
        Some(_) => {}
        None => return Err(ApnsError::PrivateKey("no PRIVATE KEY block found".to_string())),
    }

    let key = KeyPair::from_pem(key_pem).map_err(|e| ApnsError::PrivateKey(e.to_string()))?;
    if key.public_key_raw() != leaf.public_key.as_slice() {
        return Err(ApnsError::PrivateKey(format!(
            "key does not match certificate {}",
            leaf.serial
        )));
    }
    Ok(())
}
