use std::sync::Arc;

use crate::credential::RenewalOutcome;

/// Issuer of fresh credentials for one push gateway.
///
/// `renew` performs one round-trip to the issuing authority (OAuth2 token
/// endpoint, certificate store, ...). Ordinary I/O errors and provider
/// rejections are returned as [`RenewalOutcome::TransientFailure`]; a source
/// with malformed configuration must refuse to be constructed instead.
/// Calling `renew` repeatedly must be safe.
#[async_trait::async_trait]
pub trait CredentialSource: Send + Sync + 'static {
    type Secret: Send + Sync + 'static;

    /// Short label used in logs and metrics (e.g. "apns", "fcm")
    fn name(&self) -> &str;

    async fn renew(&self) -> RenewalOutcome<Self::Secret>;
}

#[async_trait::async_trait]
impl<S: CredentialSource> CredentialSource for Arc<S> {
    type Secret = S::Secret;

    fn name(&self) -> &str {
        (**self).name()
    }

    async fn renew(&self) -> RenewalOutcome<Self::Secret> {
        (**self).renew().await
    }
}
