use anyhow::Context;
use nova_apns_shared::{ApnsIdentity, CertificateSource};
use nova_fcm_shared::{AccessToken, OAuth2TokenSource, ServiceAccountKey};
use push_credentials::{CredentialHandle, CredentialRefreshManager, RefreshError};
use std::future::pending;
use tracing::info;

use crate::config::Config;

/// Refresh managers for every configured push gateway
pub struct PushCredentials {
    pub apns: Option<CredentialRefreshManager<ApnsIdentity>>,
    pub fcm: Option<CredentialRefreshManager<AccessToken>>,
}

impl PushCredentials {
    /// Start one manager per gateway, returning once each holds a valid credential.
    pub async fn start(config: &Config) -> anyhow::Result<Self> {
        let apns = match &config.apns {
            Some(section) => {
                let source = CertificateSource::new(section.gateway.clone())?;
                info!(endpoint = section.gateway.endpoint(), "Starting APNs credential refresh");
                Some(
                    CredentialRefreshManager::start(source, section.refresh.clone())
                        .await
                        .context("failed to start APNs credential refresh")?,
                )
            }
            None => None,
        };

        let fcm = match &config.fcm {
            Some(section) => {
                let key = ServiceAccountKey::from_file(&section.service_account_path)?;
                let mut source = OAuth2TokenSource::new(key)?;
                if let Some(scope) = &section.scope {
                    source = source.with_scope(scope.clone());
                }
                info!("Starting FCM credential refresh");
                Some(
                    CredentialRefreshManager::start(source, section.refresh.clone())
                        .await
                        .context("failed to start FCM credential refresh")?,
                )
            }
            None => None,
        };

        Ok(Self { apns, fcm })
    }

    pub fn apns_handle(&self) -> Option<CredentialHandle<ApnsIdentity>> {
        self.apns.as_ref().map(CredentialRefreshManager::handle)
    }

    pub fn fcm_handle(&self) -> Option<CredentialHandle<AccessToken>> {
        self.fcm.as_ref().map(CredentialRefreshManager::handle)
    }

    /// Resolves when any manager stops; `Some` if it gave up on renewal.
    pub async fn first_stop(&self) -> Option<RefreshError> {
        let apns = async {
            match &self.apns {
                Some(manager) => manager.stopped().await,
                None => pending().await,
            }
        };
        let fcm = async {
            match &self.fcm {
                Some(manager) => manager.stopped().await,
                None => pending().await,
            }
        };

        tokio::select! {
            err = apns => err,
            err = fcm => err,
        }
    }

    pub async fn shutdown(&self) {
        if let Some(manager) = &self.apns {
            manager.shutdown().await;
        }
        if let Some(manager) = &self.fcm {
            manager.shutdown().await;
        }
    }
}
