use anyhow::{bail, Context};
use nova_apns_shared::ApnsConfig;
use push_credentials::{presets, RefreshConfig};

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub apns: Option<ApnsSection>,
    pub fcm: Option<FcmSection>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: String,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct ApnsSection {
    pub gateway: ApnsConfig,
    pub refresh: RefreshConfig,
}

#[derive(Debug, Clone)]
pub struct FcmSection {
    pub service_account_path: String,
    pub scope: Option<String>,
    pub refresh: RefreshConfig,
}

impl Config {
    /// Each gateway is enabled by the presence of its credential path
    /// (`APNS_CERTIFICATE_PATH`, `FCM_SERVICE_ACCOUNT_PATH`). Refresh tuning
    /// is read from `APNS_REFRESH_*` and `FCM_REFRESH_*` on top of the presets.
    pub fn from_env() -> anyhow::Result<Self> {
        let log_format = match std::env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("text") | Err(_) => LogFormat::Text,
            Ok(other) => bail!("LOG_FORMAT must be text or json, got {other:?}"),
        };

        let apns = if std::env::var("APNS_CERTIFICATE_PATH").is_ok() {
            Some(ApnsSection {
                gateway: ApnsConfig::from_env().context("invalid APNs configuration")?,
                refresh: RefreshConfig::from_env_with(
                    "APNS_REFRESH",
                    presets::apns_certificate_config(),
                )
                .context("invalid APNS_REFRESH_* configuration")?,
            })
        } else {
            None
        };

        let fcm = match std::env::var("FCM_SERVICE_ACCOUNT_PATH") {
            Ok(service_account_path) => Some(FcmSection {
                service_account_path,
                scope: std::env::var("FCM_SCOPE").ok(),
                refresh: RefreshConfig::from_env_with("FCM_REFRESH", presets::fcm_token_config())
                    .context("invalid FCM_REFRESH_* configuration")?,
            }),
            Err(_) => None,
        };

        if apns.is_none() && fcm.is_none() {
            bail!("no push gateway configured: set APNS_CERTIFICATE_PATH and/or FCM_SERVICE_ACCOUNT_PATH");
        }

        Ok(Config {
            app: AppConfig {
                env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
                log_format,
            },
            apns,
            fcm,
        })
    }
}
