/// Integration tests for the certificate-backed APNs source
use chrono::{TimeZone, Utc};
use nova_apns_shared::{will_expire_within, ApnsConfig, CertificateInfo, CertificateSource};
use push_credentials::{
    CredentialRefreshManager, CredentialSource, FailureKind, RefreshConfig, RenewalOutcome,
};
use rcgen::{date_time_ymd, CertificateParams, KeyPair};
use serial_test::serial;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

struct Identity {
    cert_pem: String,
    key_pem: String,
}

fn identity(not_before: (i32, u8, u8), not_after: (i32, u8, u8)) -> Identity {
    let mut params = CertificateParams::new(vec!["push.example.com".to_string()]).unwrap();
    params.not_before = date_time_ymd(not_before.0, not_before.1, not_before.2);
    params.not_after = date_time_ymd(not_after.0, not_after.1, not_after.2);
    let key = KeyPair::generate().unwrap();
    let cert = params.self_signed(&key).unwrap();
    Identity {
        cert_pem: cert.pem(),
        key_pem: key.serialize_pem(),
    }
}

fn write_identity(dir: &Path, id: &Identity) -> ApnsConfig {
    let cert_path = dir.join("apns-cert.pem");
    let key_path = dir.join("apns-key.pem");
    std::fs::write(&cert_path, &id.cert_pem).unwrap();
    std::fs::write(&key_path, &id.key_pem).unwrap();

    ApnsConfig::new(
        cert_path.to_string_lossy().into_owned(),
        key_path.to_string_lossy().into_owned(),
        "com.nova.app".to_string(),
        false,
    )
}

fn failure_kind<T>(outcome: RenewalOutcome<T>) -> FailureKind {
    match outcome {
        RenewalOutcome::TransientFailure(failure) => failure.kind,
        RenewalOutcome::Success(_) => panic!("expected a failed renewal"),
    }
}

#[tokio::test]
async fn test_renew_loads_certificate_and_expiry() {
    let dir = TempDir::new().unwrap();
    let config = write_identity(dir.path(), &identity((2020, 1, 1), (2045, 3, 1)));
    let source = CertificateSource::new(config).unwrap();

    assert_eq!(source.name(), "apns:com.nova.app");

    let credential = match source.renew().await {
        RenewalOutcome::Success(credential) => credential,
        RenewalOutcome::TransientFailure(failure) => panic!("renewal failed: {failure}"),
    };

    assert_eq!(
        credential.expires_at(),
        Utc.with_ymd_and_hms(2045, 3, 1, 0, 0, 0).unwrap()
    );
    assert!(credential.value().cert_pem.contains("BEGIN CERTIFICATE"));
    assert!(credential.value().key_pem.contains("PRIVATE KEY"));
    assert!(!format!("{:?}", credential.value()).contains("BEGIN"));
}

#[tokio::test]
async fn test_missing_file_is_io_failure() {
    let config = ApnsConfig::new(
        "/nonexistent/apns-cert.pem".to_string(),
        "/nonexistent/apns-key.pem".to_string(),
        "com.nova.app".to_string(),
        false,
    );
    let source = CertificateSource::new(config).unwrap();

    assert_eq!(failure_kind(source.renew().await), FailureKind::Io);
}

#[tokio::test]
async fn test_expired_certificate_is_rejected() {
    let dir = TempDir::new().unwrap();
    let config = write_identity(dir.path(), &identity((2019, 1, 1), (2020, 1, 1)));
    let source = CertificateSource::new(config).unwrap();

    assert_eq!(failure_kind(source.renew().await), FailureKind::Rejected);
}

#[tokio::test]
async fn test_corrupt_key_is_rejected() {
    let dir = TempDir::new().unwrap();
    let config = write_identity(dir.path(), &identity((2020, 1, 1), (2045, 3, 1)));
    std::fs::write(&config.private_key_path, "garbage").unwrap();
    let source = CertificateSource::new(config).unwrap();

    assert_eq!(failure_kind(source.renew().await), FailureKind::Rejected);
}

#[tokio::test]
async fn test_key_from_another_identity_is_rejected() {
    let dir = TempDir::new().unwrap();
    let current = identity((2020, 1, 1), (2045, 3, 1));
    let rotated = identity((2020, 1, 1), (2046, 3, 1));
    let config = write_identity(dir.path(), &current);
    std::fs::write(&config.private_key_path, &rotated.key_pem).unwrap();
    let source = CertificateSource::new(config).unwrap();

    assert_eq!(failure_kind(source.renew().await), FailureKind::Rejected);
}

#[test]
fn test_empty_paths_rejected_at_construction() {
    let config = ApnsConfig::new(
        String::new(),
        "/tmp/key.pem".to_string(),
        "com.nova.app".to_string(),
        false,
    );

    assert!(CertificateSource::new(config).is_err());
}

#[test]
fn test_will_expire_within_pem() {
    let far = identity((2020, 1, 1), (2045, 3, 1));
    let past = identity((2019, 1, 1), (2020, 1, 1));

    assert!(!will_expire_within(&far.cert_pem, 30 * DAY).unwrap());
    assert!(will_expire_within(&far.cert_pem, 365 * 100 * DAY).unwrap());
    assert!(will_expire_within(&past.cert_pem, Duration::ZERO).unwrap());
    assert!(will_expire_within("not a certificate", DAY).is_err());
}

#[test]
#[serial]
fn test_expiry_check_ignores_host_timezone() {
    let id = identity((2020, 1, 1), (2030, 6, 15));
    let now = Utc.with_ymd_and_hms(2030, 6, 14, 12, 0, 0).unwrap();
    let original = std::env::var("TZ").ok();

    let mut answers = Vec::new();
    for tz in ["UTC", "America/Los_Angeles", "Asia/Kolkata", "Pacific/Kiritimati"] {
        std::env::set_var("TZ", tz);
        let info = CertificateInfo::from_pem(&id.cert_pem).unwrap();
        answers.push((
            info.not_after,
            info.will_expire_within_at(Duration::from_secs(11 * 60 * 60), now),
            info.will_expire_within_at(Duration::from_secs(12 * 60 * 60), now),
        ));
    }

    match original {
        Some(tz) => std::env::set_var("TZ", tz),
        None => std::env::remove_var("TZ"),
    }

    let expected = (Utc.with_ymd_and_hms(2030, 6, 15, 0, 0, 0).unwrap(), false, true);
    assert!(answers.iter().all(|answer| *answer == expected));
}

#[tokio::test]
async fn test_manager_picks_up_rotated_certificate() {
    let dir = TempDir::new().unwrap();
    let config = write_identity(dir.path(), &identity((2020, 1, 1), (2044, 1, 1)));
    let source = CertificateSource::new(config).unwrap();

    let refresh = RefreshConfig {
        refresh_interval: Some(Duration::from_millis(100)),
        min_refresh_interval: Duration::from_millis(10),
        ..RefreshConfig::default()
    };
    let manager = CredentialRefreshManager::start(source, refresh).await.unwrap();
    let mut updates = manager.subscribe();

    let first_expiry = manager.current_credential().expires_at();
    assert_eq!(first_expiry, Utc.with_ymd_and_hms(2044, 1, 1, 0, 0, 0).unwrap());

    write_identity(dir.path(), &identity((2020, 1, 1), (2046, 1, 1)));

    let rotated = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            updates.changed().await.unwrap();
            let expiry = updates.borrow_and_update().expires_at();
            if expiry != first_expiry {
                return expiry;
            }
        }
    })
    .await
    .expect("rotated certificate was not picked up");

    assert_eq!(rotated, Utc.with_ymd_and_hms(2046, 1, 1, 0, 0, 0).unwrap());
    assert_eq!(manager.current_credential().expires_at(), rotated);

    manager.shutdown().await;
}
