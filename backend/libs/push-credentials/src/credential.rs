use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

/// A renewable secret with a known expiry instant.
///
/// Credentials are immutable: a renewal produces a new `Credential` which
/// replaces the previous one wholesale. Readers share them as
/// `Arc<Credential<T>>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential<T> {
    value: T,
    expires_at: DateTime<Utc>,
    issued_at: DateTime<Utc>,
}

impl<T> Credential<T> {
    pub fn new(value: T, expires_at: DateTime<Utc>) -> Self {
        Self::with_issued_at(value, expires_at, Utc::now())
    }

    pub fn with_issued_at(value: T, expires_at: DateTime<Utc>, issued_at: DateTime<Utc>) -> Self {
        Self {
            value,
            expires_at,
            issued_at,
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// Time left before expiry, zero once expired
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).to_std().unwrap_or(Duration::ZERO)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Coarse classification of a failed renewal, used for log fields and metric labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Network or filesystem error talking to the issuer
    Io,
    /// The issuer answered but refused to issue
    Rejected,
    /// The renewal call did not finish in time
    Timeout,
    /// The issuer answered with something we could not interpret
    InvalidResponse,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Io => "io",
            Self::Rejected => "rejected",
            Self::Timeout => "timeout",
            Self::InvalidResponse => "invalid_response",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cause of a transient renewal failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct RenewalFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl RenewalFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Io, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Rejected, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(FailureKind::InvalidResponse, message)
    }

    pub fn timeout(after: Duration) -> Self {
        Self::new(
            FailureKind::Timeout,
            format!("renewal did not complete within {after:?}"),
        )
    }
}

/// Result of one renewal attempt.
///
/// There is no permanent-failure variant: giving up is decided by the
/// backoff strategy, never by a single attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenewalOutcome<T> {
    Success(Credential<T>),
    TransientFailure(RenewalFailure),
}

impl<T> RenewalOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

impl<T> From<Result<Credential<T>, RenewalFailure>> for RenewalOutcome<T> {
    fn from(result: Result<Credential<T>, RenewalFailure>) -> Self {
        match result {
            Ok(credential) => Self::Success(credential),
            Err(failure) => Self::TransientFailure(failure),
        }
    }
}
