//! Renewal trigger based on time remaining before expiry.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Returns true when `expires_at` falls within `lookahead` of `now`.
///
/// An `expires_at` in the past always returns true.
pub fn should_renew(expires_at: DateTime<Utc>, now: DateTime<Utc>, lookahead: Duration) -> bool {
    match now.checked_add_signed(to_chrono(lookahead)) {
        Some(deadline) => expires_at <= deadline,
        // lookahead reaches past the representable range
        None => true,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    lookahead: Duration,
}

impl ExpiryPolicy {
    pub fn new(lookahead: Duration) -> Self {
        Self { lookahead }
    }

    pub fn lookahead(&self) -> Duration {
        self.lookahead
    }

    pub fn should_renew(&self, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        should_renew(expires_at, now, self.lookahead)
    }

    /// How long to wait from `now` until `should_renew` turns true.
    pub fn renew_delay(&self, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
        let Some(renew_at) = expires_at.checked_sub_signed(to_chrono(self.lookahead)) else {
            return Duration::ZERO;
        };
        (renew_at - now).to_std().unwrap_or(Duration::ZERO)
    }
}

pub(crate) fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let now = at(1_000);
        assert!(should_renew(at(1_060), now, Duration::from_secs(60)));
        assert!(!should_renew(at(1_061), now, Duration::from_secs(60)));
    }

    #[test]
    fn test_past_expiry_renews_immediately() {
        let now = at(1_000);
        assert!(should_renew(at(10), now, Duration::ZERO));

        let policy = ExpiryPolicy::new(Duration::from_secs(300));
        assert_eq!(policy.renew_delay(at(10), now), Duration::ZERO);
    }

    #[test]
    fn test_renew_delay_subtracts_lookahead() {
        let policy = ExpiryPolicy::new(Duration::from_secs(300));
        let now = at(0);
        assert_eq!(policy.renew_delay(at(3_600), now), Duration::from_secs(3_300));
        assert_eq!(policy.renew_delay(at(200), now), Duration::ZERO);
    }

    #[test]
    fn test_huge_lookahead_always_renews() {
        assert!(should_renew(at(i32::MAX as i64), at(0), Duration::MAX));
    }

    proptest! {
        #[test]
        fn prop_should_renew_matches_difference(
            now in 0i64..4_000_000_000,
            offset in -1_000_000i64..1_000_000,
            lookahead in 0u64..1_000_000,
        ) {
            let expires_at = at(now + offset);
            let expected = offset <= lookahead as i64;
            prop_assert_eq!(
                should_renew(expires_at, at(now), Duration::from_secs(lookahead)),
                expected
            );
        }

        #[test]
        fn prop_renew_delay_lands_on_trigger(
            offset in 0i64..1_000_000,
            lookahead in 0u64..1_000_000,
        ) {
            let policy = ExpiryPolicy::new(Duration::from_secs(lookahead));
            let now = at(1_700_000_000);
            let expires_at = at(1_700_000_000 + offset);

            let delay = policy.renew_delay(expires_at, now);
            let wake = now + chrono::Duration::from_std(delay).unwrap();

            prop_assert!(policy.should_renew(expires_at, wake));
            if !delay.is_zero() {
                let before = wake - chrono::Duration::seconds(1);
                prop_assert!(!policy.should_renew(expires_at, before));
            }
        }
    }
}
