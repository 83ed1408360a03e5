//! Unix timestamps for payment authorization windows.
//!
//! An EIP-3009 authorization is only valid between `validAfter` and
//! `validBefore`. [`AuthorizationWindow`] computes both from the current time
//! and a requirement's `maxTimeoutSeconds`.

use std::fmt::{Display, Formatter};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// How far `validAfter` is backdated to tolerate clock skew between the client
/// and the settling chain.
pub const VALID_AFTER_SKEW: Duration = Duration::from_secs(600);

/// Seconds since the Unix epoch.
///
/// Serialized as a stringified integer, the way JavaScript clients expect
/// 64-bit values:
///
/// ```json
/// "1699999999"
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Ord, Eq, Hash)]
pub struct UnixTimestamp(u64);

impl UnixTimestamp {
    /// Creates a timestamp from raw seconds.
    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// The current system time.
    ///
    /// A clock set before the epoch reads as zero.
    #[must_use]
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());
        Self(secs)
    }

    /// Raw seconds since the epoch.
    #[must_use]
    pub const fn as_secs(&self) -> u64 {
        self.0
    }

    /// `self + duration`, saturating at `u64::MAX`.
    #[must_use]
    pub const fn saturating_add(self, duration: Duration) -> Self {
        Self(self.0.saturating_add(duration.as_secs()))
    }

    /// `self - duration`, saturating at zero.
    #[must_use]
    pub const fn saturating_sub(self, duration: Duration) -> Self {
        Self(self.0.saturating_sub(duration.as_secs()))
    }
}

impl Serialize for UnixTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for UnixTimestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse::<u64>()
            .map(Self)
            .map_err(|_| serde::de::Error::custom("timestamp must be a non-negative integer"))
    }
}

impl Display for UnixTimestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The `[validAfter, validBefore]` interval of an authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorizationWindow {
    /// Earliest time the authorization can be executed.
    pub valid_after: UnixTimestamp,
    /// Latest time the authorization remains valid.
    pub valid_before: UnixTimestamp,
}

impl AuthorizationWindow {
    /// Window starting [`VALID_AFTER_SKEW`] before `now` and ending
    /// `max_timeout_seconds` after it.
    #[must_use]
    pub const fn starting_at(now: UnixTimestamp, max_timeout_seconds: u64) -> Self {
        Self {
            valid_after: now.saturating_sub(VALID_AFTER_SKEW),
            valid_before: now.saturating_add(Duration::from_secs(max_timeout_seconds)),
        }
    }

    /// Window anchored at the current time.
    #[must_use]
    pub fn from_now(max_timeout_seconds: u64) -> Self {
        Self::starting_at(UnixTimestamp::now(), max_timeout_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_bounds() {
        let window = AuthorizationWindow::starting_at(UnixTimestamp::from_secs(1_000_000), 60);
        assert_eq!(window.valid_after.as_secs(), 999_400);
        assert_eq!(window.valid_before.as_secs(), 1_000_060);
    }

    #[test]
    fn test_window_saturates_near_epoch() {
        let window = AuthorizationWindow::starting_at(UnixTimestamp::from_secs(100), 30);
        assert_eq!(window.valid_after.as_secs(), 0);
        assert_eq!(window.valid_before.as_secs(), 130);
    }

    #[test]
    fn test_serializes_as_string() {
        let ts = UnixTimestamp::from_secs(1_699_999_999);
        assert_eq!(serde_json::to_string(&ts).unwrap(), "\"1699999999\"");
        let back: UnixTimestamp = serde_json::from_str("\"1699999999\"").unwrap();
        assert_eq!(back, ts);
        assert!(serde_json::from_str::<UnixTimestamp>("\"-1\"").is_err());
    }
}
