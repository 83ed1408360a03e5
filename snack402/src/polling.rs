//! Fixed-interval polling for remote signing services.
//!
//! Remote wallets sign asynchronously: the client submits a request, then asks
//! for its status until a signature appears or the service gives up. Polling is
//! sequential with a fixed interval and no backoff, and there is no sleep after
//! the final attempt.

use std::future::Future;
use std::time::Duration;

#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::error::SigningError;

/// Status of a pending remote operation, as reported by one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus<T> {
    /// The operation finished with a result.
    Ready(T),
    /// Not finished yet.
    Pending,
    /// The service reported a terminal failure.
    Failed(String),
}

/// How often and how long to poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay between consecutive polls.
    pub interval: Duration,
    /// Number of polls before giving up. Values below 1 are treated as 1.
    pub max_attempts: u32,
}

impl PollConfig {
    /// Default delay between polls.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);
    /// Default number of polls.
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 20;

    /// Creates a polling configuration.
    #[must_use]
    pub const fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Upper bound of time spent sleeping, excluding request latency.
    #[must_use]
    pub fn max_wait(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1)
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INTERVAL, Self::DEFAULT_MAX_ATTEMPTS)
    }
}

/// Polls `check` until it reports [`PollStatus::Ready`].
///
/// `check` receives the 1-based attempt number.
///
/// # Errors
///
/// - [`SigningError::Rejected`] as soon as a poll reports [`PollStatus::Failed`]
/// - [`SigningError::Timeout`] once `max_attempts` polls stayed pending
/// - any error returned by `check` itself, unchanged
#[cfg_attr(feature = "telemetry", instrument(name = "snack402.poll", skip_all, fields(max_attempts = config.max_attempts)))]
pub async fn poll_until<T, F, Fut>(config: PollConfig, mut check: F) -> Result<T, SigningError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<PollStatus<T>, SigningError>>,
{
    let attempts = config.max_attempts.max(1);
    for attempt in 1..=attempts {
        match check(attempt).await? {
            PollStatus::Ready(value) => {
                #[cfg(feature = "telemetry")]
                tracing::debug!(attempt, "Remote operation completed");
                return Ok(value);
            }
            PollStatus::Failed(reason) => {
                #[cfg(feature = "telemetry")]
                tracing::warn!(attempt, %reason, "Remote operation failed");
                return Err(SigningError::Rejected(reason));
            }
            PollStatus::Pending => {
                #[cfg(feature = "telemetry")]
                tracing::trace!(attempt, "Remote operation still pending");
                if attempt < attempts {
                    tokio::time::sleep(config.interval).await;
                }
            }
        }
    }
    Err(SigningError::Timeout { attempts })
}
