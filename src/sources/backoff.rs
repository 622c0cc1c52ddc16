use std::future::Future;
use std::time::Duration;

use log::warn;
use rand::Rng;

use crate::config::BackoffSettings;

use super::FetchError;

/// Bounded exponential backoff with random jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base_delay: Duration,
    pub max_attempts: u32,
    pub max_jitter: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from(&BackoffSettings::default())
    }
}

impl From<&BackoffSettings> for BackoffPolicy {
    fn from(settings: &BackoffSettings) -> Self {
        Self {
            base_delay: Duration::from_millis(settings.base_delay_ms),
            // At least one attempt, or the source is never queried
            max_attempts: settings.max_attempts.max(1),
            max_jitter: Duration::from_millis(settings.max_jitter_ms),
        }
    }
}

impl BackoffPolicy {
    /// `base * 2^attempt + jitter`, where `attempt` is the 0-based index of
    /// the attempt that just failed.
    pub fn delay_with_jitter(&self, attempt: u32, jitter: Duration) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .saturating_add(jitter)
    }

    /// Same as [`Self::delay_with_jitter`] with jitter drawn uniformly from
    /// `[0, max_jitter)`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let max_jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if max_jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::rng().random_range(0..max_jitter_ms))
        };
        self.delay_with_jitter(attempt, jitter)
    }
}

/// Runs `op` until it stops signalling rate limiting, sleeping between
/// attempts according to `policy`.
///
/// Only [`FetchError::RateLimited`] is retried; any other outcome is
/// returned as-is. After `max_attempts` rate-limited attempts the call fails
/// with [`FetchError::RetriesExhausted`]. The sleep only suspends this
/// future, never the caller's other work.
pub async fn retry_rate_limited<T, F, Fut>(
    policy: &BackoffPolicy,
    source: &'static str,
    mut op: F,
) -> Result<T, FetchError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    for attempt in 0..policy.max_attempts {
        match op(attempt).await {
            Err(FetchError::RateLimited { .. }) => {
                // No point sleeping after the final attempt
                if attempt + 1 < policy.max_attempts {
                    let delay = policy.delay(attempt);
                    warn!(
                        "{} rate limited (attempt {}/{}), retrying in {:?}",
                        source,
                        attempt + 1,
                        policy.max_attempts,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
            },
            other => return other,
        }
    }

    Err(FetchError::RetriesExhausted {
        source_name: source,
        attempts: policy.max_attempts,
    })
}
