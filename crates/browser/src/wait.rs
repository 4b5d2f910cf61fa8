//! Bounded waiting
//!
//! Pages fill in asynchronously, so a query that finds nothing may succeed a
//! moment later. Waits here re-run a check at a fixed interval until it
//! produces a value or the timeout elapses. The check always runs at least
//! once, even with a zero timeout.

use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitConfig {
    /// Maximum time to keep retrying
    pub timeout: Duration,

    /// Pause between attempts
    pub poll_interval: Duration,
}

impl WaitConfig {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new(timeout, DEFAULT_POLL_INTERVAL)
    }

    /// Check exactly once
    pub fn immediate() -> Self {
        Self::new(Duration::ZERO, DEFAULT_POLL_INTERVAL)
    }
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT, DEFAULT_POLL_INTERVAL)
    }
}

/// Re-run `attempt` until it yields `Some`, fails, or time runs out
///
/// `Ok(None)` means the timeout elapsed. Errors are returned on the spot:
/// a broken session does not heal by waiting.
pub async fn poll_until<T, E, F, Fut>(attempt: F, config: WaitConfig) -> Result<Option<T>, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let start = Instant::now();

    loop {
        if let Some(value) = attempt().await? {
            return Ok(Some(value));
        }

        let elapsed = start.elapsed();
        if elapsed >= config.timeout {
            return Ok(None);
        }

        sleep(config.poll_interval.min(config.timeout - elapsed)).await;
    }
}

/// Wait for a predicate to hold. Returns whether it did before the timeout.
pub async fn wait_for<F, Fut>(condition: F, config: WaitConfig) -> bool
where
    F: Fn() -> Fut,
    Fut: Future<Output = bool>,
{
    let outcome: Result<Option<()>, std::convert::Infallible> = poll_until(
        || {
            let check = condition();
            async move { Ok(check.await.then_some(())) }
        },
        config,
    )
    .await;

    matches!(outcome, Ok(Some(())))
}
