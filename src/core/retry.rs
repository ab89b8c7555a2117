// ─── Retry Policy ───
// Re-runs a fallible async operation with exponential backoff.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::core::config::RetryOptions;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::EventBus;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    events: Option<EventBus>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1000))
    }
}

impl RetryPolicy {
    /// `max_attempts` counts the first try; zero is treated as one.
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            events: None,
        }
    }

    pub fn from_options(options: &RetryOptions) -> Self {
        Self::new(options.max_attempts, options.initial_delay())
    }

    /// Also report each retry on the user-visible log channel.
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before retry number `retry` (0-based): `initial * 2^retry`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.initial_delay.saturating_mul(1u32 << retry.min(16))
    }

    /// Run `operation` until it succeeds or attempts are exhausted. The last
    /// error is returned unchanged. Hard failures such as `Cancelled` are never
    /// retried.
    pub async fn run<F, Fut, T>(&self, name: &str, mut operation: F) -> LauncherResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = LauncherResult<T>>,
    {
        let mut attempt: u32 = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_hard_failure() => return Err(e),
                Err(e) if attempt >= self.max_attempts => {
                    debug!("{}: giving up after {} attempts", name, attempt);
                    return Err(e);
                }
                Err(e) => {
                    let left = self.max_attempts - attempt;
                    let delay = self.delay_for(attempt - 1);
                    warn!(
                        "{} failed: {}. Retry ({} left) in {:?}",
                        name, e, left, delay
                    );
                    if let Some(events) = &self.events {
                        events.log(format!("{} failed, retrying ({} left)...", name, left));
                    }
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
