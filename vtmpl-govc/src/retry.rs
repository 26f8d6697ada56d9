//! Bounded retries with a fixed backoff.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use crate::error::Result;

pub const DEFAULT_MAX_RETRIES: u32 = 5;
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(5);

/// Retries an operation up to `max_retries` times, sleeping `backoff` in between.
#[derive(Debug, Clone)]
pub struct Retrier {
    max_retries: u32,
    backoff: Duration,
}

impl Retrier {
    pub fn new(max_retries: u32, backoff: Duration) -> Self {
        Self {
            max_retries: max_retries.max(1),
            backoff,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Run `op` until it succeeds or the attempts are used up.
    ///
    /// The error of the last attempt is returned.
    pub async fn retry<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= self.max_retries => return Err(e),
                Err(e) => {
                    warn!(
                        attempt,
                        max_retries = self.max_retries,
                        error = %e,
                        "govc call failed, retrying"
                    );
                    attempt += 1;
                    sleep(self.backoff).await;
                }
            }
        }
    }
}

impl Default for Retrier {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_BACKOFF)
    }
}
