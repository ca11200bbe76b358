//! Politeness limiter for page fetching.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;

use crate::config::FetcherConfig;

/// Caps concurrent requests and enforces a minimum delay between them,
/// so a paused-and-resumed job never bursts the origin.
pub struct FetchLimiter {
    semaphore: Arc<Semaphore>,
    min_delay: Duration,
    last_request: tokio::sync::Mutex<Instant>,
}

impl FetchLimiter {
    pub fn new(max_concurrent: usize, min_delay_ms: u64) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            min_delay: Duration::from_millis(min_delay_ms),
            last_request: tokio::sync::Mutex::new(Instant::now()),
        }
    }

    pub fn from_config(config: &FetcherConfig) -> Self {
        Self::new(config.max_concurrent, config.min_delay_ms)
    }

    /// Wait until a request is allowed. The returned guard frees the
    /// concurrency slot on drop.
    pub async fn acquire(&self) -> FetchPermit {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("limiter semaphore never closed");

        {
            let mut last = self.last_request.lock().await;
            let elapsed = last.elapsed();
            if elapsed < self.min_delay {
                tokio::time::sleep(self.min_delay - elapsed).await;
            }
            *last = Instant::now();
        }

        FetchPermit { _permit: permit }
    }
}

/// Held for the duration of one page request.
pub struct FetchPermit {
    _permit: tokio::sync::OwnedSemaphorePermit,
}
