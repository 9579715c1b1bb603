use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info};

use super::StoreError;
use crate::{Error, Result};

/// Bounded exponential backoff: after failed attempt `n` the delay is
/// `base^n` seconds plus up to one second of jitter.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base: f64,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let backoff = self.base.powi(attempt as i32);
        let jitter = if self.jitter {
            rand::thread_rng().gen_range(0.0..1.0)
        } else {
            0.0
        };
        Duration::from_secs_f64(backoff + jitter)
    }
}

/// Runs `op` until it succeeds, fails with a non-retryable error, or
/// `max_attempts` is reached. `op` receives the 1-based attempt number.
pub async fn with_retries<F, Fut, T>(policy: &RetryPolicy, what: &str, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = std::result::Result<T, StoreError>>,
{
    let mut attempt = 0;

    while attempt < policy.max_attempts {
        attempt += 1;
        info!("{} (attempt {})", what, attempt);

        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() => {
                error!("{} failed on attempt {}: {}", what, attempt, e);
                if attempt < policy.max_attempts {
                    let delay = policy.delay_for_attempt(attempt);
                    info!("Retrying in {:.2} seconds...", delay.as_secs_f64());
                    sleep(delay).await;
                }
            }
            Err(e) => {
                error!("{} failed with a non-retryable error: {}", what, e);
                return Err(Error::Store(e));
            }
        }
    }

    Err(Error::UploadExhausted { attempts: attempt })
}
