use std::thread;
use std::time::Duration;

use rand::Rng;

use super::{ServiceError, ServiceResult};

/// Retry configuration for rate-limited calls. Defaults match what the
/// service tolerates in practice: 2 s initial delay, 60 s ceiling, 5 retries
/// per logical call.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub max: Duration,
    pub max_retries: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(2),
            max: Duration::from_secs(60),
            max_retries: 5,
        }
    }
}

/// Per-call retry bookkeeping; fresh for every wrapped call, discarded on
/// success or exhaustion.
struct BackoffState<'a> {
    policy: &'a BackoffPolicy,
    delay: Duration,
    retries: u32,
}

impl<'a> BackoffState<'a> {
    fn new(policy: &'a BackoffPolicy) -> Self {
        Self {
            policy,
            delay: policy.initial,
            retries: 0,
        }
    }

    /// Wait before the next retry, or `None` once the budget is spent.
    /// A suggested wait of zero is authoritative: the service said not to
    /// wait, so only an absent hint falls back to the backoff delay.
    fn next_wait(&mut self, hint: Option<Duration>) -> Option<Duration> {
        if self.retries >= self.policy.max_retries {
            return None;
        }
        let wait = hint.unwrap_or(self.delay);
        self.delay = (self.delay * 2).min(self.policy.max);
        self.retries += 1;
        Some(wait)
    }

    /// Extra pause so concurrent callers drift apart: the (already doubled)
    /// delay scaled by a factor in [0.5, 1.5).
    fn jitter(&self, factor: f64) -> Duration {
        self.delay.mul_f64(factor)
    }
}

/// Run `op`, retrying only on `RateLimited`. Every other error propagates on
/// its first occurrence, untouched.
pub fn call_with_backoff<T, F>(policy: &BackoffPolicy, mut op: F) -> ServiceResult<T>
where
    F: FnMut() -> ServiceResult<T>,
{
    let mut state = BackoffState::new(policy);
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(ServiceError::RateLimited { retry_after }) => {
                let Some(wait) = state.next_wait(retry_after) else {
                    return Err(ServiceError::RetriesExhausted {
                        retries: policy.max_retries,
                    });
                };
                println!(
                    "\nRate limit reached. Waiting for {:.1} seconds before retrying...",
                    wait.as_secs_f64()
                );
                thread::sleep(wait);

                let pause = state.jitter(rand::thread_rng().gen_range(0.5..1.5));
                log::debug!(
                    "backoff retry {}/{}: jitter pause of {:.2}s",
                    state.retries,
                    policy.max_retries,
                    pause.as_secs_f64()
                );
                thread::sleep(pause);
            }
            Err(other) => return Err(other),
        }
    }
}
