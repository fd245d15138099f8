use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the wait grows between busy retries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    /// Same interval before every retry
    #[default]
    Fixed,
    /// Interval doubles with each retry
    Exponential,
}

/// Bounded wait-and-retry for destroys that report a busy dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total destroy attempts, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_interval")]
    pub interval: Duration,

    #[serde(default)]
    pub backoff: Backoff,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_interval() -> Duration {
    Duration::from_secs(15)
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            interval: default_interval(),
            backoff: Backoff::default(),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, interval: Duration, backoff: Backoff) -> Self {
        Self {
            max_attempts,
            interval,
            backoff,
        }
    }

    /// Whether another attempt may follow `attempts_made` failed ones
    pub fn allows_retry(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts
    }

    /// Wait before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.interval,
            Backoff::Exponential => {
                let factor = 2u32.checked_pow(retry.saturating_sub(1)).unwrap_or(u32::MAX);
                self.interval.saturating_mul(factor)
            }
        }
    }
}

/// Blocking pause between retries
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Sleeps on the calling thread
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
