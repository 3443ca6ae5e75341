//! Resubmission of write transactions that lost an MVCC race.

use crate::error::{ConfigError, ContractError, ErrorKind, LedgerError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Retry policy for write submissions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay after attempt `n` is `base_delay * n`.
    #[serde(rename = "base_delay_ms", with = "duration_ms")]
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
        }
    }
}

impl RetryConfig {
    /// Delay before the attempt following `attempt` (1-indexed).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid("retry.max_attempts must be at least 1".into()));
        }
        Ok(())
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

/// Blocking delay between attempts.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Sleeps the calling thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Records requested delays without sleeping.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.slept.lock().push(duration);
    }
}

/// Errors that can report a lost write race.
pub trait ConflictSignal {
    fn is_write_conflict(&self) -> bool;
}

impl ConflictSignal for ContractError {
    fn is_write_conflict(&self) -> bool {
        self.kind() == ErrorKind::WriteConflict
    }
}

impl ConflictSignal for LedgerError {
    fn is_write_conflict(&self) -> bool {
        LedgerError::is_write_conflict(self)
    }
}

/// Runs a write operation, resubmitting it on write conflicts.
///
/// Each attempt must be a complete re-execution (new transaction, fresh
/// reads). Any error other than a write conflict is returned immediately.
#[derive(Clone)]
pub struct RetryingSubmitter {
    config: RetryConfig,
    sleeper: Arc<dyn Sleeper>,
}

impl RetryingSubmitter {
    pub fn new(config: RetryConfig) -> Self {
        Self::with_sleeper(config, Arc::new(ThreadSleeper))
    }

    pub fn with_sleeper(config: RetryConfig, sleeper: Arc<dyn Sleeper>) -> Self {
        Self { config, sleeper }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Run `attempt_fn` (called with the 1-indexed attempt number) until it
    /// succeeds, fails with a non-conflict error, or the attempts run out.
    /// Exhaustion returns the last conflict.
    pub fn submit<T, E, F>(&self, operation: &str, mut attempt_fn: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Result<T, E>,
        E: ConflictSignal + fmt::Display,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let err = match attempt_fn(attempt) {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!(operation, attempt, "submitted after retry");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if !err.is_write_conflict() {
                return Err(err);
            }
            if attempt >= max_attempts {
                tracing::error!(operation, attempts = attempt, error = %err, "write conflict retries exhausted");
                return Err(err);
            }

            let delay = self.config.delay_after(attempt);
            tracing::warn!(
                operation,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "write conflict, retrying"
            );
            self.sleeper.sleep(delay);
            attempt += 1;
        }
    }
}

impl Default for RetryingSubmitter {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

impl fmt::Debug for RetryingSubmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryingSubmitter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
