//! Client-side write submission.

mod retry;

pub use retry::{ConflictSignal, RecordingSleeper, RetryConfig, RetryingSubmitter, Sleeper, ThreadSleeper};
