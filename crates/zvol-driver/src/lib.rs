// Allow unused assignments for diagnostic fields - they're used by the thiserror/miette macros
#![allow(unused_assignments)]

pub mod classify;
pub mod command;
pub mod dataset;
pub mod driver;
pub mod error;
pub mod mock;
pub mod retry;
pub mod types;

// Re-export primary types
pub use classify::{classify_error, classify_stderr, CommandOutcome, FailureKind};
pub use command::{CommandExecutor, CommandOutput, ProcessExecutor};
pub use driver::{VolumeDriver, ZfsVolumeDriver};
pub use error::{DriverError, Result};
pub use mock::{Invocation, MockExecutor, RecordingSleeper};
pub use retry::{Backoff, RetryPolicy, Sleeper, ThreadSleeper};
pub use types::{DriverConfig, Snapshot, Volume};
