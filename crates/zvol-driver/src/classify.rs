//! Failure classification for zfs command results.
//!
//! All stderr pattern matching lives here. The driver branches on
//! `CommandOutcome` and never inspects diagnostic text itself.

use crate::command::CommandOutput;
use crate::error::{DriverError, Result};

/// Category of a failed command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The target dataset does not exist
    NotFound,
    /// The dataset is held by a concurrent consumer; worth retrying
    Busy,
    /// Anything else. Never retried.
    Other,
}

/// Reason text of a zfs diagnostic
///
/// zfs reports `cannot <verb> '<dataset>': <reason>` on the first line and may
/// list affected datasets on the following ones. Only the reason is kept.
fn reason(stderr: &str) -> &str {
    let first = stderr
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default();
    match first.split_once("': ") {
        Some((_, reason)) => reason,
        None => first,
    }
}

/// Classify zfs diagnostic text
///
/// Dataset names are never matched, so a volume called `busybox` cannot turn
/// a permission error into a retry.
pub fn classify_stderr(stderr: &str) -> FailureKind {
    let lower = reason(stderr).to_ascii_lowercase();
    if lower.contains("does not exist") {
        FailureKind::NotFound
    } else if lower.contains("busy") {
        FailureKind::Busy
    } else {
        FailureKind::Other
    }
}

/// Classify a driver error. Only command failures can be `NotFound` or `Busy`.
pub fn classify_error(err: &DriverError) -> FailureKind {
    match err {
        DriverError::CommandFailed { stderr, .. } => classify_stderr(stderr),
        _ => FailureKind::Other,
    }
}

/// Tagged result of one command invocation
#[derive(Debug)]
pub enum CommandOutcome {
    Ok(CommandOutput),
    NotFound(DriverError),
    Busy(DriverError),
    Failed(DriverError),
}

impl CommandOutcome {
    pub fn from_result(result: Result<CommandOutput>) -> Self {
        match result {
            Ok(output) => Self::Ok(output),
            Err(err) => match classify_error(&err) {
                FailureKind::NotFound => Self::NotFound(err),
                FailureKind::Busy => Self::Busy(err),
                FailureKind::Other => Self::Failed(err),
            },
        }
    }

    /// Back to a plain result; failures carry the original error unmodified.
    pub fn into_result(self) -> Result<CommandOutput> {
        match self {
            Self::Ok(output) => Ok(output),
            Self::NotFound(err) | Self::Busy(err) | Self::Failed(err) => Err(err),
        }
    }
}

impl From<Result<CommandOutput>> for CommandOutcome {
    fn from(result: Result<CommandOutput>) -> Self {
        Self::from_result(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_not_found() {
        assert_eq!(
            classify_stderr("cannot open 'fake_pool/vol001': dataset does not exist"),
            FailureKind::NotFound
        );
    }

    #[test]
    fn test_classify_busy() {
        assert_eq!(
            classify_stderr("cannot destroy 'fake_pool/vol001': dataset is busy"),
            FailureKind::Busy
        );
        assert_eq!(classify_stderr("Device BUSY"), FailureKind::Busy);
    }

    #[test]
    fn test_classify_ignores_quoted_dataset_name() {
        assert_eq!(
            classify_stderr("cannot destroy 'fake_pool/busybox-data': permission denied"),
            FailureKind::Other
        );
        assert_eq!(
            classify_stderr("cannot destroy 'fake_pool/busybox-data': dataset is busy"),
            FailureKind::Busy
        );
        assert_eq!(
            classify_stderr("cannot open 'fake_pool/does not exist yet': permission denied"),
            FailureKind::Other
        );
    }

    #[test]
    fn test_classify_ignores_listed_datasets() {
        let stderr = "cannot destroy 'fake_pool/vol001': filesystem has dependent clones\n\
                      use '-R' to destroy the following datasets:\n\
                      fake_pool/busybox-data\n";
        assert_eq!(classify_stderr(stderr), FailureKind::Other);
    }

    #[test]
    fn test_classify_other() {
        assert_eq!(
            classify_stderr("cannot destroy 'fake_pool/vol001': permission denied"),
            FailureKind::Other
        );
        assert_eq!(classify_stderr(""), FailureKind::Other);
    }

    #[test]
    fn test_non_command_errors_are_other() {
        let err = DriverError::retries_exhausted("fake_pool/vol001", 3, "dataset is busy");
        assert_eq!(classify_error(&err), FailureKind::Other);
    }

    #[test]
    fn test_outcome_preserves_original_error() {
        let err = DriverError::command_failed("zfs destroy -r tank/v", 1, "dataset is busy");
        let outcome = CommandOutcome::from_result(Err(err));
        assert!(matches!(outcome, CommandOutcome::Busy(_)));

        let err = outcome.into_result().unwrap_err();
        assert_eq!(err.stderr(), Some("dataset is busy"));
    }

    #[test]
    fn test_outcome_ok() {
        let outcome = CommandOutcome::from(Ok::<_, DriverError>(CommandOutput::default()));
        assert!(matches!(outcome, CommandOutcome::Ok(_)));
    }
}
