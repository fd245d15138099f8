use miette::Diagnostic;
use thiserror::Error;

/// Error type for volume driver operations
#[derive(Error, Debug, Diagnostic)]
pub enum DriverError {
    /// External command exited non-zero or could not be spawned
    #[error("Command '{command}' failed with exit code {exit_code}: {}", .stderr.trim())]
    #[diagnostic(
        code(zvol::driver::command_failed),
        help("Run the command by hand to inspect the full output. Check that the pool exists and the root helper is allowed to run zfs")
    )]
    CommandFailed {
        #[allow(unused)]
        command: String,
        #[allow(unused)]
        exit_code: i32,
        #[allow(unused)]
        stderr: String,
    },

    /// Destroy kept reporting busy until the retry policy gave up
    #[error("Dataset '{dataset}' still busy after {attempts} destroy attempts: {}", .stderr.trim())]
    #[diagnostic(
        code(zvol::driver::retries_exhausted),
        help("Something still holds the dataset. Look for dependent clones with `zfs get -H -r -t snapshot clones {dataset}` and for open consumers of the zvol")
    )]
    RetriesExhausted {
        #[allow(unused)]
        dataset: String,
        #[allow(unused)]
        attempts: u32,
        #[allow(unused)]
        stderr: String,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(zvol::driver::invalid_config), help("{suggestion}"))]
    InvalidConfig {
        #[allow(unused)]
        message: String,
        #[allow(unused)]
        suggestion: String,
    },
}

/// Result type alias for driver operations
pub type Result<T> = std::result::Result<T, DriverError>;

impl DriverError {
    pub fn command_failed(
        command: impl Into<String>,
        exit_code: i32,
        stderr: impl Into<String>,
    ) -> Self {
        Self::CommandFailed {
            command: command.into(),
            exit_code,
            stderr: stderr.into(),
        }
    }

    pub fn retries_exhausted(
        dataset: impl Into<String>,
        attempts: u32,
        stderr: impl Into<String>,
    ) -> Self {
        Self::RetriesExhausted {
            dataset: dataset.into(),
            attempts,
            stderr: stderr.into(),
        }
    }

    pub fn invalid_config(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Diagnostic text captured from the failed command, if any
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::CommandFailed { stderr, .. } | Self::RetriesExhausted { stderr, .. } => {
                Some(stderr)
            }
            Self::InvalidConfig { .. } => None,
        }
    }
}
