use crate::command::{CommandExecutor, CommandOutput};
use crate::error::{DriverError, Result};
use crate::retry::Sleeper;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

/// One recorded call to `MockExecutor::execute`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub run_as_root: bool,
}

impl Invocation {
    /// Program and arguments as a single vector, convenient for assertions
    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }
}

enum Response {
    Ok(String),
    Err(String),
}

/// Scripted command executor for tests
///
/// Records every invocation and answers with queued responses in order.
/// Once the queue is drained every command succeeds with empty output.
#[derive(Default)]
pub struct MockExecutor {
    responses: Mutex<VecDeque<Response>>,
    calls: Mutex<Vec<Invocation>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response with the given stdout
    pub fn push_ok(&self, stdout: impl Into<String>) -> &Self {
        lock(&self.responses).push_back(Response::Ok(stdout.into()));
        self
    }

    /// Queue a failure (exit code 1) with the given stderr
    pub fn push_err(&self, stderr: impl Into<String>) -> &Self {
        lock(&self.responses).push_back(Response::Err(stderr.into()));
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        lock(&self.calls).clone()
    }

    /// Recorded calls as argv vectors
    pub fn argvs(&self) -> Vec<Vec<String>> {
        self.calls()
            .iter()
            .map(|call| call.argv().into_iter().map(str::to_string).collect())
            .collect()
    }

    /// Responses not consumed yet
    pub fn pending(&self) -> usize {
        lock(&self.responses).len()
    }
}

impl CommandExecutor for MockExecutor {
    fn execute(&self, program: &str, args: &[&str], run_as_root: bool) -> Result<CommandOutput> {
        let invocation = Invocation {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            run_as_root,
        };
        let command_line = invocation.argv().join(" ");
        debug!("Mock: executing {}", command_line);
        lock(&self.calls).push(invocation);

        match lock(&self.responses).pop_front() {
            Some(Response::Err(stderr)) => Err(DriverError::command_failed(command_line, 1, stderr)),
            Some(Response::Ok(stdout)) => Ok(CommandOutput {
                stdout,
                ..CommandOutput::default()
            }),
            None => Ok(CommandOutput::default()),
        }
    }
}

/// Sleeper that records requested waits instead of blocking
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        lock(&self.sleeps).clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        debug!("Mock: sleeping {:?}", duration);
        lock(&self.sleeps).push(duration);
    }
}
