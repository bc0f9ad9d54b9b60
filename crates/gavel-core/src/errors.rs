//! Error types for the judge
//!
//! Only request-level problems surface as `JudgeError`. Anything that goes wrong
//! while a single test case is executing is folded into an `ExecutionOutcome`
//! with a `FailureKind`, so the orchestrator never has to unwind through
//! infrastructure faults.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum JudgeError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(String),
}

impl JudgeError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<std::io::Error> for JudgeError {
    fn from(err: std::io::Error) -> Self {
        JudgeError::Io(err.to_string())
    }
}

// Infrastructure faults raised inside the sandbox layer before they are
// classified into an outcome.
#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("Could not create workspace: {0}")]
    Workspace(#[source] std::io::Error),
    #[error("Could not write program into workspace: {0}")]
    WriteProgram(#[source] std::io::Error),
    #[error("Could not start container runtime '{runtime}': {source}")]
    Spawn {
        runtime: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not feed stdin to sandbox: {0}")]
    Stdin(#[source] std::io::Error),
    #[error("Failed while waiting for sandbox: {0}")]
    Wait(#[source] std::io::Error),
}
