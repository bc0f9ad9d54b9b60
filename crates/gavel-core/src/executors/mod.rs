//! Sandboxed execution of candidate programs
//!
//! A [`CodeExecutor`] takes one candidate program plus one stdin payload and
//! always answers with an [`ExecutionOutcome`]. Infrastructure faults are
//! folded into the outcome as [`FailureKind::System`] instead of being raised,
//! so callers only ever branch on data.

pub mod parser;
pub mod reaper;
pub mod sandbox;
pub mod supervisor;
pub mod workspace;
pub mod wrapper;

pub use sandbox::DockerSandbox;
pub use workspace::{TempWorkspaceProvider, Workspace, WorkspaceProvider};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::language::Language;

#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub language: Language,
    pub source_code: String,
    /// Written verbatim to the program's stdin, then stdin is closed.
    pub stdin_payload: String,
}

impl ExecutionRequest {
    pub fn new(
        language: Language,
        source_code: impl Into<String>,
        stdin_payload: impl Into<String>,
    ) -> Self {
        Self {
            language,
            source_code: source_code.into(),
            stdin_payload: stdin_payload.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Compile,
    Runtime,
    Timeout,
    /// Aborted through the caller's cancellation token.
    Cancelled,
    System,
}

impl FailureKind {
    /// Failures attributable to the submission rather than the judge.
    pub fn is_candidate_fault(&self) -> bool {
        matches!(
            self,
            FailureKind::Compile | FailureKind::Runtime | FailureKind::Timeout
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    /// Candidate stdout with the timing sentinel removed, or the
    /// "No output" placeholder. Empty when the execution failed.
    pub raw_output: String,
    pub elapsed_ms: u64,
    pub failed: bool,
    pub diagnostic: Option<String>,
    pub failure: Option<FailureKind>,
}

impl ExecutionOutcome {
    pub fn success(raw_output: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            raw_output: raw_output.into(),
            elapsed_ms,
            failed: false,
            diagnostic: None,
            failure: None,
        }
    }

    pub fn failure(kind: FailureKind, diagnostic: impl Into<String>) -> Self {
        Self {
            raw_output: String::new(),
            elapsed_ms: 0,
            failed: true,
            diagnostic: Some(diagnostic.into()),
            failure: Some(kind),
        }
    }

    pub fn diagnostic_or_default(&self) -> &str {
        self.diagnostic.as_deref().unwrap_or("Execution failed")
    }
}

#[async_trait]
pub trait CodeExecutor: Send + Sync {
    /// Run one program against one stdin payload. Never panics and never
    /// returns an error; every fault becomes a failed outcome.
    async fn execute(
        &self,
        request: &ExecutionRequest,
        cancel: &CancellationToken,
    ) -> ExecutionOutcome;

    /// Whether the backing container runtime currently answers.
    async fn is_available(&self) -> bool {
        true
    }

    fn runtime_name(&self) -> &str;
}
