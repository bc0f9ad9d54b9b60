use serde::{Deserialize, Serialize};

use crate::executors::FailureKind;

/// A single input/expected-output pair. `input` is handed to the sandbox as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    #[serde(default)]
    pub input: String,
    #[serde(rename = "output", alias = "expectedOutput")]
    pub expected_output: String,
}

impl TestCase {
    pub fn new(input: impl Into<String>, expected_output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            expected_output: expected_output.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub input: String,
    pub expected: String,
    pub actual: String,
    pub passed: bool,
    #[serde(rename = "timeMs")]
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Accepted,
    WrongAnswer,
    RuntimeOrCompileError,
    SystemError,
}

/// Outcome of a `submit` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitReport {
    pub verdict: Verdict,
    pub total_elapsed_ms: u64,
    pub passed_count: usize,
    pub total_count: usize,
    /// Set for `RuntimeOrCompileError` and `SystemError`.
    pub failure: Option<FailureKind>,
    pub diagnostic: Option<String>,
}

impl SubmitReport {
    /// Human-facing status line, refined by failure kind for error verdicts.
    pub fn status_label(&self) -> &'static str {
        match (self.verdict, self.failure) {
            (Verdict::Accepted, _) => "Accepted",
            (Verdict::WrongAnswer, _) => "Wrong Answer",
            (Verdict::RuntimeOrCompileError, Some(FailureKind::Compile)) => "Compilation Error",
            (Verdict::RuntimeOrCompileError, Some(FailureKind::Timeout)) => "Time Limit Exceeded",
            (Verdict::RuntimeOrCompileError, _) => "Runtime Error",
            (Verdict::SystemError, _) => "System Error",
        }
    }
}
