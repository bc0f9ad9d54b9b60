//! Sandboxed code-execution judge.
//!
//! Untrusted candidate code in Python, JavaScript or Java is wrapped in a small
//! driver, executed inside a disposable resource-limited container once per
//! test case, and its output compared with the expected output to produce a
//! verdict.
//!
//! # Architecture Overview
//!
//! - **Wrapper generation**: per-language drivers that read JSON arguments from
//!   stdin, call `solution` and print the result plus a `TIME_MS` sentinel
//! - **Sandbox launching**: single-use containers with no network and bounded
//!   memory, CPU and process count, one fresh workspace per execution
//! - **Supervision**: deadline and cancellation, bounded output capture, forced
//!   kill and container reaping
//! - **Orchestration**: `run` reports every case, `submit` stops at the first
//!   failure and yields a verdict
//! - **Question lookup**: a repository trait with YAML and in-memory backends
//! - **Configuration**: YAML with defaults for every value

pub mod config;
pub mod core_types;
pub mod errors;
pub mod executors;
pub mod judge;
pub mod language;
pub mod repository;

pub use config::*;
pub use core_types::{SubmitReport, TestCase, TestResult, Verdict};
pub use errors::{JudgeError, SandboxError};
pub use executors::{CodeExecutor, DockerSandbox, ExecutionOutcome, ExecutionRequest, FailureKind};
pub use judge::{validate_submission, Judge};
pub use language::Language;
pub use repository::{
    InMemoryTestCaseRepository, Question, TestCaseRepository, YamlTestCaseRepository,
};

pub use tokio_util::sync::CancellationToken;

#[cfg(test)]
pub mod test_utils;
