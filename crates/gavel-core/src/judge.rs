//! Judge orchestration: `run` and `submit`.
//!
//! Both operations validate the request, resolve the language once and then
//! execute test cases strictly in order through a [`CodeExecutor`]. `run`
//! reports every case; `submit` stops at the first case that does not pass.

use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::core_types::{SubmitReport, TestCase, TestResult, Verdict};
use crate::errors::JudgeError;
use crate::executors::{CodeExecutor, ExecutionRequest, FailureKind};
use crate::language::Language;

/// Outputs are equal after trimming surrounding whitespace on both sides.
pub fn outputs_match(actual: &str, expected: &str) -> bool {
    actual.trim() == expected.trim()
}

/// Resolve the language tag and reject blank code.
pub fn validate_submission(language: &str, source_code: &str) -> Result<Language, JudgeError> {
    let language: Language = language.parse()?;

    if source_code.trim().is_empty() {
        return Err(JudgeError::validation("code is required"));
    }

    Ok(language)
}

fn validate(
    language: &str,
    source_code: &str,
    test_cases: &[TestCase],
) -> Result<Language, JudgeError> {
    let language = validate_submission(language, source_code)?;

    if test_cases.is_empty() {
        return Err(JudgeError::validation("at least one test case is required"));
    }

    Ok(language)
}

#[derive(Clone)]
pub struct Judge {
    executor: Arc<dyn CodeExecutor>,
}

impl Judge {
    pub fn new(executor: Arc<dyn CodeExecutor>) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &Arc<dyn CodeExecutor> {
        &self.executor
    }

    pub async fn run(
        &self,
        language: &str,
        source_code: &str,
        test_cases: &[TestCase],
    ) -> Result<Vec<TestResult>, JudgeError> {
        self.run_with_cancel(language, source_code, test_cases, &CancellationToken::new())
            .await
    }

    /// Execute every case and report one result per case, in input order.
    /// Once `cancel` fires, the remaining cases are reported as failed
    /// without being executed.
    pub async fn run_with_cancel(
        &self,
        language: &str,
        source_code: &str,
        test_cases: &[TestCase],
        cancel: &CancellationToken,
    ) -> Result<Vec<TestResult>, JudgeError> {
        let language = validate(language, source_code, test_cases)?;
        let started = Instant::now();
        log::info!(
            "Running {} submission against {} test cases",
            language,
            test_cases.len()
        );

        let mut results = Vec::with_capacity(test_cases.len());
        for case in test_cases {
            if cancel.is_cancelled() {
                results.push(TestResult {
                    input: case.input.clone(),
                    expected: case.expected_output.clone(),
                    actual: String::new(),
                    passed: false,
                    elapsed_ms: 0,
                    error: Some("Execution was cancelled".to_string()),
                });
                continue;
            }

            let request = ExecutionRequest::new(language, source_code, case.input.clone());
            let outcome = self.executor.execute(&request, cancel).await;

            let result = if outcome.failed {
                TestResult {
                    input: case.input.clone(),
                    expected: case.expected_output.clone(),
                    actual: String::new(),
                    passed: false,
                    elapsed_ms: outcome.elapsed_ms,
                    error: Some(outcome.diagnostic_or_default().to_string()),
                }
            } else {
                TestResult {
                    input: case.input.clone(),
                    expected: case.expected_output.clone(),
                    passed: outputs_match(&outcome.raw_output, &case.expected_output),
                    actual: outcome.raw_output,
                    elapsed_ms: outcome.elapsed_ms,
                    error: None,
                }
            };
            results.push(result);
        }

        log::info!(
            "Run finished: {}/{} passed in {:?}",
            results.iter().filter(|r| r.passed).count(),
            results.len(),
            started.elapsed()
        );
        Ok(results)
    }

    pub async fn submit(
        &self,
        language: &str,
        source_code: &str,
        hidden_test_cases: &[TestCase],
    ) -> Result<SubmitReport, JudgeError> {
        self.submit_with_cancel(
            language,
            source_code,
            hidden_test_cases,
            &CancellationToken::new(),
        )
        .await
    }

    /// Grade against hidden cases, stopping at the first failure.
    pub async fn submit_with_cancel(
        &self,
        language: &str,
        source_code: &str,
        hidden_test_cases: &[TestCase],
        cancel: &CancellationToken,
    ) -> Result<SubmitReport, JudgeError> {
        let language = validate(language, source_code, hidden_test_cases)?;
        let total_count = hidden_test_cases.len();
        log::info!(
            "Grading {} submission against {} hidden test cases",
            language,
            total_count
        );

        let mut total_elapsed_ms: u64 = 0;
        let mut passed_count = 0;

        for (index, case) in hidden_test_cases.iter().enumerate() {
            let request = ExecutionRequest::new(language, source_code, case.input.clone());
            let outcome = self.executor.execute(&request, cancel).await;

            if outcome.failed {
                let kind = outcome.failure.unwrap_or(FailureKind::System);
                let verdict = if kind.is_candidate_fault() {
                    Verdict::RuntimeOrCompileError
                } else {
                    log::error!(
                        "Grading aborted at test case {}: {}",
                        index + 1,
                        outcome.diagnostic_or_default()
                    );
                    Verdict::SystemError
                };

                return Ok(SubmitReport {
                    verdict,
                    total_elapsed_ms,
                    passed_count,
                    total_count,
                    failure: Some(kind),
                    diagnostic: outcome.diagnostic,
                });
            }

            total_elapsed_ms = total_elapsed_ms.saturating_add(outcome.elapsed_ms);

            if !outputs_match(&outcome.raw_output, &case.expected_output) {
                log::info!("Wrong answer on test case {}/{}", index + 1, total_count);
                return Ok(SubmitReport {
                    verdict: Verdict::WrongAnswer,
                    total_elapsed_ms,
                    passed_count,
                    total_count,
                    failure: None,
                    diagnostic: None,
                });
            }

            passed_count += 1;
        }

        log::info!("Accepted: {} test cases in {} ms", total_count, total_elapsed_ms);
        Ok(SubmitReport {
            verdict: Verdict::Accepted,
            total_elapsed_ms,
            passed_count,
            total_count,
            failure: None,
            diagnostic: None,
        })
    }
}
