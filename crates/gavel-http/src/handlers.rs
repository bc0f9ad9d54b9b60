//! Route handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Json;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use gavel_core::{validate_submission, JudgeError, TestCaseRepository, Verdict};

use crate::api::{
    HealthResponse, LanguageInfo, RunRequest, RunResponse, SandboxHealth, SubmitRequest,
    SubmitResponse,
};
use crate::error::{Result, ServerError};
use crate::AppState;

fn repository(state: &AppState) -> Result<&Arc<dyn TestCaseRepository>> {
    state
        .repository
        .as_ref()
        .ok_or_else(|| ServerError::not_found("No question bank is configured"))
}

/// Run a judge call on its own task. If the handler is dropped because the
/// client went away, the token is cancelled and the task still goes through
/// the sandbox's kill and cleanup path before it ends.
async fn detached<T, F, Fut>(job: F) -> Result<T>
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = std::result::Result<T, JudgeError>> + Send + 'static,
    T: Send + 'static,
{
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    tokio::spawn(job(cancel))
        .await
        .map_err(|e| ServerError::internal(format!("Judge task failed: {}", e)))?
        .map_err(ServerError::from)
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Handler for `POST /judge/run`.
pub async fn run_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RunRequest>, JsonRejection>,
) -> Result<Json<RunResponse>> {
    let Json(request) = payload?;
    validate_submission(&request.language, &request.code)?;

    let test_cases = if !request.test_cases.is_empty() {
        request.test_cases
    } else if let Some(question_id) = non_blank(&request.question_id) {
        log::debug!("Using visible test cases of question {}", question_id);
        repository(&state)?.visible_test_cases(question_id).await?
    } else {
        Vec::new()
    };

    let judge = state.judge.clone();
    let (language, code) = (request.language, request.code);
    let test_results = detached(move |cancel| async move {
        judge
            .run_with_cancel(&language, &code, &test_cases, &cancel)
            .await
    })
    .await?;

    Ok(Json(RunResponse {
        status: "OK",
        test_results,
    }))
}

/// Handler for `POST /judge/submit`.
pub async fn submit_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<Json<SubmitResponse>> {
    let Json(request) = payload?;
    validate_submission(&request.language, &request.code)?;

    let question_id = non_blank(&request.question_id)
        .ok_or_else(|| ServerError::invalid_request("questionId is required"))?;
    log::info!(
        "Submission for question {} (interview {})",
        question_id,
        request.interview_id.as_deref().unwrap_or("-")
    );

    let hidden = repository(&state)?.hidden_test_cases(question_id).await?;

    let judge = state.judge.clone();
    let (language, code) = (request.language, request.code);
    let report = detached(move |cancel| async move {
        judge
            .submit_with_cancel(&language, &code, &hidden, &cancel)
            .await
    })
    .await?;

    let response = match report.verdict {
        Verdict::SystemError => {
            return Err(ServerError::sandbox_unavailable(
                report
                    .diagnostic
                    .unwrap_or_else(|| "Sandbox failure".to_string()),
            ));
        }
        Verdict::Accepted => SubmitResponse {
            status: report.status_label(),
            time_ms: Some(report.total_elapsed_ms),
            memory_mb: Some(state.memory_mb),
            passed_count: report.passed_count,
            total_count: report.total_count,
            error: None,
        },
        Verdict::WrongAnswer | Verdict::RuntimeOrCompileError => SubmitResponse {
            status: report.status_label(),
            time_ms: None,
            memory_mb: None,
            passed_count: report.passed_count,
            total_count: report.total_count,
            error: report.diagnostic.clone(),
        },
    };

    log::info!(
        "Question {}: {} ({}/{})",
        question_id,
        response.status,
        response.passed_count,
        response.total_count
    );
    Ok(Json(response))
}

/// Handler for `GET /health`.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let executor = state.judge.executor();
    let reachable = executor.is_available().await;

    Json(HealthResponse {
        status: if reachable { "healthy" } else { "degraded" },
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION"),
        sandbox: SandboxHealth {
            runtime: executor.runtime_name().to_string(),
            reachable,
        },
    })
}

/// Handler for `GET /languages`.
pub async fn languages_handler(State(state): State<AppState>) -> Json<Vec<LanguageInfo>> {
    Json(state.languages.as_ref().clone())
}
