use super::*;
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use gavel_core::{
    CodeExecutor, ExecutionOutcome, ExecutionRequest, FailureKind, InMemoryTestCaseRepository,
    TestCase,
};
use serde_json::{json, Value};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt; // for `oneshot`

/// Treats stdin as `[a, b]` and answers `a + b`; payloads listed in
/// `failures` fail with the given kind instead.
struct MockSandbox {
    failures: Vec<(&'static str, FailureKind)>,
    reachable: bool,
    calls: Mutex<usize>,
}

impl MockSandbox {
    fn adder() -> Self {
        Self {
            failures: Vec::new(),
            reachable: true,
            calls: Mutex::new(0),
        }
    }

    fn failing(payload: &'static str, kind: FailureKind) -> Self {
        Self {
            failures: vec![(payload, kind)],
            ..Self::adder()
        }
    }
}

#[async_trait]
impl CodeExecutor for MockSandbox {
    async fn execute(
        &self,
        request: &ExecutionRequest,
        _cancel: &CancellationToken,
    ) -> ExecutionOutcome {
        *self.calls.lock().unwrap() += 1;
        if let Some((_, kind)) = self
            .failures
            .iter()
            .find(|(payload, _)| *payload == request.stdin_payload)
        {
            return ExecutionOutcome::failure(*kind, format!("{:?} failure", kind));
        }
        let args: Vec<i64> = serde_json::from_str(&request.stdin_payload).unwrap_or_default();
        ExecutionOutcome::success(args.iter().sum::<i64>().to_string(), 2)
    }

    async fn is_available(&self) -> bool {
        self.reachable
    }

    fn runtime_name(&self) -> &str {
        "mock"
    }
}

const ADD: &str = "def solution(a, b):\n    return a + b\n";

fn repository() -> Arc<dyn TestCaseRepository> {
    Arc::new(InMemoryTestCaseRepository::new().with_question(
        "add-two",
        vec![TestCase::new("[2, 3]", "5")],
        vec![TestCase::new("[2, 3]", "5"), TestCase::new("[1, 1]", "2")],
    ).with_question(
        "broken",
        vec![],
        vec![TestCase::new("[2, 3]", "5"), TestCase::new("[1, 1]", "3")],
    ))
}

fn app(executor: MockSandbox) -> Router {
    JudgeServer::new(Judge::new(Arc::new(executor)))
        .with_repository(repository())
        .with_memory_mb(256)
        .with_language_image(Language::Java, "eclipse-runner:21")
        .build_router()
}

async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_run_with_inline_test_cases() {
    let (status, body) = post_json(
        app(MockSandbox::adder()),
        "/judge/run",
        json!({
            "language": "python",
            "code": ADD,
            "testCases": [
                {"input": "[2, 3]", "output": "5"},
                {"input": "[1, 1]", "output": "3"}
            ]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");
    let results = body["testResults"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["actual"], "5");
    assert_eq!(results[0]["passed"], true);
    assert_eq!(results[0]["timeMs"], 2);
    assert_eq!(results[1]["passed"], false);
    assert_eq!(results[1]["expected"], "3");
}

#[tokio::test]
async fn test_run_falls_back_to_visible_cases() {
    let (status, body) = post_json(
        app(MockSandbox::adder()),
        "/judge/run",
        json!({"language": "js", "code": ADD, "questionId": "add-two"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let results = body["testResults"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["input"], "[2, 3]");
}

#[tokio::test]
async fn test_run_failure_carries_error() {
    let (status, body) = post_json(
        app(MockSandbox::failing("[1, 0]", FailureKind::Runtime)),
        "/judge/run",
        json!({
            "language": "python",
            "code": ADD,
            "testCases": [{"input": "[1, 0]", "output": "1"}]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let result = &body["testResults"][0];
    assert_eq!(result["passed"], false);
    assert_eq!(result["actual"], "");
    assert_eq!(result["error"], "Runtime failure");
}

#[tokio::test]
async fn test_run_validation_errors_are_bad_requests() {
    let (status, body) = post_json(
        app(MockSandbox::adder()),
        "/judge/run",
        json!({"language": "cobol", "code": ADD, "testCases": [{"input": "[]", "output": "0"}]}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid request");
    assert_eq!(body["details"], "Unsupported language: cobol");
    assert!(body["timestamp"].is_string());

    let (status, body) = post_json(
        app(MockSandbox::adder()),
        "/judge/run",
        json!({"language": "python", "code": ADD}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"], "at least one test case is required");
}

#[tokio::test]
async fn test_malformed_body_is_a_bad_request() {
    let response = app(MockSandbox::adder())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/judge/run")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"], "Invalid request");
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let router = JudgeServer::new(Judge::new(Arc::new(MockSandbox::adder())))
        .with_config(ServerConfig::new().with_max_body_size(64))
        .build_router();

    let (status, body) = post_json(
        router,
        "/judge/run",
        json!({"language": "python", "code": "x".repeat(1024)}),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"], "Request body too large");
}

#[tokio::test]
async fn test_submit_accepted() {
    let (status, body) = post_json(
        app(MockSandbox::adder()),
        "/judge/submit",
        json!({"language": "python", "code": ADD, "questionId": "add-two", "interviewId": "iv-1"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Accepted");
    assert_eq!(body["timeMs"], 4);
    assert_eq!(body["memoryMb"], 256);
    assert_eq!(body["passedCount"], 2);
    assert_eq!(body["totalCount"], 2);
}

#[tokio::test]
async fn test_submit_wrong_answer() {
    let (status, body) = post_json(
        app(MockSandbox::adder()),
        "/judge/submit",
        json!({"language": "python", "code": ADD, "questionId": "broken"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Wrong Answer");
    assert_eq!(body["passedCount"], 1);
    assert!(body.get("timeMs").is_none());
    assert!(body.get("memoryMb").is_none());
}

#[tokio::test]
async fn test_submit_compile_error() {
    let (status, body) = post_json(
        app(MockSandbox::failing("[2, 3]", FailureKind::Compile)),
        "/judge/submit",
        json!({"language": "java", "code": "class Solution {", "questionId": "add-two"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Compilation Error");
    assert_eq!(body["error"], "Compile failure");
    assert_eq!(body["passedCount"], 0);
}

#[tokio::test]
async fn test_submit_system_failure_is_unavailable() {
    let (status, body) = post_json(
        app(MockSandbox::failing("[2, 3]", FailureKind::System)),
        "/judge/submit",
        json!({"language": "python", "code": ADD, "questionId": "add-two"}),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "Code execution is unavailable");
    assert_eq!(body["details"], "System failure");
}

#[tokio::test]
async fn test_submit_unknown_question_is_not_found() {
    let (status, body) = post_json(
        app(MockSandbox::adder()),
        "/judge/submit",
        json!({"language": "python", "code": ADD, "questionId": "nope"}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not found");
}

#[tokio::test]
async fn test_submit_requires_question_id() {
    let (status, body) = post_json(
        app(MockSandbox::adder()),
        "/judge/submit",
        json!({"language": "python", "code": ADD}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"], "questionId is required");
}

#[tokio::test]
async fn test_submit_without_question_bank() {
    let router = JudgeServer::new(Judge::new(Arc::new(MockSandbox::adder()))).build_router();
    let (status, _) = post_json(
        router,
        "/judge/submit",
        json!({"language": "python", "code": ADD, "questionId": "add-two"}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_reports_sandbox() {
    let (status, body) = get_json(app(MockSandbox::adder()), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["sandbox"]["runtime"], "mock");
    assert_eq!(body["sandbox"]["reachable"], true);

    let unreachable = MockSandbox {
        reachable: false,
        ..MockSandbox::adder()
    };
    let (_, body) = get_json(app(unreachable), "/health").await;
    assert_eq!(body["status"], "degraded");
}

#[tokio::test]
async fn test_languages_lists_profiles() {
    let (status, body) = get_json(app(MockSandbox::adder()), "/languages").await;
    assert_eq!(status, StatusCode::OK);

    let languages = body.as_array().unwrap();
    assert_eq!(languages.len(), 3);
    let java = languages.iter().find(|l| l["name"] == "java").unwrap();
    assert_eq!(java["compiled"], true);
    assert_eq!(java["image"], "eclipse-runner:21");
    let python = languages.iter().find(|l| l["name"] == "python").unwrap();
    assert_eq!(python["image"], "code-runner-python");
    assert!(python["aliases"].as_array().unwrap().contains(&json!("py")));
}

#[test]
fn test_server_config_from_settings() {
    let settings = ServerSettings {
        bind_addr: "0.0.0.0:9000".into(),
        enable_cors: false,
        cors_origins: Some(vec!["http://localhost:3000".into()]),
        max_body_size: 2048,
        enable_logging: false,
    };
    let config = ServerConfig::from_settings(&settings).unwrap();
    assert_eq!(config.bind_addr.port(), 9000);
    assert!(!config.enable_cors);
    assert_eq!(config.max_body_size, 2048);

    let bad = ServerSettings {
        bind_addr: "nowhere".into(),
        ..ServerSettings::default()
    };
    assert!(ServerConfig::from_settings(&bad).is_err());
}

/// Blocks until cancelled, then takes a moment to clean up before returning.
struct ParkedSandbox {
    started: Arc<tokio::sync::Notify>,
    cleaned_up: Arc<std::sync::atomic::AtomicBool>,
}

#[async_trait]
impl CodeExecutor for ParkedSandbox {
    async fn execute(
        &self,
        _request: &ExecutionRequest,
        cancel: &CancellationToken,
    ) -> ExecutionOutcome {
        self.started.notify_one();
        cancel.cancelled().await;
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        self.cleaned_up
            .store(true, std::sync::atomic::Ordering::SeqCst);
        ExecutionOutcome::failure(FailureKind::Cancelled, "Execution was cancelled")
    }

    fn runtime_name(&self) -> &str {
        "parked"
    }
}

#[tokio::test]
async fn test_client_disconnect_cancels_and_lets_sandbox_clean_up() {
    let started = Arc::new(tokio::sync::Notify::new());
    let cleaned_up = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app = JudgeServer::new(Judge::new(Arc::new(ParkedSandbox {
        started: started.clone(),
        cleaned_up: cleaned_up.clone(),
    })))
    .with_repository(repository())
    .build_router();

    let request = app.oneshot(
        Request::builder()
            .method("POST")
            .uri("/judge/submit")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({ "language": "python", "code": ADD, "questionId": "add-two" }).to_string(),
            ))
            .unwrap(),
    );

    // Dropping the request future is what axum does when the client goes away.
    tokio::select! {
        _ = request => panic!("request completed without being cancelled"),
        _ = started.notified() => {}
    }

    let finished = tokio::time::timeout(std::time::Duration::from_secs(2), async {
        while !cleaned_up.load(std::sync::atomic::Ordering::SeqCst) {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(finished.is_ok(), "sandbox never finished its cleanup");
}
