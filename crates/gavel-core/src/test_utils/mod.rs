//! Helpers shared by unit tests across the crate.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::executors::{CodeExecutor, ExecutionOutcome, ExecutionRequest};

/// Write an executable `/bin/sh` script standing in for the container
/// runtime and return its path.
#[cfg(unix)]
pub fn fake_runtime(dir: &Path, body: &str) -> String {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-runtime");
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path.to_string_lossy().into_owned()
}

type Script = Box<dyn Fn(&ExecutionRequest) -> ExecutionOutcome + Send + Sync>;

/// Executor answering from a closure and recording every stdin payload.
pub struct MockExecutor {
    script: Script,
    calls: Mutex<Vec<String>>,
}

impl MockExecutor {
    pub fn new(
        script: impl Fn(&ExecutionRequest) -> ExecutionOutcome + Send + Sync + 'static,
    ) -> Self {
        Self {
            script: Box::new(script),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Interprets stdin as `[a, b]` and answers `a + b`.
    pub fn adder() -> Self {
        Self::new(|request| {
            let args: Vec<i64> = serde_json::from_str(&request.stdin_payload).unwrap_or_default();
            ExecutionOutcome::success(args.iter().sum::<i64>().to_string(), 1)
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CodeExecutor for MockExecutor {
    async fn execute(
        &self,
        request: &ExecutionRequest,
        cancel: &CancellationToken,
    ) -> ExecutionOutcome {
        self.calls.lock().unwrap().push(request.stdin_payload.clone());
        if cancel.is_cancelled() {
            return ExecutionOutcome::failure(
                crate::executors::FailureKind::Cancelled,
                "Execution was cancelled",
            );
        }
        (self.script)(request)
    }

    fn runtime_name(&self) -> &str {
        "mock"
    }
}
