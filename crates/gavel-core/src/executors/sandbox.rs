// src/executors/sandbox.rs
//! Container-backed [`CodeExecutor`].
//!
//! Each execution gets a fresh workspace bind-mounted at `/app` inside a
//! single-use container with no network, a memory ceiling with swap disabled,
//! a CPU quota, a process limit and no privilege escalation. Compiled
//! languages run a separate compile container against the same workspace
//! first. The workspace is deleted on every exit path.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::parser;
use super::reaper::ContainerReaper;
use super::supervisor::{self, ExitState, Limits, SupervisedExit};
use super::workspace::{TempWorkspaceProvider, Workspace, WorkspaceProvider};
use super::wrapper;
use super::{CodeExecutor, ExecutionOutcome, ExecutionRequest, FailureKind};
use crate::config::{GavelConfig, SandboxConfig};
use crate::errors::SandboxError;
use crate::language::Language;

/// Mount point of the workspace inside the container.
pub const CONTAINER_WORKDIR: &str = "/app";

// `docker run` exits with 125 when the daemon could not start the container.
const RUNTIME_FAILURE_EXIT: i32 = 125;
const SIGKILL_EXIT: i32 = 137;
// javac's complaint when the candidate declares `public class Solution`.
const JAVA_PUBLIC_SOLUTION: &str = "class Solution is public";

pub struct DockerSandbox {
    config: SandboxConfig,
    images: HashMap<Language, String>,
    workspaces: Arc<dyn WorkspaceProvider>,
    reaper: ContainerReaper,
}

impl DockerSandbox {
    pub fn new(config: SandboxConfig) -> Self {
        let images = Language::ALL
            .iter()
            .map(|lang| (*lang, lang.default_image().to_string()))
            .collect();
        let workspaces = Arc::new(TempWorkspaceProvider::new(config.workspace_root.clone()));
        let reaper = ContainerReaper::new(config.runtime.clone(), config.use_docker_api);

        Self {
            config,
            images,
            workspaces,
            reaper,
        }
    }

    pub fn from_config(config: &GavelConfig) -> Self {
        let mut sandbox = Self::new(config.sandbox.clone());
        for lang in Language::ALL {
            sandbox.images.insert(lang, config.image_for(lang));
        }
        sandbox
    }

    pub fn with_workspace_provider(mut self, workspaces: Arc<dyn WorkspaceProvider>) -> Self {
        self.workspaces = workspaces;
        self
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    pub fn image_for(&self, language: Language) -> &str {
        self.images
            .get(&language)
            .map(String::as_str)
            .unwrap_or_else(|| language.default_image())
    }

    /// Arguments after the runtime binary for one single-use container.
    /// `user` is the `uid:gid` the container runs as; `None` keeps the
    /// image's own user.
    pub fn container_args(
        &self,
        container_name: &str,
        image: &str,
        workspace: &Path,
        user: Option<&str>,
        command: &[&str],
    ) -> Vec<String> {
        let memory = format!("{}m", self.config.memory_mb);
        let mut args: Vec<String> = vec![
            "run".into(),
            "--rm".into(),
            "-i".into(),
            "--name".into(),
            container_name.into(),
            "--network".into(),
            "none".into(),
            "--memory".into(),
            memory.clone(),
            "--memory-swap".into(),
            memory,
            "--cpus".into(),
            self.config.cpus.to_string(),
            "--pids-limit".into(),
            self.config.pids_limit.to_string(),
            "--cap-drop".into(),
            "ALL".into(),
            "--security-opt".into(),
            "no-new-privileges".into(),
            "-v".into(),
            format!("{}:{}", workspace.display(), CONTAINER_WORKDIR),
            "-w".into(),
            CONTAINER_WORKDIR.into(),
        ];
        if let Some(user) = user {
            args.push("--user".into());
            args.push(user.into());
        }
        args.push(image.into());
        args.extend(command.iter().map(|part| part.to_string()));
        args
    }

    async fn run_container(
        &self,
        container_name: &str,
        image: &str,
        workspace: &Workspace,
        command: &[&str],
        stdin_payload: Option<&[u8]>,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<SupervisedExit, SandboxError> {
        let args = self.container_args(
            container_name,
            image,
            workspace.path(),
            workspace.user(),
            command,
        );
        log::debug!("Launching {} {}", self.config.runtime, args.join(" "));

        let child = supervisor::spawn(&self.config.runtime, &args)?;
        let mut guard = ReapOnDrop::new(&self.reaper, container_name);
        let limits = Limits {
            timeout,
            max_output_bytes: self.config.max_output_bytes,
        };
        let result = supervisor::supervise(child, stdin_payload, limits, cancel).await;

        let interrupted = match &result {
            Ok(exit) => !matches!(exit.state, ExitState::Completed { .. }),
            Err(_) => true,
        };
        if interrupted {
            self.reaper.reap(container_name).await;
        }
        guard.disarm();

        if let Ok(exit) = &result {
            log::debug!("{} exited after {:?}", container_name, exit.elapsed);
            if exit.truncated {
                log::warn!(
                    "Output of {} exceeded {} bytes and was truncated",
                    container_name,
                    self.config.max_output_bytes
                );
            }
        }

        result
    }

    async fn execute_in(
        &self,
        workspace: &Workspace,
        request: &ExecutionRequest,
        cancel: &CancellationToken,
    ) -> Result<ExecutionOutcome, SandboxError> {
        let language = request.language;
        let program = wrapper::generate(language, &request.source_code);
        tokio::fs::write(workspace.path().join(language.source_file()), program)
            .await
            .map_err(SandboxError::WriteProgram)?;

        let image = self.image_for(language);
        let container_name = workspace.container_name();

        if let Some(compile) = language.compile_command() {
            let compile_name = format!("{}-compile", container_name);
            let exit = self
                .run_container(
                    &compile_name,
                    image,
                    workspace,
                    compile,
                    None,
                    self.config.compile_timeout(),
                    cancel,
                )
                .await?;

            if let Some(outcome) = self.classify_compile(&exit) {
                return Ok(outcome);
            }
        }

        let exit = self
            .run_container(
                &container_name,
                image,
                workspace,
                language.run_command(),
                Some(request.stdin_payload.as_bytes()),
                self.config.run_timeout(),
                cancel,
            )
            .await?;

        Ok(self.classify_run(exit))
    }

    /// `None` when compilation succeeded and the run should proceed.
    fn classify_compile(&self, exit: &SupervisedExit) -> Option<ExecutionOutcome> {
        match exit.state {
            ExitState::Completed { code: Some(0) } => None,
            ExitState::Completed {
                code: Some(RUNTIME_FAILURE_EXIT),
            } => Some(ExecutionOutcome::failure(
                FailureKind::System,
                format!("Container runtime failed: {}", exit.diagnostic()),
            )),
            ExitState::Completed { .. } => {
                let mut diagnostic = exit.diagnostic();
                if diagnostic.contains(JAVA_PUBLIC_SOLUTION) {
                    diagnostic.push_str(
                        "\nDeclare `class Solution` without the `public` modifier: \
                         Main.java already holds the public class Main.",
                    );
                }
                Some(ExecutionOutcome::failure(FailureKind::Compile, diagnostic))
            }
            ExitState::TimedOut => Some(ExecutionOutcome::failure(
                FailureKind::Compile,
                format!(
                    "Compilation timed out after {} ms",
                    self.config.compile_timeout_ms
                ),
            )),
            ExitState::Cancelled => Some(cancelled()),
        }
    }

    fn classify_run(&self, exit: SupervisedExit) -> ExecutionOutcome {
        match exit.state {
            ExitState::Completed { code: Some(0) } => {
                let parsed = parser::parse(&exit.stdout);
                ExecutionOutcome::success(parsed.visible, parsed.elapsed_ms)
            }
            ExitState::Completed {
                code: Some(RUNTIME_FAILURE_EXIT),
            } => ExecutionOutcome::failure(
                FailureKind::System,
                format!("Container runtime failed: {}", exit.diagnostic()),
            ),
            ExitState::Completed {
                code: Some(SIGKILL_EXIT),
            } if exit.stderr.trim().is_empty() => ExecutionOutcome::failure(
                FailureKind::Runtime,
                format!(
                    "Process was killed (exit {}); the {} MB memory limit may have been exceeded",
                    SIGKILL_EXIT, self.config.memory_mb
                ),
            ),
            ExitState::Completed { .. } => {
                ExecutionOutcome::failure(FailureKind::Runtime, exit.diagnostic())
            }
            ExitState::TimedOut => ExecutionOutcome::failure(
                FailureKind::Timeout,
                format!("Time limit exceeded ({} ms)", self.config.run_timeout_ms),
            ),
            ExitState::Cancelled => cancelled(),
        }
    }
}

/// Force-removes the container if the launching future is dropped before
/// the supervised run finished and was cleaned up.
struct ReapOnDrop {
    reaper: ContainerReaper,
    container_name: String,
    armed: bool,
}

impl ReapOnDrop {
    fn new(reaper: &ContainerReaper, container_name: &str) -> Self {
        Self {
            reaper: reaper.clone(),
            container_name: container_name.to_string(),
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for ReapOnDrop {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let name = std::mem::take(&mut self.container_name);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                log::warn!("Execution of {} was abandoned, removing container", name);
                let reaper = self.reaper.clone();
                handle.spawn(async move { reaper.reap(&name).await });
            }
            Err(_) => log::error!("No async runtime left to remove container {}", name),
        }
    }
}

fn cancelled() -> ExecutionOutcome {
    ExecutionOutcome::failure(FailureKind::Cancelled, "Execution was cancelled")
}

#[async_trait]
impl CodeExecutor for DockerSandbox {
    async fn execute(
        &self,
        request: &ExecutionRequest,
        cancel: &CancellationToken,
    ) -> ExecutionOutcome {
        let workspace = match self.workspaces.create() {
            Ok(workspace) => workspace,
            Err(e) => {
                let err = SandboxError::Workspace(e);
                log::error!("{}", err);
                return ExecutionOutcome::failure(FailureKind::System, err.to_string());
            }
        };

        log::info!(
            "Executing {} submission in {}",
            request.language,
            workspace.container_name()
        );

        let outcome = match self.execute_in(&workspace, request, cancel).await {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("Sandbox failure in {}: {}", workspace.container_name(), e);
                ExecutionOutcome::failure(FailureKind::System, e.to_string())
            }
        };

        match outcome.failure {
            Some(FailureKind::Timeout) => {
                log::warn!("{} timed out", workspace.container_name())
            }
            Some(kind) => log::debug!("{} failed: {:?}", workspace.container_name(), kind),
            None => log::debug!(
                "{} finished in {} ms",
                workspace.container_name(),
                outcome.elapsed_ms
            ),
        }

        let path = workspace.path().to_path_buf();
        if let Err(e) = workspace.release() {
            log::error!("Failed to remove workspace {}: {}", path.display(), e);
        }

        outcome
    }

    async fn is_available(&self) -> bool {
        self.reaper.ping().await
    }

    fn runtime_name(&self) -> &str {
        &self.config.runtime
    }
}
