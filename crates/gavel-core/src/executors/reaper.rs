// src/executors/reaper.rs
//! Forced removal of sandbox containers.
//!
//! Killing the runtime CLI does not stop the container it started, so every
//! interrupted run is followed by a forced removal by name. The Docker API is
//! tried first when available, then `<runtime> rm -f <name>`.

use bollard::errors::Error as BollardError;
use bollard::query_parameters::RemoveContainerOptions as BollardRemoveContainerOptionsQuery;
use bollard::Docker;
use std::process::Stdio;
use tokio::process::Command;

#[derive(Clone)]
pub struct ContainerReaper {
    runtime: String,
    docker: Option<Docker>,
}

impl ContainerReaper {
    pub fn new(runtime: impl Into<String>, use_docker_api: bool) -> Self {
        let docker = if use_docker_api {
            match Docker::connect_with_local_defaults() {
                Ok(docker) => Some(docker),
                Err(e) => {
                    log::warn!("Docker API unavailable, container cleanup will use the CLI: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Self {
            runtime: runtime.into(),
            docker,
        }
    }

    /// Remove a container regardless of its state. Failures are logged; a
    /// container that is already gone counts as removed.
    pub async fn reap(&self, container_name: &str) {
        if let Some(docker) = &self.docker {
            let options = BollardRemoveContainerOptionsQuery {
                force: true,
                ..Default::default()
            };
            match docker.remove_container(container_name, Some(options)).await {
                Ok(()) => {
                    log::debug!("Removed container {}", container_name);
                    return;
                }
                Err(BollardError::DockerResponseServerError {
                    status_code: 404, ..
                }) => {
                    log::debug!("Container {} was already removed", container_name);
                    return;
                }
                Err(e) => {
                    log::warn!(
                        "Docker API could not remove container {}: {}; retrying with {} rm -f",
                        container_name,
                        e,
                        self.runtime
                    );
                }
            }
        }

        let status = Command::new(&self.runtime)
            .args(["rm", "-f", container_name])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => {
                log::debug!("Removed container {}", container_name);
            }
            Ok(status) => {
                // `rm -f` on a missing container exits non-zero as well.
                log::debug!(
                    "{} rm -f {} exited with {}",
                    self.runtime,
                    container_name,
                    status
                );
            }
            Err(e) => {
                log::error!(
                    "Failed to run {} rm -f {}: {}",
                    self.runtime,
                    container_name,
                    e
                );
            }
        }
    }

    /// Whether the runtime answers: a Docker API ping, or `<runtime> version`.
    pub async fn ping(&self) -> bool {
        if let Some(docker) = &self.docker {
            if docker.ping().await.is_ok() {
                return true;
            }
        }

        Command::new(&self.runtime)
            .arg("version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }
}
