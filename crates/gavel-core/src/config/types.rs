//! Configuration type definitions for the judge service
//!
//! Every field has a default so an empty YAML document is a valid configuration.
//! Values are resolved relative to the configuration file by the loader.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::JudgeError;
use crate::language::Language;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GavelConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub sandbox: SandboxConfig,
    #[serde(default)]
    pub languages: HashMap<Language, LanguageSettings>,
    /// Path to a YAML question bank used by `submit` and by `run` requests
    /// that only carry a question id.
    #[serde(default)]
    pub questions: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_true")]
    pub enable_cors: bool,
    #[serde(default)]
    pub cors_origins: Option<Vec<String>>,
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
    #[serde(default = "default_true")]
    pub enable_logging: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            enable_cors: true,
            cors_origins: None,
            max_body_size: default_max_body_size(),
            enable_logging: true,
        }
    }
}

/// Resource ceilings and runtime selection for sandbox containers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Container runtime CLI, invoked with an argument vector.
    #[serde(default = "default_runtime")]
    pub runtime: String,
    #[serde(default = "default_workspace_root")]
    pub workspace_root: PathBuf,
    #[serde(default = "default_memory_mb")]
    pub memory_mb: u64,
    #[serde(default = "default_cpus")]
    pub cpus: f64,
    #[serde(default = "default_pids_limit")]
    pub pids_limit: u32,
    #[serde(default = "default_run_timeout_ms")]
    pub run_timeout_ms: u64,
    #[serde(default = "default_compile_timeout_ms")]
    pub compile_timeout_ms: u64,
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
    /// Reap timed-out containers through the Docker API before falling back
    /// to `<runtime> rm -f`.
    #[serde(default = "default_true")]
    pub use_docker_api: bool,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            runtime: default_runtime(),
            workspace_root: default_workspace_root(),
            memory_mb: default_memory_mb(),
            cpus: default_cpus(),
            pids_limit: default_pids_limit(),
            run_timeout_ms: default_run_timeout_ms(),
            compile_timeout_ms: default_compile_timeout_ms(),
            max_output_bytes: default_max_output_bytes(),
            use_docker_api: true,
        }
    }
}

impl SandboxConfig {
    pub fn run_timeout(&self) -> Duration {
        Duration::from_millis(self.run_timeout_ms)
    }

    pub fn compile_timeout(&self) -> Duration {
        Duration::from_millis(self.compile_timeout_ms)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LanguageSettings {
    #[serde(default)]
    pub image: Option<String>,
}

fn default_bind_addr() -> String {
    "127.0.0.1:4000".to_string()
}

fn default_runtime() -> String {
    "docker".to_string()
}

fn default_workspace_root() -> PathBuf {
    std::env::temp_dir().join("gavel")
}

fn default_true() -> bool { true }
fn default_max_body_size() -> usize { 1024 * 1024 }
fn default_memory_mb() -> u64 { 256 }
fn default_cpus() -> f64 { 0.5 }
fn default_pids_limit() -> u32 { 64 }
fn default_run_timeout_ms() -> u64 { 5_000 }
fn default_compile_timeout_ms() -> u64 { 10_000 }
fn default_max_output_bytes() -> usize { 1024 * 1024 }

impl GavelConfig {
    /// Image for a language, honoring overrides from the `languages` section.
    pub fn image_for(&self, language: Language) -> String {
        self.languages
            .get(&language)
            .and_then(|settings| settings.image.clone())
            .unwrap_or_else(|| language.default_image().to_string())
    }

    pub fn validate(&self) -> Result<(), JudgeError> {
        if self.server.bind_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(JudgeError::config(format!(
                "Invalid bind address '{}'",
                self.server.bind_addr
            )));
        }

        if self.server.max_body_size == 0 {
            return Err(JudgeError::config("server.max_body_size must be greater than 0"));
        }

        let sandbox = &self.sandbox;
        if sandbox.runtime.trim().is_empty() {
            return Err(JudgeError::config("sandbox.runtime cannot be empty"));
        }

        if sandbox.memory_mb < 6 {
            // Docker refuses containers below 6 MiB.
            return Err(JudgeError::config("sandbox.memory_mb must be at least 6"));
        }

        if !(sandbox.cpus > 0.0) {
            return Err(JudgeError::config("sandbox.cpus must be greater than 0"));
        }

        if sandbox.pids_limit == 0 {
            return Err(JudgeError::config("sandbox.pids_limit must be greater than 0"));
        }

        if sandbox.run_timeout_ms == 0 || sandbox.compile_timeout_ms == 0 {
            return Err(JudgeError::config("sandbox timeouts must be greater than 0"));
        }

        if sandbox.max_output_bytes == 0 {
            return Err(JudgeError::config("sandbox.max_output_bytes must be greater than 0"));
        }

        for (language, settings) in &self.languages {
            if let Some(image) = &settings.image {
                if image.trim().is_empty() {
                    return Err(JudgeError::config(format!(
                        "languages.{}.image cannot be empty",
                        language
                    )));
                }
            }
        }

        Ok(())
    }
}
