//! Configuration loader for YAML files
//!
//! Parses the document, resolves relative paths against the directory holding
//! the file and validates the result.

use std::path::Path;
use tokio::fs;

use crate::config::types::GavelConfig;
use crate::errors::JudgeError;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a YAML file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<GavelConfig, JudgeError> {
        let path = path.as_ref();

        let content = fs::read_to_string(path).await.map_err(|e| {
            JudgeError::config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_str(&content, path.parent())
    }

    /// Load configuration from a YAML string
    pub fn from_str(content: &str, base_dir: Option<&Path>) -> Result<GavelConfig, JudgeError> {
        let mut config: GavelConfig = if content.trim().is_empty() {
            GavelConfig::default()
        } else {
            serde_yaml::from_str(content)
                .map_err(|e| JudgeError::config(format!("Failed to parse YAML config: {}", e)))?
        };

        if let Some(base_dir) = base_dir {
            Self::resolve_paths(&mut config, base_dir);
        }

        config.validate()?;
        Ok(config)
    }

    fn resolve_paths(config: &mut GavelConfig, base_dir: &Path) {
        if config.sandbox.workspace_root.is_relative() {
            config.sandbox.workspace_root = base_dir.join(&config.sandbox.workspace_root);
        }

        if let Some(questions) = &config.questions {
            if questions.is_relative() {
                config.questions = Some(base_dir.join(questions));
            }
        }
    }
}
