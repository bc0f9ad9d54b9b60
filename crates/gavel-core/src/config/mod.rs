//! Configuration for the judge service
//!
//! YAML documents map onto [`GavelConfig`]; every section is optional.

pub mod loader;
pub mod types;

pub use loader::*;
pub use types::*;


use crate::errors::JudgeError;
use std::path::Path;

/// Load a configuration from a YAML file
pub async fn load_config<P: AsRef<Path>>(path: P) -> Result<GavelConfig, JudgeError> {
    ConfigLoader::from_file(path).await
}
