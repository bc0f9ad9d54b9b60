//! Request and response bodies. Wire names are camelCase.

use serde::{Deserialize, Serialize};

use gavel_core::{Language, TestCase, TestResult};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub code: String,
    /// When empty, the visible cases of `question_id` are used.
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
    #[serde(default)]
    pub question_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResponse {
    pub status: &'static str,
    pub test_results: Vec<TestResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub question_id: Option<String>,
    #[serde(default)]
    pub interview_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_mb: Option<u64>,
    pub passed_count: usize,
    pub total_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LanguageInfo {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub image: String,
    pub compiled: bool,
}

impl LanguageInfo {
    pub fn new(language: Language, image: impl Into<String>) -> Self {
        Self {
            name: language.name(),
            aliases: language.aliases(),
            image: image.into(),
            compiled: language.is_compiled(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SandboxHealth {
    pub runtime: String,
    pub reachable: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: &'static str,
    pub sandbox: SandboxHealth,
}
