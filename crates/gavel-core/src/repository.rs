//! Question and test case lookup
//!
//! The judge does not own questions; it asks a [`TestCaseRepository`] for the
//! ordered cases of a question id. Two implementations ship with the crate:
//! an in-memory map and a loader for YAML question banks of the form
//!
//! ```yaml
//! questions:
//!   - id: add-two
//!     title: Add two numbers
//!     testCases:
//!       - input: "[2, 3]"
//!         output: "5"
//!     hiddenTestCases:
//!       - input: "[1, 1]"
//!         output: "2"
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::core_types::TestCase;
use crate::errors::JudgeError;

#[async_trait]
pub trait TestCaseRepository: Send + Sync {
    /// Cases used for grading. `NotFound` when the question is unknown or
    /// has no hidden cases.
    async fn hidden_test_cases(&self, question_id: &str) -> Result<Vec<TestCase>, JudgeError>;

    /// Cases shown to the candidate for `run`.
    async fn visible_test_cases(&self, question_id: &str) -> Result<Vec<TestCase>, JudgeError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
    #[serde(default)]
    pub hidden_test_cases: Vec<TestCase>,
}

#[derive(Debug, Default, Deserialize)]
struct QuestionBank {
    #[serde(default)]
    questions: Vec<Question>,
}

#[derive(Debug, Clone, Copy)]
enum CaseSet {
    Visible,
    Hidden,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryTestCaseRepository {
    questions: HashMap<String, Question>,
}

impl InMemoryTestCaseRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_question(
        mut self,
        id: impl Into<String>,
        visible: Vec<TestCase>,
        hidden: Vec<TestCase>,
    ) -> Self {
        let id = id.into();
        self.questions.insert(
            id.clone(),
            Question {
                id,
                title: None,
                test_cases: visible,
                hidden_test_cases: hidden,
            },
        );
        self
    }

    /// Add a question, rejecting blank and duplicate ids.
    pub fn insert(&mut self, question: Question) -> Result<(), JudgeError> {
        if question.id.trim().is_empty() {
            return Err(JudgeError::config("question id cannot be empty"));
        }
        if self.questions.contains_key(&question.id) {
            return Err(JudgeError::config(format!(
                "duplicate question id '{}'",
                question.id
            )));
        }
        self.questions.insert(question.id.clone(), question);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    fn lookup(&self, question_id: &str, set: CaseSet) -> Result<Vec<TestCase>, JudgeError> {
        let question = self
            .questions
            .get(question_id.trim())
            .ok_or_else(|| JudgeError::not_found(format!("Question '{}'", question_id)))?;

        let cases = match set {
            CaseSet::Visible => &question.test_cases,
            CaseSet::Hidden => &question.hidden_test_cases,
        };
        if cases.is_empty() {
            let kind = match set {
                CaseSet::Visible => "visible",
                CaseSet::Hidden => "hidden",
            };
            return Err(JudgeError::not_found(format!(
                "No {} test cases for question '{}'",
                kind, question_id
            )));
        }

        Ok(cases.clone())
    }
}

#[async_trait]
impl TestCaseRepository for InMemoryTestCaseRepository {
    async fn hidden_test_cases(&self, question_id: &str) -> Result<Vec<TestCase>, JudgeError> {
        self.lookup(question_id, CaseSet::Hidden)
    }

    async fn visible_test_cases(&self, question_id: &str) -> Result<Vec<TestCase>, JudgeError> {
        self.lookup(question_id, CaseSet::Visible)
    }
}

/// Question bank read once from a YAML file.
#[derive(Debug, Clone)]
pub struct YamlTestCaseRepository {
    path: Option<PathBuf>,
    questions: InMemoryTestCaseRepository,
}

impl YamlTestCaseRepository {
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, JudgeError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            JudgeError::config(format!(
                "Failed to read question bank {}: {}",
                path.display(),
                e
            ))
        })?;

        let mut repository = Self::from_str(&content)?;
        repository.path = Some(path.to_path_buf());
        log::info!(
            "Loaded {} questions from {}",
            repository.questions.len(),
            path.display()
        );
        Ok(repository)
    }

    pub fn from_str(content: &str) -> Result<Self, JudgeError> {
        let bank: QuestionBank = if content.trim().is_empty() {
            QuestionBank::default()
        } else {
            serde_yaml::from_str(content)
                .map_err(|e| JudgeError::config(format!("Failed to parse question bank: {}", e)))?
        };

        let mut questions = InMemoryTestCaseRepository::new();
        for question in bank.questions {
            questions.insert(question)?;
        }

        Ok(Self {
            path: None,
            questions,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

#[async_trait]
impl TestCaseRepository for YamlTestCaseRepository {
    async fn hidden_test_cases(&self, question_id: &str) -> Result<Vec<TestCase>, JudgeError> {
        self.questions.hidden_test_cases(question_id).await
    }

    async fn visible_test_cases(&self, question_id: &str) -> Result<Vec<TestCase>, JudgeError> {
        self.questions.visible_test_cases(question_id).await
    }
}
