//! Supported submission languages.
//!
//! Every language tag coming over the wire is resolved into a [`Language`]
//! exactly once, at the orchestrator boundary. Unknown tags are rejected there,
//! before a workspace or container is allocated.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::JudgeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    Java,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Python, Language::JavaScript, Language::Java];

    pub fn name(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::Java => "java",
        }
    }

    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Language::Python => &["python", "python3", "py"],
            Language::JavaScript => &["javascript", "js", "node", "nodejs"],
            Language::Java => &["java"],
        }
    }

    /// File the wrapped program is written to inside the workspace.
    pub fn source_file(&self) -> &'static str {
        match self {
            Language::Python => "main.py",
            Language::JavaScript => "main.js",
            // javac requires the public harness class to live in Main.java
            Language::Java => "Main.java",
        }
    }

    pub fn compile_command(&self) -> Option<&'static [&'static str]> {
        match self {
            Language::Java => Some(&["javac", "-encoding", "UTF-8", "-d", ".", "Main.java"]),
            _ => None,
        }
    }

    pub fn run_command(&self) -> &'static [&'static str] {
        match self {
            Language::Python => &["python3", "-u", "main.py"],
            Language::JavaScript => &["node", "main.js"],
            Language::Java => &["java", "-Xss64m", "-cp", ".", "Main"],
        }
    }

    pub fn default_image(&self) -> &'static str {
        match self {
            Language::Python => "code-runner-python",
            Language::JavaScript => "code-runner-javascript",
            Language::Java => "code-runner-java",
        }
    }

    pub fn is_compiled(&self) -> bool {
        self.compile_command().is_some()
    }
}

impl FromStr for Language {
    type Err = JudgeError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        let tag = tag.trim().to_lowercase();
        if tag.is_empty() {
            return Err(JudgeError::validation("language is required"));
        }
        Language::ALL
            .into_iter()
            .find(|lang| lang.aliases().contains(&tag.as_str()))
            .ok_or_else(|| JudgeError::validation(format!("Unsupported language: {}", tag)))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
