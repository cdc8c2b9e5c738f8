//! Code execution request and result models

use serde::{Deserialize, Serialize};

use crate::{Result, ToolChatError};

/// Exit codes reported for outcomes the process itself did not choose
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const FAILURE: i32 = 1;
    pub const TIMEOUT: i32 = 124;
    pub const PERMISSION_DENIED: i32 = 126;
    pub const NOT_FOUND: i32 = 127;
    pub const SIGNALED: i32 = 128;
}

/// Source text accepted for execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeExecutionRequest {
    source_text: String,
}

impl CodeExecutionRequest {
    pub const MAX_SOURCE_CHARS: usize = 10_000;

    pub fn new<S: Into<String>>(source_text: S) -> Result<Self> {
        let source_text = source_text.into();
        let chars = source_text.chars().count();
        if chars == 0 {
            return Err(ToolChatError::validation("code must not be empty"));
        }
        if chars > Self::MAX_SOURCE_CHARS {
            return Err(ToolChatError::validation(format!(
                "code must be at most {} characters, got {chars}",
                Self::MAX_SOURCE_CHARS
            )));
        }
        Ok(Self { source_text })
    }

    #[must_use]
    pub fn source_text(&self) -> &str {
        &self.source_text
    }
}

/// Normalized outcome of one execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeExecutionResult {
    pub stdout: String,
    pub stderr: String,
    #[serde(rename = "exitCode")]
    pub exit_code: i32,
}

impl CodeExecutionResult {
    #[must_use]
    pub fn new(stdout: String, stderr: String, exit_code: i32) -> Self {
        Self {
            stdout,
            stderr,
            exit_code,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.exit_code == exit_code::SUCCESS
    }
}
