//! Error types and handling for `ToolChat`

use thiserror::Error;

/// Main error type for the `ToolChat` application
///
/// Tool adapters never return this for runtime failures; those become data in
/// the tool result. It covers what is rejected before a tool runs.
#[derive(Error, Debug)]
pub enum ToolChatError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// General application errors
    #[error("Application error: {message}")]
    General { message: String },
}

impl ToolChatError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new general error
    pub fn general<S: Into<String>>(message: S) -> Self {
        Self::General {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            ToolChatError::Config { .. } => {
                "Configuration error. Please check your config file and environment.".to_string()
            }
            ToolChatError::Validation { message } => {
                format!("Invalid input: {message}")
            }
            ToolChatError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
            ToolChatError::General { message } => message.clone(),
        }
    }

    /// Whether the caller supplied bad arguments, as opposed to a server-side fault
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, ToolChatError::Validation { .. })
    }
}
