//! `ToolChat` - tool backend for a weather-aware chat assistant
//!
//! This library provides the two tools a language model can call while
//! chatting: a daily weather forecast lookup against Open-Meteo and a
//! Python code runner, plus the HTTP API that exposes them.

pub mod api;
pub mod code_runner;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod tools;
pub mod weather;
pub mod web;

// Re-export core types for public API
pub use code_runner::{CodeRunner, RunFailure};
pub use config::ToolChatConfig;
pub use error::ToolChatError;
pub use models::{
    CodeExecutionRequest, CodeExecutionResult, DailyVariable, Forecast, ForecastError,
    ForecastRequest, ForecastResult,
};
pub use tools::{Tool, ToolDefinition, ToolRegistry};
pub use weather::{ForecastClient, ForecastFailure};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, ToolChatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
