//! Data models for the ToolChat tools
//!
//! - Forecast: forecast queries, per-day rows and the forecast tool result
//! - Execution: code execution requests and normalized results

pub mod execution;
pub mod forecast;

pub use execution::{CodeExecutionRequest, CodeExecutionResult, exit_code};
pub use forecast::{DailyEntry, DailyVariable, Forecast, ForecastError, ForecastRequest, ForecastResult};
