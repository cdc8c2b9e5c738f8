//! Configuration management for `ToolChat`
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::ToolChatError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Upper bound for the combined output cap of the code runner
const MAX_OUTPUT_CAP_BYTES: usize = 64 * 1024 * 1024;

/// Root configuration structure for the `ToolChat` application
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolChatConfig {
    /// Forecast API configuration
    #[serde(default)]
    pub forecast: ForecastConfig,
    /// Code runner configuration
    #[serde(default)]
    pub code_runner: CodeRunnerConfig,
    /// Web server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Forecast API configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// Base URL for the Open-Meteo API
    #[serde(default = "default_forecast_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_forecast_timeout")]
    pub timeout_seconds: u32,
}

/// Code runner configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeRunnerConfig {
    /// Interpreter executable, looked up on PATH
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
    /// Arguments making the interpreter read its program from stdin
    #[serde(default = "default_interpreter_args")]
    pub args: Vec<String>,
    /// Wall-clock timeout in seconds
    #[serde(default = "default_code_timeout")]
    pub timeout_seconds: u32,
    /// Combined stdout and stderr cap in bytes
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
}

/// Web server configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_server_host")]
    pub host: String,
    /// Bind port
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// Directory with the chat UI's static files, if it should be served
    #[serde(default)]
    pub static_dir: Option<String>,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_forecast_base_url() -> String {
    "https://api.open-meteo.com/v1".to_string()
}

fn default_forecast_timeout() -> u32 {
    8
}

fn default_interpreter() -> String {
    "python3".to_string()
}

fn default_interpreter_args() -> Vec<String> {
    vec!["-u".to_string(), "-".to_string()]
}

fn default_code_timeout() -> u32 {
    10
}

fn default_max_output_bytes() -> usize {
    1024 * 1024
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            base_url: default_forecast_base_url(),
            timeout_seconds: default_forecast_timeout(),
        }
    }
}

impl ForecastConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.into())
    }
}

impl Default for CodeRunnerConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            args: default_interpreter_args(),
            timeout_seconds: default_code_timeout(),
            max_output_bytes: default_max_output_bytes(),
        }
    }
}

impl CodeRunnerConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.into())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            static_dir: None,
        }
    }
}

impl ServerConfig {
    /// Address string suitable for binding a listener
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for ToolChatConfig {
    fn default() -> Self {
        Self {
            forecast: ForecastConfig::default(),
            code_runner: CodeRunnerConfig::default(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ToolChatConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // TOOLCHAT_CODE_RUNNER__TIMEOUT_SECONDS=5 overrides code_runner.timeout_seconds
        builder = builder.add_source(
            Environment::with_prefix("TOOLCHAT")
                .prefix_separator("_")
                .separator("__")
                .list_separator(" ")
                .with_list_parse_key("code_runner.args")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: ToolChatConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("toolchat").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.forecast.base_url.is_empty() {
            self.forecast.base_url = default_forecast_base_url();
        }
        if self.forecast.timeout_seconds == 0 {
            self.forecast.timeout_seconds = default_forecast_timeout();
        }
        if self.code_runner.interpreter.is_empty() {
            self.code_runner.interpreter = default_interpreter();
        }
        if self.code_runner.timeout_seconds == 0 {
            self.code_runner.timeout_seconds = default_code_timeout();
        }
        if self.code_runner.max_output_bytes == 0 {
            self.code_runner.max_output_bytes = default_max_output_bytes();
        }
        if self.server.host.is_empty() {
            self.server.host = default_server_host();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.forecast.timeout_seconds > 300 {
            return Err(
                ToolChatError::config("Forecast API timeout cannot exceed 300 seconds").into(),
            );
        }

        if self.code_runner.timeout_seconds > 300 {
            return Err(
                ToolChatError::config("Code runner timeout cannot exceed 300 seconds").into(),
            );
        }

        if self.code_runner.max_output_bytes > MAX_OUTPUT_CAP_BYTES {
            return Err(ToolChatError::config(format!(
                "Code runner output cap cannot exceed {MAX_OUTPUT_CAP_BYTES} bytes"
            ))
            .into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(ToolChatError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(ToolChatError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        if !self.forecast.base_url.starts_with("http://")
            && !self.forecast.base_url.starts_with("https://")
        {
            return Err(ToolChatError::config(
                "Forecast API base URL must be a valid HTTP or HTTPS URL",
            )
            .into());
        }

        if self.code_runner.interpreter.trim().is_empty() {
            return Err(ToolChatError::config("Code runner interpreter cannot be blank").into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ToolChatConfig::default();
        assert_eq!(config.forecast.base_url, "https://api.open-meteo.com/v1");
        assert_eq!(config.forecast.timeout(), Duration::from_secs(8));
        assert_eq!(config.code_runner.interpreter, "python3");
        assert_eq!(config.code_runner.args, vec!["-u", "-"]);
        assert_eq!(config.code_runner.timeout(), Duration::from_secs(10));
        assert_eq!(config.code_runner.max_output_bytes, 1_048_576);
        assert_eq!(config.server.bind_address(), "127.0.0.1:3000");
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = ToolChatConfig::default();
        config.logging.level = "invalid".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_config_validation_numeric_ranges() {
        let mut config = ToolChatConfig::default();
        config.code_runner.timeout_seconds = 500;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("timeout cannot exceed"));
    }

    #[test]
    fn test_config_validation_base_url() {
        let mut config = ToolChatConfig::default();
        config.forecast.base_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_apply_defaults_repairs_zero_values() {
        let mut config = ToolChatConfig::default();
        config.forecast.timeout_seconds = 0;
        config.code_runner.max_output_bytes = 0;
        config.code_runner.interpreter = String::new();
        config.apply_defaults();
        assert_eq!(config.forecast.timeout_seconds, 8);
        assert_eq!(config.code_runner.max_output_bytes, 1_048_576);
        assert_eq!(config.code_runner.interpreter, "python3");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[forecast]
timeout_seconds = 4

[code_runner]
interpreter = "python3.12"
max_output_bytes = 2048
"#
        )
        .unwrap();

        let config = ToolChatConfig::load_from_path(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.forecast.timeout_seconds, 4);
        assert_eq!(config.forecast.base_url, "https://api.open-meteo.com/v1");
        assert_eq!(config.code_runner.interpreter, "python3.12");
        assert_eq!(config.code_runner.max_output_bytes, 2048);
        assert_eq!(config.code_runner.timeout_seconds, 10);
    }

    #[test]
    fn test_load_rejects_invalid_file_values() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[logging]\nformat = \"xml\"").unwrap();

        let result = ToolChatConfig::load_from_path(Some(file.path().to_path_buf()));
        assert!(result.is_err());
    }

    #[test]
    fn test_environment_variable_override() {
        let missing = PathBuf::from("/nonexistent/toolchat/config.toml");

        // SAFETY: Test environment, setting test values only
        unsafe {
            env::set_var("TOOLCHAT_SERVER__PORT", "4567");
        }

        let result = ToolChatConfig::load_from_path(Some(missing));

        // SAFETY: Test cleanup
        unsafe {
            env::remove_var("TOOLCHAT_SERVER__PORT");
        }

        assert_eq!(result.unwrap().server.port, 4567);
    }

    #[test]
    fn test_config_path_generation() {
        if let Some(path) = ToolChatConfig::get_config_path() {
            assert!(path.to_string_lossy().contains("toolchat"));
            assert!(path.to_string_lossy().ends_with("config.toml"));
        }
    }
}
