//! Tool registry exposed to the language model
//!
//! Each tool publishes a JSON-schema definition and accepts JSON arguments.
//! Argument errors are the only failures reported as `Err`; everything that
//! goes wrong while a tool runs comes back inside its JSON result.

pub mod code;
pub mod forecast;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::code_runner::CodeRunner;
use crate::config::ToolChatConfig;
use crate::weather::ForecastClient;
use crate::{Result, ToolChatError};

pub use code::CodeExecutionTool;
pub use forecast::WeatherForecastTool;

/// What the model is told about a tool
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    /// Run the tool. `Err` means the arguments were rejected.
    async fn call(&self, args: Value) -> Result<Value>;
}

/// Deserialize tool arguments, reporting schema mismatches as validation errors
pub(crate) fn parse_args<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T> {
    serde_json::from_value(args)
        .map_err(|e| ToolChatError::validation(format!("Invalid arguments for {tool}: {e}")))
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the forecast and code execution tools built from `config`
    pub fn with_defaults(config: &ToolChatConfig) -> Result<Self> {
        let mut registry = Self::new();
        registry.register(Arc::new(WeatherForecastTool::new(ForecastClient::from_config(
            &config.forecast,
        )?)));
        registry.register(Arc::new(CodeExecutionTool::new(CodeRunner::from_config(
            &config.code_runner,
        ))));
        Ok(registry)
    }

    /// Add a tool, replacing any tool with the same name
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.definition().name;
        debug!("Registering tool {}", name);
        self.tools.insert(name, tool);
    }

    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|tool| tool.definition()).collect()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    #[instrument(skip(self, args))]
    pub async fn invoke(&self, name: &str, args: Value) -> Result<Value> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolChatError::validation(format!("Unknown tool '{name}'")))?;
        tool.call(args).await
    }
}
