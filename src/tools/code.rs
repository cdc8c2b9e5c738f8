use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{Tool, ToolDefinition, parse_args};
use crate::code_runner::CodeRunner;
use crate::models::CodeExecutionRequest;
use crate::{Result, ToolChatError};

pub const TOOL_NAME: &str = "run_python_code";

#[derive(Debug, Deserialize)]
struct CodeArgs {
    #[serde(alias = "sourceText")]
    code: String,
}

/// Runs a short Python snippet and returns stdout, stderr and the exit code
pub struct CodeExecutionTool {
    runner: CodeRunner,
}

impl CodeExecutionTool {
    #[must_use]
    pub fn new(runner: CodeRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl Tool for CodeExecutionTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: TOOL_NAME.to_string(),
            description: "Execute a short Python 3 snippet for calculations or data analysis. \
                          Use print() to produce output. Runs for at most a few seconds with \
                          no network guarantees; the result contains stdout, stderr and exitCode \
                          (124 timeout, 127 interpreter missing)."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "code": {
                        "type": "string",
                        "minLength": 1,
                        "maxLength": CodeExecutionRequest::MAX_SOURCE_CHARS,
                        "description": "Python source code to execute"
                    }
                },
                "required": ["code"]
            }),
        }
    }

    async fn call(&self, args: Value) -> Result<Value> {
        let args: CodeArgs = parse_args(TOOL_NAME, args)?;
        let request = CodeExecutionRequest::new(args.code)?;
        let result = self.runner.run(&request).await;
        serde_json::to_value(result)
            .map_err(|e| ToolChatError::general(format!("Failed to serialize result: {e}")))
    }
}
