//! HTTP endpoints for listing and invoking tools

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::tools::{ToolDefinition, ToolRegistry};

pub type SharedRegistry = Arc<ToolRegistry>;

type ApiError = (StatusCode, Json<Value>);

pub fn router(registry: SharedRegistry) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/tools", get(list_tools))
        .route("/tools/{name}", post(invoke_tool))
        .with_state(registry)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": crate::VERSION }))
}

async fn list_tools(State(registry): State<SharedRegistry>) -> Json<Vec<ToolDefinition>> {
    Json(registry.definitions())
}

/// Tool failures are part of the 200 body; only rejected arguments are HTTP errors.
async fn invoke_tool(
    State(registry): State<SharedRegistry>,
    Path(name): Path<String>,
    Json(args): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    if registry.get(&name).is_none() {
        return Err(api_error(
            StatusCode::NOT_FOUND,
            format!("Unknown tool '{name}'"),
        ));
    }

    info!("Invoking tool {}", name);
    match registry.invoke(&name, args).await {
        Ok(result) => Ok(Json(result)),
        Err(err) if err.is_validation() => {
            warn!("Rejected arguments for {}: {}", name, err);
            Err(api_error(StatusCode::BAD_REQUEST, err.to_string()))
        }
        Err(err) => {
            warn!("Tool {} failed: {}", name, err);
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, err.user_message()))
        }
    }
}

fn api_error(status: StatusCode, message: String) -> ApiError {
    (status, Json(json!({ "error": message })))
}
