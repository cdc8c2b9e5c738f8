//! HTTP API tests driven through the router without binding a port

use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use tower::ServiceExt;

use toolchat::tools::{CodeExecutionTool, WeatherForecastTool};
use toolchat::{CodeRunner, ForecastClient, ToolRegistry, web};

/// Serve `router` on an ephemeral port standing in for Open-Meteo
async fn spawn_upstream(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

async fn forecast_upstream() -> String {
    spawn_upstream(Router::new().route(
        "/forecast",
        get(|| async {
            Json(json!({
                "latitude": 52.52,
                "longitude": 13.419998,
                "daily": {
                    "time": ["2024-06-03", "2024-06-04"],
                    "temperature_2m_max": [21.4, 23.0],
                    "weathercode": [3, 61]
                }
            }))
        }),
    ))
    .await
}

fn app(base_url: &str) -> Router {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(WeatherForecastTool::new(
        ForecastClient::new(base_url, Duration::from_secs(5)).unwrap(),
    )));
    registry.register(Arc::new(CodeExecutionTool::new(
        CodeRunner::new("sh").with_args(["-s"]),
    )));
    web::app(Arc::new(registry), None)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, body)
}

fn post(uri: &str, body: Value) -> Request<Body> {
    let body = body.to_string();
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("content-length", body.len())
        .body(Body::from(body))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health() {
    let (status, body) = send(app("http://127.0.0.1:9"), get_request("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], toolchat::VERSION);
}

#[tokio::test]
async fn test_list_tools() {
    let (status, body) = send(app("http://127.0.0.1:9"), get_request("/api/tools")).await;
    assert_eq!(status, StatusCode::OK);

    let tools = body.as_array().unwrap();
    assert_eq!(tools.len(), 2);
    assert_eq!(tools[0]["name"], "get_weather_forecast");
    assert_eq!(tools[0]["parameters"]["required"], json!(["latitude", "longitude"]));
    assert_eq!(tools[1]["name"], "run_python_code");
}

#[tokio::test]
async fn test_forecast_tool_round_trip() {
    let base_url = forecast_upstream().await;
    let (status, body) = send(
        app(&base_url),
        post(
            "/api/tools/get_weather_forecast",
            json!({
                "latitude": 52.52,
                "longitude": 13.41,
                "forecast_days": 2,
                "daily": ["temperature_2m_max", "weathercode"]
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["latitude"], 52.52);
    assert_eq!(body["longitude"], 13.41);
    assert_eq!(body["forecast_days"], 2);
    assert_eq!(body["daily"], json!(["temperature_2m_max", "weathercode"]));
    assert_eq!(
        body["forecast"],
        json!([
            { "date": "2024-06-03", "temperature_max": 21.4, "weathercode": 3 },
            { "date": "2024-06-04", "temperature_max": 23.0, "weathercode": 61 }
        ])
    );
}

#[tokio::test]
async fn test_upstream_failure_is_returned_as_data() {
    let base_url = spawn_upstream(Router::new().route(
        "/forecast",
        get(|| async {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": true, "reason": "Invalid daily variable" })),
            )
        }),
    ))
    .await;

    let (status, body) = send(
        app(&base_url),
        post(
            "/api/tools/get_weather_forecast",
            json!({ "latitude": 1.0, "longitude": 2.0 }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], 400);
    assert_eq!(body["statusText"], "Bad Request");
    assert_eq!(body["details"]["reason"], "Invalid daily variable");
    assert!(body["error"].as_str().unwrap().contains("400"));
}

#[tokio::test]
async fn test_invalid_arguments_are_bad_request() {
    let (status, body) = send(
        app("http://127.0.0.1:9"),
        post(
            "/api/tools/get_weather_forecast",
            json!({ "latitude": 91.0, "longitude": 0.0 }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("latitude"));
}

#[tokio::test]
async fn test_unknown_tool_is_not_found() {
    let (status, body) = send(
        app("http://127.0.0.1:9"),
        post("/api/tools/launch_rockets", json!({})),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("launch_rockets"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_code_tool_round_trip() {
    let (status, body) = send(
        app("http://127.0.0.1:9"),
        post(
            "/api/tools/run_python_code",
            json!({ "code": "echo hello; echo oops >&2; exit 2" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "stdout": "hello\n", "stderr": "oops\n", "exitCode": 2 })
    );
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let code = "#".repeat(300 * 1024);
    let (status, _) = send(
        app("http://127.0.0.1:9"),
        post("/api/tools/run_python_code", json!({ "code": code })),
    )
    .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}
