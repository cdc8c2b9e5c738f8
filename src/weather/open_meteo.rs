//! Open-Meteo daily forecast client
//!
//! One GET per lookup, bounded by a deadline, with every failure folded into
//! [`ForecastResult::Error`] so the caller always receives data.

use std::time::{Duration, Instant};

use reqwest::{Client, Response, StatusCode, header};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::ForecastConfig;
use crate::models::{DailyEntry, Forecast, ForecastError, ForecastRequest, ForecastResult};
use crate::{Result, ToolChatError};

/// Message reported when the deadline expires
pub const TIMEOUT_MESSAGE: &str = "Request timed out";

/// Longest text excerpt kept from an error response body
const ERROR_BODY_EXCERPT_CHARS: usize = 1000;

/// Why a forecast lookup failed
#[derive(Debug, Error)]
pub enum ForecastFailure {
    #[error("Request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("Forecast API returned HTTP {status}")]
    Status {
        status: StatusCode,
        details: Option<Value>,
    },

    #[error("Invalid JSON in forecast response: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Invalid forecast response format: {0}")]
    Format(String),
}

impl From<ForecastFailure> for ForecastError {
    fn from(failure: ForecastFailure) -> Self {
        let message = failure.to_string();
        match failure {
            ForecastFailure::Status { status, details } => ForecastError {
                error: message,
                status: Some(status.as_u16()),
                status_text: status.canonical_reason().map(str::to_string),
                details,
            },
            _ => ForecastError::new(message),
        }
    }
}

/// HTTP client for the Open-Meteo forecast endpoint
#[derive(Debug, Clone)]
pub struct ForecastClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl ForecastClient {
    /// Create a client for `base_url` (e.g. `https://api.open-meteo.com/v1`)
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("ToolChat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ToolChatError::general(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn from_config(config: &ForecastConfig) -> Result<Self> {
        Self::new(config.base_url.clone(), config.timeout())
    }

    #[must_use]
    pub fn forecast_url(&self, request: &ForecastRequest) -> String {
        format!(
            "{}/forecast?latitude={}&longitude={}&daily={}&forecast_days={}&timezone=auto",
            self.base_url,
            request.latitude(),
            request.longitude(),
            request.daily_parameter(),
            request.forecast_days()
        )
    }

    /// Look up the daily forecast. Never fails; errors come back as
    /// [`ForecastResult::Error`].
    #[instrument(
        skip(self, request),
        fields(
            lat = request.latitude(),
            lon = request.longitude(),
            days = request.forecast_days()
        )
    )]
    pub async fn fetch(&self, request: &ForecastRequest) -> ForecastResult {
        let start_time = Instant::now();

        let outcome = match tokio::time::timeout(self.timeout, self.try_fetch(request)).await {
            Ok(outcome) => outcome,
            Err(_elapsed) => Err(ForecastFailure::Timeout),
        };

        match outcome {
            Ok(forecast) => {
                info!(
                    "Retrieved {}-day forecast in {:.3}s",
                    forecast.forecast.len(),
                    start_time.elapsed().as_secs_f64()
                );
                ForecastResult::Success(forecast)
            }
            Err(failure) => {
                warn!(
                    "Forecast lookup failed after {:.3}s: {}",
                    start_time.elapsed().as_secs_f64(),
                    failure
                );
                ForecastResult::Error(failure.into())
            }
        }
    }

    async fn try_fetch(
        &self,
        request: &ForecastRequest,
    ) -> std::result::Result<Forecast, ForecastFailure> {
        let url = self.forecast_url(request);
        debug!("Open-Meteo request URL: {}", url);

        let response = self
            .client
            .get(&url)
            .header(header::CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        debug!("HTTP response received: {}", status);

        if !status.is_success() {
            let details = read_error_details(response).await;
            return Err(ForecastFailure::Status { status, details });
        }

        let bytes = response.bytes().await.map_err(classify_transport_error)?;
        let body: Value = serde_json::from_slice(&bytes).map_err(ForecastFailure::InvalidJson)?;
        let forecast = reshape_daily(request, &body)?;

        Ok(Forecast {
            latitude: request.latitude(),
            longitude: request.longitude(),
            forecast_days: request.forecast_days(),
            daily: request.upstream_names(),
            forecast,
        })
    }
}

fn classify_transport_error(err: reqwest::Error) -> ForecastFailure {
    if err.is_timeout() {
        ForecastFailure::Timeout
    } else {
        ForecastFailure::Network(err)
    }
}

/// Best-effort excerpt of an error body. Read failures are dropped.
async fn read_error_details(response: Response) -> Option<Value> {
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|content_type| content_type.to_ascii_lowercase().contains("json"));

    let bytes = match response.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!("Could not read error response body: {}", e);
            return None;
        }
    };

    if is_json {
        if let Some(value) = parse_json_body(&bytes) {
            return Some(value);
        }
    }
    text_excerpt(&bytes).map(Value::String)
}

fn parse_json_body(bytes: &[u8]) -> Option<Value> {
    serde_json::from_slice(bytes).ok()
}

fn text_excerpt(bytes: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(bytes);
    if text.is_empty() {
        None
    } else {
        Some(text.chars().take(ERROR_BODY_EXCERPT_CHARS).collect())
    }
}

/// Zip `daily.time` with each requested variable's column.
///
/// Every column must be exactly as long as the date column; a partial table is
/// never produced.
fn reshape_daily(
    request: &ForecastRequest,
    body: &Value,
) -> std::result::Result<Vec<DailyEntry>, ForecastFailure> {
    let daily = body
        .get("daily")
        .and_then(Value::as_object)
        .ok_or_else(|| ForecastFailure::Format("missing daily data".to_string()))?;

    let dates = daily
        .get("time")
        .and_then(Value::as_array)
        .ok_or_else(|| ForecastFailure::Format("daily.time is missing or not an array".to_string()))?;

    let dates: Vec<&str> = dates
        .iter()
        .map(Value::as_str)
        .collect::<Option<_>>()
        .ok_or_else(|| {
            ForecastFailure::Format("daily.time contains non-string entries".to_string())
        })?;

    let mut columns = Vec::with_capacity(request.daily_variables().len());
    for &variable in request.daily_variables() {
        let field = variable.upstream_name();
        let column = daily.get(field).and_then(Value::as_array).ok_or_else(|| {
            ForecastFailure::Format(format!("daily.{field} is missing or not an array"))
        })?;

        if column.len() != dates.len() {
            return Err(ForecastFailure::Format(format!(
                "daily.{field} has {} values but daily.time has {}",
                column.len(),
                dates.len()
            )));
        }
        columns.push((variable, column));
    }

    Ok(dates
        .iter()
        .enumerate()
        .map(|(i, date)| {
            let values = columns
                .iter()
                .map(|(variable, column)| (*variable, column[i].clone()))
                .collect();
            DailyEntry::new((*date).to_string(), values)
        })
        .collect())
}
