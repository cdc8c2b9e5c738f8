use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{Tool, ToolDefinition, parse_args};
use crate::Result;
use crate::models::{DailyVariable, ForecastRequest};
use crate::weather::ForecastClient;

pub const TOOL_NAME: &str = "get_weather_forecast";

#[derive(Debug, Deserialize)]
struct ForecastArgs {
    latitude: f64,
    longitude: f64,
    #[serde(default, alias = "forecastDays")]
    forecast_days: Option<u8>,
    #[serde(default, alias = "dailyVariables")]
    daily: Option<Vec<String>>,
}

impl ForecastArgs {
    fn into_request(self) -> Result<ForecastRequest> {
        let variables = self
            .daily
            .unwrap_or_default()
            .iter()
            .map(|name| name.parse::<DailyVariable>())
            .collect::<Result<Vec<_>>>()?;

        ForecastRequest::new(
            self.latitude,
            self.longitude,
            self.forecast_days
                .unwrap_or(ForecastRequest::DEFAULT_FORECAST_DAYS),
            variables,
        )
    }
}

/// Daily weather forecast lookup for a coordinate
pub struct WeatherForecastTool {
    client: ForecastClient,
}

impl WeatherForecastTool {
    #[must_use]
    pub fn new(client: ForecastClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for WeatherForecastTool {
    fn definition(&self) -> ToolDefinition {
        let variables: Vec<&str> = DailyVariable::DEFAULTS
            .iter()
            .map(|v| v.upstream_name())
            .collect();

        ToolDefinition {
            name: TOOL_NAME.to_string(),
            description: "Get the daily weather forecast (temperature, precipitation, wind, \
                          weather code) for a location given by latitude and longitude."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "latitude": {
                        "type": "number",
                        "minimum": -90,
                        "maximum": 90,
                        "description": "Latitude in decimal degrees"
                    },
                    "longitude": {
                        "type": "number",
                        "minimum": -180,
                        "maximum": 180,
                        "description": "Longitude in decimal degrees"
                    },
                    "forecast_days": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": ForecastRequest::MAX_FORECAST_DAYS,
                        "description": "Number of days to forecast (default 7)"
                    },
                    "daily": {
                        "type": "array",
                        "items": { "type": "string", "enum": variables },
                        "description": "Daily variables to include; all of them when omitted or empty"
                    }
                },
                "required": ["latitude", "longitude"]
            }),
        }
    }

    async fn call(&self, args: Value) -> Result<Value> {
        let request = parse_args::<ForecastArgs>(TOOL_NAME, args)?.into_request()?;
        Ok(self.client.fetch(&request).await.to_json())
    }
}
