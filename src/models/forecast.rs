//! Forecast request and result models

use std::fmt;
use std::str::FromStr;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::Value;

use crate::{Result, ToolChatError};

/// One daily metric the upstream forecast API can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DailyVariable {
    TemperatureMax,
    TemperatureMin,
    Precipitation,
    WindspeedMax,
    Weathercode,
}

impl DailyVariable {
    /// Variables requested when the caller does not name any
    pub const DEFAULTS: [DailyVariable; 5] = [
        DailyVariable::TemperatureMax,
        DailyVariable::TemperatureMin,
        DailyVariable::Precipitation,
        DailyVariable::WindspeedMax,
        DailyVariable::Weathercode,
    ];

    /// Field name used in the upstream query and response
    #[must_use]
    pub fn upstream_name(self) -> &'static str {
        match self {
            DailyVariable::TemperatureMax => "temperature_2m_max",
            DailyVariable::TemperatureMin => "temperature_2m_min",
            DailyVariable::Precipitation => "precipitation_sum",
            DailyVariable::WindspeedMax => "windspeed_10m_max",
            DailyVariable::Weathercode => "weathercode",
        }
    }

    /// Field name used in the tool output
    #[must_use]
    pub fn output_name(self) -> &'static str {
        match self {
            DailyVariable::TemperatureMax => "temperature_max",
            DailyVariable::TemperatureMin => "temperature_min",
            DailyVariable::Precipitation => "precipitation",
            DailyVariable::WindspeedMax => "windspeed_max",
            DailyVariable::Weathercode => "weathercode",
        }
    }
}

impl fmt::Display for DailyVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.upstream_name())
    }
}

impl FromStr for DailyVariable {
    type Err = ToolChatError;

    /// Accepts both the upstream and the output spelling
    fn from_str(s: &str) -> Result<Self> {
        DailyVariable::DEFAULTS
            .into_iter()
            .find(|v| v.upstream_name() == s || v.output_name() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = DailyVariable::DEFAULTS
                    .iter()
                    .map(|v| v.upstream_name())
                    .collect();
                ToolChatError::validation(format!(
                    "Unknown daily variable '{s}'. Must be one of: {}",
                    names.join(", ")
                ))
            })
    }
}

/// Validated forecast query. Fields are private so an instance is always in range.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRequest {
    latitude: f64,
    longitude: f64,
    forecast_days: u8,
    daily_variables: Vec<DailyVariable>,
}

impl ForecastRequest {
    pub const DEFAULT_FORECAST_DAYS: u8 = 7;
    pub const MAX_FORECAST_DAYS: u8 = 7;

    /// Build a request. An empty variable list means the default set;
    /// repeated variables keep their first position.
    pub fn new(
        latitude: f64,
        longitude: f64,
        forecast_days: u8,
        daily_variables: Vec<DailyVariable>,
    ) -> Result<Self> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(ToolChatError::validation(format!(
                "latitude must be between -90 and 90, got {latitude}"
            )));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(ToolChatError::validation(format!(
                "longitude must be between -180 and 180, got {longitude}"
            )));
        }
        if !(1..=Self::MAX_FORECAST_DAYS).contains(&forecast_days) {
            return Err(ToolChatError::validation(format!(
                "forecast_days must be between 1 and {}, got {forecast_days}",
                Self::MAX_FORECAST_DAYS
            )));
        }

        let mut variables = Vec::with_capacity(DailyVariable::DEFAULTS.len());
        for variable in daily_variables {
            if !variables.contains(&variable) {
                variables.push(variable);
            }
        }
        if variables.is_empty() {
            variables.extend(DailyVariable::DEFAULTS);
        }

        Ok(Self {
            latitude,
            longitude,
            forecast_days,
            daily_variables: variables,
        })
    }

    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    #[must_use]
    pub fn forecast_days(&self) -> u8 {
        self.forecast_days
    }

    #[must_use]
    pub fn daily_variables(&self) -> &[DailyVariable] {
        &self.daily_variables
    }

    /// Comma-joined upstream names, as sent in the `daily` query parameter
    #[must_use]
    pub fn daily_parameter(&self) -> String {
        self.upstream_names().join(",")
    }

    #[must_use]
    pub fn upstream_names(&self) -> Vec<String> {
        self.daily_variables
            .iter()
            .map(|v| v.upstream_name().to_string())
            .collect()
    }
}

/// One forecast day: the date plus the requested variables in request order
#[derive(Debug, Clone, PartialEq)]
pub struct DailyEntry {
    date: String,
    values: Vec<(DailyVariable, Value)>,
}

impl DailyEntry {
    #[must_use]
    pub fn new(date: String, values: Vec<(DailyVariable, Value)>) -> Self {
        Self { date, values }
    }

    #[must_use]
    pub fn date(&self) -> &str {
        &self.date
    }

    #[must_use]
    pub fn get(&self, variable: DailyVariable) -> Option<&Value> {
        self.values
            .iter()
            .find(|(v, _)| *v == variable)
            .map(|(_, value)| value)
    }

    pub fn values(&self) -> impl Iterator<Item = (DailyVariable, &Value)> {
        self.values.iter().map(|(v, value)| (*v, value))
    }
}

impl Serialize for DailyEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + 1))?;
        map.serialize_entry("date", &self.date)?;
        for (variable, value) in &self.values {
            map.serialize_entry(variable.output_name(), value)?;
        }
        map.end()
    }
}

/// Successful forecast lookup
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    pub latitude: f64,
    pub longitude: f64,
    pub forecast_days: u8,
    /// Upstream variable names that were requested
    pub daily: Vec<String>,
    pub forecast: Vec<DailyEntry>,
}

/// Failed forecast lookup, reported to the model as data
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastError {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(rename = "statusText", skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ForecastError {
    pub fn new<S: Into<String>>(error: S) -> Self {
        Self {
            error: error.into(),
            status: None,
            status_text: None,
            details: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ForecastResult {
    Success(Forecast),
    Error(ForecastError),
}

impl ForecastResult {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, ForecastResult::Success(_))
    }

    /// Serialize into the JSON value handed back to the model
    #[must_use]
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            serde_json::json!({ "error": format!("Failed to serialize forecast: {e}") })
        })
    }
}
