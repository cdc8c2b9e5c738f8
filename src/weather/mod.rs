//! Weather forecast lookups

pub mod open_meteo;

use std::fmt::Write;

use chrono::NaiveDate;
use serde_json::Value;

use crate::models::{DailyVariable, Forecast};

pub use open_meteo::{ForecastClient, ForecastFailure, TIMEOUT_MESSAGE};

/// Convert a WMO weather code, as reported by Open-Meteo, to a human-readable description
#[must_use]
pub fn weather_code_to_description(code: u8) -> &'static str {
    match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 => "Fog",
        48 => "Depositing rime fog",
        51 => "Light drizzle",
        53 => "Moderate drizzle",
        55 => "Dense drizzle",
        56 => "Light freezing drizzle",
        57 => "Dense freezing drizzle",
        61 => "Slight rain",
        63 => "Moderate rain",
        65 => "Heavy rain",
        66 => "Light freezing rain",
        67 => "Heavy freezing rain",
        71 => "Slight snow fall",
        73 => "Moderate snow fall",
        75 => "Heavy snow fall",
        77 => "Snow grains",
        80 => "Slight rain showers",
        81 => "Moderate rain showers",
        82 => "Violent rain showers",
        85 => "Slight snow showers",
        86 => "Heavy snow showers",
        95 => "Thunderstorm",
        96 => "Thunderstorm with slight hail",
        99 => "Thunderstorm with heavy hail",
        _ => "Unknown",
    }
}

/// Render a forecast as a plain-text table, one row per day
#[must_use]
pub fn render_table(forecast: &Forecast) -> String {
    let mut out = format!(
        "Forecast for {:.4}, {:.4} ({} days)\n",
        forecast.latitude, forecast.longitude, forecast.forecast_days
    );

    let _ = write!(out, "{:<10}  {:<3}", "Date", "Day");
    let variables: Vec<DailyVariable> = forecast
        .forecast
        .first()
        .map(|entry| entry.values().map(|(variable, _)| variable).collect())
        .unwrap_or_default();
    for variable in &variables {
        let _ = write!(out, "  {:>14}", column_title(*variable));
    }
    out.push('\n');

    for entry in &forecast.forecast {
        let weekday = NaiveDate::parse_from_str(entry.date(), "%Y-%m-%d")
            .map(|date| date.format("%a").to_string())
            .unwrap_or_default();
        let _ = write!(out, "{:<10}  {:<3}", entry.date(), weekday);
        for (variable, value) in entry.values() {
            let _ = write!(out, "  {:>14}", format_cell(variable, value));
        }
        out.push('\n');
    }
    out
}

fn column_title(variable: DailyVariable) -> &'static str {
    match variable {
        DailyVariable::TemperatureMax => "Max (C)",
        DailyVariable::TemperatureMin => "Min (C)",
        DailyVariable::Precipitation => "Precip (mm)",
        DailyVariable::WindspeedMax => "Wind (km/h)",
        DailyVariable::Weathercode => "Conditions",
    }
}

fn format_cell(variable: DailyVariable, value: &Value) -> String {
    match (variable, value) {
        (_, Value::Null) => "-".to_string(),
        (DailyVariable::Weathercode, Value::Number(n)) => n
            .as_u64()
            .and_then(|code| u8::try_from(code).ok())
            .map_or("Unknown", weather_code_to_description)
            .to_string(),
        (_, Value::Number(n)) => n
            .as_f64()
            .map_or_else(|| n.to_string(), |v| format!("{v:.1}")),
        (_, other) => other.to_string(),
    }
}
