//! Weather panel backed by the Open-Meteo forecast API
//!
//! The panel needs the current temperature and weather code plus a daily
//! forecast strip. A response without a `current` block is rejected; the
//! daily block is optional.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::error::{ResourceError, ValidationError};
use crate::loader::Resource;
use crate::validate::Validator;

pub const CACHE_KEY: &str = "WEATHER_CACHE_V1";

pub const TTL: Duration = Duration::from_secs(10 * 60);

/// Open-Meteo forecast for Ulaanbaatar with the fields the panel renders
pub const DEFAULT_URL: &str = "https://api.open-meteo.com/v1/forecast?latitude=47.92&longitude=106.92&current=temperature_2m,weather_code&daily=weather_code,temperature_2m_max,temperature_2m_min&timezone=Asia%2FUlaanbaatar";

/// Types of weather conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeatherCondition {
    Clear,
    PartlyCloudy,
    Cloudy,
    Rain,
    Showers,
    Thunderstorm,
    Snow,
    Fog,
}

/// Current conditions and the daily outlook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    /// Current temperature in Celsius
    pub temperature: f64,
    pub weather_code: u8,
    pub condition: WeatherCondition,
    pub daily: Vec<DailyForecast>,
}

/// One day of the forecast strip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    pub date: NaiveDate,
    pub condition: WeatherCondition,
    pub max: f64,
    pub min: Option<f64>,
}

/// Map WMO weather code to WeatherCondition enum
///
/// - 0: Clear sky
/// - 1-3: Partly cloudy
/// - 45, 48: Fog
/// - 51-55, 61-65, 80-82: Drizzle, rain, rain showers
/// - 56-57, 66-67: Freezing drizzle and rain
/// - 71-77, 85-86: Snow
/// - 95-99: Thunderstorm
pub fn weather_code_to_condition(code: u8) -> WeatherCondition {
    match code {
        0 => WeatherCondition::Clear,
        1..=3 => WeatherCondition::PartlyCloudy,
        45 | 48 => WeatherCondition::Fog,
        51..=55 | 61..=65 | 80..=82 => WeatherCondition::Rain,
        56..=57 | 66..=67 => WeatherCondition::Showers,
        71..=77 | 85..=86 => WeatherCondition::Snow,
        95..=99 => WeatherCondition::Thunderstorm,
        _ => WeatherCondition::Cloudy, // Default for unknown codes
    }
}

/// Open-Meteo API response structure
#[derive(Debug, Deserialize)]
struct OpenMeteoResponse {
    current: CurrentWeather,
    #[serde(default)]
    daily: Option<DailyWeather>,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    temperature_2m: f64,
    weather_code: u8,
}

#[derive(Debug, Deserialize)]
struct DailyWeather {
    time: Vec<String>,
    weather_code: Vec<u8>,
    temperature_2m_max: Vec<f64>,
    #[serde(default)]
    temperature_2m_min: Vec<f64>,
}

fn parse(value: &Value) -> Result<WeatherReport, ValidationError> {
    if !value.get("current").is_some_and(Value::is_object) {
        return Err(ValidationError::new("expected a 'current' object"));
    }

    let response = OpenMeteoResponse::deserialize(value)
        .map_err(|e| ValidationError::new(format!("bad forecast: {}", e)))?;

    let daily = match response.daily {
        Some(daily) => parse_daily(&daily)?,
        None => Vec::new(),
    };

    Ok(WeatherReport {
        temperature: response.current.temperature_2m,
        weather_code: response.current.weather_code,
        condition: weather_code_to_condition(response.current.weather_code),
        daily,
    })
}

fn parse_daily(daily: &DailyWeather) -> Result<Vec<DailyForecast>, ValidationError> {
    let len = daily.time.len();
    if daily.weather_code.len() != len || daily.temperature_2m_max.len() != len {
        return Err(ValidationError::new("daily arrays have inconsistent lengths"));
    }

    daily
        .time
        .iter()
        .enumerate()
        .map(|(i, day)| {
            let date = NaiveDate::parse_from_str(day, "%Y-%m-%d")
                .map_err(|_| ValidationError::new(format!("invalid date: {}", day)))?;
            Ok(DailyForecast {
                date,
                condition: weather_code_to_condition(daily.weather_code[i]),
                max: daily.temperature_2m_max[i],
                min: daily.temperature_2m_min.get(i).copied(),
            })
        })
        .collect()
}

/// The weather panel resource at `url`
pub fn weather(url: impl Into<String>) -> Result<Resource<WeatherReport>, ResourceError> {
    Resource::new(CACHE_KEY, url, TTL, Validator::new(parse))
}
