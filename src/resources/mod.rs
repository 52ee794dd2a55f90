//! Resource definitions for the portal widgets
//!
//! Each widget is a thin configuration record: a cache key, a TTL, a URL and
//! a validator that narrows the upstream JSON into a typed model. All of the
//! fetching and fallback logic lives in [`crate::loader`].

pub mod apps;
pub mod news;
pub mod weather;

pub use apps::{apps, AppEntry};
pub use news::{news, NewsArticle};
pub use weather::{
    weather, weather_code_to_condition, DailyForecast, WeatherCondition, WeatherReport,
};

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// The widgets that own a cached resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Apps,
    News,
    Weather,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [
        ResourceKind::Apps,
        ResourceKind::News,
        ResourceKind::Weather,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ResourceKind::Apps => "apps",
            ResourceKind::News => "news",
            ResourceKind::Weather => "weather",
        }
    }

    /// The cache key the widget stores its record under
    pub fn cache_key(self) -> &'static str {
        match self {
            ResourceKind::Apps => apps::CACHE_KEY,
            ResourceKind::News => news::CACHE_KEY,
            ResourceKind::Weather => weather::CACHE_KEY,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ResourceKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "apps" | "app" | "systems" => Ok(ResourceKind::Apps),
            "news" => Ok(ResourceKind::News),
            "weather" => Ok(ResourceKind::Weather),
            _ => Err(ConfigError::UnknownResource(s.to_string())),
        }
    }
}
