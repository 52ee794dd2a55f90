//! App launcher list
//!
//! The systems endpoint answers `{"status": ..., "result": [...]}`. Entries
//! accept both the API's snake_case fields and the legacy upper-case ones.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::error::{ResourceError, ValidationError};
use crate::loader::Resource;
use crate::validate::{has_array, Validator};

pub const CACHE_KEY: &str = "APP_SYSTEMS_CACHE_V1";

/// The list of systems rarely changes
pub const TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// One tile in the app launcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppEntry {
    #[serde(alias = "ID")]
    pub id: i64,
    #[serde(alias = "NAME")]
    pub name: String,
    #[serde(alias = "LINK")]
    pub link: String,
    #[serde(alias = "IMAGE_PATH", default)]
    pub image_path: Option<String>,
}

impl AppEntry {
    /// Icon URL under the image host, if the entry has an icon
    pub fn icon_url(&self, image_base: &str) -> Option<String> {
        self.image_path
            .as_deref()
            .map(|path| format!("{}{}", image_base, path))
    }
}

fn parse(value: &Value) -> Result<Vec<AppEntry>, ValidationError> {
    if value.get("status").is_none() || !has_array(value, &["result"]) {
        return Err(ValidationError::new("expected {status, result: array}"));
    }
    Vec::<AppEntry>::deserialize(&value["result"])
        .map_err(|e| ValidationError::new(format!("bad app entry: {}", e)))
}

/// The app launcher resource at `url`
pub fn apps(url: impl Into<String>) -> Result<Resource<Vec<AppEntry>>, ResourceError> {
    Resource::new(CACHE_KEY, url, TTL, Validator::new(parse))
}
