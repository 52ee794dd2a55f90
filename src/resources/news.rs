//! News feed
//!
//! The feed is a Next.js data route; the articles sit at
//! `pageProps.articles.articles`. The whole response is cached, and the
//! article list is extracted on every read.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::error::{ResourceError, ValidationError};
use crate::loader::Resource;
use crate::validate::{at_path, Validator};

pub const CACHE_KEY: &str = "TESO_NEWS_CACHE_V1";

/// Also the widget's refresh interval
pub const TTL: Duration = Duration::from_secs(15 * 60);

const ARTICLES_PATH: [&str; 3] = ["pageProps", "articles", "articles"];

/// A news card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsArticle {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// Publication time in epoch milliseconds
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub content: Option<ArticleContent>,
}

/// Attached media of an article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleContent {
    #[serde(default)]
    pub path: String,
}

impl NewsArticle {
    pub fn link(&self, base_url: &str) -> String {
        format!("{}/news/all/article/{}", base_url.trim_end_matches('/'), self.id)
    }

    /// Image URL, if the article has an image
    pub fn image_url(&self, base_url: &str) -> Option<String> {
        self.content
            .as_ref()
            .filter(|c| !c.path.is_empty())
            .map(|c| format!("{}/images/{}", base_url.trim_end_matches('/'), c.path))
    }

    pub fn published(&self) -> Option<DateTime<Utc>> {
        self.created_at
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }
}

fn parse(value: &Value) -> Result<Vec<NewsArticle>, ValidationError> {
    let articles = at_path(value, &ARTICLES_PATH)
        .filter(|v| v.is_array())
        .ok_or_else(|| ValidationError::new("expected pageProps.articles.articles array"))?;

    Vec::<NewsArticle>::deserialize(articles)
        .map_err(|e| ValidationError::new(format!("bad article: {}", e)))
}

/// The news feed resource at `url`
pub fn news(url: impl Into<String>) -> Result<Resource<Vec<NewsArticle>>, ResourceError> {
    Resource::new(CACHE_KEY, url, TTL, Validator::new(parse))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "pageProps": {
                "articles": {
                    "articles": [
                        {
                            "_id": "65a1",
                            "title": "Winter maintenance schedule",
                            "createdAt": 1_705_000_000_000_i64,
                            "content": {"_id": "c1", "path": "news/65a1.jpg", "type": "image"}
                        },
                        {"_id": "65a2", "title": "No image"}
                    ]
                }
            }
        })
    }

    #[test]
    fn test_parse_articles() {
        let articles = parse(&sample()).unwrap();

        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].title, "Winter maintenance schedule");
        assert_eq!(articles[0].created_at, Some(1_705_000_000_000));
        assert!(articles[1].content.is_none());
    }

    #[test]
    fn test_missing_article_array_is_invalid() {
        assert!(parse(&json!({"pageProps": {"articles": {}}})).is_err());
        assert!(parse(&json!({"pageProps": {"articles": {"articles": "none"}}})).is_err());
        assert!(parse(&json!(null)).is_err());
    }

    #[test]
    fn test_empty_article_list_is_valid() {
        let payload = json!({"pageProps": {"articles": {"articles": []}}});
        assert_eq!(parse(&payload).unwrap(), vec![]);
    }

    #[test]
    fn test_links() {
        let articles = parse(&sample()).unwrap();

        assert_eq!(
            articles[0].link("https://teso.mn/"),
            "https://teso.mn/news/all/article/65a1"
        );
        assert_eq!(
            articles[0].image_url("https://teso.mn").as_deref(),
            Some("https://teso.mn/images/news/65a1.jpg")
        );
        assert!(articles[1].image_url("https://teso.mn").is_none());
    }

    #[test]
    fn test_published() {
        let articles = parse(&sample()).unwrap();
        let published = articles[0].published().unwrap();
        assert_eq!(published.timestamp_millis(), 1_705_000_000_000);
        assert!(articles[1].published().is_none());
    }
}
