// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::category::{Category, CategoryFilter};

/// Which adapter produced an item; the client filters on this, not on `source`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Rss,
    Twitter,
    Reddit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    #[serde(rename = "type")]
    pub kind: String, // "image"
    pub url: String,
}

impl Media {
    pub fn image(url: impl Into<String>) -> Self {
        Self {
            kind: "image".to_string(),
            url: url.into(),
        }
    }
}

/// Normalized record shared by every adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub id: String,
    pub text: String,
    pub source: String, // e.g. "r/sixers", "@ShamsCharania", "Liberty Ballers"
    pub handle: String, // e.g. "u/someone", "@ShamsCharania", "www.libertyballers.com"
    pub verified: bool,
    pub profile_image: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub category: Category,
    pub is_featured: bool,
    pub likes: u64,
    pub retweets: u64,
    pub replies: u64,
    pub media: Vec<Media>,
    pub provider: Provider,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl NewsItem {
    /// Item with display defaults; adapters fill in counters and media.
    pub fn new(
        id: String,
        text: String,
        source: String,
        handle: String,
        timestamp: DateTime<Utc>,
        category: Category,
        provider: Provider,
    ) -> Self {
        Self {
            id,
            text,
            source,
            handle,
            verified: false,
            profile_image: None,
            timestamp,
            category,
            is_featured: false,
            likes: 0,
            retweets: 0,
            replies: 0,
            media: Vec::new(),
            provider,
            url: None,
        }
    }
}

/// Per-request options every adapter honours.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOptions {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub max_results: usize,
    pub category: CategoryFilter,
    /// Set by the aggregator; adapters that fan out return what finished by then.
    pub deadline: Option<tokio::time::Instant>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            max_results: crate::aggregate::DEFAULT_MAX_RESULTS,
            category: CategoryFilter::Any,
            deadline: None,
        }
    }
}

impl FetchOptions {
    /// Range + category check applied by adapters before emitting an item.
    pub fn admits(&self, ts: DateTime<Utc>, category: Category) -> bool {
        super::within_range(ts, self.start, self.end) && self.category.admits(category)
    }
}

#[async_trait::async_trait]
pub trait NewsProvider: Send + Sync {
    /// Fetch and normalize items. Failing individual sources are skipped,
    /// so `Err` means the adapter as a whole could not run.
    async fn fetch(&self, opts: &FetchOptions) -> Result<Vec<NewsItem>>;
    /// Selection key used in request `providers` lists ("rss", "reddit").
    fn name(&self) -> &'static str;
}
