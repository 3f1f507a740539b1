// src/ingest/providers/reddit.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use metrics::{counter, histogram};
use serde::Deserialize;
use std::sync::Arc;

use crate::category::classify;
use crate::ingest::config::SourcesConfig;
use crate::ingest::types::{FetchOptions, Media, NewsItem, NewsProvider, Provider};
use crate::ingest::upstream::Upstream;

#[derive(Debug, Deserialize)]
struct Listing {
    #[serde(default)]
    data: ListingData,
}

#[derive(Debug, Default, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    id: String,
    title: Option<String>,
    author: Option<String>,
    created_utc: Option<f64>, // unix seconds, fractional
    ups: Option<i64>,
    num_comments: Option<i64>,
    thumbnail: Option<String>,
    permalink: Option<String>,
}

fn count(v: Option<i64>) -> u64 {
    v.and_then(|x| u64::try_from(x).ok()).unwrap_or(0)
}

fn post_timestamp(created_utc: Option<f64>, now: DateTime<Utc>) -> DateTime<Utc> {
    created_utc
        .filter(|s| s.is_finite())
        .and_then(|s| DateTime::<Utc>::from_timestamp_millis((s * 1_000.0) as i64))
        .unwrap_or(now)
}

/// Map one community's search listing to admitted items.
pub fn listing_items(
    community: &str,
    body: &str,
    opts: &FetchOptions,
    now: DateTime<Utc>,
) -> Result<Vec<NewsItem>> {
    let listing: Listing = serde_json::from_str(body)
        .with_context(|| format!("parsing r/{community} search json"))?;

    let mut out = Vec::with_capacity(listing.data.children.len());
    for Child { data: post } in listing.data.children {
        let ts = post_timestamp(post.created_utc, now);
        let text = post.title.unwrap_or_default();
        let category = classify(&text);
        if !opts.admits(ts, category) {
            continue;
        }
        let mut item = NewsItem::new(
            format!("reddit-{}", post.id),
            text,
            format!("r/{community}"),
            format!("u/{}", post.author.as_deref().unwrap_or("[deleted]")),
            ts,
            category,
            Provider::Reddit,
        );
        item.likes = count(post.ups);
        item.replies = count(post.num_comments);
        // "self", "default", "nsfw" are placeholders, not images
        if let Some(thumb) = post.thumbnail.filter(|t| t.starts_with("http")) {
            item.media.push(Media::image(thumb));
        }
        item.url = Some(match post.permalink {
            Some(p) => format!("https://www.reddit.com{p}"),
            None => format!("https://www.reddit.com/r/{community}"),
        });
        out.push(item);
    }
    Ok(out)
}

/// Forum adapter: keyword search in each community, newest first.
pub struct RedditProvider {
    upstream: Arc<dyn Upstream>,
    base_url: String,
    query: String,
    communities: Vec<String>,
}

impl RedditProvider {
    pub fn new(
        upstream: Arc<dyn Upstream>,
        base_url: impl Into<String>,
        query: impl Into<String>,
        communities: Vec<String>,
    ) -> Self {
        Self {
            upstream,
            base_url: base_url.into(),
            query: query.into(),
            communities,
        }
    }

    pub fn from_config(upstream: Arc<dyn Upstream>, cfg: &SourcesConfig) -> Self {
        Self::new(
            upstream,
            cfg.forum_base_url.clone(),
            cfg.forum_query.clone(),
            cfg.communities.clone(),
        )
    }

    pub fn search_url(&self, community: &str) -> Result<String> {
        let base = self.base_url.trim_end_matches('/');
        let url = reqwest::Url::parse_with_params(
            &format!("{base}/r/{community}/search.json"),
            &[
                ("q", self.query.as_str()),
                ("restrict_sr", "on"),
                ("sort", "new"),
            ],
        )
        .with_context(|| format!("building search url for r/{community}"))?;
        Ok(url.to_string())
    }

    async fn fetch_community(
        &self,
        community: &str,
        opts: &FetchOptions,
        now: DateTime<Utc>,
    ) -> Result<Vec<NewsItem>> {
        let url = self.search_url(community)?;
        let body = self.upstream.get_text(&url).await?;
        let t0 = std::time::Instant::now();
        let items = listing_items(community, &body, opts, now)?;
        histogram!("news_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(items)
    }
}

#[async_trait]
impl NewsProvider for RedditProvider {
    async fn fetch(&self, opts: &FetchOptions) -> Result<Vec<NewsItem>> {
        let now = Utc::now();
        let results = join_all(
            self.communities
                .iter()
                .map(|c| async move { (c, self.fetch_community(c, opts, now).await) }),
        )
        .await;

        let mut out = Vec::new();
        for (community, res) in results {
            match res {
                Ok(mut items) => out.append(&mut items),
                Err(e) => {
                    tracing::warn!(
                        target: "news",
                        error = ?e,
                        provider = "reddit",
                        community = %community,
                        "community fetch failed"
                    );
                    counter!("news_upstream_errors_total", "provider" => "reddit").increment(1);
                }
            }
        }
        counter!("news_items_total", "provider" => "reddit").increment(out.len() as u64);
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "reddit"
    }
}
