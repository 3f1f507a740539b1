// src/ingest/providers/rss.rs
//! RSS/Atom adapter: team and news-site feeds (provider `rss`) plus social
//! mirrors serving one feed per account (provider `twitter`).

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use std::sync::Arc;

use crate::category::classify;
use crate::ingest::config::SourcesConfig;
use crate::ingest::types::{FetchOptions, NewsItem, NewsProvider, Provider};
use crate::ingest::upstream::Upstream;
use crate::ingest::{excerpt, normalize_text, parse_any_timestamp, parse_rfc3339};

const EXCERPT_CHARS: usize = 200;

/* ----------------------------
Wire shapes (RSS 2.0 and Atom)
---------------------------- */

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    title: Option<String>,
    /// `<link>` and namespaced `<atom:link rel="self"/>` share a local name.
    #[serde(rename = "link", default)]
    links: Vec<RssLink>,
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    guid: Option<TextNode>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    /// `<dc:date>`; elements match by local name.
    #[serde(rename = "date")]
    dc_date: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    title: Option<TextNode>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    id: Option<String>,
    title: Option<TextNode>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    published: Option<String>,
    updated: Option<String>,
    summary: Option<TextNode>,
    content: Option<TextNode>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RssLink {
    #[serde(rename = "$text")]
    text: Option<String>,
}

/// Element whose text we want regardless of attributes (`<guid isPermaLink=..>`).
#[derive(Debug, Deserialize)]
struct TextNode {
    #[serde(rename = "$text", default)]
    value: String,
}

fn alternate_href(links: &[AtomLink]) -> Option<String> {
    links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| links.first())
        .and_then(|l| l.href.clone())
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Feed-format-neutral entry, before classification.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub guid: Option<String>,
    pub link: Option<String>,
    pub title: String,
    pub snippet: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub link: Option<String>,
    pub entries: Vec<FeedEntry>,
}

/// Parse an RSS 2.0 or Atom document.
pub fn parse_feed(xml: &str) -> Result<ParsedFeed> {
    let xml_clean = scrub_html_entities_for_xml(xml);
    if xml_clean.contains("<rss") || xml_clean.contains("<channel") {
        let rss: Rss = from_str(&xml_clean).context("parsing rss xml")?;
        return Ok(from_rss(rss.channel));
    }
    if xml_clean.contains("<feed") {
        let atom: AtomFeed = from_str(&xml_clean).context("parsing atom xml")?;
        return Ok(from_atom(atom));
    }
    Err(anyhow!("document is neither rss nor atom"))
}

fn from_rss(ch: Channel) -> ParsedFeed {
    let entries = ch
        .items
        .into_iter()
        .map(|it| FeedEntry {
            guid: non_empty(it.guid.map(|g| g.value)),
            link: non_empty(it.link),
            title: normalize_text(it.title.as_deref().unwrap_or_default()),
            snippet: it
                .description
                .as_deref()
                .map(normalize_text)
                .filter(|s| !s.is_empty()),
            timestamp: it
                .dc_date
                .as_deref()
                .and_then(parse_rfc3339)
                .or_else(|| it.pub_date.as_deref().and_then(parse_any_timestamp)),
        })
        .collect();
    ParsedFeed {
        title: non_empty(ch.title.map(|t| normalize_text(&t))),
        link: ch.links.into_iter().find_map(|l| non_empty(l.text)),
        entries,
    }
}

fn from_atom(feed: AtomFeed) -> ParsedFeed {
    let entries = feed
        .entries
        .into_iter()
        .map(|e| {
            let body = e.summary.or(e.content).map(|t| normalize_text(&t.value));
            FeedEntry {
                guid: non_empty(e.id),
                link: alternate_href(&e.links),
                title: normalize_text(&e.title.map(|t| t.value).unwrap_or_default()),
                snippet: body.filter(|s| !s.is_empty()),
                timestamp: e
                    .published
                    .as_deref()
                    .and_then(parse_rfc3339)
                    .or_else(|| e.updated.as_deref().and_then(parse_any_timestamp)),
            }
        })
        .collect();
    ParsedFeed {
        title: non_empty(feed.title.map(|t| normalize_text(&t.value))),
        link: alternate_href(&feed.links),
        entries,
    }
}

/// Title plus a short excerpt when the entry carries a body.
pub fn entry_text(entry: &FeedEntry) -> String {
    match entry.snippet.as_deref() {
        Some(snip) if entry.title.is_empty() => excerpt(snip, EXCERPT_CHARS),
        Some(snip) => format!("{} — {}", entry.title, excerpt(snip, EXCERPT_CHARS)),
        None => entry.title.clone(),
    }
}

fn host_of(link: &str) -> Option<String> {
    reqwest::Url::parse(link)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
}

/// How a feed's items are attributed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedKind {
    /// Team/news site: attributed to the feed title and site host.
    Site,
    /// Social mirror for one account handle (without `@`).
    Mirror(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSource {
    pub url: String,
    pub kind: FeedKind,
}

/// Turn a parsed feed into admitted items.
pub fn feed_items(
    src: &FeedSource,
    feed: ParsedFeed,
    opts: &FetchOptions,
    now: DateTime<Utc>,
) -> Vec<NewsItem> {
    let (source, handle, provider) = match &src.kind {
        FeedKind::Site => (
            feed.title.clone().unwrap_or_else(|| "RSS".to_string()),
            feed.link
                .as_deref()
                .and_then(host_of)
                .unwrap_or_else(|| "rss".to_string()),
            Provider::Rss,
        ),
        FeedKind::Mirror(h) => (format!("@{h}"), format!("@{h}"), Provider::Twitter),
    };

    let mut out = Vec::with_capacity(feed.entries.len());
    for entry in feed.entries {
        let ts = entry.timestamp.unwrap_or(now);
        let text = entry_text(&entry);
        let category = classify(&text);
        if !opts.admits(ts, category) {
            continue;
        }
        let id = entry
            .guid
            .clone()
            .or_else(|| entry.link.clone())
            .unwrap_or_else(|| format!("{}-{}", src.url, ts.timestamp_millis()));
        let mut item = NewsItem::new(
            id,
            text,
            source.clone(),
            handle.clone(),
            ts,
            category,
            provider,
        );
        item.url = entry
            .link
            .or_else(|| feed.link.clone())
            .or_else(|| Some(src.url.clone()));
        out.push(item);
    }
    out
}

pub struct RssProvider {
    upstream: Arc<dyn Upstream>,
    sources: Vec<FeedSource>,
    concurrency: usize,
}

impl RssProvider {
    pub fn new(upstream: Arc<dyn Upstream>, sources: Vec<FeedSource>) -> Self {
        Self {
            upstream,
            sources,
            concurrency: 8,
        }
    }

    /// Site feeds plus every mirror × handle feed from the config.
    pub fn from_config(upstream: Arc<dyn Upstream>, cfg: &SourcesConfig) -> Self {
        let mut sources: Vec<FeedSource> = cfg
            .feeds
            .iter()
            .map(|url| FeedSource {
                url: url.clone(),
                kind: FeedKind::Site,
            })
            .collect();
        sources.extend(cfg.mirror_feeds().into_iter().map(|(handle, url)| FeedSource {
            url,
            kind: FeedKind::Mirror(handle),
        }));
        Self::new(upstream, sources).with_concurrency(cfg.max_concurrent_fetches)
    }

    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    async fn fetch_one(&self, src: &FeedSource) -> Result<ParsedFeed> {
        let body = self.upstream.get_text(&src.url).await?;
        let t0 = std::time::Instant::now();
        let feed = parse_feed(&body).with_context(|| format!("parsing feed {}", src.url))?;
        histogram!("news_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(feed)
    }
}

#[async_trait]
impl NewsProvider for RssProvider {
    async fn fetch(&self, opts: &FetchOptions) -> Result<Vec<NewsItem>> {
        let now = Utc::now();
        let feeds = stream::iter(self.sources.iter().cloned())
            .map(move |src| async move {
                match self.fetch_one(&src).await {
                    Ok(feed) => feed_items(&src, feed, opts, now),
                    Err(e) => {
                        tracing::warn!(
                            target: "news",
                            error = ?e,
                            provider = "rss",
                            url = %src.url,
                            "feed fetch failed"
                        );
                        counter!("news_upstream_errors_total", "provider" => "rss").increment(1);
                        Vec::new()
                    }
                }
            })
            .buffer_unordered(self.concurrency);

        // Past the deadline, feeds still in flight are dropped and the
        // finished ones are kept.
        let per_feed: Vec<Vec<NewsItem>> = match opts.deadline {
            Some(at) => feeds.take_until(tokio::time::sleep_until(at)).collect().await,
            None => feeds.collect().await,
        };
        let finished = per_feed.len();
        if finished < self.sources.len() {
            tracing::warn!(
                target: "news",
                provider = "rss",
                finished,
                total = self.sources.len(),
                "deadline reached, skipping unfinished feeds"
            );
            counter!("news_upstream_errors_total", "provider" => "rss")
                .increment((self.sources.len() - finished) as u64);
        }

        let out: Vec<NewsItem> = per_feed.into_iter().flatten().collect();
        counter!("news_items_total", "provider" => "rss").increment(out.len() as u64);
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "rss"
    }
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}
