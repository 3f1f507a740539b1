// src/ingest/config.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_SOURCES_PATH: &str = "NEWS_SOURCES_PATH";

const DEFAULT_FEEDS: &[&str] = &[
    "https://www.nba.com/sixers/rss",
    "https://www.nbcsportsphiladelphia.com/tag/philadelphia-76ers/feed/",
    "https://www.libertyballers.com/rss/index.xml",
];

const DEFAULT_MIRROR_BASES: &[&str] = &[
    "https://nitter.net",
    "https://nitter.poast.org",
    "https://nitter.privacydev.net",
];

const DEFAULT_MIRROR_HANDLES: &[&str] = &[
    "sixers",
    "NBA",
    "wojespn",
    "ShamsCharania",
    "ZachLowe_NBA",
    "ramonashelburne",
    "PompeyOnSixers",
    "DerekBodnerNBA",
    "KyleNeubeck",
    "rich_hofmann",
    "JClarkNBCS",
    "WindhorstESPN",
    "ChrisBHaynes",
    "TheSteinLine",
];

const DEFAULT_COMMUNITIES: &[&str] = &["sixers", "nba"];

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Upstream source lists and limits. Every field is optional in files.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Team/news RSS or Atom feeds (provider `rss`).
    pub feeds: Vec<String>,
    /// Social-mirror hosts, crossed with `mirror_handles` (provider `twitter`).
    pub mirror_bases: Vec<String>,
    pub mirror_handles: Vec<String>,
    /// Forum communities searched by the Reddit adapter.
    pub communities: Vec<String>,
    pub forum_base_url: String,
    pub forum_query: String,
    pub user_agent: String,
    pub upstream_timeout_secs: u64,
    pub provider_timeout_secs: u64,
    pub max_concurrent_fetches: usize,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            feeds: owned(DEFAULT_FEEDS),
            mirror_bases: owned(DEFAULT_MIRROR_BASES),
            mirror_handles: owned(DEFAULT_MIRROR_HANDLES),
            communities: owned(DEFAULT_COMMUNITIES),
            forum_base_url: "https://www.reddit.com".to_string(),
            forum_query: "Sixers".to_string(),
            user_agent: "sixers-news/0.1 (+https://sixershoops.com)".to_string(),
            upstream_timeout_secs: 8,
            provider_timeout_secs: 15,
            max_concurrent_fetches: 8,
        }
    }
}

impl SourcesConfig {
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs.max(1))
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs.max(1))
    }

    /// `(handle, url)` for every mirror base × handle combination.
    pub fn mirror_feeds(&self) -> Vec<(String, String)> {
        self.mirror_bases
            .iter()
            .flat_map(|base| {
                let base = base.trim_end_matches('/');
                self.mirror_handles
                    .iter()
                    .map(move |h| (h.clone(), format!("{base}/{h}/rss")))
            })
            .collect()
    }

    fn cleaned(mut self) -> Self {
        self.feeds = clean_list(self.feeds);
        self.mirror_bases = clean_list(self.mirror_bases);
        self.mirror_handles = clean_list(self.mirror_handles);
        self.communities = clean_list(self.communities);
        self.max_concurrent_fetches = self.max_concurrent_fetches.max(1);
        self
    }
}

/// Load sources from an explicit path. Supports TOML or JSON formats.
pub fn load_sources_from(path: &Path) -> Result<SourcesConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading sources config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_sources(&content, ext.as_str())
}

/// Load sources using env var + fallbacks:
/// 1) $NEWS_SOURCES_PATH
/// 2) config/sources.toml
/// 3) config/sources.json
/// 4) built-in defaults
pub fn load_sources_default() -> Result<SourcesConfig> {
    if let Ok(p) = std::env::var(ENV_SOURCES_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_sources_from(&pb);
        } else {
            return Err(anyhow!("{ENV_SOURCES_PATH} points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/sources.toml");
    if toml_p.exists() {
        return load_sources_from(&toml_p);
    }
    let json_p = PathBuf::from("config/sources.json");
    if json_p.exists() {
        return load_sources_from(&json_p);
    }
    Ok(SourcesConfig::default())
}

fn parse_sources(s: &str, hint_ext: &str) -> Result<SourcesConfig> {
    let looks_json = s.trim_start().starts_with('{');
    let try_toml = hint_ext == "toml" || (hint_ext != "json" && !looks_json);
    if try_toml {
        if let Ok(v) = toml::from_str::<SourcesConfig>(s) {
            return Ok(v.cleaned());
        }
    }
    if let Ok(v) = serde_json::from_str::<SourcesConfig>(s) {
        return Ok(v.cleaned());
    }
    // Fallback: also try TOML if not attempted
    if !try_toml {
        if let Ok(v) = toml::from_str::<SourcesConfig>(s) {
            return Ok(v.cleaned());
        }
    }
    Err(anyhow!("unsupported sources config format"))
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim();
        if !t.is_empty() && !out.iter().any(|o| o == t) {
            out.push(t.to_string());
        }
    }
    out
}
