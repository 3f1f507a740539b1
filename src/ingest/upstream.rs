// src/ingest/upstream.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;

/// Fetches raw upstream bodies (feed XML, forum JSON).
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn get_text(&self, url: &str) -> Result<String>;
}

/// Live HTTP upstream; every call is bounded by `timeout`.
#[derive(Clone)]
pub struct HttpUpstream {
    client: Client,
    timeout: Duration,
}

impl HttpUpstream {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .context("building upstream http client")?;
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn get_text(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("GET {url}: HTTP {}", status.as_u16()));
        }
        resp.text()
            .await
            .with_context(|| format!("reading body of {url}"))
    }
}

// --- Test helper ---
/// In-memory upstream keyed by exact URL. Unknown URLs fail like a dead host.
#[derive(Default, Clone)]
pub struct FixtureUpstream {
    bodies: HashMap<String, String>,
}

impl FixtureUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.bodies.insert(url.into(), body.into());
        self
    }
}

#[async_trait]
impl Upstream for FixtureUpstream {
    async fn get_text(&self, url: &str) -> Result<String> {
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("GET {url}: no fixture (connection refused)"))
    }
}
