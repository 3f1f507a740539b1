//! Aggregator: settle-all fan-out over the selected providers, then merge.

use futures::future::join_all;
use metrics::{counter, histogram};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::ingest::ensure_metrics_described;
use crate::ingest::types::{FetchOptions, NewsItem, NewsProvider};

pub const DEFAULT_MAX_RESULTS: usize = 120;
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(15);
/// Time an adapter gets past its deadline to hand back partial results.
const SETTLE_GRACE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateOptions {
    /// Provider names to query; `None` means every registered provider.
    pub providers: Option<Vec<String>>,
    pub fetch: FetchOptions,
}

impl AggregateOptions {
    fn wants(&self, name: &str) -> bool {
        match &self.providers {
            None => true,
            Some(list) => list.iter().any(|p| p.eq_ignore_ascii_case(name)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregated {
    pub items: Vec<NewsItem>,
    pub count: usize,
}

pub struct Aggregator {
    providers: Vec<Arc<dyn NewsProvider>>,
    provider_timeout: Duration,
}

impl Aggregator {
    pub fn new(providers: Vec<Arc<dyn NewsProvider>>) -> Self {
        Self {
            providers,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }

    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    /// Query the selected providers concurrently. A provider that errors or
    /// times out contributes nothing; the call itself never fails.
    pub async fn aggregate(&self, opts: &AggregateOptions) -> Aggregated {
        ensure_metrics_described();
        let t0 = Instant::now();

        let selected: Vec<&Arc<dyn NewsProvider>> =
            self.providers.iter().filter(|p| opts.wants(p.name())).collect();

        let deadline = tokio::time::Instant::now() + self.provider_timeout;
        let fetch = FetchOptions {
            deadline: Some(deadline),
            ..opts.fetch.clone()
        };
        let fetch = &fetch;

        let settled = join_all(selected.into_iter().map(|p| async move {
            let name = p.name();
            match tokio::time::timeout_at(deadline + SETTLE_GRACE, p.fetch(fetch)).await {
                Ok(Ok(items)) => items,
                Ok(Err(e)) => {
                    tracing::warn!(target: "news", error = ?e, provider = name, "provider error");
                    counter!("news_provider_errors_total", "provider" => name).increment(1);
                    Vec::new()
                }
                Err(_) => {
                    tracing::warn!(
                        target: "news",
                        provider = name,
                        timeout_ms = self.provider_timeout.as_millis() as u64,
                        "provider timed out"
                    );
                    counter!("news_provider_timeouts_total", "provider" => name).increment(1);
                    Vec::new()
                }
            }
        }))
        .await;

        let items = merge(settled.into_iter().flatten(), opts.fetch.max_results);
        histogram!("news_aggregate_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        tracing::info!(target: "news", count = items.len(), "aggregated");

        Aggregated {
            count: items.len(),
            items,
        }
    }
}

/// De-duplicate by id (later wins), newest first, cap at `max_results`.
/// Order among equal timestamps is unspecified.
pub fn merge<I>(items: I, max_results: usize) -> Vec<NewsItem>
where
    I: IntoIterator<Item = NewsItem>,
{
    let mut by_id: HashMap<String, NewsItem> = HashMap::new();
    for item in items {
        by_id.insert(item.id.clone(), item);
    }
    let mut out: Vec<NewsItem> = by_id.into_values().collect();
    out.sort_unstable_by(|a, b| b.timestamp.cmp(&a.timestamp));
    out.truncate(max_results);
    out
}
