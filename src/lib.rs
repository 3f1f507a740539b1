// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod aggregate;
pub mod api;
pub mod category;
pub mod ingest;
pub mod metrics;

pub use crate::aggregate::{AggregateOptions, Aggregated, Aggregator};
pub use crate::api::{router, AppState};
pub use crate::category::{classify, Category};
pub use crate::ingest::types::{NewsItem, NewsProvider, Provider};
pub use crate::ingest::within_range;

use axum::Router;
use tracing::info;

/// Build the full `/api/news` + `/health` router against live upstreams,
/// using sources resolved by [`ingest::config::load_sources_default`].
pub fn app() -> anyhow::Result<Router> {
    let cfg = ingest::config::load_sources_default()?;
    let state = AppState::from_config(&cfg)?;
    info!(
        feeds = cfg.feeds.len(),
        mirrors = cfg.mirror_bases.len() * cfg.mirror_handles.len(),
        communities = cfg.communities.len(),
        "news sources loaded"
    );
    Ok(router(state))
}
