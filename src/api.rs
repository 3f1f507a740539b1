use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::aggregate::{AggregateOptions, Aggregator, DEFAULT_MAX_RESULTS};
use crate::category::CategoryFilter;
use crate::ingest::config::SourcesConfig;
use crate::ingest::providers::{RedditProvider, RssProvider};
use crate::ingest::types::{FetchOptions, NewsItem, NewsProvider};
use crate::ingest::upstream::{HttpUpstream, Upstream};
use crate::ingest::parse_rfc3339;

const ALLOW_METHODS: &str = "GET, POST, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type";

#[derive(Clone)]
pub struct AppState {
    aggregator: Arc<Aggregator>,
}

impl AppState {
    pub fn new(aggregator: Aggregator) -> Self {
        Self {
            aggregator: Arc::new(aggregator),
        }
    }

    /// Live adapters (RSS + Reddit) over one shared HTTP client.
    pub fn from_config(cfg: &SourcesConfig) -> Result<Self> {
        let upstream: Arc<dyn Upstream> =
            Arc::new(HttpUpstream::new(&cfg.user_agent, cfg.upstream_timeout())?);
        let providers: Vec<Arc<dyn NewsProvider>> = vec![
            Arc::new(RssProvider::from_config(upstream.clone(), cfg)),
            Arc::new(RedditProvider::from_config(upstream, cfg)),
        ];
        Ok(Self::new(
            Aggregator::new(providers).with_provider_timeout(cfg.provider_timeout()),
        ))
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/news", post(news).fallback(method_not_allowed))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        ))
        .layer(cors)
        .with_state(state)
}

/// Request body; every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsRequest {
    pub providers: Option<Vec<String>>,
    pub max_results: Option<i64>,
    pub category: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

fn parse_bound(field: &str, raw: Option<&str>) -> Option<chrono::DateTime<chrono::Utc>> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    let parsed = parse_rfc3339(raw);
    if parsed.is_none() {
        tracing::warn!(target: "news", field, value = raw, "ignoring unparsable time bound");
    }
    parsed
}

impl NewsRequest {
    /// Empty body or JSON `null` means all defaults.
    pub fn from_body(body: &[u8]) -> Result<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        let parsed: Option<Self> =
            serde_json::from_slice(body).context("parsing news request body")?;
        Ok(parsed.unwrap_or_default())
    }

    pub fn into_options(self) -> AggregateOptions {
        let max_results = self
            .max_results
            .map(|n| usize::try_from(n.max(0)).unwrap_or(usize::MAX))
            .unwrap_or(DEFAULT_MAX_RESULTS);
        AggregateOptions {
            providers: self.providers,
            fetch: FetchOptions {
                start: parse_bound("startTime", self.start_time.as_deref()),
                end: parse_bound("endTime", self.end_time.as_deref()),
                max_results,
                category: CategoryFilter::from_param(self.category.as_deref()),
                deadline: None,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct Meta {
    count: usize,
}

#[derive(Debug, Serialize)]
struct NewsResponse {
    success: bool,
    data: Vec<NewsItem>,
    meta: Meta,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

async fn news(State(state): State<AppState>, body: Bytes) -> Response {
    counter!("news_requests_total").increment(1);
    let opts = match NewsRequest::from_body(&body) {
        Ok(req) => req.into_options(),
        Err(e) => {
            tracing::error!(target: "news", error = ?e, "/api/news failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    success: false,
                    error: "Failed to load aggregated news".to_string(),
                    message: Some(format!("{e:#}")),
                }),
            )
                .into_response();
        }
    };

    let out = state.aggregator.aggregate(&opts).await;
    Json(NewsResponse {
        success: true,
        meta: Meta { count: out.count },
        data: out.items,
    })
    .into_response()
}

async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ErrorBody {
            success: false,
            error: "Method not allowed".to_string(),
            message: None,
        }),
    )
        .into_response()
}
