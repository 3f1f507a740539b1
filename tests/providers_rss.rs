// tests/providers_rss.rs
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use sixers_news::aggregate::{AggregateOptions, Aggregator};
use sixers_news::category::{Category, CategoryFilter};
use sixers_news::ingest::providers::rss::{FeedKind, FeedSource, RssProvider};
use sixers_news::ingest::types::{FetchOptions, NewsProvider, Provider};
use sixers_news::ingest::upstream::{FixtureUpstream, Upstream};

const SIXERS_XML: &str = include_str!("fixtures/sixers_rss.xml");
const LB_ATOM: &str = include_str!("fixtures/libertyballers_atom.xml");
const SHAMS_XML: &str = include_str!("fixtures/nitter_shams.xml");
const NBC_XML: &str = include_str!("fixtures/nbcsports_wordpress.xml");

const SIXERS_URL: &str = "https://www.nba.com/sixers/rss";
const LB_URL: &str = "https://www.libertyballers.com/rss/index.xml";
const DEAD_URL: &str = "https://www.nbcsportsphiladelphia.com/tag/philadelphia-76ers/feed/";
const SHAMS_URL: &str = "https://nitter.test/ShamsCharania/rss";
const NBC_URL: &str = DEAD_URL;

fn provider() -> RssProvider {
    let upstream = FixtureUpstream::new()
        .with(SIXERS_URL, SIXERS_XML)
        .with(LB_URL, LB_ATOM)
        .with(SHAMS_URL, SHAMS_XML);
    let site = |url: &str| FeedSource {
        url: url.to_string(),
        kind: FeedKind::Site,
    };
    RssProvider::new(
        Arc::new(upstream),
        vec![
            site(SIXERS_URL),
            site(DEAD_URL),
            site(LB_URL),
            FeedSource {
                url: SHAMS_URL.to_string(),
                kind: FeedKind::Mirror("ShamsCharania".to_string()),
            },
        ],
    )
    .with_concurrency(2)
}

#[tokio::test]
async fn dead_feed_is_skipped_and_the_rest_are_merged() {
    let items = provider()
        .fetch(&FetchOptions::default())
        .await
        .expect("rss adapter never fails as a whole");

    // 3 site items + 1 atom entry + 1 mirror item; the dead feed adds nothing
    assert_eq!(items.len(), 5);
    assert!(items.iter().all(|i| !i.text.is_empty()));

    let signing = items
        .iter()
        .find(|i| i.id == "sixers-news-1001")
        .expect("guid used as id");
    assert_eq!(signing.category, Category::Signings);
    assert_eq!(signing.source, "Philadelphia 76ers News");
    assert_eq!(signing.handle, "www.nba.com");
    assert_eq!(signing.provider, Provider::Rss);
    assert!(signing.text.starts_with("76ers Agree to Two-Way Contract with Rookie Guard — "));

    let preview = items
        .iter()
        .find(|i| i.id == "https://www.nba.com/sixers/news/preview-celtics")
        .expect("link used as id when guid is missing");
    assert_eq!(preview.category, Category::Games);

    let atom = items
        .iter()
        .find(|i| i.handle == "www.libertyballers.com")
        .expect("atom entry");
    assert_eq!(atom.category, Category::Injuries);
    assert_eq!(
        atom.timestamp,
        Utc.with_ymd_and_hms(2024, 3, 5, 14, 0, 0).unwrap()
    );

    let tweet = items
        .iter()
        .find(|i| i.provider == Provider::Twitter)
        .expect("mirror item");
    assert_eq!(tweet.source, "@ShamsCharania");
    assert_eq!(tweet.handle, "@ShamsCharania");
    assert_eq!(tweet.category, Category::Trades);
}

#[tokio::test]
async fn unparsable_dates_fall_back_to_request_time() {
    let before = Utc::now();
    let items = provider().fetch(&FetchOptions::default()).await.unwrap();
    let undated = items
        .iter()
        .find(|i| i.text == "Community Day at the Fieldhouse")
        .expect("undated item kept");
    assert!(undated.timestamp >= before);
    assert_eq!(undated.category, Category::All);
    assert!(undated.id.starts_with(&format!("{SIXERS_URL}-")));
}

#[tokio::test]
async fn range_and_category_filters_apply_per_item() {
    let opts = FetchOptions {
        start: Some(Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap()),
        end: Some(Utc.with_ymd_and_hms(2024, 3, 5, 23, 59, 59).unwrap()),
        category: CategoryFilter::Only(Category::Trades),
        ..FetchOptions::default()
    };
    let items = provider().fetch(&opts).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].provider, Provider::Twitter);
}

#[tokio::test]
async fn wordpress_feed_with_namespaced_elements() {
    let upstream = FixtureUpstream::new().with(NBC_URL, NBC_XML);
    let p = RssProvider::new(
        Arc::new(upstream),
        vec![FeedSource {
            url: NBC_URL.to_string(),
            kind: FeedKind::Site,
        }],
    );
    let items = p.fetch(&FetchOptions::default()).await.unwrap();
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|i| i.handle == "www.nbcsportsphiladelphia.com"));

    let embiid = items
        .iter()
        .find(|i| i.id == "https://www.nbcsportsphiladelphia.com/?p=900101")
        .expect("guid used as id");
    assert_eq!(embiid.category, Category::Injuries);
    assert!(embiid.text.contains("knee soreness"));

    // only <dc:date>, no pubDate
    let rotation = items
        .iter()
        .find(|i| i.id == "https://www.nbcsportsphiladelphia.com/?p=900088")
        .expect("second item");
    assert_eq!(
        rotation.timestamp,
        Utc.with_ymd_and_hms(2024, 3, 4, 16, 0, 0).unwrap()
    );
}

/// Serves fixtures; URLs under the slow host hang for `delay` and then fail.
struct SlowMirrors {
    fixtures: FixtureUpstream,
    delay: Duration,
}

#[async_trait]
impl Upstream for SlowMirrors {
    async fn get_text(&self, url: &str) -> Result<String> {
        if url.starts_with("https://slow.test/") {
            tokio::time::sleep(self.delay).await;
            return Err(anyhow!("GET {url}: timed out"));
        }
        self.fixtures.get_text(url).await
    }
}

#[tokio::test(start_paused = true)]
async fn slow_mirrors_do_not_discard_finished_feeds() {
    let upstream = SlowMirrors {
        fixtures: FixtureUpstream::new().with(SIXERS_URL, SIXERS_XML),
        delay: Duration::from_secs(8),
    };
    let mut sources = vec![FeedSource {
        url: SIXERS_URL.to_string(),
        kind: FeedKind::Site,
    }];
    sources.extend((0..20).map(|n| FeedSource {
        url: format!("https://slow.test/handle{n}/rss"),
        kind: FeedKind::Mirror(format!("handle{n}")),
    }));
    let rss = RssProvider::new(Arc::new(upstream), sources).with_concurrency(2);

    let agg = Aggregator::new(vec![Arc::new(rss)]).with_provider_timeout(Duration::from_secs(15));
    let started = tokio::time::Instant::now();
    let out = agg.aggregate(&AggregateOptions::default()).await;

    // 20 mirrors at 8 s each, two at a time, would need 80 s
    assert!(started.elapsed() <= Duration::from_secs(16));
    assert_eq!(out.count, 3);
    assert!(out.items.iter().all(|i| i.provider == Provider::Rss));
    assert!(out.items.iter().any(|i| i.id == "sixers-news-1001"));
}
