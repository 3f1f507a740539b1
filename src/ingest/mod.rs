// src/ingest/mod.rs
pub mod config;
pub mod providers;
pub mod types;
pub mod upstream;

use chrono::{DateTime, Utc};
use metrics::{describe_counter, describe_histogram};
use once_cell::sync::OnceCell;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("news_items_total", "Items emitted by adapters.");
        describe_counter!(
            "news_upstream_errors_total",
            "Individual feed/community fetch or parse failures."
        );
        describe_counter!(
            "news_provider_errors_total",
            "Adapters that failed as a whole during aggregation."
        );
        describe_counter!(
            "news_provider_timeouts_total",
            "Adapters that exceeded the provider timeout."
        );
        describe_counter!("news_requests_total", "Aggregation requests served.");
        describe_histogram!("news_parse_ms", "Per-source parse time in milliseconds.");
        describe_histogram!("news_aggregate_ms", "End-to-end aggregation time in milliseconds.");
    });
}

/// Normalize text: decode entities, strip tags, fold quotes, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out.trim().to_string()
}

/// Cap already-normalized text at `max_chars`, appending an ellipsis when cut.
pub fn excerpt(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let cut: String = s.chars().take(max_chars).collect();
    format!("{}…", cut.trim_end())
}

/// Inclusive on both bounds; an absent bound is open.
pub fn within_range(
    ts: DateTime<Utc>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> bool {
    if start.is_some_and(|s| ts < s) {
        return false;
    }
    if end.is_some_and(|e| ts > e) {
        return false;
    }
    true
}

fn from_offset(dt: OffsetDateTime) -> Option<DateTime<Utc>> {
    let millis = i64::try_from(dt.unix_timestamp_nanos() / 1_000_000).ok()?;
    DateTime::<Utc>::from_timestamp_millis(millis)
}

/// RFC 3339 / ISO-8601 timestamp (`2024-01-01T00:00:00Z`).
pub fn parse_rfc3339(ts: &str) -> Option<DateTime<Utc>> {
    OffsetDateTime::parse(ts.trim(), &Rfc3339)
        .ok()
        .and_then(from_offset)
}

/// RFC 2822 timestamp as used by RSS `pubDate`.
pub fn parse_rfc2822(ts: &str) -> Option<DateTime<Utc>> {
    OffsetDateTime::parse(ts.trim(), &Rfc2822)
        .ok()
        .and_then(from_offset)
}

/// Either format; feeds are not consistent about which one they use.
pub fn parse_any_timestamp(ts: &str) -> Option<DateTime<Utc>> {
    parse_rfc2822(ts).or_else(|| parse_rfc3339(ts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn normalize_text_strips_tags_and_entities() {
        let s = "  <p>Embiid&nbsp;&nbsp;<b>out</b></p> &ldquo;tonight&rdquo;  ";
        assert_eq!(normalize_text(s), r#"Embiid out "tonight""#);
    }

    #[test]
    fn normalize_text_keeps_sentence_punctuation() {
        assert_eq!(normalize_text("Is Maxey an All-Star?"), "Is Maxey an All-Star?");
    }

    #[test]
    fn excerpt_caps_on_char_boundary() {
        assert_eq!(excerpt("short", 10), "short");
        assert_eq!(excerpt("abcdé fghij", 5), "abcdé…");
    }

    #[test]
    fn within_range_is_inclusive() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = start + Duration::hours(1);
        assert!(within_range(start, Some(start), None));
        assert!(!within_range(start - Duration::milliseconds(1), Some(start), None));
        assert!(within_range(end, None, Some(end)));
        assert!(!within_range(end + Duration::milliseconds(1), None, Some(end)));
        assert!(within_range(start, None, None));
    }

    #[test]
    fn timestamps_parse_both_formats() {
        let want = Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).unwrap();
        assert_eq!(parse_any_timestamp("Tue, 05 Mar 2024 14:30:00 +0000"), Some(want));
        assert_eq!(parse_any_timestamp("Tue, 05 Mar 2024 09:30:00 -0500"), Some(want));
        assert_eq!(parse_any_timestamp("2024-03-05T14:30:00Z"), Some(want));
        assert_eq!(parse_any_timestamp("yesterday-ish"), None);
    }
}
