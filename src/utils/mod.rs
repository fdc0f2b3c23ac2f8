//! Utility functions and helpers.

pub mod http;

use chrono::{DateTime, Duration, DurationRound, NaiveDateTime, TimeZone, Utc};
use scraper::{Html, Selector};
use sha2::{Digest, Sha256};

/// SHA-256 of the given text, hex-encoded.
pub fn fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Text content of an HTML fragment with tags removed and entities decoded.
pub fn strip_html(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text: String = fragment.root_element().text().collect();
    normalize_whitespace(&text)
}

/// `src` of the first `<img>` in an HTML fragment.
pub fn first_image_src(html: &str) -> Option<String> {
    let selector = Selector::parse("img[src]").ok()?;
    let fragment = Html::parse_fragment(html);
    fragment
        .select(&selector)
        .filter_map(|img| img.value().attr("src"))
        .map(str::trim)
        .find(|src| !src.is_empty())
        .map(String::from)
}

/// Collapse every whitespace run to a single space.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Collapse whitespace within lines and keep at most one blank line between paragraphs.
pub fn clean_content(text: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut pending_blank = false;

    for line in text.lines() {
        let line = normalize_whitespace(line);
        if line.is_empty() {
            pending_blank = !out.is_empty();
            continue;
        }
        if pending_blank {
            out.push(String::new());
            pending_blank = false;
        }
        out.push(line);
    }

    out.join("\n")
}

/// Parse a feed date in RFC 2822, RFC 3339, or plain `YYYY-MM-DD HH:MM:SS` form.
pub fn parse_feed_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| Utc.from_utc_datetime(&dt))
        })
}

/// Top of the hour following `now`.
pub fn next_top_of_hour(now: DateTime<Utc>) -> DateTime<Utc> {
    let hour = Duration::hours(1);
    now.duration_trunc(hour).unwrap_or(now) + hour
}
