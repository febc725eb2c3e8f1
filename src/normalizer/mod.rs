//! Pure URL and text helpers shared by every collection stage.
//!
//! Nothing here performs I/O. The item identity produced by
//! [`stable_item_uid`] is persisted by downstream stores, so its input string
//! (`source_id|normalized_url|compacted_title`) must never change.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sha2::{Digest, Sha256};
use url::Url;

/// Strip query and fragment, lower-case the host and default an empty path to `/`.
///
/// Input that does not parse as an absolute URL is returned trimmed.
pub fn normalize_url(url: &str) -> String {
    let trimmed = url.trim();
    match Url::parse(trimmed) {
        Ok(mut parsed) => {
            parsed.set_query(None);
            parsed.set_fragment(None);
            if parsed.path().is_empty() && !parsed.cannot_be_a_base() {
                parsed.set_path("/");
            }
            parsed.to_string()
        }
        Err(_) => trimmed.to_string(),
    }
}

/// Lower-cased `host[:port]` of a URL, empty when it cannot be parsed.
pub fn domain_of(url: &str) -> String {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return String::new();
    };
    let host = parsed.host_str().unwrap_or_default().to_lowercase();
    match parsed.port() {
        Some(port) if !host.is_empty() => format!("{}:{}", host, port),
        _ => host,
    }
}

/// Collapse whitespace runs into single spaces and trim.
pub fn compact(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Deterministic identity of an item across runs and sources.
pub fn stable_item_uid(source_id: &str, url: &str, title: &str) -> String {
    let payload = format!("{}|{}|{}", source_id, normalize_url(url), compact(title));
    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    hex::encode(hasher.finalize())
}

/// Drop empty and repeated values, keeping first-seen order.
pub fn unique_keep_order<I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|value| !value.is_empty() && seen.insert(value.clone()))
        .collect()
}

/// Title derived from the last path segment, e.g. `/blog/my-great-launch` → `My Great Launch`.
pub fn slug_to_title(url: &str) -> String {
    let path = Url::parse(url.trim())
        .map(|parsed| parsed.path().to_string())
        .unwrap_or_else(|_| url.to_string());
    let slug = path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .replace(['-', '_'], " ");

    let words: Vec<String> = slug.split_whitespace().map(title_case_word).collect();
    words.join(" ")
}

fn title_case_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Parse the timestamp shapes sources actually publish into UTC.
///
/// Accepts RFC 3339, RFC 2822, naive ISO datetimes (assumed UTC) and bare ISO dates.
pub fn parse_published(value: &str) -> Option<DateTime<Utc>> {
    let text = compact(value);
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(&text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(&text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&text, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(&text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_query_and_fragment() {
        assert_eq!(
            normalize_url("  https://Example.COM/blog/post?utm_source=x#top "),
            "https://example.com/blog/post"
        );
    }

    #[test]
    fn test_normalize_defaults_root_path() {
        assert_eq!(normalize_url("https://example.com"), "https://example.com/");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let inputs = [
            "https://Example.com/News/Item?id=3#frag",
            "http://example.com:8080",
            "https://example.com/blog/",
            "not a url",
            "",
        ];
        for input in inputs {
            let once = normalize_url(input);
            assert_eq!(normalize_url(&once), once, "input: {input:?}");
        }
    }

    #[test]
    fn test_domain_of() {
        assert_eq!(domain_of("https://WWW.Example.com/a"), "www.example.com");
        assert_eq!(domain_of("http://example.com:8080/a"), "example.com:8080");
        assert_eq!(domain_of("/relative/path"), "");
    }

    #[test]
    fn test_compact() {
        assert_eq!(compact("  Hello \n\t  world  "), "Hello world");
        assert_eq!(compact("   "), "");
    }

    #[test]
    fn test_uid_matches_contract_string() {
        let uid = stable_item_uid("openai-news", "https://OpenAI.com/news/x?ref=1", "  New   model ");

        let mut hasher = Sha256::new();
        hasher.update(b"openai-news|https://openai.com/news/x|New model");
        assert_eq!(uid, hex::encode(hasher.finalize()));
        assert_eq!(uid.len(), 64);
    }

    #[test]
    fn test_uid_deterministic_and_input_sensitive() {
        let a = stable_item_uid("s", "https://example.com/a", "Title");
        let b = stable_item_uid("s", "https://example.com/a#x", "Title");
        let c = stable_item_uid("t", "https://example.com/a", "Title");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_unique_keep_order() {
        let values = vec!["b".to_string(), "".to_string(), "a".to_string(), "b".to_string()];
        assert_eq!(unique_keep_order(values), vec!["b", "a"]);
    }

    #[test]
    fn test_slug_to_title() {
        assert_eq!(
            slug_to_title("https://x.com/blog/my-great_launch/"),
            "My Great Launch"
        );
        assert_eq!(slug_to_title("https://x.com/"), "");
    }

    #[test]
    fn test_parse_published_shapes() {
        let expected = "2024-05-01T00:00:00+00:00";
        assert_eq!(parse_published("2024-05-01T00:00:00Z").unwrap().to_rfc3339(), expected);
        assert_eq!(parse_published("2024-05-01T00:00:00.000").unwrap().to_rfc3339(), expected);
        assert_eq!(parse_published("2024-05-01").unwrap().to_rfc3339(), expected);
        assert_eq!(
            parse_published("Wed, 01 May 2024 00:00:00 GMT").unwrap().to_rfc3339(),
            expected
        );
        assert!(parse_published("last tuesday").is_none());
        assert!(parse_published("").is_none());
    }
}
