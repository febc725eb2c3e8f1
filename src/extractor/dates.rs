use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::ElementRef;

use crate::extractor::titles::{ancestors, element_text};
use crate::normalizer::compact;

const DATE_SEARCH_DEPTH: usize = 8;
const MAX_DATE_BLOCK_CHARS: usize = 500;

static DATE_TEXT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(Jan(?:uary)?|Feb(?:ruary)?|Mar(?:ch)?|Apr(?:il)?|May|Jun(?:e)?|Jul(?:y)?|Aug(?:ust)?|Sep(?:t(?:ember)?)?|Oct(?:ober)?|Nov(?:ember)?|Dec(?:ember)?)\s+(\d{1,2}),\s+(\d{4})\b",
    )
    .expect("static regex")
});

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// First long-form `Month D, YYYY` date in `text`, as UTC midnight.
pub fn find_human_date(text: &str) -> Option<DateTime<Utc>> {
    let captures = DATE_TEXT_PATTERN.captures(text)?;
    let month_prefix: String = captures[1].to_lowercase().chars().take(3).collect();
    let month = MONTHS.iter().position(|m| *m == month_prefix)? as u32 + 1;
    let day: u32 = captures[2].parse().ok()?;
    let year: i32 = captures[3].parse().ok()?;

    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Publication date printed on or around an anchor.
///
/// Looks at the anchor's own text and label attributes, then at up to eight
/// ancestors, skipping blocks too large to belong to a single card.
pub fn resolve_card_date(anchor: ElementRef<'_>) -> Option<DateTime<Utc>> {
    let element = anchor.value();
    let own = [
        element_text(anchor),
        element.attr("aria-label").unwrap_or_default().to_string(),
        element.attr("title").unwrap_or_default().to_string(),
    ];
    if let Some(date) = own.iter().find_map(|candidate| find_human_date(&compact(candidate))) {
        return Some(date);
    }

    // an ancestor's text contains its child's, so the first oversized block ends the walk
    ancestors(anchor)
        .take(DATE_SEARCH_DEPTH)
        .map_while(|ancestor| bounded_text(ancestor, MAX_DATE_BLOCK_CHARS))
        .filter(|text| !text.is_empty())
        .find_map(|text| find_human_date(&text))
}

/// Compacted text of `element`, or `None` as soon as it exceeds `limit` chars.
fn bounded_text(element: ElementRef<'_>, limit: usize) -> Option<String> {
    let mut text = String::new();
    let mut chars = 0;
    for word in element.text().flat_map(str::split_whitespace) {
        chars += word.chars().count() + usize::from(!text.is_empty());
        if chars > limit {
            return None;
        }
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(word);
    }
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    fn date(text: &str) -> Option<String> {
        find_human_date(text).map(|d| d.format("%Y-%m-%d").to_string())
    }

    #[test]
    fn test_month_forms() {
        assert_eq!(date("Published Mar 5, 2024"), Some("2024-03-05".into()));
        assert_eq!(date("September 12, 2023 · 4 min read"), Some("2023-09-12".into()));
        assert_eq!(date("sept 1, 2022"), Some("2022-09-01".into()));
        assert_eq!(date("MAY 31, 2021"), Some("2021-05-31".into()));
    }

    #[test]
    fn test_rejects_invalid_or_missing() {
        assert_eq!(date("Feb 30, 2024"), None);
        assert_eq!(date("2024-03-05"), None);
        assert_eq!(date("Mayor 5, 2024"), None);
    }

    #[test]
    fn test_resolve_from_ancestor_card() {
        let html = r#"<ul><li><div class="card"><time>Jan 9, 2025</time>
            <a href="/blog/post">A post title here</a></div></li></ul>"#;
        let document = Html::parse_document(html);
        let selector = Selector::parse("a").unwrap();
        let anchor = document.select(&selector).next().unwrap();
        assert_eq!(
            resolve_card_date(anchor).map(|d| d.to_rfc3339()),
            Some("2025-01-09T00:00:00+00:00".into())
        );
    }

    #[test]
    fn test_bounded_text_stops_at_limit() {
        let html = "<div><p>Jan 9,\n 2025</p>  <span>A   post</span></div>";
        let document = Html::parse_fragment(html);
        let selector = Selector::parse("div").unwrap();
        let div = document.select(&selector).next().unwrap();

        assert_eq!(bounded_text(div, 500).as_deref(), Some(element_text(div).as_str()));
        assert_eq!(bounded_text(div, 18).as_deref(), Some("Jan 9, 2025 A post"));
        assert_eq!(bounded_text(div, 17), None);
    }

    #[test]
    fn test_skips_oversized_blocks() {
        let filler = "word ".repeat(200);
        let html = format!(
            r#"<section><p>Dec 1, 2020</p><p>{}</p><div><a href="/blog/post">A post title here</a></div></section>"#,
            filler
        );
        let document = Html::parse_document(&html);
        let selector = Selector::parse("a").unwrap();
        let anchor = document.select(&selector).next().unwrap();
        assert!(resolve_card_date(anchor).is_none());
    }
}
