use once_cell::sync::Lazy;
use scraper::{ElementRef, Selector};

use crate::normalizer::{compact, slug_to_title};

pub const GENERIC_LINK_TITLES: [&str; 9] = [
    "read more",
    "ask questions about this page",
    "try claude",
    "subscribe",
    "learn more",
    "blog posts",
    "featured",
    "next",
    "previous",
];

/// Section labels that say nothing about the article behind the link.
const SECTION_LABELS: [&str; 4] = ["open source", "research", "product", "news"];

const MIN_TITLE_CHARS: usize = 8;
const HEADING_SEARCH_DEPTH: usize = 6;

static HEADING_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h1, h2, h3, h4").expect("static selector"));

pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    compact(&element.text().collect::<Vec<_>>().join(" "))
}

pub(crate) fn ancestors(element: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    element.ancestors().filter_map(ElementRef::wrap)
}

/// Strip call-to-action prefixes such as "Read " and "Learn more ".
pub fn clean_anchor_title(raw: &str) -> String {
    let candidate = compact(raw);
    let stripped = strip_prefix_ignore_case(&candidate, "learn more ")
        .or_else(|| strip_prefix_ignore_case(&candidate, "read "))
        .unwrap_or(candidate.as_str());
    compact(stripped)
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    value
        .get(..prefix.len())
        .filter(|head| head.eq_ignore_ascii_case(prefix))
        .map(|_| &value[prefix.len()..])
}

pub fn is_meaningful_title(title: &str) -> bool {
    let normalized = compact(title);
    if normalized.chars().count() < MIN_TITLE_CHARS {
        return false;
    }
    let lowered = normalized.to_lowercase();
    !GENERIC_LINK_TITLES
        .iter()
        .any(|generic| lowered == *generic || lowered.starts_with(generic))
}

fn is_generic_phrase(lowered: &str) -> bool {
    SECTION_LABELS.contains(&lowered) || GENERIC_LINK_TITLES.contains(&lowered)
}

/// Swap a vague title for the URL slug when the slug is clearly more specific.
pub fn prefer_slug_title(title: &str, url: &str) -> String {
    let normalized = clean_anchor_title(title);
    let slug_title = slug_to_title(url);
    let slug_words = slug_title.split_whitespace().count();

    if is_generic_phrase(&normalized.to_lowercase()) && slug_words >= 3 {
        return slug_title;
    }
    if normalized.split_whitespace().count() <= 2 && slug_words >= 4 {
        return slug_title;
    }
    normalized
}

/// Best title for an anchor: its text, its label attributes, a nearby heading, then `fallback`.
pub fn resolve_card_title(anchor: ElementRef<'_>, fallback: &str) -> String {
    let text = clean_anchor_title(&element_text(anchor));
    if is_meaningful_title(&text) {
        return text;
    }

    for attribute in ["aria-label", "title"] {
        let value = clean_anchor_title(anchor.value().attr(attribute).unwrap_or_default());
        if is_meaningful_title(&value) {
            return value;
        }
    }

    for ancestor in ancestors(anchor).take(HEADING_SEARCH_DEPTH) {
        for heading in ancestor.select(&HEADING_SELECTOR) {
            let candidate = clean_anchor_title(&element_text(heading));
            if is_meaningful_title(&candidate) {
                return candidate;
            }
        }
    }

    if is_meaningful_title(fallback) {
        return clean_anchor_title(fallback);
    }
    text
}
