use url::Url;

pub const ARTICLE_PATH_HINTS: [&str; 6] = ["blog", "news", "engineering", "research", "agent", "ai"];

pub const IGNORE_LINK_HINTS: [&str; 9] = [
    "login", "signup", "sign-up", "sign-in", "privacy", "terms", "careers", "jobs", "contact",
];

const IGNORED_EXTENSIONS: [&str; 7] = [".png", ".jpg", ".jpeg", ".svg", ".gif", ".pdf", ".zip"];

/// Whether `candidate` plausibly points at an article listed on `homepage`.
pub fn likely_article_link(homepage: &Url, candidate: &Url) -> bool {
    if candidate.scheme() != homepage.scheme()
        || candidate.host_str() != homepage.host_str()
        || candidate.port_or_known_default() != homepage.port_or_known_default()
    {
        return false;
    }

    let root_path = homepage.path().trim_end_matches('/').to_lowercase();
    let root_normalized = if root_path.is_empty() { "/" } else { root_path.as_str() };

    let path = candidate.path().to_lowercase();
    if path.is_empty() || path == "/" {
        return false;
    }
    let path_normalized = match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    };
    if path_normalized == root_normalized {
        return false;
    }

    if IGNORE_LINK_HINTS.iter().any(|hint| path.contains(hint)) {
        return false;
    }
    if path.contains("/category/") || path.contains("/tag/") {
        return false;
    }

    // An article-section homepage only lists its own children.
    if !root_path.is_empty()
        && ARTICLE_PATH_HINTS.iter().any(|hint| root_path.contains(hint))
        && !path.starts_with(&format!("{}/", root_path))
    {
        return false;
    }

    if !ARTICLE_PATH_HINTS.iter().any(|hint| path.contains(hint)) {
        return false;
    }

    !IGNORED_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(homepage: &str, candidate: &str) -> bool {
        likely_article_link(&Url::parse(homepage).unwrap(), &Url::parse(candidate).unwrap())
    }

    #[test]
    fn test_accepts_nested_article() {
        assert!(check("https://x.com/blog", "https://x.com/blog/my-great-launch"));
        assert!(check("https://x.com/", "https://x.com/news/model-release"));
    }

    #[test]
    fn test_rejects_other_hosts_and_schemes() {
        assert!(!check("https://x.com/", "https://y.com/news/a"));
        assert!(!check("https://x.com/", "http://x.com/news/a"));
        assert!(!check("https://x.com/", "mailto:news@x.com"));
    }

    #[test]
    fn test_rejects_root_and_homepage_itself() {
        assert!(!check("https://x.com/blog", "https://x.com/"));
        assert!(!check("https://x.com/blog", "https://x.com/blog/"));
    }

    #[test]
    fn test_rejects_ignored_segments() {
        assert!(!check("https://x.com/", "https://x.com/news/privacy-policy"));
        assert!(!check("https://x.com/", "https://x.com/careers/research-engineer"));
        assert!(!check("https://x.com/blog", "https://x.com/blog/category/updates"));
        assert!(!check("https://x.com/blog", "https://x.com/blog/tag/llm"));
    }

    #[test]
    fn test_section_homepage_requires_nesting() {
        assert!(!check("https://x.com/blog", "https://x.com/news/elsewhere"));
        assert!(check("https://x.com/company", "https://x.com/news/elsewhere"));
    }

    #[test]
    fn test_requires_hint_and_rejects_assets() {
        assert!(!check("https://x.com/", "https://x.com/pricing"));
        assert!(!check("https://x.com/blog", "https://x.com/blog/cover.png"));
        assert!(!check("https://x.com/blog", "https://x.com/blog/paper.PDF"));
    }
}
