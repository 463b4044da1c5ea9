//! URL helpers for page identity and pending-navigation matching.
//!
//! None of these functions fail: malformed URLs degrade to an empty domain or
//! compare as raw strings.

use url::Url;

/// The page a freshly opened, empty tab shows.
pub const NEW_TAB_URL: &str = "chrome://newtab/";

/// URL prefixes that belong to the browser or to extensions rather than the web.
const INTERNAL_PREFIXES: &[&str] = &[
    "chrome://",
    "chrome-extension://",
    "chrome-search://",
    "edge://",
    "about:",
    "moz-extension://",
];

/// Whether `url` is a browser-internal or extension page.
pub fn is_internal(url: &str) -> bool {
    INTERNAL_PREFIXES.iter().any(|prefix| url.starts_with(prefix))
}

/// Whether `url` is the empty new-tab page (or no URL at all).
pub fn is_new_tab(url: &str) -> bool {
    url.is_empty() || url == NEW_TAB_URL
}

/// Whether `url` is a genuine web page that may act as a parent or history entry.
pub fn is_web_page(url: &str) -> bool {
    !is_new_tab(url) && !is_internal(url)
}

/// Hostname of `url`, or an empty string when it has none or does not parse.
pub fn domain_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default()
}

/// Domain to display for a live tab: the hostname, or everything before `://`
/// for pages without one.
pub fn display_domain(url: &str) -> String {
    let host = domain_of(url);
    if !host.is_empty() {
        return host;
    }
    url.split("://").next().unwrap_or_default().to_string()
}

/// Normalize a URL for matching: hostname + path + query, without scheme
/// or fragment.
///
/// Unparseable input is returned unchanged.
pub fn normalize(url: &str) -> String {
    match Url::parse(url) {
        Ok(u) => {
            let host = u.host_str().unwrap_or_default();
            let mut out = format!("{}{}", host, u.path());
            if let Some(query) = u.query() {
                out.push('?');
                out.push_str(query);
            }
            out
        }
        Err(_) => url.to_string(),
    }
}

/// Whether two URLs refer to the same page, ignoring scheme and fragment.
pub fn urls_match(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a == b || normalize(a) == normalize(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_pages_are_not_web_pages() {
        assert!(!is_web_page("chrome://settings"));
        assert!(!is_web_page("chrome-extension://abc/explorer.html"));
        assert!(!is_web_page(NEW_TAB_URL));
        assert!(!is_web_page(""));
        assert!(!is_web_page("about:blank"));
        assert!(is_web_page("https://example.com/"));
    }

    #[test]
    fn test_domain_of() {
        assert_eq!(domain_of("https://news.example.com/a?b=c"), "news.example.com");
        assert_eq!(domain_of("not a url"), "");
        assert_eq!(domain_of(""), "");
    }

    #[test]
    fn test_display_domain_falls_back_to_scheme() {
        assert_eq!(display_domain("chrome://settings/"), "settings");
        assert_eq!(display_domain("https://a.com/x"), "a.com");
        assert_eq!(display_domain("about:blank"), "about:blank");
    }

    #[test]
    fn test_normalize_ignores_scheme_and_fragment() {
        assert_eq!(normalize("https://www.x.com/page?q=1#top"), "www.x.com/page?q=1");
        assert_eq!(normalize("http://x.com/page?q=1"), "x.com/page?q=1");
        assert_eq!(normalize("garbage"), "garbage");
    }

    #[test]
    fn test_urls_match() {
        assert!(urls_match("https://x.com/page", "http://x.com/page#frag"));
        assert!(!urls_match("https://x.com/page", "https://www.x.com/page"));
        assert!(!urls_match("https://x.com/page", "https://x.com/other"));
        assert!(!urls_match("https://x.com/page?a=1", "https://x.com/page?a=2"));
        assert!(!urls_match("", ""));
    }
}
