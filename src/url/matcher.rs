/// Checks if a host matches an allowed-domain pattern
///
/// This function supports two types of patterns:
/// 1. Exact match: "uci.edu" matches only "uci.edu"
/// 2. Wildcard match: "*.ics.uci.edu" matches:
///    - "ics.uci.edu" (the bare domain)
///    - "www.ics.uci.edu" (single subdomain)
///    - "vision.lab.ics.uci.edu" (nested subdomains)
///
/// # Examples
///
/// ```
/// use scholar_crawl::url::matches_wildcard;
///
/// assert!(matches_wildcard("uci.edu", "uci.edu"));
/// assert!(!matches_wildcard("uci.edu", "ics.uci.edu"));
///
/// assert!(matches_wildcard("*.ics.uci.edu", "ics.uci.edu"));
/// assert!(matches_wildcard("*.ics.uci.edu", "www.ics.uci.edu"));
/// assert!(!matches_wildcard("*.ics.uci.edu", "physics.uci.edu"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    if let Some(base) = pattern.strip_prefix("*.") {
        candidate == base
            || candidate
                .strip_suffix(base)
                .is_some_and(|prefix| prefix.ends_with('.'))
    } else {
        candidate == pattern
    }
}
