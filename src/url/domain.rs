use url::Url;

/// Extracts the domain (network location) from a URL
///
/// The domain is the lowercase host followed by `:port` when the URL carries
/// a non-default port. Politeness and frontier priorities are tracked per
/// domain, so `ics.uci.edu:8080` and `ics.uci.edu` are kept apart.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use scholar_crawl::url::extract_domain;
///
/// let url = Url::parse("https://WWW.ICS.UCI.EDU/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("www.ics.uci.edu".to_string()));
///
/// let url = Url::parse("http://ics.uci.edu:8080/").unwrap();
/// assert_eq!(extract_domain(&url), Some("ics.uci.edu:8080".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    match url.port() {
        Some(port) => Some(format!("{}:{}", host, port)),
        None => Some(host),
    }
}

/// Parses `url_str` and extracts its domain, `None` when it doesn't parse
pub fn domain_of(url_str: &str) -> Option<String> {
    Url::parse(url_str).ok().as_ref().and_then(extract_domain)
}
