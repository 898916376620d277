use crate::{UrlError, UrlResult};
use url::Url;

/// Normalizes a URL into the canonical form used for ledger keys
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject anything but `http` and `https`
/// 3. Lowercase the host (the `url` crate already does this for special schemes)
/// 4. Remove the trailing slash from the path, except for the root `/`
/// 5. Remove the fragment
/// 6. Sort query parameters by key, then value
/// 7. Remove an empty query string (trailing `?`)
///
/// The scheme and any `www.` prefix are preserved; `url_key` is what makes
/// the `http` and `https` forms of a page collide.
///
/// # Examples
///
/// ```
/// use scholar_crawl::url::normalize_url;
///
/// let url = normalize_url("http://WWW.ICS.UCI.EDU/about/?b=2&a=1#top").unwrap();
/// assert_eq!(url.as_str(), "http://www.ics.uci.edu/about?a=1&b=2");
/// ```
pub fn normalize_url(url_str: &str) -> UrlResult<Url> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or(UrlError::MissingDomain)?
        .to_lowercase();
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Parse(format!("failed to set host: {}", e)))?;

    let path = strip_trailing_slash(url.path()).to_string();
    url.set_path(&path);

    url.set_fragment(None);

    if url.query().is_some() {
        let params = sorted_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    Ok(url)
}

/// Removes the fragment only, leaving every other part of the URL as given
///
/// Used for the visited set, which records pages exactly as they were served.
pub fn strip_fragment(url_str: &str) -> String {
    match url_str.split_once('#') {
        Some((before, _)) => before.to_string(),
        None => url_str.to_string(),
    }
}

fn strip_trailing_slash(path: &str) -> &str {
    if path.len() > 1 && path.ends_with('/') {
        &path[..path.len() - 1]
    } else if path.is_empty() {
        "/"
    } else {
        path
    }
}

fn sorted_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    params.sort();
    params
}
