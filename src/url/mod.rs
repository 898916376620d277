//! URL handling module for Scholar-Crawl
//!
//! This module provides URL normalization, ledger keys, domain extraction,
//! wildcard matching and the crawl-scope validator.

mod domain;
mod matcher;
mod normalize;
mod validator;

use sha2::{Digest, Sha256};
use url::Url;

pub use domain::{domain_of, extract_domain};
pub use matcher::matches_wildcard;
pub use normalize::{normalize_url, strip_fragment};
pub use validator::{has_denied_extension, ScopeValidator, UrlValidator, MAX_URL_LENGTH};

/// Computes the ledger key of a normalized URL
///
/// The key is the hex SHA-256 of the URL with its scheme removed, so the
/// `http` and `https` forms of the same page share one ledger record.
///
/// # Examples
///
/// ```
/// use scholar_crawl::url::{normalize_url, url_key};
///
/// let a = normalize_url("http://www.ics.uci.edu/").unwrap();
/// let b = normalize_url("https://www.ics.uci.edu/").unwrap();
/// assert_eq!(url_key(&a), url_key(&b));
/// ```
pub fn url_key(url: &Url) -> String {
    let full = url.as_str();
    let without_scheme = full
        .strip_prefix(url.scheme())
        .and_then(|rest| rest.strip_prefix("://"))
        .unwrap_or(full);

    let mut hasher = Sha256::new();
    hasher.update(without_scheme.as_bytes());
    hex::encode(hasher.finalize())
}
