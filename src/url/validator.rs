use crate::output::AggregationStore;
use crate::url::matches_wildcard;
use url::Url;

/// URLs longer than this are treated as traps and never crawled
pub const MAX_URL_LENGTH: usize = 200;

/// Path extensions that never lead to crawlable HTML
const DENIED_EXTENSIONS: &[&str] = &[
    "css", "js", "bmp", "gif", "jpg", "jpeg", "ico", "swp", "png", "tif", "tiff", "mlid", "mp2",
    "mp3", "mp4", "tmp", "wav", "avi", "mov", "mpeg", "ram", "m4v", "mkv", "ogg", "ogv", "pdf",
    "bak", "ps", "eps", "tex", "ppt", "pptx", "doc", "docx", "xls", "xlsx", "names", "php", "data",
    "dat", "exe", "bz2", "tar", "msi", "bin", "7z", "psd", "dmg", "iso", "asm", "toml", "epub",
    "dll", "cnf", "tgz", "sha1", "app", "xml", "json", "jsx", "h", "hpp", "yaml", "thmx", "mso",
    "arff", "rtf", "jar", "csv", "py", "java", "scss", "c", "war", "ini", "flv", "mpg", "3gp",
    "flac", "aac", "svg", "webp", "odt", "ods", "odp", "odg", "sqlite", "zpix", "rar", "xz", "sh",
    "bat", "so", "ttf", "woff", "eot", "otf", "rm", "smil", "wmv", "swf", "wma", "zip", "gz",
    "txt", "img", "sql", "cpp",
];

/// Decides whether a discovered URL should enter the frontier
pub trait UrlValidator: Send + Sync {
    /// Returns true if `url` is worth crawling
    ///
    /// When `visited` is given, URLs already recorded there are rejected.
    fn is_valid(&self, url: &str, visited: Option<&AggregationStore>) -> bool;
}

/// Scope validator restricting the crawl to the allowed domain patterns
#[derive(Debug, Clone)]
pub struct ScopeValidator {
    allowed_domains: Vec<String>,
}

impl ScopeValidator {
    /// Creates a validator from `allowed-domains` patterns (e.g. `*.ics.uci.edu`)
    pub fn new(allowed_domains: Vec<String>) -> Self {
        Self {
            allowed_domains: allowed_domains
                .into_iter()
                .map(|p| p.to_lowercase())
                .collect(),
        }
    }

    fn host_allowed(&self, host: &str) -> bool {
        self.allowed_domains
            .iter()
            .any(|pattern| matches_wildcard(pattern, host))
    }
}

impl UrlValidator for ScopeValidator {
    fn is_valid(&self, url: &str, visited: Option<&AggregationStore>) -> bool {
        if let Some(store) = visited {
            if store.is_visited(url) {
                return false;
            }
        }

        if url.len() > MAX_URL_LENGTH {
            return false;
        }

        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(_) => return false,
        };

        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return false;
        }

        let host = match parsed.host_str() {
            Some(host) if !host.is_empty() => host.to_lowercase(),
            _ => return false,
        };

        if !self.host_allowed(&host) {
            return false;
        }

        !has_denied_extension(parsed.path())
    }
}

/// Returns true if the last path segment ends in a denylisted extension
pub fn has_denied_extension(path: &str) -> bool {
    let path = path.to_lowercase();
    if path.ends_with(".tar.gz") {
        return true;
    }
    let last = path.rsplit('/').next().unwrap_or_default();
    match last.rsplit_once('.') {
        Some((_, ext)) => DENIED_EXTENSIONS.contains(&ext),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> ScopeValidator {
        ScopeValidator::new(vec![
            "*.ics.uci.edu".to_string(),
            "*.cs.uci.edu".to_string(),
            "*.informatics.uci.edu".to_string(),
            "*.stat.uci.edu".to_string(),
        ])
    }

    #[test]
    fn test_allowed_hosts() {
        let v = validator();
        assert!(v.is_valid("https://www.ics.uci.edu/", None));
        assert!(v.is_valid("http://vision.ics.uci.edu/papers", None));
        assert!(v.is_valid("https://www.stat.uci.edu/seminars", None));
        assert!(!v.is_valid("https://www.uci.edu/", None));
        assert!(!v.is_valid("https://physics.uci.edu/", None));
    }

    #[test]
    fn test_scheme_and_host_required() {
        let v = validator();
        assert!(!v.is_valid("ftp://www.ics.uci.edu/file", None));
        assert!(!v.is_valid("mailto:someone@ics.uci.edu", None));
        assert!(!v.is_valid("not a url", None));
    }

    #[test]
    fn test_length_limit() {
        let v = validator();
        let long = format!("https://www.ics.uci.edu/{}", "a".repeat(MAX_URL_LENGTH));
        assert!(!v.is_valid(&long, None));
    }

    #[test]
    fn test_denied_extensions() {
        let v = validator();
        assert!(!v.is_valid("https://www.ics.uci.edu/paper.PDF", None));
        assert!(!v.is_valid("https://www.ics.uci.edu/data/archive.tar.gz", None));
        assert!(!v.is_valid("https://www.ics.uci.edu/style.css", None));
        assert!(v.is_valid("https://www.ics.uci.edu/page.html", None));
        assert!(v.is_valid("https://www.ics.uci.edu/v1.2/docs", None));
    }

    #[test]
    fn test_visited_urls_rejected() {
        let v = validator();
        let store = AggregationStore::new("ics.uci.edu");
        store.record_visit("https://www.ics.uci.edu/seen");

        assert!(!v.is_valid("https://www.ics.uci.edu/seen", Some(&store)));
        assert!(v.is_valid("https://www.ics.uci.edu/seen", None));
        assert!(v.is_valid("https://www.ics.uci.edu/unseen", Some(&store)));
    }
}
