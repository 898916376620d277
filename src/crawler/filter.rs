//! Content filter pipeline
//!
//! Stateless checks run on every downloaded page before extraction. Each
//! check returns the reason for rejecting the page, if any.

use crate::crawler::fetcher::PageResponse;
use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;
use url::Url;

/// Pages larger than this are not processed
pub const MAX_CONTENT_SIZE: u64 = 10 * 1024 * 1024;

/// Substrings of the URL path that mark crawler traps and bulk downloads
const TRAP_PATH_PATTERNS: &[&str] = &["/download/", "/calendar/", "/date/"];

/// Query parameters that page through dates indefinitely
const DATE_QUERY_PARAMS: &[&str] = &["date", "year", "month", "day"];

const UNWANTED_CONTENT_TYPES: &[&str] = &["video/", "image/", "application/zip"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d-%m-%Y", "%m-%d-%Y"];

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{4}-\d{1,2}-\d{1,2}\b").expect("valid regex"));

/// Earliest date a crawled page may mention
pub fn min_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1968, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Latest date a crawled page may mention
pub fn max_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 11, 3).unwrap_or(NaiveDate::MAX)
}

/// Why a page was dropped before extraction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("duplicate content")]
    DuplicateContent,

    #[error("near-duplicate content")]
    NearDuplicateContent,

    #[error("content too large ({0} bytes)")]
    TooLarge(u64),

    #[error("malformed {0} header")]
    MalformedHeader(String),

    #[error("unwanted content type {0}")]
    UnwantedContentType(String),

    #[error("URL matches trap pattern {0}")]
    TrapPattern(String),

    #[error("date {0} out of range")]
    DateOutOfRange(NaiveDate),

    #[error("invalid date {0}")]
    InvalidDate(String),
}

/// Result of a filter check
pub type FilterResult = Result<(), Rejection>;

/// Rejects pages whose `Content-Length` (or body length) exceeds [`MAX_CONTENT_SIZE`]
pub fn check_size(response: &PageResponse) -> FilterResult {
    let size = match response.header("content-length") {
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map_err(|_| Rejection::MalformedHeader("Content-Length".to_string()))?,
        None => response.content.len() as u64,
    };

    if size > MAX_CONTENT_SIZE {
        return Err(Rejection::TooLarge(size));
    }
    Ok(())
}

/// Rejects binary media types and URL patterns that lead into traps
pub fn check_type_and_pattern(url: &str, response: &PageResponse) -> FilterResult {
    let content_type = response
        .header("content-type")
        .filter(|ct| !ct.is_empty())
        .map(str::to_string)
        .or_else(|| guess_content_type(url).map(str::to_string));

    if let Some(content_type) = content_type {
        if UNWANTED_CONTENT_TYPES
            .iter()
            .any(|unwanted| content_type.contains(unwanted))
        {
            return Err(Rejection::UnwantedContentType(content_type));
        }
    }

    check_url_pattern(url)
}

/// Rejects URLs that look like calendar pages, downloads or date archives
pub fn check_url_pattern(url: &str) -> FilterResult {
    if url.contains("?format=zip") {
        return Err(Rejection::TrapPattern("?format=zip".to_string()));
    }

    let Ok(parsed) = Url::parse(url) else {
        return Ok(());
    };

    if let Some(pattern) = TRAP_PATH_PATTERNS
        .iter()
        .find(|pattern| parsed.path().contains(*pattern))
    {
        return Err(Rejection::TrapPattern(pattern.to_string()));
    }

    if let Some((name, _)) = parsed
        .query_pairs()
        .find(|(name, _)| DATE_QUERY_PARAMS.iter().any(|param| *param == name))
    {
        return Err(Rejection::TrapPattern(format!("?{}=", name)));
    }

    Ok(())
}

/// Rejects pages that mention a date outside the accepted window
///
/// Every `YYYY-M-D` looking substring of the URL and body is checked. A
/// substring no date format can parse counts as a rejection too.
pub fn check_date_range(url: &str, content: &[u8]) -> FilterResult {
    let text = format!("{}{}", url, String::from_utf8_lossy(content));

    for found in DATE_RE.find_iter(&text) {
        let date = parse_date(found.as_str())
            .ok_or_else(|| Rejection::InvalidDate(found.as_str().to_string()))?;
        if date < min_date() || date > max_date() {
            return Err(Rejection::DateOutOfRange(date));
        }
    }
    Ok(())
}

fn parse_date(candidate: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(candidate, format).ok())
}

/// Guesses a media type from the URL's extension
fn guess_content_type(url: &str) -> Option<&'static str> {
    let path = Url::parse(url).ok()?.path().to_ascii_lowercase();
    let (_, ext) = path.rsplit('/').next()?.rsplit_once('.')?;

    let guess = match ext {
        "html" | "htm" => "text/html",
        "txt" => "text/plain",
        "css" => "text/css",
        "js" => "text/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "ico" => "image/vnd.microsoft.icon",
        "tif" | "tiff" => "image/tiff",
        "mp4" => "video/mp4",
        "mpeg" | "mpg" => "video/mpeg",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "wmv" => "video/x-ms-wmv",
        "flv" => "video/x-flv",
        "m4v" => "video/x-m4v",
        "3gp" => "video/3gpp",
        _ => return None,
    };
    Some(guess)
}
