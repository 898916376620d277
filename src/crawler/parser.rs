//! HTML content extraction
//!
//! This module turns a downloaded page into:
//! - Word frequencies of its visible text (see [`crate::crawler::text`])
//! - Links to follow (from `<a href>` tags), absolute and fragment-free

use crate::crawler::fetcher::PageResponse;
use crate::crawler::text::{filter_text, tokenize, word_frequencies};
use scraper::{Html, Selector};
use url::Url;

/// What the extractor pulled out of one page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extracted {
    /// Word counts in order of first appearance
    pub words: Vec<(String, u64)>,

    /// Absolute URLs linked from the page
    pub links: Vec<String>,
}

impl Extracted {
    /// Total number of counted words on the page
    pub fn word_count(&self) -> u64 {
        self.words.iter().map(|(_, count)| count).sum()
    }
}

/// Extracts words and links from a page
pub trait ContentExtractor: Send + Sync {
    fn extract(&self, response: &PageResponse) -> Extracted;
}

/// Extractor for HTML pages built on `scraper`
#[derive(Debug, Default, Clone)]
pub struct HtmlExtractor;

impl HtmlExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl ContentExtractor for HtmlExtractor {
    /// Pages with a status outside 200..400 or an empty body yield nothing
    fn extract(&self, response: &PageResponse) -> Extracted {
        if !response.is_usable() || response.content.is_empty() {
            return Extracted::default();
        }

        let html = String::from_utf8_lossy(&response.content);
        let document = Html::parse_document(&html);

        let words = extract_words(&document);
        let links = match Url::parse(&response.final_url) {
            Ok(base_url) => extract_links(&document, &base_url),
            Err(_) => Vec::new(),
        };

        Extracted { words, links }
    }
}

/// Parses HTML content and extracts the links of a page
///
/// # Example
///
/// ```
/// use scholar_crawl::crawler::parse_links;
/// use url::Url;
///
/// let html = r#"<html><body><a href="/people#faculty">People</a></body></html>"#;
/// let base_url = Url::parse("https://www.ics.uci.edu/").unwrap();
/// assert_eq!(parse_links(html, &base_url), vec!["https://www.ics.uci.edu/people"]);
/// ```
pub fn parse_links(html: &str, base_url: &Url) -> Vec<String> {
    extract_links(&Html::parse_document(html), base_url)
}

fn extract_words(document: &Html) -> Vec<(String, u64)> {
    let raw_text = document.root_element().text().collect::<Vec<_>>().join(" ");
    let tokens = tokenize(&filter_text(&raw_text));
    word_frequencies(&tokens)
}

fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let Ok(a_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&a_selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .collect()
}

/// Resolves a link href to an absolute URL without its fragment
///
/// Returns None for:
/// - empty and fragment-only hrefs
/// - javascript:, mailto:, tel: and data: links
/// - hrefs that fail to resolve
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let mut absolute_url = base_url.join(href).ok()?;
    absolute_url.set_fragment(None);
    Some(absolute_url.to_string())
}
