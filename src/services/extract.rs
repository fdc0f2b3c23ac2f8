//! Article body extraction.
//!
//! Pure HTML-to-text logic: boilerplate removal, ordered selector rules,
//! generic fallbacks, and content-based paywall detection.

use scraper::{ElementRef, Html, Selector};

use crate::models::{PaywallConfig, SiteConfig};
use crate::utils::clean_content;

/// Containers tried when no site selector matches.
const GENERIC_CONTAINERS: &[&str] = &[
    ".article-content",
    ".article-body",
    ".article__content",
    ".entry-content",
    ".post-content",
    ".story-body",
    "[itemprop=\"articleBody\"]",
    ".content",
];

/// Generic containers need more than this many characters to be accepted.
const GENERIC_MIN_CHARS: usize = 30;

/// Paragraphs need more than this many characters to be kept in the last fallback.
const PARAGRAPH_MIN_CHARS: usize = 10;

/// Result of extracting a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// Cleaned body text
    Content(String),
    /// Extracted text was too short
    NoContent { length: usize },
    /// A paywall marker was found
    Paywall { marker: String },
}

/// Extracts article text from HTML using [`SiteConfig`] rules.
#[derive(Debug, Clone)]
pub struct ContentExtractor {
    min_content_length: usize,
    paywall_markers: Vec<String>,
}

impl ContentExtractor {
    pub fn new<I, S>(min_content_length: usize, paywall_markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            min_content_length,
            paywall_markers: paywall_markers
                .into_iter()
                .map(|m| m.into().to_lowercase())
                .filter(|m| !m.is_empty())
                .collect(),
        }
    }

    pub fn from_config(min_content_length: usize, paywall: &PaywallConfig) -> Self {
        Self::new(min_content_length, paywall.markers.iter().cloned())
    }

    /// Extract the article body of `html` with the rules in `site`.
    pub fn extract(&self, html: &str, site: &SiteConfig) -> Extraction {
        let mut document = Html::parse_document(html);
        remove_elements(&mut document, &site.remove_selectors);

        let text = select_by_rules(&document, &site.content_selectors)
            .or_else(|| generic_extract(&document))
            .unwrap_or_default();

        let length = text.trim().chars().count();
        if length < self.min_content_length {
            return Extraction::NoContent { length };
        }

        let page_text: String = document.root_element().text().collect();
        if let Some(marker) = self.find_paywall_marker(&text, &page_text) {
            return Extraction::Paywall { marker };
        }

        Extraction::Content(clean_content(&text))
    }

    /// First configured marker present in the extracted or full page text.
    fn find_paywall_marker(&self, text: &str, page_text: &str) -> Option<String> {
        let text = text.to_lowercase();
        let page_text = page_text.to_lowercase();
        self.paywall_markers
            .iter()
            .find(|marker| text.contains(marker.as_str()) || page_text.contains(marker.as_str()))
            .cloned()
    }
}

fn parse_selector(raw: &str) -> Option<Selector> {
    match Selector::parse(raw) {
        Ok(selector) => Some(selector),
        Err(e) => {
            log::warn!("Skipping invalid selector '{}': {:?}", raw, e);
            None
        }
    }
}

fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Detach every node matching any of the selectors.
fn remove_elements(document: &mut Html, selectors: &[String]) {
    for selector in selectors.iter().filter_map(|raw| parse_selector(raw)) {
        let ids: Vec<_> = document.select(&selector).map(|el| el.id()).collect();
        for id in ids {
            if let Some(mut node) = document.tree.get_mut(id) {
                node.detach();
            }
        }
    }
}

/// Text of the first selector that matches at least one element.
///
/// All elements matched by that selector are joined by blank lines;
/// later selectors are never consulted.
fn select_by_rules(document: &Html, selectors: &[String]) -> Option<String> {
    for selector in selectors.iter().filter_map(|raw| parse_selector(raw)) {
        let parts: Vec<String> = document
            .select(&selector)
            .map(|el| element_text(&el))
            .collect();
        if !parts.is_empty() {
            return Some(parts.join("\n\n"));
        }
    }
    None
}

/// Common containers, then `<article>`, then `<main>`, then long paragraphs.
fn generic_extract(document: &Html) -> Option<String> {
    let containers = GENERIC_CONTAINERS
        .iter()
        .copied()
        .chain(["article", "main"]);

    for raw in containers {
        let Some(selector) = parse_selector(raw) else {
            continue;
        };
        if let Some(text) = document
            .select(&selector)
            .next()
            .map(|el| element_text(&el))
            .filter(|text| text.chars().count() > GENERIC_MIN_CHARS)
        {
            return Some(text);
        }
    }

    let paragraph = parse_selector("p")?;
    let paragraphs: Vec<String> = document
        .select(&paragraph)
        .map(|el| element_text(&el))
        .filter(|text| text.chars().count() > PARAGRAPH_MIN_CHARS)
        .collect();

    if paragraphs.is_empty() {
        None
    } else {
        Some(paragraphs.join("\n\n"))
    }
}
