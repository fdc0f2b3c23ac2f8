// src/models/site.rs

//! Per-site extraction rules.

use serde::{Deserialize, Serialize};

/// Extraction rules for a news site, keyed by source identifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SiteConfig {
    /// Source identifier or identifier fragment (e.g. `hn.cz`)
    pub key: String,

    /// Content selectors, tried in order; the first one matching wins
    #[serde(default)]
    pub content_selectors: Vec<String>,

    /// Selectors stripped from the page before extraction
    #[serde(default)]
    pub remove_selectors: Vec<String>,

    /// Delay charged to the fetch slot after each request, in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,

    /// User-Agent override for this site
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl SiteConfig {
    /// Create a site config with the common boilerplate removal rules.
    pub fn new<I, S>(key: impl Into<String>, content_selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key: key.into(),
            content_selectors: content_selectors.into_iter().map(Into::into).collect(),
            remove_selectors: common_remove_selectors(),
            delay_ms: None,
            user_agent: None,
        }
    }

    /// Add site-specific removal selectors on top of the current list.
    pub fn removing<I, S>(mut self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.remove_selectors
            .extend(selectors.into_iter().map(Into::into));
        self
    }

    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = Some(delay_ms);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Generic rules used when no configured key matches a source.
    pub fn fallback() -> Self {
        Self {
            key: "default".to_string(),
            content_selectors: vec![
                "article .article-content".to_string(),
                ".article-content".to_string(),
                ".article-body".to_string(),
                ".entry-content".to_string(),
                ".post-content".to_string(),
                "[itemprop=\"articleBody\"]".to_string(),
                "article".to_string(),
                "main".to_string(),
            ],
            remove_selectors: common_remove_selectors(),
            delay_ms: Some(1000),
            user_agent: None,
        }
    }
}

/// Boilerplate present on nearly every news page.
pub fn common_remove_selectors() -> Vec<String> {
    [
        "script",
        "style",
        "noscript",
        "iframe",
        "nav",
        "header",
        "footer",
        "aside",
        "form",
        ".advertisement",
        ".ad",
        ".ads",
        ".social-share",
        ".share",
        ".related-articles",
        ".newsletter",
        ".comments",
        ".cookie-consent",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_includes_common_removals() {
        let site = SiteConfig::new("idnes.cz", ["#art-text"]).removing([".art-info"]);
        assert_eq!(site.content_selectors, vec!["#art-text".to_string()]);
        assert!(site.remove_selectors.contains(&"script".to_string()));
        assert_eq!(site.remove_selectors.last().unwrap(), ".art-info");
        assert!(site.delay_ms.is_none());
    }

    #[test]
    fn test_fallback_delay() {
        assert_eq!(SiteConfig::fallback().delay_ms, Some(1000));
    }

    #[test]
    fn test_deserialize_minimal() {
        let site: SiteConfig = toml::from_str(
            r#"
            key = "echo24.cz"
            content_selectors = [".article-detail__content"]
            "#,
        )
        .unwrap();
        assert_eq!(site.key, "echo24.cz");
        assert!(site.remove_selectors.is_empty());
        assert!(site.user_agent.is_none());
    }
}
