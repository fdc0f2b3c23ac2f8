//! Application configuration structures.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use scraper::Selector;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{FeedSource, SiteConfig};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP and scraping behavior settings
    #[serde(default)]
    pub scraper: ScraperConfig,

    /// Configured feed sources
    #[serde(default = "defaults::feeds")]
    pub feeds: Vec<FeedSource>,

    /// Per-site extraction rules, in registration order
    #[serde(default = "defaults::sites")]
    pub sites: Vec<SiteConfig>,

    /// Paywall detection settings
    #[serde(default)]
    pub paywall: PaywallConfig,

    /// NLP microservice settings
    #[serde(default)]
    pub nlp: NlpConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Names of all configured feed sources.
    pub fn source_names(&self) -> Vec<String> {
        self.feeds.iter().map(|f| f.name.clone()).collect()
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.scraper.user_agent.trim().is_empty() {
            return Err(AppError::validation("scraper.user_agent is empty"));
        }
        if self.scraper.timeout_secs == 0 {
            return Err(AppError::validation("scraper.timeout_secs must be > 0"));
        }
        if self.scraper.feed_timeout_secs == 0 {
            return Err(AppError::validation(
                "scraper.feed_timeout_secs must be > 0",
            ));
        }
        if self.scraper.max_concurrent == 0 {
            return Err(AppError::validation("scraper.max_concurrent must be > 0"));
        }
        if self.scraper.batch_size == 0 {
            return Err(AppError::validation("scraper.batch_size must be > 0"));
        }
        if self.feeds.is_empty() {
            return Err(AppError::validation("No feeds defined"));
        }

        let mut names = HashSet::new();
        for feed in &self.feeds {
            if !names.insert(feed.name.as_str()) {
                return Err(AppError::validation(format!(
                    "Duplicate feed name '{}'",
                    feed.name
                )));
            }
            url::Url::parse(&feed.url)?;
        }

        for site in &self.sites {
            for selector in site
                .content_selectors
                .iter()
                .chain(site.remove_selectors.iter())
            {
                Selector::parse(selector)
                    .map_err(|e| AppError::selector(selector, format!("{e:?}")))?;
            }
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scraper: ScraperConfig::default(),
            feeds: defaults::feeds(),
            sites: defaults::sites(),
            paywall: PaywallConfig::default(),
            nlp: NlpConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// HTTP client and scraping behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// Browser-like User-Agent header for article requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Article request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Feed request timeout in seconds
    #[serde(default = "defaults::feed_timeout")]
    pub feed_timeout_secs: u64,

    /// Maximum concurrent article fetches
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Maximum articles per batch
    #[serde(default = "defaults::batch_size")]
    pub batch_size: usize,

    /// Delay after each fetch when the site sets none, in milliseconds
    #[serde(default = "defaults::default_delay")]
    pub default_delay_ms: u64,

    /// Extracted text shorter than this is treated as no content
    #[serde(default = "defaults::min_content_length")]
    pub min_content_length: usize,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            feed_timeout_secs: defaults::feed_timeout(),
            max_concurrent: defaults::max_concurrent(),
            batch_size: defaults::batch_size(),
            default_delay_ms: defaults::default_delay(),
            min_content_length: defaults::min_content_length(),
        }
    }
}

/// Paywall handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaywallConfig {
    /// Sources that are always paywalled; matched exactly and never fetched
    #[serde(default = "defaults::known_paywall_sources")]
    pub known_sources: Vec<String>,

    /// Lower-case phrases or domains indicating a paywall on a fetched page
    #[serde(default = "defaults::paywall_markers")]
    pub markers: Vec<String>,
}

impl Default for PaywallConfig {
    fn default() -> Self {
        Self {
            known_sources: defaults::known_paywall_sources(),
            markers: defaults::paywall_markers(),
        }
    }
}

/// NLP microservice endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NlpConfig {
    #[serde(default = "defaults::nlp_base_url")]
    pub base_url: String,

    #[serde(default = "defaults::nlp_timeout")]
    pub timeout_secs: u64,
}

impl Default for NlpConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::nlp_base_url(),
            timeout_secs: defaults::nlp_timeout(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log filter when `RUST_LOG` is unset
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    use crate::models::{FeedSource, SiteConfig};

    // Scraper defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/124.0 Safari/537.36"
            .into()
    }
    pub fn timeout() -> u64 {
        10
    }
    pub fn feed_timeout() -> u64 {
        30
    }
    pub fn max_concurrent() -> usize {
        5
    }
    pub fn batch_size() -> usize {
        50
    }
    pub fn default_delay() -> u64 {
        500
    }
    pub fn min_content_length() -> usize {
        30
    }

    // NLP defaults
    pub fn nlp_base_url() -> String {
        "http://localhost:8001".into()
    }
    pub fn nlp_timeout() -> u64 {
        60
    }

    pub fn log_level() -> String {
        "info".into()
    }

    // Feed defaults
    pub fn feeds() -> Vec<FeedSource> {
        vec![
            FeedSource::new("hn.cz", "https://hn.cz/?m=rss"),
            FeedSource::new("hn.cz-byznys", "https://byznys.hn.cz/?m=rss"),
            FeedSource::new("ekonom.cz", "https://ekonom.cz/?m=rss"),
            FeedSource::new(
                "idnes.cz",
                "https://servis.idnes.cz/rss.aspx?c=zpravodaj",
            ),
            FeedSource::new("lidovky.cz", "https://servis.lidovky.cz/rss.aspx"),
            FeedSource::new("novinky.cz", "https://www.novinky.cz/rss"),
            FeedSource::new("seznamzpravy.cz", "https://www.seznamzpravy.cz/rss"),
            FeedSource::new("irozhlas.cz", "https://www.irozhlas.cz/rss/irozhlas"),
            FeedSource::new(
                "ct24.cz",
                "https://ct24.ceskatelevize.cz/rss/hlavni-zpravy",
            ),
            FeedSource::new("aktualne.cz", "https://zpravy.aktualne.cz/rss/"),
            FeedSource::new("denik.cz", "https://www.denik.cz/rss/zpravy.html"),
            FeedSource::new("echo24.cz", "https://echo24.cz/rss/s"),
            FeedSource::new("respekt.cz", "https://www.respekt.cz/api/rss"),
        ]
    }

    // Site defaults, matched by exact key first and then by substring in this order
    pub fn sites() -> Vec<SiteConfig> {
        vec![
            SiteConfig::new("hn.cz", [".article-body", ".article-content", ".detail-text"])
                .removing([".article-related", ".paywall-teaser"])
                .with_delay_ms(1000),
            SiteConfig::new("ekonom.cz", [".article-body", ".article-content"])
                .with_delay_ms(1000),
            SiteConfig::new("idnes.cz", ["#art-text", ".bbtext", ".art-full"])
                .removing([".art-info", ".bbtext .promo"]),
            SiteConfig::new("lidovky.cz", ["#art-text", ".bbtext"]),
            SiteConfig::new(
                "novinky.cz",
                ["[data-dot=\"ogm-article-content\"]", ".article-body", "article"],
            ),
            SiteConfig::new(
                "seznamzpravy.cz",
                ["[data-dot=\"mol-paragraph\"]", "[data-dot=\"ogm-article-content\"]"],
            ),
            SiteConfig::new("irozhlas.cz", [".b-detail", ".article__content"]),
            SiteConfig::new("ct24.cz", [".article-body", "[class*=\"ArticleContent\"]"])
                .with_delay_ms(750),
            SiteConfig::new("aktualne.cz", [".article__content", ".article-content"]),
            SiteConfig::new("denik.cz", [".article-body", ".clanek-text"]),
            SiteConfig::new("echo24.cz", [".article-detail__content", ".article-content"]),
        ]
    }

    // Paywall defaults
    pub fn known_paywall_sources() -> Vec<String> {
        vec!["respekt.cz".into(), "ekonom.cz".into()]
    }
    pub fn paywall_markers() -> Vec<String> {
        [
            "pro pokračování ve čtení",
            "článek je dostupný pouze pro předplatitele",
            "tento obsah je dostupný jen pro předplatitele",
            "exkluzivně pro předplatitele",
            "staňte se předplatitelem",
            "odemkněte si článek",
            "subscribe to continue reading",
            "subscription required",
            "tinypass.com",
            "piano.io",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.scraper.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.scraper.max_concurrent = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_duplicate_feed_names() {
        let mut config = Config::default();
        config
            .feeds
            .push(FeedSource::new("hn.cz", "https://example.com/rss"));
        assert!(matches!(config.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn validate_rejects_bad_selector() {
        let mut config = Config::default();
        config.sites.push(SiteConfig::new("bad.cz", ["[[invalid"]));
        assert!(matches!(
            config.validate(),
            Err(AppError::Selector { .. })
        ));
    }

    #[test]
    fn defaults_match_reference_limits() {
        let config = Config::default();
        assert_eq!(config.scraper.max_concurrent, 5);
        assert_eq!(config.scraper.batch_size, 50);
        assert_eq!(config.scraper.timeout_secs, 10);
        assert_eq!(config.scraper.default_delay_ms, 500);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [scraper]
            max_concurrent = 2

            [[feeds]]
            name = "example.cz"
            url = "https://example.cz/rss"
            "#,
        )
        .unwrap();
        assert_eq!(config.scraper.max_concurrent, 2);
        assert_eq!(config.scraper.batch_size, 50);
        assert_eq!(config.feeds.len(), 1);
        assert!(!config.sites.is_empty());
        assert!(!config.paywall.markers.is_empty());
    }

    #[test]
    fn load_reads_toml_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[nlp]\nbase_url = \"http://nlp:8001\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.nlp.base_url, "http://nlp:8001");
        assert!(Config::load(dir.path().join("missing.toml")).is_err());
    }
}
