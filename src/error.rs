// src/error.rs

//! Unified error handling for the ingestion library.

use std::fmt;

use thiserror::Error;

/// Result type alias for ingestion operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
///
/// Per-article scraping failures are not represented here; they are
/// recorded as [`ScrapingStatus`](crate::models::ScrapingStatus) values.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization failed
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Caller named a feed source that is not configured
    #[error("Invalid source '{name}'. Valid sources: {}", .valid.join(", "))]
    InvalidSource { name: String, valid: Vec<String> },

    /// Feed could not be downloaded
    #[error("Feed fetch failed for {name}: {message}")]
    FeedFetch { name: String, message: String },

    /// Feed body was neither valid RSS nor Atom
    #[error("Feed parse failed for {name}: {message}")]
    FeedParse { name: String, message: String },

    /// Repository operation failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// NLP service returned an error
    #[error("NLP service error: {0}")]
    Nlp(String),
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an invalid source error listing the accepted names.
    pub fn invalid_source<I, S>(name: impl Into<String>, valid: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::InvalidSource {
            name: name.into(),
            valid: valid.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a feed fetch error with context.
    pub fn feed_fetch(name: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::FeedFetch {
            name: name.into(),
            message: message.to_string(),
        }
    }

    /// Create a feed parse error with context.
    pub fn feed_parse(name: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::FeedParse {
            name: name.into(),
            message: message.to_string(),
        }
    }

    /// Create a storage error.
    pub fn storage(message: impl fmt::Display) -> Self {
        Self::Storage(message.to_string())
    }

    /// Create an NLP client error.
    pub fn nlp(message: impl fmt::Display) -> Self {
        Self::Nlp(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_source_lists_valid_names() {
        let err = AppError::invalid_source("nope.cz", ["hn.cz", "idnes.cz"]);
        let msg = err.to_string();
        assert!(msg.contains("nope.cz"));
        assert!(msg.contains("hn.cz, idnes.cz"));
    }

    #[test]
    fn test_feed_errors_carry_source() {
        let err = AppError::feed_parse("novinky.cz", "unexpected eof");
        assert_eq!(
            err.to_string(),
            "Feed parse failed for novinky.cz: unexpected eof"
        );
    }
}
