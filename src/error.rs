// src/error.rs

//! Unified error handling for the scraper.

use std::fmt;

use thiserror::Error;

/// Result type alias for scraper operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
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

    /// A challenge page was served instead of content
    #[error("Blocked by bot detection at {url}")]
    Blocked { url: String },

    /// Transport or HTTP status failure unrelated to blocking
    #[error("Fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    /// No usable credential could be captured
    #[error("Credential refresh failed: {0}")]
    CredentialRefresh(String),

    /// A single listing fragment could not be turned into a record
    #[error("Extraction failed for fragment {fragment}: {message}")]
    Extraction { fragment: usize, message: String },

    /// Dataset or archive write failed
    #[error("Merge failed at {path}: {message}")]
    Merge { path: String, message: String },

    /// A query gave up after exhausting its retry budget
    #[error("Query {query} aborted on page {page}: {reason}")]
    QueryAborted {
        query: String,
        page: u32,
        reason: String,
    },
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

    /// Create a blocked error for the given URL.
    pub fn blocked(url: impl Into<String>) -> Self {
        Self::Blocked { url: url.into() }
    }

    /// Create a transport error for the given URL.
    pub fn fetch(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a credential refresh error.
    pub fn credential(message: impl fmt::Display) -> Self {
        Self::CredentialRefresh(message.to_string())
    }

    /// Create a per-fragment extraction error.
    pub fn extraction(fragment: usize, message: impl fmt::Display) -> Self {
        Self::Extraction {
            fragment,
            message: message.to_string(),
        }
    }

    /// Create a storage error for the given path.
    pub fn merge(path: impl fmt::Display, message: impl fmt::Display) -> Self {
        Self::Merge {
            path: path.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a query abort error.
    pub fn query_aborted(query: impl Into<String>, page: u32, reason: impl fmt::Display) -> Self {
        Self::QueryAborted {
            query: query.into(),
            page,
            reason: reason.to_string(),
        }
    }

    /// Defenses served a challenge page, or no credential could be obtained to get past them.
    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked { .. } | Self::CredentialRefresh(_))
    }

    /// Transport-level failure that may be specific to one page.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Fetch { .. } | Self::Http(_))
    }

    /// Storage failure; the only class allowed to abort a whole run.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Merge { .. } | Self::Io(_))
    }
}
