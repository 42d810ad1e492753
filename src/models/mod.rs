// src/models/mod.rs

//! Domain models for the scraper.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod credential;
mod detail;
mod query;
mod record;
mod selectors;

// Re-export all public types
pub use config::{
    Config, CrawlerConfig, CredentialConfig, DetectionConfig, PacingConfig, PaginationConfig,
    StorageConfig,
};
pub use credential::Credential;
pub use detail::ProductDetail;
pub use query::{ALL_SPECIALS, DISCOUNT_CATEGORY, Query, Target};
pub use record::{DatasetRow, Record, UNKNOWN_PRODUCT};
pub use selectors::{DetailSelectorSet, SelectorSet};
