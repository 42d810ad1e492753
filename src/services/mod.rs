//! Service layer for the scraper.
//!
//! This module contains the building blocks one query pipeline is made of:
//! - Block page detection (`BlockDetector`)
//! - Cookie acquisition (`CredentialProvider` and its implementations)
//! - Authenticated fetching with refresh-and-retry (`AuthenticatedFetcher`)
//! - Product tile extraction (`HtmlRecordExtractor`)
//! - Product page extraction (`HtmlDetailExtractor`)

mod block;
#[cfg(feature = "browser")]
mod browser;
mod credential;
mod detail;
mod extractor;
mod fetcher;

pub use block::{BlockDetector, PageClass};
#[cfg(feature = "browser")]
pub use browser::BrowserCredentialProvider;
pub use credential::{CredentialProvider, StaticCredentialProvider, provider_from_config};
pub use detail::{DetailExtractor, HtmlDetailExtractor};
pub use extractor::{HtmlRecordExtractor, RecordExtractor};
pub use fetcher::{AuthenticatedFetcher, HttpTransport, PageTransport, RawPage, choose_seed_url};
