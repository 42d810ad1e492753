// src/pipeline/paginate.rs

//! Page-by-page collection for a single query.
//!
//! Pages are fetched strictly one after another. A block page is retried on
//! the same page after a backoff and a cookie refresh, up to a retry budget
//! shared by the whole query. A transport failure skips ahead one page. An
//! empty page ends the query.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::AppError;
use crate::models::{PacingConfig, Query, Record};
use crate::services::{AuthenticatedFetcher, PageTransport, RecordExtractor};

/// Why a collection stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// A page yielded no records
    Exhausted,
    /// The page ceiling was reached
    PageLimit,
    /// The block retry budget ran out
    Aborted,
    /// Shutdown was requested
    Cancelled,
}

/// Records collected for a query and how the collection went.
#[derive(Debug)]
pub struct CollectOutcome {
    pub records: Vec<Record>,
    /// Fetch attempts made, retries included
    pub fetch_attempts: u32,
    /// Pages skipped after a transport failure
    pub skipped_pages: Vec<u32>,
    pub termination: Termination,
    /// Set when the query was aborted
    pub error: Option<AppError>,
}

/// Drives one query's page loop over an owned fetcher.
///
/// `block_retry_budget` covers the whole query, not each page: it is never
/// reset after a page succeeds, so blocks that each recovered still add up
/// and abort the query once they exceed the budget.
///
/// The fetcher, and with it the cookie, carries over between the queries a
/// controller collects. The budget does not; each `collect` starts afresh.
pub struct PaginationController<T: PageTransport> {
    fetcher: AuthenticatedFetcher<T>,
    extractor: Arc<dyn RecordExtractor>,
    pacing: PacingConfig,
    block_retry_budget: u32,
    cancel: CancellationToken,
}

impl<T: PageTransport> PaginationController<T> {
    pub fn new(
        fetcher: AuthenticatedFetcher<T>,
        extractor: Arc<dyn RecordExtractor>,
        pacing: PacingConfig,
        block_retry_budget: u32,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            pacing,
            block_retry_budget,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop between pages (and during sleeps) once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn fetcher(&self) -> &AuthenticatedFetcher<T> {
        &self.fetcher
    }

    /// Collect records for `query`, starting at its current page.
    pub async fn collect(&mut self, mut query: Query, max_pages: u32) -> CollectOutcome {
        let mut records = Vec::new();
        let mut fetch_attempts = 0;
        let mut skipped_pages = Vec::new();
        let mut block_retries = 0;
        let mut error = None;

        let termination = loop {
            if query.page() > max_pages {
                log::info!("{}: reached page limit {max_pages}", query.target());
                break Termination::PageLimit;
            }
            if self.cancel.is_cancelled() {
                break Termination::Cancelled;
            }

            let url = query.url();
            let page = query.page();
            log::info!("Fetching {} page {page}: {url}", query.target());
            fetch_attempts += 1;

            let result = tokio::select! {
                result = self.fetcher.fetch(&url) => result,
                _ = self.cancel.cancelled() => break Termination::Cancelled,
            };

            match result {
                Ok(content) => {
                    let extracted = self.extractor.extract(&content);
                    log::info!("{} page {page}: {} records", query.target(), extracted.len());
                    if extracted.is_empty() {
                        break Termination::Exhausted;
                    }
                    records.extend(extracted);
                    self.pause(self.pacing.short()).await;
                    query.advance();
                }
                Err(e) if e.is_blocked() => {
                    if block_retries >= self.block_retry_budget {
                        log::error!(
                            "{}: still blocked on page {page} after {block_retries} retries; aborting",
                            query.target()
                        );
                        error = Some(AppError::query_aborted(query.target().to_string(), page, e));
                        break Termination::Aborted;
                    }
                    block_retries += 1;
                    log::warn!(
                        "{}: {e}; backing off (retry {block_retries}/{})",
                        query.target(),
                        self.block_retry_budget
                    );
                    self.pause(self.pacing.long()).await;
                    if self.cancel.is_cancelled() {
                        break Termination::Cancelled;
                    }
                    if let Err(refresh_error) = self.fetcher.refresh_credential().await {
                        log::warn!("Cookie refresh failed: {refresh_error}");
                    }
                    self.pause(self.pacing.medium()).await;
                }
                Err(e) => {
                    log::warn!("{}: skipping page {page}: {e}", query.target());
                    skipped_pages.push(page);
                    self.pause(self.pacing.medium()).await;
                    query.advance();
                }
            }
        };

        if termination == Termination::Cancelled {
            log::warn!(
                "{}: cancelled with {} records collected",
                query.target(),
                records.len()
            );
        }

        CollectOutcome {
            records,
            fetch_attempts,
            skipped_pages,
            termination,
            error,
        }
    }

    /// Sleep, waking early on cancellation.
    async fn pause(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = self.cancel.cancelled() => {}
        }
    }
}
