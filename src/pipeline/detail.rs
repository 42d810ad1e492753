// src/pipeline/detail.rs

//! Product page lookups.
//!
//! Fetches individual product pages one after another through the same
//! authenticated fetcher used for listings.

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::models::{Config, PacingConfig, ProductDetail};
use crate::services::{
    AuthenticatedFetcher, DetailExtractor, HtmlDetailExtractor, PageTransport,
    provider_from_config,
};

/// Product pages read, and the ones that could not be.
#[derive(Debug, Default, Serialize)]
pub struct DetailReport {
    pub details: Vec<ProductDetail>,
    /// (url, reason) for each failed page
    pub failed: Vec<(String, String)>,
}

/// Fetch and extract each URL in turn, pausing briefly between pages.
///
/// A failing page is logged and recorded; it never stops the others.
pub async fn collect_details<T: PageTransport>(
    fetcher: &mut AuthenticatedFetcher<T>,
    extractor: &dyn DetailExtractor,
    urls: &[String],
    pacing: &PacingConfig,
    cancel: &CancellationToken,
) -> DetailReport {
    let mut report = DetailReport::default();

    for (i, url) in urls.iter().enumerate() {
        if cancel.is_cancelled() {
            log::warn!("Product lookup cancelled after {i} of {} pages", urls.len());
            break;
        }

        let result = tokio::select! {
            result = fetcher.fetch(url) => result,
            _ = cancel.cancelled() => break,
        };

        match result.and_then(|content| extractor.extract_detail(url, &content)) {
            Ok(detail) => {
                log::info!("{url}: {}", detail.name.as_deref().unwrap_or("(unnamed)"));
                report.details.push(detail);
            }
            Err(e) => {
                log::warn!("Product page {url} failed: {e}");
                report.failed.push((url.clone(), e.to_string()));
            }
        }

        if i + 1 < urls.len() {
            tokio::select! {
                _ = tokio::time::sleep(pacing.short()) => {}
                _ = cancel.cancelled() => {}
            }
        }
    }

    report
}

/// Look up product pages on the live site.
pub async fn run_product_details(
    config: &Config,
    urls: &[String],
    cancel: &CancellationToken,
) -> Result<DetailReport> {
    let extractor = HtmlDetailExtractor::new(
        &config.detail_selectors,
        Some(config.crawler.base_url.as_str()),
    )?;
    let mut fetcher = AuthenticatedFetcher::from_config(config, provider_from_config(config))?;

    let report = collect_details(&mut fetcher, &extractor, urls, &config.pacing, cancel).await;
    log::info!(
        "Product lookup finished: {} read, {} failed",
        report.details.len(),
        report.failed.len()
    );
    Ok(report)
}
