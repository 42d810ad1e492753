//! Product page lookups against an in-memory site.

mod common;

use common::{BASE, BLOCK_PAGE, CountingProvider, FakeSite, fetcher, pacing, product_page};
use shelfwatch::error::AppError;
use shelfwatch::models::DetailSelectorSet;
use shelfwatch::pipeline::collect_details;
use shelfwatch::services::{HtmlDetailExtractor, RawPage};
use tokio_util::sync::CancellationToken;

fn extractor() -> HtmlDetailExtractor {
    HtmlDetailExtractor::new(&DetailSelectorSet::default(), Some(BASE)).unwrap()
}

fn site() -> FakeSite {
    FakeSite::new(|url| {
        if url.ends_with("/product/tea-1") {
            Ok(RawPage::ok(product_page("Tea Bags | 100 pack", 1)))
        } else if url.ends_with("/product/rice-2") {
            Ok(RawPage::ok(product_page("Rice | 5kg", 2)))
        } else if url.ends_with("/product/walled-3") {
            Ok(RawPage::ok(BLOCK_PAGE))
        } else if url.ends_with("/product/gone-4") {
            Ok(RawPage::ok("<html><body>Page not found</body></html>"))
        } else {
            Err(AppError::fetch(url, "connection reset"))
        }
    })
}

fn urls(slugs: &[&str]) -> Vec<String> {
    slugs.iter().map(|s| format!("{BASE}/product/{s}")).collect()
}

#[tokio::test(start_paused = true)]
async fn reads_every_page_and_records_failures() {
    let site = site();
    let mut fetcher = fetcher(site.clone(), CountingProvider::default());
    let urls = urls(&["tea-1", "walled-3", "gone-4", "rice-2"]);

    let report = collect_details(
        &mut fetcher,
        &extractor(),
        &urls,
        &pacing(),
        &CancellationToken::new(),
    )
    .await;

    let names: Vec<_> = report
        .details
        .iter()
        .map(|d| d.name.as_deref().unwrap_or_default())
        .collect();
    assert_eq!(names, vec!["Tea Bags | 100 pack", "Rice | 5kg"]);
    assert_eq!(report.details[0].code(), Some("1"));
    assert_eq!(report.details[0].categories, vec!["Home", "Pantry"]);
    assert_eq!(
        report.details[1].brand_url.as_deref(),
        Some("https://shop.test/brands/acme-1")
    );

    let failed: Vec<_> = report.failed.iter().map(|(url, _)| url.as_str()).collect();
    assert_eq!(failed, vec![urls[1].as_str(), urls[2].as_str()]);
}

#[tokio::test(start_paused = true)]
async fn cancelled_lookup_stops_early() {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let site = FakeSite::new(move |_| {
        trigger.cancel();
        Ok(RawPage::ok(product_page("Tea", 1)))
    });
    let mut fetcher = fetcher(site.clone(), CountingProvider::default());

    let report = collect_details(
        &mut fetcher,
        &extractor(),
        &urls(&["tea-1", "rice-2", "oats-5"]),
        &pacing(),
        &cancel,
    )
    .await;

    assert_eq!(report.details.len(), 1);
    assert_eq!(site.request_count(), 1);
}
