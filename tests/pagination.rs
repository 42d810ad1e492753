//! Page loop behaviour against an in-memory site.

mod common;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::{BASE, BLOCK_PAGE, CountingProvider, FakeSite, fetcher, listing, pacing, page_of};
use shelfwatch::error::AppError;
use shelfwatch::models::{Query, SelectorSet, Target};
use shelfwatch::pipeline::{PaginationController, Termination};
use shelfwatch::services::{HtmlRecordExtractor, RawPage};
use tokio_util::sync::CancellationToken;

fn controller(site: FakeSite, provider: CountingProvider) -> PaginationController<FakeSite> {
    let extractor = HtmlRecordExtractor::new(&SelectorSet::default(), Some(BASE)).unwrap();
    PaginationController::new(fetcher(site, provider), Arc::new(extractor), pacing(), 2)
}

fn dairy() -> Query {
    Query::new(BASE, Target::browse("dairy"))
}

#[tokio::test(start_paused = true)]
async fn twenty_records_then_empty_page() {
    let site = FakeSite::new(|url| {
        let page = page_of(url);
        Ok(RawPage::ok(listing(page, if page == 1 { 20 } else { 0 })))
    });
    let mut controller = controller(site.clone(), CountingProvider::default());

    let outcome = controller.collect(dairy(), 300).await;

    assert_eq!(outcome.records.len(), 20);
    assert_eq!(outcome.termination, Termination::Exhausted);
    assert_eq!(site.requested_pages(), vec![1, 2]);
    assert!(outcome.error.is_none());
}

#[tokio::test(start_paused = true)]
async fn full_pages_stop_at_ceiling() {
    let site = FakeSite::new(|url| Ok(RawPage::ok(listing(page_of(url), 2))));
    let mut controller = controller(site.clone(), CountingProvider::default());

    let outcome = controller.collect(dairy(), 7).await;

    assert_eq!(outcome.termination, Termination::PageLimit);
    assert_eq!(outcome.fetch_attempts, 7);
    assert_eq!(site.request_count(), 7);
    assert_eq!(outcome.records.len(), 14);
}

#[tokio::test(start_paused = true)]
async fn blocked_twice_aborts_after_budget() {
    let site = FakeSite::new(|_| Ok(RawPage::ok(BLOCK_PAGE)));
    let provider = CountingProvider::default();
    let mut controller = controller(site.clone(), provider.clone());
    let pacing = pacing();

    let start = tokio::time::Instant::now();
    let outcome = controller.collect(dairy(), 300).await;
    let elapsed = start.elapsed();

    assert_eq!(outcome.termination, Termination::Aborted);
    assert_eq!(outcome.fetch_attempts, 3);
    assert!(outcome.records.is_empty());
    assert!(matches!(
        outcome.error,
        Some(AppError::QueryAborted { page: 1, .. })
    ));

    // Each fetch tries twice; the controller refreshes once per retry.
    assert_eq!(site.request_count(), 6);
    assert_eq!(provider.count(), 3 + 2);

    let backoff = (pacing.long() + pacing.medium()) * 2;
    assert!(elapsed >= backoff, "elapsed {elapsed:?}");
    assert!(elapsed < backoff + Duration::from_secs(1), "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn block_recovers_on_same_page() {
    let served = Arc::new(AtomicUsize::new(0));
    let site = FakeSite::new(move |url| {
        if served.fetch_add(1, Ordering::SeqCst) < 2 {
            return Ok(RawPage::ok(BLOCK_PAGE));
        }
        let page = page_of(url);
        Ok(RawPage::ok(listing(page, if page == 1 { 4 } else { 0 })))
    });
    let mut controller = controller(site.clone(), CountingProvider::default());

    let outcome = controller.collect(dairy(), 300).await;

    assert_eq!(outcome.termination, Termination::Exhausted);
    assert_eq!(outcome.records.len(), 4);
    assert_eq!(site.requested_pages(), vec![1, 1, 1, 2]);
}

#[tokio::test(start_paused = true)]
async fn recovered_blocks_share_one_budget() {
    // Every page is blocked twice before it serves content.
    let served: Arc<Mutex<HashMap<u32, usize>>> = Arc::default();
    let site = FakeSite::new(move |url| {
        let page = page_of(url);
        let mut served = served.lock().unwrap();
        let count = served.entry(page).or_default();
        *count += 1;
        if *count <= 2 {
            return Ok(RawPage::ok(BLOCK_PAGE));
        }
        Ok(RawPage::ok(listing(page, if page <= 3 { 2 } else { 0 })))
    });
    let mut controller = controller(site.clone(), CountingProvider::default());

    let outcome = controller.collect(dairy(), 300).await;

    assert_eq!(outcome.termination, Termination::Aborted);
    assert_eq!(outcome.records.len(), 4);
    assert!(matches!(
        outcome.error,
        Some(AppError::QueryAborted { page: 3, .. })
    ));
    assert_eq!(site.requested_pages(), vec![1, 1, 1, 2, 2, 2, 3, 3]);
}

#[tokio::test(start_paused = true)]
async fn abort_keeps_earlier_pages() {
    let site = FakeSite::new(|url| match page_of(url) {
        1 => Ok(RawPage::ok(listing(1, 5))),
        _ => Ok(RawPage::ok(BLOCK_PAGE)),
    });
    let mut controller = controller(site, CountingProvider::default());

    let outcome = controller.collect(dairy(), 300).await;

    assert_eq!(outcome.termination, Termination::Aborted);
    assert_eq!(outcome.records.len(), 5);
    assert!(matches!(
        outcome.error,
        Some(AppError::QueryAborted { page: 2, .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn transport_failure_skips_page() {
    let site = FakeSite::new(|url| match page_of(url) {
        1 => Ok(RawPage::ok(listing(1, 3))),
        2 => Err(AppError::fetch(url, "connection reset")),
        3 => Ok(RawPage::ok(listing(3, 2))),
        _ => Ok(RawPage::ok(listing(4, 0))),
    });
    let mut controller = controller(site.clone(), CountingProvider::default());

    let outcome = controller.collect(dairy(), 300).await;

    assert_eq!(outcome.termination, Termination::Exhausted);
    assert_eq!(outcome.skipped_pages, vec![2]);
    assert_eq!(outcome.records.len(), 5);
    assert_eq!(site.requested_pages(), vec![1, 2, 2, 3, 4]);
}

#[tokio::test(start_paused = true)]
async fn cancellation_returns_collected_records() {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let site = FakeSite::new(move |url| {
        trigger.cancel();
        Ok(RawPage::ok(listing(page_of(url), 6)))
    });
    let mut controller =
        controller(site.clone(), CountingProvider::default()).with_cancellation(cancel);

    let outcome = controller.collect(dairy(), 300).await;

    assert_eq!(outcome.termination, Termination::Cancelled);
    assert_eq!(outcome.records.len(), 6);
    assert_eq!(site.requested_pages(), vec![1]);
}

#[tokio::test(start_paused = true)]
async fn specials_listing_is_paged_by_parameter() {
    let site = FakeSite::new(|url| {
        let page = page_of(url);
        Ok(RawPage::ok(listing(page, if page < 3 { 1 } else { 0 })))
    });
    let mut controller = controller(site.clone(), CountingProvider::default());

    let query = Query::new(BASE, Target::specials(Some("halfprice")));
    controller.collect(query, 300).await;

    let requests = site.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 3);
    assert!(requests[0].contains("filter_Special=halfprice"));
    assert!(requests[0].ends_with("page=1"));
}
