// src/pipeline/crawl.rs

//! Crawl pipeline.
//!
//! Targets are spread round-robin over `crawler.max_concurrent` independent
//! pipelines. Each pipeline owns its fetcher and walks its targets in order,
//! merging every query's records before pausing for the next one. All
//! pipelines share one set of [`Datasets`]; browse results go to the product
//! dataset and specials results to their filter's discount set.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::models::{Config, Query, Record, Target};
use crate::pipeline::{Datasets, MergeContext, MergeStats, PaginationController, Termination};
use crate::services::{
    AuthenticatedFetcher, HtmlRecordExtractor, PageTransport, RecordExtractor,
    provider_from_config,
};

/// Outcome of a single query.
#[derive(Debug, Clone, Serialize)]
pub struct QueryReport {
    pub target: String,
    pub category: String,
    /// Records merged (specials: only those priced below their previous price)
    pub records: usize,
    pub fetch_attempts: u32,
    pub skipped_pages: Vec<u32>,
    pub termination: Termination,
    pub error: Option<String>,
    pub merge: MergeStats,
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub queries: Vec<QueryReport>,
}

impl RunReport {
    pub fn total_records(&self) -> usize {
        self.queries.iter().map(|q| q.records).sum()
    }

    pub fn aborted(&self) -> impl Iterator<Item = &QueryReport> {
        self.queries
            .iter()
            .filter(|q| q.termination == Termination::Aborted)
    }

    pub fn was_cancelled(&self) -> bool {
        self.queries
            .iter()
            .any(|q| q.termination == Termination::Cancelled)
    }

    fn log_summary(&self) {
        let elapsed = self.finished_at - self.started_at;
        log::info!(
            "Crawl finished in {}s: {} queries, {} records",
            elapsed.num_seconds(),
            self.queries.len(),
            self.total_records()
        );
        for query in &self.queries {
            if !query.skipped_pages.is_empty() {
                log::warn!("{}: skipped pages {:?}", query.target, query.skipped_pages);
            }
        }
        for query in self.aborted() {
            log::error!(
                "{}: aborted ({})",
                query.target,
                query.error.as_deref().unwrap_or("unknown reason")
            );
        }
    }
}

/// Run the crawler against the live site for the given targets.
pub async fn run_crawler(
    config: &Config,
    targets: &[Target],
    datasets: &Datasets,
    cancel: &CancellationToken,
) -> Result<RunReport> {
    let provider = provider_from_config(config);
    let extractor: Arc<dyn RecordExtractor> = Arc::new(HtmlRecordExtractor::new(
        &config.selectors,
        Some(config.crawler.base_url.as_str()),
    )?);

    log::info!(
        "Starting crawl: {} targets across {} pipeline(s)",
        targets.len(),
        config.crawler.max_concurrent.min(targets.len()).max(1)
    );

    let report = run_queries(
        config,
        targets,
        datasets,
        extractor,
        || AuthenticatedFetcher::from_config(config, Arc::clone(&provider)),
        cancel,
    )
    .await?;

    report.log_summary();
    Ok(report)
}

/// Run the targets with fetchers produced by `make_fetcher`.
///
/// Fails up front when a target has no dataset in `datasets`. Past that, only
/// a storage failure ends the run early; blocked or failing queries are
/// reported and the run moves on.
pub async fn run_queries<T, F>(
    config: &Config,
    targets: &[Target],
    datasets: &Datasets,
    extractor: Arc<dyn RecordExtractor>,
    make_fetcher: F,
    cancel: &CancellationToken,
) -> Result<RunReport>
where
    T: PageTransport,
    F: Fn() -> Result<AuthenticatedFetcher<T>>,
{
    let started_at = Utc::now();
    if targets.is_empty() {
        log::warn!("No targets to crawl");
        return Ok(RunReport {
            started_at,
            finished_at: Utc::now(),
            queries: Vec::new(),
        });
    }
    for target in targets {
        datasets.for_target(target)?;
    }

    let lanes = config.crawler.max_concurrent.clamp(1, targets.len());
    let mut assignments: Vec<Vec<(usize, &Target)>> = vec![Vec::new(); lanes];
    for (index, target) in targets.iter().enumerate() {
        assignments[index % lanes].push((index, target));
    }

    let mut pipelines = Vec::with_capacity(lanes);
    for lane in assignments {
        let controller = PaginationController::new(
            make_fetcher()?,
            Arc::clone(&extractor),
            config.pacing.clone(),
            config.pagination.block_retry_budget,
        )
        .with_cancellation(cancel.clone());
        pipelines.push((controller, lane));
    }

    let mut results = stream::iter(pipelines)
        .map(|(controller, lane)| run_pipeline(config, datasets, controller, lane, cancel))
        .buffer_unordered(lanes);

    let mut indexed = Vec::with_capacity(targets.len());
    while let Some(result) = results.next().await {
        indexed.extend(result?);
    }
    indexed.sort_by_key(|(index, _)| *index);

    Ok(RunReport {
        started_at,
        finished_at: Utc::now(),
        queries: indexed.into_iter().map(|(_, report)| report).collect(),
    })
}

/// Walk one pipeline's targets in order.
async fn run_pipeline<T: PageTransport>(
    config: &Config,
    datasets: &Datasets,
    mut controller: PaginationController<T>,
    lane: Vec<(usize, &Target)>,
    cancel: &CancellationToken,
) -> Result<Vec<(usize, QueryReport)>> {
    let mut reports = Vec::with_capacity(lane.len());
    let last = lane.len().saturating_sub(1);

    for (position, (index, target)) in lane.into_iter().enumerate() {
        if cancel.is_cancelled() {
            log::warn!("Skipping {target}: crawl cancelled");
            break;
        }

        log::info!("Starting query {target}");
        let query = Query::new(config.crawler.base_url.as_str(), target.clone());
        let outcome = controller.collect(query, config.pagination.max_pages).await;

        let mut records = outcome.records;
        if target.specials_only() {
            let before = records.len();
            records.retain(Record::is_discounted);
            log::info!(
                "{target}: kept {} of {before} records below their previous price",
                records.len()
            );
        }
        let kept = records.len();

        // Partial results from aborted or cancelled queries are merged too.
        let merge = datasets
            .for_target(target)?
            .merge(records, &MergeContext::now(target.category()))
            .await?;

        reports.push((
            index,
            QueryReport {
                target: target.to_string(),
                category: target.category().to_string(),
                records: kept,
                fetch_attempts: outcome.fetch_attempts,
                skipped_pages: outcome.skipped_pages,
                termination: outcome.termination,
                error: outcome.error.map(|e| e.to_string()),
                merge,
            },
        ));

        if position < last {
            let pause = config.pacing.between_queries();
            log::info!("Waiting {}s before the next query", pause.as_secs());
            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = cancel.cancelled() => {}
            }
        }
    }

    Ok(reports)
}
