//! Pipeline entry points for scraper operations.
//!
//! - `PaginationController`: page loop for one query
//! - `DatasetMerger`: folds a batch into the dataset and archive
//! - `run_crawler`: runs every configured query and merges the results
//! - `run_process`: rebuilds the processed dataset
//! - `run_discount_summary`: savings across a discount set
//! - `run_product_details`: reads individual product pages

pub mod crawl;
pub mod detail;
pub mod discounts;
pub mod merge;
pub mod paginate;
pub mod process;

pub use crawl::{QueryReport, RunReport, run_crawler, run_queries};
pub use detail::{DetailReport, collect_details, run_product_details};
pub use discounts::{DiscountExample, DiscountSummary, run_discount_summary, summarize_discounts};
pub use merge::{DatasetMerger, Datasets, MergeContext, MergeStats, Partition, partition};
pub use paginate::{CollectOutcome, PaginationController, Termination};
pub use process::{ProcessedRow, RowProcessor, run_process};
