//! Core ingestion and aggregation for distributed query-engine logs.
//!
//! This crate turns large, possibly-compressed, multi-file archives of
//! line-delimited query-execution records into time-indexed aggregates for
//! concurrency and performance analysis:
//!
//! - **error**: Error handling for ingestion and aggregation
//! - **models**: Query records, per-entry outcomes, and summaries
//! - **services**: Archive ingestion, line parsing with filter/reporter
//!   fan-out, the time-bucket grid, and the extremes summarizer
//! - **logging**: Structured logging setup
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use querylens_core::{
//!     ArchiveSearcher, CollectingReporter, DateRangeFilter, SharedReporter, Summarizer,
//! };
//!
//! # async fn run() -> Result<(), querylens_core::QuerylensError> {
//! let collector = Arc::new(parking_lot::Mutex::new(CollectingReporter::new()));
//! let as_reporter: SharedReporter = collector.clone();
//!
//! let searcher = ArchiveSearcher::new(4);
//! let filter = Arc::new(DateRangeFilter::new(0, i64::MAX));
//! let searched = searcher.search("logs.tar.gz", filter, vec![as_reporter]).await?;
//!
//! for file in &searched {
//!     if let Some(error) = &file.error {
//!         eprintln!("warning: {}: {}", file.file_name, error);
//!     }
//! }
//!
//! let records = collector.lock().take_records();
//! let summary = Summarizer::summarize(&records);
//! if let Some((second, count)) = summary.busiest_second() {
//!     println!("busiest second {second}: {count} concurrent queries");
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod logging;
pub mod models;
pub mod services;


pub use error::QuerylensError;
pub use models::{QueryRecord, SearchedFile, Summary, SummaryQuery};
pub use services::{
    AcceptAll, ArchiveSearcher, BucketGraph, CollectingReporter, CountingReporter, DataPoints,
    DateRangeFilter, QueryFilter, QueryParser, QueryReporter, SharedReporter, Summarizer,
};
