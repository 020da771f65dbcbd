//! Services for querylens.
//!
//! This module contains the processing layer:
//! - `filter` - inclusion predicates over query records
//! - `reporter` - pluggable per-record consumers
//! - `parser` - line-delimited log decoding with filter/reporter fan-out
//! - `archive` - archive discovery, extraction, and concurrent parsing
//! - `graph` - fixed-width time-bucket grid with pluggable aggregation
//! - `summary` - extremes and per-second concurrency summarization

pub mod archive;
pub mod filter;
pub mod graph;
pub mod parser;
pub mod reporter;
pub mod summary;

pub use archive::ArchiveSearcher;
pub use filter::{AcceptAll, DateRangeFilter, QueryFilter};
pub use graph::{BucketGraph, DataPoints};
pub use parser::QueryParser;
pub use reporter::{CollectingReporter, CountingReporter, QueryReporter, SharedReporter};
pub use summary::Summarizer;
