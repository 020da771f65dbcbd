//! Data models for querylens.
//!
//! This module contains all core data structures:
//! - `query` - QueryRecord (one decoded log line) and SummaryQuery
//! - `searched` - SearchedFile, the per-entry parse outcome
//! - `summary` - Summary, the batch-level extremes-plus-buckets result

pub mod query;
pub mod searched;
pub mod summary;

pub use query::{QueryRecord, SummaryQuery, DEFAULT_RESOURCE_NAME};
pub use searched::SearchedFile;
pub use summary::Summary;
