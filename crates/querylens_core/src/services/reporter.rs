//! Pluggable per-record consumers.
//!
//! Reporters are invoked once per accepted record, in registration order.
//! The parser never retains the records it decodes; a reporter that needs a
//! record beyond the call must copy it into its own accumulator.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::QueryRecord;

/// A stateful consumer invoked once per accepted query record.
///
/// The record is borrowed for the duration of the call only. Reporters own
/// and mutate their private accumulator; cross-thread sharing is handled by
/// the [`SharedReporter`] wrapper.
pub trait QueryReporter: Send {
    /// Observe one accepted record.
    fn report(&mut self, query: &QueryRecord);
}

/// A reporter shared across concurrent entry-parsing tasks.
pub type SharedReporter = Arc<Mutex<dyn QueryReporter>>;

/// Wrap a reporter for registration with the parser or archive searcher.
pub fn shared(reporter: impl QueryReporter + 'static) -> SharedReporter {
    Arc::new(Mutex::new(reporter))
}

/// Retains a copy of every accepted record, for handing the full collection
/// to the summary and bucket-grid aggregations after the streaming pass.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    records: Vec<QueryRecord>,
}

impl CollectingReporter {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// The records collected so far.
    pub fn records(&self) -> &[QueryRecord] {
        &self.records
    }

    /// Take ownership of the collected records, leaving the collector empty.
    pub fn take_records(&mut self) -> Vec<QueryRecord> {
        std::mem::take(&mut self.records)
    }
}

impl QueryReporter for CollectingReporter {
    fn report(&mut self, query: &QueryRecord) {
        self.records.push(query.clone());
    }
}

/// Counts accepted records without retaining them.
#[derive(Debug, Default)]
pub struct CountingReporter {
    count: u64,
}

impl CountingReporter {
    /// Create a zeroed counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records observed so far.
    pub fn count(&self) -> u64 {
        self.count
    }
}

impl QueryReporter for CountingReporter {
    fn report(&mut self, _query: &QueryRecord) {
        self.count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_reporter_copies_records() {
        let mut reporter = CollectingReporter::new();
        let query = QueryRecord { query_id: "q1".to_string(), ..Default::default() };
        reporter.report(&query);
        reporter.report(&query);
        assert_eq!(reporter.records().len(), 2);

        let taken = reporter.take_records();
        assert_eq!(taken.len(), 2);
        assert!(reporter.records().is_empty());
    }

    #[test]
    fn test_counting_reporter() {
        let mut reporter = CountingReporter::new();
        for _ in 0..5 {
            reporter.report(&QueryRecord::default());
        }
        assert_eq!(reporter.count(), 5);
    }
}
