//! Inclusion predicates over query records.

use crate::models::QueryRecord;

/// A pure predicate deciding whether a record is included before any
/// reporter or counter sees it.
pub trait QueryFilter: Send + Sync {
    /// Whether the record should be kept.
    fn matches(&self, query: &QueryRecord) -> bool;
}

/// Any `Fn(&QueryRecord) -> bool` is a filter.
impl<F> QueryFilter for F
where
    F: Fn(&QueryRecord) -> bool + Send + Sync,
{
    fn matches(&self, query: &QueryRecord) -> bool {
        self(query)
    }
}

/// Filter that keeps every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl QueryFilter for AcceptAll {
    fn matches(&self, _query: &QueryRecord) -> bool {
        true
    }
}

/// Keeps records whose start time lies inside an inclusive
/// `[start, finish]` range of epoch milliseconds.
#[derive(Debug, Clone, Copy)]
pub struct DateRangeFilter {
    start: i64,
    finish: i64,
}

impl DateRangeFilter {
    /// Create a filter for the inclusive range `[start, finish]`.
    pub fn new(start: i64, finish: i64) -> Self {
        Self { start, finish }
    }

    /// Range start, epoch milliseconds.
    pub fn start(&self) -> i64 {
        self.start
    }

    /// Range finish, epoch milliseconds.
    pub fn finish(&self) -> i64 {
        self.finish
    }
}

impl QueryFilter for DateRangeFilter {
    fn matches(&self, query: &QueryRecord) -> bool {
        query.start >= self.start && query.start <= self.finish
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_starting_at(start: i64) -> QueryRecord {
        QueryRecord { start, finish: start + 100, ..Default::default() }
    }

    #[test]
    fn test_date_range_keeps_inside() {
        let filter = DateRangeFilter::new(1000, 2000);
        assert!(filter.matches(&record_starting_at(1000)));
        assert!(filter.matches(&record_starting_at(1500)));
        assert!(filter.matches(&record_starting_at(2000)));
    }

    #[test]
    fn test_date_range_rejects_outside() {
        let filter = DateRangeFilter::new(1000, 2000);
        assert!(!filter.matches(&record_starting_at(999)));
        assert!(!filter.matches(&record_starting_at(2001)));
    }

    #[test]
    fn test_accept_all() {
        assert!(AcceptAll.matches(&record_starting_at(0)));
    }

    #[test]
    fn test_closure_filter() {
        let filter = |q: &QueryRecord| q.memory_allocated > 0;
        assert!(!filter.matches(&QueryRecord::default()));
        assert!(filter.matches(&QueryRecord { memory_allocated: 1, ..Default::default() }));
    }
}
