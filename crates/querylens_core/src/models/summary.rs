//! Batch-level summary of a run's query records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::query::{QueryRecord, SummaryQuery};

/// Extremes and per-second concurrency buckets over one run's records.
///
/// Each extreme holds the whole winning record so consumers can show the
/// offending query, and is `None` when no record had a nonzero value for the
/// metric, since a zero-valued "maximum" would be misleading.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Query with the largest memory allocation.
    pub max_memory: Option<QueryRecord>,
    /// Query with the longest metadata retrieval.
    pub max_metadata_retrieval: Option<QueryRecord>,
    /// Query with the most attempts.
    pub max_attempts: Option<QueryRecord>,
    /// Query with the longest pending time.
    pub max_pending: Option<QueryRecord>,
    /// Query with the longest command-pool wait.
    pub max_command_pool_wait: Option<QueryRecord>,
    /// Earliest observed start, epoch milliseconds.
    pub start: i64,
    /// Latest observed finish, epoch milliseconds.
    pub finish: i64,
    /// Per-second bucket timestamp to the queries overlapping that second.
    /// Bucket-internal order carries no guarantee.
    pub buckets: BTreeMap<i64, Vec<SummaryQuery>>,
}

impl Summary {
    /// The second with the most concurrent queries, as
    /// `(bucket timestamp, query count)`.
    pub fn busiest_second(&self) -> Option<(i64, usize)> {
        self.buckets
            .iter()
            .map(|(&ts, queries)| (ts, queries.len()))
            .max_by_key(|&(_, count)| count)
    }

    /// Overall observed span in milliseconds.
    pub fn span_ms(&self) -> i64 {
        self.finish - self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busiest_second() {
        let mut summary = Summary::default();
        let q = SummaryQuery { query_text: "q".to_string(), start: 0, finish: 1 };
        summary.buckets.insert(1000, vec![q.clone()]);
        summary.buckets.insert(2000, vec![q.clone(), q.clone(), q.clone()]);
        summary.buckets.insert(3000, vec![q]);
        assert_eq!(summary.busiest_second(), Some((2000, 3)));
    }

    #[test]
    fn test_busiest_second_empty() {
        assert_eq!(Summary::default().busiest_second(), None);
    }
}
