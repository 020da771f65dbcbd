//! Extremes and per-second concurrency summarization.
//!
//! A single-pass batch computation per run; no cross-run state. Extremes
//! are a parallel map-then-reduce over the records; bucket population
//! parallelizes over buckets, each of which exclusively owns its list, so
//! no lock guards appends.

use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::models::{QueryRecord, Summary, SummaryQuery};

/// Width of the summary's concurrency buckets.
const SUMMARY_BUCKET_MS: i64 = 1000;

/// Per-record extreme candidates carried through the parallel reduction.
struct Candidate<'a> {
    memory: &'a QueryRecord,
    metadata_retrieval: &'a QueryRecord,
    attempts: &'a QueryRecord,
    pending: &'a QueryRecord,
    command_pool_wait: &'a QueryRecord,
    start: i64,
    finish: i64,
}

impl<'a> Candidate<'a> {
    fn seed(query: &'a QueryRecord) -> Self {
        Self {
            memory: query,
            metadata_retrieval: query,
            attempts: query,
            pending: query,
            command_pool_wait: query,
            start: query.start,
            finish: query.finish,
        }
    }

    fn merge(self, other: Self) -> Self {
        fn max_by<'a>(
            a: &'a QueryRecord,
            b: &'a QueryRecord,
            key: impl Fn(&QueryRecord) -> i64,
        ) -> &'a QueryRecord {
            if key(b) > key(a) { b } else { a }
        }

        Self {
            memory: max_by(self.memory, other.memory, |q| q.memory_allocated),
            metadata_retrieval: max_by(self.metadata_retrieval, other.metadata_retrieval, |q| {
                q.metadata_retrieval_ms()
            }),
            attempts: max_by(self.attempts, other.attempts, |q| q.attempt_count),
            pending: max_by(self.pending, other.pending, |q| q.pending_time),
            command_pool_wait: max_by(self.command_pool_wait, other.command_pool_wait, |q| {
                q.command_pool_wait_time
            }),
            start: self.start.min(other.start),
            finish: self.finish.max(other.finish),
        }
    }
}

/// A winning extreme is only meaningful if its value is nonzero.
fn nonzero(query: &QueryRecord, value: i64) -> Option<QueryRecord> {
    (value != 0).then(|| query.clone())
}

/// Produces one [`Summary`] from the complete in-memory record collection
/// of a run.
pub struct Summarizer;

impl Summarizer {
    /// Summarize extremes and per-second concurrency over `records`.
    ///
    /// Blocks until all bucket work completes. Empty input yields a default
    /// summary: all extremes `None`, zero span, no buckets.
    pub fn summarize(records: &[QueryRecord]) -> Summary {
        if records.is_empty() {
            return Summary::default();
        }

        // Sorted ascending by start: the bucket scan below relies on it.
        let mut sorted: Vec<&QueryRecord> = records.iter().collect();
        sorted.sort_by_key(|q| q.start);

        let extremes = match sorted.par_iter().map(|q| Candidate::seed(q)).reduce_with(Candidate::merge)
        {
            Some(extremes) => extremes,
            None => return Summary::default(),
        };

        let buckets = Self::populate_buckets(&sorted, extremes.start, extremes.finish);

        tracing::debug!(
            records = records.len(),
            buckets = buckets.len(),
            span_ms = extremes.finish - extremes.start,
            "Summarized run"
        );

        Summary {
            max_memory: nonzero(extremes.memory, extremes.memory.memory_allocated),
            max_metadata_retrieval: nonzero(
                extremes.metadata_retrieval,
                extremes.metadata_retrieval.metadata_retrieval_ms(),
            ),
            max_attempts: nonzero(extremes.attempts, extremes.attempts.attempt_count),
            max_pending: nonzero(extremes.pending, extremes.pending.pending_time),
            max_command_pool_wait: nonzero(
                extremes.command_pool_wait,
                extremes.command_pool_wait.command_pool_wait_time,
            ),
            start: extremes.start,
            finish: extremes.finish,
            buckets,
        }
    }

    /// Fill the per-second buckets spanning `[start, finish)`.
    ///
    /// `sorted` must be ascending by start time: each bucket's scan stops
    /// once a record starts past the bucket's end. A record already finished
    /// before the bucket start is skipped, and scanning continues.
    fn populate_buckets(
        sorted: &[&QueryRecord],
        start: i64,
        finish: i64,
    ) -> BTreeMap<i64, Vec<SummaryQuery>> {
        let aligned_start = start - start.rem_euclid(SUMMARY_BUCKET_MS);
        let span = finish - aligned_start;
        // Ceiling division; the span is non-negative once aligned.
        let bucket_count = ((span + SUMMARY_BUCKET_MS - 1) / SUMMARY_BUCKET_MS).max(0);

        (0..bucket_count)
            .into_par_iter()
            .map(|i| {
                let bucket_start = aligned_start + i * SUMMARY_BUCKET_MS;
                let bucket_end = bucket_start + SUMMARY_BUCKET_MS;
                let mut overlapping = Vec::new();
                for query in sorted {
                    if query.start > bucket_end {
                        break;
                    }
                    if query.finish < bucket_start {
                        continue;
                    }
                    overlapping.push(SummaryQuery::from(*query));
                }
                (bucket_start, overlapping)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn query(id: &str, start: i64, finish: i64) -> QueryRecord {
        QueryRecord {
            query_id: id.to_string(),
            query_text: format!("SELECT '{id}'"),
            start,
            finish,
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_input() {
        let summary = Summarizer::summarize(&[]);
        assert_eq!(summary, Summary::default());
    }

    #[test]
    fn test_span_and_buckets() {
        let records = vec![query("a", 1200, 2200), query("b", 1500, 1600)];
        let summary = Summarizer::summarize(&records);

        assert_eq!(summary.start, 1200);
        assert_eq!(summary.finish, 2200);
        // Buckets are second-aligned: 1000 and 2000.
        let keys: Vec<i64> = summary.buckets.keys().copied().collect();
        assert_eq!(keys, vec![1000, 2000]);
        assert_eq!(summary.buckets[&1000].len(), 2);
        assert_eq!(summary.buckets[&2000].len(), 1); // only "a" reaches past 2000
    }

    #[test]
    fn test_boundary_aligned_span_has_no_extra_bucket() {
        // A span ending exactly on a second boundary fills that many whole
        // buckets; a span ending mid-second rounds up to one more.
        let exact = Summarizer::summarize(&[query("a", 1000, 3000)]);
        let keys: Vec<i64> = exact.buckets.keys().copied().collect();
        assert_eq!(keys, vec![1000, 2000]);

        let partial = Summarizer::summarize(&[query("a", 1000, 3500)]);
        let keys: Vec<i64> = partial.buckets.keys().copied().collect();
        assert_eq!(keys, vec![1000, 2000, 3000]);
    }

    #[test]
    fn test_extremes() {
        let records = vec![
            QueryRecord { memory_allocated: 10, pending_time: 500, ..query("small", 0, 100) },
            QueryRecord { memory_allocated: 900, attempt_count: 3, ..query("big", 50, 150) },
        ];
        let summary = Summarizer::summarize(&records);

        assert_eq!(summary.max_memory.as_ref().unwrap().query_id, "big");
        assert_eq!(summary.max_attempts.as_ref().unwrap().query_id, "big");
        assert_eq!(summary.max_pending.as_ref().unwrap().query_id, "small");
    }

    #[test]
    fn test_zero_extremes_are_none() {
        // Nobody allocated memory or waited on the command pool.
        let records = vec![query("a", 0, 100), query("b", 50, 150)];
        let summary = Summarizer::summarize(&records);

        assert!(summary.max_memory.is_none());
        assert!(summary.max_metadata_retrieval.is_none());
        assert!(summary.max_attempts.is_none());
        assert!(summary.max_pending.is_none());
        assert!(summary.max_command_pool_wait.is_none());
    }

    #[test]
    fn test_legacy_metadata_retrieval_extreme() {
        let records = vec![
            QueryRecord {
                // Legacy format: raw value is a timestamp, duration field wins.
                metadata_retrieval: 1_600_000_000_000,
                metadata_retrieval_time: 30,
                ..query("legacy", 0, 100)
            },
            QueryRecord { metadata_retrieval: 80, ..query("current", 0, 100) },
        ];
        let summary = Summarizer::summarize(&records);
        assert_eq!(summary.max_metadata_retrieval.as_ref().unwrap().query_id, "current");
    }

    fn bucket_sets(summary: &Summary) -> BTreeMap<i64, BTreeSet<SummaryQuery>> {
        summary
            .buckets
            .iter()
            .map(|(&ts, queries)| (ts, queries.iter().cloned().collect()))
            .collect()
    }

    #[test]
    fn test_bucket_contents_independent_of_input_order() {
        let sorted_input = vec![
            query("a", 1000, 4000),
            query("b", 1500, 1700),
            query("c", 2200, 3100),
            query("d", 3500, 3600),
        ];
        let mut shuffled = sorted_input.clone();
        shuffled.reverse();
        shuffled.swap(0, 2);

        let from_sorted = Summarizer::summarize(&sorted_input);
        let from_shuffled = Summarizer::summarize(&shuffled);

        assert_eq!(bucket_sets(&from_sorted), bucket_sets(&from_shuffled));
        assert_eq!(from_sorted.start, from_shuffled.start);
        assert_eq!(from_sorted.finish, from_shuffled.finish);
    }

    #[test]
    fn test_long_query_spans_every_bucket() {
        let records = vec![query("long", 1000, 5000), query("short", 2000, 2100)];
        let summary = Summarizer::summarize(&records);

        for (_, queries) in summary.buckets.iter() {
            assert!(queries.iter().any(|q| q.start == 1000));
        }
        assert_eq!(summary.buckets[&2000].len(), 2);
    }
}
