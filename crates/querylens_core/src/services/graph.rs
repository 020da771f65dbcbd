//! Fixed-width time-bucket grid with pluggable overlap aggregation.
//!
//! The traversal is O(buckets x queries) on purpose: this is a
//! reporting/charting path, not a hot path, and counting every overlap,
//! independent of query duration, dominates.

use crate::error::QuerylensError;
use crate::models::QueryRecord;
use crate::services::filter::QueryFilter;

/// An ordered, contiguous sequence of equal-width time slices.
///
/// The requested start is truncated down to the enclosing second so bucket
/// boundaries are second-aligned; the finish is redefined as the end of the
/// last slice and may extend slightly past the requested finish. Width and
/// span are fixed at construction.
#[derive(Debug, Clone)]
pub struct BucketGraph {
    start: i64,
    finish: i64,
    bucket_size_ms: i64,
    timestamps: Vec<i64>,
}

impl BucketGraph {
    /// Build the grid covering `[start, finish)` in `bucket_size_ms` slices.
    ///
    /// An inverted range or a non-positive bucket width is an immediate
    /// error.
    pub fn new(start: i64, finish: i64, bucket_size_ms: i64) -> Result<Self, QuerylensError> {
        if finish < start {
            return Err(QuerylensError::invalid_range(start, finish));
        }
        if bucket_size_ms <= 0 {
            return Err(QuerylensError::InvalidBucketSize { bucket_size_ms });
        }

        let aligned_start = start - start.rem_euclid(1000);
        let span = finish - aligned_start;
        // Ceiling division; span is non-negative and the width is positive.
        let bucket_count = (span + bucket_size_ms - 1) / bucket_size_ms;
        let aligned_finish = aligned_start + bucket_count * bucket_size_ms;

        let timestamps =
            (0..bucket_count).map(|i| aligned_start + i * bucket_size_ms).collect();

        Ok(Self {
            start: aligned_start,
            finish: aligned_finish,
            bucket_size_ms,
            timestamps,
        })
    }

    /// Second-aligned grid start, epoch milliseconds.
    pub fn start(&self) -> i64 {
        self.start
    }

    /// End of the last slice, epoch milliseconds.
    pub fn finish(&self) -> i64 {
        self.finish
    }

    /// Bucket width in milliseconds.
    pub fn bucket_size_ms(&self) -> i64 {
        self.bucket_size_ms
    }

    /// Number of slices in the grid.
    pub fn bucket_count(&self) -> usize {
        self.timestamps.len()
    }

    /// The start timestamp of every slice, in order.
    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }

    /// Aggregate `queries` into one value per bucket.
    ///
    /// For every bucket and every record that overlaps it and passes the
    /// filter, `aggregator` is invoked with `(query, values, bucket_index)`
    /// to accumulate into that bucket's slot. The aggregator is a strategy:
    /// multiple metrics reuse this one traversal.
    pub fn aggregate<F>(
        &self,
        queries: &[QueryRecord],
        filter: &dyn QueryFilter,
        mut aggregator: F,
    ) -> DataPoints
    where
        F: FnMut(&QueryRecord, &mut [i64], usize),
    {
        let mut values = vec![0i64; self.timestamps.len()];
        for (index, &bucket_start) in self.timestamps.iter().enumerate() {
            let bucket_end = bucket_start + self.bucket_size_ms;
            for query in queries {
                if !filter.matches(query) {
                    continue;
                }
                if query.overlaps(bucket_start, bucket_end) {
                    aggregator(query, &mut values, index);
                }
            }
        }
        DataPoints { timestamps: self.timestamps.clone(), values }
    }
}

/// Parallel arrays of bucket timestamps and aggregated values: the output
/// contract of a bucketed aggregation. One value per bucket, same length and
/// order as the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPoints {
    /// Bucket start timestamps, epoch milliseconds.
    pub timestamps: Vec<i64>,
    /// One aggregated value per bucket.
    pub values: Vec<i64>,
}

/// Count concurrent queries per bucket.
pub fn count_queries(_query: &QueryRecord, values: &mut [i64], index: usize) {
    values[index] += 1;
}

/// Sum allocated memory per bucket.
pub fn sum_memory(query: &QueryRecord, values: &mut [i64], index: usize) {
    values[index] += query.memory_allocated;
}
