//! Query execution record models.
//!
//! A [`QueryRecord`] is one decoded line from a "queries" log: the lifecycle
//! facts of a single query execution on the engine. Records are immutable
//! once parsed and carry no identity beyond field equality.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Sentinel used when a queue or engine name is absent or empty.
pub const DEFAULT_RESOURCE_NAME: &str = "Default";

/// Epoch-millisecond cutoff (~2017-07-14) separating the legacy
/// `metadataRetrieval` absolute-timestamp format from the current
/// duration format.
const METADATA_TIMESTAMP_CUTOFF_MS: i64 = 1_500_000_000_000;

/// One query's lifecycle facts, decoded from a single log line.
///
/// Decoding is best-effort: every field defaults when absent and unknown
/// fields are ignored, so schema drift across engine versions does not fail
/// the line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryRecord {
    /// Engine-assigned query identifier.
    pub query_id: String,
    /// User who submitted the query.
    pub username: String,
    /// The SQL text.
    pub query_text: String,
    /// Engine query type (e.g. "ODBC", "JDBC", "REST").
    pub query_type: String,
    /// Terminal outcome (e.g. "COMPLETED", "FAILED", "CANCELED").
    pub outcome: String,
    /// Free-form reason accompanying the outcome.
    pub outcome_reason: String,
    /// Submission time, epoch milliseconds.
    pub start: i64,
    /// Completion time, epoch milliseconds. Expected >= start, not enforced.
    pub finish: i64,
    /// Time spent pending, milliseconds.
    pub pending_time: i64,
    /// Time spent queued, milliseconds.
    pub queued_time: i64,
    /// Time spent starting, milliseconds.
    pub starting_time: i64,
    /// Time spent running, milliseconds.
    pub running_time: i64,
    /// Time spent planning, milliseconds.
    pub planning_time: i64,
    /// Time spent waiting on the command pool, milliseconds.
    pub command_pool_wait_time: i64,
    /// Metadata retrieval: a duration in the current format, an absolute
    /// timestamp in the legacy one. Use [`Self::metadata_retrieval_ms`].
    pub metadata_retrieval: i64,
    /// Metadata retrieval duration carried alongside legacy-format records.
    pub metadata_retrieval_time: i64,
    /// Queue the query ran in; `"Default"` when the log omitted it.
    #[serde(deserialize_with = "name_or_default")]
    pub queue_name: String,
    /// Engine the query ran on; `"Default"` when the log omitted it.
    #[serde(deserialize_with = "name_or_default")]
    pub engine_name: String,
    /// Number of execution attempts.
    pub attempt_count: i64,
    /// Peak memory allocated, bytes.
    pub memory_allocated: i64,
    /// Planner cost estimate.
    pub query_cost: f64,
}

impl Default for QueryRecord {
    fn default() -> Self {
        Self {
            query_id: String::new(),
            username: String::new(),
            query_text: String::new(),
            query_type: String::new(),
            outcome: String::new(),
            outcome_reason: String::new(),
            start: 0,
            finish: 0,
            pending_time: 0,
            queued_time: 0,
            starting_time: 0,
            running_time: 0,
            planning_time: 0,
            command_pool_wait_time: 0,
            metadata_retrieval: 0,
            metadata_retrieval_time: 0,
            queue_name: DEFAULT_RESOURCE_NAME.to_string(),
            engine_name: DEFAULT_RESOURCE_NAME.to_string(),
            attempt_count: 0,
            memory_allocated: 0,
            query_cost: 0.0,
        }
    }
}

impl QueryRecord {
    /// Metadata retrieval time in milliseconds, reconciling the two log
    /// formats.
    ///
    /// Legacy logs wrote an absolute timestamp into `metadataRetrieval`; a
    /// value past the cutoff is treated as such and the parallel
    /// `metadataRetrievalTime` duration is used instead. Otherwise the raw
    /// value is itself the duration.
    pub fn metadata_retrieval_ms(&self) -> i64 {
        if self.metadata_retrieval > METADATA_TIMESTAMP_CUTOFF_MS {
            self.metadata_retrieval_time
        } else {
            self.metadata_retrieval
        }
    }

    /// Wall-clock duration of the query in milliseconds.
    pub fn duration_ms(&self) -> i64 {
        self.finish - self.start
    }

    /// Submission time as a UTC timestamp.
    pub fn start_time(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.start).single().unwrap_or_default()
    }

    /// Completion time as a UTC timestamp.
    pub fn finish_time(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.finish).single().unwrap_or_default()
    }

    /// Whether this query overlaps the time slice `[bucket_start, bucket_end]`.
    ///
    /// A query counts in every bucket it spans, not just its starting bucket:
    /// durations can exceed the bucket width and must not be invisible to
    /// buckets they merely pass through.
    pub fn overlaps(&self, bucket_start: i64, bucket_end: i64) -> bool {
        self.start <= bucket_end && self.finish >= bucket_start
    }
}

/// Map an absent or empty queue/engine name to the sentinel.
fn name_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let name = Option::<String>::deserialize(deserializer)?;
    Ok(match name {
        Some(name) if !name.is_empty() => name,
        _ => DEFAULT_RESOURCE_NAME.to_string(),
    })
}

/// Minimal projection of a query for storage inside time buckets.
///
/// Buckets can hold many thousands of entries; keeping only the text and the
/// span keeps the summary's memory footprint bounded.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SummaryQuery {
    /// The SQL text.
    pub query_text: String,
    /// Submission time, epoch milliseconds.
    pub start: i64,
    /// Completion time, epoch milliseconds.
    pub finish: i64,
}

impl From<&QueryRecord> for SummaryQuery {
    fn from(query: &QueryRecord) -> Self {
        Self { query_text: query.query_text.clone(), start: query.start, finish: query.finish }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_full_record() {
        let line = r#"{
            "queryId": "1a2b-3c4d",
            "username": "alice",
            "queryText": "SELECT 1",
            "queryType": "ODBC",
            "outcome": "COMPLETED",
            "outcomeReason": "",
            "start": 1000,
            "finish": 5000,
            "pendingTime": 10,
            "queuedTime": 20,
            "planningTime": 30,
            "commandPoolWaitTime": 40,
            "metadataRetrieval": 50,
            "queueName": "High Cost",
            "engineName": "preview",
            "attemptCount": 1,
            "memoryAllocated": 4096,
            "queryCost": 12.5
        }"#;
        let query: QueryRecord = serde_json::from_str(line).unwrap();
        assert_eq!(query.query_id, "1a2b-3c4d");
        assert_eq!(query.queue_name, "High Cost");
        assert_eq!(query.duration_ms(), 4000);
        assert_eq!(query.metadata_retrieval_ms(), 50);
    }

    #[test]
    fn test_decode_is_best_effort() {
        // Missing fields default; unknown fields are ignored.
        let query: QueryRecord =
            serde_json::from_str(r#"{"queryId": "q1", "somethingNew": true}"#).unwrap();
        assert_eq!(query.query_id, "q1");
        assert_eq!(query.start, 0);
        assert_eq!(query.memory_allocated, 0);
    }

    #[test]
    fn test_queue_and_engine_default_when_absent_or_empty() {
        let absent: QueryRecord = serde_json::from_str(r#"{"queryId": "q1"}"#).unwrap();
        assert_eq!(absent.queue_name, DEFAULT_RESOURCE_NAME);
        assert_eq!(absent.engine_name, DEFAULT_RESOURCE_NAME);

        let empty: QueryRecord =
            serde_json::from_str(r#"{"queueName": "", "engineName": ""}"#).unwrap();
        assert_eq!(empty.queue_name, DEFAULT_RESOURCE_NAME);
        assert_eq!(empty.engine_name, DEFAULT_RESOURCE_NAME);
    }

    #[test]
    fn test_metadata_retrieval_legacy_format() {
        // Past the cutoff the raw value is an absolute timestamp and the
        // duration field wins.
        let query = QueryRecord {
            metadata_retrieval: 1_600_000_000_000,
            metadata_retrieval_time: 250,
            ..Default::default()
        };
        assert_eq!(query.metadata_retrieval_ms(), 250);

        let query = QueryRecord {
            metadata_retrieval: 900,
            metadata_retrieval_time: 250,
            ..Default::default()
        };
        assert_eq!(query.metadata_retrieval_ms(), 900);
    }

    #[test]
    fn test_overlaps_boundaries() {
        let query = QueryRecord { start: 500, finish: 2500, ..Default::default() };
        assert!(query.overlaps(0, 1000));
        assert!(query.overlaps(1000, 2000));
        assert!(query.overlaps(2000, 3000));
        assert!(query.overlaps(2500, 3500)); // finish == bucket start
        assert!(!query.overlaps(2501, 3500));
        assert!(!query.overlaps(0, 499));
    }

    #[test]
    fn test_summary_query_is_set_comparable() {
        // Bucket-content comparisons collect projections into ordered sets.
        let a = SummaryQuery { query_text: "a".to_string(), start: 10, finish: 20 };
        let b = SummaryQuery { query_text: "b".to_string(), start: 5, finish: 8 };
        let set: std::collections::BTreeSet<SummaryQuery> =
            [a.clone(), b, a].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_summary_query_projection() {
        let query = QueryRecord {
            query_text: "SELECT 1".to_string(),
            start: 10,
            finish: 20,
            ..Default::default()
        };
        let projected = SummaryQuery::from(&query);
        assert_eq!(projected.query_text, "SELECT 1");
        assert_eq!(projected.start, 10);
        assert_eq!(projected.finish, 20);
    }
}
