//! Line-delimited query log parsing with filter/reporter fan-out.
//!
//! The parser reads one newline-delimited record at a time, so memory stays
//! bounded regardless of file size. Accepted records are handed to every
//! reporter, in registration order, and then discarded; nothing is cached
//! here.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;

use crate::error::QuerylensError;
use crate::models::{QueryRecord, SearchedFile};
use crate::services::filter::QueryFilter;
use crate::services::reporter::SharedReporter;

/// Decodes one entry's byte stream into query records and fans them out.
pub struct QueryParser;

impl QueryParser {
    /// Parse the file at `path`, selecting a decoder from `display_name`.
    ///
    /// `display_name` is the entry's name inside the archive; extracted
    /// scratch files carry opaque temporary names, so the decoder choice
    /// cannot come from `path`.
    pub fn parse_file(
        path: &Path,
        display_name: &str,
        filter: &dyn QueryFilter,
        reporters: &[SharedReporter],
    ) -> Result<SearchedFile, QuerylensError> {
        let file = File::open(path)?;
        let reader = Self::decoder_for(display_name, file);
        Self::parse_reader(BufReader::new(reader), display_name, filter, reporters)
    }

    /// Parse a decompressed byte stream.
    ///
    /// A decode failure on any line is not caught at the line level: it
    /// aborts the whole entry and propagates to the caller's per-task
    /// failure handling.
    pub fn parse_reader<R: BufRead>(
        reader: R,
        display_name: &str,
        filter: &dyn QueryFilter,
        reporters: &[SharedReporter],
    ) -> Result<SearchedFile, QuerylensError> {
        let mut accepted: u64 = 0;
        let mut filtered: u64 = 0;

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let query: QueryRecord = serde_json::from_str(&line)
                .map_err(|e| QuerylensError::decode(display_name, e.to_string()))?;

            if !filter.matches(&query) {
                filtered += 1;
                continue;
            }
            accepted += 1;
            for reporter in reporters {
                reporter.lock().report(&query);
            }
        }

        tracing::debug!(file = display_name, accepted, filtered, "Parsed entry");
        Ok(SearchedFile::success(display_name, accepted, filtered))
    }

    /// Pick a decompressor from the entry name's extension.
    fn decoder_for(name: &str, file: File) -> Box<dyn Read + Send> {
        if name.ends_with(".gz") {
            Box::new(GzDecoder::new(file))
        } else if name.ends_with(".bzip2") || name.ends_with(".bz2") {
            Box::new(BzDecoder::new(file))
        } else {
            Box::new(file)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::filter::{AcceptAll, DateRangeFilter};
    use crate::services::reporter::{shared, CollectingReporter, QueryReporter};
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use parking_lot::Mutex;
    use std::io::{Cursor, Write};
    use std::sync::Arc;

    fn line(id: &str, start: i64) -> String {
        format!(r#"{{"queryId": "{id}", "start": {start}, "finish": {}}}"#, start + 100)
    }

    #[test]
    fn test_counts_and_fanout() {
        let input = format!("{}\n{}\n\n{}\n", line("a", 100), line("b", 5000), line("c", 150));
        let collector = shared(CollectingReporter::new());
        let filter = DateRangeFilter::new(0, 1000);

        let searched = QueryParser::parse_reader(
            Cursor::new(input),
            "queries.json",
            &filter,
            &[collector.clone()],
        )
        .unwrap();

        assert_eq!(searched.accepted, 2);
        assert_eq!(searched.filtered, 1);
        assert!(searched.is_success());
    }

    #[test]
    fn test_reporters_see_file_order() {
        struct IdReporter(Vec<String>);
        impl QueryReporter for IdReporter {
            fn report(&mut self, query: &QueryRecord) {
                self.0.push(query.query_id.clone());
            }
        }

        let input = format!("{}\n{}\n{}\n", line("a", 1), line("b", 2), line("c", 3));
        let reporter = Arc::new(Mutex::new(IdReporter(Vec::new())));
        let as_shared: SharedReporter = reporter.clone();

        QueryParser::parse_reader(Cursor::new(input), "queries.json", &AcceptAll, &[as_shared])
            .unwrap();

        assert_eq!(reporter.lock().0, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_decode_failure_aborts_entry() {
        let input = format!("{}\nnot json\n{}\n", line("a", 1), line("b", 2));
        let collector = shared(CollectingReporter::new());

        let result = QueryParser::parse_reader(
            Cursor::new(input),
            "queries.json",
            &AcceptAll,
            &[collector],
        );

        assert!(matches!(result, Err(QuerylensError::Decode { .. })));
    }

    #[test]
    fn test_rejected_records_never_reach_reporters() {
        let input = line("a", 99_999);
        let collector = Arc::new(Mutex::new(CollectingReporter::new()));
        let as_shared: SharedReporter = collector.clone();
        let filter = DateRangeFilter::new(0, 1000);

        let searched =
            QueryParser::parse_reader(Cursor::new(input), "queries.json", &filter, &[as_shared])
                .unwrap();

        assert_eq!(searched.accepted, 0);
        assert_eq!(searched.filtered, 1);
        assert!(collector.lock().records().is_empty());
    }

    #[test]
    fn test_parse_gzip_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scratch");
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        encoder.write_all(line("a", 1).as_bytes()).unwrap();
        encoder.write_all(b"\n").unwrap();
        encoder.finish().unwrap();

        let searched =
            QueryParser::parse_file(&path, "logs/queries.json.gz", &AcceptAll, &[]).unwrap();
        assert_eq!(searched.accepted, 1);
        assert_eq!(searched.file_name, "logs/queries.json.gz");
    }
}
