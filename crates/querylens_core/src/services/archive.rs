//! Archive discovery, extraction, and concurrent entry parsing.
//!
//! The container is read strictly sequentially (archive and stream formats
//! do not support concurrent random access across entries) while parsing of
//! the extracted entries runs on a bounded worker pool. Each qualifying
//! entry is copied into a uniquely-named scratch file first, because several
//! of the readers cannot re-read or seek backward mid-stream; the scratch
//! file is owned by its parse task and deleted on every exit path.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::Arc;

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use tempfile::NamedTempFile;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use xz2::read::XzDecoder;

use crate::error::QuerylensError;
use crate::models::SearchedFile;
use crate::services::filter::QueryFilter;
use crate::services::parser::QueryParser;
use crate::services::reporter::SharedReporter;

/// Entry names must contain this substring to qualify.
const ENTRY_NAME_MARKER: &str = "queries";

/// Recognized entry extensions.
const ENTRY_EXTENSIONS: [&str; 3] = [".gz", ".bzip2", ".json"];

/// Entries smaller than this are unusable and recorded as failed.
const MIN_ENTRY_BYTES: u64 = 8;

/// Two-byte gzip magic number; `.gz` entries are verified by content rather
/// than trusting the extension.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Container format, chosen from the file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContainerKind {
    Zip,
    Tar(TarCompression),
    /// Not a container: the file itself is the single entry.
    Bare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TarCompression {
    None,
    Gzip,
    Bzip2,
    Xz,
}

/// A qualifying entry extracted to a scratch file, or an entry that already
/// failed during the scan.
enum ScanItem {
    Entry(ScratchEntry),
    Failed(SearchedFile),
}

/// One extracted entry. Dropping the scratch file deletes it.
struct ScratchEntry {
    name: String,
    scratch: NamedTempFile,
}

/// Drives concurrent parsing of every qualifying entry in an archive.
pub struct ArchiveSearcher {
    concurrency: usize,
}

impl ArchiveSearcher {
    /// Create a searcher with the given worker-pool size (clamped to >= 1).
    pub fn new(concurrency: usize) -> Self {
        Self { concurrency: concurrency.max(1) }
    }

    /// Parse every qualifying entry of the archive at `path`, invoking the
    /// reporters for each accepted record, and return one [`SearchedFile`]
    /// per entry.
    ///
    /// Entry results arrive in no particular order. A per-entry failure
    /// becomes a failed `SearchedFile`; only an unopenable container or a
    /// worker-pool coordination failure returns `Err`.
    pub async fn search(
        &self,
        path: impl AsRef<Path>,
        filter: Arc<dyn QueryFilter>,
        reporters: Vec<SharedReporter>,
    ) -> Result<Vec<SearchedFile>, QuerylensError> {
        let path = path.as_ref().to_path_buf();
        tracing::debug!(path = %path.display(), concurrency = self.concurrency, "Searching archive");

        // The scan runs on a blocking thread and feeds extracted entries
        // through a channel; this task is the only collector of results.
        let (tx, mut rx) = mpsc::unbounded_channel::<ScanItem>();
        let scan_path = path.clone();
        let scan = tokio::task::spawn_blocking(move || scan_container(&scan_path, &tx));

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks: JoinSet<SearchedFile> = JoinSet::new();
        let mut results = Vec::new();

        while let Some(item) = rx.recv().await {
            match item {
                ScanItem::Failed(searched) => {
                    tracing::warn!(
                        file = %searched.file_name,
                        error = searched.error.as_deref().unwrap_or(""),
                        "Entry failed during scan"
                    );
                    results.push(searched);
                }
                ScanItem::Entry(entry) => {
                    let permit = semaphore
                        .clone()
                        .acquire_owned()
                        .await
                        .map_err(|e| QuerylensError::pool_with_source("worker pool closed", e))?;
                    let filter = filter.clone();
                    let reporters = reporters.clone();
                    tasks.spawn_blocking(move || {
                        let _permit = permit;
                        parse_entry(entry, filter.as_ref(), &reporters)
                    });
                }
            }
        }

        // The channel closed, so the scan is done; surface container-level
        // failures before waiting on the workers.
        scan.await??;

        while let Some(joined) = tasks.join_next().await {
            let searched = joined?;
            results.push(searched);
        }

        tracing::debug!(path = %path.display(), entries = results.len(), "Archive search complete");
        Ok(results)
    }
}

/// Parse one extracted entry, converting any failure into a failed
/// [`SearchedFile`]. The scratch file is deleted when `entry` drops,
/// whatever the outcome.
fn parse_entry(
    entry: ScratchEntry,
    filter: &dyn QueryFilter,
    reporters: &[SharedReporter],
) -> SearchedFile {
    match QueryParser::parse_file(entry.scratch.path(), &entry.name, filter, reporters) {
        Ok(searched) => searched,
        Err(e) => {
            tracing::warn!(file = %entry.name, error = %e, "Entry failed to parse");
            SearchedFile::failure(&entry.name, e.to_string())
        }
    }
}

/// Iterate the container sequentially, extracting qualifying entries.
///
/// Per-entry problems are sent as [`ScanItem::Failed`] and scanning
/// continues; only a container that cannot be opened or iterated at all is
/// an `Err`.
fn scan_container(
    path: &Path,
    tx: &mpsc::UnboundedSender<ScanItem>,
) -> Result<(), QuerylensError> {
    match detect_container(path) {
        ContainerKind::Zip => scan_zip(path, tx),
        ContainerKind::Tar(compression) => scan_tar(path, compression, tx),
        ContainerKind::Bare => scan_bare_file(path, tx),
    }
}

fn detect_container(path: &Path) -> ContainerKind {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    if name.ends_with(".zip") {
        ContainerKind::Zip
    } else if name.ends_with(".tar") {
        ContainerKind::Tar(TarCompression::None)
    } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        ContainerKind::Tar(TarCompression::Gzip)
    } else if name.ends_with(".tar.bz2") || name.ends_with(".tar.bzip2") {
        ContainerKind::Tar(TarCompression::Bzip2)
    } else if name.ends_with(".tar.xz") || name.ends_with(".txz") {
        ContainerKind::Tar(TarCompression::Xz)
    } else {
        ContainerKind::Bare
    }
}

/// Whether an entry name qualifies: contains the marker substring and ends
/// in a recognized extension. Directory entries are excluded by the callers.
fn entry_matches(name: &str) -> bool {
    name.contains(ENTRY_NAME_MARKER) && ENTRY_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

fn scan_zip(path: &Path, tx: &mpsc::UnboundedSender<ScanItem>) -> Result<(), QuerylensError> {
    let file = File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    for index in 0..archive.len() {
        let mut entry = match archive.by_index(index) {
            Ok(entry) => entry,
            Err(e) => {
                send(tx, ScanItem::Failed(SearchedFile::failure(
                    format!("entry #{index}"),
                    e.to_string(),
                )));
                continue;
            }
        };
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        if !entry_matches(&name) {
            tracing::trace!(file = %name, "Skipping non-matching entry");
            continue;
        }
        let size = entry.size();
        extract_entry(&mut entry, name, size, tx);
    }
    Ok(())
}

fn scan_tar(
    path: &Path,
    compression: TarCompression,
    tx: &mpsc::UnboundedSender<ScanItem>,
) -> Result<(), QuerylensError> {
    let file = File::open(path)?;
    let reader: Box<dyn Read> = match compression {
        TarCompression::None => Box::new(file),
        TarCompression::Gzip => Box::new(GzDecoder::new(file)),
        TarCompression::Bzip2 => Box::new(BzDecoder::new(file)),
        TarCompression::Xz => Box::new(XzDecoder::new(file)),
    };
    let mut archive = tar::Archive::new(reader);

    for entry in archive
        .entries()
        .map_err(|e| QuerylensError::archive_with_source("failed to iterate tar entries", e))?
    {
        let mut entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                // The stream is unreliable past a bad header; stop here.
                return Err(QuerylensError::archive_with_source("corrupt tar entry", e));
            }
        };
        if entry.header().entry_type().is_dir() {
            continue;
        }
        let name = match entry.path() {
            Ok(p) => p.to_string_lossy().into_owned(),
            Err(e) => {
                send(tx, ScanItem::Failed(SearchedFile::failure("<unnamed entry>", e.to_string())));
                continue;
            }
        };
        if !entry_matches(&name) {
            tracing::trace!(file = %name, "Skipping non-matching entry");
            continue;
        }
        let size = entry.size();
        extract_entry(&mut entry, name, size, tx);
    }
    Ok(())
}

/// A bare gzip/bzip2/json file is treated as a single already-selected
/// entry: the size and gzip-magic checks still apply, the name marker does
/// not.
fn scan_bare_file(path: &Path, tx: &mpsc::UnboundedSender<ScanItem>) -> Result<(), QuerylensError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let mut file = File::open(path)?;
    let size = file.metadata()?.len();
    extract_entry(&mut file, name, size, tx);
    Ok(())
}

/// Copy one qualifying entry into a scratch file and hand it to the pool.
///
/// Too-small entries and gzip entries with a bad magic number are recorded
/// as failed; copy errors likewise. Scanning always continues.
fn extract_entry(reader: &mut dyn Read, name: String, size: u64, tx: &mpsc::UnboundedSender<ScanItem>) {
    if size < MIN_ENTRY_BYTES {
        send(tx, ScanItem::Failed(SearchedFile::failure(
            &name,
            format!("entry is {size} bytes, smaller than the {MIN_ENTRY_BYTES}-byte minimum"),
        )));
        return;
    }

    match copy_to_scratch(reader, &name) {
        Ok(scratch) => {
            tracing::debug!(file = %name, size, "Extracted entry");
            send(tx, ScanItem::Entry(ScratchEntry { name, scratch }));
        }
        Err(e) => {
            send(tx, ScanItem::Failed(SearchedFile::failure(&name, e.to_string())));
        }
    }
}

fn copy_to_scratch(reader: &mut dyn Read, name: &str) -> Result<NamedTempFile, QuerylensError> {
    let mut scratch = tempfile::Builder::new().prefix("querylens-").tempfile()?;

    if name.ends_with(".gz") {
        // Entries are at least MIN_ENTRY_BYTES, so the magic is present.
        let mut magic = [0u8; 2];
        reader.read_exact(&mut magic)?;
        if magic != GZIP_MAGIC {
            return Err(QuerylensError::archive(format!(
                "not a gzip stream (magic {:02x}{:02x})",
                magic[0], magic[1]
            )));
        }
        scratch.write_all(&magic)?;
    }

    io::copy(reader, &mut scratch)?;
    scratch.flush()?;
    Ok(scratch)
}

/// The receiver only drops once the scan task is gone, so a send failure is
/// unreachable in practice; swallowing it keeps the scan total.
fn send(tx: &mpsc::UnboundedSender<ScanItem>, item: ScanItem) {
    let _ = tx.send(item);
}
