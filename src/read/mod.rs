//! Reading containers into entry collections.
//!
//! A container is read in two phases. Phase 1 parses the central directory
//! and copies each entry's stored bytes out of the source with sequential
//! I/O. Phase 2 decompresses and verifies the entries, in parallel when the
//! `parallel` feature is enabled, and offers them to an [`EntryCollector`],
//! which keeps the first occurrence of every key.
//!
//! Entry failures are reported to the diagnostic sink and counted in
//! [`ReadResult::entries_failed`]; the read continues. Container failures
//! abort the read and are returned, unreported, to the caller.
//!
//! # Example
//!
//! ```rust
//! use std::io::Cursor;
//! use jarkit::diagnostics::LogSink;
//! use jarkit::format::ContainerWriter;
//! use jarkit::read::{read_container, EntryCollector, ReadOptions};
//! use jarkit::CompressionLevel;
//!
//! let mut writer = ContainerWriter::new(Vec::new());
//! writer.add_entry("dup.txt", b"first", CompressionLevel::Store)?;
//! writer.add_entry("dup.txt", b"second", CompressionLevel::Store)?;
//! let jar = writer.finish()?;
//!
//! let collector = EntryCollector::new();
//! let result = read_container(
//!     &mut Cursor::new(jar),
//!     "dup.jar",
//!     0,
//!     &collector,
//!     &ReadOptions::default(),
//!     &LogSink,
//! )?;
//! assert_eq!(result.duplicates_discarded, 1);
//!
//! let (_, resources) = collector.into_partitions();
//! assert_eq!(&resources["dup.txt"][..], b"first");
//! # Ok::<(), jarkit::Error>(())
//! ```

mod collector;
mod options;

pub use collector::{EntryCollector, Offer, Ordinal};
pub use options::{ReadLimits, ReadOptions, Threads};
pub(crate) use options::Workers;

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::ops::AddAssign;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::diagnostics::{self, DiagnosticSink};
use crate::entry::EntryKind;
use crate::format::{ContainerIndex, RawEntry};
use crate::{Error, Result};

/// Counts from reading one or more containers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadResult {
    /// Entries decoded successfully.
    pub entries_read: usize,
    /// Distinct class keys added.
    pub class_entries: usize,
    /// Distinct resource keys added.
    pub resource_entries: usize,
    /// Directory records skipped.
    pub directories_skipped: usize,
    /// Entries dropped because their key was already held.
    pub duplicates_discarded: usize,
    /// Entries dropped because they could not be read.
    pub entries_failed: usize,
}

impl ReadResult {
    /// Returns true if no entry failed.
    pub fn is_success(&self) -> bool {
        self.entries_failed == 0
    }

    /// Distinct keys added, both partitions.
    pub fn entries_added(&self) -> usize {
        self.class_entries + self.resource_entries
    }
}

impl AddAssign for ReadResult {
    fn add_assign(&mut self, other: Self) {
        self.entries_read += other.entries_read;
        self.class_entries += other.class_entries;
        self.resource_entries += other.resource_entries;
        self.directories_skipped += other.directories_skipped;
        self.duplicates_discarded += other.duplicates_discarded;
        self.entries_failed += other.entries_failed;
    }
}

#[derive(Debug, Default)]
struct Counters {
    read: AtomicUsize,
    classes: AtomicUsize,
    resources: AtomicUsize,
    duplicates: AtomicUsize,
    failed: AtomicUsize,
}

/// Reads every entry of one container into `collector`.
///
/// `container` is the container's position among all containers feeding
/// the same collector; it decides which entry wins when keys collide across
/// containers.
///
/// # Errors
///
/// Returns [`Error::InvalidContainer`] if the name lacks the required
/// extension, the central directory cannot be read, or a container-wide
/// limit is exceeded, and [`Error::Io`] if the worker pool cannot be built.
/// The collector may hold entries from this container when a worker pool
/// error is returned.
pub fn read_container<R: Read + Seek>(
    source: &mut R,
    name: &str,
    container: usize,
    collector: &EntryCollector,
    options: &ReadOptions,
    sink: &dyn DiagnosticSink,
) -> Result<ReadResult> {
    options.check_extension(name)?;

    let index = ContainerIndex::read(source, name).map_err(|e| e.into_invalid_container(name))?;
    check_container_limits(&index, name, options)?;

    // Phase 1: sequential I/O
    let mut result = ReadResult::default();
    let mut raws = Vec::with_capacity(index.len());
    for (i, header) in index.entries().iter().enumerate() {
        if header.is_directory() {
            result.directories_skipped += 1;
            continue;
        }
        match RawEntry::read(source, i, header, options.limits.max_entry_size) {
            Ok(raw) => raws.push(raw),
            Err(e) => {
                let error = e.into_entry_read(name, &header.name);
                diagnostics::report(sink, &error, Some(name), Some(&header.name));
                result.entries_failed += 1;
            }
        }
    }

    // Phase 2: decompression
    let counters = Counters::default();
    let process = |raw: &RawEntry| decode_entry(raw, name, container, collector, options, sink, &counters);

    #[cfg(feature = "parallel")]
    {
        let workers = if raws.len() > 1 {
            options.threads.workers()?
        } else {
            Workers::Sequential
        };
        if workers.is_parallel() {
            workers.install(|| raws.par_iter().for_each(&process));
        } else {
            raws.iter().for_each(&process);
        }
    }
    #[cfg(not(feature = "parallel"))]
    raws.iter().for_each(&process);

    result.entries_read = counters.read.load(Ordering::Relaxed);
    result.class_entries = counters.classes.load(Ordering::Relaxed);
    result.resource_entries = counters.resources.load(Ordering::Relaxed);
    result.duplicates_discarded = counters.duplicates.load(Ordering::Relaxed);
    result.entries_failed += counters.failed.load(Ordering::Relaxed);

    log::debug!(
        "Read '{}': {} entries ({} classes, {} resources), {} duplicates, {} failed",
        name,
        result.entries_read,
        result.class_entries,
        result.resource_entries,
        result.duplicates_discarded,
        result.entries_failed
    );
    Ok(result)
}

/// Opens `path` and reads it with [`read_container`].
///
/// The container name is the file name component of `path`.
pub fn read_container_path(
    path: impl AsRef<Path>,
    container: usize,
    collector: &EntryCollector,
    options: &ReadOptions,
    sink: &dyn DiagnosticSink,
) -> Result<ReadResult> {
    let path = path.as_ref();
    let name = container_name(path);
    let mut source = open_container(path, &name)?;
    read_container(&mut source, &name, container, collector, options, sink)
}

fn decode_entry(
    raw: &RawEntry,
    name: &str,
    container: usize,
    collector: &EntryCollector,
    options: &ReadOptions,
    sink: &dyn DiagnosticSink,
    counters: &Counters,
) {
    let data = match raw.decode(options.verify_crc) {
        Ok(data) => data,
        Err(e) => {
            let error = e.into_entry_read(name, raw.name());
            diagnostics::report(sink, &error, Some(name), Some(raw.name()));
            counters.failed.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };

    counters.read.fetch_add(1, Ordering::Relaxed);
    let kind = EntryKind::classify(raw.name());
    match collector.offer(raw.name().to_string(), (container, raw.index), Bytes::from(data)) {
        Offer::Inserted => {
            let added = match kind {
                EntryKind::Class => &counters.classes,
                EntryKind::Resource => &counters.resources,
            };
            added.fetch_add(1, Ordering::Relaxed);
        }
        Offer::Replaced | Offer::Discarded => {
            log::debug!(
                "Duplicate entry '{}' in '{}', keeping the first occurrence",
                raw.name(),
                name
            );
            counters.duplicates.fetch_add(1, Ordering::Relaxed);
        }
    }
}

fn check_container_limits(index: &ContainerIndex, name: &str, options: &ReadOptions) -> Result<()> {
    let limits = &options.limits;
    if index.len() > limits.max_entries {
        return Err(Error::ResourceLimitExceeded(format!(
            "{} entries, limit is {}",
            index.len(),
            limits.max_entries
        ))
        .into_invalid_container(name));
    }

    let total = index
        .entries()
        .iter()
        .filter(|e| !e.is_directory())
        .fold(0u64, |sum, e| sum.saturating_add(e.uncompressed_size));
    if total > limits.max_total_size {
        return Err(Error::ResourceLimitExceeded(format!(
            "{} bytes uncompressed, limit is {}",
            total, limits.max_total_size
        ))
        .into_invalid_container(name));
    }
    Ok(())
}

/// Returns the context name for a container path: its file name.
pub(crate) fn container_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Opens a container file for reading.
pub(crate) fn open_container(path: &Path, name: &str) -> Result<BufReader<File>> {
    if path.is_dir() {
        return Err(Error::InvalidContainer {
            name: name.to_string(),
            reason: "is a directory".into(),
        });
    }
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| Error::InvalidContainer {
            name: name.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingSink;
    use crate::error::FailureKind;
    use crate::format::ContainerWriter;
    use crate::write::CompressionLevel;
    use std::io::Cursor;

    fn jar(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ContainerWriter::new(Vec::new());
        for (name, data) in entries {
            writer.add_entry(name, data, CompressionLevel::Default).unwrap();
        }
        writer.finish().unwrap()
    }

    fn read(bytes: Vec<u8>, options: &ReadOptions) -> (Result<ReadResult>, EntryCollector, CollectingSink) {
        let collector = EntryCollector::new();
        let sink = CollectingSink::new();
        let result = read_container(&mut Cursor::new(bytes), "t.jar", 0, &collector, options, &sink);
        (result, collector, sink)
    }

    #[test]
    fn test_partitions_and_directories() {
        let bytes = jar(&[
            ("META-INF/", b""),
            ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\n"),
            ("com/", b""),
            ("com/A.class", &[0xCA, 0xFE]),
        ]);
        let (result, collector, sink) = read(bytes, &ReadOptions::default());
        let result = result.unwrap();

        assert_eq!(result.directories_skipped, 2);
        assert_eq!(result.entries_read, 2);
        assert_eq!(result.class_entries, 1);
        assert_eq!(result.resource_entries, 1);
        assert!(result.is_success());
        assert!(sink.is_empty());

        let (classes, resources) = collector.into_partitions();
        assert!(classes.contains_key("com/A.class"));
        assert!(resources.contains_key("META-INF/MANIFEST.MF"));
    }

    #[test]
    fn test_duplicates_first_wins_parallel() {
        let mut entries: Vec<(String, Vec<u8>)> = Vec::new();
        for i in 0..64 {
            entries.push((format!("dup{}.class", i % 4), vec![i as u8]));
        }
        let refs: Vec<(&str, &[u8])> = entries
            .iter()
            .map(|(n, d)| (n.as_str(), d.as_slice()))
            .collect();
        let bytes = jar(&refs);

        let options = ReadOptions::new().threads(Threads::count_or_single(4));
        let (result, collector, _) = read(bytes, &options);
        let result = result.unwrap();
        assert_eq!(result.class_entries, 4);
        assert_eq!(result.duplicates_discarded, 60);

        let (classes, _) = collector.into_partitions();
        for i in 0..4u8 {
            assert_eq!(&classes[&format!("dup{}.class", i)][..], &[i]);
        }
    }

    #[test]
    fn test_corrupt_entry_skipped_and_reported() {
        let mut bytes = jar(&[("good.txt", b"good"), ("bad.txt", b"bad-data")]);
        // Flip a byte inside the stored data of the second entry.
        let index = ContainerIndex::read(&mut Cursor::new(&bytes), "t.jar").unwrap();
        let bad = index.find("bad.txt").unwrap();
        let data_start = bad.local_header_offset as usize + 30 + "bad.txt".len();
        bytes[data_start] ^= 0xFF;

        let (result, collector, sink) = read(bytes, &ReadOptions::default());
        let result = result.unwrap();
        assert_eq!(result.entries_read, 1);
        assert_eq!(result.entries_failed, 1);
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.count(FailureKind::EntryIo), 1);

        let diagnostic = &sink.diagnostics()[0];
        assert_eq!(diagnostic.container.as_deref(), Some("t.jar"));
        assert_eq!(diagnostic.entry.as_deref(), Some("bad.txt"));
        assert!(collector.contains("good.txt"));
        assert!(!collector.contains("bad.txt"));
    }

    #[test]
    fn test_not_a_container() {
        let (result, collector, sink) = read(b"plain text".to_vec(), &ReadOptions::default());
        let err = result.unwrap_err();
        assert!(matches!(err, Error::InvalidContainer { .. }));
        assert_eq!(err.kind(), FailureKind::InvalidInput);
        assert!(collector.is_empty());
        assert!(sink.is_empty());
    }

    #[test]
    fn test_entry_limit() {
        let bytes = jar(&[("a", b"1"), ("b", b"2"), ("c", b"3")]);
        let options = ReadOptions::new().limits(ReadLimits::new().max_entries(2));
        let (result, collector, _) = read(bytes, &options);
        assert!(matches!(result, Err(Error::InvalidContainer { .. })));
        assert!(collector.is_empty());
    }

    #[test]
    fn test_total_size_limit() {
        let bytes = jar(&[("a", &[0u8; 100]), ("b", &[0u8; 100])]);
        let options = ReadOptions::new().limits(ReadLimits::new().max_total_size(150));
        let (result, _, _) = read(bytes, &options);
        assert!(matches!(result, Err(Error::InvalidContainer { .. })));
    }

    #[test]
    fn test_entry_size_limit_is_entry_failure() {
        let bytes = jar(&[("small", &[1u8; 10]), ("large", &[2u8; 1000])]);
        let options = ReadOptions::new().limits(ReadLimits::new().max_entry_size(100));
        let (result, collector, sink) = read(bytes, &options);
        let result = result.unwrap();
        assert_eq!(result.entries_failed, 1);
        assert_eq!(sink.count(FailureKind::EntryIo), 1);
        assert!(collector.contains("small"));
    }

    #[test]
    fn test_required_extension() {
        let bytes = jar(&[("a", b"1")]);
        let collector = EntryCollector::new();
        let options = ReadOptions::new().require_extension(Some("jar"));
        let err = read_container(
            &mut Cursor::new(bytes),
            "t.zip",
            0,
            &collector,
            &options,
            &CollectingSink::new(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidContainer { .. }));
    }

    #[test]
    fn test_read_container_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lib.jar");
        std::fs::write(&path, jar(&[("x.class", b"x")])).unwrap();

        let collector = EntryCollector::new();
        let sink = CollectingSink::new();
        let result =
            read_container_path(&path, 0, &collector, &ReadOptions::default(), &sink).unwrap();
        assert_eq!(result.class_entries, 1);

        let err = read_container_path(dir.path(), 1, &collector, &ReadOptions::default(), &sink)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidContainer { .. }));
    }

    #[test]
    fn test_result_add_assign() {
        let mut total = ReadResult {
            entries_read: 2,
            class_entries: 1,
            ..Default::default()
        };
        total += ReadResult {
            entries_read: 3,
            resource_entries: 2,
            entries_failed: 1,
            ..Default::default()
        };
        assert_eq!(total.entries_read, 5);
        assert_eq!(total.entries_added(), 3);
        assert!(!total.is_success());
    }
}
