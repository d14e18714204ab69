//! Serializing stores into jar containers.
//!
//! [`write_snapshot`] turns a [`StoreSnapshot`] into container bytes: class
//! entries first, then resources, each group sorted by key. Class keys that
//! lost their `.class` suffix during a change get it back here.
//!
//! Most callers go through [`Output`], which is handed out by
//! [`JarManager`](crate::JarManager), [`MultiJarManager`](crate::MultiJarManager)
//! and [`MergedJar`](crate::MergedJar) and takes a fresh snapshot on each call.
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use bytes::Bytes;
//! use jarkit::store::StoreSnapshot;
//! use jarkit::write::{write_snapshot, CompressionLevel};
//!
//! let mut classes = HashMap::new();
//! classes.insert("com/A".to_string(), Bytes::from_static(&[1, 2, 3]));
//! let snapshot = StoreSnapshot::new(classes, HashMap::new());
//!
//! let bytes = write_snapshot(&snapshot, CompressionLevel::Store, Vec::new())?;
//! assert_eq!(&bytes[..2], b"PK");
//! # Ok::<(), jarkit::Error>(())
//! ```

mod level;
mod output;

pub use level::CompressionLevel;
pub use output::Output;

use std::collections::BTreeMap;
use std::io::Write;

use bytes::Bytes;

use crate::entry::normalize_class_key;
use crate::format::ContainerWriter;
use crate::store::StoreSnapshot;
use crate::{Error, Result};

/// Summary of a serialized container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteResult {
    /// Class entries written.
    pub classes_written: usize,
    /// Resource entries written.
    pub resources_written: usize,
}

/// Writes every entry of `snapshot` as a container into `sink`.
///
/// Returns the sink once the central directory has been written.
///
/// # Errors
///
/// Returns I/O errors from the sink, [`Error::UnsupportedFeature`] if the
/// output would need zip64, and [`Error::DuplicateEntry`] if two entries map
/// to the same output key.
///
/// [`Error::UnsupportedFeature`]: crate::Error::UnsupportedFeature
/// [`Error::DuplicateEntry`]: crate::Error::DuplicateEntry
pub fn write_snapshot<W: Write>(
    snapshot: &StoreSnapshot,
    level: CompressionLevel,
    sink: W,
) -> Result<W> {
    write_snapshot_with_result(snapshot, level, sink).map(|(sink, _)| sink)
}

/// Like [`write_snapshot`], also returning what was written.
pub fn write_snapshot_with_result<W: Write>(
    snapshot: &StoreSnapshot,
    level: CompressionLevel,
    sink: W,
) -> Result<(W, WriteResult)> {
    let classes = normalized_classes(snapshot)?;

    let resources = snapshot.resources();
    let mut keys: Vec<&String> = resources.keys().collect();
    keys.sort();
    if let Some(key) = keys.iter().find(|key| classes.contains_key(key.as_str())) {
        return Err(Error::DuplicateEntry {
            name: key.to_string(),
        });
    }

    let mut result = WriteResult::default();
    let mut writer = ContainerWriter::new(sink);
    for (name, data) in &classes {
        writer.add_entry(name, data, level)?;
        result.classes_written += 1;
    }
    for key in keys {
        writer.add_entry(key, &resources[key], level)?;
        result.resources_written += 1;
    }

    let sink = writer.finish()?;
    Ok((sink, result))
}

/// Maps class entries to their output keys, sorted.
///
/// Fails if a key without the suffix normalizes onto another class key.
fn normalized_classes(snapshot: &StoreSnapshot) -> Result<BTreeMap<String, Bytes>> {
    let mut out = BTreeMap::new();
    for (key, data) in snapshot.classes() {
        let normalized = normalize_class_key(key).into_owned();
        if out.contains_key(&normalized) {
            return Err(Error::DuplicateEntry { name: normalized });
        }
        out.insert(normalized, data.clone());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{ContainerIndex, RawEntry};
    use std::collections::HashMap;
    use std::io::Cursor;

    fn map(entries: &[(&str, &[u8])]) -> HashMap<String, Bytes> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), Bytes::copy_from_slice(v)))
            .collect()
    }

    fn read_back(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
        let mut cursor = Cursor::new(bytes);
        let index = ContainerIndex::read(&mut cursor, "out.jar").unwrap();
        index
            .entries()
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let raw = RawEntry::read(&mut cursor, i, header, u64::MAX).unwrap();
                (header.name.clone(), raw.decode(true).unwrap())
            })
            .collect()
    }

    #[test]
    fn test_classes_first_then_resources_sorted() {
        let snapshot = StoreSnapshot::new(
            map(&[("z/Z.class", &[3]), ("a/A.class", &[1])]),
            map(&[("b.txt", &[5]), ("META-INF/MANIFEST.MF", &[4])]),
        );
        let bytes = write_snapshot(&snapshot, CompressionLevel::Default, Vec::new()).unwrap();
        let names: Vec<_> = read_back(&bytes).into_iter().map(|(n, _)| n).collect();
        assert_eq!(
            names,
            ["a/A.class", "z/Z.class", "META-INF/MANIFEST.MF", "b.txt"]
        );
    }

    #[test]
    fn test_class_key_normalized() {
        let snapshot = StoreSnapshot::new(map(&[("com/A", &[1, 2])]), HashMap::new());
        let bytes = write_snapshot(&snapshot, CompressionLevel::Store, Vec::new()).unwrap();
        assert_eq!(read_back(&bytes), [("com/A.class".to_string(), vec![1, 2])]);
    }

    #[test]
    fn test_normalized_collision_fails() {
        let snapshot = StoreSnapshot::new(
            map(&[("com/A", &[1]), ("com/A.class", &[2])]),
            HashMap::new(),
        );
        let err = write_snapshot(&snapshot, CompressionLevel::Store, Vec::new()).unwrap_err();
        assert!(matches!(err, Error::DuplicateEntry { ref name } if name == "com/A.class"));
    }

    #[test]
    fn test_resource_colliding_with_class_fails() {
        let snapshot = StoreSnapshot::new(
            map(&[("x.class", &[1])]),
            map(&[("x.class", &[2]), ("y.txt", &[3])]),
        );
        let err = write_snapshot(&snapshot, CompressionLevel::Store, Vec::new()).unwrap_err();
        assert!(matches!(err, Error::DuplicateEntry { ref name } if name == "x.class"));
    }

    #[test]
    fn test_write_result_counts() {
        let snapshot = StoreSnapshot::new(
            map(&[("x.class", &[1])]),
            map(&[("y.txt", &[3]), ("z.txt", &[4])]),
        );
        let (_, result) =
            write_snapshot_with_result(&snapshot, CompressionLevel::Store, Vec::new()).unwrap();
        assert_eq!(result.classes_written, 1);
        assert_eq!(result.resources_written, 2);
    }

    #[test]
    fn test_empty_snapshot() {
        let bytes =
            write_snapshot(&StoreSnapshot::default(), CompressionLevel::Default, Vec::new())
                .unwrap();
        assert!(read_back(&bytes).is_empty());
    }

    #[test]
    fn test_identical_snapshots_identical_bytes() {
        let snapshot = StoreSnapshot::new(
            map(&[("a.class", b"aaaa"), ("b.class", b"bbbb")]),
            map(&[("r", b"rrrr")]),
        );
        let first = write_snapshot(&snapshot, CompressionLevel::Level(9), Vec::new()).unwrap();
        let second = write_snapshot(&snapshot.clone(), CompressionLevel::Level(9), Vec::new())
            .unwrap();
        assert_eq!(first, second);
    }
}
