//! Locating a single entry across containers without loading them.
//!
//! A search parses the central directory of each container and decodes
//! only the matching entry. Containers are searched in the order given and
//! the first hit wins, the same precedence a merge uses.

use std::io::{Read, Seek};
use std::path::Path;

use crate::entry::Entry;
use crate::format::{ContainerIndex, RawEntry};
use crate::read::{self, ReadOptions};
use crate::Result;

/// An entry found by a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    /// Name of the container holding the entry.
    pub container: String,
    /// The decoded entry.
    pub entry: Entry,
}

/// Looks up `key` in one container read from `source`.
///
/// Returns `Ok(None)` if the container has no entry named `key`. Directory
/// keys never match.
///
/// # Errors
///
/// Returns [`Error::InvalidContainer`](crate::Error::InvalidContainer) if
/// `container` lacks the extension required by `options` or the central
/// directory cannot be read, and the entry error if the
/// matching entry cannot be read or decoded.
pub fn find_entry<R: Read + Seek>(
    source: &mut R,
    container: &str,
    key: &str,
    options: &ReadOptions,
) -> Result<Option<SearchHit>> {
    options.check_extension(container)?;
    let index =
        ContainerIndex::read(source, container).map_err(|e| e.into_invalid_container(container))?;
    let Some((position, header)) = index
        .entries()
        .iter()
        .enumerate()
        .find(|(_, e)| e.name == key && !e.is_directory())
    else {
        return Ok(None);
    };

    let raw = RawEntry::read(source, position, header, options.limits.max_entry_size)
        .map_err(|e| e.into_entry_read(container, key))?;
    let data = raw
        .decode(options.verify_crc)
        .map_err(|e| e.into_entry_read(container, key))?;

    log::debug!("Found '{}' in '{}'", key, container);
    Ok(Some(SearchHit {
        container: container.to_string(),
        entry: Entry::new(key, data),
    }))
}

/// Looks up `key` in the container at `path`.
///
/// # Errors
///
/// See [`find_entry`]. A path that cannot be opened is an invalid
/// container.
pub fn find_entry_in_path(
    path: impl AsRef<Path>,
    key: &str,
    options: &ReadOptions,
) -> Result<Option<SearchHit>> {
    let path = path.as_ref();
    let name = read::container_name(path);
    let mut source = read::open_container(path, &name)?;
    find_entry(&mut source, &name, key, options)
}

/// Looks up `key` in each container at `paths`, in order.
///
/// Returns the first hit. The search stops at the first container that
/// fails.
///
/// # Errors
///
/// See [`find_entry_in_path`].
///
/// # Example
///
/// ```rust
/// use jarkit::read::ReadOptions;
/// use jarkit::search::find_entry_in_paths;
///
/// let paths: [&str; 0] = [];
/// let hit = find_entry_in_paths(&paths, "com/A.class", &ReadOptions::default())?;
/// assert!(hit.is_none());
/// # Ok::<(), jarkit::Error>(())
/// ```
pub fn find_entry_in_paths<P: AsRef<Path>>(
    paths: &[P],
    key: &str,
    options: &ReadOptions,
) -> Result<Option<SearchHit>> {
    for path in paths {
        if let Some(hit) = find_entry_in_path(path, key, options)? {
            return Ok(Some(hit));
        }
    }
    Ok(None)
}
