//! The in-memory entry store.
//!
//! A [`Store`] holds the entries of one container (or of one merged output)
//! split into two partitions by [`EntryKind`]. Each partition is an
//! immutable, reference-counted map. Changing a partition never mutates the
//! map in place: a new map is built and swapped in under a short write lock,
//! so a [`StoreSnapshot`] taken at any time contains either the complete old
//! or the complete new partition.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::{Mutex, MutexGuard, RwLock};

use crate::entry::{Entry, EntryKind};
use crate::{Error, Result};

/// One partition: key to payload.
pub type Partition = Arc<HashMap<String, Bytes>>;

/// A consistent view of both partitions at one point in time.
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    classes: Partition,
    resources: Partition,
}

impl StoreSnapshot {
    /// Creates a snapshot from two partitions.
    pub fn new(classes: HashMap<String, Bytes>, resources: HashMap<String, Bytes>) -> Self {
        Self {
            classes: Arc::new(classes),
            resources: Arc::new(resources),
        }
    }

    /// Returns the partition of the given kind.
    pub fn partition(&self, kind: EntryKind) -> &Partition {
        match kind {
            EntryKind::Class => &self.classes,
            EntryKind::Resource => &self.resources,
        }
    }

    /// Returns the class partition.
    pub fn classes(&self) -> &HashMap<String, Bytes> {
        &self.classes
    }

    /// Returns the resource partition.
    pub fn resources(&self) -> &HashMap<String, Bytes> {
        &self.resources
    }

    /// Looks up an entry payload in one partition.
    pub fn get(&self, kind: EntryKind, key: &str) -> Option<&Bytes> {
        self.partition(kind).get(key)
    }

    /// Total number of entries in both partitions.
    pub fn len(&self) -> usize {
        self.classes.len() + self.resources.len()
    }

    /// Returns true if both partitions are empty.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.resources.is_empty()
    }

    /// Returns all entries of one partition, sorted by key.
    pub fn sorted_entries(&self, kind: EntryKind) -> Vec<Entry> {
        let mut entries: Vec<Entry> = self
            .partition(kind)
            .iter()
            .map(|(name, data)| Entry::new(name.clone(), data.clone()))
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    fn set_partition(&mut self, kind: EntryKind, partition: Partition) {
        match kind {
            EntryKind::Class => self.classes = partition,
            EntryKind::Resource => self.resources = partition,
        }
    }
}

impl PartialEq for StoreSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.classes == other.classes && self.resources == other.resources
    }
}

impl Eq for StoreSnapshot {}

/// Entry store for one container context.
///
/// The store starts empty, is populated once, may have its partitions
/// replaced any number of times, and is cleared on close. All methods take
/// `&self`; the store can be shared between threads.
#[derive(Debug, Default)]
pub struct Store {
    state: RwLock<StoreState>,
    changes: Mutex<()>,
}

#[derive(Debug, Default)]
struct StoreState {
    snapshot: StoreSnapshot,
    populated: bool,
}

impl Store {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fills the store with freshly read partitions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyPopulated`] if the store was populated before
    /// and has not been cleared since. `name` is only used for the message.
    pub fn populate(
        &self,
        name: &str,
        classes: HashMap<String, Bytes>,
        resources: HashMap<String, Bytes>,
    ) -> Result<()> {
        let mut state = self.state.write();
        if state.populated {
            return Err(Error::AlreadyPopulated {
                name: name.to_string(),
            });
        }
        state.snapshot = StoreSnapshot::new(classes, resources);
        state.populated = true;
        Ok(())
    }

    /// Returns true once [`populate`](Self::populate) has succeeded.
    pub fn is_populated(&self) -> bool {
        self.state.read().populated
    }

    /// Returns a consistent view of both partitions.
    pub fn snapshot(&self) -> StoreSnapshot {
        self.state.read().snapshot.clone()
    }

    /// Returns the current map of one partition.
    pub fn partition(&self, kind: EntryKind) -> Partition {
        Arc::clone(self.state.read().snapshot.partition(kind))
    }

    /// Replaces one partition wholesale.
    ///
    /// The swap happens under the write lock; readers see the old map or
    /// the new one, never a mix.
    pub fn replace_partition(&self, kind: EntryKind, partition: HashMap<String, Bytes>) {
        self.state
            .write()
            .snapshot
            .set_partition(kind, Arc::new(partition));
    }

    /// Serializes change calls on this store.
    ///
    /// The guard does not block readers or snapshots; it only keeps two
    /// change calls from building on the same old partition.
    pub(crate) fn lock_changes(&self) -> MutexGuard<'_, ()> {
        self.changes.lock()
    }

    /// Looks up an entry payload.
    pub fn get(&self, kind: EntryKind, key: &str) -> Option<Bytes> {
        self.state.read().snapshot.get(kind, key).cloned()
    }

    /// Returns true if the partition holds `key`.
    pub fn contains(&self, kind: EntryKind, key: &str) -> bool {
        self.state.read().snapshot.partition(kind).contains_key(key)
    }

    /// Total number of entries.
    pub fn len(&self) -> usize {
        self.state.read().snapshot.len()
    }

    /// Returns true if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.state.read().snapshot.is_empty()
    }

    /// Drops all entries and allows the store to be populated again.
    pub fn clear(&self) {
        let mut state = self.state.write();
        state.snapshot = StoreSnapshot::default();
        state.populated = false;
    }
}
