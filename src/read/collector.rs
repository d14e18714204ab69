//! First-writer-wins collection of decoded entries.

use std::collections::HashMap;

use bytes::Bytes;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry as MapEntry;

use crate::entry::EntryKind;

/// Read position of an entry: container index, then directory index.
///
/// Lower ordinals were read first.
pub type Ordinal = (usize, usize);

/// Outcome of [`EntryCollector::offer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    /// The key was new.
    Inserted,
    /// The key was held by a later entry, which was replaced.
    Replaced,
    /// The key was held by an earlier entry; the offer was dropped.
    Discarded,
}

impl Offer {
    /// Returns true if the offer collided with an existing key.
    pub fn is_duplicate(self) -> bool {
        !matches!(self, Self::Inserted)
    }
}

/// Concurrent map from key to the earliest entry offered for it.
///
/// Entries may be offered from many threads in any order. For every key the
/// collector keeps the entry with the lowest [`Ordinal`], so the result is
/// the same as inserting sequentially in directory order and ignoring
/// repeated keys.
#[derive(Debug, Default)]
pub struct EntryCollector {
    classes: DashMap<String, (Ordinal, Bytes)>,
    resources: DashMap<String, (Ordinal, Bytes)>,
}

impl EntryCollector {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    fn partition(&self, kind: EntryKind) -> &DashMap<String, (Ordinal, Bytes)> {
        match kind {
            EntryKind::Class => &self.classes,
            EntryKind::Resource => &self.resources,
        }
    }

    /// Offers an entry read at `ordinal`.
    ///
    /// The compare and insert happen under the map's lock for `key`.
    pub fn offer(&self, key: String, ordinal: Ordinal, data: Bytes) -> Offer {
        let map = self.partition(EntryKind::classify(&key));
        match map.entry(key) {
            MapEntry::Vacant(slot) => {
                slot.insert((ordinal, data));
                Offer::Inserted
            }
            MapEntry::Occupied(mut slot) => {
                if ordinal < slot.get().0 {
                    slot.insert((ordinal, data));
                    Offer::Replaced
                } else {
                    Offer::Discarded
                }
            }
        }
    }

    /// Returns true if `key` is held.
    pub fn contains(&self, key: &str) -> bool {
        self.partition(EntryKind::classify(key)).contains_key(key)
    }

    /// Number of distinct keys held.
    pub fn len(&self) -> usize {
        self.classes.len() + self.resources.len()
    }

    /// Returns true if nothing is held.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.resources.is_empty()
    }

    /// Drops all held entries.
    pub fn clear(&self) {
        self.classes.clear();
        self.resources.clear();
    }

    /// Consumes the collector, returning the class and resource partitions.
    pub fn into_partitions(self) -> (HashMap<String, Bytes>, HashMap<String, Bytes>) {
        let strip = |map: DashMap<String, (Ordinal, Bytes)>| {
            map.into_iter()
                .map(|(key, (_, data))| (key, data))
                .collect::<HashMap<_, _>>()
        };
        (strip(self.classes), strip(self.resources))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(s: &str) -> Bytes {
        Bytes::copy_from_slice(s.as_bytes())
    }

    #[test]
    fn test_first_offer_wins_in_order() {
        let collector = EntryCollector::new();
        assert_eq!(collector.offer("a.txt".into(), (0, 0), bytes("first")), Offer::Inserted);
        assert_eq!(collector.offer("a.txt".into(), (0, 1), bytes("second")), Offer::Discarded);

        let (_, resources) = collector.into_partitions();
        assert_eq!(resources["a.txt"], bytes("first"));
    }

    #[test]
    fn test_lower_ordinal_replaces() {
        let collector = EntryCollector::new();
        collector.offer("A.class".into(), (0, 5), bytes("late"));
        assert_eq!(collector.offer("A.class".into(), (0, 2), bytes("early")), Offer::Replaced);
        assert!(Offer::Replaced.is_duplicate());

        let (classes, resources) = collector.into_partitions();
        assert_eq!(classes["A.class"], bytes("early"));
        assert!(resources.is_empty());
    }

    #[test]
    fn test_container_index_takes_priority() {
        let collector = EntryCollector::new();
        collector.offer("x".into(), (1, 0), bytes("second container"));
        collector.offer("x".into(), (0, 9), bytes("first container"));
        let (_, resources) = collector.into_partitions();
        assert_eq!(resources["x"], bytes("first container"));
    }

    #[test]
    fn test_partitions_are_separate() {
        let collector = EntryCollector::new();
        collector.offer("com/A.class".into(), (0, 0), bytes("c"));
        collector.offer("com/A.txt".into(), (0, 1), bytes("r"));
        assert_eq!(collector.len(), 2);
        assert!(collector.contains("com/A.class"));
        assert!(!collector.contains("com/B.class"));
    }

    #[test]
    fn test_concurrent_offers_keep_lowest() {
        let collector = EntryCollector::new();
        std::thread::scope(|s| {
            for t in 0..8usize {
                let collector = &collector;
                s.spawn(move || {
                    for i in (0..100usize).rev() {
                        let ordinal = (0, i * 8 + t);
                        collector.offer("dup".into(), ordinal, Bytes::from(ordinal.1.to_string()));
                    }
                });
            }
        });
        let (_, resources) = collector.into_partitions();
        assert_eq!(resources["dup"], bytes("0"));
    }
}
