//! Change pipelines over store partitions.
//!
//! A change maps one entry to a new entry, or to `None` to delete it. A
//! pipeline applies a list of changes to one partition in order: every
//! change sees the complete output of the change before it. Within one pass
//! entries are processed independently and, with the `parallel` feature, on
//! several threads.
//!
//! # Key collisions within a pass
//!
//! If two entries are mapped to the same key by one pass, one of them is
//! kept and the other dropped. Which one survives depends on scheduling and
//! is not deterministic when the pass runs on more than one thread. Changes
//! that rename entries should produce distinct keys.
//!
//! # Example
//!
//! ```rust
//! use jarkit::{ClassChange, Entry};
//!
//! let rename = |entry: Entry| {
//!     let name = entry.name.replace("com/old/", "com/new/");
//!     Some(entry.renamed(name))
//! };
//! let out = ClassChange::apply_change(&rename, Entry::new("com/old/A.class", vec![1]));
//! assert_eq!(out.unwrap().name, "com/new/A.class");
//! ```

use std::collections::HashMap;

use bytes::Bytes;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::Result;
use crate::entry::{Entry, EntryKind};
use crate::read::{Threads, Workers};
use crate::store::Store;

/// A change applied to class entries.
///
/// Implementations must only depend on the entry passed in. Closures of
/// type `Fn(Entry) -> Option<Entry>` implement this trait.
pub trait ClassChange: Send + Sync {
    /// Maps one class entry. Returning `None` deletes it.
    fn apply_change(&self, entry: Entry) -> Option<Entry>;
}

/// A change applied to resource entries.
///
/// Implementations must only depend on the entry passed in. Closures of
/// type `Fn(Entry) -> Option<Entry>` implement this trait.
pub trait ResourceChange: Send + Sync {
    /// Maps one resource entry. Returning `None` deletes it.
    fn apply_change(&self, entry: Entry) -> Option<Entry>;
}

impl<F> ClassChange for F
where
    F: Fn(Entry) -> Option<Entry> + Send + Sync,
{
    fn apply_change(&self, entry: Entry) -> Option<Entry> {
        self(entry)
    }
}

impl<F> ResourceChange for F
where
    F: Fn(Entry) -> Option<Entry> + Send + Sync,
{
    fn apply_change(&self, entry: Entry) -> Option<Entry> {
        self(entry)
    }
}

/// Counts from one change call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeResult {
    /// Passes run. Zero when the call was a no-op.
    pub passes: usize,
    /// Entries in the partition before the first pass.
    pub entries_before: usize,
    /// Entries in the partition after the last pass.
    pub entries_after: usize,
}

/// A change of either kind, as seen by the pipeline.
pub(crate) trait EntryChange: Sync {
    fn apply(&self, entry: Entry) -> Option<Entry>;
}

impl EntryChange for dyn ClassChange + '_ {
    fn apply(&self, entry: Entry) -> Option<Entry> {
        self.apply_change(entry)
    }
}

impl EntryChange for dyn ResourceChange + '_ {
    fn apply(&self, entry: Entry) -> Option<Entry> {
        self.apply_change(entry)
    }
}

/// Applies `changes` in order to the `kind` partition of `store`.
///
/// The partition is replaced once, after the last pass. Concurrent change
/// calls on the same store are serialized; snapshots and outputs are not
/// blocked and see the partition from before or after the call.
///
/// # Errors
///
/// Returns [`Error::Io`](crate::Error::Io) if the worker pool cannot be
/// built. The store is unchanged in that case.
pub(crate) fn apply_changes<C>(
    store: &Store,
    kind: EntryKind,
    changes: &[&C],
    threads: Threads,
) -> Result<ChangeResult>
where
    C: EntryChange + ?Sized,
{
    let _guard = store.lock_changes();
    let start = store.partition(kind);
    let mut result = ChangeResult {
        passes: 0,
        entries_before: start.len(),
        entries_after: start.len(),
    };
    if changes.is_empty() || start.is_empty() {
        return Ok(result);
    }

    let workers = threads.workers()?;
    let mut current = run_pass(&start, changes[0], &workers);
    for change in &changes[1..] {
        current = run_pass(&current, *change, &workers);
    }

    result.passes = changes.len();
    result.entries_after = current.len();
    store.replace_partition(kind, current);

    log::debug!(
        "Applied {} {} pass(es): {} -> {} entries",
        result.passes,
        kind,
        result.entries_before,
        result.entries_after
    );
    Ok(result)
}

fn run_pass<C>(
    current: &HashMap<String, Bytes>,
    change: &C,
    workers: &Workers,
) -> HashMap<String, Bytes>
where
    C: EntryChange + ?Sized,
{
    let map = |(key, data): (&String, &Bytes)| {
        change
            .apply(Entry::new(key.clone(), data.clone()))
            .map(|entry| (entry.name, entry.data))
    };

    #[cfg(feature = "parallel")]
    {
        if workers.is_parallel() && current.len() > 1 {
            return workers.install(|| current.par_iter().filter_map(map).collect());
        }
    }
    #[cfg(not(feature = "parallel"))]
    let _ = workers;

    current.iter().filter_map(map).collect()
}
