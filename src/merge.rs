//! Merging several containers into one.
//!
//! Containers are read in the order given into a single collector. When two
//! containers hold the same key, the entry from the earlier container is
//! kept, so callers list containers from highest to lowest priority.

use std::io::{Read, Seek};
use std::path::Path;
use std::sync::Arc;

use crate::change::{ChangeResult, ClassChange, ResourceChange};
use crate::diagnostics::{self, DiagnosticSink};
use crate::manager::JarManager;
use crate::read::{self, EntryCollector, ReadOptions, ReadResult};
use crate::store::{Partition, StoreSnapshot};
use crate::write::Output;
use crate::{Error, Result};

/// Counts from a merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeResult {
    /// Number of containers merged.
    pub containers: usize,
    /// Per-container counts, in merge order.
    pub per_container: Vec<(String, ReadResult)>,
    /// Sum of the per-container counts.
    pub totals: ReadResult,
}

/// A named output assembled from several containers.
///
/// # Example
///
/// ```rust
/// use std::io::Cursor;
/// use jarkit::{CompressionLevel, MergedJar};
/// # use jarkit::format::ContainerWriter;
/// # let jar = |data: &[u8]| -> jarkit::Result<Vec<u8>> {
/// #     let mut writer = ContainerWriter::new(Vec::new());
/// #     writer.add_entry("config.properties", data, CompressionLevel::Store)?;
/// #     writer.finish()
/// # };
/// # let (app, lib) = (jar(b"app")?, jar(b"lib")?);
///
/// let mut merged = MergedJar::new("fat.jar");
/// merged.merge(vec![
///     (Cursor::new(app), "app.jar".to_string()),
///     (Cursor::new(lib), "lib.jar".to_string()),
/// ])?;
///
/// let config = merged.resources()["config.properties"].clone();
/// assert_eq!(&config[..], b"app");
/// # Ok::<(), jarkit::Error>(())
/// ```
#[derive(Debug)]
pub struct MergedJar {
    name: String,
    inner: JarManager,
}

impl MergedJar {
    /// Creates an empty merge whose output is called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: JarManager::new(),
        }
    }

    /// Sets the options used for reading and for change passes.
    pub fn with_options(mut self, options: ReadOptions) -> Self {
        self.inner = self.inner.with_options(options);
        self
    }

    /// Sets the diagnostic sink.
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.inner = self.inner.with_sink(sink);
        self
    }

    /// Returns the output name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Merges the containers at `paths`, highest priority first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotEnoughContainers`] for fewer than two paths,
    /// [`Error::AlreadyPopulated`] if a merge already succeeded, and the
    /// error of the first container that fails as invalid input. Every
    /// error is reported once and leaves the merge empty.
    pub fn merge_paths<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<MergeResult> {
        self.merge_with(paths.len(), |collector, options, sink, result| {
            for (i, path) in paths.iter().enumerate() {
                let path = path.as_ref();
                let name = read::container_name(path);
                let read = read::open_container(path, &name).and_then(|mut source| {
                    read::read_container(&mut source, &name, i, collector, options, sink)
                });
                record(result, name, read)?;
            }
            Ok(())
        })
    }

    /// Merges named seekable sources, highest priority first.
    ///
    /// # Errors
    ///
    /// See [`merge_paths`](Self::merge_paths).
    pub fn merge<R, I>(&mut self, sources: I) -> Result<MergeResult>
    where
        R: Read + Seek,
        I: IntoIterator<Item = (R, String)>,
    {
        let sources: Vec<(R, String)> = sources.into_iter().collect();
        let count = sources.len();
        self.merge_with(count, |collector, options, sink, result| {
            for (i, (mut source, name)) in sources.into_iter().enumerate() {
                let read = read::read_container(&mut source, &name, i, collector, options, sink);
                record(result, name, read)?;
            }
            Ok(())
        })
    }

    fn merge_with<F>(&mut self, count: usize, read_all: F) -> Result<MergeResult>
    where
        F: FnOnce(&EntryCollector, &ReadOptions, &dyn DiagnosticSink, &mut MergeResult) -> Result<()>,
    {
        let sink = Arc::clone(self.inner.sink());
        let outcome = self.check_mergeable(count).and_then(|()| {
            let collector = EntryCollector::new();
            let mut result = MergeResult::default();
            read_all(&collector, self.inner.options(), &*sink, &mut result)?;
            self.inner.populate(&self.name, collector)?;
            Ok(result)
        });

        match outcome {
            Ok(result) => {
                log::debug!(
                    "Merged {} containers into '{}': {} entries, {} duplicates discarded",
                    result.containers,
                    self.name,
                    result.totals.entries_added(),
                    result.totals.duplicates_discarded
                );
                Ok(result)
            }
            Err(error) => {
                let container = match &error {
                    Error::InvalidContainer { name, .. } => name.as_str(),
                    _ => self.name.as_str(),
                };
                diagnostics::report(&*sink, &error, Some(container), None);
                Err(error)
            }
        }
    }

    fn check_mergeable(&self, count: usize) -> Result<()> {
        if let Some(name) = self.inner.name() {
            return Err(Error::AlreadyPopulated {
                name: name.to_string(),
            });
        }
        if count < 2 {
            return Err(Error::NotEnoughContainers { given: count });
        }
        Ok(())
    }

    /// Applies class changes to the merged entries.
    pub fn apply_class_changes(&self, changes: &[&dyn ClassChange]) -> Result<ChangeResult> {
        self.inner.apply_class_changes(changes)
    }

    /// Applies resource changes to the merged entries.
    pub fn apply_resource_changes(&self, changes: &[&dyn ResourceChange]) -> Result<ChangeResult> {
        self.inner.apply_resource_changes(changes)
    }

    /// Returns the merged output, or `None` before a successful merge.
    pub fn output(&self) -> Option<Output<'_>> {
        self.inner.output()
    }

    /// Returns the current class partition.
    pub fn classes(&self) -> Partition {
        self.inner.classes()
    }

    /// Returns the current resource partition.
    pub fn resources(&self) -> Partition {
        self.inner.resources()
    }

    /// Returns a consistent view of both partitions.
    pub fn snapshot(&self) -> StoreSnapshot {
        self.inner.snapshot()
    }

    /// Drops all merged entries.
    pub fn close(&mut self) {
        self.inner.close();
    }
}

fn record(result: &mut MergeResult, name: String, read: Result<ReadResult>) -> Result<()> {
    let read = read.map_err(|e| e.into_invalid_container(&name))?;
    result.containers += 1;
    result.totals += read;
    result.per_container.push((name, read));
    Ok(())
}
