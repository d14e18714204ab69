//! Single-container contexts.
//!
//! A [`JarManager`] reads one container into a [`Store`], applies class and
//! resource change pipelines to it, and hands out an [`Output`] that
//! serializes the current content.
//!
//! # Example
//!
//! ```rust
//! use std::io::Cursor;
//! use jarkit::format::ContainerWriter;
//! use jarkit::{CompressionLevel, Entry, JarManager};
//!
//! let mut writer = ContainerWriter::new(Vec::new());
//! writer.add_entry("com/A.class", &[1, 2, 3], CompressionLevel::Default)?;
//! writer.add_entry("readme.txt", &[9, 9], CompressionLevel::Default)?;
//! let jar = writer.finish()?;
//!
//! let mut manager = JarManager::new();
//! manager.read(Cursor::new(jar), "X.jar")?;
//!
//! let rename = |entry: Entry| {
//!     let name = entry.name.replace("com/A", "com/B");
//!     Some(entry.renamed(name))
//! };
//! manager.apply_class_changes(&[&rename])?;
//!
//! let drop_readme = |entry: Entry| (entry.name != "readme.txt").then_some(entry);
//! manager.apply_resource_changes(&[&drop_readme])?;
//!
//! let output = manager.output().expect("container was read");
//! let bytes = output.to_bytes(CompressionLevel::Level(0))?;
//! # let _ = bytes;
//! assert!(manager.classes().contains_key("com/B.class"));
//! assert!(manager.resources().is_empty());
//! # Ok::<(), jarkit::Error>(())
//! ```

use std::io::{Read, Seek};
use std::path::Path;
use std::sync::Arc;

use crate::change::{self, ChangeResult, ClassChange, ResourceChange};
use crate::diagnostics::{self, DiagnosticSink, LogSink};
use crate::entry::EntryKind;
use crate::read::{self, EntryCollector, ReadOptions, ReadResult};
use crate::store::{Partition, Store, StoreSnapshot};
use crate::write::Output;
use crate::{Error, Result};

/// One named container and its entry store.
///
/// Reading requires `&mut self` and is allowed once per context until
/// [`close`](Self::close) is called. Changes and outputs take `&self`, so a
/// context can be shared between threads once it is read: an output
/// materialized while a change call runs sees the store from before or
/// after that call.
pub struct JarManager {
    name: Option<String>,
    store: Store,
    options: ReadOptions,
    sink: Arc<dyn DiagnosticSink>,
}

impl std::fmt::Debug for JarManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JarManager")
            .field("name", &self.name)
            .field("store", &self.store)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Default for JarManager {
    fn default() -> Self {
        Self::new()
    }
}

impl JarManager {
    /// Creates an empty context that reports to the `log` facade.
    pub fn new() -> Self {
        Self {
            name: None,
            store: Store::new(),
            options: ReadOptions::default(),
            sink: Arc::new(LogSink),
        }
    }

    /// Sets the options used for reading and for change passes.
    pub fn with_options(mut self, options: ReadOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the diagnostic sink.
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Returns the read options.
    pub fn options(&self) -> &ReadOptions {
        &self.options
    }

    /// Returns the container name, once read.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns true once a container has been read.
    pub fn is_populated(&self) -> bool {
        self.name.is_some()
    }

    /// Reads the container at `path`.
    ///
    /// The context is named after the file name of `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyPopulated`] if a container was read before,
    /// and [`Error::InvalidContainer`] if `path` is a directory, cannot be
    /// opened, or is not a readable container. The error is reported to the
    /// sink before it is returned and the store stays empty.
    pub fn read_path(&mut self, path: impl AsRef<Path>) -> Result<ReadResult> {
        let path = path.as_ref();
        let name = read::container_name(path);
        self.read_with(&name, |collector, options, sink| {
            let mut source = read::open_container(path, &name)?;
            read::read_container(&mut source, &name, 0, collector, options, sink)
        })
    }

    /// Reads a container from any seekable source.
    ///
    /// # Errors
    ///
    /// See [`read_path`](Self::read_path).
    pub fn read<R: Read + Seek>(&mut self, mut source: R, name: &str) -> Result<ReadResult> {
        self.read_with(name, |collector, options, sink| {
            read::read_container(&mut source, name, 0, collector, options, sink)
        })
    }

    fn read_with<F>(&mut self, name: &str, read_fn: F) -> Result<ReadResult>
    where
        F: FnOnce(&EntryCollector, &ReadOptions, &dyn DiagnosticSink) -> Result<ReadResult>,
    {
        let result = self.check_unpopulated().and_then(|()| {
            let collector = EntryCollector::new();
            let result = read_fn(&collector, &self.options, &*self.sink)?;
            self.populate(name, collector)?;
            Ok(result)
        });
        result.map_err(|e| {
            let error = e.into_invalid_container(name);
            diagnostics::report(&*self.sink, &error, Some(name), None);
            error
        })
    }

    fn check_unpopulated(&self) -> Result<()> {
        match &self.name {
            Some(existing) => Err(Error::AlreadyPopulated {
                name: existing.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Moves collected entries into the store and names the context.
    pub(crate) fn populate(&mut self, name: &str, collector: EntryCollector) -> Result<()> {
        self.check_unpopulated()?;
        let (classes, resources) = collector.into_partitions();
        self.store.populate(name, classes, resources)?;
        self.name = Some(name.to_string());
        Ok(())
    }

    /// Applies class changes in order.
    ///
    /// An empty list or an empty class partition leaves the store unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the worker pool cannot be built; the store
    /// is unchanged and the error is reported.
    pub fn apply_class_changes(&self, changes: &[&dyn ClassChange]) -> Result<ChangeResult> {
        change::apply_changes(&self.store, EntryKind::Class, changes, self.options.threads)
            .map_err(|e| self.report(e))
    }

    /// Applies resource changes in order.
    ///
    /// # Errors
    ///
    /// See [`apply_class_changes`](Self::apply_class_changes).
    pub fn apply_resource_changes(&self, changes: &[&dyn ResourceChange]) -> Result<ChangeResult> {
        change::apply_changes(&self.store, EntryKind::Resource, changes, self.options.threads)
            .map_err(|e| self.report(e))
    }

    /// Returns the output of this context, or `None` before a read.
    pub fn output(&self) -> Option<Output<'_>> {
        self.name
            .as_deref()
            .map(|name| Output::new(name, &self.store, &*self.sink))
    }

    /// Returns the current class partition.
    pub fn classes(&self) -> Partition {
        self.store.partition(EntryKind::Class)
    }

    /// Returns the current resource partition.
    pub fn resources(&self) -> Partition {
        self.store.partition(EntryKind::Resource)
    }

    /// Returns a consistent view of both partitions.
    pub fn snapshot(&self) -> StoreSnapshot {
        self.store.snapshot()
    }

    /// Returns the store.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Drops all entries so the context can read again.
    pub fn close(&mut self) {
        if let Some(name) = self.name.take() {
            log::debug!("Closing '{}'", name);
        }
        self.store.clear();
    }

    pub(crate) fn sink(&self) -> &Arc<dyn DiagnosticSink> {
        &self.sink
    }

    fn report(&self, error: Error) -> Error {
        diagnostics::report(&*self.sink, &error, self.name.as_deref(), None);
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingSink;
    use crate::entry::Entry;
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

    fn manager() -> (JarManager, Arc<CollectingSink>) {
        let sink = Arc::new(CollectingSink::new());
        (JarManager::new().with_sink(sink.clone()), sink)
    }

    #[test]
    fn test_read_and_output() {
        let (mut manager, sink) = manager();
        assert!(manager.output().is_none());

        let result = manager
            .read(Cursor::new(jar(&[("a/A.class", b"A"), ("r.txt", b"R")])), "x.jar")
            .unwrap();
        assert_eq!(result.entries_added(), 2);
        assert_eq!(manager.name(), Some("x.jar"));
        assert_eq!(manager.output().unwrap().name(), "x.jar");
        assert!(sink.is_empty());
    }

    #[test]
    fn test_second_read_rejected() {
        let (mut manager, sink) = manager();
        manager.read(Cursor::new(jar(&[("a", b"1")])), "one.jar").unwrap();

        let err = manager
            .read(Cursor::new(jar(&[("b", b"2")])), "two.jar")
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyPopulated { ref name } if name == "one.jar"));
        assert_eq!(sink.len(), 1);
        assert!(manager.resources().contains_key("a"));
        assert!(!manager.resources().contains_key("b"));

        manager.close();
        assert!(manager.output().is_none());
        manager.read(Cursor::new(jar(&[("b", b"2")])), "two.jar").unwrap();
        assert!(manager.resources().contains_key("b"));
    }

    #[test]
    fn test_invalid_input_reported_once() {
        let (mut manager, sink) = manager();
        let err = manager
            .read(Cursor::new(b"not a jar".to_vec()), "bad.jar")
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::InvalidInput);
        assert_eq!(sink.count(FailureKind::InvalidInput), 1);
        assert_eq!(sink.len(), 1);
        assert!(!manager.is_populated());
        assert!(manager.store().is_empty());
    }

    #[test]
    fn test_read_path_directory() {
        let (mut manager, sink) = manager();
        let dir = tempfile::tempdir().unwrap();
        let err = manager.read_path(dir.path()).unwrap_err();
        assert!(matches!(err, Error::InvalidContainer { .. }));
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_changes() {
        let (mut manager, _) = manager();
        manager
            .read(Cursor::new(jar(&[("A.class", b"a"), ("r.txt", b"r")])), "x.jar")
            .unwrap();

        let to_b = |e: Entry| Some(e.renamed("B.class"));
        let result = manager.apply_class_changes(&[&to_b]).unwrap();
        assert_eq!(result.passes, 1);
        assert!(manager.classes().contains_key("B.class"));

        let result = manager.apply_resource_changes(&[]).unwrap();
        assert_eq!(result.passes, 0);
        assert!(manager.resources().contains_key("r.txt"));
    }
}
