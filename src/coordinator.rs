//! Coordinating many containers at once.
//!
//! A [`MultiJarManager`] reads a list of containers into one
//! [`JarManager`] each, keyed by file name. Changes can be applied to every
//! container or to one container addressed by name, and outputs are handed
//! out in the order the containers were read.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::change::{ChangeResult, ClassChange, ResourceChange};
use crate::diagnostics::{self, DiagnosticSink, LogSink};
use crate::manager::JarManager;
use crate::read::{self, ReadOptions, ReadResult};
use crate::write::Output;
use crate::{Error, Result};

/// Counts from [`MultiJarManager::read_paths`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiReadResult {
    /// Containers read successfully.
    pub containers_read: usize,
    /// Containers rejected as invalid input.
    pub containers_failed: usize,
    /// Per-container counts, in read order.
    pub containers: Vec<(String, ReadResult)>,
}

impl MultiReadResult {
    /// Sum of the per-container counts.
    pub fn totals(&self) -> ReadResult {
        let mut total = ReadResult::default();
        for (_, result) in &self.containers {
            total += *result;
        }
        total
    }
}

/// Named contexts for many containers.
///
/// # Example
///
/// ```rust
/// use jarkit::{CompressionLevel, Entry, MultiJarManager};
/// # use jarkit::format::ContainerWriter;
/// # let dir = tempfile::tempdir()?;
/// # for name in ["a.jar", "b.jar"] {
/// #     let mut writer = ContainerWriter::new(Vec::new());
/// #     writer.add_entry("com/A.class", &[1], CompressionLevel::Store)?;
/// #     std::fs::write(dir.path().join(name), writer.finish()?)?;
/// # }
/// # let paths = [dir.path().join("a.jar"), dir.path().join("b.jar")];
///
/// let mut jars = MultiJarManager::new();
/// jars.read_paths(&paths)?;
///
/// let strip = |entry: Entry| Some(entry.with_data(Vec::new()));
/// jars.apply_targeted_class_changes("b.jar", &[&strip])?;
///
/// let names: Vec<_> = jars.outputs().iter().map(|o| o.name()).collect();
/// assert_eq!(names, ["a.jar", "b.jar"]);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct MultiJarManager {
    contexts: Vec<JarManager>,
    by_name: HashMap<String, usize>,
    populated: bool,
    options: ReadOptions,
    sink: Arc<dyn DiagnosticSink>,
}

impl std::fmt::Debug for MultiJarManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiJarManager")
            .field("contexts", &self.contexts)
            .field("populated", &self.populated)
            .finish_non_exhaustive()
    }
}

impl Default for MultiJarManager {
    fn default() -> Self {
        Self::new()
    }
}

impl MultiJarManager {
    /// Creates an empty coordinator that reports to the `log` facade.
    pub fn new() -> Self {
        Self {
            contexts: Vec::new(),
            by_name: HashMap::new(),
            populated: false,
            options: ReadOptions::default(),
            sink: Arc::new(LogSink),
        }
    }

    /// Sets the options used by every context.
    pub fn with_options(mut self, options: ReadOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the diagnostic sink shared by every context.
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Reads every container in `paths`, in order.
    ///
    /// Containers that fail as invalid input are reported and skipped; the
    /// others are read. A container whose file name was already read is
    /// rejected as invalid input.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyPopulated`] if containers were read before and
    /// [`close`](Self::close) was not called since.
    pub fn read_paths<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<MultiReadResult> {
        if self.populated {
            let error = Error::AlreadyPopulated {
                name: self.names().join(", "),
            };
            diagnostics::report(&*self.sink, &error, None, None);
            return Err(error);
        }
        self.populated = true;

        let mut result = MultiReadResult::default();
        for path in paths {
            let path = path.as_ref();
            let name = read::container_name(path);
            if self.by_name.contains_key(&name) {
                let error = Error::InvalidContainer {
                    name: name.clone(),
                    reason: "a container with this name was already read".into(),
                };
                diagnostics::report(&*self.sink, &error, Some(&name), None);
                result.containers_failed += 1;
                continue;
            }

            let mut context = JarManager::new()
                .with_options(self.options.clone())
                .with_sink(Arc::clone(&self.sink));
            match context.read_path(path) {
                Ok(read) => {
                    self.by_name.insert(name.clone(), self.contexts.len());
                    self.contexts.push(context);
                    result.containers.push((name, read));
                    result.containers_read += 1;
                }
                // Already reported by the context.
                Err(_) => result.containers_failed += 1,
            }
        }

        log::debug!(
            "Read {} of {} containers",
            result.containers_read,
            paths.len()
        );
        Ok(result)
    }

    /// Returns the context names in read order.
    pub fn names(&self) -> Vec<&str> {
        self.contexts.iter().filter_map(|c| c.name()).collect()
    }

    /// Returns the context for `name`.
    pub fn get(&self, name: &str) -> Option<&JarManager> {
        self.by_name.get(name).map(|&i| &self.contexts[i])
    }

    /// Number of contexts.
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    /// Returns true if no container has been read.
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Applies class changes to every context.
    ///
    /// Returns the summed counts. Stops at the first context that fails.
    pub fn apply_class_changes(&self, changes: &[&dyn ClassChange]) -> Result<ChangeResult> {
        self.apply_all(|context| context.apply_class_changes(changes))
    }

    /// Applies resource changes to every context.
    pub fn apply_resource_changes(&self, changes: &[&dyn ResourceChange]) -> Result<ChangeResult> {
        self.apply_all(|context| context.apply_resource_changes(changes))
    }

    /// Applies class changes to the context named `name` only.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContainerNotFound`], after reporting it, if no
    /// container with that name was read. No context is changed.
    pub fn apply_targeted_class_changes(
        &self,
        name: &str,
        changes: &[&dyn ClassChange],
    ) -> Result<ChangeResult> {
        self.lookup(name)?.apply_class_changes(changes)
    }

    /// Applies resource changes to the context named `name` only.
    ///
    /// # Errors
    ///
    /// See [`apply_targeted_class_changes`](Self::apply_targeted_class_changes).
    pub fn apply_targeted_resource_changes(
        &self,
        name: &str,
        changes: &[&dyn ResourceChange],
    ) -> Result<ChangeResult> {
        self.lookup(name)?.apply_resource_changes(changes)
    }

    /// Returns one output per context, in read order.
    pub fn outputs(&self) -> Vec<Output<'_>> {
        self.contexts.iter().filter_map(JarManager::output).collect()
    }

    /// Returns the output of the context named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContainerNotFound`], after reporting it, if no
    /// container with that name was read.
    pub fn targeted_output(&self, name: &str) -> Result<Output<'_>> {
        let context = self.lookup(name)?;
        context.output().ok_or_else(|| self.not_found(name))
    }

    /// Drops every context so the coordinator can read again.
    pub fn close(&mut self) {
        for context in &mut self.contexts {
            context.close();
        }
        self.contexts.clear();
        self.by_name.clear();
        self.populated = false;
    }

    fn apply_all<F>(&self, apply: F) -> Result<ChangeResult>
    where
        F: Fn(&JarManager) -> Result<ChangeResult>,
    {
        let mut total = ChangeResult::default();
        for context in &self.contexts {
            let result = apply(context)?;
            total.passes = total.passes.max(result.passes);
            total.entries_before += result.entries_before;
            total.entries_after += result.entries_after;
        }
        Ok(total)
    }

    fn lookup(&self, name: &str) -> Result<&JarManager> {
        self.get(name).ok_or_else(|| self.not_found(name))
    }

    fn not_found(&self, name: &str) -> Error {
        let error = Error::ContainerNotFound {
            name: name.to_string(),
        };
        diagnostics::report(&*self.sink, &error, Some(name), None);
        error
    }
}
