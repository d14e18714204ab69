//! Lazily materialized output containers.

use std::io::Write;
use std::path::Path;

use crate::diagnostics::{self, DiagnosticSink};
use crate::store::Store;
use crate::{Error, Result};

use super::{CompressionLevel, write_snapshot};

/// A named container that can be serialized from a store on demand.
///
/// An output borrows its store and holds no bytes of its own. Every call
/// takes a new snapshot, so an output reflects all changes applied before
/// the call and none that complete after the snapshot was taken.
///
/// Failures are reported once to the sink of the context that created the
/// output and returned as [`Error::Serialization`]. This includes two
/// entries sharing an output key, such as a resource renamed onto a class
/// name: the call fails rather than dropping either payload.
///
/// # Example
///
/// ```rust
/// use jarkit::{CompressionLevel, JarManager};
/// # use jarkit::format::ContainerWriter;
/// # use std::io::Cursor;
/// # let mut writer = ContainerWriter::new(Vec::new());
/// # writer.add_entry("readme.txt", b"hi", CompressionLevel::Store)?;
/// # let jar = writer.finish()?;
///
/// let mut manager = JarManager::new();
/// manager.read(Cursor::new(jar), "app.jar")?;
///
/// let output = manager.output().expect("container was read");
/// assert_eq!(output.name(), "app.jar");
/// let bytes = output.to_bytes(CompressionLevel::Level(0))?;
/// assert!(!bytes.is_empty());
/// # Ok::<(), jarkit::Error>(())
/// ```
#[derive(Clone, Copy)]
pub struct Output<'a> {
    name: &'a str,
    store: &'a Store,
    sink: &'a dyn DiagnosticSink,
}

impl std::fmt::Debug for Output<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Output")
            .field("name", &self.name)
            .field("entries", &self.store.len())
            .finish_non_exhaustive()
    }
}

impl<'a> Output<'a> {
    pub(crate) fn new(name: &'a str, store: &'a Store, sink: &'a dyn DiagnosticSink) -> Self {
        Self { name, store, sink }
    }

    /// Returns the declared file name of the output.
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// Serializes the current store content.
    pub fn to_bytes(&self, level: CompressionLevel) -> Result<Vec<u8>> {
        self.serialize(level).map_err(|e| self.fail(e))
    }

    /// Serializes the current store content into `writer`.
    ///
    /// The container is built in memory first; nothing is written to
    /// `writer` if serialization fails.
    pub fn write_to<W: Write>(&self, mut writer: W, level: CompressionLevel) -> Result<W> {
        let bytes = self.serialize(level).map_err(|e| self.fail(e))?;
        writer
            .write_all(&bytes)
            .and_then(|()| writer.flush())
            .map_err(|e| self.fail(e.into()))?;
        Ok(writer)
    }

    /// Serializes the current store content to a file.
    ///
    /// A partially written file is removed on failure.
    pub fn write_path(&self, path: impl AsRef<Path>, level: CompressionLevel) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.serialize(level).map_err(|e| self.fail(e))?;
        if let Err(e) = std::fs::write(path, &bytes) {
            if path.is_file() {
                let _ = std::fs::remove_file(path);
            }
            return Err(self.fail(e.into()));
        }
        log::debug!(
            "Wrote '{}' ({} bytes) to {}",
            self.name,
            bytes.len(),
            path.display()
        );
        Ok(())
    }

    fn serialize(&self, level: CompressionLevel) -> Result<Vec<u8>> {
        let snapshot = self.store.snapshot();
        write_snapshot(&snapshot, level, Vec::new())
    }

    fn fail(&self, error: Error) -> Error {
        let error = Error::Serialization {
            name: self.name.to_string(),
            reason: error.to_string(),
        };
        diagnostics::report(self.sink, &error, Some(self.name), None);
        error
    }
}
