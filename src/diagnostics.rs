//! Diagnostic reporting for recoverable and fatal failures.
//!
//! Every failure described by [`FailureKind`] is reported exactly once to a
//! [`DiagnosticSink`]. The default sink, [`LogSink`], forwards diagnostics to
//! the `log` facade; [`CollectingSink`] keeps them in memory, and any closure
//! taking a `&Diagnostic` can be used directly via [`sink_fn`].
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use jarkit::diagnostics::CollectingSink;
//! use jarkit::JarManager;
//!
//! let sink = Arc::new(CollectingSink::new());
//! let mut manager = JarManager::new().with_sink(sink.clone());
//! let _ = manager.read_path("missing.jar");
//! assert_eq!(sink.len(), 1);
//! ```

use parking_lot::Mutex;

use crate::error::{Error, FailureKind};

/// One reported failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Recovery class of the failure.
    pub kind: FailureKind,
    /// The container involved, if known.
    pub container: Option<String>,
    /// The entry involved, for entry-level failures.
    pub entry: Option<String>,
    /// Human-readable description.
    pub message: String,
}

impl Diagnostic {
    /// Builds a diagnostic from an error.
    pub fn from_error(error: &Error, container: Option<&str>, entry: Option<&str>) -> Self {
        Self {
            kind: error.kind(),
            container: container.map(str::to_string),
            entry: entry.map(str::to_string),
            message: error.to_string(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.kind)?;
        if let Some(container) = &self.container {
            write!(f, " {}", container)?;
            if let Some(entry) = &self.entry {
                write!(f, "!{}", entry)?;
            }
        }
        write!(f, ": {}", self.message)
    }
}

/// Receiver for failure reports.
///
/// Sinks are shared between worker threads during parallel reads, so
/// implementations must be `Send + Sync`.
pub trait DiagnosticSink: Send + Sync {
    /// Called once per failure.
    fn report(&self, diagnostic: &Diagnostic);
}

/// Reports `error` to `sink`.
pub(crate) fn report(
    sink: &dyn DiagnosticSink,
    error: &Error,
    container: Option<&str>,
    entry: Option<&str>,
) {
    sink.report(&Diagnostic::from_error(error, container, entry));
}

/// A sink that forwards diagnostics to the `log` facade.
///
/// Entry failures are logged as warnings, everything else as errors.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn report(&self, diagnostic: &Diagnostic) {
        match diagnostic.kind {
            FailureKind::EntryIo => log::warn!("{}", diagnostic),
            _ => log::error!("{}", diagnostic),
        }
    }
}

/// A sink that keeps every diagnostic in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the collected diagnostics in report order.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.lock().clone()
    }

    /// Returns the number of collected diagnostics.
    pub fn len(&self) -> usize {
        self.diagnostics.lock().len()
    }

    /// Returns true if nothing has been reported.
    pub fn is_empty(&self) -> bool {
        self.diagnostics.lock().is_empty()
    }

    /// Returns the number of diagnostics of the given kind.
    pub fn count(&self, kind: FailureKind) -> usize {
        self.diagnostics
            .lock()
            .iter()
            .filter(|d| d.kind == kind)
            .count()
    }

    /// Removes all collected diagnostics.
    pub fn clear(&self) {
        self.diagnostics.lock().clear();
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&self, diagnostic: &Diagnostic) {
        self.diagnostics.lock().push(diagnostic.clone());
    }
}

/// A sink backed by a closure.
pub struct ClosureSink<F> {
    callback: F,
}

impl<F> std::fmt::Debug for ClosureSink<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClosureSink").finish_non_exhaustive()
    }
}

impl<F> DiagnosticSink for ClosureSink<F>
where
    F: Fn(&Diagnostic) + Send + Sync,
{
    fn report(&self, diagnostic: &Diagnostic) {
        (self.callback)(diagnostic)
    }
}

/// Creates a closure-based diagnostic sink.
pub fn sink_fn<F>(f: F) -> ClosureSink<F>
where
    F: Fn(&Diagnostic) + Send + Sync,
{
    ClosureSink { callback: f }
}
