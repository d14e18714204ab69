//! Error types for jar store operations.
//!
//! This module provides the [`Error`] enum, which represents every failure
//! the crate can produce, the [`FailureKind`] taxonomy used to decide how a
//! failure is recovered, and a convenient [`Result<T>`] type alias.
//!
//! # Recovery Policy
//!
//! | Kind | Typical variants | Effect |
//! |------|------------------|--------|
//! | [`FailureKind::InvalidInput`] | [`InvalidContainer`][Error::InvalidContainer], [`AlreadyPopulated`][Error::AlreadyPopulated] | The read of that container is aborted, the store stays empty |
//! | [`FailureKind::EntryIo`] | [`EntryRead`][Error::EntryRead], [`CrcMismatch`][Error::CrcMismatch] | The entry is dropped, the read continues |
//! | [`FailureKind::Serialization`] | [`Serialization`][Error::Serialization], [`DuplicateEntry`][Error::DuplicateEntry] | The output call fails, nothing is returned |
//! | [`FailureKind::Addressing`] | [`ContainerNotFound`][Error::ContainerNotFound] | The targeted call has no effect |
//!
//! Every failure is reported exactly once to the
//! [`DiagnosticSink`](crate::diagnostics::DiagnosticSink) of the operation that
//! produced it. Entry failures are only reported; all other failures are also
//! returned to the caller.
//!
//! ```rust
//! use jarkit::{Error, FailureKind, JarManager};
//!
//! let mut manager = JarManager::new();
//! match manager.read_path("does-not-exist.jar") {
//!     Err(e) => assert_eq!(e.kind(), FailureKind::InvalidInput),
//!     Ok(_) => unreachable!(),
//! }
//! ```

use std::io;

/// Classification of failures by recovery policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The container could not be opened or is not a valid archive.
    InvalidInput,
    /// A single entry could not be read or decompressed.
    EntryIo,
    /// Writing an output container failed.
    Serialization,
    /// A targeted operation named an unknown container.
    Addressing,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput => write!(f, "invalid input"),
            Self::EntryIo => write!(f, "entry I/O failure"),
            Self::Serialization => write!(f, "serialization failure"),
            Self::Addressing => write!(f, "addressing failure"),
        }
    }
}

/// The main error type for jar store operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error occurred outside of any specific entry.
    ///
    /// This wraps [`std::io::Error`]. It is also used when a worker pool
    /// for parallel processing cannot be created.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The container is not a readable archive.
    ///
    /// Returned when the path is a directory, cannot be opened, lacks an end
    /// of central directory record, or has a malformed central directory.
    #[error("Invalid container '{name}': {reason}")]
    InvalidContainer {
        /// Name of the container.
        name: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The container uses a format feature this crate does not implement.
    ///
    /// Zip64 extensions, encryption and multi-disk archives are not
    /// supported.
    #[error("Unsupported feature: {feature}")]
    UnsupportedFeature {
        /// The name of the unsupported feature.
        feature: &'static str,
    },

    /// An entry is compressed with a method other than stored or deflate.
    #[error("Unsupported compression method {method} for entry '{entry}'")]
    UnsupportedMethod {
        /// The entry key.
        entry: String,
        /// The zip method identifier.
        method: u16,
    },

    /// The CRC-32 of a decompressed entry does not match the directory.
    #[error("CRC mismatch for entry '{entry}': expected {expected:#010x}, got {actual:#010x}")]
    CrcMismatch {
        /// The entry key.
        entry: String,
        /// The CRC recorded in the central directory.
        expected: u32,
        /// The CRC of the decompressed data.
        actual: u32,
    },

    /// An entry's data could not be read or decompressed.
    #[error("Failed to read entry '{entry}' in '{container}': {reason}")]
    EntryRead {
        /// Name of the container.
        container: String,
        /// The entry key.
        entry: String,
        /// A description of the failure.
        reason: String,
    },

    /// A configured resource limit was exceeded.
    #[error("Resource limit exceeded: {0}")]
    ResourceLimitExceeded(String),

    /// A compression level outside `0..=9` was requested.
    #[error("Invalid compression level {0}, expected 0-9")]
    InvalidCompressionLevel(i64),

    /// Writing an output container failed.
    #[error("Failed to write output '{name}': {reason}")]
    Serialization {
        /// Name of the output.
        name: String,
        /// A description of the failure.
        reason: String,
    },

    /// A targeted operation named a container that was never read.
    #[error("No container named '{name}'")]
    ContainerNotFound {
        /// The requested container name.
        name: String,
    },

    /// A store or coordinator was populated twice without being closed.
    #[error("'{name}' has already been read; close it before reading again")]
    AlreadyPopulated {
        /// Name of the container already held.
        name: String,
    },

    /// A merge was requested with fewer than two containers.
    #[error("Merging needs at least two containers, got {given}")]
    NotEnoughContainers {
        /// Number of containers passed.
        given: usize,
    },

    /// Two entries would be written under the same name.
    ///
    /// Raised by the writer when a class key without the `.class` suffix
    /// normalizes onto another class key, or when a resource carries the
    /// name of a class entry.
    #[error("Duplicate entry '{name}' in output")]
    DuplicateEntry {
        /// The output key written twice.
        name: String,
    },
}

impl Error {
    /// Returns the recovery class of this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Io(_)
            | Self::InvalidContainer { .. }
            | Self::UnsupportedFeature { .. }
            | Self::ResourceLimitExceeded(_)
            | Self::InvalidCompressionLevel(_)
            | Self::AlreadyPopulated { .. }
            | Self::NotEnoughContainers { .. } => FailureKind::InvalidInput,
            Self::UnsupportedMethod { .. } | Self::CrcMismatch { .. } | Self::EntryRead { .. } => {
                FailureKind::EntryIo
            }
            Self::Serialization { .. } | Self::DuplicateEntry { .. } => FailureKind::Serialization,
            Self::ContainerNotFound { .. } => FailureKind::Addressing,
        }
    }

    /// Wraps this error as an invalid container error for `name`.
    ///
    /// Errors that already describe a container are returned unchanged.
    pub(crate) fn into_invalid_container(self, name: &str) -> Self {
        match self {
            e @ (Self::InvalidContainer { .. } | Self::AlreadyPopulated { .. }) => e,
            e => Self::InvalidContainer {
                name: name.to_string(),
                reason: e.to_string(),
            },
        }
    }

    /// Wraps this error as an entry read error.
    pub(crate) fn into_entry_read(self, container: &str, entry: &str) -> Self {
        match self {
            Self::EntryRead {
                container: found,
                entry: key,
                reason,
            } if found.is_empty() => Self::EntryRead {
                container: container.to_string(),
                entry: key,
                reason,
            },
            e @ (Self::EntryRead { .. } | Self::CrcMismatch { .. } | Self::UnsupportedMethod { .. }) => e,
            e => Self::EntryRead {
                container: container.to_string(),
                entry: entry.to_string(),
                reason: e.to_string(),
            },
        }
    }
}

/// A specialized Result type for jar store operations.
pub type Result<T> = std::result::Result<T, Error>;
