//! Entries and entry classification.
//!
//! A jar holds two kinds of entries: class files, whose keys end with
//! [`CLASS_SUFFIX`], and everything else, which is treated as an opaque
//! resource. The kind is decided once from the key when a container is read.

use std::borrow::Cow;

use bytes::Bytes;

/// Key suffix that marks an entry as a class file.
pub const CLASS_SUFFIX: &str = ".class";

/// Partition an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// A compiled class file.
    Class,
    /// Any other file.
    Resource,
}

impl EntryKind {
    /// Classifies a key.
    ///
    /// # Example
    ///
    /// ```rust
    /// use jarkit::EntryKind;
    ///
    /// assert_eq!(EntryKind::classify("com/A.class"), EntryKind::Class);
    /// assert_eq!(EntryKind::classify("META-INF/MANIFEST.MF"), EntryKind::Resource);
    /// ```
    pub fn classify(key: &str) -> Self {
        if key.ends_with(CLASS_SUFFIX) {
            Self::Class
        } else {
            Self::Resource
        }
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Class => write!(f, "class"),
            Self::Resource => write!(f, "resource"),
        }
    }
}

/// Returns true if the key names a directory.
pub fn is_directory_key(key: &str) -> bool {
    key.ends_with('/')
}

/// Returns the key a class entry is written under.
///
/// Changes may rename class entries freely; keys missing the class suffix
/// get it appended on output.
pub fn normalize_class_key(key: &str) -> Cow<'_, str> {
    if key.ends_with(CLASS_SUFFIX) {
        Cow::Borrowed(key)
    } else {
        Cow::Owned(format!("{key}{CLASS_SUFFIX}"))
    }
}

/// A named payload.
///
/// This is the unit handed to and returned from changes. The payload is
/// reference counted, so passing an entry through unchanged does not copy
/// its bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Entry {
    /// Path-like key of the entry.
    pub name: String,
    /// Entry contents.
    pub data: Bytes,
}

impl Entry {
    /// Creates an entry.
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    /// Returns the kind derived from the entry's key.
    pub fn kind(&self) -> EntryKind {
        EntryKind::classify(&self.name)
    }

    /// Returns this entry with a new name and the same data.
    pub fn renamed(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: self.data,
        }
    }

    /// Returns this entry with new data and the same name.
    pub fn with_data(self, data: impl Into<Bytes>) -> Self {
        Self {
            name: self.name,
            data: data.into(),
        }
    }

    /// Returns the payload size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
