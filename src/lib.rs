//! # jarkit
//!
//! An in-memory store for the content of jar files, with ordered change
//! pipelines, merging and search.
//!
//! A jar is read once into two partitions: **classes** (keys ending in
//! `.class`) and **resources** (everything else). Directory records are
//! skipped. Callers then run change pipelines over either partition and
//! serialize the result back into a jar as often as they like.
//!
//! ## Quick Start
//!
//! ### Reading, Changing and Writing a Jar
//!
//! ```rust,no_run
//! use jarkit::{CompressionLevel, Entry, JarManager, Result};
//!
//! fn main() -> Result<()> {
//!     let mut jar = JarManager::new();
//!     jar.read_path("app.jar")?;
//!
//!     // Move every class to a new package
//!     let relocate = |entry: Entry| {
//!         let name = entry.name.replace("com/acme/", "shaded/acme/");
//!         Some(entry.renamed(name))
//!     };
//!     jar.apply_class_changes(&[&relocate])?;
//!
//!     // Drop signature files
//!     let unsign = |entry: Entry| (!entry.name.starts_with("META-INF/")).then_some(entry);
//!     jar.apply_resource_changes(&[&unsign])?;
//!
//!     if let Some(output) = jar.output() {
//!         output.write_path("app-shaded.jar", CompressionLevel::Default)?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ### Merging Jars
//!
//! ```rust,no_run
//! use jarkit::{CompressionLevel, MergedJar, Result};
//!
//! fn main() -> Result<()> {
//!     // Earlier containers win on duplicate keys
//!     let mut fat = MergedJar::new("fat.jar");
//!     let result = fat.merge_paths(&["app.jar", "lib-a.jar", "lib-b.jar"])?;
//!     println!("{} duplicates discarded", result.totals.duplicates_discarded);
//!
//!     if let Some(output) = fat.output() {
//!         output.write_path("fat.jar", CompressionLevel::Default)?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ### Several Jars at Once
//!
//! [`MultiJarManager`] keeps one [`JarManager`] per container, addressed by
//! file name. Changes can target every container or a single one.
//!
//! ## Concurrency
//!
//! Reads decode entries in parallel and changes run each pass in parallel
//! when the `parallel` feature is enabled. A context can be shared between
//! threads after it is read: outputs taken while a change runs see the
//! store from before or after that change, never a mix.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `parallel` | Yes | Multi-threaded reads and change passes with Rayon |
//! | `cli` | No | Command-line interface tool |
//!
//! ## Error Handling
//!
//! All operations return [`Result<T>`]. Every failure is also reported once
//! to the [`DiagnosticSink`] of the context that produced it, which by
//! default forwards to the `log` facade. Failures of single entries are
//! only reported; the read continues without them.
//!
//! ```rust
//! use jarkit::{Error, MultiJarManager};
//!
//! let jars = MultiJarManager::new();
//! match jars.targeted_output("missing.jar") {
//!     Err(Error::ContainerNotFound { name }) => assert_eq!(name, "missing.jar"),
//!     _ => unreachable!(),
//! }
//! ```
//!
//! ## Format Support
//!
//! Jars are zip archives. Stored and deflated entries are supported. Zip64,
//! encryption and multi-disk archives are rejected. Written jars contain
//! classes first, then resources, each sorted by key, with fixed timestamps,
//! so the same store content always serializes to the same bytes.
//!
//! ## Minimum Supported Rust Version (MSRV)
//!
//! This crate requires **Rust 1.85** or later.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod change;
pub mod coordinator;
pub mod diagnostics;
pub mod entry;
pub mod error;
pub mod format;
pub mod manager;
pub mod merge;
pub mod read;
pub mod search;
pub mod store;
pub mod write;

pub use change::{ChangeResult, ClassChange, ResourceChange};
pub use coordinator::{MultiJarManager, MultiReadResult};
pub use diagnostics::{CollectingSink, Diagnostic, DiagnosticSink, LogSink};
pub use entry::{Entry, EntryKind};
pub use error::{Error, FailureKind, Result};
pub use manager::JarManager;
pub use merge::{MergeResult, MergedJar};
pub use read::{ReadLimits, ReadOptions, ReadResult, Threads};
pub use search::{SearchHit, find_entry, find_entry_in_path, find_entry_in_paths};
pub use store::{Partition, Store, StoreSnapshot};
pub use write::{CompressionLevel, Output, WriteResult};
