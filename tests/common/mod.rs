//! Shared test utilities for integration tests.
//!
//! Note: `#![allow(dead_code)]` is required because each integration test file
//! compiles as a separate crate and may only use a subset of these helpers.

#![allow(dead_code)]

use std::io::Cursor;
use std::path::{Path, PathBuf};

use jarkit::format::{ContainerIndex, ContainerWriter, RawEntry};
use jarkit::{CompressionLevel, JarManager};

/// Creates an in-memory jar with the given entries, in order.
pub fn create_jar(entries: &[(&str, &[u8])]) -> Vec<u8> {
    create_jar_with_level(CompressionLevel::Default, entries)
}

/// Creates an in-memory jar compressed at `level`.
pub fn create_jar_with_level(level: CompressionLevel, entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ContainerWriter::new(Vec::new());
    for (name, data) in entries {
        if name.ends_with('/') {
            writer.add_directory(name).expect("add directory");
        } else {
            writer.add_entry(name, data, level).expect("add entry");
        }
    }
    writer.finish().expect("finish jar")
}

/// Writes a jar named `name` into `dir` and returns its path.
pub fn write_jar(dir: &Path, name: &str, entries: &[(&str, &[u8])]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, create_jar(entries)).expect("write jar");
    path
}

/// Reads a jar into a fresh context.
pub fn load(bytes: Vec<u8>, name: &str) -> JarManager {
    let mut jar = JarManager::new();
    jar.read(Cursor::new(bytes), name).expect("read jar");
    jar
}

/// Decodes every entry of a jar, in directory order.
pub fn entries_in_order(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut source = Cursor::new(bytes);
    let index = ContainerIndex::read(&mut source, "test.jar").expect("read index");
    index
        .entries()
        .iter()
        .enumerate()
        .map(|(i, header)| {
            let raw = RawEntry::read(&mut source, i, header, u64::MAX).expect("read entry");
            (header.name.clone(), raw.decode(true).expect("decode entry"))
        })
        .collect()
}

/// Returns the entry names of a jar, in directory order.
pub fn names_in_order(bytes: &[u8]) -> Vec<String> {
    entries_in_order(bytes).into_iter().map(|(name, _)| name).collect()
}
