//! Fuzz target for reading arbitrary bytes as a jar.
//!
//! Exercises central directory parsing, entry decoding and, when a read
//! succeeds, serialization of the resulting store. Looks for panics, hangs
//! and unbounded allocations.
//!
//! Run with: cargo +nightly fuzz run jar_read

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::Cursor;
use std::sync::Arc;

use jarkit::{CollectingSink, CompressionLevel, JarManager, ReadLimits, ReadOptions, find_entry};

fuzz_target!(|data: &[u8]| {
    let options = ReadOptions::new().limits(
        ReadLimits::new()
            .max_entries(1_000)
            .max_entry_size(1 << 20)
            .max_total_size(16 << 20),
    );

    let _ = find_entry(&mut Cursor::new(data), "fuzz.jar", "META-INF/MANIFEST.MF", &options);

    let mut jar = JarManager::new()
        .with_options(options)
        .with_sink(Arc::new(CollectingSink::new()));
    if jar.read(Cursor::new(data), "fuzz.jar").is_ok() {
        if let Some(output) = jar.output() {
            let _ = output.to_bytes(CompressionLevel::Store);
        }
    }
});
