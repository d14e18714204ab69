//! End-to-end tests for single-jar contexts.
//!
//! These tests read jars built in memory, run change pipelines and verify
//! the serialized output entry by entry.

mod common;

use std::io::Cursor;
use std::sync::Arc;

use jarkit::{
    ClassChange, CollectingSink, CompressionLevel, Entry, EntryKind, FailureKind, JarManager,
    ReadOptions, ResourceChange, Threads,
};

fn x_jar() -> Vec<u8> {
    common::create_jar(&[("com/A.class", &[1, 2, 3]), ("readme.txt", &[9, 9])])
}

// =============================================================================
// Reading
// =============================================================================

#[test]
fn test_duplicate_keys_keep_first_occurrence() {
    let jar = common::create_jar(&[
        ("com/A.class", b"first"),
        ("a.txt", b"one"),
        ("com/A.class", b"second"),
        ("a.txt", b"two"),
        ("com/A.class", b"third"),
    ]);

    for threads in [Threads::Single, Threads::count_or_single(8)] {
        let mut manager = JarManager::new().with_options(ReadOptions::new().threads(threads));
        let result = manager.read(Cursor::new(jar.clone()), "dup.jar").unwrap();

        assert_eq!(result.entries_read, 5);
        assert_eq!(result.duplicates_discarded, 3);
        assert_eq!(&manager.classes()["com/A.class"][..], b"first");
        assert_eq!(&manager.resources()["a.txt"][..], b"one");
    }
}

#[test]
fn test_directories_skipped_and_partitions_split() {
    let jar = common::create_jar(&[
        ("META-INF/", b""),
        ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\n"),
        ("com/", b""),
        ("com/acme/Main.class", &[0xCA, 0xFE, 0xBA, 0xBE]),
        ("com/acme/Main.class.txt", b"notes"),
    ]);
    let manager = common::load(jar, "app.jar");

    let classes = manager.classes();
    let resources = manager.resources();
    assert_eq!(classes.len(), 1);
    assert!(classes.contains_key("com/acme/Main.class"));
    assert_eq!(resources.len(), 2);
    assert!(resources.contains_key("META-INF/MANIFEST.MF"));
    assert!(resources.contains_key("com/acme/Main.class.txt"));
}

#[test]
fn test_corrupt_entry_is_skipped_and_reported() {
    let mut jar = common::create_jar_with_level(
        CompressionLevel::Store,
        &[("good.txt", b"fine"), ("bad.txt", b"damaged!")],
    );
    // Flip a byte of the second entry's stored data so its CRC no longer matches.
    let pos = jar.windows(8).position(|w| w == b"damaged!").unwrap();
    jar[pos] ^= 0xFF;

    let sink = Arc::new(CollectingSink::new());
    let mut manager = JarManager::new().with_sink(sink.clone());
    let result = manager.read(Cursor::new(jar), "partly.jar").unwrap();

    assert_eq!(result.entries_failed, 1);
    assert!(!result.is_success());
    assert_eq!(manager.resources().len(), 1);
    assert!(manager.resources().contains_key("good.txt"));

    let reports = sink.diagnostics();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].kind, FailureKind::EntryIo);
    assert_eq!(reports[0].entry.as_deref(), Some("bad.txt"));
    assert_eq!(reports[0].container.as_deref(), Some("partly.jar"));
}

// =============================================================================
// Change Pipelines
// =============================================================================

#[test]
fn test_rename_and_write_at_level_zero() {
    let mut manager = JarManager::new();
    manager.read(Cursor::new(x_jar()), "X.jar").unwrap();

    let rename = |entry: Entry| {
        if entry.name == "com/A.class" {
            Some(entry.renamed("com/B.class"))
        } else {
            Some(entry)
        }
    };
    manager.apply_class_changes(&[&rename]).unwrap();

    let bytes = manager
        .output()
        .unwrap()
        .to_bytes(CompressionLevel::Level(0))
        .unwrap();
    assert_eq!(
        common::entries_in_order(&bytes),
        vec![
            ("com/B.class".to_string(), vec![1, 2, 3]),
            ("readme.txt".to_string(), vec![9, 9]),
        ]
    );
}

#[test]
fn test_delete_resource() {
    let manager = common::load(x_jar(), "X.jar");

    let drop_readme = |entry: Entry| (entry.name != "readme.txt").then_some(entry);
    let result = manager.apply_resource_changes(&[&drop_readme]).unwrap();
    assert_eq!(result.entries_before, 1);
    assert_eq!(result.entries_after, 0);

    let bytes = manager
        .output()
        .unwrap()
        .to_bytes(CompressionLevel::Default)
        .unwrap();
    assert_eq!(
        common::entries_in_order(&bytes),
        vec![("com/A.class".to_string(), vec![1, 2, 3])]
    );
}

#[test]
fn test_passes_in_one_call_match_separate_calls() {
    let jar = common::create_jar(&[
        ("a/One.class", b"1"),
        ("a/Two.class", b"2"),
        ("b/Three.class", b"3"),
    ]);
    let move_a = |e: Entry| {
        let name = e.name.replacen("a/", "b/", 1);
        Some(e.renamed(name))
    };
    let drop_three = |e: Entry| (!e.name.ends_with("Three.class")).then_some(e);
    let tag = |e: Entry| {
        let mut data = e.data.to_vec();
        data.push(b'!');
        Some(e.with_data(data))
    };

    let combined = common::load(jar.clone(), "c.jar");
    combined
        .apply_class_changes(&[&move_a, &drop_three, &tag])
        .unwrap();

    let stepwise = common::load(jar, "c.jar");
    stepwise.apply_class_changes(&[&move_a]).unwrap();
    stepwise.apply_class_changes(&[&drop_three]).unwrap();
    stepwise.apply_class_changes(&[&tag]).unwrap();

    assert_eq!(combined.snapshot(), stepwise.snapshot());
    let classes = combined.classes();
    assert_eq!(classes.len(), 2);
    assert_eq!(&classes["b/One.class"][..], b"1!");
    assert_eq!(&classes["b/Two.class"][..], b"2!");
}

#[test]
fn test_renamed_class_keeps_its_partition_and_regains_suffix() {
    let manager = common::load(x_jar(), "X.jar");
    let strip = |e: Entry| {
        let name = e.name.trim_end_matches(".class").to_string();
        Some(e.renamed(name))
    };
    manager.apply_class_changes(&[&strip]).unwrap();
    assert!(manager.classes().contains_key("com/A"));

    let bytes = manager
        .output()
        .unwrap()
        .to_bytes(CompressionLevel::Store)
        .unwrap();
    assert_eq!(common::names_in_order(&bytes), ["com/A.class", "readme.txt"]);
}

#[test]
fn test_resource_renamed_onto_class_fails_output() {
    let sink = Arc::new(CollectingSink::new());
    let mut manager = JarManager::new().with_sink(sink.clone());
    manager.read(Cursor::new(x_jar()), "X.jar").unwrap();

    let shadow = |e: Entry| Some(e.renamed("com/A.class"));
    manager.apply_resource_changes(&[&shadow]).unwrap();
    assert!(manager.resources().contains_key("com/A.class"));

    let err = manager
        .output()
        .unwrap()
        .to_bytes(CompressionLevel::Level(0))
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::Serialization);
    assert_eq!(sink.len(), 1);
    assert_eq!(sink.diagnostics()[0].container.as_deref(), Some("X.jar"));
}

struct Relocate {
    from: &'static str,
    to: &'static str,
}

impl ClassChange for Relocate {
    fn apply_change(&self, entry: Entry) -> Option<Entry> {
        match entry.name.strip_prefix(self.from) {
            Some(rest) => {
                let name = format!("{}{}", self.to, rest);
                Some(entry.renamed(name))
            }
            None => Some(entry),
        }
    }
}

impl ResourceChange for Relocate {
    fn apply_change(&self, entry: Entry) -> Option<Entry> {
        ClassChange::apply_change(self, entry)
    }
}

#[test]
fn test_struct_changes_on_both_partitions() {
    let jar = common::create_jar(&[
        ("org/lib/Util.class", b"u"),
        ("org/lib/messages.properties", b"m"),
        ("other.txt", b"o"),
    ]);
    let manager = common::load(jar, "lib.jar");
    let relocate = Relocate {
        from: "org/lib/",
        to: "shaded/lib/",
    };

    manager.apply_class_changes(&[&relocate]).unwrap();
    manager.apply_resource_changes(&[&relocate]).unwrap();

    assert!(manager.classes().contains_key("shaded/lib/Util.class"));
    assert!(manager.resources().contains_key("shaded/lib/messages.properties"));
    assert!(manager.resources().contains_key("other.txt"));
}

// =============================================================================
// Output
// =============================================================================

#[test]
fn test_output_order_and_determinism() {
    let jar = common::create_jar(&[
        ("z.txt", b"z"),
        ("b/B.class", b"B"),
        ("a.txt", b"a"),
        ("a/A.class", b"A"),
    ]);
    let manager = common::load(jar, "mixed.jar");
    let output = manager.output().unwrap();

    let first = output.to_bytes(CompressionLevel::Default).unwrap();
    let second = output.to_bytes(CompressionLevel::Default).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        common::names_in_order(&first),
        ["a/A.class", "b/B.class", "a.txt", "z.txt"]
    );

    let stored = output.to_bytes(CompressionLevel::Store).unwrap();
    assert_ne!(stored, first);
    assert_eq!(
        common::entries_in_order(&stored),
        common::entries_in_order(&first)
    );
}

#[test]
fn test_round_trip_through_output() {
    let jar = common::create_jar(&[
        ("com/A.class", &[0xCA, 0xFE]),
        ("com/B.class", &[]),
        ("res/data.bin", &[0u8; 4096]),
        ("unicode/ümlaut.txt", "grüße".as_bytes()),
    ]);
    let original = common::load(jar, "rt.jar");
    let bytes = original
        .output()
        .unwrap()
        .to_bytes(CompressionLevel::Level(9))
        .unwrap();

    let reread = common::load(bytes, "rt.jar");
    assert_eq!(original.snapshot(), reread.snapshot());
}

#[test]
fn test_output_sees_later_changes() {
    let manager = common::load(x_jar(), "X.jar");
    let output = manager.output().unwrap();
    let before = common::names_in_order(&output.to_bytes(CompressionLevel::Store).unwrap());

    let drop_all = |_: Entry| -> Option<Entry> { None };
    manager.apply_resource_changes(&[&drop_all]).unwrap();

    let output = manager.output().unwrap();
    let after = common::names_in_order(&output.to_bytes(CompressionLevel::Store).unwrap());
    assert_eq!(before, ["com/A.class", "readme.txt"]);
    assert_eq!(after, ["com/A.class"]);
}

#[test]
fn test_output_during_changes_is_never_torn() {
    let entries: Vec<(String, Vec<u8>)> = (0..200)
        .map(|i| (format!("a/r{i:03}.txt"), vec![i as u8]))
        .collect();
    let refs: Vec<(&str, &[u8])> = entries
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_slice()))
        .collect();
    let manager = common::load(common::create_jar(&refs), "busy.jar");

    let toggle = |e: Entry| {
        let name = match e.name.strip_prefix("a/") {
            Some(rest) => format!("b/{rest}"),
            None => format!("a/{}", &e.name[2..]),
        };
        Some(e.renamed(name))
    };

    std::thread::scope(|s| {
        s.spawn(|| {
            for _ in 0..50 {
                manager.apply_resource_changes(&[&toggle]).unwrap();
            }
        });
        s.spawn(|| {
            for _ in 0..20 {
                let bytes = manager
                    .output()
                    .unwrap()
                    .to_bytes(CompressionLevel::Store)
                    .unwrap();
                let names = common::names_in_order(&bytes);
                assert_eq!(names.len(), 200);
                let prefix = &names[0][..2];
                assert!(
                    names.iter().all(|n| n.starts_with(prefix)),
                    "output mixed entries from different passes"
                );
            }
        });
    });

    // 50 toggles leave every entry where it started.
    assert!(manager.resources().contains_key("a/r000.txt"));
    assert_eq!(manager.store().len(), 200);
    assert_eq!(manager.snapshot().get(EntryKind::Resource, "a/r199.txt").unwrap()[..], [199]);
}
