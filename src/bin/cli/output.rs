//! Output formatting for CLI operations.

use serde_json::json;

use jarkit::{ChangeResult, MergeResult, ReadResult, SearchHit, StoreSnapshot};

/// Trait for output formatting
pub trait OutputFormatter {
    /// Formats the entries of a jar
    fn format_list(&self, name: &str, snapshot: &StoreSnapshot, result: &ReadResult) -> String;

    /// Formats a search result
    fn format_find(&self, key: &str, hit: Option<&SearchHit>) -> String;

    /// Formats merge results
    fn format_merge(&self, output: &str, result: &MergeResult) -> String;

    /// Formats repack results
    fn format_repack(
        &self,
        output: &str,
        read: &ReadResult,
        classes: &ChangeResult,
        resources: &ChangeResult,
    ) -> String;
}

/// Human-readable output formatter
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn format_list(&self, name: &str, snapshot: &StoreSnapshot, result: &ReadResult) -> String {
        let mut output = String::new();
        output.push_str(&format!("{:>12} {:<8} {}\n", "Size", "Kind", "Name"));
        output.push_str(&"-".repeat(70));
        output.push('\n');

        let mut total_size: u64 = 0;
        for kind in [jarkit::EntryKind::Class, jarkit::EntryKind::Resource] {
            for entry in snapshot.sorted_entries(kind) {
                total_size += entry.len() as u64;
                output.push_str(&format!(
                    "{:>12} {:<8} {}\n",
                    humanize_bytes(entry.len() as u64),
                    kind.to_string(),
                    entry.name
                ));
            }
        }

        output.push_str(&"-".repeat(70));
        output.push('\n');
        output.push_str(&format!(
            "{}: {} classes, {} resources, {} total\n",
            name,
            snapshot.classes().len(),
            snapshot.resources().len(),
            humanize_bytes(total_size)
        ));
        if result.duplicates_discarded > 0 {
            output.push_str(&format!(
                "Discarded {} duplicate entries\n",
                result.duplicates_discarded
            ));
        }
        if result.entries_failed > 0 {
            output.push_str(&format!("Failed to read {} entries\n", result.entries_failed));
        }
        output
    }

    fn format_find(&self, key: &str, hit: Option<&SearchHit>) -> String {
        match hit {
            Some(hit) => format!(
                "{} found in {} ({})\n",
                key,
                hit.container,
                humanize_bytes(hit.entry.len() as u64)
            ),
            None => format!("{} not found\n", key),
        }
    }

    fn format_merge(&self, output_name: &str, result: &MergeResult) -> String {
        let mut output = String::new();
        for (name, read) in &result.per_container {
            output.push_str(&format!(
                "  {}: {} classes, {} resources added\n",
                name, read.class_entries, read.resource_entries
            ));
        }
        output.push_str(&format!(
            "Merged {} jars into {} ({} entries, {} duplicates discarded)\n",
            result.containers,
            output_name,
            result.totals.entries_added(),
            result.totals.duplicates_discarded
        ));
        if result.totals.entries_failed > 0 {
            output.push_str(&format!(
                "Failed to read {} entries\n",
                result.totals.entries_failed
            ));
        }
        output
    }

    fn format_repack(
        &self,
        output_name: &str,
        read: &ReadResult,
        classes: &ChangeResult,
        resources: &ChangeResult,
    ) -> String {
        let mut output = String::new();
        output.push_str(&format!(
            "Classes:   {} -> {}\n",
            classes.entries_before, classes.entries_after
        ));
        output.push_str(&format!(
            "Resources: {} -> {}\n",
            resources.entries_before, resources.entries_after
        ));
        output.push_str(&format!("Wrote {}\n", output_name));
        if read.entries_failed > 0 {
            output.push_str(&format!("Failed to read {} entries\n", read.entries_failed));
        }
        output
    }
}

/// JSON output formatter
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn format_list(&self, name: &str, snapshot: &StoreSnapshot, result: &ReadResult) -> String {
        let entries = |kind| {
            snapshot
                .sorted_entries(kind)
                .iter()
                .map(|e| json!({ "name": e.name, "size": e.len() }))
                .collect::<Vec<_>>()
        };
        let obj = json!({
            "jar": name,
            "classes": entries(jarkit::EntryKind::Class),
            "resources": entries(jarkit::EntryKind::Resource),
            "duplicates_discarded": result.duplicates_discarded,
            "entries_failed": result.entries_failed,
        });
        serde_json::to_string_pretty(&obj).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_find(&self, key: &str, hit: Option<&SearchHit>) -> String {
        let obj = json!({
            "key": key,
            "found": hit.is_some(),
            "jar": hit.map(|h| h.container.as_str()),
            "size": hit.map(|h| h.entry.len()),
        });
        serde_json::to_string_pretty(&obj).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_merge(&self, output_name: &str, result: &MergeResult) -> String {
        let obj = json!({
            "output": output_name,
            "jars": result.per_container.iter().map(|(name, read)| json!({
                "jar": name,
                "classes_added": read.class_entries,
                "resources_added": read.resource_entries,
                "duplicates_discarded": read.duplicates_discarded,
                "entries_failed": read.entries_failed,
            })).collect::<Vec<_>>(),
            "entries": result.totals.entries_added(),
            "duplicates_discarded": result.totals.duplicates_discarded,
        });
        serde_json::to_string_pretty(&obj).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_repack(
        &self,
        output_name: &str,
        read: &ReadResult,
        classes: &ChangeResult,
        resources: &ChangeResult,
    ) -> String {
        let obj = json!({
            "output": output_name,
            "classes_before": classes.entries_before,
            "classes_after": classes.entries_after,
            "resources_before": resources.entries_before,
            "resources_after": resources.entries_after,
            "entries_failed": read.entries_failed,
        });
        serde_json::to_string_pretty(&obj).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Creates the appropriate formatter based on output format
pub fn create_formatter(format: super::OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        super::OutputFormat::Human => Box::new(HumanFormatter),
        super::OutputFormat::Json => Box::new(JsonFormatter),
    }
}

/// Converts bytes to a human-readable string
pub fn humanize_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
