//! Command implementations for the CLI tool.

use std::path::{Path, PathBuf};

use jarkit::{
    ChangeResult, ClassChange, CompressionLevel, Entry, JarManager, MergedJar, ReadOptions,
    ReadResult, ResourceChange, Threads, find_entry_in_paths,
};

use crate::OutputFormat;
use crate::exit_codes::{ExitCode, error_to_exit_code};
use crate::output::create_formatter;

/// Options shared by every command.
pub struct Settings {
    pub format: OutputFormat,
    pub thread_count: usize,
}

impl Settings {
    fn read_options(&self) -> ReadOptions {
        let threads = match self.thread_count {
            0 => Threads::Auto,
            n => Threads::count_or_single(n),
        };
        ReadOptions::new().threads(threads)
    }
}

/// Configuration for the repack command.
pub struct RepackConfig<'a> {
    pub jar_path: &'a Path,
    pub output_path: &'a Path,
    pub exclude: &'a [String],
    pub rename_prefix: &'a [(String, String)],
    pub level: CompressionLevel,
    pub settings: &'a Settings,
}

/// Parses a `FROM=TO` rename argument.
pub fn parse_rename(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((from, to)) if !from.is_empty() => Ok((from.to_string(), to.to_string())),
        _ => Err(format!("expected FROM=TO, got '{}'", arg)),
    }
}

/// List command implementation
pub fn list(jar_path: &Path, settings: &Settings) -> ExitCode {
    let formatter = create_formatter(settings.format);

    let mut jar = JarManager::new().with_options(settings.read_options());
    let result = match jar.read_path(jar_path) {
        Ok(r) => r,
        Err(e) => return error_to_exit_code(&e),
    };

    let name = jar.name().unwrap_or_default().to_string();
    print!("{}", formatter.format_list(&name, &jar.snapshot(), &result));

    read_exit_code(&result)
}

/// Find command implementation
pub fn find(key: &str, jars: &[PathBuf], output: Option<&Path>, settings: &Settings) -> ExitCode {
    let formatter = create_formatter(settings.format);

    let hit = match find_entry_in_paths(jars, key, &settings.read_options()) {
        Ok(hit) => hit,
        Err(e) => {
            eprintln!("Error: {}", e);
            return error_to_exit_code(&e);
        }
    };

    print!("{}", formatter.format_find(key, hit.as_ref()));

    match (hit, output) {
        (Some(hit), Some(path)) => match std::fs::write(path, &hit.entry.data) {
            Ok(()) => ExitCode::Success,
            Err(e) => {
                eprintln!("Error writing {}: {}", path.display(), e);
                ExitCode::IoError
            }
        },
        (Some(_), None) => ExitCode::Success,
        (None, _) => ExitCode::Warning,
    }
}

/// Merge command implementation
pub fn merge(
    jars: &[PathBuf],
    output_path: &Path,
    level: CompressionLevel,
    settings: &Settings,
) -> ExitCode {
    let formatter = create_formatter(settings.format);

    let name = output_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| output_path.display().to_string());
    let mut merged = MergedJar::new(&name).with_options(settings.read_options());
    let result = match merged.merge_paths(jars) {
        Ok(r) => r,
        Err(e) => return error_to_exit_code(&e),
    };

    let Some(output) = merged.output() else {
        return ExitCode::FatalError;
    };
    if let Err(e) = output.write_path(output_path, level) {
        return error_to_exit_code(&e);
    }

    print!("{}", formatter.format_merge(&name, &result));
    read_exit_code(&result.totals)
}

/// Repack command implementation
pub fn repack(config: &RepackConfig<'_>) -> ExitCode {
    let formatter = create_formatter(config.settings.format);

    let mut jar = JarManager::new().with_options(config.settings.read_options());
    let read = match jar.read_path(config.jar_path) {
        Ok(r) => r,
        Err(e) => return error_to_exit_code(&e),
    };

    let exclude = |entry: Entry| {
        let excluded = config.exclude.iter().any(|p| entry.name.starts_with(p.as_str()));
        (!excluded).then_some(entry)
    };
    let rename = |entry: Entry| {
        let renamed = config
            .rename_prefix
            .iter()
            .find_map(|(from, to)| entry.name.strip_prefix(from.as_str()).map(|rest| format!("{to}{rest}")));
        Some(match renamed {
            Some(name) => entry.renamed(name),
            None => entry,
        })
    };

    let class_changes: [&dyn ClassChange; 2] = [&exclude, &rename];
    let resource_changes: [&dyn ResourceChange; 2] = [&exclude, &rename];
    let changes = jar
        .apply_class_changes(&class_changes)
        .and_then(|classes| Ok((classes, jar.apply_resource_changes(&resource_changes)?)));
    let (classes, resources): (ChangeResult, ChangeResult) = match changes {
        Ok(results) => results,
        Err(e) => return error_to_exit_code(&e),
    };

    let Some(output) = jar.output() else {
        return ExitCode::FatalError;
    };
    if let Err(e) = output.write_path(config.output_path, config.level) {
        return error_to_exit_code(&e);
    }

    let name = config.output_path.display().to_string();
    print!(
        "{}",
        formatter.format_repack(&name, &read, &classes, &resources)
    );
    read_exit_code(&read)
}

fn read_exit_code(result: &ReadResult) -> ExitCode {
    if result.is_success() {
        ExitCode::Success
    } else {
        ExitCode::Warning
    }
}
