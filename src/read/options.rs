//! Options for reading containers.

use std::path::Path;

use crate::{Error, Result};

/// Thread configuration for parallel operations.
///
/// Used both for decompressing entries while reading and for running change
/// passes. Without the `parallel` feature every setting runs on the calling
/// thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Threads {
    /// Automatically determine thread count, using rayon's global pool.
    #[default]
    Auto,
    /// Use a specific number of threads.
    ///
    /// The count must be non-zero. If you have a value that might be zero,
    /// use [`Threads::count_or_single`] instead.
    Count(std::num::NonZeroUsize),
    /// Single-threaded operation.
    Single,
}

impl Threads {
    /// Creates a `Threads::Count` variant from a `usize`.
    ///
    /// Returns `Threads::Single` if the count is zero.
    ///
    /// # Example
    ///
    /// ```rust
    /// use jarkit::read::Threads;
    ///
    /// assert_eq!(Threads::count_or_single(0), Threads::Single);
    /// assert_eq!(Threads::count_or_single(4).count(), 4);
    /// ```
    pub fn count_or_single(n: usize) -> Self {
        match std::num::NonZeroUsize::new(n) {
            Some(count) => Self::Count(count),
            None => Self::Single,
        }
    }

    /// Returns the actual thread count.
    ///
    /// - `Threads::Auto`: the number of available CPUs, minimum 1
    /// - `Threads::Count(n)`: `n.get()`
    /// - `Threads::Single`: 1
    pub fn count(&self) -> usize {
        match self {
            Self::Auto => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            Self::Count(n) => n.get(),
            Self::Single => 1,
        }
    }

    /// Resolves this setting into workers for one read or change call.
    ///
    /// `Auto` runs on rayon's global pool; an explicit count above one gets
    /// a pool of its own, built once and shared by every pass of the call.
    pub(crate) fn workers(&self) -> Result<Workers> {
        #[cfg(feature = "parallel")]
        {
            match self {
                Self::Auto if rayon::current_num_threads() > 1 => return Ok(Workers::Global),
                Self::Count(n) if n.get() > 1 => {
                    let pool = rayon::ThreadPoolBuilder::new()
                        .num_threads(n.get())
                        .build()
                        .map_err(|e| Error::Io(std::io::Error::other(e)))?;
                    return Ok(Workers::Dedicated(pool));
                }
                _ => {}
            }
        }
        Ok(Workers::Sequential)
    }
}

/// Worker threads for one read or change call.
pub(crate) enum Workers {
    /// The calling thread.
    Sequential,
    /// Rayon's global pool.
    #[cfg(feature = "parallel")]
    Global,
    /// A pool owned by the call.
    #[cfg(feature = "parallel")]
    Dedicated(rayon::ThreadPool),
}

#[cfg(feature = "parallel")]
impl Workers {
    pub(crate) fn is_parallel(&self) -> bool {
        !matches!(self, Self::Sequential)
    }

    /// Runs `op` so that parallel iterators inside it use these workers.
    pub(crate) fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        match self {
            Self::Dedicated(pool) => pool.install(op),
            _ => op(),
        }
    }
}

/// Limits applied while reading a container.
///
/// Exceeding `max_entries` or `max_total_size` rejects the whole container
/// as invalid input; an entry above `max_entry_size` is dropped as an entry
/// failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadLimits {
    /// Maximum number of central directory records.
    pub max_entries: usize,
    /// Maximum uncompressed size of one entry.
    pub max_entry_size: u64,
    /// Maximum declared uncompressed size of all entries.
    pub max_total_size: u64,
}

impl Default for ReadLimits {
    /// | Limit | Default |
    /// |-------|---------|
    /// | `max_entries` | 1,000,000 |
    /// | `max_entry_size` | 512 MiB |
    /// | `max_total_size` | 4 GiB |
    fn default() -> Self {
        Self {
            max_entries: 1_000_000,
            max_entry_size: 512 << 20,
            max_total_size: 4 << 30,
        }
    }
}

impl ReadLimits {
    /// Creates limits with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates limits with no restrictions.
    pub fn unlimited() -> Self {
        Self {
            max_entries: usize::MAX,
            max_entry_size: u64::MAX,
            max_total_size: u64::MAX,
        }
    }

    /// Sets the maximum number of entries.
    pub fn max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    /// Sets the maximum size of one entry.
    pub fn max_entry_size(mut self, max: u64) -> Self {
        self.max_entry_size = max;
        self
    }

    /// Sets the maximum total size.
    pub fn max_total_size(mut self, max: u64) -> Self {
        self.max_total_size = max;
        self
    }
}

/// Options for reading containers into a store.
///
/// # Example
///
/// ```rust
/// use jarkit::read::{ReadLimits, ReadOptions, Threads};
///
/// let options = ReadOptions::new()
///     .threads(Threads::Single)
///     .verify_crc(false)
///     .limits(ReadLimits::new().max_entries(10_000))
///     .require_extension(Some("jar"));
/// assert!(options.check_extension("app.JAR").is_ok());
/// assert!(options.check_extension("app.zip").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Thread configuration for decompression and change passes.
    pub threads: Threads,
    /// Whether to verify CRC-32 checksums of decompressed entries.
    pub verify_crc: bool,
    /// Resource limits.
    pub limits: ReadLimits,
    /// File extension containers must carry, compared case-insensitively.
    pub required_extension: Option<String>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            threads: Threads::Auto,
            verify_crc: true,
            limits: ReadLimits::default(),
            required_extension: None,
        }
    }
}

impl ReadOptions {
    /// Creates read options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the thread configuration.
    pub fn threads(mut self, threads: Threads) -> Self {
        self.threads = threads;
        self
    }

    /// Sets whether to verify CRC checksums.
    pub fn verify_crc(mut self, verify: bool) -> Self {
        self.verify_crc = verify;
        self
    }

    /// Sets the resource limits.
    pub fn limits(mut self, limits: ReadLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Requires container names to end with the given extension.
    ///
    /// `None` (the default) accepts any name; containers are recognized by
    /// their content.
    pub fn require_extension(mut self, extension: Option<&str>) -> Self {
        self.required_extension = extension.map(|e| e.trim_start_matches('.').to_string());
        self
    }

    /// Checks `name` against the required extension.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContainer`] if an extension is required and
    /// `name` does not carry it.
    pub fn check_extension(&self, name: &str) -> Result<()> {
        let Some(required) = &self.required_extension else {
            return Ok(());
        };
        let matches = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(required));
        if matches {
            Ok(())
        } else {
            Err(Error::InvalidContainer {
                name: name.to_string(),
                reason: format!("expected a .{} file", required),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threads() {
        assert_eq!(Threads::Single.count(), 1);
        assert!(Threads::Auto.count() >= 1);
        assert_eq!(Threads::count_or_single(3), Threads::Count(std::num::NonZeroUsize::new(3).unwrap()));
    }

    #[test]
    fn test_workers() {
        assert!(matches!(Threads::Single.workers().unwrap(), Workers::Sequential));
        assert!(matches!(
            Threads::count_or_single(1).workers().unwrap(),
            Workers::Sequential
        ));
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_workers_reuse_pools() {
        let workers = Threads::count_or_single(3).workers().unwrap();
        assert!(workers.is_parallel());
        assert_eq!(workers.install(rayon::current_num_threads), 3);
        assert_eq!(workers.install(rayon::current_num_threads), 3);

        let auto = Threads::Auto.workers().unwrap();
        assert!(!matches!(auto, Workers::Dedicated(_)));
    }

    #[test]
    fn test_defaults() {
        let options = ReadOptions::default();
        assert!(options.verify_crc);
        assert_eq!(options.threads, Threads::Auto);
        assert_eq!(options.limits.max_entries, 1_000_000);
        assert_eq!(options.limits.max_entry_size, 512 * 1024 * 1024);
        assert_eq!(options.limits.max_total_size, 4 * 1024 * 1024 * 1024);
        assert!(options.check_extension("anything.bin").is_ok());
    }

    #[test]
    fn test_extension_check() {
        let options = ReadOptions::new().require_extension(Some(".jar"));
        assert!(options.check_extension("lib/app.jar").is_ok());
        assert!(options.check_extension("APP.JAR").is_ok());
        assert!(options.check_extension("app.jar.bak").is_err());
        assert!(options.check_extension("jar").is_err());

        let err = options.check_extension("app.war").unwrap_err();
        assert!(matches!(err, Error::InvalidContainer { .. }));
    }

    #[test]
    fn test_unlimited() {
        let limits = ReadLimits::unlimited();
        assert_eq!(limits.max_entries, usize::MAX);
        assert_eq!(limits.max_entry_size, u64::MAX);
    }
}
