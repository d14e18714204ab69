//! Compression level selection.

use crate::{Error, Result};

/// Compression applied to every entry of an output.
///
/// # Example
///
/// ```rust
/// use jarkit::CompressionLevel;
///
/// assert_eq!(CompressionLevel::new(9)?, CompressionLevel::Level(9));
/// assert!(CompressionLevel::new(15).is_err());
/// assert_eq!(CompressionLevel::from_deflater(-1)?, CompressionLevel::Default);
/// # Ok::<(), jarkit::Error>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompressionLevel {
    /// Entries are stored without compression.
    Store,
    /// Deflate at level 6.
    #[default]
    Default,
    /// Deflate at the given level, `0..=9`.
    ///
    /// Level 0 still uses the deflate method, with uncompressed blocks.
    Level(u8),
}

impl CompressionLevel {
    /// Deflate level used by [`CompressionLevel::Default`].
    pub const DEFAULT_DEFLATE_LEVEL: u32 = 6;

    /// Creates a deflate level.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCompressionLevel`] if `level` is greater than 9.
    pub fn new(level: u32) -> Result<Self> {
        if level > 9 {
            return Err(Error::InvalidCompressionLevel(i64::from(level)));
        }
        Ok(Self::Level(level as u8))
    }

    /// Maps a conventional deflater level, where `-1` selects the default.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCompressionLevel`] for values outside `-1..=9`.
    pub fn from_deflater(level: i32) -> Result<Self> {
        match level {
            -1 => Ok(Self::Default),
            0..=9 => Ok(Self::Level(level as u8)),
            other => Err(Error::InvalidCompressionLevel(i64::from(other))),
        }
    }

    /// Returns the deflate level, or `None` for stored output.
    ///
    /// Levels above 9 built directly through [`CompressionLevel::Level`] are
    /// clamped.
    pub fn deflate_level(self) -> Option<u32> {
        match self {
            Self::Store => None,
            Self::Default => Some(Self::DEFAULT_DEFLATE_LEVEL),
            Self::Level(level) => Some(u32::from(level.min(9))),
        }
    }
}

impl std::fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store => write!(f, "store"),
            Self::Default => write!(f, "default"),
            Self::Level(level) => write!(f, "{level}"),
        }
    }
}

impl std::str::FromStr for CompressionLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "store" => Ok(Self::Store),
            "default" => Ok(Self::Default),
            other => match other.parse::<i64>() {
                Ok(level) if (0..=9).contains(&level) => Ok(Self::Level(level as u8)),
                Ok(level) => Err(Error::InvalidCompressionLevel(level)),
                Err(_) => Err(Error::InvalidCompressionLevel(-1)),
            },
        }
    }
}
