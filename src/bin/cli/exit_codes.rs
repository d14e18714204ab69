//! Exit codes for the CLI tool.

use jarkit::Error;

/// Exit code constants
pub const SUCCESS: i32 = 0;
/// Operation completed with warnings
pub const WARNING: i32 = 1;
/// Fatal error occurred
pub const FATAL_ERROR: i32 = 2;
/// Jar format error
pub const BAD_JAR: i32 = 3;
/// I/O error
pub const IO_ERROR: i32 = 5;
/// Invalid command line arguments
pub const BAD_ARGS: i32 = 255;

/// Exit code enum for structured handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success,
    Warning,
    FatalError,
    BadJar,
    IoError,
    BadArgs,
}

impl ExitCode {
    /// Returns the numeric exit code
    pub fn code(self) -> i32 {
        match self {
            Self::Success => SUCCESS,
            Self::Warning => WARNING,
            Self::FatalError => FATAL_ERROR,
            Self::BadJar => BAD_JAR,
            Self::IoError => IO_ERROR,
            Self::BadArgs => BAD_ARGS,
        }
    }
}

/// Converts a jarkit error to an exit code
pub fn error_to_exit_code(error: &Error) -> ExitCode {
    match error {
        Error::Io(_) | Error::Serialization { .. } => ExitCode::IoError,
        Error::InvalidContainer { .. }
        | Error::UnsupportedFeature { .. }
        | Error::UnsupportedMethod { .. }
        | Error::CrcMismatch { .. }
        | Error::EntryRead { .. } => ExitCode::BadJar,
        Error::InvalidCompressionLevel(_)
        | Error::ContainerNotFound { .. }
        | Error::NotEnoughContainers { .. } => ExitCode::BadArgs,
        Error::ResourceLimitExceeded(_) | Error::AlreadyPopulated { .. } => ExitCode::FatalError,
        // Future error variants - required by #[non_exhaustive]
        _ => ExitCode::FatalError,
    }
}
