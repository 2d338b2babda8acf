/*!
 * Error types for bbcombine
 */

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CombineError>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_FATAL: i32 = 2;

#[derive(Error, Debug)]
pub enum CombineError {
    /// Input file does not exist
    #[error("Source not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The two inputs differ in size and the length policy rejects that
    #[error("Input size mismatch: first input is {first} bytes, second input is {second} bytes")]
    LengthMismatch { first: u64, second: u64 },

    /// Nothing to combine
    #[error("Input is empty: {}", .0.display())]
    EmptyInput(PathBuf),

    /// Pre-allocation was asked for a zero-length output
    #[error("Cannot pre-allocate an empty output file")]
    EmptyOutput,

    /// Chunk size of zero
    #[error("Chunk size must be greater than zero")]
    InvalidChunkSize,

    /// A chunk copy would read or write outside its views
    #[error("Chunk at offset {start} with length {len} exceeds the available {available} bytes")]
    ChunkOutOfBounds { start: u64, len: u64, available: u64 },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Worker pool error
    #[error("Parallel processing error: {0}")]
    Parallel(String),
}

impl CombineError {
    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        if self.is_fatal() {
            EXIT_FATAL
        } else {
            EXIT_FAILURE
        }
    }

    /// Errors raised before any output byte was written
    pub fn is_fatal(&self) -> bool {
        match self {
            CombineError::SourceNotFound(_)
            | CombineError::LengthMismatch { .. }
            | CombineError::EmptyInput(_)
            | CombineError::EmptyOutput
            | CombineError::InvalidChunkSize
            | CombineError::Config(_) => true,

            CombineError::Io(_)
            | CombineError::ChunkOutOfBounds { .. }
            | CombineError::Parallel(_) => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            CombineError::SourceNotFound(_) => ErrorCategory::Validation,
            CombineError::Io(_) => ErrorCategory::IoError,
            CombineError::LengthMismatch { .. } | CombineError::EmptyInput(_) => {
                ErrorCategory::Precondition
            }
            CombineError::EmptyOutput => ErrorCategory::Resource,
            CombineError::InvalidChunkSize | CombineError::Config(_) => {
                ErrorCategory::Configuration
            }
            CombineError::ChunkOutOfBounds { .. } => ErrorCategory::Integrity,
            CombineError::Parallel(_) => ErrorCategory::Concurrency,
        }
    }
}

/// Error category for classification and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Path validation errors
    Validation,
    /// I/O operation errors
    IoError,
    /// Input preconditions (sizes)
    Precondition,
    /// Resource allocation errors
    Resource,
    /// Configuration errors
    Configuration,
    /// Chunk bounds violations
    Integrity,
    /// Worker pool errors
    Concurrency,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Validation => write!(f, "validation"),
            ErrorCategory::IoError => write!(f, "io"),
            ErrorCategory::Precondition => write!(f, "precondition"),
            ErrorCategory::Resource => write!(f, "resource"),
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Integrity => write!(f, "integrity"),
            ErrorCategory::Concurrency => write!(f, "concurrency"),
        }
    }
}

impl From<toml::de::Error> for CombineError {
    fn from(err: toml::de::Error) -> Self {
        CombineError::Config(format!("TOML parse error: {}", err))
    }
}

impl From<toml::ser::Error> for CombineError {
    fn from(err: toml::ser::Error) -> Self {
        CombineError::Config(format!("TOML serialize error: {}", err))
    }
}
