/*!
 * Configuration types for bbcombine
 */

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Main configuration for a combine run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombineConfig {
    /// Chunk size in bytes; one worker task per chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Number of worker threads (0 = auto-detect)
    #[serde(default)]
    pub workers: usize,

    /// What to do when the two inputs differ in size
    #[serde(default)]
    pub length_policy: LengthPolicy,

    /// Show progress bar
    #[serde(default = "default_true")]
    pub show_progress: bool,

    /// Leave the partially written output in place when a run fails
    #[serde(default)]
    pub keep_partial: bool,

    /// Log level for diagnostic output
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log file path (None = stderr)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Enable verbose logging (shorthand for log_level = debug)
    #[serde(default)]
    pub verbose: bool,
}

impl Default for CombineConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            workers: 0,
            length_policy: LengthPolicy::Reject,
            show_progress: true,
            keep_partial: false,
            log_level: LogLevel::Info,
            log_file: None,
            verbose: false,
        }
    }
}

/// Policy applied when the two inputs do not have the same length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LengthPolicy {
    /// Fail during setup
    #[default]
    Reject,

    /// Combine only the first min(len1, len2) bytes of each input
    Truncate,
}

impl LengthPolicy {
    /// Resolve the usable input length, or `None` when the policy rejects the pair
    pub fn usable_len(&self, first: u64, second: u64) -> Option<u64> {
        match self {
            _ if first == second => Some(first),
            LengthPolicy::Reject => None,
            LengthPolicy::Truncate => Some(first.min(second)),
        }
    }
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    Warn,

    /// Info, warnings, and errors
    #[default]
    Info,

    /// Debug and above
    Debug,

    /// All messages including traces
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_chunk_size() -> usize {
    1024 * 1024 // 1 MB
}

impl CombineConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: CombineConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Create a configuration that uses every core and stays quiet
    pub fn fast_preset() -> Self {
        Self {
            workers: crate::core::concurrency::available_parallelism(),
            show_progress: false,
            ..Default::default()
        }
    }

    /// Create a configuration that copies serially and never truncates
    pub fn safe_preset() -> Self {
        Self {
            workers: 1,
            length_policy: LengthPolicy::Reject,
            keep_partial: false,
            ..Default::default()
        }
    }
}
