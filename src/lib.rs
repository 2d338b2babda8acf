/*!
 * bbcombine - interleave two baseband captures block by block
 *
 * Given two equal-length capture files A and B and a chunk size C, the output
 * holds A[0..C], B[0..C], A[C..2C], B[C..2C], ... and is exactly twice the
 * input length. Inputs and output are memory-mapped and chunks are copied by
 * a bounded worker pool.
 */

pub mod cli_style;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod stats;

// Re-export commonly used types
pub use config::{CombineConfig, LengthPolicy, LogLevel};
pub use self::core::chunk::{ChunkDescriptor, ChunkPlan};
pub use self::core::combine_files;
pub use error::{CombineError, Result};
pub use stats::CombineStats;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
    }
}
