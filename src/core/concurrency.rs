/*!
 * Worker pool sizing
 *
 * Peak resource usage is bounded by the worker count, never by the number
 * of chunks in a file.
 */

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, warn};

use crate::error::{CombineError, Result};

/// Resolve the number of workers for a run
///
/// `requested == 0` auto-detects the CPU count. The result is at least 1 and
/// never exceeds the number of chunks, since extra workers would sit idle.
pub fn resolve_workers(requested: usize, chunk_count: usize) -> usize {
    let workers = if requested == 0 {
        available_parallelism()
    } else {
        requested
    };
    workers.min(chunk_count).max(1)
}

/// Build a pool with exactly `workers` named threads
pub fn build_pool(workers: usize) -> Result<ThreadPool> {
    debug!("Starting worker pool with {} threads", workers);
    ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("bbcombine-worker-{}", i))
        .build()
        .map_err(|e| CombineError::Parallel(e.to_string()))
}

/// CPU count, or 1 when it cannot be detected (restricted containers, cgroups)
pub fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or_else(|e| {
            warn!(
                "Failed to detect available parallelism: {}. Defaulting to 1 worker.",
                e
            );
            1
        })
}
