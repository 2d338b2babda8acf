/*!
 * Core combine operations
 *
 * A run goes through three phases: setup (map inputs, pre-allocate and map
 * the output), fan-out and join (copy every chunk), teardown (unmap inputs,
 * flush and unmap the output). Any failure aborts the run.
 */

pub mod chunk;
pub mod concurrency;
pub mod interleave;
pub mod mapped;

use std::path::Path;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, info, info_span, warn};

use crate::config::CombineConfig;
use crate::error::{CombineError, Result};
use crate::stats::CombineStats;

use chunk::{ChunkDescriptor, ChunkPlan};
use interleave::ChunkObserver;
use mapped::{MappedInput, MappedOutput};

/// Interleave `first` and `second` block by block into `output`
///
/// On failure an output file created by this run is removed unless
/// `config.keep_partial` is set. A pre-existing file that could not be
/// opened for writing is never removed.
pub fn combine_files(
    first: &Path,
    second: &Path,
    output: &Path,
    config: &CombineConfig,
) -> Result<CombineStats> {
    combine_with(first, second, output, config, fill_output)
}

/// Run a combine with a custom fan-out phase
///
/// `fill` receives both input views, the whole output arena, the plan, the
/// resolved worker count and the per-chunk observer.
pub(crate) fn combine_with<F>(
    first: &Path,
    second: &Path,
    output: &Path,
    config: &CombineConfig,
    fill: F,
) -> Result<CombineStats>
where
    F: FnOnce(&[u8], &[u8], &mut [u8], &ChunkPlan, usize, ChunkObserver<'_>) -> Result<()>,
{
    let span = info_span!("combine", output = %output.display());
    let _enter = span.enter();

    let mut output_created = false;
    let result = run(first, second, output, config, fill, &mut output_created);

    if let Err(ref e) = result {
        error!(category = %e.category(), "Combine failed: {}", e);
        if output_created && !config.keep_partial {
            remove_partial_output(output);
        } else if output_created {
            warn!("Keeping partial output {:?}", output);
        }
    }

    result
}

fn run<F>(
    first: &Path,
    second: &Path,
    output: &Path,
    config: &CombineConfig,
    fill: F,
    output_created: &mut bool,
) -> Result<CombineStats>
where
    F: FnOnce(&[u8], &[u8], &mut [u8], &ChunkPlan, usize, ChunkObserver<'_>) -> Result<()>,
{
    let start_time = Instant::now();

    if config.chunk_size == 0 {
        return Err(CombineError::InvalidChunkSize);
    }
    check_output_path(first, second, output)?;

    // SETUP
    let first_input = MappedInput::open(first)?;
    let second_input = MappedInput::open(second)?;

    let combined_len = config
        .length_policy
        .usable_len(first_input.len(), second_input.len())
        .ok_or(CombineError::LengthMismatch {
            first: first_input.len(),
            second: second_input.len(),
        })?;

    if combined_len == 0 {
        let empty = if first_input.is_empty() { first } else { second };
        return Err(CombineError::EmptyInput(empty.to_path_buf()));
    }

    if first_input.len() != second_input.len() {
        warn!(
            "Input sizes differ ({} vs {} bytes), combining the first {} bytes of each",
            first_input.len(),
            second_input.len(),
            combined_len
        );
    }

    let plan = ChunkPlan::new(combined_len, config.chunk_size as u64)?;
    let workers = concurrency::resolve_workers(config.workers, plan.chunk_count());

    info!(
        "Combining {:?} and {:?}: {} bytes each, {} chunks of {} bytes, {} workers",
        first,
        second,
        combined_len,
        plan.chunk_count(),
        plan.chunk_size(),
        workers
    );
    if let Some(tail) = plan.remainder() {
        debug!("Last chunk is partial ({} bytes)", tail);
    }

    let output_file = mapped::create_output_file(output, 2 * combined_len)?;
    *output_created = true;
    let mut out = MappedOutput::extend_and_map(output, output_file, 2 * combined_len)?;

    // FAN-OUT AND JOIN
    let progress = if config.show_progress {
        Some(chunk_progress_bar(plan.chunk_count() as u64)?)
    } else {
        None
    };
    let on_chunk = |chunk: &ChunkDescriptor| {
        if let Some(ref pb) = progress {
            pb.inc(1);
        }
        debug!(chunk = chunk.index, start = chunk.start, len = chunk.len, "chunk done");
    };

    {
        let len = combined_len as usize;
        let first_view = &first_input.as_slice()[..len];
        let second_view = &second_input.as_slice()[..len];
        let observer: ChunkObserver<'_> = &on_chunk;
        let filled = fill(
            first_view,
            second_view,
            out.as_mut_slice(),
            &plan,
            workers,
            observer,
        );
        if let Some(ref pb) = progress {
            pb.finish_and_clear();
        }
        filled?;
    }

    // TEARDOWN
    let stats = CombineStats {
        first_len: first_input.len(),
        second_len: second_input.len(),
        combined_len,
        bytes_written: out.len(),
        chunk_size: plan.chunk_size(),
        chunk_count: plan.chunk_count(),
        workers,
        duration: start_time.elapsed(),
    };

    first_input.close();
    second_input.close();
    out.close()?;

    info!(
        "Wrote {} bytes to {:?} in {:.2}s",
        stats.bytes_written,
        output,
        stats.duration.as_secs_f64()
    );

    Ok(stats)
}

/// Copy every chunk, on a worker pool when more than one worker is resolved
fn fill_output(
    first: &[u8],
    second: &[u8],
    out: &mut [u8],
    plan: &ChunkPlan,
    workers: usize,
    on_chunk: ChunkObserver<'_>,
) -> Result<()> {
    if workers > 1 {
        let pool = concurrency::build_pool(workers)?;
        interleave::interleave_parallel(&pool, first, second, out, plan, on_chunk)
    } else {
        interleave::interleave_serial(first, second, out, plan, on_chunk)
    }
}

fn chunk_progress_bar(chunks: u64) -> Result<ProgressBar> {
    let pb = ProgressBar::new(chunks);
    let style = ProgressStyle::default_bar()
        .template("Processing {spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} blocks ({eta})")
        .map_err(|e| CombineError::Config(format!("Invalid progress template: {}", e)))?
        .progress_chars("#>-");
    pb.set_style(style);
    Ok(pb)
}

/// Refuse outputs that would truncate an input or are not regular files
fn check_output_path(first: &Path, second: &Path, output: &Path) -> Result<()> {
    let Ok(metadata) = std::fs::metadata(output) else {
        // Output does not exist yet, so it cannot be an input
        return Ok(());
    };
    if !metadata.is_file() {
        return Err(CombineError::Config(format!(
            "Output path {:?} is not a regular file",
            output
        )));
    }
    for input in [first, second] {
        if is_same_file(input, output) {
            return Err(CombineError::Config(format!(
                "Output path {:?} is also an input",
                input
            )));
        }
    }
    Ok(())
}

/// Whether two paths name the same file, hard links included
#[cfg(unix)]
fn is_same_file(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (std::fs::metadata(a), std::fs::metadata(b)) {
        (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn is_same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn remove_partial_output(output: &Path) {
    match std::fs::remove_file(output) {
        Ok(()) => warn!("Removed partial output {:?}", output),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove partial output {:?}: {}", output, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LengthPolicy;
    use tempfile::tempdir;

    fn quiet_config(chunk_size: usize, workers: usize) -> CombineConfig {
        CombineConfig {
            chunk_size,
            workers,
            show_progress: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_combine_small_files() {
        crate::logging::init_test_logging();

        let dir = tempdir().unwrap();
        let a = dir.path().join("a.bin");
        let b = dir.path().join("b.bin");
        let out = dir.path().join("out.bin");
        std::fs::write(&a, [0x01u8; 8]).unwrap();
        std::fs::write(&b, [0x02u8; 8]).unwrap();

        let stats = combine_files(&a, &b, &out, &quiet_config(4, 2)).unwrap();

        assert_eq!(
            std::fs::read(&out).unwrap(),
            vec![1, 1, 1, 1, 2, 2, 2, 2, 1, 1, 1, 1, 2, 2, 2, 2]
        );
        assert_eq!(stats.bytes_written, 16);
        assert_eq!(stats.chunk_count, 2);
        assert_eq!(stats.workers, 2);
    }

    #[test]
    fn test_zero_chunk_size() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.bin");
        std::fs::write(&a, [0u8; 4]).unwrap();

        let err = combine_files(&a, &a, &dir.path().join("out.bin"), &quiet_config(0, 1))
            .unwrap_err();
        assert!(matches!(err, CombineError::InvalidChunkSize));
    }

    #[test]
    fn test_output_same_as_input_rejected() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.bin");
        let b = dir.path().join("b.bin");
        std::fs::write(&a, [7u8; 4]).unwrap();
        std::fs::write(&b, [8u8; 4]).unwrap();

        let err = combine_files(&a, &b, &a, &quiet_config(2, 1)).unwrap_err();
        assert!(matches!(err, CombineError::Config(_)));
        assert_eq!(std::fs::read(&a).unwrap(), vec![7u8; 4]);
    }

    #[test]
    fn test_truncate_policy() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.bin");
        let b = dir.path().join("b.bin");
        let out = dir.path().join("out.bin");
        std::fs::write(&a, [1u8, 2, 3, 4, 5, 6]).unwrap();
        std::fs::write(&b, [9u8, 8, 7, 6]).unwrap();

        let config = CombineConfig {
            length_policy: LengthPolicy::Truncate,
            ..quiet_config(2, 1)
        };
        let stats = combine_files(&a, &b, &out, &config).unwrap();

        assert!(stats.truncated());
        assert_eq!(stats.combined_len, 4);
        assert_eq!(std::fs::read(&out).unwrap(), vec![1, 2, 9, 8, 3, 4, 7, 6]);
    }

    #[test]
    fn test_remove_partial_output_deletes_file() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("partial.bin");
        std::fs::write(&out, [0u8; 32]).unwrap();

        remove_partial_output(&out);
        assert!(!out.exists());
    }

    #[test]
    fn test_remove_partial_output_ignores_missing() {
        let dir = tempdir().unwrap();
        remove_partial_output(&dir.path().join("never-created.bin"));
    }

    /// Copies the first chunk, then fails as a worker would
    fn fail_after_first_chunk(
        first: &[u8],
        second: &[u8],
        out: &mut [u8],
        plan: &ChunkPlan,
        _workers: usize,
        on_chunk: ChunkObserver<'_>,
    ) -> Result<()> {
        let chunk = plan.get(0).ok_or(CombineError::InvalidChunkSize)?;
        interleave::copy_chunk(first, second, out, &chunk)?;
        on_chunk(&chunk);
        Err(CombineError::Parallel("worker failed".to_string()))
    }

    fn write_pair(dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
        let a = dir.join("a.bin");
        let b = dir.join("b.bin");
        std::fs::write(&a, [1u8; 8]).unwrap();
        std::fs::write(&b, [2u8; 8]).unwrap();
        (a, b)
    }

    #[test]
    fn test_failed_fill_removes_created_output() {
        crate::logging::init_test_logging();

        let dir = tempdir().unwrap();
        let (a, b) = write_pair(dir.path());
        let out = dir.path().join("out.bin");

        let err = combine_with(&a, &b, &out, &quiet_config(4, 1), fail_after_first_chunk)
            .unwrap_err();

        assert!(matches!(err, CombineError::Parallel(_)));
        assert!(!out.exists());
    }

    #[test]
    fn test_failed_fill_keeps_output_when_requested() {
        let dir = tempdir().unwrap();
        let (a, b) = write_pair(dir.path());
        let out = dir.path().join("out.bin");

        let config = CombineConfig {
            keep_partial: true,
            ..quiet_config(4, 1)
        };
        let err = combine_with(&a, &b, &out, &config, fail_after_first_chunk).unwrap_err();

        assert!(matches!(err, CombineError::Parallel(_)));
        let kept = std::fs::read(&out).unwrap();
        assert_eq!(kept.len(), 16);
        assert_eq!(&kept[..8], &[1, 1, 1, 1, 2, 2, 2, 2]);
        assert!(kept[8..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_output_directory_rejected_and_left_alone() {
        let dir = tempdir().unwrap();
        let (a, b) = write_pair(dir.path());
        let out = dir.path().join("out.bin");
        std::fs::create_dir(&out).unwrap();

        let err = combine_files(&a, &b, &out, &quiet_config(4, 1)).unwrap_err();

        assert!(matches!(err, CombineError::Config(_)));
        assert!(out.is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn test_hard_linked_output_rejected() {
        let dir = tempdir().unwrap();
        let (a, b) = write_pair(dir.path());
        let out = dir.path().join("out.bin");
        std::fs::hard_link(&a, &out).unwrap();

        let err = combine_files(&a, &b, &out, &quiet_config(4, 1)).unwrap_err();

        assert!(matches!(err, CombineError::Config(_)));
        assert_eq!(std::fs::read(&a).unwrap(), vec![1u8; 8]);
        assert!(out.exists());
    }

    #[test]
    fn test_same_file_detection() {
        let dir = tempdir().unwrap();
        let (a, b) = write_pair(dir.path());

        assert!(is_same_file(&a, &a));
        assert!(is_same_file(&a, &dir.path().join(".").join("a.bin")));
        assert!(!is_same_file(&a, &b));
        assert!(!is_same_file(&a, &dir.path().join("missing.bin")));
    }
}
