/*!
 * Block interleaving
 *
 * Chunk `c` of the first input is written at `2 * c.start` in the output and
 * the same chunk of the second input right after it. The parallel driver
 * never hands the whole output to a worker: the arena is split into one
 * disjoint `&mut [u8]` slot per chunk before any worker starts.
 */

use rayon::prelude::*;
use rayon::ThreadPool;
use tracing::trace;

use super::chunk::{ChunkDescriptor, ChunkPlan};
use crate::error::{CombineError, Result};

/// Callback invoked once per finished chunk, from whichever thread copied it
pub type ChunkObserver<'a> = &'a (dyn Fn(&ChunkDescriptor) + Sync);

fn check_inputs(first: &[u8], second: &[u8], chunk: &ChunkDescriptor) -> Result<()> {
    let end = chunk.input_range().end;
    let available = first.len().min(second.len()) as u64;
    if end > available {
        return Err(CombineError::ChunkOutOfBounds {
            start: chunk.start,
            len: chunk.len,
            available,
        });
    }
    Ok(())
}

/// Copy one chunk of each input into its place in the full output view
///
/// Touches only `[2 * start, 2 * start + 2 * len)` of `out`.
pub fn copy_chunk(
    first: &[u8],
    second: &[u8],
    out: &mut [u8],
    chunk: &ChunkDescriptor,
) -> Result<()> {
    check_inputs(first, second, chunk)?;

    let out_range = chunk.output_range();
    if out_range.end > out.len() as u64 {
        return Err(CombineError::ChunkOutOfBounds {
            start: out_range.start,
            len: 2 * chunk.len,
            available: out.len() as u64,
        });
    }

    let region = &mut out[out_range.start as usize..out_range.end as usize];
    write_pair(first, second, region, chunk);
    Ok(())
}

// Caller has checked bounds on every slice
fn write_pair(first: &[u8], second: &[u8], region: &mut [u8], chunk: &ChunkDescriptor) {
    let input = chunk.input_range();
    let (start, end) = (input.start as usize, input.end as usize);
    let (a, b) = region.split_at_mut(chunk.len as usize);
    a.copy_from_slice(&first[start..end]);
    b.copy_from_slice(&second[start..end]);
    trace!(chunk = chunk.index, start = chunk.start, len = chunk.len, "chunk copied");
}

/// Exclusive window onto the output bytes owned by one chunk
#[derive(Debug)]
pub struct ChunkSlot<'a> {
    chunk: ChunkDescriptor,
    region: &'a mut [u8],
}

impl ChunkSlot<'_> {
    pub fn chunk(&self) -> &ChunkDescriptor {
        &self.chunk
    }

    /// Copy this slot's chunk of both inputs into the slot
    pub fn fill(self, first: &[u8], second: &[u8]) -> Result<()> {
        check_inputs(first, second, &self.chunk)?;
        write_pair(first, second, self.region, &self.chunk);
        Ok(())
    }
}

/// Split the output arena into one disjoint slot per chunk of `plan`
pub fn split_output<'a>(out: &'a mut [u8], plan: &ChunkPlan) -> Result<Vec<ChunkSlot<'a>>> {
    let needed = 2 * plan.total_len();
    if (out.len() as u64) < needed {
        return Err(CombineError::ChunkOutOfBounds {
            start: 0,
            len: needed,
            available: out.len() as u64,
        });
    }

    let mut slots = Vec::with_capacity(plan.chunk_count());
    let mut rest = out;
    for chunk in plan {
        let (region, tail) = std::mem::take(&mut rest).split_at_mut(2 * chunk.len as usize);
        slots.push(ChunkSlot { chunk, region });
        rest = tail;
    }
    Ok(slots)
}

/// Copy every chunk on the calling thread, in offset order
pub fn interleave_serial(
    first: &[u8],
    second: &[u8],
    out: &mut [u8],
    plan: &ChunkPlan,
    on_chunk: ChunkObserver<'_>,
) -> Result<()> {
    for chunk in plan {
        copy_chunk(first, second, out, &chunk)?;
        on_chunk(&chunk);
    }
    Ok(())
}

/// Copy every chunk on `pool` and return once all of them are done
///
/// The first failing chunk fails the whole call; chunks already running
/// finish, the rest are abandoned.
pub fn interleave_parallel(
    pool: &ThreadPool,
    first: &[u8],
    second: &[u8],
    out: &mut [u8],
    plan: &ChunkPlan,
    on_chunk: ChunkObserver<'_>,
) -> Result<()> {
    let slots = split_output(out, plan)?;

    pool.install(|| {
        slots.into_par_iter().try_for_each(|slot| {
            let chunk = *slot.chunk();
            slot.fill(first, second)?;
            on_chunk(&chunk);
            Ok(())
        })
    })
}
