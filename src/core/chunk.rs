/*!
 * Chunk partitioning
 *
 * Splits `[0, len)` into fixed-size, contiguous, non-overlapping ranges.
 * Only the last chunk may be shorter than the configured size. Chunk `i`
 * of the inputs lands at `[2 * start, 2 * start + 2 * len)` in the output,
 * so output ranges inherit the same disjointness.
 */

use std::ops::Range;

use crate::error::{CombineError, Result};

/// One unit of parallel work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkDescriptor {
    pub index: usize,
    pub start: u64,
    pub len: u64,
}

impl ChunkDescriptor {
    /// Byte range read from each input
    pub fn input_range(&self) -> Range<u64> {
        self.start..self.start + self.len
    }

    /// Byte range written in the output (block of A, then block of B)
    pub fn output_range(&self) -> Range<u64> {
        2 * self.start..2 * (self.start + self.len)
    }
}

/// Partition of an input length into chunk descriptors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    total_len: u64,
    chunk_size: u64,
}

impl ChunkPlan {
    pub fn new(total_len: u64, chunk_size: u64) -> Result<Self> {
        if chunk_size == 0 {
            return Err(CombineError::InvalidChunkSize);
        }
        Ok(Self {
            total_len,
            chunk_size,
        })
    }

    pub fn total_len(&self) -> u64 {
        self.total_len
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Number of chunks, counting a trailing partial one
    pub fn chunk_count(&self) -> usize {
        self.total_len.div_ceil(self.chunk_size) as usize
    }

    /// Length of the trailing partial chunk, if there is one
    pub fn remainder(&self) -> Option<u64> {
        match self.total_len % self.chunk_size {
            0 => None,
            rem => Some(rem),
        }
    }

    pub fn get(&self, index: usize) -> Option<ChunkDescriptor> {
        let start = (index as u64).checked_mul(self.chunk_size)?;
        if start >= self.total_len {
            return None;
        }
        Some(ChunkDescriptor {
            index,
            start,
            len: self.chunk_size.min(self.total_len - start),
        })
    }

    pub fn iter(&self) -> ChunkIter {
        ChunkIter {
            plan: *self,
            next: 0,
        }
    }
}

impl IntoIterator for &ChunkPlan {
    type Item = ChunkDescriptor;
    type IntoIter = ChunkIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the chunks of a plan, in offset order
#[derive(Debug, Clone)]
pub struct ChunkIter {
    plan: ChunkPlan,
    next: usize,
}

impl Iterator for ChunkIter {
    type Item = ChunkDescriptor;

    fn next(&mut self) -> Option<Self::Item> {
        let chunk = self.plan.get(self.next)?;
        self.next += 1;
        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.plan.chunk_count().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ChunkIter {}
