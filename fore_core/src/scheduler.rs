use std::mem::size_of;

use log::trace;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::field::FieldElement;

const ELEMENT_BYTES: usize = size_of::<FieldElement>();
const DEFAULT_MIN_CHUNK_BYTES: usize = 4 * 1024;
const DEFAULT_TARGET_CHUNK_BYTES: usize = 256 * 1024;

/// Chunking tunables, passed explicitly so dispatch does not depend on
/// process-wide state. Lengths are counted in elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerParams {
    pub min_chunk_len: usize,
    pub target_chunk_len: usize,
    pub workers: usize,
    /// Forces a partition into at most this many chunks, ignoring the
    /// min/target bounds.
    pub chunk_count: Option<usize>,
}

impl SchedulerParams {
    pub const fn new(min_chunk_len: usize, target_chunk_len: usize, workers: usize) -> Self {
        Self {
            min_chunk_len,
            target_chunk_len,
            workers,
            chunk_count: None,
        }
    }

    /// Single chunk, no fan-out.
    pub const fn sequential() -> Self {
        Self {
            min_chunk_len: usize::MAX,
            target_chunk_len: usize::MAX,
            workers: 1,
            chunk_count: Some(1),
        }
    }

    pub fn with_chunk_count(mut self, chunks: usize) -> Self {
        self.chunk_count = Some(chunks.max(1));
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Chunk length for a buffer of `len` elements: an even split across
    /// workers, clamped to `[min_chunk_len, target_chunk_len]`.
    pub fn chunk_len(&self, len: usize) -> usize {
        if len == 0 {
            return 1;
        }
        if let Some(count) = self.chunk_count {
            return len.div_ceil(count.max(1)).max(1);
        }
        let min = self.min_chunk_len.max(1);
        let target = self.target_chunk_len.max(min);
        len.div_ceil(self.workers.max(1)).clamp(min, target)
    }
}

impl Default for SchedulerParams {
    fn default() -> Self {
        Self::new(
            DEFAULT_MIN_CHUNK_BYTES / ELEMENT_BYTES,
            DEFAULT_TARGET_CHUNK_BYTES / ELEMENT_BYTES,
            rayon::current_num_threads(),
        )
    }
}

/// Contiguous index range `[start, end)` of a buffer. A range with
/// `end <= start` is empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Chunk {
    pub start: usize,
    pub end: usize,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DispatchSummary {
    pub elements: usize,
    pub chunk_len: usize,
    pub chunks: usize,
}

/// Fork-join executor over disjoint chunks. Every dispatch blocks until all
/// chunks have completed.
#[derive(Clone, Debug, Default)]
pub struct ChunkScheduler {
    params: SchedulerParams,
}

impl ChunkScheduler {
    pub fn new(params: SchedulerParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &SchedulerParams {
        &self.params
    }

    pub fn partition(&self, len: usize) -> Vec<Chunk> {
        if len == 0 {
            return Vec::new();
        }
        let chunk_len = self.params.chunk_len(len);
        (0..len)
            .step_by(chunk_len)
            .map(|start| Chunk {
                start,
                end: (start + chunk_len).min(len),
            })
            .collect()
    }

    /// Runs `op` once per chunk with the chunk's absolute range.
    /// Returns `None` for an empty slice.
    pub fn for_each_chunk<T, F>(&self, data: &mut [T], op: F) -> Option<DispatchSummary>
    where
        T: Send,
        F: Fn(Chunk, &mut [T]) + Sync + Send,
    {
        if data.is_empty() {
            return None;
        }
        let len = data.len();
        let chunk_len = self.params.chunk_len(len);
        let chunks = len.div_ceil(chunk_len);
        trace!("dispatch len={len} chunk_len={chunk_len} chunks={chunks}");
        if chunks == 1 {
            op(Chunk { start: 0, end: len }, data);
        } else {
            data.par_chunks_mut(chunk_len)
                .enumerate()
                .for_each(|(index, slice)| {
                    let start = index * chunk_len;
                    op(
                        Chunk {
                            start,
                            end: start + slice.len(),
                        },
                        slice,
                    );
                });
        }
        Some(DispatchSummary {
            elements: len,
            chunk_len,
            chunks,
        })
    }

    /// Runs `op(absolute_index, element)` for every element.
    pub fn for_each_indexed<T, F>(&self, data: &mut [T], op: F) -> Option<DispatchSummary>
    where
        T: Send,
        F: Fn(usize, &mut T) + Sync + Send,
    {
        self.for_each_chunk(data, |chunk, slice| {
            for (offset, value) in slice.iter_mut().enumerate() {
                op(chunk.start + offset, value);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn assert_exact_partition(chunks: &[Chunk], len: usize) {
        let mut cursor = 0;
        for chunk in chunks {
            assert_eq!(chunk.start, cursor);
            assert!(!chunk.is_empty());
            cursor = chunk.end;
        }
        assert_eq!(cursor, len);
    }

    #[test]
    fn partition_covers_range() {
        for len in [1usize, 2, 7, 63, 64, 65, 1000, 4097] {
            for count in [1usize, 4, 64] {
                let params = SchedulerParams::default().with_chunk_count(count);
                let chunks = ChunkScheduler::new(params).partition(len);
                assert_exact_partition(&chunks, len);
                assert!(chunks.len() <= count);
            }
            let adaptive = ChunkScheduler::new(SchedulerParams::new(4, 16, 3));
            assert_exact_partition(&adaptive.partition(len), len);
        }
        assert!(ChunkScheduler::default().partition(0).is_empty());
    }

    #[test]
    fn inverted_chunk_is_empty() {
        let inverted = Chunk { start: 5, end: 2 };
        assert_eq!(inverted.len(), 0);
        assert!(inverted.is_empty());
        assert_eq!(Chunk { start: 2, end: 5 }.len(), 3);
    }

    #[test]
    fn dispatched_ranges_match_partition() {
        let configs = [
            SchedulerParams::default().with_chunk_count(1),
            SchedulerParams::default().with_chunk_count(4),
            SchedulerParams::default().with_chunk_count(64),
            SchedulerParams::new(4, 16, 3),
            SchedulerParams::sequential(),
        ];
        for params in configs {
            let scheduler = ChunkScheduler::new(params);
            for len in [1usize, 7, 64, 65, 1000, 4097] {
                let seen = Mutex::new(Vec::new());
                let mut data = vec![0u8; len];
                let summary = scheduler
                    .for_each_chunk(&mut data, |chunk, slice| {
                        assert_eq!(chunk.len(), slice.len());
                        seen.lock().unwrap().push(chunk);
                    })
                    .unwrap();
                let mut dispatched = seen.into_inner().unwrap();
                dispatched.sort_by_key(|chunk| chunk.start);
                assert_eq!(dispatched, scheduler.partition(len));
                assert_eq!(summary.chunks, dispatched.len());
            }
        }
    }

    #[test]
    fn chunk_len_respects_bounds() {
        let params = SchedulerParams::new(8, 32, 4);
        assert_eq!(params.chunk_len(4), 8);
        assert_eq!(params.chunk_len(64), 16);
        assert_eq!(params.chunk_len(10_000), 32);
        let inverted = SchedulerParams::new(16, 4, 2);
        assert_eq!(inverted.chunk_len(100), 16);
    }

    #[test]
    fn default_bounds_in_elements() {
        let params = SchedulerParams::default();
        assert_eq!(params.min_chunk_len, 512);
        assert_eq!(params.target_chunk_len, 32 * 1024);
        assert!(params.workers >= 1);
    }

    #[test]
    fn empty_dispatch_is_absent() {
        let mut data: Vec<u32> = Vec::new();
        let summary = ChunkScheduler::default().for_each_indexed(&mut data, |_, v| *v += 1);
        assert!(summary.is_none());
    }

    #[test]
    fn indexed_dispatch_sees_absolute_positions() {
        for count in [1usize, 4, 64] {
            let scheduler = ChunkScheduler::new(SchedulerParams::default().with_chunk_count(count));
            let mut data = vec![0usize; 1001];
            let summary = scheduler
                .for_each_indexed(&mut data, |i, v| *v = i)
                .unwrap();
            assert_eq!(summary.elements, 1001);
            assert_eq!(summary.chunks, scheduler.partition(1001).len());
            assert!(data.iter().enumerate().all(|(i, v)| *v == i));
        }
    }

    #[test]
    fn every_chunk_runs_before_return() {
        let scheduler = ChunkScheduler::new(SchedulerParams::default().with_chunk_count(64));
        let seen = AtomicUsize::new(0);
        let mut data = vec![1u8; 640];
        let summary = scheduler
            .for_each_chunk(&mut data, |chunk, slice| {
                assert_eq!(chunk.len(), slice.len());
                seen.fetch_add(slice.len(), Ordering::SeqCst);
            })
            .unwrap();
        assert_eq!(summary.chunks, 64);
        assert_eq!(seen.load(Ordering::SeqCst), 640);
    }

    #[test]
    fn params_serde_roundtrip() {
        let params = SchedulerParams::new(16, 256, 2).with_chunk_count(4);
        let encoded = serde_json::to_string(&params).unwrap();
        let decoded: SchedulerParams = serde_json::from_str(&encoded).unwrap();
        assert_eq!(params, decoded);
    }
}
