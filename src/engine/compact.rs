//! Phase B: prefix-sum addressing and the parallel gather into dense buffers.

use super::shared::SharedSlice;
use crate::partition::ThreadContext;

/// Exclusive prefix sum of `counts` into `addresses`, which ends up with
/// `counts.len() + 1` entries. Returns the total.
pub(crate) fn prefix_sum(counts: &[u32], addresses: &mut Vec<u32>) -> u32 {
    addresses.clear();
    addresses.reserve(counts.len() + 1);
    addresses.push(0);
    let mut sum = 0u32;
    for &count in counts {
        sum += count;
        addresses.push(sum);
    }
    sum
}

/// One sparse-to-dense stream: package `p`'s run starts at `p * stride` in
/// `sparse` and lands at `addresses[p]` in `dense`.
pub(super) struct GatherStream<'a, T> {
    pub(super) sparse: &'a [T],
    pub(super) stride: usize,
    pub(super) counts: &'a [u32],
    pub(super) addresses: &'a [u32],
    pub(super) dense: SharedSlice<'a, T>,
}

impl<T: Copy + Send + Sync> GatherStream<'_, T> {
    #[inline]
    fn gather_package(&self, package: usize) {
        let count = self.counts[package] as usize;
        if count == 0 {
            return;
        }
        let src_start = package * self.stride;
        let dst_start = self.addresses[package] as usize;
        debug_assert_eq!(
            self.addresses[package + 1] as usize,
            dst_start + count,
            "address table disagrees with package count"
        );

        // Safety: `[addresses[p], addresses[p + 1])` ranges are disjoint across
        // packages and each package is gathered by exactly one worker.
        let dst = unsafe { self.dense.slice_mut(dst_start..dst_start + count) };
        dst.copy_from_slice(&self.sparse[src_start..src_start + count]);
    }
}

/// Drain compaction packages; each covers a range of clip packages whose runs
/// are copied to their precomputed dense offsets.
#[cfg_attr(feature = "profiling", inline(never))]
pub(super) fn threaded_compact<A, B>(
    thread_ctx: &ThreadContext<'_>,
    vertices: &GatherStream<'_, A>,
    pass_through: &GatherStream<'_, B>,
) where
    A: Copy + Send + Sync,
    B: Copy + Send + Sync,
{
    for cursor in thread_ctx.packages() {
        for package in cursor.item_range() {
            vertices.gather_package(package);
            pass_through.gather_package(package);
        }
    }
}
