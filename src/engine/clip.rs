//! Phase A: guard-band classification and clipping, one package at a time.

use super::shared::SharedSlice;
use crate::clipper::{is_culled, ClipTriangle, Clipper, MAX_CLIPPED_VERTICES};
use crate::context::{SetupContext, StatCounter, VertexSource};
use crate::guard_band::{classify, GuardBandClass};
use crate::partition::ThreadContext;
use crate::vertex_pool::{PrimitiveSlots, POOL_SLOTS_PER_PRIMITIVE};
use crate::{PassThroughPolicy, VertexHandle, VsOutput};

/// Per-worker counters, merged by the engine after the join.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ClipCounters {
    pub(crate) clip_invocations: u64,
    pub(crate) emitted_triangles: u64,
    pub(crate) rejected: u64,
    pub(crate) accepted: u64,
    pub(crate) culled: u64,
}

impl ClipCounters {
    pub(crate) fn merge(&mut self, other: &ClipCounters) {
        self.clip_invocations += other.clip_invocations;
        self.emitted_triangles += other.emitted_triangles;
        self.rejected += other.rejected;
        self.accepted += other.accepted;
        self.culled += other.culled;
    }

    fn publish<V: VertexSource + ?Sized>(&self, ctx: &SetupContext<'_, V>) {
        ctx.accumulate(StatCounter::ClipInvocations, self.clip_invocations);
        ctx.accumulate(StatCounter::ClipPrimitives, self.emitted_triangles);
        ctx.accumulate(StatCounter::GuardBandRejected, self.rejected);
        ctx.accumulate(StatCounter::GuardBandAccepted, self.accepted);
        ctx.accumulate(StatCounter::Culled, self.culled);
    }
}

/// Buffers written during Phase A, all addressed by package ownership.
pub(super) struct ClipTargets<'a> {
    /// `primitive_count * MAX_CLIPPED_VERTICES` handle slots.
    pub(super) clipped_verts: SharedSlice<'a, VertexHandle>,
    /// One vertex count per package.
    pub(super) package_counts: SharedSlice<'a, u32>,
    /// `primitive_count` primitive-index slots.
    pub(super) pass_through: SharedSlice<'a, u32>,
    /// One pass-through count per package.
    pub(super) pass_through_counts: SharedSlice<'a, u32>,
    /// Vertex pool storage, `POOL_SLOTS_PER_PRIMITIVE` slots per primitive.
    pub(super) pool_slots: SharedSlice<'a, VsOutput>,
}

#[derive(Debug, Clone, Copy)]
pub(super) struct ClipParams {
    pub(super) guard_band_scale: f32,
    pub(super) pass_through: PassThroughPolicy,
    /// Generation stamped into pool handles created by this call.
    pub(super) pool_generation: u32,
}

/// Drain clip packages until none remain.
///
/// Primitive `i` may write handles only inside `[i * 9, i * 9 + 9)` worth of
/// room; within a package they are packed from the package's first slot, so
/// each package's output is one contiguous run starting at
/// `first_primitive * 9`. New vertices of primitive `i` go to pool slots
/// `[i * 4, i * 4 + 4)`.
#[cfg_attr(feature = "profiling", inline(never))]
pub(super) fn threaded_clip<V, C>(
    thread_ctx: &ThreadContext<'_>,
    ctx: &SetupContext<'_, V>,
    clipper: &C,
    params: ClipParams,
    targets: &ClipTargets<'_>,
) -> ClipCounters
where
    V: VertexSource + ?Sized,
    C: Clipper,
{
    debug_assert_eq!(ctx.primitive_size(), 3, "only triangles reach the clip phase");

    let mut counters = ClipCounters::default();

    for cursor in thread_ctx.packages() {
        let prims = cursor.item_range();
        let package = cursor.package_index();

        // Safety: `package` was claimed exactly once, and these ranges are
        // derived only from its primitive range.
        let clipped = unsafe {
            targets
                .clipped_verts
                .slice_mut(prims.start * MAX_CLIPPED_VERTICES..prims.end * MAX_CLIPPED_VERTICES)
        };
        let pass_through = unsafe { targets.pass_through.slice_mut(prims.clone()) };

        let mut num_verts = 0usize;
        let mut num_pass_through = 0usize;

        for prim in prims {
            let base = prim * 3;
            let handles = [
                VertexHandle::source(base as u32),
                VertexHandle::source(base as u32 + 1),
                VertexHandle::source(base as u32 + 2),
            ];
            let vertices = [
                ctx.vertices.fetch(base),
                ctx.vertices.fetch(base + 1),
                ctx.vertices.fetch(base + 2),
            ];
            let positions = [
                vertices[0].position,
                vertices[1].position,
                vertices[2].position,
            ];

            match classify(positions, params.guard_band_scale) {
                GuardBandClass::Reject => {
                    counters.rejected += 1;
                }
                GuardBandClass::Accept => {
                    counters.accepted += 1;
                    if is_culled(&positions, ctx.cull) {
                        counters.culled += 1;
                        continue;
                    }
                    counters.emitted_triangles += 1;
                    match params.pass_through {
                        PassThroughPolicy::Merge => {
                            clipped[num_verts..num_verts + 3].copy_from_slice(&handles);
                            num_verts += 3;
                        }
                        PassThroughPolicy::Separate => {
                            pass_through[num_pass_through] = prim as u32;
                            num_pass_through += 1;
                        }
                    }
                }
                GuardBandClass::Clip => {
                    counters.clip_invocations += 1;
                    let tri = ClipTriangle { handles, vertices };
                    let out = &mut clipped[num_verts..num_verts + MAX_CLIPPED_VERTICES];
                    let slot_base = prim * POOL_SLOTS_PER_PRIMITIVE;
                    // Safety: `prim` belongs to the claimed package.
                    let window = unsafe {
                        targets
                            .pool_slots
                            .slice_mut(slot_base..slot_base + POOL_SLOTS_PER_PRIMITIVE)
                    };
                    let mut slots =
                        PrimitiveSlots::new(params.pool_generation, slot_base, window);
                    let result = clipper.clip(&tri, ctx.cull, &mut slots, out);
                    let mut emitted = result.num_vertices;
                    if emitted > MAX_CLIPPED_VERTICES {
                        log::warn!(
                            "clipper reported {} vertices for primitive {}, keeping {}",
                            emitted,
                            prim,
                            MAX_CLIPPED_VERTICES
                        );
                        emitted = MAX_CLIPPED_VERTICES;
                    }
                    if result.culled {
                        counters.culled += 1;
                    }
                    num_verts += emitted;
                    counters.emitted_triangles += (emitted / 3) as u64;
                }
            }
        }

        // Safety: the count slots belong to the claimed package.
        unsafe {
            targets.package_counts.write(package, num_verts as u32);
            targets
                .pass_through_counts
                .write(package, num_pass_through as u32);
        }
    }

    counters.publish(ctx);
    counters
}
