//! The clip-and-compact engine.
//!
//! `execute` runs two fork-join phases over the primitive batch:
//!
//! 1. **Clip**: packages of primitives are classified against the guard band
//!    and, where needed, clipped. Each package writes its output into its own
//!    stretch of an over-provisioned sparse buffer and records a count.
//! 2. **Compact**: counts are prefix-summed into addresses, and packages are
//!    gathered in parallel into one dense buffer in primitive order.
//!
//! Output order depends only on package indices, never on which worker
//! claimed a package, so results are deterministic for any thread count.

mod clip;
mod compact;
mod shared;

use clip::{threaded_clip, ClipCounters, ClipParams, ClipTargets};
use compact::{prefix_sum, threaded_compact, GatherStream};
use shared::SharedSlice;

use crate::clipper::{Clipper, FrustumClipper, MAX_CLIPPED_VERTICES};
use crate::context::{SetupContext, VertexSource};
use crate::partition::{compute_package_count, WorkerPool};
use crate::timing::{Timer, TimingBuilder};
use crate::types::HandleKind;
use crate::vertex_pool::MAX_POOL_PRIMITIVES;
use crate::{GeomSetupConfig, GeomSetupError, VertexHandle, VertexPool, VsOutput};

/// Default primitives per clip package.
pub const DEFAULT_CLIP_PACKAGE_SIZE: usize = 8;
/// Default clip packages per compaction package.
pub const DEFAULT_COMPACT_PACKAGE_SIZE: usize = 8;

/// Summary of one `execute` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetupStats {
    pub primitive_count: usize,
    pub package_count: usize,
    /// Triangles handed to the clipper.
    pub clip_invocations: u64,
    /// Triangles discarded by the guard-band reject test.
    pub rejected: u64,
    /// Triangles that needed no clipping.
    pub accepted: u64,
    /// Triangles discarded by face culling.
    pub culled: u64,
    /// Triangles emitted, counting both the dense stream and the pass-through list.
    pub emitted_triangles: u64,
    /// Length of the dense vertex stream.
    pub vertex_count: usize,
    /// Length of the pass-through list.
    pub pass_through_count: usize,
}

/// Geometry setup engine. Owns the worker pool, the vertex pool and every
/// intermediate buffer; all of them are reused across calls.
pub struct GeomSetupEngine<C: Clipper = FrustumClipper> {
    config: GeomSetupConfig,
    clipper: C,
    workers: WorkerPool,
    /// Vertices created by clipping, keyed by primitive.
    pool: VertexPool,

    package_count: usize,
    /// Sparse clip output, `MAX_CLIPPED_VERTICES` slots per primitive.
    clipped_verts: Vec<VertexHandle>,
    package_verts_count: Vec<u32>,
    compacted_addresses: Vec<u32>,
    compacted_verts: Vec<VertexHandle>,

    /// Sparse pass-through primitive indices, one slot per primitive.
    pass_through_sparse: Vec<u32>,
    package_pass_through_count: Vec<u32>,
    pass_through_addresses: Vec<u32>,
    pass_through: Vec<u32>,
}

impl GeomSetupEngine<FrustumClipper> {
    /// Engine with the default near/far [`FrustumClipper`].
    pub fn new(config: GeomSetupConfig) -> Result<Self, GeomSetupError> {
        Self::with_clipper(config, FrustumClipper::new())
    }
}

impl<C: Clipper> GeomSetupEngine<C> {
    pub fn with_clipper(config: GeomSetupConfig, clipper: C) -> Result<Self, GeomSetupError> {
        config.validate()?;
        let num_workers = config
            .worker_threads
            .unwrap_or_else(WorkerPool::available_workers);
        let workers = WorkerPool::new(num_workers)?;
        log::debug!(
            "geom setup engine: {} workers, clip package {}, compact package {}, guard band {}",
            workers.num_workers(),
            config.clip_package_size,
            config.compact_package_size,
            config.guard_band_scale
        );

        Ok(Self {
            config,
            clipper,
            workers,
            pool: VertexPool::new(),
            package_count: 0,
            clipped_verts: Vec::new(),
            package_verts_count: Vec::new(),
            compacted_addresses: vec![0],
            compacted_verts: Vec::new(),
            pass_through_sparse: Vec::new(),
            package_pass_through_count: Vec::new(),
            pass_through_addresses: vec![0],
            pass_through: Vec::new(),
        })
    }

    #[inline]
    pub fn config(&self) -> &GeomSetupConfig {
        &self.config
    }

    #[inline]
    pub fn clipper(&self) -> &C {
        &self.clipper
    }

    #[inline]
    pub fn num_workers(&self) -> usize {
        self.workers.num_workers()
    }

    /// Clip and compact one primitive batch.
    ///
    /// On success the dense vertex stream, its address table and the
    /// pass-through list describe this batch until the next call. Vertices
    /// created by a previous call stop resolving.
    pub fn execute<V>(&mut self, ctx: &SetupContext<'_, V>) -> Result<SetupStats, GeomSetupError>
    where
        V: VertexSource + ?Sized,
    {
        check_context(ctx)?;

        let mut tb = TimingBuilder::new();

        let t = Timer::start();
        self.prepare(ctx.primitive_count);
        tb.set_prepare(t.elapsed());

        let t = Timer::start();
        let counters = self.clip_geometries(ctx);
        tb.set_clip(t.elapsed());

        let t = Timer::start();
        self.compute_addresses();
        tb.set_prefix_sum(t.elapsed());

        let t = Timer::start();
        self.compact_geometries();
        tb.set_compact(t.elapsed());

        let timings = tb.finish();
        timings.report(ctx.primitive_count, self.compacted_verts.len());

        let stats = SetupStats {
            primitive_count: ctx.primitive_count,
            package_count: self.package_count,
            clip_invocations: counters.clip_invocations,
            rejected: counters.rejected,
            accepted: counters.accepted,
            culled: counters.culled,
            emitted_triangles: counters.emitted_triangles,
            vertex_count: self.compacted_verts.len(),
            pass_through_count: self.pass_through.len(),
        };
        log::trace!("geom setup: {:?}", stats);
        Ok(stats)
    }

    /// Size the buffers for `primitive_count` primitives and reset per-call state.
    fn prepare(&mut self, primitive_count: usize) {
        self.package_count = compute_package_count(primitive_count, self.config.clip_package_size);

        let sparse_len = primitive_count * MAX_CLIPPED_VERTICES;
        if self.clipped_verts.len() < sparse_len {
            log::debug!(
                "growing sparse clip buffer {} -> {} slots",
                self.clipped_verts.len(),
                sparse_len
            );
            self.clipped_verts.resize(sparse_len, VertexHandle::INVALID);
        }
        if self.pass_through_sparse.len() < primitive_count {
            self.pass_through_sparse.resize(primitive_count, u32::MAX);
        }

        self.package_verts_count.clear();
        self.package_verts_count.resize(self.package_count, 0);
        self.package_pass_through_count.clear();
        self.package_pass_through_count.resize(self.package_count, 0);

        self.pool.reset(primitive_count);
    }

    fn clip_geometries<V>(&mut self, ctx: &SetupContext<'_, V>) -> ClipCounters
    where
        V: VertexSource + ?Sized,
    {
        let (pool_generation, pool_slots) = self.pool.parts_mut();
        let params = ClipParams {
            guard_band_scale: self.config.guard_band_scale,
            pass_through: self.config.pass_through,
            pool_generation,
        };
        let targets = ClipTargets {
            clipped_verts: SharedSlice::new(&mut self.clipped_verts),
            package_counts: SharedSlice::new(&mut self.package_verts_count),
            pass_through: SharedSlice::new(&mut self.pass_through_sparse),
            pass_through_counts: SharedSlice::new(&mut self.package_pass_through_count),
            pool_slots: SharedSlice::new(pool_slots),
        };
        let clipper = &self.clipper;

        let mut units = vec![(); self.workers.num_workers()];
        let per_worker = self.workers.execute(
            ctx.primitive_count,
            self.config.clip_package_size,
            &mut units,
            |thread_ctx, _| threaded_clip(thread_ctx, ctx, clipper, params, &targets),
        );

        let mut counters = ClipCounters::default();
        for c in &per_worker {
            counters.merge(c);
        }
        counters
    }

    fn compute_addresses(&mut self) {
        let total = prefix_sum(&self.package_verts_count, &mut self.compacted_addresses);
        self.compacted_verts.clear();
        self.compacted_verts.resize(total as usize, VertexHandle::INVALID);

        let total = prefix_sum(
            &self.package_pass_through_count,
            &mut self.pass_through_addresses,
        );
        self.pass_through.clear();
        self.pass_through.resize(total as usize, u32::MAX);
    }

    fn compact_geometries(&mut self) {
        let clip_package_size = self.config.clip_package_size;
        let vertices = GatherStream {
            sparse: &self.clipped_verts,
            stride: clip_package_size * MAX_CLIPPED_VERTICES,
            counts: &self.package_verts_count,
            addresses: &self.compacted_addresses,
            dense: SharedSlice::new(&mut self.compacted_verts),
        };
        let pass_through = GatherStream {
            sparse: &self.pass_through_sparse,
            stride: clip_package_size,
            counts: &self.package_pass_through_count,
            addresses: &self.pass_through_addresses,
            dense: SharedSlice::new(&mut self.pass_through),
        };

        let mut units = vec![(); self.workers.num_workers()];
        self.workers.execute(
            self.package_count,
            self.config.compact_package_size,
            &mut units,
            |thread_ctx, _| threaded_compact(thread_ctx, &vertices, &pass_through),
        );
    }

    /// Dense, gap-free vertex stream of the last call, three handles per
    /// triangle in primitive order.
    #[inline]
    pub fn compacted_vertices(&self) -> &[VertexHandle] {
        &self.compacted_verts
    }

    /// The dense stream as raw packed words.
    #[inline]
    pub fn compacted_raw(&self) -> &[u64] {
        bytemuck::cast_slice(&self.compacted_verts)
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.compacted_verts.len()
    }

    /// `package_count + 1` offsets into [`compacted_vertices`](Self::compacted_vertices).
    #[inline]
    pub fn compacted_addresses(&self) -> &[u32] {
        &self.compacted_addresses
    }

    /// Per-package vertex counts of the last call.
    #[inline]
    pub fn package_vertex_counts(&self) -> &[u32] {
        &self.package_verts_count
    }

    #[inline]
    pub fn package_count(&self) -> usize {
        self.package_count
    }

    /// Handles written by clip package `package`, read back through the
    /// address table.
    pub fn package_vertices(&self, package: usize) -> &[VertexHandle] {
        let start = self.compacted_addresses[package] as usize;
        let end = self.compacted_addresses[package + 1] as usize;
        &self.compacted_verts[start..end]
    }

    /// Primitive indices of triangles accepted without clipping, in primitive
    /// order. Empty under [`PassThroughPolicy::Merge`](crate::PassThroughPolicy::Merge).
    #[inline]
    pub fn pass_through_primitives(&self) -> &[u32] {
        &self.pass_through
    }

    /// Vertices created by clipping during the last call.
    #[inline]
    pub fn vertex_pool(&self) -> &VertexPool {
        &self.pool
    }

    /// Look up the record behind a handle from the last call.
    ///
    /// Source handles resolve through `source`, which must be the batch's
    /// vertex source. Pool handles from an earlier call return `None`, up to
    /// the pool's 32-bit generation: a handle kept across exactly 2^32 calls
    /// resolves again (see [`VertexPool::reset`]).
    pub fn resolve<'a, V>(&'a self, source: &'a V, handle: VertexHandle) -> Option<&'a VsOutput>
    where
        V: VertexSource + ?Sized,
    {
        if !handle.is_valid() {
            return None;
        }
        match handle.kind() {
            HandleKind::Source { index } => {
                let index = index as usize;
                (index < source.vertex_count()).then(|| source.fetch(index))
            }
            HandleKind::Pool { .. } => self.pool.get(handle),
        }
    }
}

impl<C: Clipper> std::fmt::Debug for GeomSetupEngine<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeomSetupEngine")
            .field("config", &self.config)
            .field("workers", &self.workers)
            .field("package_count", &self.package_count)
            .field("vertex_count", &self.compacted_verts.len())
            .field("pass_through", &self.pass_through.len())
            .finish()
    }
}

fn check_context<V: VertexSource + ?Sized>(
    ctx: &SetupContext<'_, V>,
) -> Result<(), GeomSetupError> {
    if !ctx.topology.is_triangle() {
        return Err(GeomSetupError::UnsupportedTopology(ctx.topology));
    }
    // Dense addresses are u32 and pool slots must fit in a handle.
    ctx.primitive_count
        .checked_mul(MAX_CLIPPED_VERTICES)
        .filter(|&n| n <= u32::MAX as usize && ctx.primitive_count <= MAX_POOL_PRIMITIVES)
        .ok_or(GeomSetupError::TooManyPrimitives(ctx.primitive_count))?;

    let required = ctx.primitive_count * ctx.primitive_size();
    let available = ctx.vertices.vertex_count();
    if required > available {
        return Err(GeomSetupError::VertexSourceTooSmall {
            required,
            available,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests;
