//! Per-call input to the engine: the primitive batch, its vertex source and
//! the shared statistics sink.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::{CullMode, PrimitiveTopology, VsOutput};

/// Read-only access to the shaded vertices of an assembled primitive batch.
///
/// Primitive `p` of size `s` uses flat indices `p * s .. p * s + s`.
/// Implementations are queried concurrently from every worker.
pub trait VertexSource: Sync {
    /// Number of addressable vertices.
    fn vertex_count(&self) -> usize;

    /// Vertex record at a flat index. Callers only pass indices below
    /// [`vertex_count`](Self::vertex_count).
    fn fetch(&self, index: usize) -> &VsOutput;
}

impl VertexSource for [VsOutput] {
    #[inline]
    fn vertex_count(&self) -> usize {
        self.len()
    }

    #[inline]
    fn fetch(&self, index: usize) -> &VsOutput {
        &self[index]
    }
}

impl VertexSource for Vec<VsOutput> {
    #[inline]
    fn vertex_count(&self) -> usize {
        self.len()
    }

    #[inline]
    fn fetch(&self, index: usize) -> &VsOutput {
        &self[index]
    }
}

/// Pipeline statistics touched by geometry setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatCounter {
    /// Triangles handed to the clipper.
    ClipInvocations,
    /// Triangles emitted by the stage (clipped fan triangles plus accepted triangles).
    ClipPrimitives,
    /// Triangles discarded by the guard-band reject test.
    GuardBandRejected,
    /// Triangles that passed the guard-band accept test without clipping.
    GuardBandAccepted,
    /// Triangles discarded by face culling.
    Culled,
}

const NUM_COUNTERS: usize = 5;

impl StatCounter {
    pub const ALL: [StatCounter; NUM_COUNTERS] = [
        StatCounter::ClipInvocations,
        StatCounter::ClipPrimitives,
        StatCounter::GuardBandRejected,
        StatCounter::GuardBandAccepted,
        StatCounter::Culled,
    ];

    #[inline]
    fn slot(self) -> usize {
        match self {
            StatCounter::ClipInvocations => 0,
            StatCounter::ClipPrimitives => 1,
            StatCounter::GuardBandRejected => 2,
            StatCounter::GuardBandAccepted => 3,
            StatCounter::Culled => 4,
        }
    }
}

/// Shared statistics accumulator, safe for concurrent updates from workers.
#[derive(Debug, Default)]
pub struct PipelineStatistics {
    counters: [AtomicU64; NUM_COUNTERS],
}

/// Point-in-time copy of [`PipelineStatistics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStatisticsSnapshot {
    pub clip_invocations: u64,
    pub clip_primitives: u64,
    pub guard_band_rejected: u64,
    pub guard_band_accepted: u64,
    pub culled: u64,
}

impl PipelineStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn accumulate(&self, counter: StatCounter, delta: u64) {
        if delta != 0 {
            self.counters[counter.slot()].fetch_add(delta, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn get(&self, counter: StatCounter) -> u64 {
        self.counters[counter.slot()].load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> PipelineStatisticsSnapshot {
        PipelineStatisticsSnapshot {
            clip_invocations: self.get(StatCounter::ClipInvocations),
            clip_primitives: self.get(StatCounter::ClipPrimitives),
            guard_band_rejected: self.get(StatCounter::GuardBandRejected),
            guard_band_accepted: self.get(StatCounter::GuardBandAccepted),
            culled: self.get(StatCounter::Culled),
        }
    }

    /// Zero every counter and return the values they held.
    pub fn take(&self) -> PipelineStatisticsSnapshot {
        let mut values = [0u64; NUM_COUNTERS];
        for (value, counter) in values.iter_mut().zip(self.counters.iter()) {
            *value = counter.swap(0, Ordering::Relaxed);
        }
        PipelineStatisticsSnapshot {
            clip_invocations: values[0],
            clip_primitives: values[1],
            guard_band_rejected: values[2],
            guard_band_accepted: values[3],
            culled: values[4],
        }
    }
}

/// One primitive batch, borrowed for the duration of an `execute` call.
pub struct SetupContext<'a, V: VertexSource + ?Sized> {
    pub topology: PrimitiveTopology,
    pub primitive_count: usize,
    pub vertices: &'a V,
    pub cull: CullMode,
    pub stats: Option<&'a PipelineStatistics>,
}

impl<'a, V: VertexSource + ?Sized> SetupContext<'a, V> {
    /// A triangle-list batch covering every complete triangle in `vertices`,
    /// with culling disabled and no statistics sink.
    pub fn triangles(vertices: &'a V) -> Self {
        Self {
            topology: PrimitiveTopology::TriangleList,
            primitive_count: vertices.vertex_count() / 3,
            vertices,
            cull: CullMode::None,
            stats: None,
        }
    }

    pub fn with_cull(mut self, cull: CullMode) -> Self {
        self.cull = cull;
        self
    }

    pub fn with_stats(mut self, stats: &'a PipelineStatistics) -> Self {
        self.stats = Some(stats);
        self
    }

    #[inline]
    pub fn primitive_size(&self) -> usize {
        self.topology.primitive_size()
    }

    #[inline]
    pub(crate) fn accumulate(&self, counter: StatCounter, delta: u64) {
        if let Some(stats) = self.stats {
            stats.accumulate(counter, delta);
        }
    }
}
