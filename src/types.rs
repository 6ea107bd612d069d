//! Core types for geometry setup: vertex records, vertex handles, topology and culling.

use bytemuck::{Pod, Zeroable};
use glam::Vec4;

/// Maximum number of shader-defined interpolants carried by a [`VsOutput`].
pub const MAX_VS_OUTPUT_ATTRIBUTES: usize = 8;

/// Vertex shader output: a homogeneous clip-space position plus interpolants.
///
/// Records are 16-byte aligned so that a pool of them can be streamed with
/// aligned vector loads.
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VsOutput {
    /// Clip-space position `(x, y, z, w)`.
    pub position: Vec4,
    /// Interpolants; only the first `num_attributes` entries are meaningful.
    pub attributes: [Vec4; MAX_VS_OUTPUT_ATTRIBUTES],
    /// Number of live attributes.
    pub num_attributes: u32,
}

impl VsOutput {
    /// A vertex with a position and no interpolants.
    #[inline]
    pub fn new(position: Vec4) -> Self {
        Self {
            position,
            attributes: [Vec4::ZERO; MAX_VS_OUTPUT_ATTRIBUTES],
            num_attributes: 0,
        }
    }

    /// A vertex with a position and the given interpolants.
    ///
    /// # Panics
    ///
    /// Panics if more than [`MAX_VS_OUTPUT_ATTRIBUTES`] attributes are given.
    pub fn with_attributes(position: Vec4, attributes: &[Vec4]) -> Self {
        assert!(
            attributes.len() <= MAX_VS_OUTPUT_ATTRIBUTES,
            "too many vertex attributes: {} > {}",
            attributes.len(),
            MAX_VS_OUTPUT_ATTRIBUTES
        );
        let mut out = Self::new(position);
        out.attributes[..attributes.len()].copy_from_slice(attributes);
        out.num_attributes = attributes.len() as u32;
        out
    }

    #[inline]
    pub fn position(&self) -> Vec4 {
        self.position
    }

    /// The live interpolants.
    #[inline]
    pub fn attributes(&self) -> &[Vec4] {
        &self.attributes[..self.num_attributes as usize]
    }
}

impl Default for VsOutput {
    fn default() -> Self {
        Self::new(Vec4::ZERO)
    }
}

// Handle layout (u64):
//   bit 63        : 1 = pool vertex, 0 = source vertex
//   bits 31..63   : pool generation (32 bits, pool handles only)
//   bits 0..31    : pool slot
//   bits 0..32    : flat source index (source handles only)
const POOL_BIT: u64 = 1 << 63;
const GENERATION_SHIFT: u32 = 31;
const GENERATION_MASK: u64 = 0xFFFF_FFFF;
const SLOT_MASK: u64 = 0x7FFF_FFFF;
const SOURCE_INDEX_MASK: u64 = 0xFFFF_FFFF;

/// Number of pool slots a handle can address. The all-ones slot is withheld
/// so that no pool handle can alias [`VertexHandle::INVALID`].
pub const MAX_POOL_SLOTS: usize = SLOT_MASK as usize;

/// Opaque reference to a vertex record.
///
/// A handle either points back into the primitive batch (a *source* vertex,
/// borrowed) or into the engine's [`VertexPool`](crate::VertexPool) (a vertex
/// created by clipping, valid until the pool is reset). Pool slots are keyed
/// by primitive, so the bits of a handle depend only on the batch and the pool
/// generation. Two handles are equal exactly when they name the same vertex.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct VertexHandle(u64);

/// Decoded form of a [`VertexHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleKind {
    /// Flat index into the primitive batch's vertex source.
    Source { index: u32 },
    /// Slot in the vertex pool, tagged with the pool's generation.
    Pool { generation: u32, slot: u32 },
}

impl VertexHandle {
    /// Filler for unused buffer slots; never produced by a pool or a source.
    pub const INVALID: VertexHandle = VertexHandle(u64::MAX);

    #[inline]
    pub const fn source(index: u32) -> Self {
        Self(index as u64)
    }

    #[inline]
    pub(crate) fn pool(generation: u32, slot: u32) -> Self {
        debug_assert!((slot as usize) < MAX_POOL_SLOTS, "pool slot out of range");
        Self(
            POOL_BIT
                | ((generation as u64 & GENERATION_MASK) << GENERATION_SHIFT)
                | (slot as u64 & SLOT_MASK),
        )
    }

    #[inline]
    pub fn kind(self) -> HandleKind {
        if self.0 & POOL_BIT == 0 {
            HandleKind::Source {
                index: (self.0 & SOURCE_INDEX_MASK) as u32,
            }
        } else {
            HandleKind::Pool {
                generation: ((self.0 >> GENERATION_SHIFT) & GENERATION_MASK) as u32,
                slot: (self.0 & SLOT_MASK) as u32,
            }
        }
    }

    #[inline]
    pub fn is_source(self) -> bool {
        self.0 & POOL_BIT == 0
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }

    /// Raw packed representation.
    #[inline]
    pub fn to_bits(self) -> u64 {
        self.0
    }
}

impl std::fmt::Debug for VertexHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.is_valid() {
            return write!(f, "VertexHandle(INVALID)");
        }
        match self.kind() {
            HandleKind::Source { index } => write!(f, "VertexHandle(src:{})", index),
            HandleKind::Pool { generation, slot } => {
                write!(f, "VertexHandle(pool@{}:{})", generation, slot)
            }
        }
    }
}

/// How primitives were assembled from the vertex stream.
///
/// The vertex source handed to the engine is already assembled, so strips and
/// lists of the same primitive size are fetched identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    LineStrip,
    TriangleList,
    TriangleStrip,
}

impl PrimitiveTopology {
    /// Vertices per assembled primitive.
    #[inline]
    pub const fn primitive_size(self) -> usize {
        match self {
            PrimitiveTopology::PointList => 1,
            PrimitiveTopology::LineList | PrimitiveTopology::LineStrip => 2,
            PrimitiveTopology::TriangleList | PrimitiveTopology::TriangleStrip => 3,
        }
    }

    #[inline]
    pub const fn is_triangle(self) -> bool {
        self.primitive_size() == 3
    }
}

/// Which faces to discard. Front faces wind counter-clockwise in NDC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullMode {
    #[default]
    None,
    Front,
    Back,
}
