//! Per-call arena for vertices created by clipping.
//!
//! Each primitive owns a fixed window of [`POOL_SLOTS_PER_PRIMITIVE`] slots at
//! `primitive * POOL_SLOTS_PER_PRIMITIVE`. Which worker clips a primitive has
//! no effect on where its vertices land, so handles are reproducible.

use crate::types::{HandleKind, MAX_POOL_SLOTS};
use crate::{VertexHandle, VsOutput};

/// Pool slots reserved for each primitive. Each of the two clip planes adds
/// at most two vertices to a convex polygon.
pub const POOL_SLOTS_PER_PRIMITIVE: usize = 4;

/// Largest primitive count whose slot windows fit in a handle.
pub const MAX_POOL_PRIMITIVES: usize = MAX_POOL_SLOTS / POOL_SLOTS_PER_PRIMITIVE;

/// Arena of [`VsOutput`] records owned by the engine.
///
/// Vertices are never freed individually. [`reset`](Self::reset) drops all of
/// them at once and advances the generation, so handles issued before the
/// reset stop resolving instead of silently aliasing new vertices.
#[derive(Debug, Default)]
pub struct VertexPool {
    generation: u32,
    primitives: usize,
    vertices: Vec<VsOutput>,
}

impl VertexPool {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Number of primitives with a slot window since the last reset.
    #[inline]
    pub fn primitive_count(&self) -> usize {
        self.primitives
    }

    /// Invalidate all outstanding handles and lay out one slot window per
    /// primitive.
    ///
    /// The generation is a wrapping `u32`. A handle held across exactly
    /// 2^32 resets names the current generation again and resolves to
    /// whatever its slot holds then.
    ///
    /// # Panics
    ///
    /// Panics if `primitive_count` exceeds [`MAX_POOL_PRIMITIVES`].
    pub fn reset(&mut self, primitive_count: usize) {
        assert!(
            primitive_count <= MAX_POOL_PRIMITIVES,
            "vertex pool cannot address {} primitives (max {})",
            primitive_count,
            MAX_POOL_PRIMITIVES
        );
        self.generation = self.generation.wrapping_add(1);
        self.primitives = primitive_count;
        let needed = primitive_count * POOL_SLOTS_PER_PRIMITIVE;
        if self.vertices.len() < needed {
            self.vertices.resize(needed, VsOutput::default());
        }
    }

    /// Slot window of `primitive`.
    ///
    /// # Panics
    ///
    /// Panics if `primitive` has no window in the current generation.
    pub fn slots(&mut self, primitive: usize) -> PrimitiveSlots<'_> {
        assert!(
            primitive < self.primitives,
            "primitive {} outside pool of {}",
            primitive,
            self.primitives
        );
        let base = primitive * POOL_SLOTS_PER_PRIMITIVE;
        PrimitiveSlots::new(
            self.generation,
            base,
            &mut self.vertices[base..base + POOL_SLOTS_PER_PRIMITIVE],
        )
    }

    /// Current generation and every live slot, for workers that carve out
    /// windows of primitives they own.
    #[inline]
    pub(crate) fn parts_mut(&mut self) -> (u32, &mut [VsOutput]) {
        let len = self.primitives * POOL_SLOTS_PER_PRIMITIVE;
        (self.generation, &mut self.vertices[..len])
    }

    /// Resolve a handle issued by this pool in the current generation.
    #[inline]
    pub fn get(&self, handle: VertexHandle) -> Option<&VsOutput> {
        match handle.kind() {
            HandleKind::Pool { generation, slot } if generation == self.generation => {
                let slot = slot as usize;
                if slot < self.primitives * POOL_SLOTS_PER_PRIMITIVE {
                    self.vertices.get(slot)
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

/// The slot window a clipper may fill for one primitive.
#[derive(Debug)]
pub struct PrimitiveSlots<'a> {
    generation: u32,
    base: usize,
    slots: &'a mut [VsOutput],
    used: usize,
}

impl<'a> PrimitiveSlots<'a> {
    #[inline]
    pub(crate) fn new(generation: u32, base: usize, slots: &'a mut [VsOutput]) -> Self {
        debug_assert!(base + slots.len() <= MAX_POOL_SLOTS);
        Self {
            generation,
            base,
            slots,
            used: 0,
        }
    }

    /// Store a vertex and return its handle, or `None` once the window is full.
    #[inline]
    pub fn alloc(&mut self, vertex: VsOutput) -> Option<VertexHandle> {
        let dst = self.slots.get_mut(self.used)?;
        *dst = vertex;
        let slot = (self.base + self.used) as u32;
        self.used += 1;
        Some(VertexHandle::pool(self.generation, slot))
    }

    /// Vertices allocated so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.used
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.slots.len() - self.used
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn test_alloc_and_get() {
        let mut pool = VertexPool::new();
        pool.reset(2);
        let (a, b) = {
            let mut slots = pool.slots(1);
            let a = slots.alloc(VsOutput::new(Vec4::new(1.0, 0.0, 0.0, 1.0)));
            let b = slots.alloc(VsOutput::new(Vec4::new(0.0, 1.0, 0.0, 1.0)));
            assert_eq!(slots.len(), 2);
            assert_eq!(slots.remaining(), 2);
            (a.unwrap(), b.unwrap())
        };
        assert_ne!(a, b);
        assert_eq!(pool.get(a).unwrap().position.x, 1.0);
        assert_eq!(pool.get(b).unwrap().position.y, 1.0);
    }

    #[test]
    fn test_slots_are_keyed_by_primitive() {
        let mut pool = VertexPool::new();
        pool.reset(3);
        let h = pool.slots(2).alloc(VsOutput::default()).unwrap();
        assert_eq!(
            h.kind(),
            HandleKind::Pool {
                generation: pool.generation(),
                slot: 2 * POOL_SLOTS_PER_PRIMITIVE as u32
            }
        );
        // Allocation order across primitives does not move a vertex.
        let h0 = pool.slots(0).alloc(VsOutput::default()).unwrap();
        assert_eq!(
            h0.kind(),
            HandleKind::Pool {
                generation: pool.generation(),
                slot: 0
            }
        );
    }

    #[test]
    fn test_window_is_bounded() {
        let mut pool = VertexPool::new();
        pool.reset(1);
        let mut slots = pool.slots(0);
        for _ in 0..POOL_SLOTS_PER_PRIMITIVE {
            assert!(slots.alloc(VsOutput::default()).is_some());
        }
        assert_eq!(slots.remaining(), 0);
        assert!(slots.alloc(VsOutput::default()).is_none());
    }

    #[test]
    fn test_reset_invalidates_handles() {
        let mut pool = VertexPool::new();
        pool.reset(1);
        let h = pool.slots(0).alloc(VsOutput::default()).unwrap();
        pool.reset(1);
        assert!(pool.get(h).is_none());

        // Same slot, new generation: a distinct handle.
        let h2 = pool.slots(0).alloc(VsOutput::default()).unwrap();
        assert_ne!(h, h2);
        assert!(pool.get(h2).is_some());
    }

    #[test]
    fn test_handles_outside_live_windows_do_not_resolve() {
        let mut pool = VertexPool::new();
        pool.reset(4);
        let h = pool.slots(3).alloc(VsOutput::default()).unwrap();
        // Shrinking keeps storage but drops the window from the new generation.
        pool.reset(1);
        let stale_slot = VertexHandle::pool(pool.generation(), 3 * POOL_SLOTS_PER_PRIMITIVE as u32);
        assert!(pool.get(h).is_none());
        assert!(pool.get(stale_slot).is_none());
        assert!(pool.get(VertexHandle::source(0)).is_none());
        assert!(pool.get(VertexHandle::INVALID).is_none());
    }

    #[test]
    fn test_generation_wraps_past_u16() {
        let mut pool = VertexPool::new();
        pool.reset(1);
        let h = pool.slots(0).alloc(VsOutput::default()).unwrap();
        for _ in 0..=u16::MAX as u32 {
            pool.reset(1);
        }
        assert_eq!(pool.generation(), (1 << 16) + 1);
        assert!(pool.get(h).is_none());
    }

    #[test]
    fn test_generation_wrap_at_u32() {
        let mut pool = VertexPool {
            generation: u32::MAX - 1,
            ..VertexPool::default()
        };
        pool.reset(1);
        let h = pool.slots(0).alloc(VsOutput::default()).unwrap();
        pool.reset(1);
        assert_eq!(pool.generation(), 0);
        assert!(pool.get(h).is_none());
    }

    #[test]
    fn test_storage_is_kept_across_reset() {
        let mut pool = VertexPool::new();
        pool.reset(16);
        let ptr = pool.parts_mut().1.as_ptr();
        pool.reset(4);
        pool.reset(16);
        assert_eq!(pool.parts_mut().1.as_ptr(), ptr);
        assert_eq!(pool.parts_mut().1.len(), 16 * POOL_SLOTS_PER_PRIMITIVE);
    }
}
