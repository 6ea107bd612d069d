//! Triangle clipping against the depth planes, plus face culling.
//!
//! The engine only depends on the [`Clipper`] trait; [`FrustumClipper`] is the
//! default implementation. X/Y extents are left to the rasterizer's guard band,
//! which keeps the clipped polygon at no more than five vertices.

use glam::Vec4;

use crate::fp::{lerp_vec4, orient2d};
use crate::{CullMode, PrimitiveSlots, VertexHandle, VsOutput};

/// Number of planes [`FrustumClipper`] clips against.
pub const NUM_CLIP_PLANES: usize = 2;

/// Most vertices a clipped triangle polygon can have.
pub const MAX_CLIPPED_POLYGON: usize = 3 + NUM_CLIP_PLANES;

/// Most fan-triangulated handles a single input triangle can produce.
pub const MAX_CLIPPED_VERTICES: usize = 3 * (MAX_CLIPPED_POLYGON - 2);

/// Near plane `z >= 0`.
pub const NEAR_PLANE: Vec4 = Vec4::new(0.0, 0.0, 1.0, 0.0);
/// Far plane `z <= w`.
pub const FAR_PLANE: Vec4 = Vec4::new(0.0, 0.0, -1.0, 1.0);

/// The three vertices of a triangle handed to a clipper.
#[derive(Debug, Clone, Copy)]
pub struct ClipTriangle<'a> {
    pub handles: [VertexHandle; 3],
    pub vertices: [&'a VsOutput; 3],
}

/// What a [`Clipper`] produced for one triangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClipResult {
    /// Handles written to the output slice, at most [`MAX_CLIPPED_VERTICES`].
    pub num_vertices: usize,
    /// The surviving polygon was discarded by face culling.
    pub culled: bool,
}

impl ClipResult {
    #[inline]
    pub const fn emitted(num_vertices: usize) -> Self {
        Self {
            num_vertices,
            culled: false,
        }
    }

    #[inline]
    pub const fn culled() -> Self {
        Self {
            num_vertices: 0,
            culled: true,
        }
    }
}

/// Clips one triangle and writes the result as a triangle list.
pub trait Clipper: Sync {
    /// Clip `tri`, apply `cull`, and write fan-triangulated handles to `out`.
    ///
    /// `out` holds exactly [`MAX_CLIPPED_VERTICES`] slots. New vertices go
    /// into `slots`, the pool window of this primitive; untouched input
    /// vertices keep their handles. Nothing is written when the triangle is
    /// clipped or culled away.
    fn clip(
        &self,
        tri: &ClipTriangle<'_>,
        cull: CullMode,
        slots: &mut PrimitiveSlots<'_>,
        out: &mut [VertexHandle],
    ) -> ClipResult;
}

/// Whether a convex polygon (given by clip-space positions) is culled.
///
/// Orientation is the sign of the projected area. Polygons with a vertex at or
/// behind the eye are never culled, and neither are zero-area ones.
pub fn is_culled(positions: &[Vec4], cull: CullMode) -> bool {
    if cull == CullMode::None || positions.len() < 3 {
        return false;
    }
    if positions.iter().any(|p| p.w <= 0.0) {
        return false;
    }

    let ndc = |p: Vec4| (p.x / p.w, p.y / p.w);
    let (x0, y0) = ndc(positions[0]);
    let mut area = 0.0f32;
    for pair in positions[1..].windows(2) {
        let (x1, y1) = ndc(pair[0]);
        let (x2, y2) = ndc(pair[1]);
        area += orient2d(x0, y0, x1, y1, x2, y2);
    }

    match cull {
        CullMode::None => false,
        CullMode::Front => area > 0.0,
        CullMode::Back => area < 0.0,
    }
}

#[derive(Clone, Copy)]
struct PolyVertex {
    /// `None` for vertices created by clipping that are not yet in a pool.
    handle: Option<VertexHandle>,
    vertex: VsOutput,
}

// Rounding at cut points can in principle add a spurious sign change, so the
// scratch polygon has room for one extra vertex per plane.
const POLYGON_CAPACITY: usize = MAX_CLIPPED_POLYGON + NUM_CLIP_PLANES;

/// Relative distance under which two polygon vertices count as one.
const NEAR_DUPLICATE_EPS: f32 = 1e-6;

#[inline]
fn nearly_equal(a: Vec4, b: Vec4) -> bool {
    let scale = a.w.abs().max(b.w.abs()).max(1.0);
    (a - b).abs().max_element() <= NEAR_DUPLICATE_EPS * scale
}

#[derive(Clone, Copy)]
struct Polygon {
    verts: [PolyVertex; POLYGON_CAPACITY],
    len: usize,
    /// A push found the polygon full; its shape is no longer exact.
    overflowed: bool,
}

impl Polygon {
    fn new() -> Self {
        Self {
            verts: [PolyVertex {
                handle: None,
                vertex: VsOutput::default(),
            }; POLYGON_CAPACITY],
            len: 0,
            overflowed: false,
        }
    }

    #[inline]
    fn push(&mut self, v: PolyVertex) {
        if self.len < POLYGON_CAPACITY {
            self.verts[self.len] = v;
            self.len += 1;
        } else {
            if !self.overflowed {
                log::warn!(
                    "clip polygon full at {} vertices, discarding triangle",
                    POLYGON_CAPACITY
                );
            }
            self.overflowed = true;
        }
    }

    /// Merge vertices that coincide with their cyclic predecessor up to
    /// rounding. A merged pair keeps the copy that already has a handle.
    fn drop_near_duplicates(&mut self) {
        let mut kept = 0;
        for i in 0..self.len {
            let v = self.verts[i];
            if kept > 0 {
                let last = &mut self.verts[kept - 1];
                if nearly_equal(last.vertex.position, v.vertex.position) {
                    if last.handle.is_none() && v.handle.is_some() {
                        *last = v;
                    }
                    continue;
                }
            }
            self.verts[kept] = v;
            kept += 1;
        }
        while kept > 1
            && nearly_equal(
                self.verts[0].vertex.position,
                self.verts[kept - 1].vertex.position,
            )
        {
            if self.verts[0].handle.is_none() && self.verts[kept - 1].handle.is_some() {
                self.verts[0] = self.verts[kept - 1];
            }
            kept -= 1;
        }
        self.len = kept;
    }

    #[inline]
    fn as_slice(&self) -> &[PolyVertex] {
        &self.verts[..self.len]
    }
}

/// Interpolate from `inside` towards `outside` where the plane distance is zero.
///
/// Always stepping from the inside vertex makes the cut point of a shared edge
/// identical for both triangles that own it.
#[inline]
fn intersect(inside: &VsOutput, outside: &VsOutput, d_in: f32, d_out: f32) -> VsOutput {
    let t = d_in / (d_in - d_out);
    let mut v = VsOutput::new(lerp_vec4(inside.position, outside.position, t));
    let n = inside.num_attributes as usize;
    for i in 0..n {
        v.attributes[i] = lerp_vec4(inside.attributes[i], outside.attributes[i], t);
    }
    v.num_attributes = inside.num_attributes;
    v
}

/// One Sutherland-Hodgman pass of `input` against `plane`.
fn clip_polygon(input: &Polygon, plane: Vec4, output: &mut Polygon) {
    output.len = 0;
    output.overflowed = false;
    let n = input.len;
    for i in 0..n {
        let cur = &input.verts[i];
        let next = &input.verts[(i + 1) % n];
        let d_cur = plane.dot(cur.vertex.position);
        let d_next = plane.dot(next.vertex.position);
        let cur_in = d_cur >= 0.0;
        let next_in = d_next >= 0.0;

        if cur_in {
            output.push(*cur);
        }
        if cur_in != next_in {
            let vertex = if cur_in {
                intersect(&cur.vertex, &next.vertex, d_cur, d_next)
            } else {
                intersect(&next.vertex, &cur.vertex, d_next, d_cur)
            };
            output.push(PolyVertex {
                handle: None,
                vertex,
            });
        }
    }
}

/// Clipper against the near (`z >= 0`) and far (`z <= w`) planes.
#[derive(Debug, Clone, Copy)]
pub struct FrustumClipper {
    planes: [Vec4; NUM_CLIP_PLANES],
}

impl Default for FrustumClipper {
    fn default() -> Self {
        Self {
            planes: [NEAR_PLANE, FAR_PLANE],
        }
    }
}

impl FrustumClipper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn planes(&self) -> &[Vec4; NUM_CLIP_PLANES] {
        &self.planes
    }
}

impl Clipper for FrustumClipper {
    #[cfg_attr(feature = "profiling", inline(never))]
    fn clip(
        &self,
        tri: &ClipTriangle<'_>,
        cull: CullMode,
        slots: &mut PrimitiveSlots<'_>,
        out: &mut [VertexHandle],
    ) -> ClipResult {
        debug_assert!(out.len() >= MAX_CLIPPED_VERTICES, "clip output too small");

        let positions = [
            tri.vertices[0].position,
            tri.vertices[1].position,
            tri.vertices[2].position,
        ];

        // Fast path: nothing to cut.
        let unclipped = self
            .planes
            .iter()
            .all(|plane| positions.iter().all(|p| plane.dot(*p) >= 0.0));
        if unclipped {
            if is_culled(&positions, cull) {
                return ClipResult::culled();
            }
            out[..3].copy_from_slice(&tri.handles);
            return ClipResult::emitted(3);
        }

        let mut a = Polygon::new();
        for k in 0..3 {
            a.push(PolyVertex {
                handle: Some(tri.handles[k]),
                vertex: *tri.vertices[k],
            });
        }
        let mut b = Polygon::new();
        for plane in &self.planes {
            clip_polygon(&a, *plane, &mut b);
            std::mem::swap(&mut a, &mut b);
            if a.overflowed || a.len < 3 {
                return ClipResult::default();
            }
        }

        if a.len > MAX_CLIPPED_POLYGON {
            a.drop_near_duplicates();
            if a.len > MAX_CLIPPED_POLYGON {
                log::warn!(
                    "clipped polygon has {} distinct vertices (max {}), discarding triangle",
                    a.len,
                    MAX_CLIPPED_POLYGON
                );
                return ClipResult::default();
            }
            if a.len < 3 {
                return ClipResult::default();
            }
        }

        let mut poly_positions = [Vec4::ZERO; MAX_CLIPPED_POLYGON];
        for (dst, v) in poly_positions.iter_mut().zip(a.as_slice()) {
            *dst = v.vertex.position;
        }
        if is_culled(&poly_positions[..a.len], cull) {
            return ClipResult::culled();
        }

        let mut handles = [VertexHandle::INVALID; MAX_CLIPPED_POLYGON];
        for (dst, v) in handles.iter_mut().zip(a.as_slice()) {
            *dst = match v.handle {
                Some(h) => h,
                None => match slots.alloc(v.vertex) {
                    Some(h) => h,
                    None => {
                        log::warn!(
                            "clipped polygon needs more than {} new vertices, discarding triangle",
                            slots.len()
                        );
                        return ClipResult::default();
                    }
                },
            };
        }

        let mut written = 0;
        for k in 1..a.len - 1 {
            out[written] = handles[0];
            out[written + 1] = handles[k];
            out[written + 2] = handles[k + 1];
            written += 3;
        }
        ClipResult::emitted(written)
    }
}
