//! Conservative per-triangle guard-band classification.

use glam::Vec4;

/// Default guard-band expansion of the x/y clip volume.
pub const DEFAULT_GUARD_BAND_SCALE: f32 = 1.2;

/// Outcome of the guard-band test for one triangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardBandClass {
    /// All three vertices lie outside the same side of the guard band.
    Reject,
    /// All three vertices lie inside the guard band and the depth range.
    Accept,
    /// Anything else; the clipper decides.
    Clip,
}

/// Per-side outside measure of one vertex: `clamp((-x, -y, x, y) - w * scale, 0, 1)`.
///
/// A component is zero exactly when the vertex is inside that side of the
/// expanded volume.
#[inline(always)]
pub fn outside_mask(position: Vec4, scale: f32) -> Vec4 {
    let p = Vec4::new(-position.x, -position.y, position.x, position.y);
    (p - Vec4::splat(position.w * scale)).clamp(Vec4::ZERO, Vec4::ONE)
}

/// `0 <= z <= w`.
#[inline(always)]
pub fn inside_depth_range(position: Vec4) -> bool {
    position.z >= 0.0 && position.z <= position.w
}

/// Classify a triangle by its clip-space positions.
///
/// The product of the per-vertex outside measures is non-zero on a side only
/// if every vertex is outside that side; their maximum is zero only if every
/// vertex is inside every side. False `Clip` results only cost clip work.
#[cfg_attr(feature = "profiling", inline(never))]
pub fn classify(positions: [Vec4; 3], scale: f32) -> GuardBandClass {
    let t0 = outside_mask(positions[0], scale);
    let t1 = outside_mask(positions[1], scale);
    let t2 = outside_mask(positions[2], scale);

    if (t0 * t1 * t2).cmpne(Vec4::ZERO).any() {
        return GuardBandClass::Reject;
    }

    let all_inside = t0.max(t1).max(t2) == Vec4::ZERO;
    if all_inside && positions.iter().all(|&p| inside_depth_range(p)) {
        GuardBandClass::Accept
    } else {
        GuardBandClass::Clip
    }
}
