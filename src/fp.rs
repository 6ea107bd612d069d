//! Floating-point helpers (feature-gated).

use glam::Vec4;

#[inline(always)]
pub(crate) fn fma_f32(a: f32, b: f32, c: f32) -> f32 {
    #[cfg(feature = "fma")]
    {
        a.mul_add(b, c)
    }
    #[cfg(not(feature = "fma"))]
    {
        a * b + c
    }
}

/// `a + (b - a) * t`, component-wise.
#[inline(always)]
pub(crate) fn lerp_vec4(a: Vec4, b: Vec4, t: f32) -> Vec4 {
    #[cfg(feature = "fma")]
    {
        (b - a).mul_add(Vec4::splat(t), a)
    }
    #[cfg(not(feature = "fma"))]
    {
        a + (b - a) * t
    }
}

/// 2D cross product of `(b - a)` and `(c - a)`.
#[inline(always)]
pub(crate) fn orient2d(ax: f32, ay: f32, bx: f32, by: f32, cx: f32, cy: f32) -> f32 {
    let abx = bx - ax;
    let aby = by - ay;
    let acx = cx - ax;
    let acy = cy - ay;
    fma_f32(abx, acy, -(aby * acx))
}
