#![allow(dead_code)]

use geom_setup::VsOutput;
use glam::Vec4;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Random triangles scattered around the view volume.
///
/// `spread` scales the box the triangle centers are drawn from; at 1.0 most
/// triangles are inside, at 3.0 most need clipping or rejection. Each vertex
/// carries one attribute equal to its own pre-division position, so clipped
/// vertices can be checked for correct interpolation.
pub fn random_triangles(n: usize, spread: f32, seed: u64) -> Vec<VsOutput> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    random_triangles_with_rng(n, spread, &mut rng)
}

pub fn random_triangles_with_rng<R: Rng + ?Sized>(
    n: usize,
    spread: f32,
    rng: &mut R,
) -> Vec<VsOutput> {
    let mut out = Vec::with_capacity(n * 3);
    for _ in 0..n {
        let center = Vec4::new(
            rng.gen_range(-spread..spread),
            rng.gen_range(-spread..spread),
            rng.gen_range(0.5 - spread..0.5 + spread),
            1.0,
        );
        let size: f32 = rng.gen_range(0.05..0.6);
        for _ in 0..3 {
            let w: f32 = rng.gen_range(0.5..2.0);
            let offset = Vec4::new(
                rng.gen_range(-size..size),
                rng.gen_range(-size..size),
                rng.gen_range(-size..size),
                0.0,
            );
            let p = (center + offset) * w;
            out.push(VsOutput::with_attributes(p, &[p]));
        }
    }
    out
}

/// Triangle with counter-clockwise NDC winding, inside the view volume.
pub fn inside_triangle(z: f32) -> [VsOutput; 3] {
    [
        VsOutput::new(Vec4::new(-0.5, -0.5, z, 1.0)),
        VsOutput::new(Vec4::new(0.5, -0.5, z, 1.0)),
        VsOutput::new(Vec4::new(0.0, 0.5, z, 1.0)),
    ]
}

/// Triangle with one vertex behind the near plane.
pub fn near_straddling_triangle() -> [VsOutput; 3] {
    [
        VsOutput::new(Vec4::new(-0.5, -0.5, -0.5, 1.0)),
        VsOutput::new(Vec4::new(0.5, -0.5, 0.5, 1.0)),
        VsOutput::new(Vec4::new(0.0, 0.5, 0.5, 1.0)),
    ]
}

/// Triangle entirely to the left of the guard band.
pub fn rejected_triangle() -> [VsOutput; 3] {
    [
        VsOutput::new(Vec4::new(-3.0, -0.5, 0.5, 1.0)),
        VsOutput::new(Vec4::new(-2.0, -0.5, 0.5, 1.0)),
        VsOutput::new(Vec4::new(-2.5, 0.5, 0.5, 1.0)),
    ]
}

pub fn flatten(tris: &[[VsOutput; 3]]) -> Vec<VsOutput> {
    tris.iter().flatten().copied().collect()
}
