use super::*;
use crate::clipper::{ClipResult, ClipTriangle};
use crate::vertex_pool::{PrimitiveSlots, POOL_SLOTS_PER_PRIMITIVE};
use crate::{CullMode, PassThroughPolicy, PipelineStatistics, PrimitiveTopology, StatCounter};
use glam::Vec4;

/// Emits a fixed number of handles per primitive, repeating the source handles.
struct ScriptedClipper {
    emit: Vec<usize>,
}

impl Clipper for ScriptedClipper {
    fn clip(
        &self,
        tri: &ClipTriangle<'_>,
        _cull: CullMode,
        _slots: &mut PrimitiveSlots<'_>,
        out: &mut [VertexHandle],
    ) -> ClipResult {
        let prim = match tri.handles[0].kind() {
            HandleKind::Source { index } => index as usize / 3,
            HandleKind::Pool { .. } => unreachable!("engine passes source handles"),
        };
        let n = self.emit[prim];
        for (k, slot) in out[..n].iter_mut().enumerate() {
            *slot = tri.handles[k % 3];
        }
        ClipResult::emitted(n)
    }
}

/// Fills the whole output slice but claims to have written more.
struct OverReportingClipper;

impl Clipper for OverReportingClipper {
    fn clip(
        &self,
        tri: &ClipTriangle<'_>,
        _cull: CullMode,
        _slots: &mut PrimitiveSlots<'_>,
        out: &mut [VertexHandle],
    ) -> ClipResult {
        for (k, slot) in out.iter_mut().enumerate() {
            *slot = tri.handles[k % 3];
        }
        ClipResult::emitted(MAX_CLIPPED_VERTICES + 3)
    }
}

fn tri(a: Vec4, b: Vec4, c: Vec4) -> [VsOutput; 3] {
    [VsOutput::new(a), VsOutput::new(b), VsOutput::new(c)]
}

/// Crosses the near plane, so the guard band always hands it to the clipper.
fn straddling() -> [VsOutput; 3] {
    tri(
        Vec4::new(-0.5, -0.5, -0.5, 1.0),
        Vec4::new(0.5, -0.5, 0.5, 1.0),
        Vec4::new(0.0, 0.5, 0.5, 1.0),
    )
}

fn inside() -> [VsOutput; 3] {
    tri(
        Vec4::new(-0.5, -0.5, 0.5, 1.0),
        Vec4::new(0.5, -0.5, 0.5, 1.0),
        Vec4::new(0.0, 0.5, 0.5, 1.0),
    )
}

fn outside_right() -> [VsOutput; 3] {
    tri(
        Vec4::new(2.0, -0.5, 0.5, 1.0),
        Vec4::new(3.0, -0.5, 0.5, 1.0),
        Vec4::new(2.5, 0.5, 0.5, 1.0),
    )
}

fn batch(tris: &[[VsOutput; 3]]) -> Vec<VsOutput> {
    tris.iter().flatten().copied().collect()
}

fn config(workers: usize) -> GeomSetupConfig {
    GeomSetupConfig::default().with_worker_threads(workers)
}

#[test]
fn test_package_addresses_follow_counts() {
    let vertices = batch(&[straddling(); 10]);
    let mut emit = vec![0; 10];
    emit[0] = 5;
    emit[8] = 3;

    for workers in 1..=4 {
        let mut engine =
            GeomSetupEngine::with_clipper(config(workers), ScriptedClipper { emit: emit.clone() })
                .unwrap();
        let stats = engine.execute(&SetupContext::triangles(&vertices)).unwrap();

        assert_eq!(stats.package_count, 2);
        assert_eq!(engine.package_vertex_counts(), &[5, 3]);
        assert_eq!(engine.compacted_addresses(), &[0, 5, 8]);
        assert_eq!(engine.vertex_count(), 8);
        assert_eq!(stats.clip_invocations, 10);

        let dense = engine.compacted_vertices();
        assert!(dense[..5].iter().all(|h| matches!(
            h.kind(),
            HandleKind::Source { index } if index < 3
        )));
        assert!(dense[5..].iter().all(|h| matches!(
            h.kind(),
            HandleKind::Source { index } if (24..27).contains(&index)
        )));
        assert_eq!(engine.package_vertices(1), &dense[5..8]);
    }
}

#[test]
fn test_inside_triangle_skips_clipper() {
    let vertices = batch(&[inside()]);
    let mut engine = GeomSetupEngine::new(config(2)).unwrap();
    let stats = engine.execute(&SetupContext::triangles(&vertices)).unwrap();

    assert_eq!(stats.clip_invocations, 0);
    assert_eq!(stats.accepted, 1);
    assert_eq!(engine.vertex_count(), 0);
    assert_eq!(engine.compacted_addresses(), &[0, 0]);
    assert_eq!(engine.pass_through_primitives(), &[0]);
}

#[test]
fn test_merge_policy_writes_source_handles() {
    let vertices = batch(&[inside(), outside_right(), inside()]);
    let mut engine =
        GeomSetupEngine::new(config(2).with_pass_through(PassThroughPolicy::Merge)).unwrap();
    let stats = engine.execute(&SetupContext::triangles(&vertices)).unwrap();

    assert_eq!(stats.rejected, 1);
    assert_eq!(stats.accepted, 2);
    assert!(engine.pass_through_primitives().is_empty());
    let expected: Vec<_> = [0, 1, 2, 6, 7, 8]
        .iter()
        .map(|&i| VertexHandle::source(i))
        .collect();
    assert_eq!(engine.compacted_vertices(), expected.as_slice());
}

#[test]
fn test_rejected_triangle_produces_nothing() {
    let vertices = batch(&[outside_right()]);
    let mut engine = GeomSetupEngine::new(config(1)).unwrap();
    let stats = engine.execute(&SetupContext::triangles(&vertices)).unwrap();
    assert_eq!(stats.rejected, 1);
    assert_eq!(stats.clip_invocations, 0);
    assert_eq!(engine.vertex_count(), 0);
    assert!(engine.pass_through_primitives().is_empty());
}

#[test]
fn test_straddling_triangle_resolves_into_pool() {
    let vertices = batch(&[straddling()]);
    let mut engine = GeomSetupEngine::new(config(1)).unwrap();
    let stats = engine.execute(&SetupContext::triangles(&vertices)).unwrap();

    assert_eq!(stats.clip_invocations, 1);
    assert_eq!(stats.emitted_triangles, 2);
    assert_eq!(engine.vertex_count(), 6);
    let pooled = engine
        .compacted_vertices()
        .iter()
        .filter(|h| !h.is_source())
        .count();
    assert!(pooled > 0);
    for &h in engine.compacted_vertices() {
        assert!(engine.resolve(&vertices, h).is_some());
    }
}

#[test]
fn test_pool_slots_are_keyed_by_primitive() {
    let vertices = batch(&[inside(), straddling(), outside_right(), straddling()]);
    for workers in [1, 4] {
        let mut engine = GeomSetupEngine::new(config(workers)).unwrap();
        engine.execute(&SetupContext::triangles(&vertices)).unwrap();
        let generation = engine.vertex_pool().generation();

        // Primitive 1 fills the first six dense slots, primitive 3 the rest.
        let dense = engine.compacted_vertices();
        assert_eq!(dense.len(), 12);
        for (range, prim) in [(0..6, 1usize), (6..12, 3)] {
            let window = prim * POOL_SLOTS_PER_PRIMITIVE..(prim + 1) * POOL_SLOTS_PER_PRIMITIVE;
            for h in &dense[range] {
                if let HandleKind::Pool { generation: g, slot } = h.kind() {
                    assert_eq!(g, generation);
                    assert!(window.contains(&(slot as usize)), "{:?} outside {:?}", h, window);
                }
            }
        }
    }
}

#[test]
fn test_over_reported_clip_output_is_clamped() {
    let vertices = batch(&[straddling(), inside(), straddling()]);
    let mut engine = GeomSetupEngine::with_clipper(config(2), OverReportingClipper).unwrap();
    let stats = engine.execute(&SetupContext::triangles(&vertices)).unwrap();

    assert_eq!(stats.clip_invocations, 2);
    assert_eq!(engine.package_vertex_counts(), &[2 * MAX_CLIPPED_VERTICES as u32]);
    assert_eq!(engine.vertex_count(), 2 * MAX_CLIPPED_VERTICES);
    assert_eq!(stats.emitted_triangles, 2 * 3 + 1);
    // Each clipped primitive's run starts with its own source handles.
    let dense = engine.compacted_vertices();
    assert_eq!(dense[0], VertexHandle::source(0));
    assert_eq!(dense[MAX_CLIPPED_VERTICES], VertexHandle::source(6));
    assert!(dense.iter().all(|h| h.is_valid()));
    assert_eq!(engine.pass_through_primitives(), &[1]);
}

#[test]
fn test_pool_handles_expire_on_next_execute() {
    let vertices = batch(&[straddling()]);
    let mut engine = GeomSetupEngine::new(config(1)).unwrap();
    engine.execute(&SetupContext::triangles(&vertices)).unwrap();
    let stale: Vec<_> = engine
        .compacted_vertices()
        .iter()
        .copied()
        .filter(|h| !h.is_source())
        .collect();
    assert!(!stale.is_empty());

    engine.execute(&SetupContext::triangles(&vertices)).unwrap();
    for h in stale {
        assert!(engine.resolve(&vertices, h).is_none());
    }
}

#[test]
fn test_repeated_execute_shrinks_and_grows() {
    let big = batch(&[straddling(); 40]);
    let small = batch(&[straddling(); 3]);
    let mut engine = GeomSetupEngine::new(config(3)).unwrap();

    let s = engine.execute(&SetupContext::triangles(&big)).unwrap();
    assert_eq!(s.package_count, 5);
    assert_eq!(engine.vertex_count(), 40 * 6);

    let s = engine.execute(&SetupContext::triangles(&small)).unwrap();
    assert_eq!(s.package_count, 1);
    assert_eq!(engine.vertex_count(), 3 * 6);
    assert_eq!(engine.compacted_addresses(), &[0, 18]);

    let empty: Vec<VsOutput> = Vec::new();
    let s = engine.execute(&SetupContext::triangles(&empty)).unwrap();
    assert_eq!(s.package_count, 0);
    assert_eq!(engine.vertex_count(), 0);
    assert_eq!(engine.compacted_addresses(), &[0]);
}

#[test]
fn test_statistics_sink_matches_stats() {
    let vertices = batch(&[inside(), straddling(), outside_right(), straddling()]);
    let sink = PipelineStatistics::new();
    let mut engine = GeomSetupEngine::new(config(2)).unwrap();
    let stats = engine
        .execute(&SetupContext::triangles(&vertices).with_stats(&sink))
        .unwrap();

    assert_eq!(sink.get(StatCounter::ClipInvocations), stats.clip_invocations);
    assert_eq!(sink.get(StatCounter::ClipInvocations), 2);
    assert_eq!(sink.get(StatCounter::GuardBandRejected), 1);
    assert_eq!(sink.get(StatCounter::GuardBandAccepted), 1);
    assert_eq!(sink.get(StatCounter::ClipPrimitives), stats.emitted_triangles);
}

#[test]
fn test_culling_on_accept_path() {
    // Counter-clockwise in NDC, so front-facing.
    let vertices = batch(&[inside()]);
    let mut engine = GeomSetupEngine::new(config(1)).unwrap();

    let s = engine
        .execute(&SetupContext::triangles(&vertices).with_cull(CullMode::Front))
        .unwrap();
    assert_eq!(s.culled, 1);
    assert!(engine.pass_through_primitives().is_empty());

    let s = engine
        .execute(&SetupContext::triangles(&vertices).with_cull(CullMode::Back))
        .unwrap();
    assert_eq!(s.culled, 0);
    assert_eq!(engine.pass_through_primitives(), &[0]);
}

#[test]
fn test_rejects_non_triangle_topology() {
    let vertices = batch(&[inside()]);
    let mut engine = GeomSetupEngine::new(config(1)).unwrap();
    let mut ctx = SetupContext::triangles(&vertices);
    ctx.topology = PrimitiveTopology::LineList;
    assert_eq!(
        engine.execute(&ctx),
        Err(GeomSetupError::UnsupportedTopology(
            PrimitiveTopology::LineList
        ))
    );
}

#[test]
fn test_rejects_short_vertex_source() {
    let vertices = batch(&[inside()]);
    let mut engine = GeomSetupEngine::new(config(1)).unwrap();
    let mut ctx = SetupContext::triangles(&vertices);
    ctx.primitive_count = 2;
    assert_eq!(
        engine.execute(&ctx),
        Err(GeomSetupError::VertexSourceTooSmall {
            required: 6,
            available: 3
        })
    );
}

#[test]
fn test_triangle_strip_uses_flat_fetch() {
    let vertices = batch(&[inside(), inside()]);
    let mut engine = GeomSetupEngine::new(config(1)).unwrap();
    let mut ctx = SetupContext::triangles(&vertices);
    ctx.topology = PrimitiveTopology::TriangleStrip;
    let s = engine.execute(&ctx).unwrap();
    assert_eq!(s.accepted, 2);
    assert_eq!(engine.pass_through_primitives(), &[0, 1]);
}
