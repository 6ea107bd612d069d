//! Geometry setup for a software rasterizer.
//!
//! Takes a batch of vertex-shaded triangles and produces a dense vertex stream
//! ready for rasterization: triangles entirely outside the guard band are
//! dropped, triangles entirely inside skip clipping, and the rest are clipped
//! against the near and far planes. Clipping runs on a fixed worker pool and
//! its variable-length output is compacted in primitive order.
//!
//! # Example
//!
//! ```
//! use geom_setup::{GeomSetupConfig, GeomSetupEngine, SetupContext, VsOutput};
//! use glam::Vec4;
//!
//! // One triangle poking through the near plane.
//! let vertices = vec![
//!     VsOutput::new(Vec4::new(-0.5, -0.5, -0.5, 1.0)),
//!     VsOutput::new(Vec4::new(0.5, -0.5, 0.5, 1.0)),
//!     VsOutput::new(Vec4::new(0.0, 0.5, 0.5, 1.0)),
//! ];
//!
//! let mut engine = GeomSetupEngine::new(GeomSetupConfig::default()).unwrap();
//! let stats = engine.execute(&SetupContext::triangles(&vertices)).unwrap();
//!
//! assert_eq!(stats.clip_invocations, 1);
//! assert_eq!(engine.vertex_count() % 3, 0);
//! for &handle in engine.compacted_vertices() {
//!     let vertex = engine.resolve(&vertices, handle).unwrap();
//!     assert!(vertex.position.z >= -1e-6);
//! }
//! ```

pub mod clipper;
mod context;
mod engine;
mod error;
pub(crate) mod fp;
pub mod guard_band;
pub mod partition;
pub(crate) mod timing;
mod types;
pub mod validation;
mod vertex_pool;

pub use clipper::{ClipResult, ClipTriangle, Clipper, FrustumClipper, MAX_CLIPPED_VERTICES};
pub use context::{
    PipelineStatistics, PipelineStatisticsSnapshot, SetupContext, StatCounter, VertexSource,
};
pub use engine::{GeomSetupEngine, SetupStats};
pub use error::GeomSetupError;
pub use guard_band::DEFAULT_GUARD_BAND_SCALE;
pub use types::{
    CullMode, HandleKind, PrimitiveTopology, VertexHandle, VsOutput, MAX_POOL_SLOTS,
    MAX_VS_OUTPUT_ATTRIBUTES,
};
pub use vertex_pool::{
    PrimitiveSlots, VertexPool, MAX_POOL_PRIMITIVES, POOL_SLOTS_PER_PRIMITIVE,
};

pub use engine::{DEFAULT_CLIP_PACKAGE_SIZE, DEFAULT_COMPACT_PACKAGE_SIZE};

/// Where triangles that pass the guard band without clipping end up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PassThroughPolicy {
    /// Record their primitive indices in
    /// [`GeomSetupEngine::pass_through_primitives`]; the dense vertex stream
    /// holds clipped output only.
    #[default]
    Separate,
    /// Write their three source handles into the dense vertex stream, in
    /// primitive order alongside clipped output.
    Merge,
}

/// Configuration for [`GeomSetupEngine`].
#[derive(Debug, Clone, PartialEq)]
pub struct GeomSetupConfig {
    /// Primitives per clip package.
    pub clip_package_size: usize,
    /// Clip packages per compaction package.
    pub compact_package_size: usize,
    /// Guard-band extent as a multiple of `w`. Must be at least 1.0 so that
    /// everything visible is inside the band.
    pub guard_band_scale: f32,
    pub pass_through: PassThroughPolicy,
    /// Worker count; `None` uses every hardware execution context.
    pub worker_threads: Option<usize>,
}

impl Default for GeomSetupConfig {
    fn default() -> Self {
        Self {
            clip_package_size: DEFAULT_CLIP_PACKAGE_SIZE,
            compact_package_size: DEFAULT_COMPACT_PACKAGE_SIZE,
            guard_band_scale: DEFAULT_GUARD_BAND_SCALE,
            pass_through: PassThroughPolicy::Separate,
            worker_threads: None,
        }
    }
}

impl GeomSetupConfig {
    pub fn with_pass_through(mut self, policy: PassThroughPolicy) -> Self {
        self.pass_through = policy;
        self
    }

    pub fn with_worker_threads(mut self, workers: usize) -> Self {
        self.worker_threads = Some(workers);
        self
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), GeomSetupError> {
        if self.clip_package_size == 0 {
            return Err(GeomSetupError::InvalidConfig(
                "clip_package_size must be non-zero".to_string(),
            ));
        }
        if self.compact_package_size == 0 {
            return Err(GeomSetupError::InvalidConfig(
                "compact_package_size must be non-zero".to_string(),
            ));
        }
        if !self.guard_band_scale.is_finite() || self.guard_band_scale < 1.0 {
            return Err(GeomSetupError::InvalidConfig(format!(
                "guard_band_scale must be a finite value >= 1.0, got {}",
                self.guard_band_scale
            )));
        }
        match self.worker_threads {
            Some(0) => Err(GeomSetupError::InvalidConfig(
                "worker_threads must be non-zero".to_string(),
            )),
            _ => Ok(()),
        }
    }
}
