//! Error types for geometry setup.

use crate::PrimitiveTopology;

/// Errors that can occur when configuring or running the geometry setup engine.
///
/// Internal invariants (package exclusivity, per-primitive output bounds) are
/// debug assertions, not errors.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GeomSetupError {
    /// Only triangle primitives can be clipped and compacted.
    #[error("unsupported primitive topology {0:?}: only triangles can be set up")]
    UnsupportedTopology(PrimitiveTopology),

    /// The vertex source does not hold every vertex the batch references.
    #[error("vertex source too small: batch needs {required} vertices, source has {available}")]
    VertexSourceTooSmall { required: usize, available: usize },

    /// A batch so large that vertex indices or buffer offsets overflow `u32`.
    #[error("too many primitives in one batch: {0}")]
    TooManyPrimitives(usize),

    /// Rejected configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The worker thread pool could not be created.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),
}
