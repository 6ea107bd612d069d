//! Zero-cost timing instrumentation for geometry setup.
//!
//! When the `timing` feature is enabled, this module collects per-phase
//! durations for every `execute` call and reports them through `log`.
//!
//! When disabled, all types become zero-sized and all methods compile away.

#[cfg(feature = "timing")]
mod real;
#[cfg(not(feature = "timing"))]
mod stub;

#[cfg(feature = "timing")]
pub use real::*;
#[cfg(not(feature = "timing"))]
pub use stub::*;
