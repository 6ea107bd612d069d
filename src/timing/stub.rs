use std::time::Duration;

/// Dummy timer when `timing` is disabled (zero-sized).
pub struct Timer;

impl Timer {
    #[inline(always)]
    pub fn start() -> Self {
        Self
    }

    #[inline(always)]
    pub fn elapsed(&self) -> Duration {
        Duration::ZERO
    }
}

/// Dummy timings when `timing` is disabled (zero-sized).
#[derive(Debug, Clone, Copy, Default)]
pub struct SetupTimings;

impl SetupTimings {
    #[inline(always)]
    pub fn report(&self, _primitives: usize, _vertices: usize) {}
}

/// Dummy builder when `timing` is disabled.
pub struct TimingBuilder;

impl TimingBuilder {
    #[inline(always)]
    pub fn new() -> Self {
        Self
    }

    #[inline(always)]
    pub fn set_prepare(&mut self, _d: Duration) {}

    #[inline(always)]
    pub fn set_clip(&mut self, _d: Duration) {}

    #[inline(always)]
    pub fn set_prefix_sum(&mut self, _d: Duration) {}

    #[inline(always)]
    pub fn set_compact(&mut self, _d: Duration) {}

    #[inline(always)]
    pub fn finish(self) -> SetupTimings {
        SetupTimings
    }
}
