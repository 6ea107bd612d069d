use std::time::{Duration, Instant};

/// Timer that tracks elapsed time when timing is enabled.
pub struct Timer(Instant);

impl Timer {
    #[inline]
    pub fn start() -> Self {
        Self(Instant::now())
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.0.elapsed()
    }
}

/// Phase durations of one `execute` call.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetupTimings {
    pub prepare: Duration,
    pub clip: Duration,
    pub prefix_sum: Duration,
    pub compact: Duration,
    pub total: Duration,
}

impl SetupTimings {
    pub fn report(&self, primitives: usize, vertices: usize) {
        let ms = |d: Duration| d.as_secs_f64() * 1000.0;
        let pct = |d: Duration| {
            if self.total.as_nanos() == 0 {
                0.0
            } else {
                d.as_secs_f64() / self.total.as_secs_f64() * 100.0
            }
        };

        log::debug!(
            target: "geom_setup::timing",
            "timing primitives={} vertices={} total={:.3}ms",
            primitives,
            vertices,
            ms(self.total)
        );
        log::debug!(target: "geom_setup::timing", "  prepare:    {:7.3}ms ({:4.1}%)", ms(self.prepare), pct(self.prepare));
        log::debug!(target: "geom_setup::timing", "  clip:       {:7.3}ms ({:4.1}%)", ms(self.clip), pct(self.clip));
        log::debug!(target: "geom_setup::timing", "  prefix_sum: {:7.3}ms ({:4.1}%)", ms(self.prefix_sum), pct(self.prefix_sum));
        log::debug!(target: "geom_setup::timing", "  compact:    {:7.3}ms ({:4.1}%)", ms(self.compact), pct(self.compact));
    }
}

/// Collects phase durations for one call.
pub struct TimingBuilder {
    t0: Instant,
    timings: SetupTimings,
}

impl TimingBuilder {
    pub fn new() -> Self {
        Self {
            t0: Instant::now(),
            timings: SetupTimings::default(),
        }
    }

    pub fn set_prepare(&mut self, d: Duration) {
        self.timings.prepare = d;
    }

    pub fn set_clip(&mut self, d: Duration) {
        self.timings.clip = d;
    }

    pub fn set_prefix_sum(&mut self, d: Duration) {
        self.timings.prefix_sum = d;
    }

    pub fn set_compact(&mut self, d: Duration) {
        self.timings.compact = d;
    }

    pub fn finish(mut self) -> SetupTimings {
        self.timings.total = self.t0.elapsed();
        self.timings
    }
}
