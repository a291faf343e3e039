use crate::MIN_TIME;

/// A parameter value that ramps linearly toward its target instead of
/// stepping, so control changes landing mid-block stay click-free.
///
/// Targets may be set from any thread context that owns the struct; the
/// audio thread alone advances the ramp by calling [`Smoothed::next_value`]
/// once per sample.
pub struct Smoothed {
    current: f32,
    target: f32,
    step: f32,
    ramp_samples: f32,
}

impl Smoothed {
    pub fn new(value: f32) -> Self {
        Self {
            current: value,
            target: value,
            step: 0.0,
            ramp_samples: 1.0,
        }
    }

    /// Re-time the ramp for a new sample rate and snap to the target.
    ///
    /// Called from `prepare`; any ramp in flight is cut short, which is fine
    /// because playback is stopped while reconfiguring.
    pub fn reset(&mut self, sample_rate: f32, ramp_seconds: f32) {
        self.ramp_samples = (ramp_seconds.max(MIN_TIME) * sample_rate).max(1.0);
        self.current = self.target;
        self.step = 0.0;
    }

    pub fn set_target(&mut self, target: f32) {
        self.target = target;
        self.step = (target - self.current) / self.ramp_samples;
    }

    /// Set current and target at once, skipping the ramp.
    pub fn snap(&mut self, value: f32) {
        self.current = value;
        self.target = value;
        self.step = 0.0;
    }

    #[inline]
    pub fn next_value(&mut self) -> f32 {
        if self.step != 0.0 {
            self.current += self.step;
            let arrived = (self.step > 0.0 && self.current >= self.target)
                || (self.step < 0.0 && self.current <= self.target);
            if arrived {
                self.current = self.target;
                self.step = 0.0;
            }
        }
        self.current
    }

    /// Advance the ramp by `num_samples` without reading each step.
    ///
    /// Used when a value is only sampled once per block but should still
    /// ramp at the per-sample rate.
    pub fn skip(&mut self, num_samples: usize) {
        if self.step == 0.0 || num_samples == 0 {
            return;
        }
        self.current += self.step * num_samples as f32;
        let arrived = (self.step > 0.0 && self.current >= self.target)
            || (self.step < 0.0 && self.current <= self.target);
        if arrived {
            self.current = self.target;
            self.step = 0.0;
        }
    }

    #[inline]
    pub fn current_value(&self) -> f32 {
        self.current
    }

    #[inline]
    pub fn target_value(&self) -> f32 {
        self.target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramps_to_target_within_ramp_time() {
        let mut p = Smoothed::new(0.0);
        p.reset(1_000.0, 0.02); // 20 samples
        p.set_target(1.0);

        let mut last = 0.0;
        for _ in 0..20 {
            let v = p.next_value();
            assert!(v >= last, "ramp must be monotonic");
            last = v;
        }
        assert!((last - 1.0).abs() < 1e-6);
    }

    #[test]
    fn reset_snaps_to_target() {
        let mut p = Smoothed::new(0.0);
        p.reset(48_000.0, 0.02);
        p.set_target(0.7);
        p.reset(48_000.0, 0.02);
        assert_eq!(p.current_value(), 0.7);
    }

    #[test]
    fn skip_matches_stepping() {
        let mut a = Smoothed::new(0.0);
        let mut b = Smoothed::new(0.0);
        a.reset(1_000.0, 0.02);
        b.reset(1_000.0, 0.02);
        a.set_target(1.0);
        b.set_target(1.0);
        for _ in 0..7 {
            a.next_value();
        }
        b.skip(7);
        assert!((a.current_value() - b.current_value()).abs() < 1e-6);
    }

    #[test]
    fn downward_ramp_stops_at_target() {
        let mut p = Smoothed::new(1.0);
        p.reset(1_000.0, 0.01);
        p.set_target(0.25);
        for _ in 0..50 {
            p.next_value();
        }
        assert_eq!(p.current_value(), 0.25);
    }
}
