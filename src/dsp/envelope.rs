use crate::SILENCE_FLOOR;

/*
Exponential Decay Envelope
==========================

Every drum voice in this crate shapes its amplitude with the same law:

    env *= exp(-1 / (decay_seconds * sample_rate))

evaluated once per sample. This is the standard discretisation of a
continuous exponential decay and has to match across voices so their
relative decay characters stay consistent.

A voice counts as silent once the level falls under SILENCE_FLOOR (1e-4,
-80 dB). Choking scales the level by a small factor instead of zeroing it,
so a choked hat fades over a few milliseconds rather than clicking.
*/

pub struct DecayEnvelope {
    level: f32,
    rate: f32,
}

impl DecayEnvelope {
    pub fn new() -> Self {
        Self { level: 0.0, rate: 1.0 }
    }

    /// Configure the per-sample decay multiplier from a time constant.
    #[inline]
    pub fn set_decay(&mut self, sample_rate: f32, decay_seconds: f32) {
        self.rate = (-1.0 / (decay_seconds.max(1e-4) * sample_rate)).exp();
    }

    /// Set the per-sample multiplier directly (for very fast transients).
    #[inline]
    pub fn set_rate(&mut self, rate: f32) {
        self.rate = rate;
    }

    /// Re-arm the envelope at `level` (usually the trigger velocity).
    #[inline]
    pub fn trigger(&mut self, level: f32) {
        self.level = level;
    }

    /// Current level, then decay one step.
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let level = self.level;
        self.level *= self.rate;
        level
    }

    #[inline]
    pub fn level(&self) -> f32 {
        self.level
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.level > SILENCE_FLOOR
    }

    /// Forced fast decay: scale the level by a small factor.
    #[inline]
    pub fn choke(&mut self, factor: f32) {
        self.level *= factor;
    }

    /// Immediate silence.
    #[inline]
    pub fn cut(&mut self) {
        self.level = 0.0;
    }

    pub fn reset(&mut self) {
        self.level = 0.0;
    }
}

impl Default for DecayEnvelope {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decays_to_silence_within_expected_time() {
        let sample_rate = 48_000.0;
        let mut env = DecayEnvelope::new();
        env.set_decay(sample_rate, 0.1);
        env.trigger(1.0);

        // level(t) = exp(-t / tau); hits 1e-4 at t = tau * ln(1e4) ~ 9.2 tau
        let expected = (0.1 * sample_rate * 9.21) as usize;
        let mut samples = 0;
        while env.is_active() {
            env.next_sample();
            samples += 1;
            assert!(samples < expected * 2, "envelope failed to decay");
        }
        assert!(samples > expected / 2);
    }

    #[test]
    fn choke_collapses_level_without_zeroing() {
        let mut env = DecayEnvelope::new();
        env.trigger(1.0);
        env.choke(0.01);
        assert!(env.level() > 0.0);
        assert!(env.level() < 0.011);
    }

    #[test]
    fn retrigger_resets_level() {
        let mut env = DecayEnvelope::new();
        env.set_decay(48_000.0, 0.05);
        env.trigger(0.8);
        for _ in 0..1_000 {
            env.next_sample();
        }
        env.trigger(1.0);
        assert_eq!(env.level(), 1.0);
    }
}
