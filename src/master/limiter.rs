use crate::buffer::AudioBuffer;
use crate::dsp::delay::DelayLine;
use crate::dsp::level::db_to_gain;
use crate::dsp::oversample::{Oversampler, OversamplingFactor};
use crate::dsp::smooth::Smoothed;
use crate::master::{block_value, NUM_CHANNELS};

/*
True-Peak Limiter
=================

Brick wall at the output. The attack is sample-instant: when the target
gain drops below the current envelope, the envelope jumps straight to the
target. Anything slower would let an over-ceiling sample through, which
defeats the point of a limiter. Release recovers exponentially toward
unity.

In true-peak mode the block is 4x oversampled, the peak across channels is
measured per oversampled sample, and gain is applied at the oversampled
rate, so inter-sample peaks of the reconstructed waveform are caught too.
The cheaper non-oversampled mode runs the same gain computer at the base
rate on lookahead-delayed samples instead (max 10 ms).
*/

const PARAM_RAMP_SECONDS: f32 = 0.02;
const MAX_LOOKAHEAD_SECONDS: f32 = 0.01;

pub struct Limiter {
    sample_rate: f32,
    ceiling_db: Smoothed,
    knee: Smoothed,
    release_ms: Smoothed,
    lookahead_ms: f32,
    true_peak: bool,
    oversampler: Oversampler,
    lookahead: Vec<DelayLine>,
    envelope: f32,
}

impl Limiter {
    pub fn new() -> Self {
        Self {
            sample_rate: 48_000.0,
            ceiling_db: Smoothed::new(-0.3),
            knee: Smoothed::new(0.0),
            release_ms: Smoothed::new(50.0),
            lookahead_ms: 5.0,
            true_peak: true,
            oversampler: Oversampler::new(OversamplingFactor::X4, NUM_CHANNELS, 0),
            lookahead: Vec::new(),
            envelope: 1.0,
        }
    }

    pub fn prepare(&mut self, sample_rate: f32, max_block_size: usize) {
        self.sample_rate = sample_rate;
        self.ceiling_db.reset(sample_rate, PARAM_RAMP_SECONDS);
        self.knee.reset(sample_rate, PARAM_RAMP_SECONDS);
        self.release_ms.reset(sample_rate, PARAM_RAMP_SECONDS);
        self.oversampler = Oversampler::new(OversamplingFactor::X4, NUM_CHANNELS, max_block_size);
        let max_lookahead = (sample_rate * MAX_LOOKAHEAD_SECONDS) as usize + 1;
        self.lookahead = (0..NUM_CHANNELS).map(|_| DelayLine::new(max_lookahead)).collect();
        self.envelope = 1.0;
    }

    pub fn set_ceiling(&mut self, db: f32) {
        self.ceiling_db.set_target(db);
    }

    pub fn set_release(&mut self, ms: f32) {
        self.release_ms.set_target(ms.max(1.0));
    }

    /// Knee amount; 0 is a hard corner.
    pub fn set_knee(&mut self, knee: f32) {
        self.knee.set_target(knee.clamp(0.0, 1.0));
    }

    /// Lookahead in ms for the non-oversampled mode, clamped to 10 ms.
    pub fn set_lookahead(&mut self, ms: f32) {
        self.lookahead_ms = ms.clamp(0.0, MAX_LOOKAHEAD_SECONDS * 1_000.0);
    }

    pub fn set_oversampling(&mut self, enabled: bool) {
        self.true_peak = enabled;
    }

    pub fn ensure_block_size(&mut self, max_block_size: usize) {
        self.oversampler.ensure_block_size(max_block_size);
    }

    pub fn process(&mut self, buffer: &mut AudioBuffer) {
        let num_samples = buffer.num_samples();
        let num_channels = buffer.num_channels().min(NUM_CHANNELS);
        if num_samples == 0 || num_channels == 0 {
            return;
        }

        let ceiling_gain = db_to_gain(block_value(&mut self.ceiling_db, num_samples));
        let knee = block_value(&mut self.knee, num_samples);
        let release_ms = block_value(&mut self.release_ms, num_samples);
        let release_coeff = (-1.0 / (release_ms * 0.001 * self.sample_rate)).exp();

        if self.true_peak {
            let os_samples = self.oversampler.process_up(buffer, num_samples);
            for i in 0..os_samples {
                let mut peak = 0.0f32;
                for ch in 0..num_channels {
                    peak = peak.max(self.oversampler.sample(ch, i).abs());
                }

                let target = target_gain(peak, ceiling_gain, knee);
                self.advance_envelope(target, release_coeff);

                for ch in 0..num_channels {
                    let sample = self.oversampler.sample(ch, i) * self.envelope;
                    self.oversampler.set_sample(ch, i, sample);
                }
            }
            self.oversampler.process_down(buffer, num_samples);
        } else {
            let lookahead_samples = (self.sample_rate * self.lookahead_ms * 0.001) as usize;
            for line in self.lookahead.iter_mut() {
                line.set_delay(lookahead_samples);
            }

            let mut delayed = [0.0f32; NUM_CHANNELS];
            for i in 0..num_samples {
                let mut peak = 0.0f32;
                for ch in 0..num_channels {
                    let d = self.lookahead[ch].next_sample(buffer.sample(ch, i));
                    delayed[ch] = d;
                    peak = peak.max(d.abs());
                }

                let target = target_gain(peak, ceiling_gain, knee);
                self.advance_envelope(target, release_coeff);

                for ch in 0..num_channels {
                    buffer.set_sample(ch, i, delayed[ch] * self.envelope);
                }
            }
        }
    }

    #[inline]
    fn advance_envelope(&mut self, target: f32, release_coeff: f32) {
        if target < self.envelope {
            // Instant attack: never let an over-ceiling sample through.
            self.envelope = target;
        } else {
            self.envelope = release_coeff * self.envelope + (1.0 - release_coeff) * target;
        }
    }

    pub fn reset(&mut self) {
        self.oversampler.reset();
        for line in self.lookahead.iter_mut() {
            line.reset();
        }
        self.envelope = 1.0;
    }
}

impl Default for Limiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Gain that pins `peak` at or under the ceiling. With a knee, the gain
/// blends from unity toward full limiting across a region spanning a
/// fraction of the ceiling above it.
#[inline]
fn target_gain(peak: f32, ceiling_gain: f32, knee: f32) -> f32 {
    if peak <= ceiling_gain || peak <= 1e-9 {
        return 1.0;
    }
    let hard = ceiling_gain / peak;
    if knee > 0.01 {
        let span = (ceiling_gain * 0.1 * knee).max(1e-6);
        let t = ((peak - ceiling_gain) / span).min(1.0);
        1.0 - t * (1.0 - hard)
    } else {
        hard
    }
}
