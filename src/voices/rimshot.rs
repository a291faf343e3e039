//! Rim shot voice: a very short noise impulse rung through a narrow
//! band-pass at 2.5 kHz.

use crate::buffer::AudioBuffer;
use crate::dsp::envelope::DecayEnvelope;
use crate::dsp::filter::SvFilter;
use crate::dsp::noise::NoiseSource;
use crate::voices::{apply_pan, Voice, VoiceParams};

const RING_HZ: f32 = 2_500.0;
const RING_Q: f32 = 5.0;
const DECAY_SECONDS: f32 = 0.03;
// The excitation itself dies off with a ~20-sample time constant.
const BURST_TAU_SAMPLES: f32 = 20.0;

pub struct RimShot {
    params: VoiceParams,
    noise: NoiseSource,
    env: DecayEnvelope,
    bp: SvFilter,
    active: bool,
}

impl RimShot {
    pub fn new() -> Self {
        Self {
            params: VoiceParams::new(),
            noise: NoiseSource::new(0x4453),
            env: DecayEnvelope::new(),
            bp: SvFilter::bandpass(48_000.0, RING_HZ, RING_Q),
            active: false,
        }
    }
}

impl Default for RimShot {
    fn default() -> Self {
        Self::new()
    }
}

impl Voice for RimShot {
    fn prepare(&mut self, sample_rate: f32, _max_block_size: usize) {
        self.params.prepare(sample_rate);
        self.env.reset();
        self.env
            .set_rate((-1.0 / BURST_TAU_SAMPLES - 1.0 / (DECAY_SECONDS * sample_rate)).exp());
        self.bp = SvFilter::bandpass(sample_rate, RING_HZ, RING_Q);
        self.active = false;
    }

    fn trigger(&mut self, velocity: f32) {
        self.env.trigger(velocity);
        self.active = true;
    }

    fn is_active(&self) -> bool {
        self.active && self.env.is_active()
    }

    fn render_next_block(&mut self, buffer: &mut AudioBuffer, start_sample: usize, num_samples: usize) {
        if !self.active {
            return;
        }

        for i in 0..num_samples {
            if !self.env.is_active() {
                self.active = false;
                break;
            }

            let excitation = self.noise.next_sample() * self.env.next_sample();
            let sample = self.bp.process(excitation) * self.params.level.next_value();
            let pan = self.params.pan.next_value();

            apply_pan(buffer, start_sample + i, sample, pan);
        }
    }

    fn params_mut(&mut self) -> &mut VoiceParams {
        &mut self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rimshot_is_over_in_milliseconds() {
        let mut voice = RimShot::new();
        voice.prepare(48_000.0, 512);
        voice.trigger(1.0);

        let mut buffer = AudioBuffer::new(2, 512);
        let mut samples = 0;
        while voice.is_active() && samples < 48_000 {
            buffer.clear();
            voice.render_next_block(&mut buffer, 0, 512);
            samples += 512;
        }
        assert!(
            samples < 4_800,
            "rim shot should be done within 100 ms, took {samples}"
        );
    }
}
