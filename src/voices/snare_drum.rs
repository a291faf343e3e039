//! Snare drum voice.
//!
//! Two sine resonators (180 Hz and 330 Hz) give the drum-head body; an
//! independently enveloped noise component, high-passed then band-passed,
//! stands in for the wire rattle. The tone parameter crossfades body
//! against noise. Body and noise decay at slightly different rates, which
//! is a big part of the "snappy" character.

use std::f32::consts::TAU;

use crate::buffer::AudioBuffer;
use crate::dsp::envelope::DecayEnvelope;
use crate::dsp::filter::SvFilter;
use crate::dsp::noise::NoiseSource;
use crate::voices::{apply_pan, Voice, VoiceParams};

const BODY_FREQ_1_HZ: f32 = 180.0;
const BODY_FREQ_2_HZ: f32 = 330.0;
const NOISE_HPF_HZ: f32 = 700.0;
const NOISE_BPF_HZ: f32 = 1_500.0;

pub struct SnareDrum {
    params: VoiceParams,
    sample_rate: f32,
    phase1: f32,
    phase2: f32,
    env: DecayEnvelope,
    noise_env: DecayEnvelope,
    hp: SvFilter,
    bp: SvFilter,
    noise: NoiseSource,
    active: bool,
}

impl SnareDrum {
    pub fn new() -> Self {
        Self {
            params: VoiceParams::new(),
            sample_rate: 48_000.0,
            phase1: 0.0,
            phase2: 0.0,
            env: DecayEnvelope::new(),
            noise_env: DecayEnvelope::new(),
            hp: SvFilter::highpass(48_000.0, NOISE_HPF_HZ, 0.707),
            bp: SvFilter::bandpass(48_000.0, NOISE_BPF_HZ, 1.0),
            noise: NoiseSource::new(0x5D),
            active: false,
        }
    }
}

impl Default for SnareDrum {
    fn default() -> Self {
        Self::new()
    }
}

impl Voice for SnareDrum {
    fn prepare(&mut self, sample_rate: f32, _max_block_size: usize) {
        self.sample_rate = sample_rate;
        self.params.prepare(sample_rate);
        self.phase1 = 0.0;
        self.phase2 = 0.0;
        self.env.reset();
        self.noise_env.reset();
        self.hp = SvFilter::highpass(sample_rate, NOISE_HPF_HZ, 0.707);
        self.bp = SvFilter::bandpass(sample_rate, NOISE_BPF_HZ, 1.0);
        self.active = false;
    }

    fn trigger(&mut self, velocity: f32) {
        self.phase1 = 0.0;
        self.phase2 = 0.0;
        self.env.trigger(velocity);
        self.noise_env.trigger(velocity);
        self.active = true;
    }

    fn is_active(&self) -> bool {
        self.active && (self.env.is_active() || self.noise_env.is_active())
    }

    fn render_next_block(&mut self, buffer: &mut AudioBuffer, start_sample: usize, num_samples: usize) {
        if !self.active {
            return;
        }

        for i in 0..num_samples {
            if !self.env.is_active() && !self.noise_env.is_active() {
                self.active = false;
                break;
            }

            let level = self.params.level.next_value();
            let decay = self.params.decay.next_value();
            let tone = self.params.tone.next_value();
            let tune = self.params.tune.next_value() + self.params.fine_tune.next_value();
            let pan = self.params.pan.next_value();

            let tune_mult = 2.0f32.powf(tune / 12.0);
            let inc1 = BODY_FREQ_1_HZ * tune_mult / self.sample_rate;
            let inc2 = BODY_FREQ_2_HZ * tune_mult / self.sample_rate;

            // Body: 250 ms, noise: 200 ms, both nudged by the decay knob.
            self.env.set_decay(self.sample_rate, 0.25 * (0.9 + decay * 0.2));
            self.noise_env.set_decay(self.sample_rate, 0.20 * (0.9 + decay * 0.2));

            let body_env = self.env.next_sample();
            let body1 = (self.phase1 * TAU).sin() * body_env * 0.5;
            let body2 = (self.phase2 * TAU).sin() * body_env * 0.3;

            self.phase1 += inc1;
            self.phase2 += inc2;
            if self.phase1 >= 1.0 {
                self.phase1 -= 1.0;
            }
            if self.phase2 >= 1.0 {
                self.phase2 -= 1.0;
            }

            let mut noise = self.noise.next_sample() * self.noise_env.next_sample();
            noise = self.hp.process(noise);
            noise = self.bp.process(noise);

            // Tone crossfades drum-head body against wire rattle.
            let body_mix = tone;
            let noise_mix = 0.6 * (1.0 - tone * 0.5);
            let sample = ((body1 + body2) * body_mix + noise * noise_mix) * level;

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

    const SAMPLE_RATE: f32 = 48_000.0;

    fn energy(voice: &mut SnareDrum, samples: usize) -> f32 {
        let mut buffer = AudioBuffer::new(2, samples);
        buffer.clear();
        voice.render_next_block(&mut buffer, 0, samples);
        buffer.channel(0).iter().map(|&s| s * s).sum()
    }

    #[test]
    fn produces_output_then_decays() {
        let mut voice = SnareDrum::new();
        voice.prepare(SAMPLE_RATE, 512);
        voice.trigger(1.0);

        let early = energy(&mut voice, 4_800);
        assert!(early > 0.0);

        // 250 ms time constant reaches the floor within ~2.5 s.
        let mut buffer = AudioBuffer::new(2, 2_048);
        for _ in 0..70 {
            buffer.clear();
            voice.render_next_block(&mut buffer, 0, 2_048);
        }
        assert!(!voice.is_active());
    }

    #[test]
    fn tone_shifts_body_noise_balance() {
        // Full tone: body only (noise still present but reduced).
        let mut body_heavy = SnareDrum::new();
        body_heavy.prepare(SAMPLE_RATE, 512);
        body_heavy.params_mut().set_tone(1.0);
        body_heavy.params_mut().prepare(SAMPLE_RATE); // snap the ramp
        body_heavy.trigger(1.0);

        let mut noise_heavy = SnareDrum::new();
        noise_heavy.prepare(SAMPLE_RATE, 512);
        noise_heavy.params_mut().set_tone(0.0);
        noise_heavy.params_mut().prepare(SAMPLE_RATE);
        noise_heavy.trigger(1.0);

        // With tone at zero the body contributes nothing, so the noise-only
        // render has less low-frequency weight. Compare sub-500 Hz energy by
        // low-passing a copy of each render.
        let body_out = {
            let mut buffer = AudioBuffer::new(2, 2_048);
            buffer.clear();
            body_heavy.render_next_block(&mut buffer, 0, 2_048);
            buffer.channel(0).to_vec()
        };
        let noise_out = {
            let mut buffer = AudioBuffer::new(2, 2_048);
            buffer.clear();
            noise_heavy.render_next_block(&mut buffer, 0, 2_048);
            buffer.channel(0).to_vec()
        };

        let low_energy = |samples: &[f32]| {
            let mut lp = SvFilter::lowpass(SAMPLE_RATE, 500.0, 0.707);
            samples.iter().map(|&s| lp.process(s).powi(2)).sum::<f32>()
        };
        assert!(
            low_energy(&body_out) > low_energy(&noise_out) * 2.0,
            "full tone should carry more body"
        );
    }
}
