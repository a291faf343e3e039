//! Bass drum voice.
//!
//! A sine-core resonator at 56 Hz with a brief pitch overshoot, the
//! signature "thump" of the classic analog bass drum.
//!
//! # How It Works
//!
//! 1. Sine resonator at 56 Hz (scaled by tune in semitones)
//! 2. Pitch envelope: +10% overshoot decaying with a 3 ms time constant,
//!    settled within the first ~10 ms
//! 3. One-pole low-pass toward a tone-adjustable cutoff (1.5-2 kHz)
//! 4. High-passed noise burst ("click") mixed in at the onset to stand in
//!    for the transient excitation of the bridged-T circuit
//! 5. Exponential amplitude decay, 100 ms to 1 s via the decay parameter

use std::f32::consts::TAU;

use crate::buffer::AudioBuffer;
use crate::dsp::envelope::DecayEnvelope;
use crate::dsp::filter::OnePole;
use crate::dsp::noise::NoiseSource;
use crate::voices::{apply_pan, Voice, VoiceParams};

const BODY_FREQ_HZ: f32 = 56.0;
const CLICK_HPF_HZ: f32 = 2_000.0;

pub struct BassDrum {
    params: VoiceParams,
    sample_rate: f32,
    phase: f32,
    env: DecayEnvelope,
    click_env: DecayEnvelope,
    pitch_env_time: f32,
    tone_lpf: OnePole,
    click_hpf: OnePole,
    noise: NoiseSource,
    active: bool,
}

impl BassDrum {
    pub fn new() -> Self {
        Self {
            params: VoiceParams::new(),
            sample_rate: 48_000.0,
            phase: 0.0,
            env: DecayEnvelope::new(),
            click_env: DecayEnvelope::new(),
            pitch_env_time: 0.0,
            tone_lpf: OnePole::new(),
            click_hpf: OnePole::new(),
            noise: NoiseSource::new(0x808),
            active: false,
        }
    }
}

impl Default for BassDrum {
    fn default() -> Self {
        Self::new()
    }
}

impl Voice for BassDrum {
    fn prepare(&mut self, sample_rate: f32, _max_block_size: usize) {
        self.sample_rate = sample_rate;
        self.params.prepare(sample_rate);
        self.phase = 0.0;
        self.env.reset();
        self.click_env.reset();
        // Click decays ~5% per sample regardless of sample rate.
        self.click_env.set_rate(0.95);
        self.pitch_env_time = 0.0;
        self.tone_lpf.reset();
        self.click_hpf.reset();
        self.click_hpf.set_cutoff(sample_rate, CLICK_HPF_HZ);
        self.active = false;
    }

    fn trigger(&mut self, velocity: f32) {
        self.phase = 0.0;
        self.env.trigger(velocity);
        self.click_env.trigger(velocity * 0.3);
        self.pitch_env_time = 0.0;
        self.active = true;
    }

    fn is_active(&self) -> bool {
        self.active && (self.env.is_active() || self.click_env.is_active())
    }

    fn render_next_block(&mut self, buffer: &mut AudioBuffer, start_sample: usize, num_samples: usize) {
        if !self.active {
            return;
        }

        for i in 0..num_samples {
            if !self.env.is_active() && !self.click_env.is_active() {
                self.active = false;
                break;
            }

            let tune = self.params.tune.next_value() + self.params.fine_tune.next_value();
            let decay = self.params.decay.next_value();
            let level = self.params.level.next_value();
            let tone = self.params.tone.next_value();
            let pan = self.params.pan.next_value();

            self.pitch_env_time += 1.0 / self.sample_rate;
            let pitch_mult = if self.pitch_env_time < 0.01 {
                1.0 + 0.1 * (-self.pitch_env_time / 0.003).exp()
            } else {
                1.0
            };

            let base_freq = BODY_FREQ_HZ * 2.0f32.powf(tune / 12.0);
            let phase_inc = base_freq * pitch_mult / self.sample_rate;

            self.env.set_decay(self.sample_rate, 0.1 + decay * 0.9);
            let mut sample = (self.phase * TAU).sin() * self.env.next_sample();

            self.tone_lpf.set_cutoff(self.sample_rate, 1_500.0 + tone * 500.0);
            sample = self.tone_lpf.lowpass(sample);

            self.phase += phase_inc;
            if self.phase >= 1.0 {
                self.phase -= 1.0;
            }

            if self.click_env.is_active() {
                let click = self.noise.next_sample() * self.click_env.next_sample();
                sample += self.click_hpf.highpass(click) * 0.3;
            }

            apply_pan(buffer, start_sample + i, sample * level, pan);
        }
    }

    fn params_mut(&mut self) -> &mut VoiceParams {
        &mut self.params
    }
}
