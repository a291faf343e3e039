//! Tom voices (low, mid, high).
//!
//! A pitch-bent sine through a resonant band-pass at the body frequency.
//! The three toms share one implementation and differ only in tuning
//! constants: 130, 200, and 325 Hz with a short downward bend and
//! progressively shorter decays.

use std::f32::consts::TAU;

use crate::buffer::AudioBuffer;
use crate::dsp::envelope::DecayEnvelope;
use crate::dsp::filter::SvFilter;
use crate::voices::{apply_pan, Voice, VoiceParams};

const BEND_SECONDS: f32 = 0.015;
const RESONANCE_Q: f32 = 10.0;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TomTuning {
    Low,
    Mid,
    High,
}

impl TomTuning {
    fn start_freq(self) -> f32 {
        match self {
            TomTuning::Low => 130.0,
            TomTuning::Mid => 200.0,
            TomTuning::High => 325.0,
        }
    }

    fn end_freq(self) -> f32 {
        match self {
            TomTuning::Low => 120.0,
            TomTuning::Mid => 185.0,
            TomTuning::High => 300.0,
        }
    }

    fn base_decay(self) -> f32 {
        match self {
            TomTuning::Low => 0.30,
            TomTuning::Mid => 0.28,
            TomTuning::High => 0.22,
        }
    }
}

pub struct Tom {
    tuning: TomTuning,
    params: VoiceParams,
    sample_rate: f32,
    phase: f32,
    time_since_trigger: f32,
    env: DecayEnvelope,
    resonator: SvFilter,
    active: bool,
}

impl Tom {
    pub fn new(tuning: TomTuning) -> Self {
        Self {
            tuning,
            params: VoiceParams::new(),
            sample_rate: 48_000.0,
            phase: 0.0,
            time_since_trigger: 0.0,
            env: DecayEnvelope::new(),
            resonator: SvFilter::bandpass(48_000.0, tuning.start_freq(), RESONANCE_Q),
            active: false,
        }
    }
}

impl Voice for Tom {
    fn prepare(&mut self, sample_rate: f32, _max_block_size: usize) {
        self.sample_rate = sample_rate;
        self.params.prepare(sample_rate);
        self.phase = 0.0;
        self.time_since_trigger = 0.0;
        self.env.reset();
        self.resonator = SvFilter::bandpass(sample_rate, self.tuning.start_freq(), RESONANCE_Q);
        self.active = false;
    }

    fn trigger(&mut self, velocity: f32) {
        self.phase = 0.0;
        self.time_since_trigger = 0.0;
        self.env.trigger(velocity);
        // Re-centre the resonator on the (possibly retuned) body frequency.
        let tune_mult = 2.0f32.powf(self.params.tune.target_value() / 12.0);
        self.resonator
            .set(self.sample_rate, self.tuning.start_freq() * tune_mult, RESONANCE_Q);
        self.active = true;
    }

    fn is_active(&self) -> bool {
        self.active && self.env.is_active()
    }

    fn render_next_block(&mut self, buffer: &mut AudioBuffer, start_sample: usize, num_samples: usize) {
        if !self.active {
            return;
        }

        let start_freq = self.tuning.start_freq();
        let end_freq = self.tuning.end_freq();

        for i in 0..num_samples {
            if !self.env.is_active() {
                self.active = false;
                break;
            }

            let tune = self.params.tune.next_value() + self.params.fine_tune.next_value();
            let decay = self.params.decay.next_value();
            let level = self.params.level.next_value();
            let pan = self.params.pan.next_value();

            let tune_mult = 2.0f32.powf(tune / 12.0);

            // Exponential bend from start to end frequency over 15 ms.
            self.time_since_trigger += 1.0 / self.sample_rate;
            let freq = if self.time_since_trigger < BEND_SECONDS {
                let t = self.time_since_trigger / BEND_SECONDS;
                start_freq * (end_freq / start_freq).powf(t)
            } else {
                end_freq
            } * tune_mult;

            self.env
                .set_decay(self.sample_rate, self.tuning.base_decay() * (0.5 + decay));

            let body = (self.phase * TAU).sin() * self.env.next_sample();
            self.phase += freq / self.sample_rate;
            if self.phase >= 1.0 {
                self.phase -= 1.0;
            }

            let sample = self.resonator.process(body) * level;
            apply_pan(buffer, start_sample + i, sample, pan);
        }
    }

    fn params_mut(&mut self) -> &mut VoiceParams {
        &mut self.params
    }
}
