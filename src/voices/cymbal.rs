//! Crash cymbal voice.
//!
//! The metallic oscillator bank again, with an extra high-pass for
//! brightness and a much longer decay than the hats.

use crate::buffer::AudioBuffer;
use crate::dsp::envelope::DecayEnvelope;
use crate::dsp::filter::SvFilter;
use crate::voices::hihat::{SquareBank, HAT_BPF_1_HZ, HAT_BPF_2_HZ};
use crate::voices::{apply_pan, Voice, VoiceParams};

const CRASH_DECAY_SECONDS: f32 = 1.2;
const BRIGHTNESS_HPF_HZ: f32 = 5_000.0;

pub struct CrashCymbal {
    params: VoiceParams,
    bank: SquareBank,
    env: DecayEnvelope,
    bp1: SvFilter,
    bp2: SvFilter,
    hp: SvFilter,
    active: bool,
}

impl CrashCymbal {
    pub fn new() -> Self {
        Self {
            params: VoiceParams::new(),
            bank: SquareBank::new(),
            env: DecayEnvelope::new(),
            bp1: SvFilter::bandpass(48_000.0, HAT_BPF_1_HZ, 2.0),
            bp2: SvFilter::bandpass(48_000.0, HAT_BPF_2_HZ, 2.0),
            hp: SvFilter::highpass(48_000.0, BRIGHTNESS_HPF_HZ, 0.707),
            active: false,
        }
    }
}

impl Default for CrashCymbal {
    fn default() -> Self {
        Self::new()
    }
}

impl Voice for CrashCymbal {
    fn prepare(&mut self, sample_rate: f32, _max_block_size: usize) {
        self.params.prepare(sample_rate);
        self.bank.prepare(sample_rate);
        self.env.reset();
        self.env.set_decay(sample_rate, CRASH_DECAY_SECONDS);
        self.bp1 = SvFilter::bandpass(sample_rate, HAT_BPF_1_HZ, 2.0);
        self.bp2 = SvFilter::bandpass(sample_rate, HAT_BPF_2_HZ, 2.0);
        self.hp = SvFilter::highpass(sample_rate, BRIGHTNESS_HPF_HZ, 0.707);
        self.active = false;
    }

    fn trigger(&mut self, velocity: f32) {
        self.bank.reset_phases();
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

            let mut sample = self.bp2.process(self.bp1.process(self.bank.next_sample()));
            sample = self.hp.process(sample);
            sample *= self.env.next_sample() * self.params.level.next_value();
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
    fn crash_outlives_a_second() {
        let mut voice = CrashCymbal::new();
        voice.prepare(48_000.0, 512);
        voice.trigger(1.0);

        let mut buffer = AudioBuffer::new(2, 2_048);
        let mut rendered = 0usize;
        while voice.is_active() && rendered < 48_000 * 15 {
            buffer.clear();
            voice.render_next_block(&mut buffer, 0, 2_048);
            rendered += 2_048;
        }
        assert!(!voice.is_active(), "cymbal must eventually decay");
        assert!(rendered > 48_000, "1.2 s time constant rings past a second");
    }
}
