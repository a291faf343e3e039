//! Cowbell voice: two square oscillators at the factory-trimmed 540 Hz and
//! 800 Hz, band-passed around 1.5 kHz.

use crate::buffer::AudioBuffer;
use crate::dsp::envelope::DecayEnvelope;
use crate::dsp::filter::SvFilter;
use crate::voices::{apply_pan, Voice, VoiceParams};

const OSC_FREQS: [f32; 2] = [540.0, 800.0];

pub struct Cowbell {
    params: VoiceParams,
    sample_rate: f32,
    phases: [f32; 2],
    env: DecayEnvelope,
    bp: SvFilter,
    active: bool,
}

impl Cowbell {
    pub fn new() -> Self {
        Self {
            params: VoiceParams::new(),
            sample_rate: 48_000.0,
            phases: [0.0; 2],
            env: DecayEnvelope::new(),
            bp: SvFilter::bandpass(48_000.0, 1_500.0, 2.0),
            active: false,
        }
    }
}

impl Default for Cowbell {
    fn default() -> Self {
        Self::new()
    }
}

impl Voice for Cowbell {
    fn prepare(&mut self, sample_rate: f32, _max_block_size: usize) {
        self.sample_rate = sample_rate;
        self.params.prepare(sample_rate);
        self.phases = [0.0; 2];
        self.env.reset();
        self.bp = SvFilter::bandpass(sample_rate, 1_500.0, 2.0);
        self.active = false;
    }

    fn trigger(&mut self, velocity: f32) {
        self.phases = [0.0; 2];
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

            let tune = self.params.tune.next_value() + self.params.fine_tune.next_value();
            let decay = self.params.decay.next_value();
            let level = self.params.level.next_value();
            let pan = self.params.pan.next_value();

            let tune_mult = 2.0f32.powf(tune / 12.0);
            let mut sum = 0.0;
            for (phase, freq) in self.phases.iter_mut().zip(OSC_FREQS) {
                sum += if *phase < 0.5 { 0.5 } else { -0.5 };
                *phase += freq * tune_mult / self.sample_rate;
                if *phase >= 1.0 {
                    *phase -= 1.0;
                }
            }

            self.env.set_decay(self.sample_rate, 0.1 + decay * 0.5);
            let sample = self.bp.process(sum) * self.env.next_sample() * level;

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
    fn cowbell_decays_to_silence() {
        let mut voice = Cowbell::new();
        voice.prepare(48_000.0, 512);
        voice.trigger(1.0);

        let mut buffer = AudioBuffer::new(2, 2_048);
        let mut rendered = 0;
        while voice.is_active() && rendered < 48_000 * 8 {
            buffer.clear();
            voice.render_next_block(&mut buffer, 0, 2_048);
            rendered += 2_048;
        }
        assert!(!voice.is_active());
        assert!(rendered > 4_800, "350 ms class decay should last a while");
    }
}
