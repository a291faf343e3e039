//! Open hi-hat voice.
//!
//! Same oscillator bank and band-pass pair as the closed hat, but with a
//! user-controllable decay (roughly 245-490 ms) and an immediate cut on
//! `stop()` so the closed hat can silence it.

use crate::buffer::AudioBuffer;
use crate::dsp::envelope::DecayEnvelope;
use crate::dsp::filter::SvFilter;
use crate::voices::hihat::{SquareBank, HAT_BPF_1_HZ, HAT_BPF_2_HZ};
use crate::voices::{apply_pan, Voice, VoiceParams};

const OPEN_DECAY_SECONDS: f32 = 0.49;

pub struct OpenHiHat {
    params: VoiceParams,
    sample_rate: f32,
    bank: SquareBank,
    env: DecayEnvelope,
    bp1: SvFilter,
    bp2: SvFilter,
    active: bool,
}

impl OpenHiHat {
    pub fn new() -> Self {
        Self {
            params: VoiceParams::new(),
            sample_rate: 48_000.0,
            bank: SquareBank::new(),
            env: DecayEnvelope::new(),
            bp1: SvFilter::bandpass(48_000.0, HAT_BPF_1_HZ, 2.0),
            bp2: SvFilter::bandpass(48_000.0, HAT_BPF_2_HZ, 2.0),
            active: false,
        }
    }
}

impl Default for OpenHiHat {
    fn default() -> Self {
        Self::new()
    }
}

impl Voice for OpenHiHat {
    fn prepare(&mut self, sample_rate: f32, _max_block_size: usize) {
        self.sample_rate = sample_rate;
        self.params.prepare(sample_rate);
        self.bank.prepare(sample_rate);
        self.env.reset();
        self.bp1 = SvFilter::bandpass(sample_rate, HAT_BPF_1_HZ, 2.0);
        self.bp2 = SvFilter::bandpass(sample_rate, HAT_BPF_2_HZ, 2.0);
        self.active = false;
    }

    fn trigger(&mut self, velocity: f32) {
        self.bank.reset_phases();
        self.env.trigger(velocity);
        self.active = true;
    }

    /// Immediate silence; the closed hat's strike replaces the tail.
    fn stop(&mut self) {
        self.env.cut();
        self.active = false;
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

            let decay = self.params.decay.next_value();
            self.env
                .set_decay(self.sample_rate, OPEN_DECAY_SECONDS * (0.5 + decay * 0.5));

            let filtered = self.bp2.process(self.bp1.process(self.bank.next_sample()));
            let sample = filtered * self.env.next_sample() * self.params.level.next_value();
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

    const SAMPLE_RATE: f32 = 48_000.0;

    #[test]
    fn rings_longer_than_closed_hat() {
        use crate::voices::ClosedHiHat;

        let mut open = OpenHiHat::new();
        open.prepare(SAMPLE_RATE, 512);
        open.trigger(1.0);

        let mut closed = ClosedHiHat::new();
        closed.prepare(SAMPLE_RATE, 512);
        closed.trigger(1.0);

        let mut buffer = AudioBuffer::new(2, 2_048);
        let mut closed_lifetime = 0;
        while closed.is_active() {
            buffer.clear();
            closed.render_next_block(&mut buffer, 0, 2_048);
            closed_lifetime += 2_048;
            assert!(closed_lifetime < 48_000 * 4);
        }
        let mut open_lifetime = 0;
        while open.is_active() {
            buffer.clear();
            open.render_next_block(&mut buffer, 0, 2_048);
            open_lifetime += 2_048;
            assert!(open_lifetime < 48_000 * 8);
        }

        assert!(
            open_lifetime > closed_lifetime * 2,
            "open hat should ring out: open={open_lifetime} closed={closed_lifetime}"
        );
    }

    #[test]
    fn stop_cuts_immediately() {
        let mut voice = OpenHiHat::new();
        voice.prepare(SAMPLE_RATE, 512);
        voice.trigger(1.0);
        voice.stop();
        assert!(!voice.is_active());

        let mut buffer = AudioBuffer::new(2, 64);
        buffer.clear();
        voice.render_next_block(&mut buffer, 0, 64);
        assert_eq!(buffer.peak(), 0.0);
    }
}
