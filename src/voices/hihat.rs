//! Closed hi-hat voice.
//!
//! Six square-wave oscillators at fixed inharmonic frequencies, summed and
//! pushed through two band-pass filters (3.44 kHz and 7.10 kHz) for the
//! metallic timbre. The same oscillator bank drives the open hat and the
//! crash cymbal. The closed hat chokes fast when stopped, mirroring the
//! physical closed/open hat interaction; the grouping policy itself lives
//! in the engine.

use crate::buffer::AudioBuffer;
use crate::dsp::envelope::DecayEnvelope;
use crate::dsp::filter::SvFilter;
use crate::voices::{apply_pan, Voice, VoiceParams};

/// The six fixed oscillator frequencies shared by hats and cymbal.
pub(crate) const METAL_OSC_FREQS: [f32; 6] = [205.3, 304.4, 369.6, 522.7, 540.0, 800.0];

pub(crate) const HAT_BPF_1_HZ: f32 = 3_440.0;
pub(crate) const HAT_BPF_2_HZ: f32 = 7_100.0;

const CLOSED_DECAY_SECONDS: f32 = 0.19;
const CHOKE_SCALE: f32 = 0.01;

/// Bank of six free-running square oscillators.
pub(crate) struct SquareBank {
    phases: [f32; 6],
    incs: [f32; 6],
}

impl SquareBank {
    pub(crate) fn new() -> Self {
        Self {
            phases: [0.0; 6],
            incs: [0.0; 6],
        }
    }

    pub(crate) fn prepare(&mut self, sample_rate: f32) {
        for (inc, freq) in self.incs.iter_mut().zip(METAL_OSC_FREQS) {
            *inc = freq / sample_rate;
        }
        self.phases = [0.0; 6];
    }

    pub(crate) fn reset_phases(&mut self) {
        self.phases = [0.0; 6];
    }

    #[inline]
    pub(crate) fn next_sample(&mut self) -> f32 {
        let mut sum = 0.0;
        for (phase, inc) in self.phases.iter_mut().zip(self.incs) {
            sum += if *phase < 0.5 { 0.15 } else { -0.15 };
            *phase += inc;
            if *phase >= 1.0 {
                *phase -= 1.0;
            }
        }
        sum
    }
}

pub struct ClosedHiHat {
    params: VoiceParams,
    bank: SquareBank,
    env: DecayEnvelope,
    bp1: SvFilter,
    bp2: SvFilter,
    active: bool,
}

impl ClosedHiHat {
    pub fn new() -> Self {
        Self {
            params: VoiceParams::new(),
            bank: SquareBank::new(),
            env: DecayEnvelope::new(),
            bp1: SvFilter::bandpass(48_000.0, HAT_BPF_1_HZ, 2.0),
            bp2: SvFilter::bandpass(48_000.0, HAT_BPF_2_HZ, 2.0),
            active: false,
        }
    }
}

impl Default for ClosedHiHat {
    fn default() -> Self {
        Self::new()
    }
}

impl Voice for ClosedHiHat {
    fn prepare(&mut self, sample_rate: f32, _max_block_size: usize) {
        self.params.prepare(sample_rate);
        self.bank.prepare(sample_rate);
        self.env.reset();
        self.env.set_decay(sample_rate, CLOSED_DECAY_SECONDS);
        self.bp1 = SvFilter::bandpass(sample_rate, HAT_BPF_1_HZ, 2.0);
        self.bp2 = SvFilter::bandpass(sample_rate, HAT_BPF_2_HZ, 2.0);
        self.active = false;
    }

    fn trigger(&mut self, velocity: f32) {
        self.bank.reset_phases();
        self.env.trigger(velocity);
        self.active = true;
    }

    /// Fast choke: collapses the envelope to 1% over the next few ms.
    fn stop(&mut self) {
        self.env.choke(CHOKE_SCALE);
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
