//! Hand clap voice.
//!
//! Four band-passed noise bursts spaced 12 ms apart simulate the spread of
//! several hands striking near-simultaneously, with the last burst ringing
//! out as the "room" tail.

use crate::buffer::AudioBuffer;
use crate::dsp::envelope::DecayEnvelope;
use crate::dsp::filter::SvFilter;
use crate::dsp::noise::NoiseSource;
use crate::voices::{apply_pan, Voice, VoiceParams};

const BURST_OFFSETS_MS: [f32; 4] = [0.0, 12.0, 24.0, 36.0];
const BURST_GAIN: f32 = 0.25;

pub struct Clap {
    params: VoiceParams,
    sample_rate: f32,
    noise: NoiseSource,
    env: DecayEnvelope,
    bp: SvFilter,
    samples_since_trigger: usize,
    next_burst: usize,
    velocity: f32,
    active: bool,
}

impl Clap {
    pub fn new() -> Self {
        Self {
            params: VoiceParams::new(),
            sample_rate: 48_000.0,
            noise: NoiseSource::new(0xC1A9),
            env: DecayEnvelope::new(),
            bp: SvFilter::bandpass(48_000.0, 1_500.0, 2.0),
            samples_since_trigger: 0,
            next_burst: 0,
            velocity: 0.0,
            active: false,
        }
    }

    fn burst_offset_samples(&self, burst: usize) -> usize {
        (BURST_OFFSETS_MS[burst] * 0.001 * self.sample_rate) as usize
    }
}

impl Default for Clap {
    fn default() -> Self {
        Self::new()
    }
}

impl Voice for Clap {
    fn prepare(&mut self, sample_rate: f32, _max_block_size: usize) {
        self.sample_rate = sample_rate;
        self.params.prepare(sample_rate);
        self.env.reset();
        self.bp = SvFilter::bandpass(sample_rate, 1_500.0, 2.0);
        self.samples_since_trigger = 0;
        self.next_burst = BURST_OFFSETS_MS.len();
        self.velocity = 0.0;
        self.active = false;
    }

    fn trigger(&mut self, velocity: f32) {
        self.samples_since_trigger = 0;
        self.next_burst = 0;
        self.velocity = velocity;
        self.env.cut();
        self.active = true;
    }

    fn is_active(&self) -> bool {
        self.active && (self.env.is_active() || self.next_burst < BURST_OFFSETS_MS.len())
    }

    fn render_next_block(&mut self, buffer: &mut AudioBuffer, start_sample: usize, num_samples: usize) {
        if !self.active {
            return;
        }

        for i in 0..num_samples {
            let bursts_pending = self.next_burst < BURST_OFFSETS_MS.len();
            if !self.env.is_active() && !bursts_pending {
                self.active = false;
                break;
            }

            if bursts_pending && self.samples_since_trigger >= self.burst_offset_samples(self.next_burst)
            {
                // Each burst re-arms the envelope, giving the stutter.
                self.env.trigger(self.velocity);
                self.next_burst += 1;
            }
            self.samples_since_trigger += 1;

            let decay = self.params.decay.next_value();
            let tone = self.params.tone.next_value();
            let level = self.params.level.next_value();
            let pan = self.params.pan.next_value();

            self.env.set_decay(self.sample_rate, 0.075 + decay * 0.15);
            self.bp.set(self.sample_rate, 1_500.0 + tone * 1_000.0, 2.0);

            let burst = self.noise.next_sample() * self.env.next_sample();
            let sample = self.bp.process(burst) * BURST_GAIN * level;

            apply_pan(buffer, start_sample + i, sample, pan);
        }
    }

    fn params_mut(&mut self) -> &mut VoiceParams {
        &mut self.params
    }
}
