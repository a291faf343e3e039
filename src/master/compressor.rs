use crate::buffer::AudioBuffer;
use crate::dsp::delay::DelayLine;
use crate::dsp::filter::SvFilter;
use crate::dsp::level::{db_to_gain, gain_to_db, RmsWindow};
use crate::dsp::smooth::Smoothed;
use crate::master::{block_value, NUM_CHANNELS};

/*
Compressor
==========

Per-sample state machine:

  1. Detector: mean of the channels, optionally high-passed (sidechain
     HPF, ~80 Hz) so the bass drum does not dominate gain reduction.
  2. Level: running RMS over a 10 ms window, or instantaneous absolute
     peak, converted to dB.
  3. Gain computer: hard knee above threshold, or a quadratic soft knee
     that meets the hard-knee segment continuously at threshold + w/2.
  4. Envelope follower: one-pole, asymmetric. The attack coefficient
     applies while gain is falling (attenuation increasing), the release
     coefficient while it recovers toward unity.
  5. Apply: optionally through a short lookahead delay (max 5 ms) so the
     gain reduction lands slightly ahead of the transient it was computed
     from, at the cost of fixed latency.

Auto-makeup tracks input and post-gain output RMS over 300 ms windows and
applies `in/out` (clamped to [-12, +24] dB) uniformly at block end.
*/

const RMS_WINDOW_SECONDS: f32 = 0.01;
const MAKEUP_WINDOW_SECONDS: f32 = 0.3;
const MAX_LOOKAHEAD_SECONDS: f32 = 0.005;
const PARAM_RAMP_SECONDS: f32 = 0.02;
const SC_HPF_RAMP_SECONDS: f32 = 0.05;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorMode {
    Rms,
    Peak,
}

pub struct Compressor {
    sample_rate: f32,

    threshold_db: Smoothed,
    ratio: Smoothed,
    attack_ms: Smoothed,
    release_ms: Smoothed,
    knee_db: Smoothed,
    makeup_db: Smoothed,
    sc_hpf_hz: Smoothed,

    detector_mode: DetectorMode,
    auto_makeup: bool,
    sc_hpf_enabled: bool,
    lookahead_ms: f32,

    sc_filter: SvFilter,
    current_sc_hz: f32,
    rms_window: RmsWindow,
    lookahead: Vec<DelayLine>,
    makeup_in: RmsWindow,
    makeup_out: RmsWindow,

    envelope: f32,
    gain_reduction_db: f32,
}

impl Compressor {
    pub fn new() -> Self {
        Self {
            sample_rate: 48_000.0,
            threshold_db: Smoothed::new(0.0),
            ratio: Smoothed::new(4.0),
            attack_ms: Smoothed::new(10.0),
            release_ms: Smoothed::new(100.0),
            knee_db: Smoothed::new(0.0),
            makeup_db: Smoothed::new(0.0),
            sc_hpf_hz: Smoothed::new(80.0),
            detector_mode: DetectorMode::Rms,
            auto_makeup: false,
            sc_hpf_enabled: true,
            lookahead_ms: 0.0,
            sc_filter: SvFilter::highpass(48_000.0, 80.0, 0.707),
            current_sc_hz: 80.0,
            rms_window: RmsWindow::new(),
            lookahead: Vec::new(),
            makeup_in: RmsWindow::new(),
            makeup_out: RmsWindow::new(),
            envelope: 0.0,
            gain_reduction_db: 0.0,
        }
    }

    pub fn prepare(&mut self, sample_rate: f32, _max_block_size: usize) {
        self.sample_rate = sample_rate;

        self.threshold_db.reset(sample_rate, PARAM_RAMP_SECONDS);
        self.ratio.reset(sample_rate, PARAM_RAMP_SECONDS);
        self.attack_ms.reset(sample_rate, PARAM_RAMP_SECONDS);
        self.release_ms.reset(sample_rate, PARAM_RAMP_SECONDS);
        self.knee_db.reset(sample_rate, PARAM_RAMP_SECONDS);
        self.makeup_db.reset(sample_rate, PARAM_RAMP_SECONDS);
        self.sc_hpf_hz.reset(sample_rate, SC_HPF_RAMP_SECONDS);

        self.sc_filter = SvFilter::highpass(sample_rate, self.current_sc_hz, 0.707);
        self.rms_window
            .resize((sample_rate * RMS_WINDOW_SECONDS) as usize);
        let max_lookahead = (sample_rate * MAX_LOOKAHEAD_SECONDS) as usize + 1;
        self.lookahead = (0..NUM_CHANNELS).map(|_| DelayLine::new(max_lookahead)).collect();
        self.makeup_in
            .resize((sample_rate * MAKEUP_WINDOW_SECONDS) as usize);
        self.makeup_out
            .resize((sample_rate * MAKEUP_WINDOW_SECONDS) as usize);

        self.envelope = 0.0;
        self.gain_reduction_db = 0.0;
    }

    pub fn set_threshold(&mut self, db: f32) {
        self.threshold_db.set_target(db);
    }

    pub fn set_ratio(&mut self, ratio: f32) {
        self.ratio.set_target(ratio.max(1.0));
    }

    pub fn set_attack(&mut self, ms: f32) {
        self.attack_ms.set_target(ms.max(0.01));
    }

    pub fn set_release(&mut self, ms: f32) {
        self.release_ms.set_target(ms.max(1.0));
    }

    pub fn set_knee(&mut self, db: f32) {
        self.knee_db.set_target(db.max(0.0));
    }

    pub fn set_makeup(&mut self, db: f32) {
        self.makeup_db.set_target(db);
    }

    pub fn set_auto_makeup(&mut self, enabled: bool) {
        self.auto_makeup = enabled;
    }

    pub fn set_sc_hpf_freq(&mut self, hz: f32) {
        self.sc_hpf_hz.set_target(hz.clamp(20.0, 500.0));
    }

    pub fn set_sc_hpf_enabled(&mut self, enabled: bool) {
        self.sc_hpf_enabled = enabled;
    }

    pub fn set_detector_mode(&mut self, mode: DetectorMode) {
        self.detector_mode = mode;
    }

    /// Lookahead in ms, clamped to the provisioned 5 ms maximum.
    pub fn set_lookahead(&mut self, ms: f32) {
        self.lookahead_ms = ms.clamp(0.0, MAX_LOOKAHEAD_SECONDS * 1_000.0);
    }

    pub fn gain_reduction_db(&self) -> f32 {
        self.gain_reduction_db
    }

    pub fn process(&mut self, buffer: &mut AudioBuffer) {
        let num_samples = buffer.num_samples();
        let num_channels = buffer.num_channels().min(NUM_CHANNELS);
        if num_samples == 0 || num_channels == 0 {
            return;
        }

        // Retune the sidechain filter only when the ramp has moved.
        let target_sc = block_value(&mut self.sc_hpf_hz, num_samples);
        if (target_sc - self.current_sc_hz).abs() > 0.1 {
            self.current_sc_hz = target_sc;
            self.sc_filter.set(self.sample_rate, target_sc, 0.707);
        }

        let lookahead_samples = (self.sample_rate * self.lookahead_ms * 0.001) as usize;
        for line in self.lookahead.iter_mut() {
            line.set_delay(lookahead_samples);
        }

        let attack_coeff =
            (-1.0 / (block_value(&mut self.attack_ms, num_samples) * 0.001 * self.sample_rate)).exp();
        let release_coeff =
            (-1.0 / (block_value(&mut self.release_ms, num_samples) * 0.001 * self.sample_rate)).exp();

        for i in 0..num_samples {
            let mut detector = 0.0;
            for ch in 0..num_channels {
                detector += buffer.sample(ch, i);
            }
            detector /= num_channels as f32;

            let sc = if self.sc_hpf_enabled {
                self.sc_filter.process(detector)
            } else {
                detector
            };

            let level = match self.detector_mode {
                DetectorMode::Rms => {
                    self.rms_window.push(sc);
                    self.rms_window.value()
                }
                DetectorMode::Peak => sc.abs(),
            };
            let level_db = gain_to_db(level + 1e-6);

            let threshold = self.threshold_db.next_value();
            let ratio = self.ratio.next_value().max(1.0);
            let knee = self.knee_db.next_value();
            let gr_db = gain_computer(level_db, threshold, ratio, knee);

            let target_gain = db_to_gain(gr_db);
            self.envelope = if target_gain < self.envelope {
                attack_coeff * self.envelope + (1.0 - attack_coeff) * target_gain
            } else {
                release_coeff * self.envelope + (1.0 - release_coeff) * target_gain
            };

            self.makeup_in.push(detector);

            let mut out_mono = 0.0;
            for ch in 0..num_channels {
                let mut sample = buffer.sample(ch, i);
                if lookahead_samples > 0 {
                    sample = self.lookahead[ch].next_sample(sample);
                }
                sample *= self.envelope;
                out_mono += sample;
                buffer.set_sample(ch, i, sample);
            }
            self.makeup_out.push(out_mono / num_channels as f32);
        }

        let mut makeup_db = block_value(&mut self.makeup_db, num_samples);
        if self.auto_makeup {
            let in_rms = self.makeup_in.value();
            let out_rms = self.makeup_out.value();
            if out_rms > 1e-6 {
                makeup_db = gain_to_db(in_rms / out_rms).clamp(-12.0, 24.0);
            }
        }
        buffer.apply_gain(db_to_gain(makeup_db));

        self.gain_reduction_db = gain_to_db(self.envelope);
    }

    pub fn reset(&mut self) {
        self.sc_filter.reset();
        self.rms_window.reset();
        self.makeup_in.reset();
        self.makeup_out.reset();
        for line in self.lookahead.iter_mut() {
            line.reset();
        }
        self.envelope = 0.0;
        self.gain_reduction_db = 0.0;
    }
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new()
    }
}

/// Gain reduction in dB for a detector level, negative when compressing.
fn gain_computer(level_db: f32, threshold: f32, ratio: f32, knee: f32) -> f32 {
    if knee > 0.1 {
        let knee_start = threshold - knee * 0.5;
        let knee_end = threshold + knee * 0.5;
        if level_db < knee_start {
            0.0
        } else if level_db > knee_end {
            (threshold - level_db) + (level_db - threshold) / ratio
        } else {
            // Quadratic transition that lands exactly on the hard-knee
            // line at knee_end.
            let x = level_db - knee_start;
            (1.0 / ratio - 1.0) * x * x / (2.0 * knee)
        }
    } else if level_db > threshold {
        (threshold - level_db) + (level_db - threshold) / ratio
    } else {
        0.0
    }
}
