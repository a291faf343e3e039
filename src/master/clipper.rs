use std::f32::consts::PI;

use crate::buffer::AudioBuffer;
use crate::dsp::level::db_to_gain;
use crate::dsp::mix::apply_dry_wet;
use crate::dsp::oversample::{Oversampler, OversamplingFactor};
use crate::dsp::smooth::Smoothed;
use crate::master::{block_value, NUM_CHANNELS};

/*
Clipper
=======

Drive gain, a saturation curve, then output gain:

  tanh  smooth saturation, the gentlest of the three
  atan  (2/pi) * atan(1.5 x), a harder shoulder
  poly  x - x^3/3 clamped to [-1.5, 1.5], an asymmetric hard edge

The whole drive -> curve -> output chain optionally runs 2x or 4x
oversampled so the harmonics the curve generates land above the audible
band before decimation. A dry copy of the pre-clip signal is kept and
crossfaded against the processed signal per the mix percentage.
*/

const PARAM_RAMP_SECONDS: f32 = 0.02;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipCurve {
    Tanh,
    Atan,
    Poly,
}

#[inline]
fn shape(curve: ClipCurve, x: f32) -> f32 {
    match curve {
        ClipCurve::Tanh => x.tanh(),
        ClipCurve::Atan => (2.0 / PI) * (x * 1.5).atan(),
        ClipCurve::Poly => {
            let x = x.clamp(-1.5, 1.5);
            x - (x * x * x) / 3.0
        }
    }
}

pub struct Clipper {
    drive_db: Smoothed,
    output_db: Smoothed,
    mix_percent: Smoothed,
    curve: ClipCurve,
    oversampling: OversamplingFactor,
    os2: Oversampler,
    os4: Oversampler,
    dry: Vec<Vec<f32>>,
}

impl Clipper {
    pub fn new() -> Self {
        Self {
            drive_db: Smoothed::new(0.0),
            output_db: Smoothed::new(0.0),
            mix_percent: Smoothed::new(100.0),
            curve: ClipCurve::Tanh,
            oversampling: OversamplingFactor::X2,
            os2: Oversampler::new(OversamplingFactor::X2, NUM_CHANNELS, 0),
            os4: Oversampler::new(OversamplingFactor::X4, NUM_CHANNELS, 0),
            dry: Vec::new(),
        }
    }

    pub fn prepare(&mut self, sample_rate: f32, max_block_size: usize) {
        self.drive_db.reset(sample_rate, PARAM_RAMP_SECONDS);
        self.output_db.reset(sample_rate, PARAM_RAMP_SECONDS);
        self.mix_percent.reset(sample_rate, PARAM_RAMP_SECONDS);
        self.os2 = Oversampler::new(OversamplingFactor::X2, NUM_CHANNELS, max_block_size);
        self.os4 = Oversampler::new(OversamplingFactor::X4, NUM_CHANNELS, max_block_size);
        self.dry = (0..NUM_CHANNELS).map(|_| vec![0.0; max_block_size]).collect();
    }

    pub fn set_drive(&mut self, db: f32) {
        self.drive_db.set_target(db);
    }

    pub fn set_output(&mut self, db: f32) {
        self.output_db.set_target(db);
    }

    /// Dry/wet mix in percent, 0 to 100.
    pub fn set_mix(&mut self, percent: f32) {
        self.mix_percent.set_target(percent.clamp(0.0, 100.0));
    }

    pub fn set_curve(&mut self, curve: ClipCurve) {
        self.curve = curve;
    }

    pub fn set_oversampling(&mut self, factor: OversamplingFactor) {
        self.oversampling = factor;
    }

    /// Re-provision for a larger host block. May allocate; call it from
    /// the chain entry point, not the per-sample loop.
    pub fn ensure_block_size(&mut self, max_block_size: usize) {
        self.os2.ensure_block_size(max_block_size);
        self.os4.ensure_block_size(max_block_size);
        for ch in self.dry.iter_mut() {
            if ch.len() < max_block_size {
                ch.resize(max_block_size, 0.0);
            }
        }
    }

    pub fn process(&mut self, buffer: &mut AudioBuffer) {
        let num_samples = buffer.num_samples();
        let num_channels = buffer.num_channels().min(NUM_CHANNELS);
        if num_samples == 0 || num_channels == 0 {
            return;
        }

        let drive_gain = db_to_gain(block_value(&mut self.drive_db, num_samples));
        let output_gain = db_to_gain(block_value(&mut self.output_db, num_samples));
        let mix = block_value(&mut self.mix_percent, num_samples) * 0.01;

        for ch in 0..num_channels {
            self.dry[ch][..num_samples].copy_from_slice(&buffer.channel(ch)[..num_samples]);
        }

        let curve = self.curve;
        match self.oversampling {
            OversamplingFactor::Off => {
                for ch in 0..num_channels {
                    for sample in buffer.channel_mut(ch).iter_mut() {
                        *sample = shape(curve, *sample * drive_gain) * output_gain;
                    }
                }
            }
            factor => {
                let os = if factor == OversamplingFactor::X2 {
                    &mut self.os2
                } else {
                    &mut self.os4
                };
                os.process_up(buffer, num_samples);
                for ch in 0..num_channels {
                    for sample in os.channel_mut(ch).iter_mut() {
                        *sample = shape(curve, *sample * drive_gain) * output_gain;
                    }
                }
                os.process_down(buffer, num_samples);
            }
        }

        if mix < 0.999 {
            for ch in 0..num_channels {
                apply_dry_wet(&self.dry[ch][..num_samples], buffer.channel_mut(ch), mix);
            }
        }
    }

    pub fn reset(&mut self) {
        self.os2.reset();
        self.os4.reset();
    }
}

impl Default for Clipper {
    fn default() -> Self {
        Self::new()
    }
}
