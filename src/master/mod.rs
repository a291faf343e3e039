//! Master-bus dynamics chain: compressor, clipper, true-peak limiter.
//!
//! Stages run in a fixed order, compressor then clipper then limiter, so
//! the limiter always catches peaks the clipper introduces. Each stage can
//! be enabled independently per process call. All per-stage state (envelope
//! followers, detection windows, delay lines, oversamplers) is owned
//! exclusively by this struct; `reset` clears everything so no stale gain
//! reduction carries into a new playback session.

mod clipper;
mod compressor;
mod limiter;

pub use clipper::{ClipCurve, Clipper};
pub use compressor::{Compressor, DetectorMode};
pub use limiter::Limiter;

use crate::buffer::AudioBuffer;
use crate::dsp::oversample::OversamplingFactor;
use crate::dsp::smooth::Smoothed;

/// The chain is provisioned for stereo; mono buffers use the left lane.
pub(crate) const NUM_CHANNELS: usize = 2;

/// Read a smoothed value once for a block of `num_samples`, advancing the
/// ramp as if it had been read every sample.
#[inline]
pub(crate) fn block_value(param: &mut Smoothed, num_samples: usize) -> f32 {
    let value = param.next_value();
    param.skip(num_samples.saturating_sub(1));
    value
}

pub struct MasterDynamics {
    compressor: Compressor,
    clipper: Clipper,
    limiter: Limiter,
}

impl MasterDynamics {
    pub fn new() -> Self {
        Self {
            compressor: Compressor::new(),
            clipper: Clipper::new(),
            limiter: Limiter::new(),
        }
    }

    /// Provision every stage. Must be called before the first `process`.
    pub fn prepare(&mut self, sample_rate: f32, max_block_size: usize) {
        self.compressor.prepare(sample_rate, max_block_size);
        self.clipper.prepare(sample_rate, max_block_size);
        self.limiter.prepare(sample_rate, max_block_size);
    }

    /// Run the enabled stages over the buffer. Stages always apply in the
    /// fixed order compressor, clipper, limiter regardless of flag order.
    pub fn process(
        &mut self,
        buffer: &mut AudioBuffer,
        comp_enabled: bool,
        limiter_enabled: bool,
        clipper_enabled: bool,
    ) {
        // Hosts may change block size between calls; re-provision the
        // oversamplers before touching audio.
        let block = buffer.num_samples();
        self.clipper.ensure_block_size(block);
        self.limiter.ensure_block_size(block);

        if comp_enabled {
            self.compressor.process(buffer);
        }
        if clipper_enabled {
            self.clipper.process(buffer);
        }
        if limiter_enabled {
            self.limiter.process(buffer);
        }
    }

    /// Current compressor gain reduction in dB, for metering.
    pub fn gain_reduction_db(&self) -> f32 {
        self.compressor.gain_reduction_db()
    }

    pub fn reset(&mut self) {
        self.compressor.reset();
        self.clipper.reset();
        self.limiter.reset();
    }

    // Compressor parameters.

    pub fn set_threshold(&mut self, db: f32) {
        self.compressor.set_threshold(db);
    }

    pub fn set_ratio(&mut self, ratio: f32) {
        self.compressor.set_ratio(ratio);
    }

    pub fn set_attack(&mut self, ms: f32) {
        self.compressor.set_attack(ms);
    }

    pub fn set_release(&mut self, ms: f32) {
        self.compressor.set_release(ms);
    }

    pub fn set_knee(&mut self, db: f32) {
        self.compressor.set_knee(db);
    }

    pub fn set_makeup(&mut self, db: f32) {
        self.compressor.set_makeup(db);
    }

    pub fn set_auto_makeup(&mut self, enabled: bool) {
        self.compressor.set_auto_makeup(enabled);
    }

    pub fn set_sc_hpf_freq(&mut self, hz: f32) {
        self.compressor.set_sc_hpf_freq(hz);
    }

    pub fn set_sc_hpf_enabled(&mut self, enabled: bool) {
        self.compressor.set_sc_hpf_enabled(enabled);
    }

    pub fn set_detector_mode(&mut self, mode: DetectorMode) {
        self.compressor.set_detector_mode(mode);
    }

    pub fn set_lookahead(&mut self, ms: f32) {
        self.compressor.set_lookahead(ms);
    }

    // Clipper parameters.

    pub fn set_clipper_drive(&mut self, db: f32) {
        self.clipper.set_drive(db);
    }

    pub fn set_clipper_output(&mut self, db: f32) {
        self.clipper.set_output(db);
    }

    pub fn set_clipper_mix(&mut self, percent: f32) {
        self.clipper.set_mix(percent);
    }

    pub fn set_clipper_curve(&mut self, curve: ClipCurve) {
        self.clipper.set_curve(curve);
    }

    pub fn set_clipper_oversampling(&mut self, factor: OversamplingFactor) {
        self.clipper.set_oversampling(factor);
    }

    // Limiter parameters.

    pub fn set_limiter_ceiling(&mut self, db: f32) {
        self.limiter.set_ceiling(db);
    }

    pub fn set_limiter_release(&mut self, ms: f32) {
        self.limiter.set_release(ms);
    }

    pub fn set_limiter_knee(&mut self, knee: f32) {
        self.limiter.set_knee(knee);
    }

    pub fn set_limiter_lookahead(&mut self, ms: f32) {
        self.limiter.set_lookahead(ms);
    }

    pub fn set_limiter_oversampling(&mut self, enabled: bool) {
        self.limiter.set_oversampling(enabled);
    }
}

impl Default for MasterDynamics {
    fn default() -> Self {
        Self::new()
    }
}
