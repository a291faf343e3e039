//! Drum voice synthesis.
//!
//! One self-contained voice per drum sound, each owning its oscillator,
//! envelope, and filter state. Voices are instantiated once at engine
//! startup and retriggered in place; there is no voice stealing. Each
//! voice renders additively into the shared output buffer and deactivates
//! itself the moment its envelopes fall under the silence floor.

mod bass_drum;
mod clap;
mod cowbell;
mod cymbal;
mod hihat;
mod openhat;
mod rimshot;
mod snare_drum;
mod tom;

pub use bass_drum::BassDrum;
pub use clap::Clap;
pub use cowbell::Cowbell;
pub use cymbal::CrashCymbal;
pub use hihat::ClosedHiHat;
pub use openhat::OpenHiHat;
pub use rimshot::RimShot;
pub use snare_drum::SnareDrum;
pub use tom::{Tom, TomTuning};

use crate::buffer::AudioBuffer;
use crate::dsp::smooth::Smoothed;

/// The closed set of drum sounds the engine hosts.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoiceKind {
    BassDrum,
    SnareDrum,
    ClosedHiHat,
    OpenHiHat,
    LowTom,
    MidTom,
    HighTom,
    Clap,
    RimShot,
    Cowbell,
    CrashCymbal,
}

impl VoiceKind {
    pub const ALL: [VoiceKind; 11] = [
        VoiceKind::BassDrum,
        VoiceKind::SnareDrum,
        VoiceKind::ClosedHiHat,
        VoiceKind::OpenHiHat,
        VoiceKind::LowTom,
        VoiceKind::MidTom,
        VoiceKind::HighTom,
        VoiceKind::Clap,
        VoiceKind::RimShot,
        VoiceKind::Cowbell,
        VoiceKind::CrashCymbal,
    ];

    /// How strongly the shared accent bus pushes this voice.
    pub fn accent_sensitivity(self) -> f32 {
        match self {
            VoiceKind::BassDrum => 0.6,
            VoiceKind::ClosedHiHat | VoiceKind::OpenHiHat | VoiceKind::CrashCymbal => 0.4,
            _ => 0.5,
        }
    }
}

/// Contract shared by every drum voice.
///
/// `prepare` must run before the first `trigger` or render; calling the
/// render path on an unprepared voice is outside the contract. The render
/// path never returns errors and never allocates.
pub trait Voice: Send {
    /// Reset all runtime state for a new sample rate.
    fn prepare(&mut self, sample_rate: f32, max_block_size: usize);

    /// Start a new strike. Velocity is expected in [0, 1]; callers clamp.
    /// Retriggering while still decaying simply resets state.
    fn trigger(&mut self, velocity: f32);

    /// Choke-able voices override this with their own fade policy.
    fn stop(&mut self) {}

    /// True while the voice still carries audible energy.
    fn is_active(&self) -> bool;

    /// Add `num_samples` of stereo-panned output into the buffer starting
    /// at `start_sample`. Must clear the active flag and stop writing the
    /// moment all envelopes fall under the silence floor.
    fn render_next_block(&mut self, buffer: &mut AudioBuffer, start_sample: usize, num_samples: usize);

    /// The voice's user-facing parameter block.
    fn params_mut(&mut self) -> &mut VoiceParams;
}

impl Voice for Box<dyn Voice> {
    fn prepare(&mut self, sample_rate: f32, max_block_size: usize) {
        (**self).prepare(sample_rate, max_block_size)
    }

    fn trigger(&mut self, velocity: f32) {
        (**self).trigger(velocity)
    }

    fn stop(&mut self) {
        (**self).stop()
    }

    fn is_active(&self) -> bool {
        (**self).is_active()
    }

    fn render_next_block(&mut self, buffer: &mut AudioBuffer, start_sample: usize, num_samples: usize) {
        (**self).render_next_block(buffer, start_sample, num_samples)
    }

    fn params_mut(&mut self) -> &mut VoiceParams {
        (**self).params_mut()
    }
}

/// Smoothed parameter block shared by all voices: level, tune (semitones),
/// fine tune, decay, tone, pan. Setters only move ramp targets, so they are
/// safe to call mid-block.
pub struct VoiceParams {
    pub level: Smoothed,
    pub tune: Smoothed,
    pub fine_tune: Smoothed,
    pub decay: Smoothed,
    pub tone: Smoothed,
    pub pan: Smoothed,
}

/// Ramp time for voice parameters.
pub const PARAM_SMOOTHING_SECONDS: f32 = 0.02;

impl VoiceParams {
    pub fn new() -> Self {
        Self {
            level: Smoothed::new(0.8),
            tune: Smoothed::new(0.0),
            fine_tune: Smoothed::new(0.0),
            decay: Smoothed::new(0.5),
            tone: Smoothed::new(0.5),
            pan: Smoothed::new(0.0),
        }
    }

    pub fn prepare(&mut self, sample_rate: f32) {
        self.level.reset(sample_rate, PARAM_SMOOTHING_SECONDS);
        self.tune.reset(sample_rate, PARAM_SMOOTHING_SECONDS);
        self.fine_tune.reset(sample_rate, PARAM_SMOOTHING_SECONDS);
        self.decay.reset(sample_rate, PARAM_SMOOTHING_SECONDS);
        self.tone.reset(sample_rate, PARAM_SMOOTHING_SECONDS);
        self.pan.reset(sample_rate, PARAM_SMOOTHING_SECONDS);
    }

    pub fn set_level(&mut self, level: f32) {
        self.level.set_target(level.clamp(0.0, 1.0));
    }

    /// Coarse tune in semitones.
    pub fn set_tune(&mut self, semitones: f32) {
        self.tune.set_target(semitones);
    }

    pub fn set_fine_tune(&mut self, semitones: f32) {
        self.fine_tune.set_target(semitones);
    }

    pub fn set_decay(&mut self, decay: f32) {
        self.decay.set_target(decay.clamp(0.0, 1.0));
    }

    pub fn set_tone(&mut self, tone: f32) {
        self.tone.set_target(tone.clamp(0.0, 1.0));
    }

    /// Pan position, -1 (left) to +1 (right).
    pub fn set_pan(&mut self, pan: f32) {
        self.pan.set_target(pan.clamp(-1.0, 1.0));
    }
}

impl Default for VoiceParams {
    fn default() -> Self {
        Self::new()
    }
}

/// Add a mono sample into the buffer with linear panning.
///
/// Mono buffers receive the full sample; extra channels beyond two stay
/// untouched.
#[inline]
pub(crate) fn apply_pan(buffer: &mut AudioBuffer, index: usize, sample: f32, pan: f32) {
    if buffer.num_channels() < 2 {
        buffer.add_sample(0, index, sample);
        return;
    }
    let position = (pan.clamp(-1.0, 1.0) + 1.0) * 0.5;
    buffer.add_sample(0, index, sample * (1.0 - position));
    buffer.add_sample(1, index, sample * position);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centre_pan_splits_evenly() {
        let mut buffer = AudioBuffer::new(2, 4);
        apply_pan(&mut buffer, 0, 1.0, 0.0);
        assert!((buffer.sample(0, 0) - 0.5).abs() < 1e-6);
        assert!((buffer.sample(1, 0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn hard_left_pan_is_left_only() {
        let mut buffer = AudioBuffer::new(2, 4);
        apply_pan(&mut buffer, 1, 0.8, -1.0);
        assert!((buffer.sample(0, 1) - 0.8).abs() < 1e-6);
        assert_eq!(buffer.sample(1, 1), 0.0);
    }

    #[test]
    fn mono_buffer_gets_full_sample() {
        let mut buffer = AudioBuffer::new(1, 4);
        apply_pan(&mut buffer, 2, 0.5, 0.7);
        assert_eq!(buffer.sample(0, 2), 0.5);
    }

    #[test]
    fn accent_sensitivity_covers_all_voices() {
        for kind in VoiceKind::ALL {
            let k = kind.accent_sensitivity();
            assert!((0.0..=1.0).contains(&k));
        }
    }
}
