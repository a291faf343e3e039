// Purpose: trigger routing, voice mixing, and the master processing chain.
// This layer sits above the voices and drives them from control messages.

pub mod message;

pub use message::{EngineMessage, MessageReceiver, VoiceParamKind};

use crate::buffer::AudioBuffer;
use crate::master::MasterDynamics;
use crate::reverb::AlgorithmicReverb;
use crate::voices::{
    BassDrum, Clap, ClosedHiHat, Cowbell, CrashCymbal, OpenHiHat, RimShot, SnareDrum, Tom,
    TomTuning, Voice, VoiceKind, VoiceParams,
};

/// The drum engine: one instance of every voice, an additive mix bus, and
/// the master chain behind it.
///
/// Single-threaded and block-synchronous. Triggers and parameter changes
/// arrive either through direct method calls or through a lock-free
/// message queue drained at the top of each rendered block.
pub struct DrumEngine {
    voices: Vec<(VoiceKind, Box<dyn Voice>)>,
    master: MasterDynamics,
    reverb: AlgorithmicReverb,
    comp_enabled: bool,
    clipper_enabled: bool,
    limiter_enabled: bool,
    reverb_enabled: bool,
    accent: f32,
}

impl DrumEngine {
    pub fn new() -> Self {
        let voices: Vec<(VoiceKind, Box<dyn Voice>)> = vec![
            (VoiceKind::BassDrum, Box::new(BassDrum::new())),
            (VoiceKind::SnareDrum, Box::new(SnareDrum::new())),
            (VoiceKind::ClosedHiHat, Box::new(ClosedHiHat::new())),
            (VoiceKind::OpenHiHat, Box::new(OpenHiHat::new())),
            (VoiceKind::LowTom, Box::new(Tom::new(TomTuning::Low))),
            (VoiceKind::MidTom, Box::new(Tom::new(TomTuning::Mid))),
            (VoiceKind::HighTom, Box::new(Tom::new(TomTuning::High))),
            (VoiceKind::Clap, Box::new(Clap::new())),
            (VoiceKind::RimShot, Box::new(RimShot::new())),
            (VoiceKind::Cowbell, Box::new(Cowbell::new())),
            (VoiceKind::CrashCymbal, Box::new(CrashCymbal::new())),
        ];
        Self {
            voices,
            master: MasterDynamics::new(),
            reverb: AlgorithmicReverb::new(),
            comp_enabled: false,
            clipper_enabled: false,
            limiter_enabled: true,
            reverb_enabled: false,
            accent: 0.0,
        }
    }

    /// Reset every voice and processor for a new sample rate. Must not be
    /// called concurrently with `render_next_block`; the host stops
    /// playback first.
    pub fn prepare(&mut self, sample_rate: f32, max_block_size: usize) {
        for (_, voice) in self.voices.iter_mut() {
            voice.prepare(sample_rate, max_block_size);
        }
        self.master.prepare(sample_rate, max_block_size);
        self.reverb.prepare(sample_rate, max_block_size);
    }

    /// Slot of each voice in the bank; matches the construction order.
    fn slot(kind: VoiceKind) -> usize {
        match kind {
            VoiceKind::BassDrum => 0,
            VoiceKind::SnareDrum => 1,
            VoiceKind::ClosedHiHat => 2,
            VoiceKind::OpenHiHat => 3,
            VoiceKind::LowTom => 4,
            VoiceKind::MidTom => 5,
            VoiceKind::HighTom => 6,
            VoiceKind::Clap => 7,
            VoiceKind::RimShot => 8,
            VoiceKind::Cowbell => 9,
            VoiceKind::CrashCymbal => 10,
        }
    }

    fn voice_mut(&mut self, kind: VoiceKind) -> &mut Box<dyn Voice> {
        let slot = Self::slot(kind);
        debug_assert_eq!(self.voices[slot].0, kind);
        &mut self.voices[slot].1
    }

    /// Trigger a voice. Velocity is clamped to [0, 1], boosted by the
    /// accent bus scaled by the voice's accent sensitivity.
    pub fn trigger(&mut self, kind: VoiceKind, velocity: f32) {
        let accent_gain = 1.0 + kind.accent_sensitivity() * self.accent;
        let velocity = (velocity.clamp(0.0, 1.0) * accent_gain).min(1.0);

        // Closed and open hat share a voice group: either one chokes the
        // other, like the single hat circuit they model.
        match kind {
            VoiceKind::ClosedHiHat => self.voice_mut(VoiceKind::OpenHiHat).stop(),
            VoiceKind::OpenHiHat => self.voice_mut(VoiceKind::ClosedHiHat).stop(),
            _ => {}
        }

        self.voice_mut(kind).trigger(velocity);
    }

    pub fn stop(&mut self, kind: VoiceKind) {
        self.voice_mut(kind).stop();
    }

    /// Shared accent amount in [0, 1] applied to subsequent triggers.
    pub fn set_accent(&mut self, amount: f32) {
        self.accent = amount.clamp(0.0, 1.0);
    }

    pub fn voice_params_mut(&mut self, kind: VoiceKind) -> &mut VoiceParams {
        self.voice_mut(kind).params_mut()
    }

    pub fn master_mut(&mut self) -> &mut MasterDynamics {
        &mut self.master
    }

    pub fn reverb_mut(&mut self) -> &mut AlgorithmicReverb {
        &mut self.reverb
    }

    pub fn set_compressor_enabled(&mut self, enabled: bool) {
        self.comp_enabled = enabled;
    }

    pub fn set_clipper_enabled(&mut self, enabled: bool) {
        self.clipper_enabled = enabled;
    }

    pub fn set_limiter_enabled(&mut self, enabled: bool) {
        self.limiter_enabled = enabled;
    }

    pub fn set_reverb_enabled(&mut self, enabled: bool) {
        self.reverb_enabled = enabled;
    }

    pub fn gain_reduction_db(&self) -> f32 {
        self.master.gain_reduction_db()
    }

    pub fn is_any_voice_active(&self) -> bool {
        self.voices.iter().any(|(_, v)| v.is_active())
    }

    /// Apply one control message.
    pub fn handle_message(&mut self, message: EngineMessage) {
        match message {
            EngineMessage::Trigger { kind, velocity } => self.trigger(kind, velocity),
            EngineMessage::Stop { kind } => self.stop(kind),
            EngineMessage::VoiceParam { kind, param, value } => {
                let params = self.voice_params_mut(kind);
                match param {
                    VoiceParamKind::Level => params.set_level(value),
                    VoiceParamKind::Tune => params.set_tune(value),
                    VoiceParamKind::FineTune => params.set_fine_tune(value),
                    VoiceParamKind::Decay => params.set_decay(value),
                    VoiceParamKind::Tone => params.set_tone(value),
                    VoiceParamKind::Pan => params.set_pan(value),
                }
            }
            EngineMessage::Accent { amount } => self.set_accent(amount),
        }
    }

    /// Drain a control queue, then render one block: clear, sum the active
    /// voices, then run the enabled master stages and the reverb.
    pub fn render_next_block_with_messages<R: MessageReceiver>(
        &mut self,
        buffer: &mut AudioBuffer,
        rx: &mut R,
    ) {
        while let Some(message) = rx.pop() {
            self.handle_message(message);
        }
        self.render_next_block(buffer);
    }

    /// Render one block without a message queue.
    pub fn render_next_block(&mut self, buffer: &mut AudioBuffer) {
        buffer.clear();
        let num_samples = buffer.num_samples();
        for (_, voice) in self.voices.iter_mut() {
            if voice.is_active() {
                voice.render_next_block(buffer, 0, num_samples);
            }
        }

        self.master.process(
            buffer,
            self.comp_enabled,
            self.limiter_enabled,
            self.clipper_enabled,
        );
        if self.reverb_enabled {
            self.reverb.process(buffer);
        }
    }

    /// Clear all processor history between playback sessions.
    pub fn reset(&mut self) {
        self.master.reset();
        self.reverb.reset();
    }
}

impl Default for DrumEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 48_000.0;

    fn prepared_engine() -> DrumEngine {
        let mut engine = DrumEngine::new();
        engine.prepare(SAMPLE_RATE, 512);
        engine
    }

    #[test]
    fn triggered_voice_produces_audio() {
        let mut engine = prepared_engine();
        engine.trigger(VoiceKind::BassDrum, 1.0);

        let mut buffer = AudioBuffer::new(2, 512);
        engine.render_next_block(&mut buffer);
        assert!(buffer.peak() > 0.0);
    }

    #[test]
    fn closed_hat_chokes_open_hat() {
        let mut engine = prepared_engine();
        engine.trigger(VoiceKind::OpenHiHat, 1.0);

        let mut buffer = AudioBuffer::new(2, 512);
        engine.render_next_block(&mut buffer);

        // Strike the closed hat: the open hat must die within a few ms.
        engine.trigger(VoiceKind::ClosedHiHat, 0.0);
        buffer.set_num_samples(480); // 10 ms
        engine.render_next_block(&mut buffer);

        let open_active = engine
            .voices
            .iter()
            .find(|(k, _)| *k == VoiceKind::OpenHiHat)
            .map(|(_, v)| v.is_active())
            .unwrap();
        assert!(!open_active, "open hat should be choked");
    }

    #[test]
    fn accent_raises_trigger_velocity() {
        let mut quiet = prepared_engine();
        quiet.trigger(VoiceKind::SnareDrum, 0.5);

        let mut accented = prepared_engine();
        accented.set_accent(1.0);
        accented.trigger(VoiceKind::SnareDrum, 0.5);

        let mut buffer_a = AudioBuffer::new(2, 512);
        let mut buffer_b = AudioBuffer::new(2, 512);
        quiet.render_next_block(&mut buffer_a);
        accented.render_next_block(&mut buffer_b);
        assert!(buffer_b.peak() > buffer_a.peak());
    }

    #[test]
    fn engine_goes_silent_after_voices_decay() {
        let mut engine = prepared_engine();
        engine.trigger(VoiceKind::RimShot, 1.0);

        let mut buffer = AudioBuffer::new(2, 512);
        for _ in 0..100 {
            engine.render_next_block(&mut buffer);
        }
        assert!(!engine.is_any_voice_active());
        engine.render_next_block(&mut buffer);
        assert_eq!(buffer.peak(), 0.0);
    }

    #[cfg(feature = "rtrb")]
    #[test]
    fn queue_and_direct_triggers_render_identically() {
        use rtrb::RingBuffer;

        let mut direct = prepared_engine();
        direct.trigger(VoiceKind::SnareDrum, 0.8);
        let mut direct_buffer = AudioBuffer::new(2, 512);
        direct.render_next_block(&mut direct_buffer);

        let (mut tx, mut rx) = RingBuffer::<EngineMessage>::new(16);
        tx.push(EngineMessage::Trigger {
            kind: VoiceKind::SnareDrum,
            velocity: 0.8,
        })
        .unwrap();

        let mut queued = prepared_engine();
        let mut queued_buffer = AudioBuffer::new(2, 512);
        queued.render_next_block_with_messages(&mut queued_buffer, &mut rx);

        for i in 0..512 {
            assert_eq!(direct_buffer.sample(0, i), queued_buffer.sample(0, i));
        }
    }
}
