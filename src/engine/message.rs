#[cfg(feature = "rtrb")]
use rtrb::Consumer;

use crate::voices::VoiceKind;

/// Which voice parameter a control message addresses.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceParamKind {
    Level,
    Tune,
    FineTune,
    Decay,
    Tone,
    Pan,
}

/// Control messages delivered from a UI or sequencer thread to the audio
/// thread. Everything the engine can do mid-playback is expressible here,
/// so the control side never has to touch engine state directly.
#[derive(Debug, Copy, Clone)]
pub enum EngineMessage {
    Trigger { kind: VoiceKind, velocity: f32 },
    Stop { kind: VoiceKind },
    VoiceParam { kind: VoiceKind, param: VoiceParamKind, value: f32 },
    Accent { amount: f32 },
}

pub trait MessageReceiver {
    fn pop(&mut self) -> Option<EngineMessage>;
}

#[cfg(feature = "rtrb")]
impl MessageReceiver for Consumer<EngineMessage> {
    fn pop(&mut self) -> Option<EngineMessage> {
        Consumer::pop(self).ok()
    }
}
