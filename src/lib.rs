pub mod buffer;
pub mod dsp;
pub mod engine; // Trigger routing and block rendering
pub mod master; // Master-bus dynamics chain
pub mod reverb;
pub mod voices; // Drum voice synthesis

/// Largest block the engine will ever be asked to render in one call.
pub const MAX_BLOCK_SIZE: usize = 2048;

/// Envelope level below which a voice counts as silent and deactivates.
pub const SILENCE_FLOOR: f32 = 1e-4;

pub(crate) const MIN_TIME: f32 = 1.0 / 48_000.0;
