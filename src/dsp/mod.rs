//! Low-level DSP primitives used by the voices and the master chain.
//!
//! These components are allocation-free and realtime-safe once constructed,
//! making them safe to embed directly inside voice and processor structs.
//! They intentionally stay focused on the signal-processing math so the
//! engine layer can handle orchestration and routing.

/// Fixed-maximum delay line for lookahead and pre-delay.
pub mod delay;
/// Exponential decay envelope shared by all drum voices.
pub mod envelope;
/// State-variable filter and one-pole sections.
pub mod filter;
/// Decibel conversion and running RMS measurement.
pub mod level;
/// Dry/wet blending and in-place summing.
pub mod mix;
/// Seeded white-noise source.
pub mod noise;
/// Half-band FIR oversampling for nonlinear stages.
pub mod oversample;
/// Ramped parameter values for click-free control changes.
pub mod smooth;
