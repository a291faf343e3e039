use std::f32::consts::{PI, TAU};

use crate::buffer::AudioBuffer;

/*
Half-Band FIR Oversampling
==========================

Nonlinear stages (the clipper curves, the limiter's true-peak detector)
generate harmonics above Nyquist that fold back down as aliasing. Running
the nonlinearity at 2x or 4x the sample rate pushes those harmonics above
the audible band, where the decimation filter removes them.

Each 2x step is one linear-phase half-band FIR:

  up:   zero-stuff, low-pass at fs/4, gain 2 to restore amplitude
  down: low-pass at fs/4, keep every second sample

Half-band filters put every second coefficient at zero (except the
centre tap of 0.5), which keeps the passband flat and the filter cheap.
The taps are a windowed ideal half-band designed once at construction
and normalised to unity DC gain. 4x is two cascaded 2x stages.

All work buffers are provisioned up front; `process_up`/`process_down`
never allocate.
*/

const HALF_BAND_TAPS: usize = 31;

fn design_half_band() -> [f32; HALF_BAND_TAPS] {
    let m = (HALF_BAND_TAPS - 1) as f32 / 2.0;
    let mut taps = [0.0f32; HALF_BAND_TAPS];
    for (i, tap) in taps.iter_mut().enumerate() {
        let n = i as f32 - m;
        let ideal = if n == 0.0 {
            0.5
        } else {
            (PI * n / 2.0).sin() / (PI * n)
        };
        // Blackman window
        let phase = i as f32 / (HALF_BAND_TAPS - 1) as f32;
        let window = 0.42 - 0.5 * (TAU * phase).cos() + 0.08 * (2.0 * TAU * phase).cos();
        *tap = ideal * window;
    }
    // Normalise to exactly unity DC gain.
    let sum: f32 = taps.iter().sum();
    for tap in taps.iter_mut() {
        *tap /= sum;
    }
    taps
}

struct HalfBandFir {
    taps: [f32; HALF_BAND_TAPS],
    history: [f32; HALF_BAND_TAPS],
    pos: usize,
}

impl HalfBandFir {
    fn new() -> Self {
        Self {
            taps: design_half_band(),
            history: [0.0; HALF_BAND_TAPS],
            pos: 0,
        }
    }

    #[inline]
    fn process(&mut self, sample: f32) -> f32 {
        self.history[self.pos] = sample;
        let mut acc = 0.0;
        let mut read = self.pos;
        for &tap in self.taps.iter() {
            acc += tap * self.history[read];
            read = if read == 0 { HALF_BAND_TAPS - 1 } else { read - 1 };
        }
        self.pos = (self.pos + 1) % HALF_BAND_TAPS;
        acc
    }

    fn reset(&mut self) {
        self.history = [0.0; HALF_BAND_TAPS];
        self.pos = 0;
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OversamplingFactor {
    Off,
    X2,
    X4,
}

impl OversamplingFactor {
    pub fn ratio(self) -> usize {
        match self {
            OversamplingFactor::Off => 1,
            OversamplingFactor::X2 => 2,
            OversamplingFactor::X4 => 4,
        }
    }

    fn stages(self) -> usize {
        match self {
            OversamplingFactor::Off => 0,
            OversamplingFactor::X2 => 1,
            OversamplingFactor::X4 => 2,
        }
    }
}

/// Up/down sampler wrapping a block of audio around a nonlinear stage.
///
/// `process_up` fills an internal oversampled block from the buffer, the
/// caller mutates that block in place, and `process_down` decimates it
/// back into the buffer.
pub struct Oversampler {
    factor: OversamplingFactor,
    up: Vec<Vec<HalfBandFir>>,   // [stage][channel]
    down: Vec<Vec<HalfBandFir>>, // [stage][channel]
    work: Vec<Vec<f32>>,         // [channel], at the oversampled rate
    scratch: Vec<f32>,
    os_len: usize,
}

impl Oversampler {
    pub fn new(factor: OversamplingFactor, num_channels: usize, max_block_size: usize) -> Self {
        let stages = factor.stages();
        let capacity = max_block_size * factor.ratio();
        Self {
            factor,
            up: (0..stages)
                .map(|_| (0..num_channels).map(|_| HalfBandFir::new()).collect())
                .collect(),
            down: (0..stages)
                .map(|_| (0..num_channels).map(|_| HalfBandFir::new()).collect())
                .collect(),
            work: (0..num_channels).map(|_| vec![0.0; capacity]).collect(),
            scratch: vec![0.0; capacity],
            os_len: 0,
        }
    }

    pub fn factor(&self) -> OversamplingFactor {
        self.factor
    }

    /// Number of valid samples in the oversampled block after `process_up`.
    pub fn os_len(&self) -> usize {
        self.os_len
    }

    /// Re-provision work buffers if the host grew its block size.
    ///
    /// Must be called outside the per-sample loop; it may allocate.
    pub fn ensure_block_size(&mut self, max_block_size: usize) {
        let capacity = max_block_size * self.factor.ratio();
        if self.scratch.len() < capacity {
            self.scratch.resize(capacity, 0.0);
            for ch in self.work.iter_mut() {
                ch.resize(capacity, 0.0);
            }
        }
    }

    /// Up-sample `num_samples` from the buffer into the internal block.
    /// Returns the oversampled length.
    pub fn process_up(&mut self, buffer: &AudioBuffer, num_samples: usize) -> usize {
        for ch in 0..self.work.len() {
            self.work[ch][..num_samples].copy_from_slice(&buffer.channel(ch)[..num_samples]);
            let mut len = num_samples;
            for stage in 0..self.up.len() {
                self.scratch[..len].copy_from_slice(&self.work[ch][..len]);
                let fir = &mut self.up[stage][ch];
                for i in 0..len {
                    self.work[ch][2 * i] = 2.0 * fir.process(self.scratch[i]);
                    self.work[ch][2 * i + 1] = 2.0 * fir.process(0.0);
                }
                len *= 2;
            }
        }
        self.os_len = num_samples * self.factor.ratio();
        self.os_len
    }

    /// Decimate the internal block back into the buffer.
    pub fn process_down(&mut self, buffer: &mut AudioBuffer, num_samples: usize) {
        for ch in 0..self.work.len() {
            let mut len = self.os_len;
            for stage in (0..self.down.len()).rev() {
                self.scratch[..len].copy_from_slice(&self.work[ch][..len]);
                let fir = &mut self.down[stage][ch];
                for i in 0..len / 2 {
                    let filtered = fir.process(self.scratch[2 * i]);
                    fir.process(self.scratch[2 * i + 1]);
                    self.work[ch][i] = filtered;
                }
                len /= 2;
            }
            buffer.channel_mut(ch)[..num_samples].copy_from_slice(&self.work[ch][..num_samples]);
        }
    }

    #[inline]
    pub fn sample(&self, ch: usize, index: usize) -> f32 {
        self.work[ch][index]
    }

    #[inline]
    pub fn set_sample(&mut self, ch: usize, index: usize, value: f32) {
        self.work[ch][index] = value;
    }

    /// Mutable view of one oversampled channel.
    #[inline]
    pub fn channel_mut(&mut self, ch: usize) -> &mut [f32] {
        &mut self.work[ch][..self.os_len]
    }

    pub fn num_channels(&self) -> usize {
        self.work.len()
    }

    pub fn reset(&mut self) {
        for stage in self.up.iter_mut().chain(self.down.iter_mut()) {
            for fir in stage.iter_mut() {
                fir.reset();
            }
        }
        for ch in self.work.iter_mut() {
            ch.fill(0.0);
        }
        self.os_len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::TAU;

    fn sine_buffer(freq: f32, sample_rate: f32, len: usize) -> AudioBuffer {
        let mut buffer = AudioBuffer::new(2, len);
        for ch in 0..2 {
            for i in 0..len {
                buffer.set_sample(ch, i, (TAU * freq * i as f32 / sample_rate).sin());
            }
        }
        buffer
    }

    fn rms(samples: &[f32]) -> f32 {
        (samples.iter().map(|&s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
    }

    #[test]
    fn round_trip_preserves_passband_tone() {
        for factor in [OversamplingFactor::X2, OversamplingFactor::X4] {
            let mut os = Oversampler::new(factor, 2, 512);
            let mut buffer = sine_buffer(1_000.0, 48_000.0, 512);
            let input_rms = rms(&buffer.channel(0)[128..]);

            os.process_up(&buffer, 512);
            os.process_down(&mut buffer, 512);

            // Skip the filter warm-up region, then compare levels.
            let output_rms = rms(&buffer.channel(0)[128..]);
            assert!(
                (output_rms - input_rms).abs() / input_rms < 0.05,
                "passband level changed: in={input_rms} out={output_rms} ({factor:?})"
            );
        }
    }

    #[test]
    fn oversampled_length_matches_ratio() {
        let mut os = Oversampler::new(OversamplingFactor::X4, 2, 256);
        let buffer = sine_buffer(440.0, 48_000.0, 256);
        let os_len = os.process_up(&buffer, 256);
        assert_eq!(os_len, 1_024);
        assert_eq!(os.channel_mut(0).len(), 1_024);
    }

    #[test]
    fn off_factor_copies_through() {
        let mut os = Oversampler::new(OversamplingFactor::Off, 1, 64);
        let mut buffer = AudioBuffer::new(1, 64);
        for i in 0..64 {
            buffer.set_sample(0, i, i as f32 / 64.0);
        }
        let original: Vec<f32> = buffer.channel(0).to_vec();
        os.process_up(&buffer, 64);
        os.process_down(&mut buffer, 64);
        assert_eq!(buffer.channel(0), &original[..]);
    }

    #[test]
    fn ensure_block_size_grows_capacity() {
        let mut os = Oversampler::new(OversamplingFactor::X2, 2, 128);
        os.ensure_block_size(512);
        let buffer = sine_buffer(440.0, 48_000.0, 512);
        assert_eq!(os.process_up(&buffer, 512), 1_024);
    }
}
