use std::f32::consts::PI;

/*
| section   | used for                                         |
| --------- | ------------------------------------------------ |
| SvFilter  | snare noise shaping, hat/cymbal band-passes,     |
|           | tom resonators, compressor sidechain high-pass   |
| OnePole   | bass drum tone low-pass and click high-pass,     |
|           | comb damping                                     |

The state-variable filter is a TPT (topology-preserving transform)
implementation. It stays stable under audio-rate cutoff changes and gives
low/high/band/notch responses from the same two integrator states.
*/

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    LowPass,
    HighPass,
    BandPass,
    Notch,
}

pub struct SvFilter {
    ic1eq: f32, // First integrator's memory
    ic2eq: f32, // Second integrator's memory
    g: f32,
    k: f32,
    mode: FilterMode,
}

impl SvFilter {
    pub fn new(mode: FilterMode) -> Self {
        Self {
            ic1eq: 0.0,
            ic2eq: 0.0,
            g: 0.1,
            k: 2.0,
            mode,
        }
    }

    pub fn lowpass(sample_rate: f32, cutoff_hz: f32, q: f32) -> Self {
        let mut f = Self::new(FilterMode::LowPass);
        f.set(sample_rate, cutoff_hz, q);
        f
    }

    pub fn highpass(sample_rate: f32, cutoff_hz: f32, q: f32) -> Self {
        let mut f = Self::new(FilterMode::HighPass);
        f.set(sample_rate, cutoff_hz, q);
        f
    }

    pub fn bandpass(sample_rate: f32, cutoff_hz: f32, q: f32) -> Self {
        let mut f = Self::new(FilterMode::BandPass);
        f.set(sample_rate, cutoff_hz, q);
        f
    }

    /// Retune the filter. Cheap enough to call per block; keeps state.
    pub fn set(&mut self, sample_rate: f32, cutoff_hz: f32, q: f32) {
        // Clamp below Nyquist so tan() stays finite.
        let cutoff = cutoff_hz.clamp(10.0, sample_rate * 0.49);
        self.g = (PI * cutoff / sample_rate).tan();
        self.k = 1.0 / q.max(0.025);
    }

    #[inline]
    pub fn process(&mut self, sample: f32) -> f32 {
        let h = 1.0 / (1.0 + self.g * (self.g + self.k));
        let v3 = sample - self.ic2eq;
        let v1 = h * (self.ic1eq + self.g * v3);
        let v2 = self.ic2eq + self.g * v1;

        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;

        match self.mode {
            FilterMode::LowPass => v2,
            // Scaled by k so the band-pass peaks at unity gain.
            FilterMode::BandPass => self.k * v1,
            FilterMode::HighPass => sample - self.k * v1 - v2,
            FilterMode::Notch => sample - self.k * v1,
        }
    }

    pub fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }
}

/// One-pole section with the coefficient form used across the voices:
/// `coeff = exp(-2*pi*cutoff/sample_rate)`.
pub struct OnePole {
    state: f32,
    coeff: f32,
}

impl OnePole {
    pub fn new() -> Self {
        Self { state: 0.0, coeff: 0.0 }
    }

    pub fn set_cutoff(&mut self, sample_rate: f32, cutoff_hz: f32) {
        self.coeff = (-std::f32::consts::TAU * cutoff_hz / sample_rate).exp();
    }

    #[inline]
    pub fn lowpass(&mut self, sample: f32) -> f32 {
        self.state = sample * (1.0 - self.coeff) + self.state * self.coeff;
        self.state
    }

    /// High-pass as input minus the low-passed input.
    #[inline]
    pub fn highpass(&mut self, sample: f32) -> f32 {
        sample - self.lowpass(sample)
    }

    pub fn reset(&mut self) {
        self.state = 0.0;
    }
}

impl Default for OnePole {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::TAU;

    const SAMPLE_RATE: f32 = 48_000.0;

    fn render_sine(freq: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (TAU * freq * i as f32 / SAMPLE_RATE).sin())
            .collect()
    }

    fn peak_after_transient(buffer: &[f32]) -> f32 {
        buffer[buffer.len() / 2..]
            .iter()
            .fold(0.0f32, |acc, &x| acc.max(x.abs()))
    }

    #[test]
    fn lowpass_attenuates_high_frequencies() {
        let mut filter = SvFilter::lowpass(SAMPLE_RATE, 500.0, 0.707);
        let mut signal = render_sine(5_000.0, 1_024);
        for s in signal.iter_mut() {
            *s = filter.process(*s);
        }
        assert!(peak_after_transient(&signal) < 0.1);
    }

    #[test]
    fn bandpass_passes_centre_and_rejects_far_band() {
        let mut filter = SvFilter::bandpass(SAMPLE_RATE, 1_000.0, 2.0);
        let mut center = render_sine(1_000.0, 2_048);
        for s in center.iter_mut() {
            *s = filter.process(*s);
        }
        let center_peak = peak_after_transient(&center);

        filter.reset();
        let mut far = render_sine(8_000.0, 2_048);
        for s in far.iter_mut() {
            *s = filter.process(*s);
        }
        let far_peak = peak_after_transient(&far);

        assert!(
            center_peak > far_peak * 3.0,
            "expected band-pass emphasis, centre={center_peak} far={far_peak}"
        );
    }

    #[test]
    fn highpass_blocks_dc() {
        let mut filter = SvFilter::highpass(SAMPLE_RATE, 700.0, 0.707);
        let mut out = 0.0;
        for _ in 0..4_096 {
            out = filter.process(1.0);
        }
        assert!(out.abs() < 1e-3);
    }

    #[test]
    fn one_pole_highpass_blocks_dc() {
        let mut hp = OnePole::new();
        hp.set_cutoff(SAMPLE_RATE, 2_000.0);
        let mut out = 0.0;
        for _ in 0..4_096 {
            out = hp.highpass(1.0);
        }
        assert!(out.abs() < 1e-2);
    }
}
