//! Algorithmic reverb.
//!
//! Signal path per channel:
//!
//! ```text
//! In ──→ [Pre-delay] ──→ [Allpass 1] ──→ [Allpass 2] ──┐
//!                        (diffusion)                    │
//!        ┌──────────────────────────────────────────────┘
//!        │      ┌──→ [Comb 1] ──┐
//!        └─(+)──┼──→ [Comb 2] ──┼──→ (+) ──→ [Allpass] ──→ [Allpass] ──→ Out
//!               ├──→ [Comb 3] ──┤
//!               └──→ [Comb 4] ──┘
//! ```
//!
//! Pre-delay (up to 100 ms) separates the dry hit from the onset of the
//! tail. Two first-order all-pass diffusers smear the transient before it
//! reaches the tank; the diffusion amount maps linearly onto their cutoff
//! frequencies, so higher diffusion means denser smearing. The tank is a
//! comb/all-pass network per channel with detuned delay lengths on the
//! right side for stereo spread. Room size scales comb feedback, damping
//! is a one-pole low-pass inside each comb's feedback loop, and width
//! crossfeeds the two tank outputs.
//!
//! All parameters are clamped to [0, 1]; feedback tops out at 0.98 so the
//! tank cannot run away even at maximum room size.

use crate::buffer::AudioBuffer;
use crate::dsp::delay::DelayLine;

const COMB_DELAYS_MS: [f32; 4] = [29.7, 37.1, 41.1, 43.7];
const ALLPASS_DELAYS_MS: [f32; 2] = [5.0, 1.7];
/// Extra delay on the right-channel lines, for stereo decorrelation.
const STEREO_SPREAD_MS: f32 = 0.5;
const MAX_PRE_DELAY_SECONDS: f32 = 0.1;

/// First-order TPT all-pass used for pre-tank diffusion.
struct DiffuserAllpass {
    g: f32,
    state: f32,
}

impl DiffuserAllpass {
    fn new() -> Self {
        Self { g: 0.1, state: 0.0 }
    }

    fn set_cutoff(&mut self, sample_rate: f32, cutoff_hz: f32) {
        let t = (std::f32::consts::PI * cutoff_hz / sample_rate).tan();
        self.g = t / (1.0 + t);
    }

    #[inline]
    fn process(&mut self, sample: f32) -> f32 {
        let v = (sample - self.state) * self.g;
        let lp = v + self.state;
        self.state = lp + v;
        2.0 * lp - sample
    }

    fn reset(&mut self) {
        self.state = 0.0;
    }
}

/// Feedback comb with a damping low-pass in the loop.
struct CombFilter {
    buffer: Vec<f32>,
    pos: usize,
    feedback: f32,
    damp: f32,
    filter_state: f32,
}

impl CombFilter {
    fn new(delay_samples: usize) -> Self {
        Self {
            buffer: vec![0.0; delay_samples.max(1)],
            pos: 0,
            feedback: 0.84,
            damp: 0.5,
            filter_state: 0.0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let output = self.buffer[self.pos];
        self.filter_state = output * (1.0 - self.damp) + self.filter_state * self.damp;
        self.buffer[self.pos] = input + self.filter_state * self.feedback;
        self.pos = (self.pos + 1) % self.buffer.len();
        output
    }

    fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.filter_state = 0.0;
        self.pos = 0;
    }
}

/// Series all-pass for tail density.
struct TankAllpass {
    buffer: Vec<f32>,
    pos: usize,
    feedback: f32,
}

impl TankAllpass {
    fn new(delay_samples: usize) -> Self {
        Self {
            buffer: vec![0.0; delay_samples.max(1)],
            pos: 0,
            feedback: 0.5,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let delayed = self.buffer[self.pos];
        let output = -self.feedback * input + delayed;
        self.buffer[self.pos] = input + self.feedback * output;
        self.pos = (self.pos + 1) % self.buffer.len();
        output
    }

    fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.pos = 0;
    }
}

pub struct AlgorithmicReverb {
    sample_rate: f32,
    pre_delay: Vec<DelayLine>,
    diffusers: Vec<[DiffuserAllpass; 2]>, // two stages per channel
    combs: Vec<Vec<CombFilter>>,
    allpasses: Vec<Vec<TankAllpass>>,
    room_size: f32,
    damping: f32,
    wet_level: f32,
    dry_level: f32,
    width: f32,
    diffusion: f32,
}

impl AlgorithmicReverb {
    pub fn new() -> Self {
        let mut reverb = Self {
            sample_rate: 48_000.0,
            pre_delay: Vec::new(),
            diffusers: Vec::new(),
            combs: Vec::new(),
            allpasses: Vec::new(),
            room_size: 0.5,
            damping: 0.5,
            wet_level: 0.33,
            dry_level: 1.0,
            width: 1.0,
            diffusion: 0.7,
        };
        reverb.prepare(48_000.0, 0);
        reverb
    }

    pub fn prepare(&mut self, sample_rate: f32, _max_block_size: usize) {
        self.sample_rate = sample_rate;

        let to_samples = |ms: f32| (ms * sample_rate / 1_000.0) as usize;
        let max_pre = (sample_rate * MAX_PRE_DELAY_SECONDS) as usize + 1;

        self.pre_delay = (0..2)
            .map(|_| {
                let mut line = DelayLine::new(max_pre);
                line.set_delay(to_samples(20.0)); // 20 ms default
                line
            })
            .collect();
        self.diffusers = (0..2)
            .map(|_| [DiffuserAllpass::new(), DiffuserAllpass::new()])
            .collect();
        self.combs = (0..2)
            .map(|ch| {
                COMB_DELAYS_MS
                    .iter()
                    .map(|&ms| CombFilter::new(to_samples(ms + ch as f32 * STEREO_SPREAD_MS)))
                    .collect()
            })
            .collect();
        self.allpasses = (0..2)
            .map(|ch| {
                ALLPASS_DELAYS_MS
                    .iter()
                    .map(|&ms| TankAllpass::new(to_samples(ms + ch as f32 * STEREO_SPREAD_MS)))
                    .collect()
            })
            .collect();

        // Re-apply current parameters to the rebuilt network.
        self.set_room_size(self.room_size);
        self.set_damping(self.damping);
        self.set_diffusion(self.diffusion);
    }

    pub fn set_room_size(&mut self, size: f32) {
        self.room_size = size.clamp(0.0, 1.0);
        let feedback = 0.7 + self.room_size * 0.28;
        for channel in self.combs.iter_mut() {
            for comb in channel.iter_mut() {
                comb.feedback = feedback;
            }
        }
    }

    pub fn set_damping(&mut self, damp: f32) {
        self.damping = damp.clamp(0.0, 1.0);
        for channel in self.combs.iter_mut() {
            for comb in channel.iter_mut() {
                comb.damp = self.damping;
            }
        }
    }

    pub fn set_wet_level(&mut self, wet: f32) {
        self.wet_level = wet.clamp(0.0, 1.0);
    }

    pub fn set_dry_level(&mut self, dry: f32) {
        self.dry_level = dry.clamp(0.0, 1.0);
    }

    pub fn set_width(&mut self, width: f32) {
        self.width = width.clamp(0.0, 1.0);
    }

    pub fn set_pre_delay(&mut self, ms: f32) {
        let samples = (ms.clamp(0.0, MAX_PRE_DELAY_SECONDS * 1_000.0) * 0.001 * self.sample_rate) as usize;
        for line in self.pre_delay.iter_mut() {
            line.set_delay(samples);
        }
    }

    /// Diffusion maps linearly onto the two all-pass cutoffs:
    /// 800-4000 Hz for the first stage, 1200-6000 Hz for the second.
    pub fn set_diffusion(&mut self, diffusion: f32) {
        self.diffusion = diffusion.clamp(0.0, 1.0);
        let f1 = 800.0 + self.diffusion * 3_200.0;
        let f2 = 1_200.0 + self.diffusion * 4_800.0;
        for channel in self.diffusers.iter_mut() {
            channel[0].set_cutoff(self.sample_rate, f1);
            channel[1].set_cutoff(self.sample_rate, f2);
        }
    }

    pub fn process(&mut self, buffer: &mut AudioBuffer) {
        let num_samples = buffer.num_samples();
        let stereo = buffer.num_channels() > 1;

        let wet1 = self.wet_level * (self.width * 0.5 + 0.5);
        let wet2 = self.wet_level * ((1.0 - self.width) * 0.5);

        for i in 0..num_samples {
            let in_l = buffer.sample(0, i);
            let in_r = if stereo { buffer.sample(1, i) } else { in_l };

            let mut dl = self.pre_delay[0].next_sample(in_l);
            let mut dr = self.pre_delay[1].next_sample(in_r);
            dl = self.diffusers[0][0].process(dl);
            dl = self.diffusers[0][1].process(dl);
            dr = self.diffusers[1][0].process(dr);
            dr = self.diffusers[1][1].process(dr);

            let tank_in = (dl + dr) * 0.5;

            let mut tank_l = 0.0;
            for comb in self.combs[0].iter_mut() {
                tank_l += comb.process(tank_in);
            }
            tank_l *= 0.25;
            for allpass in self.allpasses[0].iter_mut() {
                tank_l = allpass.process(tank_l);
            }

            let mut tank_r = 0.0;
            for comb in self.combs[1].iter_mut() {
                tank_r += comb.process(tank_in);
            }
            tank_r *= 0.25;
            for allpass in self.allpasses[1].iter_mut() {
                tank_r = allpass.process(tank_r);
            }

            buffer.set_sample(0, i, in_l * self.dry_level + tank_l * wet1 + tank_r * wet2);
            if stereo {
                buffer.set_sample(1, i, in_r * self.dry_level + tank_r * wet1 + tank_l * wet2);
            }
        }
    }

    pub fn reset(&mut self) {
        for line in self.pre_delay.iter_mut() {
            line.reset();
        }
        for channel in self.diffusers.iter_mut() {
            for diffuser in channel.iter_mut() {
                diffuser.reset();
            }
        }
        for channel in self.combs.iter_mut() {
            for comb in channel.iter_mut() {
                comb.reset();
            }
        }
        for channel in self.allpasses.iter_mut() {
            for allpass in channel.iter_mut() {
                allpass.reset();
            }
        }
    }

    #[cfg(test)]
    fn room_size(&self) -> f32 {
        self.room_size
    }

    #[cfg(test)]
    fn width(&self) -> f32 {
        self.width
    }
}

impl Default for AlgorithmicReverb {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::noise::NoiseSource;

    const SAMPLE_RATE: f32 = 48_000.0;

    #[test]
    fn impulse_grows_a_tail() {
        let mut reverb = AlgorithmicReverb::new();
        reverb.prepare(SAMPLE_RATE, 512);
        reverb.set_wet_level(1.0);
        reverb.set_dry_level(0.0);
        reverb.set_pre_delay(0.0);

        let mut buffer = AudioBuffer::new(2, 512);
        buffer.clear();
        buffer.set_sample(0, 0, 1.0);
        buffer.set_sample(1, 0, 1.0);
        reverb.process(&mut buffer);

        let mut tail_energy = 0.0f32;
        for _ in 0..40 {
            buffer.clear();
            reverb.process(&mut buffer);
            tail_energy += buffer.channel(0).iter().map(|&s| s * s).sum::<f32>();
        }
        assert!(tail_energy > 1e-4, "reverb should ring after an impulse");
    }

    #[test]
    fn out_of_range_parameters_clamp() {
        let mut reverb = AlgorithmicReverb::new();
        reverb.prepare(SAMPLE_RATE, 512);
        reverb.set_room_size(3.0);
        assert_eq!(reverb.room_size(), 1.0);
        reverb.set_room_size(-1.0);
        assert_eq!(reverb.room_size(), 0.0);
        reverb.set_width(7.0);
        assert_eq!(reverb.width(), 1.0);
    }

    #[test]
    fn stable_for_ten_seconds_at_max_room_size() {
        let mut reverb = AlgorithmicReverb::new();
        reverb.prepare(SAMPLE_RATE, 512);
        reverb.set_room_size(1.0);
        reverb.set_damping(0.0);
        reverb.set_wet_level(1.0);

        let mut noise = NoiseSource::new(99);
        let mut buffer = AudioBuffer::new(2, 512);
        let blocks = (SAMPLE_RATE * 10.0 / 512.0) as usize;
        for _ in 0..blocks {
            for i in 0..512 {
                let s = noise.next_sample() * 0.5;
                buffer.set_sample(0, i, s);
                buffer.set_sample(1, i, s);
            }
            reverb.process(&mut buffer);
            let peak = buffer.peak();
            assert!(peak.is_finite(), "reverb went non-finite");
            assert!(peak < 20.0, "reverb output unbounded: {peak}");
        }
    }

    #[test]
    fn dry_only_passes_signal_through() {
        let mut reverb = AlgorithmicReverb::new();
        reverb.prepare(SAMPLE_RATE, 512);
        reverb.set_wet_level(0.0);
        reverb.set_dry_level(1.0);

        let mut buffer = AudioBuffer::new(2, 64);
        for i in 0..64 {
            buffer.set_sample(0, i, 0.25);
            buffer.set_sample(1, i, -0.25);
        }
        reverb.process(&mut buffer);
        for i in 0..64 {
            assert!((buffer.sample(0, i) - 0.25).abs() < 1e-6);
            assert!((buffer.sample(1, i) + 0.25).abs() < 1e-6);
        }
    }
}
