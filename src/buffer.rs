//! Multi-channel sample buffer shared by the render chain.
//!
//! Channels are stored planar (one slice per channel) and pre-sized at
//! construction, so rendering never allocates. Hosts may shrink the active
//! block length between calls via [`AudioBuffer::set_num_samples`]; growing
//! past the provisioned capacity is a caller error.

/// A fixed-capacity block of floating-point samples addressed by
/// (channel, sample index). All core components read and write in place.
pub struct AudioBuffer {
    data: Vec<Vec<f32>>,
    num_samples: usize,
    capacity: usize,
}

impl AudioBuffer {
    pub fn new(num_channels: usize, num_samples: usize) -> Self {
        Self {
            data: (0..num_channels).map(|_| vec![0.0; num_samples]).collect(),
            num_samples,
            capacity: num_samples,
        }
    }

    #[inline]
    pub fn num_channels(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    /// Change the active block length without reallocating.
    pub fn set_num_samples(&mut self, num_samples: usize) {
        assert!(num_samples <= self.capacity, "block larger than provisioned capacity");
        self.num_samples = num_samples;
    }

    #[inline]
    pub fn channel(&self, ch: usize) -> &[f32] {
        &self.data[ch][..self.num_samples]
    }

    #[inline]
    pub fn channel_mut(&mut self, ch: usize) -> &mut [f32] {
        &mut self.data[ch][..self.num_samples]
    }

    #[inline]
    pub fn sample(&self, ch: usize, index: usize) -> f32 {
        self.data[ch][index]
    }

    #[inline]
    pub fn set_sample(&mut self, ch: usize, index: usize, value: f32) {
        self.data[ch][index] = value;
    }

    /// Add into an existing sample. Voices render additively through this.
    #[inline]
    pub fn add_sample(&mut self, ch: usize, index: usize, value: f32) {
        self.data[ch][index] += value;
    }

    pub fn clear(&mut self) {
        for ch in self.data.iter_mut() {
            ch[..self.num_samples].fill(0.0);
        }
    }

    pub fn apply_gain(&mut self, gain: f32) {
        for ch in self.data.iter_mut() {
            for s in ch[..self.num_samples].iter_mut() {
                *s *= gain;
            }
        }
    }

    /// Absolute peak across all channels, for external metering.
    pub fn peak(&self) -> f32 {
        self.data
            .iter()
            .flat_map(|ch| ch[..self.num_samples].iter())
            .fold(0.0f32, |acc, &s| acc.max(s.abs()))
    }

    /// Root-mean-square of one channel, for external metering.
    pub fn rms(&self, ch: usize) -> f32 {
        if self.num_samples == 0 {
            return 0.0;
        }
        let sum: f32 = self.channel(ch).iter().map(|&s| s * s).sum();
        (sum / self.num_samples as f32).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_sample_is_additive() {
        let mut buffer = AudioBuffer::new(2, 16);
        buffer.add_sample(0, 3, 0.5);
        buffer.add_sample(0, 3, 0.25);
        assert_eq!(buffer.sample(0, 3), 0.75);
        assert_eq!(buffer.sample(1, 3), 0.0);
    }

    #[test]
    fn shrinking_block_limits_views() {
        let mut buffer = AudioBuffer::new(1, 64);
        buffer.set_num_samples(16);
        assert_eq!(buffer.channel(0).len(), 16);
        buffer.set_num_samples(64);
        assert_eq!(buffer.channel(0).len(), 64);
    }

    #[test]
    fn peak_and_rms_report_levels() {
        let mut buffer = AudioBuffer::new(1, 4);
        for (i, v) in [0.5, -1.0, 0.25, 0.0].iter().enumerate() {
            buffer.set_sample(0, i, *v);
        }
        assert_eq!(buffer.peak(), 1.0);
        let expected = ((0.25 + 1.0 + 0.0625) / 4.0f32).sqrt();
        assert!((buffer.rms(0) - expected).abs() < 1e-6);
    }
}
