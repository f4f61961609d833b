//! Per-node output storage.

/// Channel-major output block owned by a node.
///
/// Holds `channels × capacity` samples. A render of `n` frames writes the
/// first `n` samples of each channel.
#[derive(Debug, Clone, Default)]
pub struct AudioBlock {
    data: Vec<f32>,
    channels: usize,
    capacity: usize,
}

impl AudioBlock {
    /// Allocate a zeroed block.
    pub fn new(channels: usize, capacity: usize) -> Self {
        Self {
            data: vec![0.0; channels * capacity],
            channels,
            capacity,
        }
    }

    /// Number of channels.
    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Frames per channel.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Resize to a new shape, zeroing all samples. No-op if the shape is unchanged.
    pub fn resize(&mut self, channels: usize, capacity: usize) {
        if channels == self.channels && capacity == self.capacity {
            return;
        }
        self.data.clear();
        self.data.resize(channels * capacity, 0.0);
        self.channels = channels;
        self.capacity = capacity;
    }

    /// Samples of one channel.
    ///
    /// # Panics
    ///
    /// Panics if `channel >= self.channels()`.
    #[inline]
    pub fn channel(&self, channel: usize) -> &[f32] {
        let start = channel * self.capacity;
        &self.data[start..start + self.capacity]
    }

    /// Mutable samples of one channel.
    ///
    /// # Panics
    ///
    /// Panics if `channel >= self.channels()`.
    #[inline]
    pub fn channel_mut(&mut self, channel: usize) -> &mut [f32] {
        let start = channel * self.capacity;
        &mut self.data[start..start + self.capacity]
    }

    /// Iterate over mutable channels.
    pub fn channels_mut(&mut self) -> impl Iterator<Item = &mut [f32]> {
        self.data.chunks_exact_mut(self.capacity.max(1)).take(self.channels)
    }

    /// Zero every sample.
    pub fn clear(&mut self) {
        self.data.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channels_are_disjoint() {
        let mut block = AudioBlock::new(2, 4);
        block.channel_mut(1).fill(1.0);
        assert!(block.channel(0).iter().all(|&s| s == 0.0));
        assert!(block.channel(1).iter().all(|&s| s == 1.0));
    }

    #[test]
    fn resize_zeroes() {
        let mut block = AudioBlock::new(1, 4);
        block.channel_mut(0).fill(0.5);
        block.resize(3, 8);
        assert_eq!(block.channels(), 3);
        assert_eq!(block.capacity(), 8);
        assert!(block.channel(2).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn channels_mut_visits_each_channel() {
        let mut block = AudioBlock::new(3, 2);
        for (i, ch) in block.channels_mut().enumerate() {
            ch.fill(i as f32);
        }
        assert_eq!(block.channel(2), &[2.0, 2.0]);
    }
}
