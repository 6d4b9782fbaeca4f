//! Circular delay line holding the recent dry signal of one sound source.

/// Fixed-capacity ring of samples.
///
/// Reads are addressed by age: `read(0)` is the most recently written sample, `read(k)` the one
/// written `k` samples before it. Valid ages are `0..=capacity-2`; callers are expected to clamp
/// or cull indices before reading.
#[derive(Clone, Debug)]
pub struct DelayBuffer {
    samples: Vec<f32>,
    pos: usize,
}

impl DelayBuffer {
    /// Construct a zeroed delay line. Capacity is raised to at least 2.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        DelayBuffer {
            samples: vec![0.0; capacity],
            pos: capacity - 1,
        }
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    /// Largest age that `read_interpolated` may be called with.
    #[inline(always)]
    pub fn max_index(&self) -> usize {
        self.capacity() - 2
    }

    /// Store the newest sample.
    #[inline(always)]
    pub fn write(&mut self, sample: f32) {
        self.pos += 1;
        if self.pos == self.samples.len() {
            self.pos = 0;
        }
        self.samples[self.pos] = sample;
    }

    /// Sample written `ago` samples before the newest one.
    #[inline(always)]
    pub fn read(&self, ago: usize) -> f32 {
        debug_assert!(ago < self.capacity());
        let idx = if ago <= self.pos {
            self.pos - ago
        } else {
            self.pos + self.capacity() - ago
        };
        self.samples[idx]
    }

    /// Linear interpolation between the samples at `floor(index)` and `floor(index) + 1`.
    #[inline]
    pub fn read_interpolated(&self, index: f64) -> f32 {
        let i0 = index as usize;
        let frac = (index - i0 as f64) as f32;
        let a = self.read(i0);
        if frac == 0.0 {
            return a;
        }
        let b = self.read(i0 + 1);
        a + (b - a) * frac
    }

    /// Reset all stored samples to silence.
    pub fn clear(&mut self) {
        for s in &mut self.samples {
            *s = 0.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_back_in_reverse_order() {
        let mut buf = DelayBuffer::new(16);
        for i in 0..16 {
            buf.write(i as f32);
        }
        for k in 0..=buf.max_index() {
            assert_eq!(buf.read(k), (15 - k) as f32);
        }
    }

    #[test]
    fn wraps_around() {
        let mut buf = DelayBuffer::new(5);
        for i in 0..12 {
            buf.write(i as f32);
        }
        assert_eq!(buf.read(0), 11.0);
        assert_eq!(buf.read(3), 8.0);
    }

    #[test]
    fn integer_index_matches_plain_read() {
        let mut buf = DelayBuffer::new(32);
        for i in 0..40 {
            buf.write((i as f32 * 0.37).sin());
        }
        for k in 0..=buf.max_index() {
            assert_eq!(buf.read_interpolated(k as f64), buf.read(k));
        }
    }

    #[test]
    fn fractional_index_interpolates_linearly() {
        let mut buf = DelayBuffer::new(8);
        buf.write(4.0);
        buf.write(2.0);
        // read(0) == 2, read(1) == 4
        assert!((buf.read_interpolated(0.25) - 2.5).abs() < 1e-6);
        assert!((buf.read_interpolated(0.5) - 3.0).abs() < 1e-6);
    }

    #[test]
    fn starts_silent_and_clears() {
        let mut buf = DelayBuffer::new(4);
        assert_eq!(buf.read(2), 0.0);
        buf.write(1.0);
        buf.clear();
        assert_eq!(buf.read(0), 0.0);
    }

    #[test]
    fn minimum_capacity() {
        let buf = DelayBuffer::new(0);
        assert_eq!(buf.capacity(), 2);
        assert_eq!(buf.max_index(), 0);
    }
}
