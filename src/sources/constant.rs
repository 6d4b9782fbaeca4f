use rodio::Source;
use std::time::Duration;

/// Constant source, optionally limited to a number of samples
pub struct Constant {
    sample_rate: u32,
    value: f32,
    remaining: Option<usize>,
}

impl Constant {
    pub fn new(value: f32, sample_rate: u32) -> Self {
        Constant {
            sample_rate,
            value,
            remaining: None,
        }
    }

    /// Stop after `n` samples.
    pub fn take_samples(self, n: usize) -> Self {
        Constant {
            remaining: Some(n),
            ..self
        }
    }
}

impl Iterator for Constant {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        match self.remaining {
            Some(0) => None,
            Some(ref mut n) => {
                *n -= 1;
                Some(self.value)
            }
            None => Some(self.value),
        }
    }
}

impl Source for Constant {
    #[inline(always)]
    fn current_frame_len(&self) -> Option<usize> {
        self.remaining
    }

    #[inline(always)]
    fn channels(&self) -> u16 {
        1
    }

    #[inline(always)]
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[inline(always)]
    fn total_duration(&self) -> Option<Duration> {
        self.remaining
            .map(|n| Duration::from_secs_f64(n as f64 / self.sample_rate as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finite_constant() {
        let c = Constant::new(0.5, 100).take_samples(50);
        assert_eq!(c.total_duration(), Some(Duration::from_millis(500)));
        assert_eq!(c.collect::<Vec<_>>(), vec![0.5; 50]);
    }
}
