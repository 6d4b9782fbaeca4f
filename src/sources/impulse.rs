use rodio::Source;
use std::time::Duration;

/// Train of unit clicks, one every `period` samples, starting with the first sample
pub struct Impulse {
    sample_rate: u32,
    period: usize,
    phase: usize,
}

impl Impulse {
    pub fn new(period: usize, sample_rate: u32) -> Self {
        Impulse {
            sample_rate,
            period: period.max(1),
            phase: 0,
        }
    }

    /// Clicks at `rate` per second.
    pub fn with_rate(rate: f32, sample_rate: u32) -> Self {
        Impulse::new((sample_rate as f32 / rate).round() as usize, sample_rate)
    }
}

impl Iterator for Impulse {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        let x = if self.phase == 0 { 1.0 } else { 0.0 };
        self.phase += 1;
        if self.phase == self.period {
            self.phase = 0;
        }
        Some(x)
    }
}

impl Source for Impulse {
    #[inline(always)]
    fn current_frame_len(&self) -> Option<usize> {
        None
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
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clicks_periodically() {
        let out: Vec<f32> = Impulse::new(3, 48000).take(7).collect();
        assert_eq!(out, vec![1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
        assert_eq!(Impulse::with_rate(2.0, 10).period, 5);
    }
}
