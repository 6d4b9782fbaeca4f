use rand::{rngs::SmallRng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};
use rodio::Source;
use std::time::Duration;

/// Gaussian white noise
pub struct Noise {
    sample_rate: u32,
    amplitude: f32,
    rng: SmallRng,
}

impl Noise {
    pub fn new(sample_rate: u32) -> Self {
        Noise {
            sample_rate,
            amplitude: 1.0,
            rng: SmallRng::from_entropy(),
        }
    }

    /// Reproducible noise.
    pub fn seeded(sample_rate: u32, seed: u64) -> Self {
        Noise {
            sample_rate,
            amplitude: 1.0,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Standard deviation of the output.
    pub fn with_amplitude(self, amplitude: f32) -> Self {
        Noise { amplitude, ..self }
    }
}

impl Iterator for Noise {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        let x: f32 = StandardNormal.sample(&mut self.rng);
        Some(x * self.amplitude)
    }
}

impl Source for Noise {
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
