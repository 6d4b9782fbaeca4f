//! *B-format* representation of audio samples

use std::ops::{Add, AddAssign};

use glam::DVec3;

/// Audio sample in first-order *B-format*.
///
/// It encodes four components of the sound field at the listener position: omnidirectional level
/// `w` and the level gradient in `x`, `y`, and `z` directions.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Bformat {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Bformat {
    pub const ZERO: Bformat = Bformat {
        w: 0.0,
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn amplify(self, alpha: f32) -> Self {
        Bformat {
            w: self.w * alpha,
            x: self.x * alpha,
            y: self.y * alpha,
            z: self.z * alpha,
        }
    }
}

impl Add for Bformat {
    type Output = Bformat;

    fn add(self, other: Self) -> Self {
        Bformat {
            w: self.w + other.w,
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }
}

impl AddAssign for Bformat {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

/// Weights for manipulating `Bformat` samples.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Bweights {
    w: f32,
    x: f32,
    y: f32,
    z: f32,
}

impl Bweights {
    pub fn new(w: f32, x: f32, y: f32, z: f32) -> Self {
        Bweights { w, x, y, z }
    }

    pub fn amplify(self, alpha: f32) -> Self {
        Bweights {
            w: self.w * alpha,
            x: self.x * alpha,
            y: self.y * alpha,
            z: self.z * alpha,
        }
    }

    /// Weights that correspond to a omnidirectional source
    pub fn omni_source() -> Self {
        Bweights {
            w: 1.0 / 2f32.sqrt(),
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }

    /// Compute weights for a sound arriving from `direction`.
    ///
    /// Distance is ignored here; the scene has already applied attenuation. A zero direction
    /// degrades to an omnidirectional source.
    pub fn from_direction(direction: DVec3) -> Self {
        let d = direction.normalize_or_zero();
        Bweights {
            w: 1.0 / 2f32.sqrt(),
            x: d.x as f32,
            y: d.y as f32,
            z: d.z as f32,
        }
    }

    /// Compute weights that correspond to a virtual microphone at the listener position.
    ///
    /// It takes a `direction` in which the microphone points (does not need to be normalized), and
    /// a directional characteristic 0 <= `p` <= 1. A `p==1` corresponds to an omnidirectional
    /// microphone, `p==0` to a bi-directional microphone, and `p==0.5` to a cardioid microphone
    /// (https://en.wikipedia.org/wiki/Microphone#Polar_patterns).
    pub fn virtual_microphone(direction: DVec3, p: f32) -> Self {
        let d = direction.normalize_or_zero();
        Bweights {
            w: p * 2f32.sqrt(),
            x: d.x as f32 * (1.0 - p),
            y: d.y as f32 * (1.0 - p),
            z: d.z as f32 * (1.0 - p),
        }
    }

    /// Dot product of *B-format* weights and sample.
    ///
    /// If the weights correspond to a virtual microphone, the result is the signal recorded by that
    /// microphone.
    #[inline]
    pub fn dot(&self, b: Bformat) -> f32 {
        self.w * b.w + self.x * b.x + self.y * b.y + self.z * b.z
    }

    /// Produce a *B-format* sample by scaling weights.
    ///
    /// If the weights correspond to a sound source, and `s` is the source's current level, the
    /// result is the *B-format* representation of the source.
    #[inline]
    pub fn scale(&self, s: f32) -> Bformat {
        Bformat {
            w: self.w * s,
            x: self.x * s,
            y: self.y * s,
            z: self.z * s,
        }
    }
}
