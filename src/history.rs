//! Short histories of poses used to interpolate motion across a render block.

use std::ops::Index;

use glam::{DQuat, DVec3};

/// Shift register of the `N` most recent values, indexed oldest (`0`) to newest (`N-1`).
#[derive(Copy, Clone, Debug)]
pub struct ShiftBuffer<T, const N: usize> {
    values: [T; N],
}

impl<T: Copy, const N: usize> ShiftBuffer<T, N> {
    /// All slots hold `value`.
    pub fn filled(value: T) -> Self {
        ShiftBuffer { values: [value; N] }
    }

    /// Drop the oldest value and append `value` as the newest.
    pub fn push(&mut self, value: T) {
        self.values.rotate_left(1);
        self.values[N - 1] = value;
    }

    pub fn fill(&mut self, value: T) {
        self.values = [value; N];
    }

    pub fn newest(&self) -> T {
        self.values[N - 1]
    }

    pub fn oldest(&self) -> T {
        self.values[0]
    }

    pub const fn len(&self) -> usize {
        N
    }

    pub fn as_slice(&self) -> &[T] {
        &self.values
    }
}

impl<T, const N: usize> Index<usize> for ShiftBuffer<T, N> {
    type Output = T;

    fn index(&self, i: usize) -> &T {
        &self.values[i]
    }
}

/// Positions at the last four block boundaries.
pub type PositionHistory = ShiftBuffer<DVec3, 4>;

/// Moving-average estimate of `a - b` at fraction `alpha` of the current block.
///
/// Blends all four history slots with weights `(1-alpha)/3, 1/3, 1/3, alpha/3`. Plain linear
/// interpolation between the two newest poses warbles when block-rate pose jumps are uneven.
#[inline(always)]
pub fn relative_position(a: &PositionHistory, b: &PositionHistory, alpha: f64) -> DVec3 {
    ((a[0] - b[0]) * (1.0 - alpha) + (a[1] - b[1]) + (a[2] - b[2]) + (a[3] - b[3]) * alpha)
        / 3.0
}

/// One orientation per frame of the current block.
///
/// Recomputed every block by spherically interpolating from the previous block's final
/// orientation to the current target; frame `i` sits at `t = i / frames`.
#[derive(Clone, Debug)]
pub struct OrientationHistory {
    previous: DQuat,
    frames: Vec<DQuat>,
}

impl OrientationHistory {
    pub fn new(num_frames: usize, initial: DQuat) -> Self {
        OrientationHistory {
            previous: initial,
            frames: vec![initial; num_frames],
        }
    }

    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    /// Resize to a new block length. Allocates; call outside the audio callback.
    pub fn resize(&mut self, num_frames: usize) {
        let previous = self.previous;
        self.frames.resize(num_frames, previous);
    }

    /// Fill the per-frame orientations towards `target` and remember it for the next block.
    pub fn advance(&mut self, target: DQuat) {
        let from = self.previous;
        let n = self.frames.len() as f64;
        for (i, q) in self.frames.iter_mut().enumerate() {
            *q = from.slerp(target, i as f64 / n);
        }
        self.previous = target;
    }

    pub fn previous(&self) -> DQuat {
        self.previous
    }

    #[inline]
    pub fn at(&self, frame: usize) -> DQuat {
        self.frames[frame]
    }

    pub fn as_slice(&self) -> &[DQuat] {
        &self.frames
    }
}
