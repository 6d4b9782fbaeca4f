//! Small building blocks for recursive filters.

/// Delay line with a compile-time length.
///
/// Unlike `DelayBuffer` this one is addressed by write position and is meant to be embedded by
/// value, many at a time, in filter networks.
#[derive(Clone)]
pub struct StaticDelayLine<const N: usize> {
    buf: [f32; N],
    pos: usize,
}

impl<const N: usize> StaticDelayLine<N> {
    pub fn new() -> Self {
        StaticDelayLine {
            buf: [0.0; N],
            pos: 0,
        }
    }

    pub const fn size(&self) -> usize {
        N
    }

    /// Same as `read(N - 1)`.
    #[inline(always)]
    pub fn back(&self) -> f32 {
        let i = self.pos + 1;
        self.buf[if i < N { i } else { 0 }]
    }

    /// Value written `i` samples before the write tap, `1 <= i < N`.
    #[inline(always)]
    pub fn read(&self, i: usize) -> f32 {
        let idx = if i <= self.pos {
            self.pos - i
        } else {
            self.pos + N - i
        };
        self.buf[idx]
    }

    #[inline(always)]
    pub fn write(&mut self, v: f32) {
        self.buf[self.pos] = v;
        self.pos += 1;
        if self.pos >= N {
            self.pos = 0;
        }
    }

    /// Write `v` and return the value it replaces, delayed by `N` samples.
    #[inline(always)]
    pub fn push(&mut self, v: f32) -> f32 {
        let r = self.buf[self.pos];
        self.write(v);
        r
    }

    /// Comb filter with a delay of `N` samples; all-pass when `ffd == -fbk`.
    #[inline(always)]
    pub fn comb(&mut self, v: f32, ffd: f32, fbk: f32) -> f32 {
        let d = self.buf[self.pos];
        let r = v + d * fbk;
        self.write(r);
        d + r * ffd
    }

    pub fn zero(&mut self) {
        self.buf = [0.0; N];
    }
}

impl<const N: usize> Default for StaticDelayLine<N> {
    fn default() -> Self {
        StaticDelayLine::new()
    }
}

/// One-pole low-pass, `damping` in `[0, 1)` pulls towards the previous output.
#[derive(Copy, Clone, Debug, Default)]
pub struct OnePole {
    prev: f32,
    damping: f32,
}

impl OnePole {
    pub fn set_damping(&mut self, v: f32) {
        self.damping = v;
    }

    pub fn reset(&mut self) {
        self.prev = 0.0;
    }

    #[inline(always)]
    pub fn push(&mut self, x: f32) -> f32 {
        self.prev = (self.prev - x) * self.damping + x;
        self.prev
    }
}
