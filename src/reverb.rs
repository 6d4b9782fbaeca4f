//! Plate reverberator
//!
//! Design from Dattorro, J. (1997). Effect design: Part 1: Reverberator and other filters.
//! Journal of the Audio Engineering Society, 45(9):660–684.

use crate::filter::{OnePole, StaticDelayLine};

pub struct Reverb {
    diffusion_in1: f32,
    diffusion_in2: f32,
    diffusion_decay1: f32,
    diffusion_decay2: f32,
    decay: f32,

    pre_delay: StaticDelayLine<10>,
    lp_in: OnePole,
    ap_in1: StaticDelayLine<142>,
    ap_in2: StaticDelayLine<107>,
    ap_in3: StaticDelayLine<379>,
    ap_in4: StaticDelayLine<277>,

    ap_decay11: StaticDelayLine<672>,
    ap_decay12: StaticDelayLine<1800>,
    dly11: StaticDelayLine<4453>,
    dly12: StaticDelayLine<3720>,
    lp1: OnePole,

    ap_decay21: StaticDelayLine<908>,
    ap_decay22: StaticDelayLine<2656>,
    dly21: StaticDelayLine<4217>,
    dly22: StaticDelayLine<3163>,
    lp2: OnePole,
}

impl Reverb {
    pub fn new() -> Self {
        let mut reverb = Reverb {
            diffusion_in1: 0.0,
            diffusion_in2: 0.0,
            diffusion_decay1: 0.0,
            diffusion_decay2: 0.0,
            decay: 0.0,
            pre_delay: StaticDelayLine::new(),
            lp_in: OnePole::default(),
            ap_in1: StaticDelayLine::new(),
            ap_in2: StaticDelayLine::new(),
            ap_in3: StaticDelayLine::new(),
            ap_in4: StaticDelayLine::new(),
            ap_decay11: StaticDelayLine::new(),
            ap_decay12: StaticDelayLine::new(),
            dly11: StaticDelayLine::new(),
            dly12: StaticDelayLine::new(),
            lp1: OnePole::default(),
            ap_decay21: StaticDelayLine::new(),
            ap_decay22: StaticDelayLine::new(),
            dly21: StaticDelayLine::new(),
            dly22: StaticDelayLine::new(),
            lp2: OnePole::default(),
        };
        reverb
            .bandwidth(0.9995)
            .decay(0.85)
            .damping(0.4)
            .diffusion(0.76, 0.666, 0.707, 0.571);
        reverb
    }

    /// Input signal bandwidth, [0, 1].
    pub fn bandwidth(&mut self, v: f32) -> &mut Self {
        self.lp_in.set_damping(1.0 - v);
        self
    }

    /// High-frequency damping in the tank, [0, 1].
    pub fn damping(&mut self, v: f32) -> &mut Self {
        self.lp1.set_damping(v);
        self.lp2.set_damping(v);
        self
    }

    /// Tank decay rate, [0, 1).
    pub fn decay(&mut self, v: f32) -> &mut Self {
        self.decay = v;
        self
    }

    /// Input and tank diffusion amounts, each in [0, 1).
    pub fn diffusion(&mut self, in1: f32, in2: f32, decay1: f32, decay2: f32) -> &mut Self {
        self.diffusion_in1 = in1;
        self.diffusion_in2 = in2;
        self.diffusion_decay1 = decay1;
        self.diffusion_decay2 = decay2;
        self
    }

    /// Wet stereo output for one dry mono sample.
    pub fn process(&mut self, input: f32, gain: f32) -> (f32, f32) {
        let (df1, df2) = (self.diffusion_in1, self.diffusion_in2);
        let (dd1, dd2) = (self.diffusion_decay1, self.diffusion_decay2);

        let mut v = self.pre_delay.push(input * 0.5);
        v = self.lp_in.push(v);
        v = self.ap_in1.comb(v, df1, -df1);
        v = self.ap_in2.comb(v, df1, -df1);
        v = self.ap_in3.comb(v, df2, -df2);
        v = self.ap_in4.comb(v, df2, -df2);

        let mut a = v + self.dly22.back() * self.decay;
        let mut b = v + self.dly12.back() * self.decay;

        a = self.ap_decay11.comb(a, -dd1, dd1);
        a = self.dly11.push(a);
        a = self.lp1.push(a) * self.decay;
        a = self.ap_decay12.comb(a, dd2, -dd2);
        self.dly12.write(a);

        b = self.ap_decay21.comb(b, -dd1, dd1);
        b = self.dly21.push(b);
        b = self.lp2.push(b) * self.decay;
        b = self.ap_decay22.comb(b, dd2, -dd2);
        self.dly22.write(b);

        let left = (self.dly21.read(266) + self.dly21.read(2974) - self.ap_decay22.read(1913)
            + self.dly22.read(1996)
            - self.dly11.read(1990)
            - self.ap_decay12.read(187)
            - self.dly12.read(1066))
            * gain;

        let right = (self.dly11.read(353) + self.dly11.read(3627) - self.ap_decay12.read(1228)
            + self.dly12.read(2673)
            - self.dly21.read(2111)
            - self.ap_decay22.read(335)
            - self.dly22.read(121))
            * gain;

        (left, right)
    }

    /// Add the reverb of `(*left + *right) / 2` to both channels, scaled by `wet`.
    pub fn mix(&mut self, left: &mut f32, right: &mut f32, wet: f32) {
        let dry = (*left + *right) * 0.5;
        let (l, r) = self.process(dry, wet * 0.6);
        *left += l;
        *right += r;
    }

    /// Silence the tank.
    pub fn clear(&mut self) {
        self.pre_delay.zero();
        self.ap_in1.zero();
        self.ap_in2.zero();
        self.ap_in3.zero();
        self.ap_in4.zero();
        self.ap_decay11.zero();
        self.ap_decay12.zero();
        self.dly11.zero();
        self.dly12.zero();
        self.ap_decay21.zero();
        self.ap_decay22.zero();
        self.dly21.zero();
        self.dly22.zero();
        self.lp_in.reset();
        self.lp1.reset();
        self.lp2.reset();
    }
}

impl Default for Reverb {
    fn default() -> Self {
        Reverb::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn impulse_produces_decaying_tail() {
        let mut reverb = Reverb::new();
        let mut early = 0.0;
        let mut late = 0.0;
        for i in 0..44100 * 3 {
            let x = if i == 0 { 1.0 } else { 0.0 };
            let (l, r) = reverb.process(x, 0.6);
            assert!(l.is_finite() && r.is_finite());
            let e = l * l + r * r;
            if i < 22050 {
                early += e;
            } else if i >= 44100 * 2 {
                late += e;
            }
        }
        assert!(early > 0.0);
        assert!(late < early * 0.1);
    }

    #[test]
    fn silence_in_silence_out() {
        let mut reverb = Reverb::new();
        for _ in 0..10000 {
            assert_eq!(reverb.process(0.0, 0.6), (0.0, 0.0));
        }
    }

    #[test]
    fn mix_keeps_dry_signal() {
        let mut reverb = Reverb::new();
        let (mut l, mut r) = (0.5, 0.3);
        reverb.mix(&mut l, &mut r, 1.0);
        // the pre-delay holds back the wet signal
        assert_eq!((l, r), (0.5, 0.3));
    }

    #[test]
    fn clear_removes_tail() {
        let mut reverb = Reverb::new();
        for _ in 0..1000 {
            reverb.process(1.0, 0.6);
        }
        reverb.clear();
        assert_eq!(reverb.process(0.0, 0.6), (0.0, 0.0));
    }
}
