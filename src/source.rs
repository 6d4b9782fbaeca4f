//! Sound sources: a delay line of dry signal plus a distance model.
//!
//! Every source keeps its own delay line so the scene can read its signal back as it was when
//! it left the source, which yields Doppler shift for free when the distance changes. The delay
//! line length sets the effective Doppler far clip; beyond it the source is culled.
//!
//! Attenuation policy is per source because a bee falls off differently from an aeroplane:
//!
//! * within `near_clip` the amplitude is 1,
//! * at `near_clip + clip_range` (the far clip) it reaches `amp_far` and stays there,
//! * in between it follows the skewed sigmoid `1 - tanh(pi * d^2)` of the normalized distance.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::delay::DelayBuffer;
use crate::error::{Result, SceneError};
use crate::history::PositionHistory;
use crate::pose::Pose;

/// Sources start here so that the first blocks do not blast the listener.
pub const DISTANT_SENTINEL: f64 = 1000.0;

/// Distance attenuation parameters.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Attenuation {
    pub roll_off: f64,
    pub near_clip: f64,
    pub clip_range: f64,
    pub amp_far: f64,
}

impl Default for Attenuation {
    fn default() -> Self {
        Attenuation {
            roll_off: 1.0,
            near_clip: 1.0,
            clip_range: 32.0,
            amp_far: 0.0,
        }
    }
}

impl Attenuation {
    pub fn far_clip(&self) -> f64 {
        self.near_clip + self.clip_range
    }

    /// Clips must be finite and non-negative, `amp_far` finite.
    pub fn validate(&self) -> Result<()> {
        let clips_ok = self.near_clip.is_finite()
            && self.clip_range.is_finite()
            && self.near_clip >= 0.0
            && self.clip_range >= 0.0;
        if !clips_ok || !self.amp_far.is_finite() {
            return Err(SceneError::InvalidAttenuation {
                near_clip: self.near_clip,
                clip_range: self.clip_range,
                amp_far: self.amp_far,
            });
        }
        Ok(())
    }

    /// Gain in `[amp_far, 1]` for a source at `distance`.
    pub fn gain(&self, distance: f64) -> f64 {
        if distance < self.near_clip {
            1.0
        } else if distance >= self.far_clip() {
            self.amp_far
        } else {
            let dn = (distance - self.near_clip) / self.clip_range;
            let curve = 1.0 - (PI * dn * dn).tanh();
            self.amp_far + curve * (1.0 - self.amp_far)
        }
    }
}

#[derive(Clone, Debug)]
pub struct SoundSource {
    sound: DelayBuffer,
    pose: Pose,
    pub(crate) pos_history: PositionHistory,
    pub(crate) atten: Attenuation,
    use_atten: bool,
    use_doppler: bool,
}

impl SoundSource {
    /// New source with the given distance model and a delay line of `buf_size` samples.
    pub fn new(atten: Attenuation, buf_size: usize) -> Self {
        SoundSource {
            sound: DelayBuffer::new(buf_size),
            pose: Pose::default(),
            pos_history: PositionHistory::filled(glam::DVec3::splat(DISTANT_SENTINEL)),
            atten,
            use_atten: true,
            use_doppler: true,
        }
    }

    /// New source whose delay line covers its far clip at the given rate and speed of sound,
    /// plus one block of margin.
    pub fn with_range(
        atten: Attenuation,
        sample_rate: f64,
        speed_of_sound: f64,
        num_frames: usize,
    ) -> Self {
        let size = SoundSource::buffer_size(sample_rate, speed_of_sound, atten.far_clip());
        SoundSource::new(atten, size + num_frames + 1)
    }

    /// Samples needed for sound to travel `distance` at `speed_of_sound`.
    pub fn buffer_size(sample_rate: f64, speed_of_sound: f64, distance: f64) -> usize {
        (sample_rate * distance / speed_of_sound).ceil() as usize
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    pub fn pose_mut(&mut self) -> &mut Pose {
        &mut self.pose
    }

    pub fn set_pose(&mut self, pose: Pose) {
        self.pose = pose;
    }

    pub fn position_history(&self) -> &PositionHistory {
        &self.pos_history
    }

    pub fn attenuation_params(&self) -> &Attenuation {
        &self.atten
    }

    /// Replace the distance model; leaves it unchanged if `atten` is invalid.
    pub fn set_attenuation_params(&mut self, atten: Attenuation) -> Result<()> {
        atten.validate()?;
        self.atten = atten;
        Ok(())
    }

    /// Gain applied to a sample heard from `distance`; always 1 with attenuation disabled.
    pub fn attenuation(&self, distance: f64) -> f64 {
        if !self.use_atten {
            return 1.0;
        }
        self.atten.gain(distance)
    }

    pub fn enable_attenuation(&mut self, enable: bool) {
        self.use_atten = enable;
    }

    pub fn enable_doppler(&mut self, enable: bool) {
        self.use_doppler = enable;
    }

    pub fn attenuation_enabled(&self) -> bool {
        self.use_atten
    }

    pub fn doppler_enabled(&self) -> bool {
        self.use_doppler
    }

    pub fn near_clip(&self) -> f64 {
        self.atten.near_clip
    }

    pub fn set_near_clip(&mut self, v: f64) -> Result<()> {
        self.set_attenuation_params(Attenuation {
            near_clip: v,
            ..self.atten
        })
    }

    pub fn far_clip(&self) -> f64 {
        self.atten.far_clip()
    }

    /// Move the far clip, keeping the near clip where it is.
    pub fn set_far_clip(&mut self, v: f64) -> Result<()> {
        self.set_attenuation_params(Attenuation {
            clip_range: v - self.atten.near_clip,
            ..self.atten
        })
    }

    pub fn amp_far(&self) -> f64 {
        self.atten.amp_far
    }

    pub fn set_amp_far(&mut self, v: f64) -> Result<()> {
        self.set_attenuation_params(Attenuation {
            amp_far: v,
            ..self.atten
        })
    }

    pub fn roll_off(&self) -> f64 {
        self.atten.roll_off
    }

    pub fn set_roll_off(&mut self, v: f64) {
        self.atten.roll_off = v;
    }

    pub fn delay_size(&self) -> usize {
        self.sound.capacity()
    }

    /// Largest delay index that can be read.
    pub fn max_index(&self) -> usize {
        self.sound.max_index()
    }

    /// Longest representable delay in seconds.
    pub fn max_delay(&self, sample_rate: f64) -> f64 {
        self.delay_size() as f64 / sample_rate
    }

    /// Convert a delay in seconds into a delay-line index; 0 with Doppler disabled.
    pub fn delay_to_index(&self, delay: f64, sample_rate: f64) -> f64 {
        if !self.use_doppler {
            return 0.0;
        }
        delay * sample_rate
    }

    /// Interpolated read from the delay line, `index` samples ago.
    #[inline]
    pub fn read_sample(&self, index: f64) -> f32 {
        self.sound.read_interpolated(index)
    }

    /// Push the next sample of dry signal into the delay line.
    #[inline]
    pub fn write_sample(&mut self, v: f32) {
        self.sound.write(v);
    }

    pub fn delay_line(&self) -> &DelayBuffer {
        &self.sound
    }

    /// Silence the delay line and send the position history back to the distant sentinel,
    /// as for a freshly created source. The pose is kept.
    pub fn reset(&mut self) {
        self.sound.clear();
        self.pos_history.fill(glam::DVec3::splat(DISTANT_SENTINEL));
    }
}

impl Default for SoundSource {
    fn default() -> Self {
        SoundSource::new(Attenuation::default(), 5000)
    }
}
