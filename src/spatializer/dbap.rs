//! Distance-based amplitude panning.

use glam::{DVec3, Vec3};
use tracing::info;

use super::Spatializer;
use crate::block::AudioBlock;
use crate::error::{Result, SceneError};
use crate::listener::ListenerState;
use crate::source::SoundSource;
use crate::speaker::{Speaker, SpeakerLayout};

/// Bias towards the nearest speaker.
pub const DBAP_MAX_DIST: f32 = 100.0;

/// Per-speaker gain falls off with the distance between the direction of the source and the
/// direction of the speaker, both on the unit sphere:
///
/// `gain = 1 / (1 + DBAP_MAX_DIST * (|dir - speaker| / 2) ^ spread)`
///
/// Larger `spread` values make the panning sharper.
pub struct Dbap {
    speakers: Vec<Speaker>,
    speaker_vecs: Vec<Vec3>,
    device_channels: Vec<usize>,
    speaker_gains: Vec<f32>,
    spread: f32,
    compiled: bool,
}

impl Dbap {
    pub fn new(spread: f32) -> Self {
        Dbap {
            speakers: Vec::new(),
            speaker_vecs: Vec::new(),
            device_channels: Vec::new(),
            speaker_gains: Vec::new(),
            spread,
            compiled: false,
        }
    }

    pub fn spread(&self) -> f32 {
        self.spread
    }

    pub fn set_spread(&mut self, spread: f32) {
        self.spread = spread;
    }

    /// Gain of speaker `i` for a sound arriving from the unit vector `dir`.
    #[inline(always)]
    fn gain(&self, i: usize, dir: Vec3) -> f32 {
        let dist = (dir - self.speaker_vecs[i]).length() / 2.0;
        self.speaker_gains[i] / (1.0 + DBAP_MAX_DIST * dist.powf(self.spread))
    }

    /// Gains for every speaker, in layout order.
    pub fn gains(&self, relpos: DVec3) -> impl Iterator<Item = f32> + '_ {
        let dir = relpos.as_vec3().normalize_or_zero();
        (0..self.speaker_vecs.len()).map(move |i| self.gain(i, dir))
    }
}

impl Default for Dbap {
    fn default() -> Self {
        Dbap::new(5.0)
    }
}

impl Spatializer for Dbap {
    fn set_speaker_layout(&mut self, layout: &SpeakerLayout) {
        self.speakers.clear();
        self.speakers.extend_from_slice(&layout.speakers);
        self.compiled = false;
    }

    fn num_speakers(&self) -> usize {
        self.speakers.len()
    }

    fn compile(&mut self, _listener: &ListenerState) -> Result<()> {
        if self.speakers.is_empty() {
            return Err(SceneError::EmptySpeakerLayout);
        }
        self.speaker_vecs.clear();
        self.device_channels.clear();
        self.speaker_gains.clear();
        for (index, s) in self.speakers.iter().enumerate() {
            let v = s.vec().as_vec3();
            if v.length_squared() == 0.0 {
                return Err(SceneError::DegenerateSpeaker { index });
            }
            self.speaker_vecs.push(v.normalize());
            self.device_channels.push(s.device_channel);
            self.speaker_gains.push(s.gain as f32);
        }
        self.compiled = true;
        info!("DBAP compiled with {} speakers", self.speakers.len());
        Ok(())
    }

    #[inline]
    fn perform(
        &mut self,
        block: &mut AudioBlock,
        _source: &SoundSource,
        relpos: DVec3,
        _num_frames: usize,
        frame_index: usize,
        sample: f32,
    ) {
        debug_assert!(self.compiled);
        let dir = relpos.as_vec3().normalize_or_zero();
        for i in 0..self.speaker_vecs.len() {
            let gain = self.gain(i, dir);
            block.accumulate(self.device_channels[i], frame_index, gain * sample);
        }
    }

    fn perform_block(
        &mut self,
        block: &mut AudioBlock,
        _source: &SoundSource,
        relpos: DVec3,
        samples: &[f32],
    ) {
        debug_assert!(self.compiled);
        let dir = relpos.as_vec3().normalize_or_zero();
        for i in 0..self.speaker_vecs.len() {
            let gain = self.gain(i, dir);
            let out = block.out_mut(self.device_channels[i]);
            for (o, s) in out.iter_mut().zip(samples) {
                *o += gain * s;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::Pose;

    fn compiled(layout: &SpeakerLayout) -> Dbap {
        let mut dbap = Dbap::default();
        dbap.set_speaker_layout(layout);
        dbap.compile(&ListenerState::new(Pose::default(), 4)).unwrap();
        dbap
    }

    #[test]
    fn nearest_speaker_gets_full_gain() {
        let dbap = compiled(&SpeakerLayout::octal());
        let gains: Vec<f32> = dbap.gains(DVec3::new(0.0, 3.0, 0.0)).collect();
        // speaker 2 sits at 90 degrees (+y)
        assert!((gains[2] - 1.0).abs() < 1e-6);
        for (i, g) in gains.iter().enumerate() {
            if i != 2 {
                assert!(*g < gains[2]);
            }
        }
        // the opposite speaker is at distance 1
        assert!((gains[6] - 1.0 / 101.0).abs() < 1e-6);
    }

    #[test]
    fn spread_controls_sharpness() {
        let layout = SpeakerLayout::stereo(45.0);
        let sharp = compiled(&layout);
        let mut soft = compiled(&layout);
        soft.set_spread(1.0);
        let dir = DVec3::X;
        let g_sharp: Vec<f32> = sharp.gains(dir).collect();
        let g_soft: Vec<f32> = soft.gains(dir).collect();
        assert!((g_sharp[0] - g_sharp[1]).abs() < 1e-6);
        assert!(g_sharp[0] > g_soft[0]);
    }

    #[test]
    fn zero_direction_is_finite_and_even() {
        let mut dbap = compiled(&SpeakerLayout::octal());
        let src = SoundSource::default();
        let mut block = AudioBlock::new(8, 4, 44100.0);
        dbap.perform(&mut block, &src, DVec3::ZERO, 4, 1, 1.0);
        let first = block.out(0)[1];
        assert!(first.is_finite() && first > 0.0);
        for ch in 0..8 {
            assert!((block.out(ch)[1] - first).abs() < 1e-6);
        }
    }

    #[test]
    fn accumulates_instead_of_overwriting() {
        let mut dbap = compiled(&SpeakerLayout::stereo(30.0));
        let src = SoundSource::default();
        let mut block = AudioBlock::new(2, 4, 44100.0);
        dbap.perform(&mut block, &src, DVec3::X, 4, 0, 1.0);
        let once = block.out(0)[0];
        dbap.perform(&mut block, &src, DVec3::X, 4, 0, 1.0);
        assert!((block.out(0)[0] - 2.0 * once).abs() < 1e-6);
    }

    #[test]
    fn block_and_sample_paths_agree() {
        let mut a = compiled(&SpeakerLayout::octal());
        let mut b = compiled(&SpeakerLayout::octal());
        let src = SoundSource::default();
        let samples = [0.1, -0.4, 0.9, 0.3];
        let relpos = DVec3::new(1.0, -2.0, 0.5);
        let mut block_a = AudioBlock::new(8, 4, 44100.0);
        let mut block_b = AudioBlock::new(8, 4, 44100.0);
        a.perform_block(&mut block_a, &src, relpos, &samples);
        for (i, &s) in samples.iter().enumerate() {
            b.perform(&mut block_b, &src, relpos, 4, i, s);
        }
        for ch in 0..8 {
            for f in 0..4 {
                assert!((block_a.out(ch)[f] - block_b.out(ch)[f]).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn compile_rejects_bad_layouts() {
        let mut dbap = Dbap::default();
        dbap.set_speaker_layout(&SpeakerLayout::default());
        let state = ListenerState::new(Pose::default(), 4);
        assert!(matches!(dbap.compile(&state), Err(SceneError::EmptySpeakerLayout)));

        dbap.set_speaker_layout(&SpeakerLayout::from_speakers(vec![
            Speaker::new(0, 0.0, 0.0),
            Speaker::new(1, 0.0, 0.0).with_radius(0.0),
        ]));
        assert!(matches!(
            dbap.compile(&state),
            Err(SceneError::DegenerateSpeaker { index: 1 })
        ));
    }
}
