//! Drive an `AudioScene` as a `rodio::Source`.
//!
//! The audio thread owns the scene inside a `SceneStream` and renders one block whenever the
//! previous one has been consumed. Control threads talk to it through a `SceneController`:
//! new sounds are queued on a pending list, poses travel through `PoseCell`s, and flags are
//! plain atomics. The audio side only takes the pending list when the `has_pending` flag is
//! set and never waits on a contended lock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use glam::DVec3;
use rodio::source::UniformSourceIterator;
use rodio::{Sample, Source};
use tracing::{debug, warn};

use crate::block::AudioBlock;
use crate::error::Result;
use crate::pose::{Pose, PoseCell};
use crate::reverb::Reverb;
use crate::scene::{AudioScene, ListenerId, SceneConfig, SourceId};
use crate::source::{Attenuation, SoundSource};
use crate::spatializer::Spatializer;
use crate::speaker::SpeakerLayout;

type DrySignal = Box<dyn Source<Item = f32> + Send>;

/// Sounds that can play at once before the audio thread has to grow its lists.
const MAX_VOICES: usize = 64;

/// Create a stream rendering to `layout` and the controller that feeds it.
pub fn scene_stream(
    config: SceneConfig,
    layout: &SpeakerLayout,
    spatializer: Box<dyn Spatializer>,
) -> Result<(SceneStream, Arc<SceneController>)> {
    let mut scene = AudioScene::with_config(config);
    let listener = scene.create_listener(layout, spatializer)?;
    scene.reserve_sources(MAX_VOICES);

    let controller = Arc::new(SceneController {
        config,
        pending_sounds: Mutex::new(Vec::new()),
        has_pending: AtomicBool::new(false),
        listener_pose: PoseCell::new(Pose::default()),
    });

    let channels = layout.num_channels();
    let stream = SceneStream {
        controller: controller.clone(),
        scene,
        listener,
        listener_pose: Pose::default(),
        voices: Vec::with_capacity(MAX_VOICES),
        block: AudioBlock::new(channels, config.num_frames, config.sample_rate),
        interleaved: vec![0.0; channels * config.num_frames],
        cursor: channels * config.num_frames,
        reverb: None,
    };

    Ok((stream, controller))
}

struct PendingSound {
    source: SoundSource,
    input: DrySignal,
    controller: Arc<SoundController>,
}

struct Voice {
    id: SourceId,
    input: DrySignal,
    controller: Arc<SoundController>,
    /// Samples still in flight in the delay line after the input ended.
    tail: Option<usize>,
}

pub struct SceneStream {
    controller: Arc<SceneController>,
    scene: AudioScene,
    listener: ListenerId,
    listener_pose: Pose,
    voices: Vec<Voice>,
    block: AudioBlock,
    interleaved: Vec<f32>,
    cursor: usize,
    reverb: Option<(Box<Reverb>, f32)>,
}

impl SceneStream {
    /// Send output channels 0 and 1 through a plate reverb with the given wet level.
    pub fn with_reverb(self, wet: f32) -> Self {
        if self.block.channels() < 2 {
            warn!("reverb needs two output channels, layout has {}", self.block.channels());
            return self;
        }
        SceneStream {
            reverb: Some((Box::new(Reverb::new()), wet)),
            ..self
        }
    }

    pub fn scene(&self) -> &AudioScene {
        &self.scene
    }

    /// Number of sounds currently rendered.
    pub fn active_sounds(&self) -> usize {
        self.voices.len()
    }

    fn take_pending(&mut self) {
        if !self.controller.has_pending.load(Ordering::Acquire) {
            return;
        }
        let mut pending = match self.controller.pending_sounds.try_lock() {
            Ok(pending) => pending,
            Err(_) => return,
        };
        for sound in pending.drain(..) {
            match self.scene.add_source(sound.source) {
                Ok(id) => self.voices.push(Voice {
                    id,
                    input: sound.input,
                    controller: sound.controller,
                    tail: None,
                }),
                Err(e) => {
                    warn!("dropping sound: {}", e);
                    sound.controller.stopped.store(true, Ordering::Release);
                }
            }
        }
        self.controller.has_pending.store(false, Ordering::Release);
    }

    fn render_block(&mut self) {
        self.take_pending();

        let num_frames = self.block.frames();

        if self.controller.listener_pose.take_into(&mut self.listener_pose) {
            if let Some(l) = self.scene.listener_mut(self.listener) {
                l.set_pose(self.listener_pose);
            }
        }

        for voice in &mut self.voices {
            let src = match self.scene.source_mut(voice.id) {
                Some(src) => src,
                None => continue,
            };
            let ctl = &voice.controller;
            ctl.pose.take_into(src.pose_mut());
            src.enable_doppler(ctl.doppler.load(Ordering::Relaxed));
            src.enable_attenuation(ctl.attenuation.load(Ordering::Relaxed));

            for _ in 0..num_frames {
                match voice.tail {
                    None => match voice.input.next() {
                        Some(x) => src.write_sample(x),
                        None => {
                            voice.tail = Some(src.delay_size());
                            src.write_sample(0.0);
                        }
                    },
                    Some(_) => src.write_sample(0.0),
                }
            }
            if let Some(ref mut tail) = voice.tail {
                *tail = tail.saturating_sub(num_frames);
            }
        }

        self.block.zero_out();
        if let Err(e) = self.scene.render(&mut self.block) {
            warn!("render failed: {}", e);
            self.block.zero_out();
        }

        if let Some((ref mut reverb, wet)) = self.reverb {
            if let Some((left, right)) = self.block.stereo_mut() {
                for (l, r) in left.iter_mut().zip(right.iter_mut()) {
                    reverb.mix(l, r, wet);
                }
            }
        }

        self.block.interleave_into(&mut self.interleaved);
        self.retire_voices();
    }

    fn retire_voices(&mut self) {
        let mut i = 0;
        while i < self.voices.len() {
            let voice = &self.voices[i];
            let done = voice.controller.is_stopped() || voice.tail == Some(0);
            if done {
                let voice = self.voices.remove(i);
                if self.scene.remove_source(voice.id).is_ok() {
                    debug!("{:?} finished", voice.id);
                }
                voice.controller.stopped.store(true, Ordering::Release);
            } else {
                i += 1;
            }
        }
    }
}

impl Source for SceneStream {
    #[inline(always)]
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    #[inline(always)]
    fn channels(&self) -> u16 {
        self.block.channels() as u16
    }

    #[inline(always)]
    fn sample_rate(&self) -> u32 {
        self.block.sample_rate() as u32
    }

    #[inline(always)]
    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

impl Iterator for SceneStream {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.interleaved.len() {
            self.render_block();
            self.cursor = 0;
        }
        let s = self.interleaved.get(self.cursor).copied();
        self.cursor += 1;
        s
    }
}

pub struct SceneController {
    config: SceneConfig,
    has_pending: AtomicBool,
    pending_sounds: Mutex<Vec<PendingSound>>,
    listener_pose: PoseCell,
}

impl SceneController {
    /// Start playing a mono `input` from `pose`.
    ///
    /// The input is converted to the scene's sample rate. Its delay line is sized for the far
    /// clip of `atten` at the configured speed of sound.
    pub fn play<I>(&self, input: I, pose: Pose, atten: Attenuation) -> Arc<SoundController>
    where
        I: Source + Send + 'static,
        I::Item: Sample + Send,
    {
        let cfg = &self.config;
        let mut source =
            SoundSource::with_range(atten, cfg.sample_rate, cfg.speed_of_sound, cfg.num_frames);
        source.set_pose(pose);

        let input: DrySignal = Box::new(UniformSourceIterator::<I, f32>::new(
            input,
            1,
            cfg.sample_rate as u32,
        ));

        let controller = Arc::new(SoundController::new(pose));

        self.pending_sounds
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(PendingSound {
                source,
                input,
                controller: controller.clone(),
            });
        self.has_pending.store(true, Ordering::Release);

        controller
    }

    /// Play at a position with default attenuation.
    pub fn play_at<I>(&self, input: I, pos: [f64; 3]) -> Arc<SoundController>
    where
        I: Source + Send + 'static,
        I::Item: Sample + Send,
    {
        self.play(input, Pose::from_array(pos), Attenuation::default())
    }

    pub fn set_listener_pose(&self, pose: Pose) {
        self.listener_pose.publish(pose);
    }

    pub fn set_listener_position(&self, pos: DVec3) {
        self.listener_pose.update(|p| p.pos = pos);
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }
}

/// Control a playing sound from any thread.
pub struct SoundController {
    pose: PoseCell,
    doppler: AtomicBool,
    attenuation: AtomicBool,
    stopped: AtomicBool,
}

impl SoundController {
    fn new(pose: Pose) -> Self {
        SoundController {
            pose: PoseCell::new(pose),
            doppler: AtomicBool::new(true),
            attenuation: AtomicBool::new(true),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn set_pose(&self, pose: Pose) {
        self.pose.publish(pose);
    }

    pub fn set_position(&self, pos: [f64; 3]) {
        self.pose.update(|p| p.pos = DVec3::from(pos));
    }

    pub fn set_doppler(&self, enable: bool) {
        self.doppler.store(enable, Ordering::Relaxed);
    }

    pub fn set_attenuation_enabled(&self, enable: bool) {
        self.attenuation.store(enable, Ordering::Relaxed);
    }

    /// Stop rendering this sound at the next block boundary.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    /// Stopped explicitly, or finished playing.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{Constant, Noise};
    use crate::spatializer::{AmbisonicPanner, Dbap};

    const N: usize = 64;

    fn config() -> SceneConfig {
        SceneConfig {
            num_frames: N,
            sample_rate: 8000.0,
            speed_of_sound: 343.0,
        }
    }

    /// Pull `blocks` blocks and return the energy of the last one.
    fn pull(stream: &mut SceneStream, blocks: usize) -> f32 {
        let len = N * stream.channels() as usize;
        let mut energy = 0.0;
        for _ in 0..blocks {
            energy = 0.0;
            for _ in 0..len {
                let s = stream.next().unwrap();
                assert!(s.is_finite());
                energy += s * s;
            }
        }
        energy
    }

    #[test]
    fn plays_queued_sound() {
        let (mut stream, ctl) =
            scene_stream(config(), &SpeakerLayout::headset(), Box::new(Dbap::default())).unwrap();
        assert_eq!(stream.channels(), 2);
        assert_eq!(stream.sample_rate(), 8000);
        assert_eq!(pull(&mut stream, 2), 0.0);

        let _sound = ctl.play_at(Constant::new(0.5, 8000), [2.0, 1.0, 0.0]);
        assert!(pull(&mut stream, 10) > 0.0);
        assert_eq!(stream.active_sounds(), 1);
        assert_eq!(stream.scene().num_sources(), 1);
    }

    #[test]
    fn stopped_sound_is_removed() {
        let (mut stream, ctl) =
            scene_stream(config(), &SpeakerLayout::headset(), Box::new(Dbap::default())).unwrap();
        let sound = ctl.play_at(Noise::seeded(8000, 3), [0.0, 2.0, 0.0]);
        assert!(pull(&mut stream, 10) > 0.0);

        sound.stop();
        pull(&mut stream, 1);
        assert_eq!(stream.active_sounds(), 0);
        assert_eq!(stream.scene().num_sources(), 0);
        assert_eq!(pull(&mut stream, 1), 0.0);
    }

    #[test]
    fn finished_input_drains_delay_line_then_retires() {
        let (mut stream, ctl) =
            scene_stream(config(), &SpeakerLayout::headset(), Box::new(Dbap::default())).unwrap();
        let sound = ctl.play_at(Constant::new(1.0, 8000).take_samples(3 * N), [3.0, 0.0, 0.0]);
        pull(&mut stream, 4);
        assert_eq!(stream.active_sounds(), 1);
        assert!(!sound.is_stopped());

        // default far clip 33 at 8 kHz needs well under 20 blocks of tail
        pull(&mut stream, 20);
        assert_eq!(stream.active_sounds(), 0);
        assert!(sound.is_stopped());
    }

    #[test]
    fn moving_listener_away_silences_sound() {
        let (mut stream, ctl) = scene_stream(
            config(),
            &SpeakerLayout::octal(),
            Box::new(AmbisonicPanner::default()),
        )
        .unwrap();
        let _sound = ctl.play_at(Constant::new(1.0, 8000), [1.0, 1.0, 0.0]);
        assert!(pull(&mut stream, 8) > 0.0);

        ctl.set_listener_position(DVec3::new(100.0, 0.0, 0.0));
        assert_eq!(pull(&mut stream, 8), 0.0);
    }

    #[test]
    fn sound_controls_reach_the_scene() {
        let (mut stream, ctl) =
            scene_stream(config(), &SpeakerLayout::headset(), Box::new(Dbap::default())).unwrap();
        let sound = ctl.play(
            Constant::new(1.0, 8000),
            Pose::from_array([50.0, 0.0, 0.0]),
            Attenuation::default(),
        );
        // beyond the far clip the sound is culled
        assert_eq!(pull(&mut stream, 8), 0.0);

        // without Doppler nothing is culled; the default `amp_far` is 0 so attenuation goes too
        sound.set_doppler(false);
        sound.set_attenuation_enabled(false);
        assert!(pull(&mut stream, 2) > 0.0);

        sound.set_doppler(true);
        sound.set_position([2.0, 0.0, 0.0]);
        assert!(pull(&mut stream, 8) > 0.0);
        let src = stream.scene().sources().next().unwrap().1;
        assert_eq!(src.pose().pos, DVec3::new(2.0, 0.0, 0.0));
        assert!(src.doppler_enabled() && !src.attenuation_enabled());
    }

    #[test]
    fn many_sounds_fit_preallocated_lists() {
        let (mut stream, ctl) =
            scene_stream(config(), &SpeakerLayout::headset(), Box::new(Dbap::default())).unwrap();
        let capacity = stream.scene().source_capacity();
        assert!(capacity >= MAX_VOICES);

        let sounds: Vec<_> = (0..MAX_VOICES)
            .map(|i| ctl.play_at(Constant::new(0.01, 8000), [1.0 + i as f64 * 0.1, 0.0, 0.0]))
            .collect();
        pull(&mut stream, 1);
        assert_eq!(stream.active_sounds(), MAX_VOICES);
        assert_eq!(stream.scene().source_capacity(), capacity);

        for sound in &sounds {
            sound.stop();
        }
        pull(&mut stream, 1);
        assert_eq!(stream.active_sounds(), 0);
    }

    #[test]
    fn invalid_attenuation_stops_sound() {
        let (mut stream, ctl) =
            scene_stream(config(), &SpeakerLayout::headset(), Box::new(Dbap::default())).unwrap();
        let atten = Attenuation {
            near_clip: -1.0,
            ..Attenuation::default()
        };
        let sound = ctl.play(Constant::new(1.0, 8000), Pose::default(), atten);
        pull(&mut stream, 1);
        assert!(sound.is_stopped());
        assert_eq!(stream.active_sounds(), 0);
    }

    #[test]
    fn resamples_foreign_inputs() {
        let (mut stream, ctl) =
            scene_stream(config(), &SpeakerLayout::headset(), Box::new(Dbap::default())).unwrap();
        let _sound = ctl.play_at(Constant::new(0.5, 44100), [1.0, 0.0, 0.0]);
        assert!(pull(&mut stream, 8) > 0.0);
    }

    #[test]
    fn reverb_adds_tail() {
        let (stream, ctl) =
            scene_stream(config(), &SpeakerLayout::headset(), Box::new(Dbap::default())).unwrap();
        let mut stream = stream.with_reverb(1.0);
        let sound = ctl.play_at(Noise::seeded(8000, 5), [1.0, 1.0, 0.0]);
        pull(&mut stream, 10);
        sound.stop();
        pull(&mut stream, 1);
        assert_eq!(stream.active_sounds(), 0);
        assert!(pull(&mut stream, 1) > 0.0);
    }
}
