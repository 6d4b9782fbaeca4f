//! Render moving sound sources to arbitrary speaker layouts.
//!
//! Each sound source keeps a delay line of its recent dry signal. Listeners read from it at a
//! position that depends on their distance to the source, so moving sources (and listeners)
//! produce Doppler shift. Samples are attenuated with distance and handed to a `Spatializer`
//! that pans them across the listener's speakers.
//!
//! `AudioScene` is the synchronous core and can be driven from any audio callback.
//! `SceneBuilder` wraps it in a rodio stream playing on an output device:
//!
//! ```no_run
//! use audioscene::{sources, SceneBuilder};
//!
//! let engine = SceneBuilder::default().build().unwrap();
//! let sound = engine.play_at(sources::Noise::new(44100), [5.0, 1.0, 0.0]);
//! sound.set_position([-5.0, 1.0, 0.0]);
//! ```

extern crate cpal;
pub extern crate rodio;

mod bformat;
mod block;
mod delay;
mod error;
mod filter;
mod history;
mod listener;
mod pose;
mod reverb;
mod scene;
mod source;
pub mod sources;
pub mod spatializer;
mod speaker;
mod stream;

use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait};
use tracing::info;

pub use crate::bformat::{Bformat, Bweights};
pub use crate::block::AudioBlock;
pub use crate::delay::DelayBuffer;
pub use crate::error::{Result, SceneError};
pub use crate::history::{relative_position, OrientationHistory, PositionHistory, ShiftBuffer};
pub use crate::listener::{Listener, ListenerState};
pub use crate::pose::{Pose, PoseCell};
pub use crate::reverb::Reverb;
pub use crate::scene::{AudioScene, ListenerId, SceneConfig, SourceId};
pub use crate::source::{Attenuation, SoundSource};
pub use crate::spatializer::{AmbisonicPanner, Dbap, Spatializer};
pub use crate::speaker::{Speaker, SpeakerLayout};
pub use crate::stream::{scene_stream, SceneController, SceneStream, SoundController};

pub use glam::{DQuat, DVec3};

pub struct SceneBuilder {
    device: Option<cpal::Device>,
    config: SceneConfig,
    layout: SpeakerLayout,
    spatializer: Option<Box<dyn Spatializer>>,
    reverb: Option<f32>,
}

impl SceneBuilder {
    pub fn new() -> Self {
        SceneBuilder {
            device: None,
            config: SceneConfig::default(),
            layout: SpeakerLayout::headset(),
            spatializer: None,
            reverb: None,
        }
    }

    pub fn with_device(self, device: cpal::Device) -> Self {
        SceneBuilder {
            device: Some(device),
            ..self
        }
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.config.sample_rate = sample_rate as f64;
        self
    }

    pub fn with_num_frames(mut self, num_frames: usize) -> Self {
        self.config.num_frames = num_frames;
        self
    }

    pub fn with_speed_of_sound(mut self, speed_of_sound: f64) -> Self {
        self.config.speed_of_sound = speed_of_sound;
        self
    }

    pub fn with_config(self, config: SceneConfig) -> Self {
        SceneBuilder { config, ..self }
    }

    /// Output speakers; defaults to a headset.
    pub fn with_speaker_layout(self, layout: SpeakerLayout) -> Self {
        SceneBuilder { layout, ..self }
    }

    /// Panning strategy; defaults to `Dbap`.
    pub fn with_spatializer<S: Spatializer + 'static>(self, spatializer: S) -> Self {
        SceneBuilder {
            spatializer: Some(Box::new(spatializer)),
            ..self
        }
    }

    /// Add a plate reverb on output channels 0 and 1.
    pub fn with_reverb(self, wet: f32) -> Self {
        SceneBuilder {
            reverb: Some(wet),
            ..self
        }
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Build the scene stream without opening a device.
    pub fn build_stream(self) -> Result<(SceneStream, Arc<SceneController>)> {
        if self.config.num_frames == 0 {
            return Err(SceneError::InvalidBlockSize(0));
        }
        let spatializer = self
            .spatializer
            .unwrap_or_else(|| Box::new(Dbap::default()));
        let (stream, controller) = scene_stream(self.config, &self.layout, spatializer)?;
        let stream = match self.reverb {
            Some(wet) => stream.with_reverb(wet),
            None => stream,
        };
        Ok((stream, controller))
    }

    /// Open the output device and start playing the scene.
    pub fn build(mut self) -> Result<Engine> {
        let device = match self.device.take() {
            Some(device) => device,
            None => cpal::default_host()
                .default_output_device()
                .ok_or(SceneError::NoOutputDevice)?,
        };
        info!(
            "playing on {} at {} Hz",
            device.name().unwrap_or_else(|_| "unnamed device".into()),
            self.config.sample_rate
        );

        let (stream, handle) = rodio::OutputStream::try_from_device(&device)?;
        let sink = rodio::Sink::try_new(&handle)?;

        let (output, controller) = self.build_stream()?;
        sink.append(output);

        Ok(Engine {
            _stream: stream,
            sink,
            controller,
        })
    }
}

impl Default for SceneBuilder {
    fn default() -> Self {
        SceneBuilder::new()
    }
}

/// A running scene. Playback stops when it is dropped.
pub struct Engine {
    _stream: rodio::OutputStream,
    sink: rodio::Sink,
    controller: Arc<SceneController>,
}

impl Engine {
    /// Play a mono `input` with the given pose and attenuation.
    pub fn play<I>(&self, input: I, pose: Pose, atten: Attenuation) -> Arc<SoundController>
    where
        I: rodio::Source + Send + 'static,
        I::Item: rodio::Sample + Send,
    {
        self.controller.play(input, pose, atten)
    }

    /// Play a mono `input` at `pos` with default attenuation.
    pub fn play_at<I>(&self, input: I, pos: [f64; 3]) -> Arc<SoundController>
    where
        I: rodio::Source + Send + 'static,
        I::Item: rodio::Sample + Send,
    {
        self.controller.play_at(input, pos)
    }

    pub fn set_listener_pose(&self, pose: Pose) {
        self.controller.set_listener_pose(pose);
    }

    pub fn set_volume(&self, volume: f32) {
        self.sink.set_volume(volume);
    }

    pub fn controller(&self) -> Arc<SceneController> {
        self.controller.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::Impulse;

    #[test]
    fn builder_defaults() {
        let builder = SceneBuilder::default();
        assert_eq!(*builder.config(), SceneConfig::default());

        let builder = builder
            .with_sample_rate(48000)
            .with_num_frames(256)
            .with_speed_of_sound(340.0);
        assert_eq!(
            *builder.config(),
            SceneConfig {
                num_frames: 256,
                sample_rate: 48000.0,
                speed_of_sound: 340.0,
            }
        );
    }

    #[test]
    fn build_stream_uses_layout() {
        let (stream, ctl) = SceneBuilder::new()
            .with_speaker_layout(SpeakerLayout::octal())
            .with_spatializer(AmbisonicPanner::default())
            .with_num_frames(128)
            .build_stream()
            .unwrap();
        assert_eq!(rodio::Source::channels(&stream), 8);
        assert_eq!(ctl.config().num_frames, 128);
    }

    #[test]
    fn build_stream_rejects_empty_layout() {
        let result = SceneBuilder::new()
            .with_speaker_layout(SpeakerLayout::from_speakers(vec![]))
            .build_stream();
        match result {
            Err(SceneError::EmptySpeakerLayout) => {}
            Err(e) => panic!("unexpected error {}", e),
            Ok(_) => panic!("empty layout accepted"),
        }
    }

    #[test]
    fn build_stream_rejects_zero_block() {
        assert!(SceneBuilder::new().with_num_frames(0).build_stream().is_err());
    }

    #[test]
    fn stream_renders_without_device() {
        let (mut stream, ctl) = SceneBuilder::new()
            .with_sample_rate(8000)
            .with_num_frames(32)
            .with_reverb(0.3)
            .build_stream()
            .unwrap();
        let _sound = ctl.play_at(Impulse::new(100, 8000), [1.0, 0.5, 0.0]);
        let energy: f32 = stream.by_ref().take(2 * 32 * 40).map(|s| s * s).sum();
        assert!(energy > 0.0);
    }
}
