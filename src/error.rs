//! Errors raised while configuring or driving an audio scene

use thiserror::Error;

use crate::scene::{ListenerId, SourceId};

pub type Result<T> = std::result::Result<T, SceneError>;

#[derive(Debug, Error)]
pub enum SceneError {
    /// The delay line cannot hold a single block of look-back; the source could never be heard.
    #[error("delay line of {capacity} samples is too short, at least {required} required")]
    DelayTooShort { capacity: usize, required: usize },

    #[error("invalid attenuation: near clip {near_clip}, clip range {clip_range}, far amplitude {amp_far}")]
    InvalidAttenuation {
        near_clip: f64,
        clip_range: f64,
        amp_far: f64,
    },

    #[error("speaker layout contains no speakers")]
    EmptySpeakerLayout,

    #[error("speaker {index} has no direction (zero-length position)")]
    DegenerateSpeaker { index: usize },

    #[error("block has {actual} frames but the scene is configured for {expected}")]
    BlockSizeMismatch { expected: usize, actual: usize },

    #[error("invalid block size: {0}")]
    InvalidBlockSize(usize),

    #[error("output channel {channel} out of range ({channels} channels)")]
    ChannelOutOfRange { channel: usize, channels: usize },

    #[error("unknown sound source {0:?}")]
    UnknownSource(SourceId),

    #[error("unknown listener {0:?}")]
    UnknownListener(ListenerId),

    #[error("spatializer used before compile")]
    NotCompiled,

    #[error("no audio output device available")]
    NoOutputDevice,

    #[error("cannot open output stream: {0}")]
    Stream(#[from] rodio::StreamError),

    #[error("cannot start playback: {0}")]
    Play(#[from] rodio::PlayError),
}
