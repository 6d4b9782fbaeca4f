//! First-order Ambisonics panning.
//!
//! Sources are encoded into one *B-format* frame per sample during the block. `finalize` decodes
//! the encoded sound field by pointing one virtual microphone at every speaker.

use glam::DVec3;
use tracing::info;

use super::Spatializer;
use crate::bformat::{Bformat, Bweights};
use crate::block::AudioBlock;
use crate::error::{Result, SceneError};
use crate::listener::ListenerState;
use crate::source::SoundSource;
use crate::speaker::{Speaker, SpeakerLayout};

pub struct AmbisonicPanner {
    speakers: Vec<Speaker>,
    mics: Vec<Bweights>,
    device_channels: Vec<usize>,
    encoded: Vec<Bformat>,
    directivity: f32,
}

impl AmbisonicPanner {
    /// `directivity` is the polar pattern of the decoding microphones, 0.5 is cardioid.
    pub fn new(directivity: f32) -> Self {
        AmbisonicPanner {
            speakers: Vec::new(),
            mics: Vec::new(),
            device_channels: Vec::new(),
            encoded: Vec::new(),
            directivity,
        }
    }

    pub fn directivity(&self) -> f32 {
        self.directivity
    }
}

impl Default for AmbisonicPanner {
    fn default() -> Self {
        AmbisonicPanner::new(0.5)
    }
}

impl Spatializer for AmbisonicPanner {
    fn set_speaker_layout(&mut self, layout: &SpeakerLayout) {
        self.speakers.clear();
        self.speakers.extend_from_slice(&layout.speakers);
    }

    fn num_speakers(&self) -> usize {
        self.speakers.len()
    }

    fn num_frames(&mut self, num_frames: usize) {
        self.encoded.resize(num_frames, Bformat::ZERO);
    }

    fn compile(&mut self, listener: &ListenerState) -> Result<()> {
        if self.speakers.is_empty() {
            return Err(SceneError::EmptySpeakerLayout);
        }
        self.mics.clear();
        self.device_channels.clear();
        for (index, s) in self.speakers.iter().enumerate() {
            let v = s.vec();
            if v.length_squared() == 0.0 {
                return Err(SceneError::DegenerateSpeaker { index });
            }
            let mic = Bweights::virtual_microphone(v, self.directivity);
            self.mics.push(mic.amplify(s.gain as f32));
            self.device_channels.push(s.device_channel);
        }
        self.encoded.resize(listener.num_frames(), Bformat::ZERO);
        info!(
            "Ambisonic panner compiled with {} speakers, directivity {}",
            self.speakers.len(),
            self.directivity
        );
        Ok(())
    }

    fn prepare(&mut self, _block: &mut AudioBlock) {
        for b in &mut self.encoded {
            *b = Bformat::ZERO;
        }
    }

    #[inline]
    fn perform(
        &mut self,
        _block: &mut AudioBlock,
        _source: &SoundSource,
        relpos: DVec3,
        _num_frames: usize,
        frame_index: usize,
        sample: f32,
    ) {
        self.encoded[frame_index] += Bweights::from_direction(relpos).scale(sample);
    }

    fn finalize(&mut self, block: &mut AudioBlock) {
        for (mic, &ch) in self.mics.iter().zip(&self.device_channels) {
            let out = block.out_mut(ch);
            for (o, b) in out.iter_mut().zip(&self.encoded) {
                *o += mic.dot(*b);
            }
        }
    }
}
