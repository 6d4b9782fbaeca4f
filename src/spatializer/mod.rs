//! Panning strategies that distribute a positioned sample over a speaker layout.
//!
//! The scene calls a listener's spatializer in this order every block:
//!
//! 1. `prepare` once,
//! 2. `perform` for every audible (source, frame) pair, sources in registration order,
//! 3. `finalize` once.
//!
//! `perform` runs once per sample per source, so implementations must not allocate there.
//! Anything sized by the layout or the block length is allocated in `set_speaker_layout`,
//! `compile` or `num_frames`.

mod ambisonic;
mod dbap;

pub use self::ambisonic::AmbisonicPanner;
pub use self::dbap::{Dbap, DBAP_MAX_DIST};

use glam::DVec3;

use crate::block::AudioBlock;
use crate::error::Result;
use crate::listener::ListenerState;
use crate::source::SoundSource;
use crate::speaker::SpeakerLayout;

pub trait Spatializer: Send {
    /// Take a copy of the speakers to render to. Takes effect at the next `compile`.
    fn set_speaker_layout(&mut self, layout: &SpeakerLayout);

    fn num_speakers(&self) -> usize;

    /// Block length changed.
    fn num_frames(&mut self, _num_frames: usize) {}

    /// Precompute everything derived from the speaker layout.
    fn compile(&mut self, _listener: &ListenerState) -> Result<()> {
        Ok(())
    }

    /// Called once at the start of every block, before any `perform`.
    fn prepare(&mut self, _block: &mut AudioBlock) {}

    /// Add `sample`, arriving from `relpos` (source minus listener), to frame `frame_index`.
    fn perform(
        &mut self,
        block: &mut AudioBlock,
        source: &SoundSource,
        relpos: DVec3,
        num_frames: usize,
        frame_index: usize,
        sample: f32,
    );

    /// Add a whole block of samples from a source that does not move within the block.
    fn perform_block(
        &mut self,
        block: &mut AudioBlock,
        source: &SoundSource,
        relpos: DVec3,
        samples: &[f32],
    ) {
        let n = samples.len();
        for (i, &s) in samples.iter().enumerate() {
            self.perform(block, source, relpos, n, i, s);
        }
    }

    /// Called once at the end of every block, after all sources were performed.
    fn finalize(&mut self, _block: &mut AudioBlock) {}
}
