//! Rendering many moving sound sources to one or more listeners.
//!
//! Every block, each listener hears each source through that source's delay line. The read
//! position in the delay line follows the listener-source distance, which produces Doppler
//! shift when the distance changes during a block. The scalar that maps distance to delay
//! index is chosen per source so that its far clip lands at the end of its delay line. The speed
//! of sound only sizes buffers.
//!
//! The host drives a block like this:
//!
//! 1. publish poses (`Listener::set_pose`, `SoundSource::set_pose`),
//! 2. write exactly `num_frames` samples of dry signal into every source,
//! 3. clear the output block and call `AudioScene::render`.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::block::AudioBlock;
use crate::error::{Result, SceneError};
use crate::history::relative_position;
use crate::listener::Listener;
use crate::source::SoundSource;
use crate::spatializer::Spatializer;
use crate::speaker::SpeakerLayout;

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Audio frames per render block.
    pub num_frames: usize,
    pub sample_rate: f64,
    /// Distance per second.
    pub speed_of_sound: f64,
}

impl Default for SceneConfig {
    fn default() -> Self {
        SceneConfig {
            num_frames: 512,
            sample_rate: 44100.0,
            speed_of_sound: 343.0,
        }
    }
}

/// Handle of a source registered with an `AudioScene`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(u64);

/// Handle of a listener owned by an `AudioScene`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl fmt::Debug for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source#{}", self.0)
    }
}

impl fmt::Debug for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

pub struct AudioScene {
    listeners: Vec<(ListenerId, Listener)>,
    sources: Vec<(SourceId, SoundSource)>,
    config: SceneConfig,
    next_id: u64,
}

impl AudioScene {
    pub fn new(num_frames: usize) -> Self {
        AudioScene::with_config(SceneConfig {
            num_frames,
            ..SceneConfig::default()
        })
    }

    pub fn with_config(config: SceneConfig) -> Self {
        AudioScene {
            listeners: Vec::new(),
            sources: Vec::new(),
            config,
            next_id: 0,
        }
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn num_frames(&self) -> usize {
        self.config.num_frames
    }

    pub fn speed_of_sound(&self) -> f64 {
        self.config.speed_of_sound
    }

    pub fn set_speed_of_sound(&mut self, v: f64) {
        self.config.speed_of_sound = v;
    }

    /// Change the block length of the scene and all its listeners.
    ///
    /// Allocates; must not run concurrently with `render`. Fails without changing anything if a
    /// registered source could not hold a block of the new length.
    pub fn set_num_frames(&mut self, v: usize) -> Result<()> {
        if v == 0 {
            return Err(SceneError::InvalidBlockSize(v));
        }
        if v == self.config.num_frames {
            return Ok(());
        }
        for (_, src) in &self.sources {
            check_capacity(src, v)?;
        }
        for (_, l) in &mut self.listeners {
            l.num_frames(v);
        }
        debug!("block size {} -> {}", self.config.num_frames, v);
        self.config.num_frames = v;
        Ok(())
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Create a listener rendering to `layout` through `spatializer`, compiled and ready.
    pub fn create_listener(
        &mut self,
        layout: &SpeakerLayout,
        spatializer: Box<dyn Spatializer>,
    ) -> Result<ListenerId> {
        let mut listener = Listener::new(self.config.num_frames, layout, spatializer);
        listener.compile()?;
        let id = ListenerId(self.next_id());
        info!("{:?} created with {} speakers", id, layout.len());
        self.listeners.push((id, listener));
        Ok(id)
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> Result<Listener> {
        let i = self
            .listeners
            .iter()
            .position(|(lid, _)| *lid == id)
            .ok_or(SceneError::UnknownListener(id))?;
        Ok(self.listeners.remove(i).1)
    }

    pub fn listener(&self, id: ListenerId) -> Option<&Listener> {
        self.listeners
            .iter()
            .find(|(lid, _)| *lid == id)
            .map(|(_, l)| l)
    }

    pub fn listener_mut(&mut self, id: ListenerId) -> Option<&mut Listener> {
        self.listeners
            .iter_mut()
            .find(|(lid, _)| *lid == id)
            .map(|(_, l)| l)
    }

    /// Listeners in creation order.
    pub fn listeners(&self) -> impl Iterator<Item = (ListenerId, &Listener)> {
        self.listeners.iter().map(|(id, l)| (*id, l))
    }

    /// Register a source. The scene holds it until `remove_source` hands it back.
    pub fn add_source(&mut self, src: SoundSource) -> Result<SourceId> {
        check_capacity(&src, self.config.num_frames)?;
        src.attenuation_params().validate()?;
        let physical = SoundSource::buffer_size(
            self.config.sample_rate,
            self.config.speed_of_sound,
            src.far_clip(),
        ) + self.config.num_frames;
        if src.delay_size() < physical {
            warn!(
                "delay line of {} samples is shorter than the {} needed for far clip {}; Doppler will be exaggerated",
                src.delay_size(),
                physical,
                src.far_clip()
            );
        }
        let id = SourceId(self.next_id());
        debug!("{:?} added, delay line {} samples", id, src.delay_size());
        self.sources.push((id, src));
        Ok(id)
    }

    /// Unregister a source and hand it back, reset so it can be added again.
    pub fn remove_source(&mut self, id: SourceId) -> Result<SoundSource> {
        let i = self
            .sources
            .iter()
            .position(|(sid, _)| *sid == id)
            .ok_or(SceneError::UnknownSource(id))?;
        debug!("{:?} removed", id);
        let mut src = self.sources.remove(i).1;
        src.reset();
        Ok(src)
    }

    /// Make room for `additional` more sources, so that adding them does not reallocate.
    pub fn reserve_sources(&mut self, additional: usize) {
        self.sources.reserve(additional);
    }

    /// Number of sources that fit without reallocating.
    pub fn source_capacity(&self) -> usize {
        self.sources.capacity()
    }

    pub fn source(&self, id: SourceId) -> Option<&SoundSource> {
        self.sources
            .iter()
            .find(|(sid, _)| *sid == id)
            .map(|(_, s)| s)
    }

    pub fn source_mut(&mut self, id: SourceId) -> Option<&mut SoundSource> {
        self.sources
            .iter_mut()
            .find(|(sid, _)| *sid == id)
            .map(|(_, s)| s)
    }

    /// Sources in registration order.
    pub fn sources(&self) -> impl Iterator<Item = (SourceId, &SoundSource)> {
        self.sources.iter().map(|(id, s)| (*id, s))
    }

    pub fn sources_mut(&mut self) -> impl Iterator<Item = (SourceId, &mut SoundSource)> {
        self.sources.iter_mut().map(|(id, s)| (*id, s))
    }

    pub fn num_sources(&self) -> usize {
        self.sources.len()
    }

    /// Add the contribution of every source to every listener into `block`.
    ///
    /// Accumulates into the block; the caller clears it. Nothing is allocated here.
    pub fn render(&mut self, block: &mut AudioBlock) -> Result<()> {
        let num_frames = block.frames();
        if num_frames != self.config.num_frames {
            return Err(SceneError::BlockSizeMismatch {
                expected: self.config.num_frames,
                actual: num_frames,
            });
        }
        for (_, l) in &self.listeners {
            if !l.is_compiled() {
                return Err(SceneError::NotCompiled);
            }
            if l.num_channels() > block.channels() {
                return Err(SceneError::ChannelOutOfRange {
                    channel: l.num_channels() - 1,
                    channels: block.channels(),
                });
            }
        }

        for (_, src) in &mut self.sources {
            let pos = src.pose().pos;
            src.pos_history.push(pos);
        }

        let sources = &self.sources;
        for (_, listener) in &mut self.listeners {
            let (state, spatializer) = listener.parts_mut();
            spatializer.prepare(block);
            state.advance();

            for (_, src) in sources {
                // culling limit: the rest of the block must still fit behind the read position
                let limit = match src.max_index().checked_sub(num_frames) {
                    Some(limit) => limit as f64,
                    None => continue,
                };
                let distance_to_index = if src.doppler_enabled() {
                    limit / src.far_clip()
                } else {
                    0.0
                };

                for i in 0..num_frames {
                    let alpha = i as f64 / num_frames as f64;
                    let relpos = relative_position(&src.pos_history, &state.pos_history, alpha);
                    let distance = relpos.length();

                    let idx = distance * distance_to_index;
                    // also rejects NaN
                    if !(idx.floor() <= limit) || idx < 0.0 {
                        continue;
                    }
                    let idx = idx + (num_frames - i) as f64;

                    let gain = src.attenuation(distance);
                    let s = src.read_sample(idx) * gain as f32;
                    spatializer.perform(block, src, relpos, num_frames, i, s);
                }
            }

            spatializer.finalize(block);
        }

        Ok(())
    }
}

fn check_capacity(src: &SoundSource, num_frames: usize) -> Result<()> {
    if src.max_index() < num_frames {
        return Err(SceneError::DelayTooShort {
            capacity: src.delay_size(),
            required: num_frames + 2,
        });
    }
    Ok(())
}
