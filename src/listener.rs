//! Listeners: one rendering perspective with its own speaker layout and panner.

use glam::{DQuat, DVec3};
use tracing::info;

use crate::error::Result;
use crate::history::{OrientationHistory, PositionHistory};
use crate::pose::Pose;
use crate::spatializer::Spatializer;
use crate::speaker::SpeakerLayout;

/// Everything about a listener except its spatializer.
///
/// Spatializers get to see this when they are compiled.
#[derive(Clone, Debug)]
pub struct ListenerState {
    pose: Pose,
    quat_history: OrientationHistory,
    pub(crate) pos_history: PositionHistory,
}

impl ListenerState {
    pub fn new(pose: Pose, num_frames: usize) -> Self {
        ListenerState {
            pose,
            quat_history: OrientationHistory::new(num_frames, pose.quat),
            pos_history: PositionHistory::filled(pose.pos),
        }
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    pub fn num_frames(&self) -> usize {
        self.quat_history.num_frames()
    }

    /// Interpolated orientation at `frame` of the most recently rendered block.
    pub fn orientation_at(&self, frame: usize) -> DQuat {
        self.quat_history.at(frame)
    }

    pub fn orientation_history(&self) -> &OrientationHistory {
        &self.quat_history
    }

    pub fn position_history(&self) -> &PositionHistory {
        &self.pos_history
    }

    /// Push the current pose into the histories. Runs once per block.
    pub(crate) fn advance(&mut self) {
        self.quat_history.advance(self.pose.quat);
        self.pos_history.push(self.pose.pos);
    }
}

pub struct Listener {
    state: ListenerState,
    spatializer: Box<dyn Spatializer>,
    num_channels: usize,
    compiled: bool,
}

impl Listener {
    pub(crate) fn new(
        num_frames: usize,
        layout: &SpeakerLayout,
        mut spatializer: Box<dyn Spatializer>,
    ) -> Self {
        spatializer.set_speaker_layout(layout);
        spatializer.num_frames(num_frames);
        Listener {
            state: ListenerState::new(Pose::default(), num_frames),
            spatializer,
            num_channels: layout.num_channels(),
            compiled: false,
        }
    }

    pub fn pose(&self) -> &Pose {
        &self.state.pose
    }

    pub fn pose_mut(&mut self) -> &mut Pose {
        &mut self.state.pose
    }

    pub fn set_pose(&mut self, pose: Pose) {
        self.state.pose = pose;
    }

    pub fn set_position(&mut self, pos: DVec3) {
        self.state.pose.pos = pos;
    }

    pub fn state(&self) -> &ListenerState {
        &self.state
    }

    pub fn orientation_at(&self, frame: usize) -> DQuat {
        self.state.orientation_at(frame)
    }

    pub fn spatializer(&self) -> &dyn Spatializer {
        &*self.spatializer
    }

    pub fn spatializer_mut(&mut self) -> &mut dyn Spatializer {
        &mut *self.spatializer
    }

    /// Output channels the speaker layout addresses.
    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled
    }

    /// Swap in a new speaker layout and recompile.
    pub fn set_speaker_layout(&mut self, layout: &SpeakerLayout) -> Result<()> {
        self.spatializer.set_speaker_layout(layout);
        self.num_channels = layout.num_channels();
        self.compile()
    }

    pub fn compile(&mut self) -> Result<()> {
        self.compiled = false;
        self.spatializer.compile(&self.state)?;
        self.compiled = true;
        info!(
            "listener compiled: {} speakers on {} channels",
            self.spatializer.num_speakers(),
            self.num_channels
        );
        Ok(())
    }

    pub(crate) fn num_frames(&mut self, v: usize) {
        if self.state.quat_history.num_frames() != v {
            self.state.quat_history.resize(v);
        }
        self.spatializer.num_frames(v);
    }

    /// Split borrow used by the renderer.
    pub(crate) fn parts_mut(&mut self) -> (&mut ListenerState, &mut dyn Spatializer) {
        (&mut self.state, &mut *self.spatializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatializer::Dbap;

    #[test]
    fn created_listener_compiles() {
        let mut l = Listener::new(64, &SpeakerLayout::stereo(30.0), Box::new(Dbap::default()));
        assert!(!l.is_compiled());
        l.compile().unwrap();
        assert!(l.is_compiled());
        assert_eq!(l.num_channels(), 2);
        assert_eq!(l.state().num_frames(), 64);
    }

    #[test]
    fn failed_compile_clears_flag() {
        let mut l = Listener::new(64, &SpeakerLayout::octal(), Box::new(Dbap::default()));
        l.compile().unwrap();
        assert!(l.set_speaker_layout(&SpeakerLayout::default()).is_err());
        assert!(!l.is_compiled());
    }

    #[test]
    fn advance_tracks_pose() {
        let mut state = ListenerState::new(Pose::default(), 8);
        state.pose = Pose::new(DVec3::new(1.0, 0.0, 0.0), DQuat::from_rotation_z(1.0));
        state.advance();
        assert_eq!(state.position_history().newest(), DVec3::new(1.0, 0.0, 0.0));
        assert_eq!(state.position_history().oldest(), DVec3::ZERO);
        assert!(state.orientation_at(0).angle_between(DQuat::IDENTITY) < 1e-9);
        assert!(state.orientation_at(4).angle_between(DQuat::from_rotation_z(0.5)) < 1e-9);
    }
}
