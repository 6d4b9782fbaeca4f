//! Position and orientation of listeners and sound sources.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};

/// Position plus unit-quaternion orientation.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub pos: DVec3,
    pub quat: DQuat,
}

impl Default for Pose {
    fn default() -> Self {
        Pose {
            pos: DVec3::ZERO,
            quat: DQuat::IDENTITY,
        }
    }
}

impl Pose {
    pub fn new(pos: DVec3, quat: DQuat) -> Self {
        Pose { pos, quat }
    }

    pub fn at(pos: DVec3) -> Self {
        Pose {
            pos,
            ..Pose::default()
        }
    }

    pub fn from_array(pos: [f64; 3]) -> Self {
        Pose::at(DVec3::from(pos))
    }
}

/// Single-slot handoff of a pose from a control thread to the audio thread.
///
/// The control side publishes whenever it likes. The audio side takes one snapshot per block
/// and never blocks: if the slot is contended it keeps the pose it already has and picks the
/// update up on the next block.
#[derive(Debug, Default)]
pub struct PoseCell {
    dirty: AtomicBool,
    pose: Mutex<Pose>,
}

impl PoseCell {
    pub fn new(pose: Pose) -> Self {
        PoseCell {
            dirty: AtomicBool::new(true),
            pose: Mutex::new(pose),
        }
    }

    pub fn publish(&self, pose: Pose) {
        // a poisoned slot still holds a plain `Pose`, so recover it
        let mut slot = self.pose.lock().unwrap_or_else(|e| e.into_inner());
        *slot = pose;
        self.dirty.store(true, Ordering::Release);
    }

    /// Modify the published pose in place.
    pub fn update<F: FnOnce(&mut Pose)>(&self, f: F) {
        let mut slot = self.pose.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut slot);
        self.dirty.store(true, Ordering::Release);
    }

    /// Copy a newly published pose into `target`. Returns whether `target` changed.
    pub fn take_into(&self, target: &mut Pose) -> bool {
        if !self.dirty.load(Ordering::Acquire) {
            return false;
        }
        match self.pose.try_lock() {
            Ok(slot) => {
                *target = *slot;
                self.dirty.store(false, Ordering::Release);
                true
            }
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_only_when_published() {
        let cell = PoseCell::new(Pose::default());
        let mut current = Pose::from_array([9.0, 9.0, 9.0]);
        assert!(cell.take_into(&mut current));
        assert_eq!(current, Pose::default());
        assert!(!cell.take_into(&mut current));

        cell.publish(Pose::from_array([1.0, 2.0, 3.0]));
        assert!(cell.take_into(&mut current));
        assert_eq!(current.pos, DVec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn update_in_place() {
        let cell = PoseCell::new(Pose::from_array([1.0, 0.0, 0.0]));
        cell.update(|p| p.pos.y = 5.0);
        let mut current = Pose::default();
        cell.take_into(&mut current);
        assert_eq!(current.pos, DVec3::new(1.0, 5.0, 0.0));
    }

    #[test]
    fn pose_config_from_json() {
        let p: Pose =
            serde_json::from_str(r#"{"pos":[1.0,2.0,3.0],"quat":[0.0,0.0,0.0,1.0]}"#).unwrap();
        assert_eq!(p, Pose::from_array([1.0, 2.0, 3.0]));
    }
}
