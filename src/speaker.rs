//! Output speaker geometry.
//!
//! Coordinates follow the usual Ambisonics convention: `+x` is forward, `+y` is left and `+z`
//! is up. A positive azimuth turns towards the left, a positive elevation upwards. Angles are
//! in degrees.

use glam::DVec3;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Speaker {
    /// Output channel this speaker is wired to.
    pub device_channel: usize,
    pub azimuth: f64,
    pub elevation: f64,
    pub radius: f64,
    pub gain: f64,
}

impl Speaker {
    pub fn new(device_channel: usize, azimuth: f64, elevation: f64) -> Self {
        Speaker {
            device_channel,
            azimuth,
            elevation,
            radius: 1.0,
            gain: 1.0,
        }
    }

    pub fn with_radius(self, radius: f64) -> Self {
        Speaker { radius, ..self }
    }

    /// Cartesian position relative to the listener.
    pub fn vec(&self) -> DVec3 {
        let az = self.azimuth.to_radians();
        let el = self.elevation.to_radians();
        DVec3::new(az.cos() * el.cos(), az.sin() * el.cos(), el.sin()) * self.radius
    }
}

/// An ordered set of speakers.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeakerLayout {
    pub speakers: Vec<Speaker>,
}

impl SpeakerLayout {
    pub fn from_speakers(speakers: Vec<Speaker>) -> Self {
        SpeakerLayout { speakers }
    }

    /// Headphones: left and right at +/- 90 degrees.
    pub fn headset() -> Self {
        SpeakerLayout::from_speakers(vec![Speaker::new(0, 90.0, 0.0), Speaker::new(1, -90.0, 0.0)])
    }

    /// Two speakers in front of the listener at +/- `angle` degrees, left on channel 0.
    pub fn stereo(angle: f64) -> Self {
        SpeakerLayout::from_speakers(vec![
            Speaker::new(0, angle, 0.0),
            Speaker::new(1, -angle, 0.0),
        ])
    }

    /// `n` evenly spaced speakers on a ring, starting straight ahead and going left.
    pub fn ring(n: usize, elevation: f64, radius: f64) -> Self {
        let step = 360.0 / n.max(1) as f64;
        SpeakerLayout::from_speakers(
            (0..n)
                .map(|i| Speaker::new(i, i as f64 * step, elevation).with_radius(radius))
                .collect(),
        )
    }

    /// Eight speakers on a horizontal ring.
    pub fn octal() -> Self {
        SpeakerLayout::ring(8, 0.0, 1.0)
    }

    pub fn len(&self) -> usize {
        self.speakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.speakers.is_empty()
    }

    /// Number of output channels needed to address every speaker.
    pub fn num_channels(&self) -> usize {
        self.speakers
            .iter()
            .map(|s| s.device_channel + 1)
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: DVec3, b: DVec3) -> bool {
        (a - b).length() < 1e-9
    }

    #[test]
    fn directions_follow_convention() {
        assert!(close(Speaker::new(0, 0.0, 0.0).vec(), DVec3::X));
        assert!(close(Speaker::new(0, 90.0, 0.0).vec(), DVec3::Y));
        assert!(close(Speaker::new(0, -90.0, 0.0).vec(), -DVec3::Y));
        assert!(close(Speaker::new(0, 0.0, 90.0).vec(), DVec3::Z));
        assert!(close(Speaker::new(0, 180.0, 0.0).with_radius(2.0).vec(), DVec3::new(-2.0, 0.0, 0.0)));
    }

    #[test]
    fn ring_layout() {
        let layout = SpeakerLayout::octal();
        assert_eq!(layout.len(), 8);
        assert_eq!(layout.num_channels(), 8);
        assert_eq!(layout.speakers[2].azimuth, 90.0);
    }

    #[test]
    fn channel_count_uses_highest_channel() {
        let layout = SpeakerLayout::from_speakers(vec![Speaker::new(3, 0.0, 0.0)]);
        assert_eq!(layout.num_channels(), 4);
        assert_eq!(SpeakerLayout::default().num_channels(), 0);
    }

    #[test]
    fn layout_from_json() {
        let layout: SpeakerLayout = serde_json::from_str(
            r#"{"speakers":[
                {"device_channel":0,"azimuth":30.0,"elevation":0.0,"radius":1.0,"gain":1.0},
                {"device_channel":1,"azimuth":-30.0,"elevation":0.0,"radius":1.0,"gain":1.0}
            ]}"#,
        )
        .unwrap();
        assert_eq!(layout, SpeakerLayout::stereo(30.0));
    }
}
