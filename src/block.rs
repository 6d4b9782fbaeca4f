//! Planar output buffers for one audio callback.

use crate::error::{Result, SceneError};

/// One block of output audio: `channels` planar buffers of `frames` samples each.
///
/// Spatializers accumulate into the buffers; the host clears them before rendering.
#[derive(Clone, Debug)]
pub struct AudioBlock {
    frames: usize,
    sample_rate: f64,
    out: Vec<Vec<f32>>,
}

impl AudioBlock {
    pub fn new(channels: usize, frames: usize, sample_rate: f64) -> Self {
        AudioBlock {
            frames,
            sample_rate,
            out: vec![vec![0.0; frames]; channels],
        }
    }

    #[inline(always)]
    pub fn frames(&self) -> usize {
        self.frames
    }

    #[inline(always)]
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    #[inline(always)]
    pub fn channels(&self) -> usize {
        self.out.len()
    }

    /// Output samples of `channel`.
    #[inline(always)]
    pub fn out(&self, channel: usize) -> &[f32] {
        &self.out[channel]
    }

    #[inline(always)]
    pub fn out_mut(&mut self, channel: usize) -> &mut [f32] {
        &mut self.out[channel]
    }

    /// Channels 0 and 1 at once, if the block has them.
    pub fn stereo_mut(&mut self) -> Option<(&mut [f32], &mut [f32])> {
        let (left, rest) = self.out.split_first_mut()?;
        let right = rest.first_mut()?;
        Some((left.as_mut_slice(), right.as_mut_slice()))
    }

    /// Add `value` to `channel` at `frame`.
    #[inline(always)]
    pub fn accumulate(&mut self, channel: usize, frame: usize, value: f32) {
        self.out[channel][frame] += value;
    }

    pub fn zero_out(&mut self) {
        for ch in &mut self.out {
            for s in ch.iter_mut() {
                *s = 0.0;
            }
        }
    }

    /// Change the block length. Allocates; call outside the audio callback.
    pub fn resize(&mut self, frames: usize) {
        for ch in &mut self.out {
            ch.resize(frames, 0.0);
        }
        self.frames = frames;
    }

    /// Fails unless every channel in `channels` exists in this block.
    pub fn check_channels<I: IntoIterator<Item = usize>>(&self, channels: I) -> Result<()> {
        for channel in channels {
            if channel >= self.channels() {
                return Err(SceneError::ChannelOutOfRange {
                    channel,
                    channels: self.channels(),
                });
            }
        }
        Ok(())
    }

    /// Write frame-interleaved samples into `dest`, which must hold `frames * channels` values.
    pub fn interleave_into(&self, dest: &mut [f32]) {
        let channels = self.channels();
        for (f, frame) in dest.chunks_mut(channels).take(self.frames).enumerate() {
            for (c, s) in frame.iter_mut().enumerate() {
                *s = self.out[c][f];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_and_interleaves() {
        let mut block = AudioBlock::new(2, 3, 48000.0);
        block.accumulate(0, 1, 0.5);
        block.accumulate(0, 1, 0.25);
        block.accumulate(1, 2, -1.0);
        let mut inter = [9.0; 6];
        block.interleave_into(&mut inter);
        assert_eq!(inter, [0.0, 0.0, 0.75, 0.0, 0.0, -1.0]);

        block.zero_out();
        assert!(block.out(0).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn channel_check() {
        let block = AudioBlock::new(2, 4, 44100.0);
        assert!(block.check_channels(vec![0, 1]).is_ok());
        match block.check_channels(vec![2]) {
            Err(SceneError::ChannelOutOfRange { channel: 2, channels: 2 }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn resize_keeps_channels() {
        let mut block = AudioBlock::new(3, 4, 44100.0);
        block.resize(8);
        assert_eq!(block.frames(), 8);
        assert_eq!(block.out(2).len(), 8);
    }
}
