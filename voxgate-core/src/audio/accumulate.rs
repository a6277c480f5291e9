//! Growable utterance buffer.
//!
//! `PcmBuffer` is channel-major, so appending to a multi-channel buffer moves
//! every channel after the first. `PcmAccumulator` keeps one plane per
//! channel instead: each push only extends the planes, and the channel-major
//! buffer is packed when a snapshot is requested.

use super::convert::Sample;
use super::{PcmBuffer, SampleEncoding, Samples};
use crate::error::{Result, VoxgateError};

#[derive(Debug, Clone, PartialEq)]
enum Planes {
    Int16(Vec<Vec<i16>>),
    Float32(Vec<Vec<f32>>),
}

/// Append-only audio accumulator with a fixed format.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmAccumulator {
    planes: Planes,
    sample_rate: u32,
    channels: u16,
}

impl PcmAccumulator {
    /// Start from a copy of `first`, adopting its format.
    pub fn from_buffer(first: &PcmBuffer) -> Self {
        let channels = first.channels() as usize;
        let planes = match first.samples() {
            Samples::Int16(v) => Planes::Int16(split_planes(v, channels)),
            Samples::Float32(v) => Planes::Float32(split_planes(v, channels)),
        };
        Self {
            planes,
            sample_rate: first.sample_rate(),
            channels: first.channels(),
        }
    }

    pub fn encoding(&self) -> SampleEncoding {
        match self.planes {
            Planes::Int16(_) => SampleEncoding::Int16,
            Planes::Float32(_) => SampleEncoding::Float32,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Samples per channel.
    pub fn frames(&self) -> usize {
        match &self.planes {
            Planes::Int16(p) => p.first().map_or(0, Vec::len),
            Planes::Float32(p) => p.first().map_or(0, Vec::len),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    pub fn duration_ms(&self) -> f64 {
        self.frames() as f64 * 1000.0 / self.sample_rate as f64
    }

    /// Append `pcm` after everything accumulated so far.
    ///
    /// # Errors
    /// `IncompatibleBuffers` unless rate, channel count and encoding match.
    pub fn push(&mut self, pcm: &PcmBuffer) -> Result<()> {
        if pcm.sample_rate() != self.sample_rate || pcm.channels() != self.channels {
            return Err(self.mismatch(pcm));
        }
        match (&mut self.planes, pcm.samples()) {
            (Planes::Int16(dst), Samples::Int16(src)) => extend_planes(dst, src),
            (Planes::Float32(dst), Samples::Float32(src)) => extend_planes(dst, src),
            _ => return Err(self.mismatch(pcm)),
        }
        Ok(())
    }

    /// Channel-major copy of everything accumulated.
    pub fn to_pcm(&self) -> PcmBuffer {
        let samples = match &self.planes {
            Planes::Int16(p) => Samples::Int16(p.concat()),
            Planes::Float32(p) => Samples::Float32(p.concat()),
        };
        PcmBuffer::from_parts(samples, self.sample_rate, self.channels)
    }

    pub fn into_pcm(self) -> PcmBuffer {
        self.to_pcm()
    }

    fn mismatch(&self, pcm: &PcmBuffer) -> VoxgateError {
        VoxgateError::IncompatibleBuffers(format!(
            "cannot accumulate {} Hz/{}ch/{} into {} Hz/{}ch/{}",
            pcm.sample_rate(),
            pcm.channels(),
            pcm.encoding().as_str(),
            self.sample_rate,
            self.channels,
            self.encoding().as_str()
        ))
    }
}

fn split_planes<S: Sample>(data: &[S], channels: usize) -> Vec<Vec<S>> {
    let frames = data.len() / channels;
    (0..channels)
        .map(|c| data[c * frames..(c + 1) * frames].to_vec())
        .collect()
}

fn extend_planes<S: Sample>(planes: &mut [Vec<S>], src: &[S]) {
    let frames = src.len() / planes.len();
    for (c, plane) in planes.iter_mut().enumerate() {
        plane.extend_from_slice(&src[c * frames..(c + 1) * frames]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stereo_pushes_pack_channel_major() {
        let stereo = |v: Vec<i16>| PcmBuffer::from_i16(v, 8_000, 2).unwrap();
        let mut acc = PcmAccumulator::from_buffer(&stereo(vec![1, 2, -1, -2]));
        acc.push(&stereo(vec![3, -3])).unwrap();
        acc.push(&stereo(vec![4, 5, -4, -5])).unwrap();

        assert_eq!(acc.frames(), 5);
        let pcm = acc.into_pcm();
        assert_eq!(pcm.as_i16().unwrap(), &[1, 2, 3, 4, 5, -1, -2, -3, -4, -5]);
        assert_eq!(pcm.channels(), 2);
    }

    #[test]
    fn matches_repeated_append() {
        let first =
            PcmBuffer::from_f32(vec![0.1, 0.2, 0.3, -0.1, -0.2, -0.3], 16_000, 2).unwrap();
        let next = PcmBuffer::from_f32(vec![0.4, -0.4], 16_000, 2).unwrap();

        let mut acc = PcmAccumulator::from_buffer(&first);
        let mut appended = first.clone();
        for _ in 0..4 {
            acc.push(&next).unwrap();
            appended.append(&next).unwrap();
        }
        assert_eq!(acc.to_pcm(), appended);
        assert!((acc.duration_ms() - appended.duration_ms()).abs() < 1e-9);
    }

    #[test]
    fn format_mismatch_is_rejected() {
        let mono = PcmBuffer::from_i16(vec![0; 4], 8_000, 1).unwrap();
        let mut acc = PcmAccumulator::from_buffer(&mono);
        let float = PcmBuffer::from_f32(vec![0.0; 4], 8_000, 1).unwrap();
        let stereo = PcmBuffer::from_i16(vec![0; 4], 8_000, 2).unwrap();
        assert!(matches!(
            acc.push(&float),
            Err(VoxgateError::IncompatibleBuffers(_))
        ));
        assert!(matches!(
            acc.push(&stereo),
            Err(VoxgateError::IncompatibleBuffers(_))
        ));
        assert_eq!(acc.frames(), 4);
    }
}
