//! Canonical in-memory audio representation.
//!
//! # Layout
//!
//! `PcmBuffer` always stores its samples **channel-major**: for a stereo
//! buffer of `F` frames the left channel occupies indices `0..F` and the right
//! channel `F..2F`. Interleaved data coming off the wire is normalised on the
//! way in (`with_layout`, `from_bytes`) and re-interleaved on the way out
//! (`to_bytes`), so duration and byte-layout computations never have to guess
//! the shape.
//!
//! # Mutation
//!
//! Conversions (`resample`, `into_int16`, `to_float32`, ...) return new
//! buffers. The only in-place mutation is the `append` / `clear` pair used by
//! accumulation buffers (VAD speech buffer, playback carry-over).

pub mod accumulate;
pub mod convert;
pub mod g711;
pub mod resample;
pub mod wav;
pub mod window;

use std::borrow::Cow;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VoxgateError};
use convert::Sample;

/// Storage type of the samples in a `PcmBuffer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleEncoding {
    /// Signed 16-bit little-endian ("s16").
    Int16,
    /// 32-bit IEEE float in [-1.0, 1.0] ("f32").
    Float32,
}

impl SampleEncoding {
    pub fn bytes_per_sample(self) -> usize {
        match self {
            SampleEncoding::Int16 => 2,
            SampleEncoding::Float32 => 4,
        }
    }

    /// Short format tag as used by media stacks.
    pub fn as_str(self) -> &'static str {
        match self {
            SampleEncoding::Int16 => "s16",
            SampleEncoding::Float32 => "f32",
        }
    }
}

/// Owned sample storage. The variant *is* the encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    Int16(Vec<i16>),
    Float32(Vec<f32>),
}

impl Samples {
    pub fn encoding(&self) -> SampleEncoding {
        match self {
            Samples::Int16(_) => SampleEncoding::Int16,
            Samples::Float32(_) => SampleEncoding::Float32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Samples::Int16(v) => v.len(),
            Samples::Float32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn empty(encoding: SampleEncoding) -> Self {
        match encoding {
            SampleEncoding::Int16 => Samples::Int16(Vec::new()),
            SampleEncoding::Float32 => Samples::Float32(Vec::new()),
        }
    }
}

impl From<Vec<i16>> for Samples {
    fn from(v: Vec<i16>) -> Self {
        Samples::Int16(v)
    }
}

impl From<Vec<f32>> for Samples {
    fn from(v: Vec<f32>) -> Self {
        Samples::Float32(v)
    }
}

/// Arrangement of multi-channel input handed to `PcmBuffer::with_layout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleLayout {
    /// `(channels, samples)`: all of channel 0, then all of channel 1, ...
    ChannelMajor,
    /// `(samples, channels)`: `L0,R0,L1,R1,...`
    Interleaved,
}

/// PCM audio with its rate, channel count, encoding and optional timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    samples: Samples,
    sample_rate: u32,
    channels: u16,
    pts: Option<i64>,
    dts: Option<i64>,
    time_base: Option<f64>,
}

impl PcmBuffer {
    /// Build a buffer from channel-major samples.
    ///
    /// # Errors
    /// - `DtypeMismatch` if `encoding` does not describe `samples`.
    /// - `InvalidSampleRate` / `InvalidChannels` for zero values.
    /// - `UnevenChannels` if the sample count is not a multiple of `channels`.
    pub fn new(
        samples: Samples,
        sample_rate: u32,
        channels: u16,
        encoding: SampleEncoding,
    ) -> Result<Self> {
        Self::with_layout(samples, sample_rate, channels, encoding, SampleLayout::ChannelMajor)
    }

    /// Build a buffer from samples in an explicit layout, normalising to
    /// channel-major storage.
    pub fn with_layout(
        samples: Samples,
        sample_rate: u32,
        channels: u16,
        encoding: SampleEncoding,
        layout: SampleLayout,
    ) -> Result<Self> {
        let actual = samples.encoding();
        if actual != encoding {
            return Err(VoxgateError::DtypeMismatch {
                declared: encoding,
                actual,
            });
        }
        if sample_rate == 0 {
            return Err(VoxgateError::InvalidSampleRate(sample_rate));
        }
        if channels == 0 {
            return Err(VoxgateError::InvalidChannels(channels));
        }
        if samples.len() % channels as usize != 0 {
            return Err(VoxgateError::UnevenChannels {
                len: samples.len(),
                channels,
            });
        }

        let samples = match (layout, samples) {
            (SampleLayout::Interleaved, Samples::Int16(v)) if channels > 1 => {
                Samples::Int16(convert::deinterleave(&v, channels as usize))
            }
            (SampleLayout::Interleaved, Samples::Float32(v)) if channels > 1 => {
                Samples::Float32(convert::deinterleave(&v, channels as usize))
            }
            (_, samples) => samples,
        };

        Ok(Self {
            samples,
            sample_rate,
            channels,
            pts: None,
            dts: None,
            time_base: None,
        })
    }

    /// Channel-major int16 samples.
    pub fn from_i16(samples: Vec<i16>, sample_rate: u32, channels: u16) -> Result<Self> {
        Self::new(Samples::Int16(samples), sample_rate, channels, SampleEncoding::Int16)
    }

    /// Channel-major float32 samples.
    pub fn from_f32(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Result<Self> {
        Self::new(
            Samples::Float32(samples),
            sample_rate,
            channels,
            SampleEncoding::Float32,
        )
    }

    /// `frames` frames of digital silence.
    pub fn silence(
        sample_rate: u32,
        channels: u16,
        encoding: SampleEncoding,
        frames: usize,
    ) -> Result<Self> {
        let len = frames * channels as usize;
        let samples = match encoding {
            SampleEncoding::Int16 => Samples::Int16(vec![0; len]),
            SampleEncoding::Float32 => Samples::Float32(vec![0.0; len]),
        };
        Self::new(samples, sample_rate, channels, encoding)
    }

    /// An empty buffer with the same format as `self` and no timestamps.
    pub fn empty_like(&self) -> Self {
        Self {
            samples: Samples::empty(self.encoding()),
            sample_rate: self.sample_rate,
            channels: self.channels,
            pts: None,
            dts: None,
            time_base: None,
        }
    }

    /// Parse little-endian wire bytes (interleaved for multi-channel).
    ///
    /// # Errors
    /// `InvalidByteLength` if `bytes` is not a whole number of sample frames.
    pub fn from_bytes(
        bytes: &[u8],
        sample_rate: u32,
        channels: u16,
        encoding: SampleEncoding,
    ) -> Result<Self> {
        if channels == 0 {
            return Err(VoxgateError::InvalidChannels(channels));
        }
        let width = encoding.bytes_per_sample();
        let frame_bytes = width * channels as usize;
        if bytes.len() % frame_bytes != 0 {
            return Err(VoxgateError::InvalidByteLength {
                len: bytes.len(),
                frame_bytes,
            });
        }

        let samples = match encoding {
            SampleEncoding::Int16 => Samples::Int16(read_le::<i16>(bytes, width)),
            SampleEncoding::Float32 => Samples::Float32(read_le::<f32>(bytes, width)),
        };
        Self::with_layout(samples, sample_rate, channels, encoding, SampleLayout::Interleaved)
    }

    /// Serialise as little-endian bytes, interleaving channels per frame.
    pub fn to_bytes(&self) -> Vec<u8> {
        let channels = self.channels as usize;
        match &self.samples {
            Samples::Int16(v) => write_le(&convert::interleave(v, channels)),
            Samples::Float32(v) => write_le(&convert::interleave(v, channels)),
        }
    }

    /// Attach presentation/decode timestamps expressed in `time_base` units.
    pub fn with_timestamps(mut self, pts: Option<i64>, dts: Option<i64>, time_base: Option<f64>) -> Self {
        self.pts = pts;
        self.dts = dts;
        self.time_base = time_base;
        self
    }

    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    pub fn into_samples(self) -> Samples {
        self.samples
    }

    pub fn as_i16(&self) -> Option<&[i16]> {
        match &self.samples {
            Samples::Int16(v) => Some(v),
            Samples::Float32(_) => None,
        }
    }

    pub fn as_f32(&self) -> Option<&[f32]> {
        match &self.samples {
            Samples::Float32(v) => Some(v),
            Samples::Int16(_) => None,
        }
    }

    pub fn encoding(&self) -> SampleEncoding {
        self.samples.encoding()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Samples per channel.
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Total samples across all channels.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.duration_secs())
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration_secs() * 1000.0
    }

    pub fn pts(&self) -> Option<i64> {
        self.pts
    }

    pub fn dts(&self) -> Option<i64> {
        self.dts
    }

    pub fn time_base(&self) -> Option<f64> {
        self.time_base
    }

    pub fn pts_seconds(&self) -> Option<f64> {
        Some(self.pts? as f64 * self.time_base?)
    }

    pub fn dts_seconds(&self) -> Option<f64> {
        Some(self.dts? as f64 * self.time_base?)
    }

    /// Root-mean-square level of all samples, normalised to [0.0, 1.0].
    pub fn rms(&self) -> f32 {
        match &self.samples {
            Samples::Int16(v) => convert::rms(v),
            Samples::Float32(v) => convert::rms(v),
        }
    }

    /// Re-encode to int16 (float input is clipped to [-1, 1] then scaled by
    /// 32767). Already-int16 buffers are borrowed, not copied.
    pub fn to_int16(&self) -> Cow<'_, PcmBuffer> {
        self.to_encoding(SampleEncoding::Int16)
    }

    /// Re-encode to float32 (int16 input is divided by 32768). Already-float
    /// buffers are borrowed, not copied.
    pub fn to_float32(&self) -> Cow<'_, PcmBuffer> {
        self.to_encoding(SampleEncoding::Float32)
    }

    pub fn to_encoding(&self, encoding: SampleEncoding) -> Cow<'_, PcmBuffer> {
        if self.encoding() == encoding {
            Cow::Borrowed(self)
        } else {
            Cow::Owned(self.reencoded(encoding))
        }
    }

    /// Owning variant of `to_int16`; never copies when already int16.
    pub fn into_int16(self) -> PcmBuffer {
        self.into_encoding(SampleEncoding::Int16)
    }

    /// Owning variant of `to_float32`; never copies when already float32.
    pub fn into_float32(self) -> PcmBuffer {
        self.into_encoding(SampleEncoding::Float32)
    }

    pub fn into_encoding(self, encoding: SampleEncoding) -> PcmBuffer {
        if self.encoding() == encoding {
            self
        } else {
            self.reencoded(encoding)
        }
    }

    fn reencoded(&self, encoding: SampleEncoding) -> PcmBuffer {
        let samples = match (&self.samples, encoding) {
            (Samples::Int16(v), SampleEncoding::Float32) => Samples::Float32(convert::reencode(v)),
            (Samples::Float32(v), SampleEncoding::Int16) => Samples::Int16(convert::reencode(v)),
            (same, _) => same.clone(),
        };
        self.with_samples(samples)
    }

    /// Convert to `target_rate` / `target_channels`, keeping the encoding.
    ///
    /// Returns an identical copy when nothing needs to change.
    pub fn resample(&self, target_rate: u32, target_channels: u16) -> Result<PcmBuffer> {
        resample::Resampler::new(target_rate, target_channels)?.convert(self)
    }

    /// Copy out frames `start..start + len` of every channel. The range is
    /// clamped to the buffer. Timestamps are not carried over.
    pub fn slice_frames(&self, start: usize, len: usize) -> PcmBuffer {
        let frames = self.frames();
        let start = start.min(frames);
        let end = start.saturating_add(len).min(frames);
        let samples = match &self.samples {
            Samples::Int16(v) => Samples::Int16(gather(v, self.channels as usize, frames, start, end)),
            Samples::Float32(v) => {
                Samples::Float32(gather(v, self.channels as usize, frames, start, end))
            }
        };
        let mut out = self.with_samples(samples);
        out.pts = None;
        out.dts = None;
        out
    }

    /// Append `other` to the end of this buffer.
    ///
    /// # Errors
    /// `IncompatibleBuffers` unless rate, channel count and encoding match.
    pub fn append(&mut self, other: &PcmBuffer) -> Result<()> {
        let (rate, channels, encoding) = (self.sample_rate, self.channels, self.encoding());
        let mismatch = move || {
            VoxgateError::IncompatibleBuffers(format!(
                "cannot append {} Hz/{}ch/{} to {} Hz/{}ch/{}",
                other.sample_rate,
                other.channels,
                other.encoding().as_str(),
                rate,
                channels,
                encoding.as_str()
            ))
        };
        if other.sample_rate != rate || other.channels != channels {
            return Err(mismatch());
        }

        let width = channels as usize;
        match (&mut self.samples, &other.samples) {
            (Samples::Int16(dst), Samples::Int16(src)) => append_planar(dst, src, width),
            (Samples::Float32(dst), Samples::Float32(src)) => append_planar(dst, src, width),
            _ => return Err(mismatch()),
        }
        Ok(())
    }

    /// Join `parts` end to end. The first part's timestamps are kept.
    ///
    /// # Errors
    /// `IncompatibleBuffers` if `parts` is empty or the formats differ.
    pub fn concat(parts: &[PcmBuffer]) -> Result<PcmBuffer> {
        let (first, rest) = parts.split_first().ok_or_else(|| {
            VoxgateError::IncompatibleBuffers("nothing to concatenate".into())
        })?;
        let mut out = first.clone();
        for part in rest {
            out.append(part)?;
        }
        Ok(out)
    }

    /// One channel as a mono buffer, or `None` if `index` is out of range.
    pub fn channel(&self, index: u16) -> Option<PcmBuffer> {
        if index >= self.channels {
            return None;
        }
        let frames = self.frames();
        let range = index as usize * frames..(index as usize + 1) * frames;
        let samples = match &self.samples {
            Samples::Int16(v) => Samples::Int16(v[range].to_vec()),
            Samples::Float32(v) => Samples::Float32(v[range].to_vec()),
        };
        let mut out = self.with_samples(samples);
        out.channels = 1;
        Some(out)
    }

    /// Drop all samples, keeping the format.
    pub fn clear(&mut self) {
        match &mut self.samples {
            Samples::Int16(v) => v.clear(),
            Samples::Float32(v) => v.clear(),
        }
        self.pts = None;
        self.dts = None;
    }

    /// Same metadata, different samples. Caller guarantees the shape.
    pub(crate) fn with_samples(&self, samples: Samples) -> PcmBuffer {
        PcmBuffer {
            samples,
            sample_rate: self.sample_rate,
            channels: self.channels,
            pts: self.pts,
            dts: self.dts,
            time_base: self.time_base,
        }
    }

    /// Assemble a buffer whose invariants the caller has already checked.
    pub(crate) fn from_parts(samples: Samples, sample_rate: u32, channels: u16) -> PcmBuffer {
        debug_assert!(sample_rate > 0 && channels > 0);
        debug_assert_eq!(samples.len() % channels as usize, 0);
        PcmBuffer {
            samples,
            sample_rate,
            channels,
            pts: None,
            dts: None,
            time_base: None,
        }
    }
}

fn read_le<S: Sample>(bytes: &[u8], width: usize) -> Vec<S> {
    bytes.chunks_exact(width).map(S::read_le).collect()
}

fn write_le<S: Sample>(data: &[S]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() * S::ENCODING.bytes_per_sample());
    for &s in data {
        s.write_le(&mut out);
    }
    out
}

fn gather<S: Sample>(data: &[S], channels: usize, frames: usize, start: usize, end: usize) -> Vec<S> {
    let mut out = Vec::with_capacity((end - start) * channels);
    for c in 0..channels {
        out.extend_from_slice(&data[c * frames + start..c * frames + end]);
    }
    out
}

/// Channel-major append: every channel of `src` lands after the matching
/// channel of `dst`.
fn append_planar<S: Sample>(dst: &mut Vec<S>, src: &[S], channels: usize) {
    if channels == 1 || src.is_empty() {
        dst.extend_from_slice(src);
        return;
    }
    let old_frames = dst.len() / channels;
    let add_frames = src.len() / channels;
    let mut merged = Vec::with_capacity(dst.len() + src.len());
    for c in 0..channels {
        merged.extend_from_slice(&dst[c * old_frames..(c + 1) * old_frames]);
        merged.extend_from_slice(&src[c * add_frames..(c + 1) * add_frames]);
    }
    *dst = merged;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn i16_from_bytes(bytes: &[u8]) -> Vec<i16> {
        bytes
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect()
    }

    #[test]
    fn construction_rejects_encoding_mismatch() {
        let err = PcmBuffer::new(
            Samples::Int16(vec![0; 4]),
            16_000,
            1,
            SampleEncoding::Float32,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            VoxgateError::DtypeMismatch {
                declared: SampleEncoding::Float32,
                actual: SampleEncoding::Int16
            }
        ));
    }

    #[test]
    fn construction_rejects_zero_rate_zero_channels_and_ragged_channels() {
        assert!(matches!(
            PcmBuffer::from_i16(vec![0; 4], 0, 1),
            Err(VoxgateError::InvalidSampleRate(0))
        ));
        assert!(matches!(
            PcmBuffer::from_i16(vec![0; 4], 16_000, 0),
            Err(VoxgateError::InvalidChannels(0))
        ));
        assert!(matches!(
            PcmBuffer::from_i16(vec![0; 5], 16_000, 2),
            Err(VoxgateError::UnevenChannels { len: 5, channels: 2 })
        ));
    }

    #[test]
    fn to_bytes_interleaves_from_channel_major() {
        let pcm = PcmBuffer::from_i16(vec![1, 2, 3, 4, -1, -2, -3, -4], 16_000, 2).unwrap();
        assert_eq!(
            i16_from_bytes(&pcm.to_bytes()),
            vec![1, -1, 2, -2, 3, -3, 4, -4]
        );
    }

    #[test]
    fn interleaved_input_is_normalised_before_duration_and_bytes() {
        let pcm = PcmBuffer::with_layout(
            Samples::Int16(vec![1, -1, 2, -2, 3, -3, 4, -4]),
            16_000,
            2,
            SampleEncoding::Int16,
            SampleLayout::Interleaved,
        )
        .unwrap();
        assert_eq!(pcm.as_i16().unwrap(), &[1, 2, 3, 4, -1, -2, -3, -4]);
        assert_eq!(pcm.frames(), 4);
        assert_eq!(
            i16_from_bytes(&pcm.to_bytes()),
            vec![1, -1, 2, -2, 3, -3, 4, -4]
        );
    }

    #[test]
    fn duration_counts_frames_not_samples() {
        let stereo = PcmBuffer::silence(16_000, 2, SampleEncoding::Int16, 16_000).unwrap();
        assert!((stereo.duration_secs() - 1.0).abs() < 1e-9);
        assert_eq!(stereo.duration(), Duration::from_secs(1));
    }

    #[test]
    fn bytes_round_trip_for_both_encodings() {
        let i16_pcm = PcmBuffer::from_i16(vec![i16::MIN, -1, 0, 1, i16::MAX, 7], 48_000, 2).unwrap();
        let back = PcmBuffer::from_bytes(&i16_pcm.to_bytes(), 48_000, 2, SampleEncoding::Int16).unwrap();
        assert_eq!(back, i16_pcm);

        let f32_pcm = PcmBuffer::from_f32(vec![-1.0, -0.25, 0.0, 0.125, 0.5, 1.0], 24_000, 1).unwrap();
        let back =
            PcmBuffer::from_bytes(&f32_pcm.to_bytes(), 24_000, 1, SampleEncoding::Float32).unwrap();
        assert_eq!(back, f32_pcm);
    }

    #[test]
    fn from_bytes_rejects_partial_frames() {
        let err = PcmBuffer::from_bytes(&[0u8; 6], 16_000, 2, SampleEncoding::Int16).unwrap_err();
        assert!(matches!(
            err,
            VoxgateError::InvalidByteLength { len: 6, frame_bytes: 4 }
        ));
    }

    #[test]
    fn to_float32_preserves_metadata_and_borrows_when_already_float() {
        let pcm = PcmBuffer::from_i16(vec![-32768, -16384, 0, 16384, 32767], 16_000, 1)
            .unwrap()
            .with_timestamps(Some(10), None, Some(1.0 / 16_000.0));
        let f32_pcm = pcm.to_float32();
        assert_eq!(f32_pcm.encoding(), SampleEncoding::Float32);
        assert_eq!(f32_pcm.sample_rate(), 16_000);
        assert_eq!(f32_pcm.channels(), 1);
        assert_eq!(f32_pcm.pts(), Some(10));
        assert_eq!(f32_pcm.as_f32().unwrap()[1], -0.5);

        let again = f32_pcm.to_float32();
        assert!(matches!(again, Cow::Borrowed(_)));
    }

    #[test]
    fn to_int16_clips_out_of_range_floats() {
        let pcm = PcmBuffer::from_f32(vec![2.0, -3.0, 0.5], 16_000, 1).unwrap();
        let i16_pcm = pcm.into_int16();
        assert_eq!(i16_pcm.as_i16().unwrap(), &[32767, -32767, 16384]);
    }

    #[test]
    fn append_keeps_channel_major_layout() {
        let mut acc = PcmBuffer::from_i16(vec![1, 2, -1, -2], 8_000, 2).unwrap();
        let next = PcmBuffer::from_i16(vec![3, -3], 8_000, 2).unwrap();
        acc.append(&next).unwrap();
        assert_eq!(acc.as_i16().unwrap(), &[1, 2, 3, -1, -2, -3]);
        assert_eq!(acc.frames(), 3);

        acc.clear();
        assert!(acc.is_empty());
        assert_eq!(acc.sample_rate(), 8_000);
    }

    #[test]
    fn append_rejects_format_mismatch() {
        let mut acc = PcmBuffer::from_i16(vec![0; 4], 8_000, 1).unwrap();
        let other = PcmBuffer::from_i16(vec![0; 4], 16_000, 1).unwrap();
        assert!(matches!(
            acc.append(&other),
            Err(VoxgateError::IncompatibleBuffers(_))
        ));
        let float = PcmBuffer::from_f32(vec![0.0; 4], 8_000, 1).unwrap();
        assert!(matches!(
            acc.append(&float),
            Err(VoxgateError::IncompatibleBuffers(_))
        ));
        assert_eq!(acc.frames(), 4);
    }

    #[test]
    fn slice_frames_clamps_and_copies_every_channel() {
        let pcm = PcmBuffer::from_i16(vec![0, 1, 2, 3, 10, 11, 12, 13], 8_000, 2).unwrap();
        let mid = pcm.slice_frames(1, 2);
        assert_eq!(mid.as_i16().unwrap(), &[1, 2, 11, 12]);
        let tail = pcm.slice_frames(3, 10);
        assert_eq!(tail.as_i16().unwrap(), &[3, 13]);
        assert!(pcm.slice_frames(9, 1).is_empty());
    }

    #[test]
    fn concat_joins_in_order_and_channel_splits() {
        let a = PcmBuffer::from_i16(vec![1, 2, -1, -2], 8_000, 2).unwrap();
        let b = PcmBuffer::from_i16(vec![3, -3], 8_000, 2).unwrap();
        let joined = PcmBuffer::concat(&[a, b]).unwrap();
        assert_eq!(joined.frames(), 3);
        assert_eq!(joined.channel(1).unwrap().as_i16().unwrap(), &[-1, -2, -3]);
        assert!(joined.channel(2).is_none());
        assert!(PcmBuffer::concat(&[]).is_err());
    }

    #[test]
    fn timestamps_convert_to_seconds() {
        let pcm = PcmBuffer::from_i16(vec![0; 160], 16_000, 1)
            .unwrap()
            .with_timestamps(Some(480), Some(320), Some(1.0 / 16_000.0));
        assert!((pcm.pts_seconds().unwrap() - 0.03).abs() < 1e-9);
        assert!((pcm.dts_seconds().unwrap() - 0.02).abs() < 1e-9);
        let bare = PcmBuffer::from_i16(vec![0; 160], 16_000, 1).unwrap();
        assert_eq!(bare.pts_seconds(), None);
    }
}
