//! Stateless rate / channel / encoding conversion for `PcmBuffer`s.
//!
//! ## Design
//!
//! Every call is independent: no history is kept between buffers, so one
//! `Resampler` can be shared by any number of tracks.
//!
//! - Buffers shorter than 100 ms are converted with linear interpolation
//!   directly on the stored sample type (int16 stays int16 throughout).
//! - Longer buffers go through a rubato `FastFixedIn` session created for the
//!   call. Its output delay is trimmed and the result is cut (or zero-padded)
//!   to `round(frames * target / source)` so duration is preserved to within
//!   one sample period.
//!
//! Channel mixing happens before rate conversion when the channel count
//! shrinks and after it when the count grows, so the expensive step always
//! sees the fewest channels. The output encoding equals the input encoding
//! unless `with_encoding` asks for an explicit re-encode.

use rubato::{FastFixedIn, PolynomialDegree, Resampler as _};
use tracing::trace;

use super::convert::{self, Sample};
use super::{PcmBuffer, SampleEncoding, Samples};
use crate::error::{Result, VoxgateError};

/// Buffers at least this long are handed to rubato.
pub const LONG_BUFFER_MS: u64 = 100;

/// Input frames per rubato call.
const RUBATO_CHUNK: usize = 1024;

/// Upper bound on zero-fed flush calls while draining rubato's delay line.
const MAX_FLUSH_CALLS: usize = 8;

/// Target format for `PcmBuffer` conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resampler {
    target_rate: u32,
    target_channels: u16,
    target_encoding: Option<SampleEncoding>,
}

impl Resampler {
    /// # Errors
    /// `InvalidSampleRate` / `InvalidChannels` for zero targets.
    pub fn new(target_rate: u32, target_channels: u16) -> Result<Self> {
        if target_rate == 0 {
            return Err(VoxgateError::InvalidSampleRate(target_rate));
        }
        if target_channels == 0 {
            return Err(VoxgateError::InvalidChannels(target_channels));
        }
        Ok(Self {
            target_rate,
            target_channels,
            target_encoding: None,
        })
    }

    /// Also re-encode the output to `encoding`.
    pub fn with_encoding(mut self, encoding: SampleEncoding) -> Self {
        self.target_encoding = Some(encoding);
        self
    }

    pub fn target_rate(&self) -> u32 {
        self.target_rate
    }

    pub fn target_channels(&self) -> u16 {
        self.target_channels
    }

    /// Returns `true` when `pcm` already has the target format.
    pub fn is_passthrough(&self, pcm: &PcmBuffer) -> bool {
        pcm.sample_rate() == self.target_rate
            && pcm.channels() == self.target_channels
            && self.target_encoding.map_or(true, |e| e == pcm.encoding())
    }

    /// Convert `pcm` to the target format, returning a new buffer.
    pub fn convert(&self, pcm: &PcmBuffer) -> Result<PcmBuffer> {
        let out = if pcm.sample_rate() == self.target_rate && pcm.channels() == self.target_channels
        {
            pcm.clone()
        } else {
            let samples = match pcm.samples() {
                Samples::Int16(v) => Samples::Int16(self.convert_planar(v, pcm)?),
                Samples::Float32(v) => Samples::Float32(self.convert_planar(v, pcm)?),
            };
            trace!(
                from_rate = pcm.sample_rate(),
                to_rate = self.target_rate,
                from_channels = pcm.channels(),
                to_channels = self.target_channels,
                "converted pcm buffer"
            );
            let time_base = pcm.time_base().map(|_| 1.0 / self.target_rate as f64);
            let pts = rescale_timestamp(pcm.pts(), pcm.sample_rate(), self.target_rate, pcm.time_base());
            let dts = rescale_timestamp(pcm.dts(), pcm.sample_rate(), self.target_rate, pcm.time_base());
            PcmBuffer::from_parts(samples, self.target_rate, self.target_channels)
                .with_timestamps(pts, dts, time_base)
        };

        Ok(match self.target_encoding {
            Some(encoding) => out.into_encoding(encoding),
            None => out,
        })
    }

    fn convert_planar<S: Sample>(&self, data: &[S], pcm: &PcmBuffer) -> Result<Vec<S>> {
        let from_ch = pcm.channels() as usize;
        let to_ch = self.target_channels as usize;
        let src = pcm.sample_rate();
        let dst = self.target_rate;

        if to_ch < from_ch {
            let mixed = convert::remix(data, from_ch, to_ch);
            resample_rate(&mixed, to_ch, src, dst)
        } else {
            let rated = resample_rate(data, from_ch, src, dst)?;
            Ok(convert::remix(&rated, from_ch, to_ch))
        }
    }
}

/// Frames produced when converting `frames` from `src` Hz to `dst` Hz.
pub fn output_frames(frames: usize, src: u32, dst: u32) -> usize {
    ((frames as u64 * dst as u64 + src as u64 / 2) / src as u64) as usize
}

/// Timestamps expressed in sample units follow the new rate; timestamps
/// in any other time base are left untouched.
fn rescale_timestamp(ts: Option<i64>, src: u32, dst: u32, time_base: Option<f64>) -> Option<i64> {
    let ts = ts?;
    match time_base {
        Some(tb) if (tb * src as f64 - 1.0).abs() < 1e-9 => {
            Some((ts as i128 * dst as i128 / src as i128) as i64)
        }
        _ => Some(ts),
    }
}

fn resample_rate<S: Sample>(data: &[S], channels: usize, src: u32, dst: u32) -> Result<Vec<S>> {
    if src == dst || data.is_empty() {
        return Ok(data.to_vec());
    }
    let frames = data.len() / channels;
    let out_frames = output_frames(frames, src, dst);
    if (frames as u64) * 1000 >= LONG_BUFFER_MS * src as u64 {
        resample_rubato(data, channels, frames, out_frames, src, dst)
    } else {
        Ok(resample_linear(data, channels, frames, out_frames, src, dst))
    }
}

fn resample_linear<S: Sample>(
    data: &[S],
    channels: usize,
    frames: usize,
    out_frames: usize,
    src: u32,
    dst: u32,
) -> Vec<S> {
    let step = src as f64 / dst as f64;
    let mut out = Vec::with_capacity(out_frames * channels);
    for c in 0..channels {
        let input = &data[c * frames..(c + 1) * frames];
        let last = frames - 1;
        for i in 0..out_frames {
            let pos = i as f64 * step;
            let idx = (pos.floor() as usize).min(last);
            let t = pos - idx as f64;
            let a = input[idx];
            let b = input[(idx + 1).min(last)];
            out.push(S::lerp(a, b, t.clamp(0.0, 1.0)));
        }
    }
    out
}

fn resample_rubato<S: Sample>(
    data: &[S],
    channels: usize,
    frames: usize,
    out_frames: usize,
    src: u32,
    dst: u32,
) -> Result<Vec<S>> {
    let ratio = dst as f64 / src as f64;
    let mut resampler = FastFixedIn::<f32>::new(
        ratio,
        1.0, // fixed ratio
        PolynomialDegree::Cubic,
        RUBATO_CHUNK,
        channels,
    )
    .map_err(|e| VoxgateError::Resampler(format!("init: {e}")))?;

    let planar: Vec<Vec<f32>> = (0..channels)
        .map(|c| data[c * frames..(c + 1) * frames].iter().map(|s| s.to_f32()).collect())
        .collect();

    let delay = resampler.output_delay();
    let wanted = delay + out_frames;
    let mut produced: Vec<Vec<f32>> = vec![Vec::with_capacity(wanted); channels];

    let mut pos = 0;
    while frames - pos >= RUBATO_CHUNK {
        let block: Vec<&[f32]> = planar.iter().map(|c| &c[pos..pos + RUBATO_CHUNK]).collect();
        let out = resampler
            .process(&block, None)
            .map_err(|e| VoxgateError::Resampler(e.to_string()))?;
        extend_planar(&mut produced, out);
        pos += RUBATO_CHUNK;
    }

    if pos < frames {
        let block: Vec<&[f32]> = planar.iter().map(|c| &c[pos..]).collect();
        let out = resampler
            .process_partial(Some(block.as_slice()), None)
            .map_err(|e| VoxgateError::Resampler(e.to_string()))?;
        extend_planar(&mut produced, out);
    }

    let mut flushes = 0;
    while produced[0].len() < wanted && flushes < MAX_FLUSH_CALLS {
        let out = resampler
            .process_partial(None::<&[&[f32]]>, None)
            .map_err(|e| VoxgateError::Resampler(e.to_string()))?;
        extend_planar(&mut produced, out);
        flushes += 1;
    }

    let mut result = Vec::with_capacity(out_frames * channels);
    for channel in produced {
        let start = delay.min(channel.len());
        let end = wanted.min(channel.len());
        let before = result.len();
        result.extend(channel[start..end].iter().map(|&v| S::from_f32(v)));
        result.resize(before + out_frames, S::default());
    }
    Ok(result)
}

fn extend_planar(dst: &mut [Vec<f32>], src: Vec<Vec<f32>>) {
    for (d, s) in dst.iter_mut().zip(src) {
        d.extend_from_slice(&s);
    }
}
