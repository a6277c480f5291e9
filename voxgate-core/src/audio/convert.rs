//! Sample-level conversion primitives shared by `PcmBuffer`, the resampler
//! and the G.711 codec.
//!
//! Everything here operates on channel-major slices: for `C` channels of `F`
//! frames, channel `c` occupies `data[c * F..(c + 1) * F]`.

use super::SampleEncoding;

/// A storable PCM sample type.
pub(crate) trait Sample: Copy + Default + PartialEq + std::fmt::Debug + Send + Sync + 'static {
    const ENCODING: SampleEncoding;

    /// Normalised value in [-1.0, 1.0].
    fn to_f32(self) -> f32;

    /// Inverse of `to_f32`. Out-of-range input is clipped, never wrapped.
    fn from_f32(v: f32) -> Self;

    /// Linear interpolation between two raw sample values.
    fn lerp(a: Self, b: Self, t: f64) -> Self;

    /// Arithmetic mean of `values` (used for downmixing).
    fn mean(values: &[Self]) -> Self;

    fn write_le(self, out: &mut Vec<u8>);

    fn read_le(bytes: &[u8]) -> Self;
}

impl Sample for i16 {
    const ENCODING: SampleEncoding = SampleEncoding::Int16;

    fn to_f32(self) -> f32 {
        self as f32 / 32768.0
    }

    fn from_f32(v: f32) -> Self {
        // NaN clamps to NaN; treat it as silence.
        if v.is_nan() {
            return 0;
        }
        (v.clamp(-1.0, 1.0) * 32767.0).round() as i16
    }

    fn lerp(a: Self, b: Self, t: f64) -> Self {
        let v = a as f64 + (b as f64 - a as f64) * t;
        v.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16
    }

    fn mean(values: &[Self]) -> Self {
        if values.is_empty() {
            return 0;
        }
        let sum: i64 = values.iter().map(|&v| v as i64).sum();
        (sum as f64 / values.len() as f64).round() as i16
    }

    fn write_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }

    fn read_le(bytes: &[u8]) -> Self {
        i16::from_le_bytes([bytes[0], bytes[1]])
    }
}

impl Sample for f32 {
    const ENCODING: SampleEncoding = SampleEncoding::Float32;

    fn to_f32(self) -> f32 {
        self
    }

    fn from_f32(v: f32) -> Self {
        v
    }

    fn lerp(a: Self, b: Self, t: f64) -> Self {
        (a as f64 + (b as f64 - a as f64) * t) as f32
    }

    fn mean(values: &[Self]) -> Self {
        if values.is_empty() {
            return 0.0;
        }
        values.iter().sum::<f32>() / values.len() as f32
    }

    fn write_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }

    fn read_le(bytes: &[u8]) -> Self {
        f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
}

/// Re-encode every sample through the normalised f32 domain.
pub(crate) fn reencode<S: Sample, T: Sample>(data: &[S]) -> Vec<T> {
    data.iter().map(|&s| T::from_f32(s.to_f32())).collect()
}

/// `L0,R0,L1,R1,...` -> `L0,L1,...,R0,R1,...`
pub(crate) fn deinterleave<S: Sample>(data: &[S], channels: usize) -> Vec<S> {
    if channels <= 1 {
        return data.to_vec();
    }
    let frames = data.len() / channels;
    let mut out = vec![S::default(); frames * channels];
    for f in 0..frames {
        for c in 0..channels {
            out[c * frames + f] = data[f * channels + c];
        }
    }
    out
}

/// `L0,L1,...,R0,R1,...` -> `L0,R0,L1,R1,...`
pub(crate) fn interleave<S: Sample>(data: &[S], channels: usize) -> Vec<S> {
    if channels <= 1 {
        return data.to_vec();
    }
    let frames = data.len() / channels;
    let mut out = Vec::with_capacity(frames * channels);
    for f in 0..frames {
        for c in 0..channels {
            out.push(data[c * frames + f]);
        }
    }
    out
}

/// Change the channel count of channel-major data.
///
/// Mono sources are duplicated into every output channel, mono targets get
/// the average of all input channels. Any other combination maps output
/// channel `c` to input channel `c % from`.
pub(crate) fn remix<S: Sample>(data: &[S], from: usize, to: usize) -> Vec<S> {
    if from == to {
        return data.to_vec();
    }
    let frames = if from == 0 { 0 } else { data.len() / from };
    let channel = |c: usize| &data[c * frames..(c + 1) * frames];

    if to == 1 {
        let mut scratch = vec![S::default(); from];
        return (0..frames)
            .map(|f| {
                for (c, slot) in scratch.iter_mut().enumerate() {
                    *slot = data[c * frames + f];
                }
                S::mean(&scratch)
            })
            .collect();
    }

    let mut out = Vec::with_capacity(frames * to);
    for c in 0..to {
        out.extend_from_slice(channel(if from == 1 { 0 } else { c % from }));
    }
    out
}

/// Root-mean-square of normalised samples.
pub(crate) fn rms<S: Sample>(data: &[S]) -> f32 {
    if data.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = data
        .iter()
        .map(|&s| {
            let v = s.to_f32() as f64;
            v * v
        })
        .sum();
    (sum_sq / data.len() as f64).sqrt() as f32
}
