//! G.711 μ-law / A-law companding.
//!
//! Telephony payloads are 8 kHz mono, one byte per sample. `g711_encode`
//! converts any buffer to that format first; `g711_decode` always yields an
//! 8 kHz mono int16 buffer. Payloads may travel base64-wrapped (media-stream
//! websockets do this), see `encode_base64` / `decode_base64`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use super::{PcmBuffer, SampleEncoding, Samples};
use crate::error::Result;

/// Sample rate of every G.711 payload.
pub const G711_SAMPLE_RATE: u32 = 8_000;

const ULAW_BIAS: i32 = 0x84;
const ULAW_CLIP: i32 = 32_635;

/// Segment end points for A-law (13-bit magnitude domain).
const ALAW_SEG_END: [i32; 8] = [0x1F, 0x3F, 0x7F, 0xFF, 0x1FF, 0x3FF, 0x7FF, 0xFFF];

/// Companding law.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum G711Mapping {
    /// North American / Japanese variant (PCMU).
    MuLaw,
    /// European variant (PCMA).
    ALaw,
}

impl G711Mapping {
    pub fn encode_sample(self, sample: i16) -> u8 {
        match self {
            G711Mapping::MuLaw => linear_to_ulaw(sample),
            G711Mapping::ALaw => linear_to_alaw(sample),
        }
    }

    pub fn decode_sample(self, byte: u8) -> i16 {
        match self {
            G711Mapping::MuLaw => ulaw_to_linear(byte),
            G711Mapping::ALaw => alaw_to_linear(byte),
        }
    }
}

impl PcmBuffer {
    /// Compand this buffer to G.711 bytes, converting to 8 kHz mono int16
    /// first when needed.
    pub fn g711_encode(&self, mapping: G711Mapping) -> Result<Vec<u8>> {
        let narrow = if self.sample_rate() != G711_SAMPLE_RATE || self.channels() != 1 {
            self.resample(G711_SAMPLE_RATE, 1)?
        } else {
            self.clone()
        };
        let narrow = narrow.into_encoding(SampleEncoding::Int16);
        let samples = narrow.as_i16().unwrap_or_default();
        Ok(samples.iter().map(|&s| mapping.encode_sample(s)).collect())
    }

    /// Expand G.711 bytes into an 8 kHz mono int16 buffer.
    pub fn g711_decode(bytes: &[u8], mapping: G711Mapping) -> PcmBuffer {
        let samples = bytes.iter().map(|&b| mapping.decode_sample(b)).collect();
        PcmBuffer::from_parts(Samples::Int16(samples), G711_SAMPLE_RATE, 1)
    }
}

/// Base64-wrap a G.711 payload for text transports.
pub fn encode_base64(payload: &[u8]) -> String {
    STANDARD.encode(payload)
}

/// Unwrap a base64 G.711 payload.
pub fn decode_base64(text: &str) -> Result<Vec<u8>> {
    Ok(STANDARD.decode(text.trim())?)
}

fn linear_to_ulaw(sample: i16) -> u8 {
    let mut pcm = sample as i32;
    let sign = if pcm < 0 {
        pcm = -pcm;
        0x80
    } else {
        0x00
    };
    pcm = pcm.min(ULAW_CLIP) + ULAW_BIAS;

    let mut exponent = 7;
    let mut mask = 0x4000;
    while pcm & mask == 0 && exponent > 0 {
        exponent -= 1;
        mask >>= 1;
    }
    let mantissa = (pcm >> (exponent + 3)) & 0x0F;
    !((sign | (exponent << 4) | mantissa) as u8)
}

fn ulaw_to_linear(byte: u8) -> i16 {
    let u = !byte as i32;
    let exponent = (u >> 4) & 0x07;
    let mantissa = u & 0x0F;
    let magnitude = (((mantissa << 3) + ULAW_BIAS) << exponent) - ULAW_BIAS;
    if u & 0x80 != 0 {
        -magnitude as i16
    } else {
        magnitude as i16
    }
}

fn linear_to_alaw(sample: i16) -> u8 {
    let mut pcm = (sample as i32) >> 3;
    let mask = if pcm >= 0 {
        0xD5
    } else {
        pcm = -pcm - 1;
        0x55
    };

    let seg = ALAW_SEG_END.iter().position(|&end| pcm <= end).unwrap_or(8) as i32;
    if seg >= 8 {
        return (0x7F ^ mask) as u8;
    }
    let mut aval = seg << 4;
    aval |= if seg < 2 {
        (pcm >> 1) & 0x0F
    } else {
        (pcm >> seg) & 0x0F
    };
    (aval ^ mask) as u8
}

fn alaw_to_linear(byte: u8) -> i16 {
    let a = (byte ^ 0x55) as i32;
    let mut t = (a & 0x0F) << 4;
    let seg = (a & 0x70) >> 4;
    match seg {
        0 => t += 8,
        1 => t += 0x108,
        _ => {
            t += 0x108;
            t <<= seg - 1;
        }
    }
    if a & 0x80 != 0 {
        t as i16
    } else {
        -t as i16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_round_trips_near_zero() {
        let silent = PcmBuffer::from_i16(vec![0; 160], 8_000, 1).unwrap();
        for mapping in [G711Mapping::MuLaw, G711Mapping::ALaw] {
            let bytes = silent.g711_encode(mapping).unwrap();
            assert_eq!(bytes.len(), 160);
            let decoded = PcmBuffer::g711_decode(&bytes, mapping);
            assert!(decoded.as_i16().unwrap().iter().all(|s| s.abs() <= 100));
        }
    }

    #[test]
    fn known_code_points() {
        assert_eq!(linear_to_ulaw(0), 0xFF);
        assert_eq!(ulaw_to_linear(0xFF), 0);
        assert_eq!(linear_to_alaw(0), 0xD5);
        assert_eq!(alaw_to_linear(0xD5), 8);
    }

    #[test]
    fn extremes_stay_in_range_and_keep_sign() {
        for mapping in [G711Mapping::MuLaw, G711Mapping::ALaw] {
            let hi = mapping.decode_sample(mapping.encode_sample(i16::MAX));
            let lo = mapping.decode_sample(mapping.encode_sample(i16::MIN));
            assert!(hi > 30_000, "{mapping:?} hi={hi}");
            assert!(lo < -30_000, "{mapping:?} lo={lo}");
        }
    }

    #[test]
    fn companding_error_is_relative() {
        for mapping in [G711Mapping::MuLaw, G711Mapping::ALaw] {
            for &s in &[-20_000i16, -1_000, -50, 50, 1_000, 20_000] {
                let back = mapping.decode_sample(mapping.encode_sample(s));
                let err = (back as i32 - s as i32).abs();
                assert!(err <= (s as i32).abs() / 16 + 16, "{mapping:?} {s} -> {back}");
                assert_eq!(back.signum(), s.signum());
            }
        }
    }

    #[test]
    fn encode_downsamples_wideband_stereo_first() {
        let pcm = PcmBuffer::from_f32(vec![0.0; 2 * 480], 48_000, 2).unwrap();
        let bytes = pcm.g711_encode(G711Mapping::MuLaw).unwrap();
        assert_eq!(bytes.len(), 80); // 10 ms at 8 kHz
    }

    #[test]
    fn decode_yields_8k_mono_int16() {
        let pcm = PcmBuffer::g711_decode(&[0xFF; 80], G711Mapping::MuLaw);
        assert_eq!(pcm.sample_rate(), 8_000);
        assert_eq!(pcm.channels(), 1);
        assert_eq!(pcm.encoding(), SampleEncoding::Int16);
        assert_eq!(pcm.frames(), 80);
    }

    #[test]
    fn base64_wrapping_round_trips() {
        let payload = vec![0xFFu8, 0x7F, 0x00, 0xD5];
        let text = encode_base64(&payload);
        assert_eq!(decode_base64(&text).unwrap(), payload);
        assert!(decode_base64("not base64!").is_err());
    }
}
