//! WAV file I/O via `hound`.
//!
//! 16-bit integer files load as int16 buffers and float files as float32.
//! Other integer depths are scaled into float32.

use std::path::Path;

use super::{PcmBuffer, SampleEncoding, SampleLayout, Samples};
use crate::error::Result;

impl PcmBuffer {
    /// Load a WAV file, keeping its rate and channel count.
    pub fn read_wav(path: &Path) -> Result<PcmBuffer> {
        let mut reader = hound::WavReader::open(path)?;
        let spec = reader.spec();

        let samples = match spec.sample_format {
            hound::SampleFormat::Float => {
                Samples::Float32(reader.samples::<f32>().collect::<std::result::Result<_, _>>()?)
            }
            hound::SampleFormat::Int if spec.bits_per_sample <= 16 => {
                Samples::Int16(reader.samples::<i16>().collect::<std::result::Result<_, _>>()?)
            }
            hound::SampleFormat::Int => {
                let scale = (1_i64 << (spec.bits_per_sample - 1)) as f32;
                Samples::Float32(
                    reader
                        .samples::<i32>()
                        .map(|s| s.map(|v| v as f32 / scale))
                        .collect::<std::result::Result<_, _>>()?,
                )
            }
        };
        let encoding = samples.encoding();
        PcmBuffer::with_layout(
            samples,
            spec.sample_rate,
            spec.channels,
            encoding,
            SampleLayout::Interleaved,
        )
    }

    /// Write as a WAV file in the buffer's own encoding.
    pub fn write_wav(&self, path: &Path) -> Result<()> {
        let (bits_per_sample, sample_format) = match self.encoding() {
            SampleEncoding::Int16 => (16, hound::SampleFormat::Int),
            SampleEncoding::Float32 => (32, hound::SampleFormat::Float),
        };
        let spec = hound::WavSpec {
            channels: self.channels(),
            sample_rate: self.sample_rate(),
            bits_per_sample,
            sample_format,
        };
        let mut writer = hound::WavWriter::create(path, spec)?;
        let channels = self.channels() as usize;
        match self.samples() {
            Samples::Int16(v) => {
                for s in super::convert::interleave(v, channels) {
                    writer.write_sample(s)?;
                }
            }
            Samples::Float32(v) => {
                for s in super::convert::interleave(v, channels) {
                    writer.write_sample(s)?;
                }
            }
        }
        writer.finalize()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("voxgate-{}-{name}", std::process::id()))
    }

    #[test]
    fn stereo_int16_survives_a_file_round_trip() {
        let path = temp_path("stereo.wav");
        let pcm = PcmBuffer::from_i16(vec![1, 2, 3, -1, -2, -3], 16_000, 2).unwrap();
        pcm.write_wav(&path).unwrap();

        let back = PcmBuffer::read_wav(&path).unwrap();
        assert_eq!(back, pcm);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn float_files_load_as_float32() {
        let path = temp_path("float.wav");
        let pcm = PcmBuffer::from_f32(vec![0.25, -0.5, 1.0], 48_000, 1).unwrap();
        pcm.write_wav(&path).unwrap();

        let back = PcmBuffer::read_wav(&path).unwrap();
        assert_eq!(back.encoding(), SampleEncoding::Float32);
        assert_eq!(back.as_f32().unwrap(), &[0.25, -0.5, 1.0]);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(PcmBuffer::read_wav(&temp_path("does-not-exist.wav")).is_err());
    }
}
