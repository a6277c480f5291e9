//! Stream, track and process settings.
//!
//! All structs deserialize from camelCase JSON with every field optional;
//! missing fields take their `Default` value. Engines and tracks call
//! `validate()` at construction; nothing is re-checked per frame.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::audio::SampleEncoding;
use crate::buffering::DEFAULT_INBOUND_CAPACITY;
use crate::error::{Result, VoxgateError};

/// Per-stream segmentation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct VadConfig {
    /// Rate every inbound chunk must already be at (Hz).
    pub sample_rate: u32,
    /// Channel count every inbound chunk must already have.
    pub channels: u16,
    /// Samples per channel handed to the classifier in one call.
    pub frame_size: usize,
    /// Probability at or above which an idle stream becomes active.
    pub activation_threshold: f32,
    /// Probability at or above which an active frame counts as speech.
    pub deactivation_threshold: f32,
    /// Trailing silence that ends an utterance.
    pub speech_pad_ms: u32,
    /// Segments shorter than this are discarded.
    pub min_speech_ms: u32,
    /// Active runs are force-flushed at this length.
    pub max_speech_ms: u32,
    /// Emit a partial snapshot every N active frames; 0 disables partials.
    pub partial_frames: usize,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            channels: 1,
            frame_size: 512,
            activation_threshold: 0.5,
            deactivation_threshold: 0.35,
            speech_pad_ms: 300,
            min_speech_ms: 250,
            max_speech_ms: 30_000,
            partial_frames: 10,
        }
    }
}

impl VadConfig {
    /// Whole frames covered by `ms` milliseconds (truncating).
    pub fn ms_to_frames(&self, ms: u32) -> usize {
        if self.frame_size == 0 {
            return 0;
        }
        (ms as u64 * self.sample_rate as u64 / 1000 / self.frame_size as u64) as usize
    }

    pub fn speech_pad_frames(&self) -> usize {
        self.ms_to_frames(self.speech_pad_ms)
    }

    pub fn min_speech_frames(&self) -> usize {
        self.ms_to_frames(self.min_speech_ms)
    }

    pub fn max_speech_frames(&self) -> usize {
        self.ms_to_frames(self.max_speech_ms)
    }

    /// Duration of one classifier frame in milliseconds.
    pub fn frame_duration_ms(&self) -> f64 {
        self.frame_size as f64 * 1000.0 / self.sample_rate as f64
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(VoxgateError::InvalidSampleRate(self.sample_rate));
        }
        if self.channels == 0 {
            return Err(VoxgateError::InvalidChannels(self.channels));
        }
        if self.frame_size == 0 {
            return Err(VoxgateError::InvalidConfig("frameSize must be positive".into()));
        }
        for (name, value) in [
            ("activationThreshold", self.activation_threshold),
            ("deactivationThreshold", self.deactivation_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(VoxgateError::InvalidConfig(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if self.deactivation_threshold > self.activation_threshold {
            return Err(VoxgateError::InvalidConfig(format!(
                "deactivationThreshold {} exceeds activationThreshold {}",
                self.deactivation_threshold, self.activation_threshold
            )));
        }
        if self.max_speech_frames() == 0 {
            return Err(VoxgateError::InvalidConfig(format!(
                "maxSpeechMs {} is shorter than one {}-sample frame",
                self.max_speech_ms, self.frame_size
            )));
        }
        Ok(())
    }
}

/// Outbound track settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct PlaybackConfig {
    /// Native rate of the track (Hz).
    pub sample_rate: u32,
    pub channels: u16,
    pub encoding: SampleEncoding,
    /// Length of one drained tick.
    pub frame_duration_ms: u32,
    /// Queue bound, in ticks.
    pub max_queue_depth: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            sample_rate: 8_000,
            channels: 1,
            encoding: SampleEncoding::Int16,
            frame_duration_ms: 20,
            max_queue_depth: 500,
        }
    }
}

impl PlaybackConfig {
    /// Frames (samples per channel) in one tick.
    pub fn tick_frames(&self) -> usize {
        (self.sample_rate as u64 * self.frame_duration_ms as u64 / 1000) as usize
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(VoxgateError::InvalidSampleRate(self.sample_rate));
        }
        if self.channels == 0 {
            return Err(VoxgateError::InvalidChannels(self.channels));
        }
        if self.tick_frames() == 0 {
            return Err(VoxgateError::InvalidConfig(format!(
                "frameDurationMs {} yields an empty tick at {} Hz",
                self.frame_duration_ms, self.sample_rate
            )));
        }
        if self.max_queue_depth == 0 {
            return Err(VoxgateError::InvalidConfig("maxQueueDepth must be positive".into()));
        }
        Ok(())
    }
}

/// Level mapping for the built-in energy classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct EnergyConfig {
    /// Level (dBFS) mapped to probability 0.0.
    pub floor_dbfs: f32,
    /// Level (dBFS) mapped to probability 1.0.
    pub ceiling_dbfs: f32,
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            floor_dbfs: -50.0,
            ceiling_dbfs: -20.0,
        }
    }
}

impl EnergyConfig {
    pub fn validate(&self) -> Result<()> {
        if self.ceiling_dbfs > self.floor_dbfs {
            return Ok(());
        }
        Err(VoxgateError::InvalidConfig(format!(
            "ceilingDbfs {} must be above floorDbfs {}",
            self.ceiling_dbfs, self.floor_dbfs
        )))
    }
}

/// Everything a voxgate process needs, loadable from one JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct VoxgateSettings {
    pub vad: VadConfig,
    pub playback: PlaybackConfig,
    pub energy: EnergyConfig,
    /// Chunks the transport may queue ahead of a stream task.
    pub inbound_ring_capacity: usize,
    /// Events buffered for a slow segment consumer.
    pub event_channel_capacity: usize,
}

impl Default for VoxgateSettings {
    fn default() -> Self {
        Self {
            vad: VadConfig::default(),
            playback: PlaybackConfig::default(),
            energy: EnergyConfig::default(),
            inbound_ring_capacity: DEFAULT_INBOUND_CAPACITY,
            event_channel_capacity: 64,
        }
    }
}

impl VoxgateSettings {
    /// Read and validate settings from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&raw)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.vad.validate()?;
        self.playback.validate()?;
        self.energy.validate()?;
        if self.inbound_ring_capacity == 0 || self.event_channel_capacity == 0 {
            return Err(VoxgateError::InvalidConfig(
                "inboundRingCapacity and eventChannelCapacity must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_vad_frame_counts_truncate() {
        let cfg = VadConfig::default();
        assert_eq!(cfg.speech_pad_frames(), 9);
        assert_eq!(cfg.min_speech_frames(), 7);
        assert_eq!(cfg.max_speech_frames(), 937);
        assert!((cfg.frame_duration_ms() - 32.0).abs() < 1e-9);
        cfg.validate().unwrap();
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let cfg = VadConfig {
            activation_threshold: 0.3,
            deactivation_threshold: 0.6,
            ..VadConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(VoxgateError::InvalidConfig(_))));
    }

    #[test]
    fn zero_rate_is_a_configuration_error() {
        let cfg = VadConfig {
            sample_rate: 0,
            ..VadConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(VoxgateError::InvalidSampleRate(0))));
    }

    #[test]
    fn playback_tick_frames() {
        let cfg = PlaybackConfig {
            sample_rate: 48_000,
            ..PlaybackConfig::default()
        };
        assert_eq!(cfg.tick_frames(), 960);
        assert_eq!(PlaybackConfig::default().tick_frames(), 160);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let raw = r#"{ "vad": { "speechPadMs": 500 }, "playback": { "encoding": "float32" } }"#;
        let settings: VoxgateSettings = serde_json::from_str(raw).unwrap();
        assert_eq!(settings.vad.speech_pad_ms, 500);
        assert_eq!(settings.vad.frame_size, 512);
        assert_eq!(settings.playback.encoding, SampleEncoding::Float32);
        assert_eq!(settings.inbound_ring_capacity, 256);
    }

    #[test]
    fn load_validates_and_save_round_trips() {
        let dir = std::env::temp_dir().join(format!("voxgate-settings-{}", std::process::id()));
        let path = dir.join("settings.json");

        let mut settings = VoxgateSettings::default();
        settings.vad.partial_frames = 0;
        settings.save(&path).unwrap();
        assert_eq!(VoxgateSettings::load(&path).unwrap(), settings);

        fs::write(&path, r#"{ "playback": { "maxQueueDepth": 0 } }"#).unwrap();
        assert!(matches!(
            VoxgateSettings::load(&path),
            Err(VoxgateError::InvalidConfig(_))
        ));
        let _ = fs::remove_dir_all(&dir);
    }
}
