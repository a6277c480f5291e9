//! Energy-based speech classifier.
//!
//! ## Algorithm
//!
//! 1. Compute the RMS of the frame (all channels, normalised to [0, 1]).
//! 2. Convert to dBFS.
//! 3. Map `floor_dbfs..=ceiling_dbfs` linearly onto `0.0..=1.0`, clamping
//!    outside that range.
//!
//! No model, no state: identical frames always score identically. Hysteresis
//! lives in `VadEngine`, not here.

use async_trait::async_trait;

use super::SpeechClassifier;
use crate::audio::PcmBuffer;
use crate::config::EnergyConfig;
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct EnergyClassifier {
    floor_dbfs: f32,
    ceiling_dbfs: f32,
    /// When set, the only frame size this classifier accepts.
    fixed_frame: Option<usize>,
}

impl EnergyClassifier {
    /// # Parameters
    /// - `floor_dbfs`: level scored as 0.0. Default: `-50.0`.
    /// - `ceiling_dbfs`: level scored as 1.0. Default: `-20.0`.
    pub fn new(config: &EnergyConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            floor_dbfs: config.floor_dbfs,
            ceiling_dbfs: config.ceiling_dbfs,
            fixed_frame: None,
        })
    }

    /// Restrict to one frame size, like a fixed-hop model would.
    pub fn with_fixed_frame(mut self, frame_size: usize) -> Self {
        self.fixed_frame = Some(frame_size);
        self
    }

    pub fn score(&self, frame: &PcmBuffer) -> f32 {
        let db = dbfs(frame.rms());
        ((db - self.floor_dbfs) / (self.ceiling_dbfs - self.floor_dbfs)).clamp(0.0, 1.0)
    }
}

impl Default for EnergyClassifier {
    fn default() -> Self {
        let config = EnergyConfig::default();
        Self {
            floor_dbfs: config.floor_dbfs,
            ceiling_dbfs: config.ceiling_dbfs,
            fixed_frame: None,
        }
    }
}

#[async_trait]
impl SpeechClassifier for EnergyClassifier {
    async fn classify(&mut self, frame: &PcmBuffer) -> Result<f32> {
        Ok(self.score(frame))
    }

    fn required_frame_size(&self, _sample_rate: u32) -> Option<usize> {
        self.fixed_frame
    }
}

/// Level of a normalised RMS value in dB relative to full scale.
pub fn dbfs(rms: f32) -> f32 {
    if rms <= 0.0 {
        return f32::NEG_INFINITY;
    }
    20.0 * rms.log10()
}
