//! Voice activity segmentation.
//!
//! The `SpeechClassifier` trait is the extensibility point: it turns one
//! fixed-size frame into a speech probability. `VadEngine` owns the
//! hysteresis state machine on top of it and is the only thing that decides
//! where segments start and end.

pub mod energy;
pub mod engine;

use async_trait::async_trait;

use crate::audio::PcmBuffer;
use crate::error::Result;

pub use energy::EnergyClassifier;
pub use engine::{VadDiagnostics, VadDiagnosticsSnapshot, VadEngine};

/// Scores a single frame.
///
/// Implementations may suspend (e.g. awaiting a remote inference call). The
/// engine never issues two concurrent `classify` calls on the same instance.
#[async_trait]
pub trait SpeechClassifier: Send {
    /// Probability in [0.0, 1.0] that `frame` contains speech.
    ///
    /// Must be deterministic for identical input. An `Err` is not fatal: the
    /// engine scores the frame as silence and carries on.
    async fn classify(&mut self, frame: &PcmBuffer) -> Result<f32>;

    /// Fixed-hop classifiers return the only frame size they accept at
    /// `sample_rate`. Checked once when the engine is built.
    fn required_frame_size(&self, _sample_rate: u32) -> Option<usize> {
        None
    }

    /// Drop any recurrent state.
    fn reset(&mut self) {}
}

/// Output of the segmentation engine, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum VadEvent {
    /// An idle stream crossed the activation threshold.
    SpeechStart {
        probability: f32,
        threshold: f32,
        /// Zero-based index of the triggering frame within the stream.
        frame_index: u64,
    },
    /// Snapshot of the utterance so far. The engine keeps accumulating.
    Partial {
        audio: PcmBuffer,
        /// Score of the frame that completed this snapshot.
        probability: f32,
        frame_count: usize,
        duration_ms: f64,
    },
    /// A complete utterance, trailing pad included.
    SpeechSegment {
        audio: PcmBuffer,
        frame_count: usize,
        duration_ms: f64,
    },
    /// The active run ended. Always follows `SpeechStart`, whether or not a
    /// `SpeechSegment` was emitted for it.
    SpeechEnd {
        total_frames: usize,
        /// Everything accumulated, trailing pad included.
        total_duration_ms: f64,
        /// Up to and including the last frame scored as speech.
        speech_duration_ms: f64,
    },
}

impl VadEvent {
    pub fn name(&self) -> &'static str {
        match self {
            VadEvent::SpeechStart { .. } => "speechStart",
            VadEvent::Partial { .. } => "partial",
            VadEvent::SpeechSegment { .. } => "speechSegment",
            VadEvent::SpeechEnd { .. } => "speechEnd",
        }
    }

    /// Audio carried by partial and segment events.
    pub fn audio(&self) -> Option<&PcmBuffer> {
        match self {
            VadEvent::Partial { audio, .. } | VadEvent::SpeechSegment { audio, .. } => Some(audio),
            _ => None,
        }
    }
}
