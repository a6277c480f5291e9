//! Structured telemetry records.
//!
//! Serialized as camelCase JSON with a `type` tag, e.g.
//!
//! ```json
//! { "source": "caller-1", "type": "speechStart", "frameIndex": 3, "probability": 0.91 }
//! ```

use serde::{Deserialize, Serialize};

/// One telemetry record, attributed to a stream or track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryEvent {
    /// Stream or track identifier.
    pub source: String,
    #[serde(flatten)]
    pub kind: TelemetryKind,
}

impl TelemetryEvent {
    pub fn new(source: impl Into<String>, kind: TelemetryKind) -> Self {
        Self {
            source: source.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TelemetryKind {
    /// A stream engine or playback track was created.
    #[serde(rename_all = "camelCase")]
    Initialized { sample_rate: u32, frame_size: usize },

    #[serde(rename_all = "camelCase")]
    SpeechStart { frame_index: u64, probability: f32 },

    #[serde(rename_all = "camelCase")]
    Partial { frame_count: usize, duration_ms: f64 },

    #[serde(rename_all = "camelCase")]
    Segment { frame_count: usize, duration_ms: f64 },

    /// An active run flushed below the minimum length.
    #[serde(rename_all = "camelCase")]
    SegmentDiscarded { frame_count: usize, duration_ms: f64 },

    #[serde(rename_all = "camelCase")]
    SpeechEnd {
        total_duration_ms: f64,
        speech_duration_ms: f64,
    },

    /// The classifier failed on one frame; the frame was scored as silence.
    #[serde(rename_all = "camelCase")]
    ClassifierError { frame_index: u64, message: String },

    #[serde(rename_all = "camelCase")]
    PlaybackOverflow { dropped: usize, queue_depth: usize },

    Closed,
}

impl TelemetryKind {
    /// Short name used as a log field.
    pub fn name(&self) -> &'static str {
        match self {
            TelemetryKind::Initialized { .. } => "initialized",
            TelemetryKind::SpeechStart { .. } => "speechStart",
            TelemetryKind::Partial { .. } => "partial",
            TelemetryKind::Segment { .. } => "segment",
            TelemetryKind::SegmentDiscarded { .. } => "segmentDiscarded",
            TelemetryKind::SpeechEnd { .. } => "speechEnd",
            TelemetryKind::ClassifierError { .. } => "classifierError",
            TelemetryKind::PlaybackOverflow { .. } => "playbackOverflow",
            TelemetryKind::Closed => "closed",
        }
    }

    /// Whether the record describes degraded operation.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            TelemetryKind::ClassifierError { .. } | TelemetryKind::PlaybackOverflow { .. }
        )
    }
}
