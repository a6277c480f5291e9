//! # voxgate
//!
//! Real-time speech gating for networked audio streams.
//!
//! ## Architecture
//!
//! ```text
//! transport ─push()─► SPSC ring ─► stream task ─► VadEngine ─► SpeechClassifier
//!                                      │
//!                              mpsc::Sender<VadEvent> ─► STT collaborator
//!
//! TTS collaborator ─write()─► PlaybackTrack ─recv()/drain_one_tick()─► transport
//! ```
//!
//! `PcmBuffer` is the only audio value type. Conversions (resample,
//! re-encode, G.711) always return new buffers.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod audio;
pub mod buffering;
pub mod config;
pub mod engine;
pub mod error;
pub mod playback;
pub mod telemetry;
pub mod vad;

// Convenience re-exports for downstream crates
pub use audio::accumulate::PcmAccumulator;
pub use audio::g711::G711Mapping;
pub use audio::window::TailPolicy;
pub use audio::{PcmBuffer, SampleEncoding, SampleLayout, Samples};
pub use config::{EnergyConfig, PlaybackConfig, VadConfig, VoxgateSettings};
pub use engine::SpeechStream;
pub use error::{Result, VoxgateError};
pub use playback::{PlaybackTrack, WriteOutcome};
pub use telemetry::{EventSink, MemorySink, NullSink, TelemetryEvent, TelemetryKind, TracingSink};
pub use vad::{EnergyClassifier, SpeechClassifier, VadEngine, VadEvent};
