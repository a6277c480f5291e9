//! Hysteresis segmentation state machine.
//!
//! ## Per-frame step
//!
//! ```text
//! Idle   ── p ≥ activation ──────────────► Active   (SpeechStart, buffer = frame)
//! Active ── append frame, p ≥ deactivation ? silence = 0 : silence += 1
//!        ── every `partial_frames` frames ► Partial (snapshot, keeps going)
//!        ── silence ≥ pad frames ─────────► flush
//!        ── total ≥ max frames ───────────► flush
//! flush  ── len ≥ min frames ? SpeechSegment : discard; SpeechEnd; → Idle
//! ```
//!
//! Input arrives in arbitrary-sized chunks. Leftover samples shorter than a
//! frame are carried over and prepended to the next chunk.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::{SpeechClassifier, VadEvent};
use crate::audio::accumulate::PcmAccumulator;
use crate::audio::window::TailPolicy;
use crate::audio::{PcmBuffer, SampleEncoding};
use crate::config::VadConfig;
use crate::error::{Result, VoxgateError};
use crate::telemetry::{EventSink, TelemetryEvent, TelemetryKind};

/// Shared counters for one stream. Cheap to read from any thread.
#[derive(Debug, Default)]
pub struct VadDiagnostics {
    pub chunks_in: AtomicUsize,
    pub chunks_rejected: AtomicUsize,
    pub frames_classified: AtomicUsize,
    pub speech_frames: AtomicUsize,
    pub classifier_errors: AtomicUsize,
    pub partials_emitted: AtomicUsize,
    pub segments_emitted: AtomicUsize,
    pub segments_discarded: AtomicUsize,
}

impl VadDiagnostics {
    pub fn reset(&self) {
        self.chunks_in.store(0, Ordering::Relaxed);
        self.chunks_rejected.store(0, Ordering::Relaxed);
        self.frames_classified.store(0, Ordering::Relaxed);
        self.speech_frames.store(0, Ordering::Relaxed);
        self.classifier_errors.store(0, Ordering::Relaxed);
        self.partials_emitted.store(0, Ordering::Relaxed);
        self.segments_emitted.store(0, Ordering::Relaxed);
        self.segments_discarded.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> VadDiagnosticsSnapshot {
        VadDiagnosticsSnapshot {
            chunks_in: self.chunks_in.load(Ordering::Relaxed),
            chunks_rejected: self.chunks_rejected.load(Ordering::Relaxed),
            frames_classified: self.frames_classified.load(Ordering::Relaxed),
            speech_frames: self.speech_frames.load(Ordering::Relaxed),
            classifier_errors: self.classifier_errors.load(Ordering::Relaxed),
            partials_emitted: self.partials_emitted.load(Ordering::Relaxed),
            segments_emitted: self.segments_emitted.load(Ordering::Relaxed),
            segments_discarded: self.segments_discarded.load(Ordering::Relaxed),
        }
    }

    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VadDiagnosticsSnapshot {
    pub chunks_in: usize,
    pub chunks_rejected: usize,
    pub frames_classified: usize,
    pub speech_frames: usize,
    pub classifier_errors: usize,
    pub partials_emitted: usize,
    pub segments_emitted: usize,
    pub segments_discarded: usize,
}

/// Mutable segmentation state. `speech` is `Some` only while active.
#[derive(Debug, Default)]
struct VadState {
    speech: Option<PcmAccumulator>,
    silence_frames: usize,
    total_frames: usize,
    partial_frames: usize,
    /// `total_frames` value at the last frame scored as speech.
    last_speech_frame: usize,
}

impl VadState {
    fn is_active(&self) -> bool {
        self.speech.is_some()
    }
}

/// One stream's segmentation engine.
///
/// Not `Sync`: a stream is driven by exactly one task, which serializes
/// classifier calls for it.
pub struct VadEngine {
    stream_id: String,
    config: VadConfig,
    classifier: Box<dyn SpeechClassifier>,
    sink: Arc<dyn EventSink>,
    diagnostics: Arc<VadDiagnostics>,
    pad_frames: usize,
    min_frames: usize,
    max_frames: usize,
    state: VadState,
    /// Leftover samples (< one frame) from the previous chunk.
    carry: Option<PcmBuffer>,
    /// Fixed by the first chunk; later chunks are re-encoded to match.
    encoding: Option<SampleEncoding>,
    frame_index: u64,
}

impl VadEngine {
    /// # Errors
    /// - Anything `VadConfig::validate` rejects.
    /// - `UnsupportedFrameSize` if the classifier needs a different frame.
    pub fn new(
        stream_id: impl Into<String>,
        config: VadConfig,
        classifier: Box<dyn SpeechClassifier>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self> {
        config.validate()?;
        if let Some(required) = classifier.required_frame_size(config.sample_rate) {
            if required != config.frame_size {
                return Err(VoxgateError::UnsupportedFrameSize {
                    required,
                    configured: config.frame_size,
                });
            }
        }

        let stream_id = stream_id.into();
        info!(
            stream_id = %stream_id,
            sample_rate = config.sample_rate,
            frame_size = config.frame_size,
            pad_frames = config.speech_pad_frames(),
            min_frames = config.min_speech_frames(),
            max_frames = config.max_speech_frames(),
            "vad engine created"
        );
        sink.emit(TelemetryEvent::new(
            stream_id.clone(),
            TelemetryKind::Initialized {
                sample_rate: config.sample_rate,
                frame_size: config.frame_size,
            },
        ));

        Ok(Self {
            stream_id,
            pad_frames: config.speech_pad_frames().max(1),
            min_frames: config.min_speech_frames(),
            max_frames: config.max_speech_frames(),
            config,
            classifier,
            sink,
            diagnostics: Arc::new(VadDiagnostics::default()),
            state: VadState::default(),
            carry: None,
            encoding: None,
            frame_index: 0,
        })
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    pub fn config(&self) -> &VadConfig {
        &self.config
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Frames accumulated in the current utterance.
    pub fn buffered_frames(&self) -> usize {
        self.state.total_frames
    }

    /// Samples per channel waiting for the rest of their frame.
    pub fn carry_over_frames(&self) -> usize {
        self.carry.as_ref().map_or(0, PcmBuffer::frames)
    }

    pub fn diagnostics(&self) -> Arc<VadDiagnostics> {
        Arc::clone(&self.diagnostics)
    }

    /// Feed a chunk of any length and return the events it produced.
    ///
    /// # Errors
    /// `SampleRateMismatch` / `ChannelMismatch` if the chunk is not in the
    /// configured format. The chunk is rejected whole and state is untouched.
    pub async fn process(&mut self, chunk: PcmBuffer) -> Result<Vec<VadEvent>> {
        self.check_format(&chunk)?;
        VadDiagnostics::bump(&self.diagnostics.chunks_in);

        let chunk = match self.encoding {
            Some(encoding) => chunk.into_encoding(encoding),
            None => {
                self.encoding = Some(chunk.encoding());
                chunk
            }
        };
        let pending = match self.carry.take() {
            Some(mut carry) => {
                carry.append(&chunk)?;
                carry
            }
            None => chunk,
        };

        let frame_size = self.config.frame_size;
        let whole = pending.frames() / frame_size * frame_size;
        if whole < pending.frames() {
            self.carry = Some(pending.slice_frames(whole, pending.frames() - whole));
        }

        let mut events = Vec::new();
        for frame in pending.chunks(frame_size, 0, TailPolicy::Drop) {
            self.process_frame(frame, &mut events).await;
        }
        Ok(events)
    }

    /// Force the current utterance out, applying the minimum-length check.
    /// Carried-over samples are kept for the next chunk.
    pub fn flush(&mut self) -> Vec<VadEvent> {
        let mut events = Vec::new();
        self.flush_into(&mut events);
        events
    }

    /// Discard everything: utterance, carry-over and classifier state.
    pub fn reset(&mut self) {
        self.state = VadState::default();
        self.carry = None;
        self.encoding = None;
        self.classifier.reset();
        debug!(stream_id = %self.stream_id, "vad engine reset");
    }

    fn check_format(&self, chunk: &PcmBuffer) -> Result<()> {
        let rejected = if chunk.sample_rate() != self.config.sample_rate {
            Some(VoxgateError::SampleRateMismatch {
                stream_id: self.stream_id.clone(),
                expected: self.config.sample_rate,
                actual: chunk.sample_rate(),
            })
        } else if chunk.channels() != self.config.channels {
            Some(VoxgateError::ChannelMismatch {
                stream_id: self.stream_id.clone(),
                expected: self.config.channels,
                actual: chunk.channels(),
            })
        } else {
            None
        };
        match rejected {
            Some(err) => {
                VadDiagnostics::bump(&self.diagnostics.chunks_rejected);
                Err(err)
            }
            None => Ok(()),
        }
    }

    async fn process_frame(&mut self, frame: PcmBuffer, events: &mut Vec<VadEvent>) {
        let frame_index = self.frame_index;
        self.frame_index += 1;
        let probability = self.score(&frame, frame_index).await;

        if !self.state.is_active() {
            if probability < self.config.activation_threshold {
                return;
            }
            VadDiagnostics::bump(&self.diagnostics.speech_frames);
            self.state = VadState {
                speech: Some(PcmAccumulator::from_buffer(&frame)),
                silence_frames: 0,
                total_frames: 1,
                partial_frames: 1,
                last_speech_frame: 1,
            };
            debug!(stream_id = %self.stream_id, frame_index, probability, "speech start");
            self.sink.emit(TelemetryEvent::new(
                self.stream_id.clone(),
                TelemetryKind::SpeechStart {
                    frame_index,
                    probability,
                },
            ));
            events.push(VadEvent::SpeechStart {
                probability,
                threshold: self.config.activation_threshold,
                frame_index,
            });
            if self.state.total_frames >= self.max_frames {
                self.flush_forced(events);
            }
            return;
        }

        if let Some(speech) = self.state.speech.as_mut() {
            if let Err(e) = speech.push(&frame) {
                // Every frame is sliced from the same re-encoded stream.
                warn!(stream_id = %self.stream_id, "dropping frame: {e}");
                return;
            }
        }
        self.state.total_frames += 1;
        self.state.partial_frames += 1;

        if probability >= self.config.deactivation_threshold {
            VadDiagnostics::bump(&self.diagnostics.speech_frames);
            self.state.silence_frames = 0;
            self.state.last_speech_frame = self.state.total_frames;
        } else {
            self.state.silence_frames += 1;
        }

        if self.config.partial_frames > 0 && self.state.partial_frames >= self.config.partial_frames {
            self.state.partial_frames = 0;
            self.emit_partial(probability, events);
        }

        if self.state.silence_frames >= self.pad_frames {
            debug!(
                stream_id = %self.stream_id,
                silence_frames = self.state.silence_frames,
                "end of utterance"
            );
            self.flush_into(events);
        } else if self.state.total_frames >= self.max_frames {
            self.flush_forced(events);
        }
    }

    async fn score(&mut self, frame: &PcmBuffer, frame_index: u64) -> f32 {
        VadDiagnostics::bump(&self.diagnostics.frames_classified);
        match self.classifier.classify(frame).await {
            Ok(p) if p.is_nan() => 0.0,
            Ok(p) => p.clamp(0.0, 1.0),
            Err(e) => {
                VadDiagnostics::bump(&self.diagnostics.classifier_errors);
                warn!(stream_id = %self.stream_id, frame_index, "classifier failed, scoring frame as silence: {e}");
                self.sink.emit(TelemetryEvent::new(
                    self.stream_id.clone(),
                    TelemetryKind::ClassifierError {
                        frame_index,
                        message: e.to_string(),
                    },
                ));
                0.0
            }
        }
    }

    fn emit_partial(&mut self, probability: f32, events: &mut Vec<VadEvent>) {
        let Some(speech) = self.state.speech.as_ref() else {
            return;
        };
        let frame_count = self.state.total_frames;
        let duration_ms = speech.duration_ms();
        VadDiagnostics::bump(&self.diagnostics.partials_emitted);
        self.sink.emit(TelemetryEvent::new(
            self.stream_id.clone(),
            TelemetryKind::Partial {
                frame_count,
                duration_ms,
            },
        ));
        events.push(VadEvent::Partial {
            audio: speech.to_pcm(),
            probability,
            frame_count,
            duration_ms,
        });
    }

    fn flush_forced(&mut self, events: &mut Vec<VadEvent>) {
        warn!(
            stream_id = %self.stream_id,
            max_frames = self.max_frames,
            "max speech length reached, forcing flush"
        );
        self.flush_into(events);
    }

    fn flush_into(&mut self, events: &mut Vec<VadEvent>) {
        let state = std::mem::take(&mut self.state);
        let Some(speech) = state.speech else {
            return;
        };

        let frame_ms = self.config.frame_duration_ms();
        let frame_count = state.total_frames;
        let total_duration_ms = speech.duration_ms();
        let speech_duration_ms = state.last_speech_frame as f64 * frame_ms;

        if speech.frames() >= self.min_frames * self.config.frame_size {
            VadDiagnostics::bump(&self.diagnostics.segments_emitted);
            info!(
                stream_id = %self.stream_id,
                frame_count,
                duration_ms = total_duration_ms,
                "speech segment"
            );
            self.sink.emit(TelemetryEvent::new(
                self.stream_id.clone(),
                TelemetryKind::Segment {
                    frame_count,
                    duration_ms: total_duration_ms,
                },
            ));
            events.push(VadEvent::SpeechSegment {
                audio: speech.into_pcm(),
                frame_count,
                duration_ms: total_duration_ms,
            });
        } else {
            VadDiagnostics::bump(&self.diagnostics.segments_discarded);
            debug!(
                stream_id = %self.stream_id,
                frame_count,
                min_frames = self.min_frames,
                "segment too short, discarded"
            );
            self.sink.emit(TelemetryEvent::new(
                self.stream_id.clone(),
                TelemetryKind::SegmentDiscarded {
                    frame_count,
                    duration_ms: total_duration_ms,
                },
            ));
        }

        self.sink.emit(TelemetryEvent::new(
            self.stream_id.clone(),
            TelemetryKind::SpeechEnd {
                total_duration_ms,
                speech_duration_ms,
            },
        ));
        events.push(VadEvent::SpeechEnd {
            total_frames: frame_count,
            total_duration_ms,
            speech_duration_ms,
        });
    }
}
