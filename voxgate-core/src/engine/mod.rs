//! `SpeechStream`: one participant's segmentation session.
//!
//! ## Lifecycle
//!
//! ```text
//! SpeechStream::spawn()   → ring + task created, events receiver returned
//!     └─► push(chunk)     → validated, ring push, task woken (never blocks)
//!         └─► close()     → ring drained, engine flushed, task joined
//! ```
//!
//! ## Threading
//!
//! `push` is callable from the transport thread without touching the async
//! runtime: it only writes to the SPSC ring and signals a `Notify`. All
//! classifier calls happen on the stream's own task, one at a time. Dropping
//! the handle without `close()` aborts the task.

pub mod pipeline;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::{info, info_span, warn, Instrument};

use crate::{
    audio::PcmBuffer,
    buffering::{create_inbound_ring, InboundProducer, Observer, Producer},
    config::{VadConfig, VoxgateSettings},
    error::{Result, VoxgateError},
    telemetry::EventSink,
    vad::{SpeechClassifier, VadDiagnostics, VadDiagnosticsSnapshot, VadEngine, VadEvent},
};

/// Handle to a running segmentation task.
pub struct SpeechStream {
    stream_id: String,
    config: VadConfig,
    producer: InboundProducer,
    notify: Arc<Notify>,
    closing: Arc<AtomicBool>,
    diagnostics: Arc<VadDiagnostics>,
    task: Option<JoinHandle<VadDiagnosticsSnapshot>>,
}

impl SpeechStream {
    /// Validate settings, build the engine and spawn its task on the current
    /// tokio runtime.
    ///
    /// # Errors
    /// Configuration errors from `VoxgateSettings::validate` or
    /// `VadEngine::new`. Nothing is spawned on error.
    pub fn spawn(
        stream_id: impl Into<String>,
        settings: &VoxgateSettings,
        classifier: Box<dyn SpeechClassifier>,
        sink: Arc<dyn EventSink>,
    ) -> Result<(Self, mpsc::Receiver<VadEvent>)> {
        settings.validate()?;
        let stream_id = stream_id.into();
        let engine = VadEngine::new(stream_id.clone(), settings.vad.clone(), classifier, Arc::clone(&sink))?;
        let diagnostics = engine.diagnostics();

        let (producer, consumer) = create_inbound_ring(settings.inbound_ring_capacity);
        let (events_tx, events_rx) = mpsc::channel(settings.event_channel_capacity);
        let notify = Arc::new(Notify::new());
        let closing = Arc::new(AtomicBool::new(false));

        let span = info_span!("vad_stream", stream_id = %stream_id);
        let task = tokio::spawn(
            pipeline::run(pipeline::StreamContext {
                engine,
                consumer,
                notify: Arc::clone(&notify),
                closing: Arc::clone(&closing),
                events_tx,
                sink,
            })
            .instrument(span),
        );
        info!(stream_id = %stream_id, ring_capacity = settings.inbound_ring_capacity, "speech stream spawned");

        Ok((
            Self {
                stream_id,
                config: settings.vad.clone(),
                producer,
                notify,
                closing,
                diagnostics,
                task: Some(task),
            },
            events_rx,
        ))
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    /// Queue a chunk for segmentation. Never blocks.
    ///
    /// # Errors
    /// - `SampleRateMismatch` / `ChannelMismatch` for chunks in the wrong
    ///   format; resample with `PcmBuffer::resample` first.
    /// - `InboundOverflow` if the task has fallen a full ring behind.
    /// - `StreamClosed` if the task is no longer running.
    pub fn push(&mut self, chunk: PcmBuffer) -> Result<()> {
        if self.task.as_ref().map_or(true, JoinHandle::is_finished) {
            return Err(VoxgateError::StreamClosed(self.stream_id.clone()));
        }
        if let Err(e) = self.check_format(&chunk) {
            self.diagnostics.chunks_rejected.fetch_add(1, Ordering::Relaxed);
            return Err(e);
        }
        if self.producer.try_push(chunk).is_err() {
            self.diagnostics.chunks_rejected.fetch_add(1, Ordering::Relaxed);
            warn!(stream_id = %self.stream_id, "inbound ring full, chunk rejected");
            return Err(VoxgateError::InboundOverflow {
                stream_id: self.stream_id.clone(),
            });
        }
        self.notify.notify_one();
        Ok(())
    }

    /// Chunks that can be pushed right now without `InboundOverflow`.
    pub fn ring_vacancy(&self) -> usize {
        self.producer.vacant_len()
    }

    /// Live counters.
    pub fn diagnostics(&self) -> VadDiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }

    /// Process everything already pushed, flush the engine and stop the task.
    /// The events receiver sees every remaining event, then closes.
    pub async fn close(mut self) -> Result<VadDiagnosticsSnapshot> {
        self.closing.store(true, Ordering::Release);
        self.notify.notify_one();
        let Some(task) = self.task.take() else {
            return Err(VoxgateError::StreamClosed(self.stream_id.clone()));
        };
        let snapshot = task.await.map_err(|e| {
            VoxgateError::Other(anyhow::anyhow!("stream {} task failed: {e}", self.stream_id))
        })?;
        info!(stream_id = %self.stream_id, "speech stream closed");
        Ok(snapshot)
    }

    fn check_format(&self, chunk: &PcmBuffer) -> Result<()> {
        if chunk.sample_rate() != self.config.sample_rate {
            return Err(VoxgateError::SampleRateMismatch {
                stream_id: self.stream_id.clone(),
                expected: self.config.sample_rate,
                actual: chunk.sample_rate(),
            });
        }
        if chunk.channels() != self.config.channels {
            return Err(VoxgateError::ChannelMismatch {
                stream_id: self.stream_id.clone(),
                expected: self.config.channels,
                actual: chunk.channels(),
            });
        }
        Ok(())
    }
}

impl Drop for SpeechStream {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            warn!(stream_id = %self.stream_id, "speech stream dropped without close, aborting task");
            task.abort();
        }
    }
}
