//! Injectable telemetry sink.
//!
//! Engines and tracks take an `Arc<dyn EventSink>` at construction. There is
//! no global registry: production code passes a `TracingSink`, tests pass a
//! `MemorySink` and inspect what was written.

pub mod events;

use parking_lot::Mutex;
use tracing::{info, warn};

pub use events::{TelemetryEvent, TelemetryKind};

/// Destination for structured telemetry records.
///
/// `emit` is called inline on the processing path and must not block.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: TelemetryEvent);
}

/// Writes every record to `tracing` under the `voxgate::telemetry` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: TelemetryEvent) {
        let payload = serde_json::to_string(&event.kind).unwrap_or_default();
        if event.kind.is_warning() {
            warn!(target: "voxgate::telemetry", source = %event.source, kind = event.kind.name(), %payload);
        } else {
            info!(target: "voxgate::telemetry", source = %event.source, kind = event.kind.name(), %payload);
        }
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: TelemetryEvent) {}
}

/// Keeps records in memory for later inspection.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<TelemetryEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far.
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events.lock().clone()
    }

    /// Remove and return everything recorded so far.
    pub fn take(&self) -> Vec<TelemetryEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Names of the recorded kinds, in order.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(|e| e.kind.name()).collect()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: TelemetryEvent) {
        self.events.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn memory_sink_records_in_order_and_drains() {
        let sink = Arc::new(MemorySink::new());
        let dyn_sink: Arc<dyn EventSink> = sink.clone();
        dyn_sink.emit(TelemetryEvent::new("a", TelemetryKind::Closed));
        dyn_sink.emit(TelemetryEvent::new(
            "a",
            TelemetryKind::PlaybackOverflow {
                dropped: 1,
                queue_depth: 2,
            },
        ));

        assert_eq!(sink.kinds(), vec!["closed", "playbackOverflow"]);
        assert_eq!(sink.take().len(), 2);
        assert!(sink.events().is_empty());
    }

    #[test]
    fn tracing_and_null_sinks_accept_events() {
        TracingSink.emit(TelemetryEvent::new("a", TelemetryKind::Closed));
        NullSink.emit(TelemetryEvent::new("a", TelemetryKind::Closed));
    }
}
