//! Per-stream task loop.
//!
//! ## Per wake-up
//!
//! ```text
//! 1. Pop every chunk queued in the inbound ring
//! 2. VadEngine::process → Vec<VadEvent>
//! 3. Forward events to the segment consumer (mpsc, awaits if it lags)
//! 4. If the handle asked to close: drain once more, flush, exit
//! 5. Otherwise park on the Notify until the next push
//! ```

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tokio::sync::{mpsc, Notify};
use tracing::{debug, info, warn};

use crate::{
    buffering::{Consumer, InboundConsumer},
    telemetry::{EventSink, TelemetryEvent, TelemetryKind},
    vad::{VadDiagnosticsSnapshot, VadEngine, VadEvent},
};

/// Everything the task owns, passed as one struct.
pub struct StreamContext {
    pub engine: VadEngine,
    pub consumer: InboundConsumer,
    pub notify: Arc<Notify>,
    pub closing: Arc<AtomicBool>,
    pub events_tx: mpsc::Sender<VadEvent>,
    pub sink: Arc<dyn EventSink>,
}

/// Run until the handle closes the stream. Returns the final counters.
pub async fn run(mut ctx: StreamContext) -> VadDiagnosticsSnapshot {
    info!("stream task started");
    let mut consumer_gone = false;

    loop {
        let closing = ctx.closing.load(Ordering::Acquire);
        drain(&mut ctx, &mut consumer_gone).await;
        if closing {
            break;
        }
        ctx.notify.notified().await;
    }

    let events = ctx.engine.flush();
    forward(&ctx.events_tx, events, &mut consumer_gone).await;

    let snapshot = ctx.engine.diagnostics().snapshot();
    ctx.sink.emit(TelemetryEvent::new(
        ctx.engine.stream_id().to_owned(),
        TelemetryKind::Closed,
    ));
    info!(
        chunks_in = snapshot.chunks_in,
        frames_classified = snapshot.frames_classified,
        segments_emitted = snapshot.segments_emitted,
        segments_discarded = snapshot.segments_discarded,
        classifier_errors = snapshot.classifier_errors,
        "stream task finished"
    );
    snapshot
}

async fn drain(ctx: &mut StreamContext, consumer_gone: &mut bool) {
    while let Some(chunk) = ctx.consumer.try_pop() {
        match ctx.engine.process(chunk).await {
            Ok(events) => forward(&ctx.events_tx, events, consumer_gone).await,
            // Format is already checked on push.
            Err(e) => warn!("chunk rejected: {e}"),
        }
    }
}

async fn forward(tx: &mpsc::Sender<VadEvent>, events: Vec<VadEvent>, consumer_gone: &mut bool) {
    for event in events {
        if *consumer_gone {
            return;
        }
        if tx.send(event).await.is_err() {
            debug!("segment consumer dropped, events are discarded from here on");
            *consumer_gone = true;
        }
    }
}
