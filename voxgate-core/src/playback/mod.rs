//! Outbound audio track.
//!
//! A `PlaybackTrack` sits between a synthesis producer and the transport:
//!
//! ```text
//! TTS ──write()──► convert ──► split into ticks ──► bounded FIFO
//!                                                      │
//! transport ◄──drain_one_tick() / recv().await ◄───────┘ (+ surplus carry)
//! ```
//!
//! One writer and one drainer may use the track concurrently (share it in an
//! `Arc`). The FIFO is guarded by a short-lived mutex; neither side ever
//! waits on the other for longer than a queue operation.

pub mod pacer;

use std::collections::VecDeque;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::audio::resample::Resampler;
use crate::audio::window::TailPolicy;
use crate::audio::{PcmBuffer, SampleEncoding, Samples};
use crate::config::PlaybackConfig;
use crate::error::Result;
use crate::telemetry::{EventSink, TelemetryEvent, TelemetryKind};

pub use pacer::TickPacer;

/// Result of one `write`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    /// New queue entries. Audio merged into a short newest entry adds none.
    pub queued: usize,
    /// Oldest entries evicted to stay within the queue bound.
    pub dropped: usize,
}

#[derive(Debug, Default)]
pub struct PlaybackStats {
    pub frames_written: AtomicUsize,
    pub ticks_drained: AtomicUsize,
    pub underrun_ticks: AtomicUsize,
    pub dropped_entries: AtomicUsize,
}

impl PlaybackStats {
    pub fn snapshot(&self) -> PlaybackStatsSnapshot {
        PlaybackStatsSnapshot {
            frames_written: self.frames_written.load(Ordering::Relaxed),
            ticks_drained: self.ticks_drained.load(Ordering::Relaxed),
            underrun_ticks: self.underrun_ticks.load(Ordering::Relaxed),
            dropped_entries: self.dropped_entries.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackStatsSnapshot {
    pub frames_written: usize,
    pub ticks_drained: usize,
    pub underrun_ticks: usize,
    pub dropped_entries: usize,
}

#[derive(Debug, Default)]
struct PlaybackQueue {
    entries: VecDeque<PcmBuffer>,
    /// Surplus from the last tick, played before any queued entry.
    carry: Option<PcmBuffer>,
    /// Frames handed out so far; the next tick's pts.
    frames_emitted: u64,
}

pub struct PlaybackTrack {
    track_id: String,
    config: PlaybackConfig,
    tick_frames: usize,
    converter: Resampler,
    queue: Mutex<PlaybackQueue>,
    pacer: Mutex<TickPacer>,
    sink: Arc<dyn EventSink>,
    stats: PlaybackStats,
}

impl PlaybackTrack {
    pub fn new(
        track_id: impl Into<String>,
        config: PlaybackConfig,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self> {
        config.validate()?;
        let track_id = track_id.into();
        let tick_frames = config.tick_frames();
        let converter =
            Resampler::new(config.sample_rate, config.channels)?.with_encoding(config.encoding);

        info!(
            track_id = %track_id,
            sample_rate = config.sample_rate,
            channels = config.channels,
            encoding = config.encoding.as_str(),
            tick_frames,
            max_queue_depth = config.max_queue_depth,
            "playback track created"
        );
        sink.emit(TelemetryEvent::new(
            track_id.clone(),
            TelemetryKind::Initialized {
                sample_rate: config.sample_rate,
                frame_size: tick_frames,
            },
        ));

        Ok(Self {
            track_id,
            tick_frames,
            converter,
            queue: Mutex::new(PlaybackQueue::default()),
            pacer: Mutex::new(TickPacer::new(TickPacer::tick_for(tick_frames, config.sample_rate))),
            config,
            sink,
            stats: PlaybackStats::default(),
        })
    }

    pub fn track_id(&self) -> &str {
        &self.track_id
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    /// Frames per channel in one tick.
    pub fn tick_frames(&self) -> usize {
        self.tick_frames
    }

    /// Entries waiting in the FIFO (the carried surplus is not counted).
    pub fn queue_len(&self) -> usize {
        self.queue.lock().entries.len()
    }

    /// Frames per channel waiting to be played, surplus included.
    pub fn buffered_frames(&self) -> usize {
        let queue = self.queue.lock();
        queue.carry.as_ref().map_or(0, PcmBuffer::frames)
            + queue.entries.iter().map(PcmBuffer::frames).sum::<usize>()
    }

    pub fn stats(&self) -> PlaybackStatsSnapshot {
        self.stats.snapshot()
    }

    /// Convert `audio` to the track format and queue it.
    ///
    /// A short newest entry is filled up to one tick before new entries are
    /// split off, so the queue bound counts whole ticks.
    ///
    /// Never blocks on the drainer and never fails on overflow: the oldest
    /// entries are evicted instead.
    ///
    /// # Errors
    /// Only if conversion to the track format fails.
    pub fn write(&self, audio: &PcmBuffer) -> Result<WriteOutcome> {
        let converted = self.converter.convert(audio)?;
        if converted.is_empty() {
            return Ok(WriteOutcome {
                queued: 0,
                dropped: 0,
            });
        }
        let frames = converted.frames();

        let (queued, dropped, depth) = {
            let mut queue = self.queue.lock();
            // Only the newest entry may be shorter than a tick.
            let mut rest = converted;
            if let Some(last) = queue.entries.back_mut() {
                let room = self.tick_frames.saturating_sub(last.frames()).min(frames);
                if room > 0 {
                    last.append(&rest.slice_frames(0, room))?;
                    rest = rest.slice_frames(room, frames - room);
                }
            }
            let before = queue.entries.len();
            queue
                .entries
                .extend(rest.chunks(self.tick_frames, 0, TailPolicy::Short));
            let queued = queue.entries.len() - before;

            let mut dropped = 0;
            while queue.entries.len() > self.config.max_queue_depth {
                queue.entries.pop_front();
                dropped += 1;
            }
            (queued, dropped, queue.entries.len())
        };
        self.stats
            .frames_written
            .fetch_add(frames, Ordering::Relaxed);

        if dropped > 0 {
            self.stats
                .dropped_entries
                .fetch_add(dropped, Ordering::Relaxed);
            warn!(track_id = %self.track_id, dropped, queue_depth = depth, "playback queue overflow, dropped oldest audio");
            self.sink.emit(TelemetryEvent::new(
                self.track_id.clone(),
                TelemetryKind::PlaybackOverflow {
                    dropped,
                    queue_depth: depth,
                },
            ));
        } else {
            debug!(track_id = %self.track_id, queued, queue_depth = depth, "queued audio");
        }
        Ok(WriteOutcome { queued, dropped })
    }

    /// Produce exactly one tick of audio, padding with silence on underrun
    /// and carrying any surplus to the next tick.
    ///
    /// The result is stamped with `pts` = frames emitted before it and
    /// `time_base` = 1 / sample rate.
    pub fn drain_one_tick(&self) -> PcmBuffer {
        let tick = self.tick_frames;
        let mut queue = self.queue.lock();

        let mut out = queue.carry.take().unwrap_or_else(|| self.empty());
        while out.frames() < tick {
            let Some(entry) = queue.entries.pop_front() else {
                break;
            };
            if let Err(e) = out.append(&entry) {
                error!(track_id = %self.track_id, "discarding queued entry: {e}");
            }
        }

        if out.frames() > tick {
            queue.carry = Some(out.slice_frames(tick, out.frames() - tick));
            out = out.slice_frames(0, tick);
        } else if out.frames() < tick {
            self.stats.underrun_ticks.fetch_add(1, Ordering::Relaxed);
            let missing = tick - out.frames();
            if let Err(e) = out.append(&self.silence(missing)) {
                error!(track_id = %self.track_id, "padding tick failed: {e}");
            }
        }

        let pts = queue.frames_emitted as i64;
        queue.frames_emitted += tick as u64;
        drop(queue);

        self.stats.ticks_drained.fetch_add(1, Ordering::Relaxed);
        out.with_timestamps(Some(pts), None, Some(1.0 / self.config.sample_rate as f64))
    }

    /// Wait for the next tick on the track's schedule, then drain it.
    ///
    /// The first call returns immediately and anchors the schedule.
    pub async fn recv(&self) -> PcmBuffer {
        let deadline = self.pacer.lock().next_deadline();
        tokio::time::sleep_until(deadline).await;
        self.drain_one_tick()
    }

    /// Drop everything queued or carried, e.g. on barge-in. Returns the
    /// number of frames per channel discarded.
    pub fn flush(&self) -> usize {
        let discarded = {
            let mut queue = self.queue.lock();
            queue.carry.take().map_or(0, |c| c.frames())
                + queue.entries.drain(..).map(|e| e.frames()).sum::<usize>()
        };
        if discarded > 0 {
            info!(track_id = %self.track_id, discarded_frames = discarded, "playback flushed");
        }
        discarded
    }

    /// Clear the queue and release the track.
    pub fn close(self) -> PlaybackStatsSnapshot {
        self.flush();
        self.sink
            .emit(TelemetryEvent::new(self.track_id.clone(), TelemetryKind::Closed));
        info!(track_id = %self.track_id, "playback track closed");
        self.stats.snapshot()
    }

    fn empty(&self) -> PcmBuffer {
        self.silence(0)
    }

    fn silence(&self, frames: usize) -> PcmBuffer {
        let len = frames * self.config.channels as usize;
        let samples = match self.config.encoding {
            SampleEncoding::Int16 => Samples::Int16(vec![0; len]),
            SampleEncoding::Float32 => Samples::Float32(vec![0.0; len]),
        };
        PcmBuffer::from_parts(samples, self.config.sample_rate, self.config.channels)
    }
}
