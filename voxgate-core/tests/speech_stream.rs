use std::sync::Arc;

use tokio::sync::mpsc;
use voxgate::{
    EnergyClassifier, MemorySink, NullSink, PcmBuffer, SpeechStream, TailPolicy, VadEvent,
    VoxgateError, VoxgateSettings,
};

const FRAME: usize = 512;

/// `silent` frames of zeros, `loud` frames at a level the energy classifier
/// scores 1.0, then `tail` frames of zeros. 16 kHz mono int16.
fn utterance(silent: usize, loud: usize, tail: usize) -> PcmBuffer {
    let mut samples = vec![0i16; silent * FRAME];
    samples.extend(std::iter::repeat(8_000i16).take(loud * FRAME));
    samples.extend(std::iter::repeat(0i16).take(tail * FRAME));
    PcmBuffer::from_i16(samples, 16_000, 1).unwrap()
}

/// Push `audio` as 20 ms transport chunks.
fn push_all(stream: &mut SpeechStream, audio: &PcmBuffer) {
    for chunk in audio.chunks(320, 0, TailPolicy::Short) {
        stream.push(chunk).unwrap();
    }
}

async fn collect(mut rx: mpsc::Receiver<VadEvent>) -> Vec<VadEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

fn names(events: &[VadEvent]) -> Vec<&'static str> {
    events.iter().map(VadEvent::name).collect()
}

#[tokio::test]
async fn utterance_in_transport_chunks_yields_one_segment() {
    let settings = VoxgateSettings::default();
    let (mut stream, rx) = SpeechStream::spawn(
        "caller",
        &settings,
        Box::new(EnergyClassifier::default()),
        Arc::new(NullSink),
    )
    .unwrap();

    push_all(&mut stream, &utterance(10, 20, 20));
    let diagnostics = stream.close().await.unwrap();
    let events = collect(rx).await;

    assert_eq!(
        names(&events),
        vec!["speechStart", "partial", "partial", "speechSegment", "speechEnd"]
    );
    match &events[0] {
        VadEvent::SpeechStart { frame_index, .. } => assert_eq!(*frame_index, 10),
        other => panic!("unexpected {other:?}"),
    }
    match &events[3] {
        VadEvent::SpeechSegment {
            audio, frame_count, ..
        } => {
            assert_eq!(*frame_count, 29);
            assert_eq!(audio.frames(), 29 * FRAME);
            assert_eq!(audio.sample_rate(), 16_000);
        }
        other => panic!("unexpected {other:?}"),
    }

    assert_eq!(diagnostics.chunks_in, 80);
    assert_eq!(diagnostics.frames_classified, 50);
    assert_eq!(diagnostics.speech_frames, 20);
    assert_eq!(diagnostics.segments_emitted, 1);
    assert_eq!(diagnostics.chunks_rejected, 0);
}

#[tokio::test]
async fn close_flushes_an_open_utterance() {
    let settings = VoxgateSettings::default();
    let (mut stream, rx) = SpeechStream::spawn(
        "caller",
        &settings,
        Box::new(EnergyClassifier::default()),
        Arc::new(NullSink),
    )
    .unwrap();

    push_all(&mut stream, &utterance(0, 20, 0));
    stream.close().await.unwrap();
    let events = collect(rx).await;

    assert_eq!(
        names(&events),
        vec!["speechStart", "partial", "partial", "speechSegment", "speechEnd"]
    );
    match events.last() {
        Some(VadEvent::SpeechEnd {
            total_frames,
            speech_duration_ms,
            ..
        }) => {
            assert_eq!(*total_frames, 20);
            assert!((speech_duration_ms - 640.0).abs() < 1e-9);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn wrong_format_chunk_is_rejected_without_stopping_the_stream() {
    let settings = VoxgateSettings::default();
    let (mut stream, rx) = SpeechStream::spawn(
        "caller",
        &settings,
        Box::new(EnergyClassifier::default()),
        Arc::new(NullSink),
    )
    .unwrap();

    let narrowband = PcmBuffer::from_i16(vec![0; 160], 8_000, 1).unwrap();
    assert!(matches!(
        stream.push(narrowband),
        Err(VoxgateError::SampleRateMismatch {
            expected: 16_000,
            actual: 8_000,
            ..
        })
    ));
    let stereo = PcmBuffer::from_i16(vec![0; 640], 16_000, 2).unwrap();
    assert!(matches!(
        stream.push(stereo),
        Err(VoxgateError::ChannelMismatch { .. })
    ));

    push_all(&mut stream, &utterance(0, 10, 10));
    let diagnostics = stream.close().await.unwrap();
    let events = collect(rx).await;

    assert_eq!(diagnostics.chunks_rejected, 2);
    assert!(names(&events).contains(&"speechSegment"));
}

#[tokio::test]
async fn full_ring_rejects_instead_of_blocking() {
    let settings = VoxgateSettings {
        inbound_ring_capacity: 2,
        ..VoxgateSettings::default()
    };
    let (mut stream, rx) = SpeechStream::spawn(
        "caller",
        &settings,
        Box::new(EnergyClassifier::default()),
        Arc::new(NullSink),
    )
    .unwrap();

    // The single-threaded test runtime has not polled the task yet.
    let chunk = PcmBuffer::from_i16(vec![0; 320], 16_000, 1).unwrap();
    stream.push(chunk.clone()).unwrap();
    stream.push(chunk.clone()).unwrap();
    assert_eq!(stream.ring_vacancy(), 0);
    assert!(matches!(
        stream.push(chunk),
        Err(VoxgateError::InboundOverflow { .. })
    ));

    let diagnostics = stream.close().await.unwrap();
    drop(rx);
    assert_eq!(diagnostics.chunks_in, 2);
    assert_eq!(diagnostics.chunks_rejected, 1);
}

#[tokio::test]
async fn telemetry_traces_the_session() {
    let settings = VoxgateSettings::default();
    let sink = Arc::new(MemorySink::new());
    let (mut stream, rx) = SpeechStream::spawn(
        "caller",
        &settings,
        Box::new(EnergyClassifier::default()),
        sink.clone(),
    )
    .unwrap();

    // Closed after three loud frames, short of the seven-frame minimum.
    push_all(&mut stream, &utterance(2, 3, 0));
    stream.close().await.unwrap();
    let events = collect(rx).await;

    assert_eq!(names(&events), vec!["speechStart", "speechEnd"]);
    assert_eq!(
        sink.kinds(),
        vec![
            "initialized",
            "speechStart",
            "segmentDiscarded",
            "speechEnd",
            "closed"
        ]
    );
    assert!(sink.events().iter().all(|e| e.source == "caller"));
}

#[tokio::test]
async fn dropped_receiver_does_not_wedge_the_stream() {
    let settings = VoxgateSettings {
        event_channel_capacity: 1,
        ..VoxgateSettings::default()
    };
    let (mut stream, rx) = SpeechStream::spawn(
        "caller",
        &settings,
        Box::new(EnergyClassifier::default()),
        Arc::new(NullSink),
    )
    .unwrap();
    drop(rx);

    push_all(&mut stream, &utterance(0, 30, 10));
    let diagnostics = stream.close().await.unwrap();
    assert_eq!(diagnostics.segments_emitted, 1);
}
