use std::path::PathBuf;
use std::sync::Arc;

use voxgate::{
    EnergyClassifier, NullSink, PcmBuffer, SampleEncoding, SpeechStream, TailPolicy, VadEvent,
    VoxgateSettings,
};

/// 48 kHz stereo 16-bit fixture: 0.5 s silence, 1 s of a 220 Hz tone on both
/// channels, 0.5 s silence.
fn write_fixture(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("voxgate-{}-{name}", std::process::id()));
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: 48_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for n in 0..96_000u32 {
        let sample = if (24_000..72_000).contains(&n) {
            let t = n as f32 / 48_000.0;
            (8_000.0 * (2.0 * std::f32::consts::PI * 220.0 * t).sin()) as i16
        } else {
            0
        };
        writer.write_sample(sample).unwrap();
        writer.write_sample(sample).unwrap();
    }
    writer.finalize().unwrap();
    path
}

#[test]
fn fixture_loads_as_channel_major_int16() {
    let path = write_fixture("load.wav");
    let pcm = PcmBuffer::read_wav(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(pcm.sample_rate(), 48_000);
    assert_eq!(pcm.channels(), 2);
    assert_eq!(pcm.encoding(), SampleEncoding::Int16);
    assert_eq!(pcm.frames(), 96_000);
    assert!((pcm.duration_ms() - 2_000.0).abs() < 1e-9);

    let left = pcm.channel(0).unwrap();
    let right = pcm.channel(1).unwrap();
    assert_eq!(left, right);
}

#[tokio::test]
async fn fixture_yields_one_segment_after_conversion() {
    let path = write_fixture("segment.wav");
    let source = PcmBuffer::read_wav(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    let settings = VoxgateSettings::default();
    let audio = source
        .resample(settings.vad.sample_rate, settings.vad.channels)
        .unwrap();
    assert_eq!(audio.frames(), 32_000);
    assert_eq!(audio.encoding(), SampleEncoding::Int16);

    let (mut stream, mut rx) = SpeechStream::spawn(
        "fixture",
        &settings,
        Box::new(EnergyClassifier::default()),
        Arc::new(NullSink),
    )
    .unwrap();
    for chunk in audio.chunks(320, 0, TailPolicy::Short) {
        stream.push(chunk).unwrap();
    }
    let diagnostics = stream.close().await.unwrap();

    let mut segments = Vec::new();
    while let Some(event) = rx.recv().await {
        if let VadEvent::SpeechSegment { audio, .. } = event {
            segments.push(audio);
        }
    }
    assert_eq!(segments.len(), 1);
    assert_eq!(diagnostics.segments_emitted, 1);
    // One second of tone is about 31 frames; the pad adds 9 more.
    let frames = segments[0].frames() / settings.vad.frame_size;
    assert!((39..=42).contains(&frames), "frames={frames}");
}
