//! `voxgate-segment`: run the energy classifier and VAD over a WAV file and
//! print one JSON line per event.
//!
//! ```text
//! voxgate-segment <input.wav> [--settings <file.json>] [--chunk-ms <n>]
//!                 [--segments-dir <dir>] [--summary]
//! ```
//!
//! The file is converted to the configured VAD rate/channels, then fed to a
//! `SpeechStream` in transport-sized chunks exactly as a live call would be.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::info;
use voxgate::{
    EnergyClassifier, PcmBuffer, SpeechStream, TailPolicy, TracingSink, VadEvent, VoxgateSettings,
};

#[derive(Debug)]
struct Args {
    input: PathBuf,
    settings: Option<PathBuf>,
    chunk_ms: u32,
    segments_dir: Option<PathBuf>,
    summary: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventLine {
    event: &'static str,
    stream: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    frame_index: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    probability: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frame_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_duration_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<String>,
}

impl EventLine {
    fn new(event: &'static str, stream: &str) -> Self {
        Self {
            event,
            stream: stream.to_owned(),
            frame_index: None,
            start_ms: None,
            probability: None,
            frame_count: None,
            duration_ms: None,
            speech_duration_ms: None,
            file: None,
        }
    }
}

fn parse_args() -> Result<Args, String> {
    let mut input: Option<PathBuf> = None;
    let mut settings: Option<PathBuf> = None;
    let mut chunk_ms: u32 = 20;
    let mut segments_dir: Option<PathBuf> = None;
    let mut summary = false;

    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--settings" => {
                let Some(v) = it.next() else {
                    return Err("missing value for --settings".into());
                };
                settings = Some(PathBuf::from(v));
            }
            "--chunk-ms" => {
                let Some(v) = it.next() else {
                    return Err("missing value for --chunk-ms".into());
                };
                chunk_ms = v
                    .parse::<u32>()
                    .map_err(|_| "invalid value for --chunk-ms".to_string())?
                    .clamp(1, 1_000);
            }
            "--segments-dir" => {
                let Some(v) = it.next() else {
                    return Err("missing value for --segments-dir".into());
                };
                segments_dir = Some(PathBuf::from(v));
            }
            "--summary" => summary = true,
            "--help" | "-h" => {
                println!(
                    "Usage: voxgate-segment <input.wav> [--settings <file.json>] [--chunk-ms <n>] \\
  [--segments-dir <dir>] [--summary]"
                );
                std::process::exit(0);
            }
            other if other.starts_with("--") => {
                return Err(format!("unknown argument: {other}"));
            }
            other => {
                if input.is_some() {
                    return Err(format!("unexpected extra input: {other}"));
                }
                input = Some(PathBuf::from(other));
            }
        }
    }

    let input = input.ok_or_else(|| "missing input WAV file".to_string())?;
    Ok(Args {
        input,
        settings,
        chunk_ms,
        segments_dir,
        summary,
    })
}

fn print_line(line: &EventLine) {
    match serde_json::to_string(line) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("failed to encode event: {e}"),
    }
}

/// Print events as they arrive; optionally write each segment to disk.
async fn report(
    mut events: tokio::sync::mpsc::Receiver<VadEvent>,
    stream: String,
    frame_ms: f64,
    segments_dir: Option<PathBuf>,
) -> voxgate::Result<usize> {
    let mut segments = 0usize;
    while let Some(event) = events.recv().await {
        let mut line = EventLine::new(event.name(), &stream);
        match &event {
            VadEvent::SpeechStart {
                probability,
                frame_index,
                ..
            } => {
                line.frame_index = Some(*frame_index);
                line.start_ms = Some(*frame_index as f64 * frame_ms);
                line.probability = Some(*probability);
            }
            VadEvent::Partial {
                probability,
                frame_count,
                duration_ms,
                ..
            } => {
                line.probability = Some(*probability);
                line.frame_count = Some(*frame_count);
                line.duration_ms = Some(*duration_ms);
            }
            VadEvent::SpeechSegment {
                audio,
                frame_count,
                duration_ms,
            } => {
                segments += 1;
                line.frame_count = Some(*frame_count);
                line.duration_ms = Some(*duration_ms);
                if let Some(dir) = &segments_dir {
                    std::fs::create_dir_all(dir)?;
                    let path = dir.join(format!("{stream}-{segments:04}.wav"));
                    audio.write_wav(&path)?;
                    line.file = Some(path.display().to_string());
                }
            }
            VadEvent::SpeechEnd {
                total_frames,
                total_duration_ms,
                speech_duration_ms,
            } => {
                line.frame_count = Some(*total_frames);
                line.duration_ms = Some(*total_duration_ms);
                line.speech_duration_ms = Some(*speech_duration_ms);
            }
        }
        print_line(&line);
    }
    Ok(segments)
}

async fn run(args: Args) -> voxgate::Result<()> {
    let settings = match &args.settings {
        Some(path) => VoxgateSettings::load(path)?,
        None => VoxgateSettings::default(),
    };
    let vad = &settings.vad;

    let source = PcmBuffer::read_wav(&args.input)?;
    info!(
        input = %args.input.display(),
        sample_rate = source.sample_rate(),
        channels = source.channels(),
        duration_ms = source.duration_ms(),
        "loaded input"
    );
    let audio = source.resample(vad.sample_rate, vad.channels)?;

    let stream_id = args
        .input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".into());
    let classifier = EnergyClassifier::new(&settings.energy)?;
    let (mut stream, events) = SpeechStream::spawn(
        stream_id.clone(),
        &settings,
        Box::new(classifier),
        Arc::new(TracingSink),
    )?;
    let reporter = tokio::spawn(report(
        events,
        stream_id,
        vad.frame_duration_ms(),
        args.segments_dir.clone(),
    ));

    let chunk_frames = (vad.sample_rate as u64 * args.chunk_ms as u64 / 1000).max(1) as usize;
    for chunk in audio.chunks(chunk_frames, 0, TailPolicy::Short) {
        // Offline input outruns the stream task; wait for ring space instead
        // of dropping audio.
        while stream.ring_vacancy() == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        stream.push(chunk)?;
    }

    let diagnostics = stream.close().await?;
    let segments = reporter
        .await
        .map_err(|e| voxgate::VoxgateError::Other(anyhow::anyhow!("reporter task failed: {e}")))??;
    info!(segments, "done");

    if args.summary {
        match serde_json::to_string(&diagnostics) {
            Ok(json) => eprintln!("{json}"),
            Err(e) => eprintln!("failed to encode summary: {e}"),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("voxgate=info")),
        )
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(2);
        }
    };

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("voxgate-segment failed: {e}");
            ExitCode::FAILURE
        }
    }
}
