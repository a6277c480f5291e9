use thiserror::Error;

use crate::audio::SampleEncoding;

/// All errors produced by voxgate.
///
/// Variants raised on a live stream or track carry its identifier so a
/// failure on one participant is never confused with another's.
#[derive(Debug, Error)]
pub enum VoxgateError {
    #[error("invalid sample rate: {0} Hz")]
    InvalidSampleRate(u32),

    #[error("invalid channel count: {0}")]
    InvalidChannels(u16),

    #[error("declared encoding {declared:?} does not match sample storage {actual:?}")]
    DtypeMismatch {
        declared: SampleEncoding,
        actual: SampleEncoding,
    },

    #[error("{len} samples cannot be split evenly across {channels} channels")]
    UnevenChannels { len: usize, channels: u16 },

    #[error("{len} bytes is not a whole number of {frame_bytes}-byte sample frames")]
    InvalidByteLength { len: usize, frame_bytes: usize },

    #[error("buffers are not compatible: {0}")]
    IncompatibleBuffers(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("classifier requires {required}-sample frames, configured frame size is {configured}")]
    UnsupportedFrameSize { required: usize, configured: usize },

    #[error("stream {stream_id}: expected {expected} Hz audio, got {actual} Hz")]
    SampleRateMismatch {
        stream_id: String,
        expected: u32,
        actual: u32,
    },

    #[error("stream {stream_id}: expected {expected} channel(s), got {actual}")]
    ChannelMismatch {
        stream_id: String,
        expected: u16,
        actual: u16,
    },

    #[error("classifier error: {0}")]
    Classifier(String),

    #[error("resampler error: {0}")]
    Resampler(String),

    #[error("stream {stream_id}: inbound ring is full")]
    InboundOverflow { stream_id: String },

    #[error("stream {0} is closed")]
    StreamClosed(String),

    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, VoxgateError>;
