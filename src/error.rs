//! Error types for the `h26x-stream` crate.
//!
//! [`DecoderError`] is the single error type returned by construction,
//! decoding and conversion. Decode calls that abort part-way wrap it in
//! [`DecodeFailure`](crate::DecodeFailure) together with the output produced
//! before the abort.

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

/// The unified error type for all `h26x-stream` operations.
///
/// Variants split into three groups: construction failures (the decoder is
/// never handed out), unit-local decode failures (the stream stays
/// parseable), and stream-fatal failures (the current call stops).
/// [`is_stream_fatal`](DecoderError::is_stream_fatal) tells them apart.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DecoderError {
    /// The requested compression standard is not H.264 or H.265.
    #[error("Unsupported compression: {0}")]
    UnsupportedCompression(String),

    /// The requested output pixel layout is not RGB24 or BGR24.
    #[error("Unsupported pixel format: {0}")]
    UnsupportedPixelFormat(String),

    /// FFmpeg has no decoder registered for the compression standard.
    #[error("No decoder available for {0}")]
    EngineUnavailable(String),

    /// The codec context could not be allocated.
    #[error("Failed to allocate codec context")]
    ContextAllocationFailed,

    /// The codec context was allocated but refused to open.
    #[error("Failed to open codec context: {0}")]
    ContextOpenFailed(String),

    /// The bitstream parser could not be initialised.
    #[error("Failed to initialise bitstream parser for {0}")]
    ParserInitFailed(String),

    /// The pending coded-unit buffer could not be grown.
    #[error("Failed to allocate {size} bytes for a coded unit")]
    PacketAllocationFailed {
        /// Number of bytes that were requested.
        size: usize,
    },

    /// A single coded unit failed to decode. The stream may resynchronise
    /// on a later unit.
    #[error("Failed to decode coded unit: {0}")]
    UnitDecodeFailed(String),

    /// The parser reported negative progress; the stream cannot be scanned
    /// any further in this call.
    #[error("Bitstream parser failed with code {code}")]
    StreamCorrupted {
        /// Raw FFmpeg return value.
        code: i32,
    },

    /// The output buffer for a converted picture could not be allocated.
    #[error("Failed to allocate {size} bytes for a converted frame")]
    BufferAllocationFailed {
        /// Number of bytes that were requested.
        size: usize,
    },

    /// A decoded picture could not be converted to the target layout.
    #[error("Failed to convert picture: {0}")]
    ConversionFailed(String),

    /// The decoder has been closed.
    #[error("Decoder is closed")]
    Closed,

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An error from the `image` crate while encoding a frame.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),
}

impl DecoderError {
    /// Whether this error ends the current decode call.
    ///
    /// Unit-local failures ([`UnitDecodeFailed`](DecoderError::UnitDecodeFailed),
    /// [`ConversionFailed`](DecoderError::ConversionFailed)) return `false`:
    /// they are collected and scanning goes on.
    pub fn is_stream_fatal(&self) -> bool {
        !matches!(
            self,
            DecoderError::UnitDecodeFailed(_) | DecoderError::ConversionFailed(_)
        )
    }
}

impl From<FfmpegError> for DecoderError {
    fn from(error: FfmpegError) -> Self {
        DecoderError::FfmpegError(error.to_string())
    }
}
