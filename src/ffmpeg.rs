//! Process-wide FFmpeg setup.
//!
//! [`initialize`] performs FFmpeg's global registration exactly once per
//! process. [`Decoder`](crate::Decoder) construction calls it, so explicit
//! use is only needed to surface initialisation errors early.
//!
//! FFmpeg also writes its own diagnostics to stderr, independent of the
//! Rust [`log`](https://crates.io/crates/log) facade this crate reports
//! through. [`set_ffmpeg_log_level`] tunes that output.
//!
//! # Example
//!
//! ```no_run
//! use h26x_stream::{Compression, Decoder, FfmpegLogLevel, PixelFormat};
//!
//! h26x_stream::ffmpeg::initialize()?;
//! h26x_stream::set_ffmpeg_log_level(FfmpegLogLevel::Error);
//!
//! let decoder = Decoder::new(PixelFormat::Rgb, Compression::H264)?;
//! # Ok::<(), h26x_stream::DecoderError>(())
//! ```

use std::sync::OnceLock;

use ffmpeg_next::util::log::Level;

use crate::error::DecoderError;

static INITIALIZED: OnceLock<Result<(), String>> = OnceLock::new();

/// Initialise FFmpeg for this process.
///
/// The first call does the work; later calls return the cached outcome.
///
/// # Errors
///
/// Returns [`DecoderError::FfmpegError`] if FFmpeg initialisation failed.
pub fn initialize() -> Result<(), DecoderError> {
    INITIALIZED
        .get_or_init(|| {
            log::debug!("Initialising FFmpeg");
            ffmpeg_next::init().map_err(|error| error.to_string())
        })
        .clone()
        .map_err(DecoderError::FfmpegError)
}

/// FFmpeg internal log verbosity, most quiet first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FfmpegLogLevel {
    /// No output at all.
    Quiet,
    /// Conditions that abort the process.
    Panic,
    /// Unrecoverable errors.
    Fatal,
    /// Recoverable errors, such as a damaged slice.
    Error,
    /// Warnings (FFmpeg's default).
    Warning,
    /// Informational messages.
    Info,
    /// Verbose informational messages.
    Verbose,
    /// Debugging messages.
    Debug,
    /// Extremely verbose tracing.
    Trace,
}

impl From<FfmpegLogLevel> for Level {
    fn from(level: FfmpegLogLevel) -> Self {
        match level {
            FfmpegLogLevel::Quiet => Level::Quiet,
            FfmpegLogLevel::Panic => Level::Panic,
            FfmpegLogLevel::Fatal => Level::Fatal,
            FfmpegLogLevel::Error => Level::Error,
            FfmpegLogLevel::Warning => Level::Warning,
            FfmpegLogLevel::Info => Level::Info,
            FfmpegLogLevel::Verbose => Level::Verbose,
            FfmpegLogLevel::Debug => Level::Debug,
            FfmpegLogLevel::Trace => Level::Trace,
        }
    }
}

impl From<Level> for FfmpegLogLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::Quiet => FfmpegLogLevel::Quiet,
            Level::Panic => FfmpegLogLevel::Panic,
            Level::Fatal => FfmpegLogLevel::Fatal,
            Level::Error => FfmpegLogLevel::Error,
            Level::Warning => FfmpegLogLevel::Warning,
            Level::Info => FfmpegLogLevel::Info,
            Level::Verbose => FfmpegLogLevel::Verbose,
            Level::Debug => FfmpegLogLevel::Debug,
            Level::Trace => FfmpegLogLevel::Trace,
        }
    }
}

/// Set FFmpeg's own stderr verbosity. Does not affect `log` output.
pub fn set_ffmpeg_log_level(level: FfmpegLogLevel) {
    ffmpeg_next::util::log::set_level(level.into());
}

/// Current FFmpeg stderr verbosity, or `None` if FFmpeg reports a level
/// with no matching variant.
pub fn get_ffmpeg_log_level() -> Option<FfmpegLogLevel> {
    ffmpeg_next::util::log::get_level().ok().map(FfmpegLogLevel::from)
}
