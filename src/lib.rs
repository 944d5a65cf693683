//! # h26x-stream
//!
//! Incremental decoding of H.264/H.265 elementary streams into packed RGB24
//! or BGR24 frames, powered by FFmpeg via the
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate.
//!
//! Bytes arrive in chunks of any size, for instance straight off a socket
//! or a file read loop. The [`Decoder`] keeps partial coded units between
//! calls and returns every frame each chunk completes.
//!
//! ## Quick Start
//!
//! ```no_run
//! use h26x_stream::{Compression, Decoder, PixelFormat};
//!
//! let mut decoder = Decoder::new(PixelFormat::Rgb, Compression::H264)?;
//! let stream = std::fs::read("stream.h264")?;
//!
//! for chunk in stream.chunks(2048) {
//!     for frame in decoder.decode(chunk)?.frames {
//!         println!("{}x{} (stride {})", frame.width(), frame.height(), frame.stride());
//!     }
//! }
//! for frame in decoder.finish()?.frames {
//!     frame.save("last_frame.png")?;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Layers
//!
//! - [`CodecEngine`] parses and decodes; [`FfmpegEngine`] is the libavcodec
//!   implementation.
//! - [`ColorConverter`] turns native pictures into packed frames;
//!   [`ScalingConverter`] is the libswscale implementation.
//! - [`FrameAssembler`] drives both over each chunk and is generic, so it
//!   can run against any engine.
//! - [`Decoder`] bundles the FFmpeg pieces behind a small API.
//!
//! ## Errors
//!
//! A damaged unit does not stop decoding: it is listed in
//! [`DecodeOutput::unit_errors`] and the remaining input is still scanned.
//! Only stream-fatal errors abort a call, returned as a [`DecodeFailure`]
//! that keeps the frames produced before the abort.
//!
//! ## Requirements
//!
//! FFmpeg development libraries (libavcodec, libavutil, libswscale) must be
//! installed on the system.

pub mod assembler;
pub mod codec;
pub mod configuration;
mod conversion;
pub mod converter;
pub mod decoder;
pub mod engine;
pub mod error;
pub mod ffmpeg;
pub mod frame;

pub use assembler::{
    AssemblerStatistics, DecodeFailure, DecodeOutput, FrameAssembler,
    MAX_CONSECUTIVE_PICTURE_ERRORS,
};
pub use codec::FfmpegEngine;
pub use configuration::{
    Compression, DecoderOptions, MAX_ROW_ALIGNMENT, PixelFormat, ScalingFilter,
};
pub use converter::{ColorConverter, ScalingConverter};
pub use decoder::Decoder;
pub use engine::{CodecEngine, NativePicture, ParseProgress};
pub use error::DecoderError;
pub use ffmpeg::{FfmpegLogLevel, get_ffmpeg_log_level, set_ffmpeg_log_level};
pub use frame::{Frame, FrameView};
