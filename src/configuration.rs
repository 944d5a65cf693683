//! Decoder configuration.
//!
//! [`DecoderOptions`] is a builder carrying everything fixed for the
//! lifetime of a [`Decoder`](crate::Decoder): target pixel layout,
//! compression standard, scaling filter, row alignment and codec threading.
//!
//! # Example
//!
//! ```no_run
//! use h26x_stream::{Compression, Decoder, DecoderOptions, PixelFormat, ScalingFilter};
//!
//! let options = DecoderOptions::new()
//!     .with_compression(Compression::H265)
//!     .with_pixel_format(PixelFormat::Bgr)
//!     .with_scaling_filter(ScalingFilter::Bicubic)
//!     .with_row_alignment(32);
//!
//! let decoder = Decoder::with_options(options)?;
//! # Ok::<(), h26x_stream::DecoderError>(())
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use ffmpeg_next::{codec::Id, format::Pixel, software::scaling::Flags as ScalingFlags};

use crate::{conversion, error::DecoderError};

/// Packed 24-bit output layout of decoded frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelFormat {
    /// Red, green, blue byte order. This is the default.
    #[default]
    Rgb,
    /// Blue, green, red byte order.
    Bgr,
}

impl PixelFormat {
    /// Bytes occupied by one pixel.
    pub const fn bytes_per_pixel(self) -> usize {
        3
    }

    /// Map to the corresponding FFmpeg pixel format constant.
    pub(crate) fn to_ffmpeg_pixel(self) -> Pixel {
        match self {
            PixelFormat::Rgb => Pixel::RGB24,
            PixelFormat::Bgr => Pixel::BGR24,
        }
    }
}

impl Display for PixelFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            PixelFormat::Rgb => f.write_str("rgb24"),
            PixelFormat::Bgr => f.write_str("bgr24"),
        }
    }
}

impl FromStr for PixelFormat {
    type Err = DecoderError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "rgb" | "rgb24" => Ok(PixelFormat::Rgb),
            "bgr" | "bgr24" => Ok(PixelFormat::Bgr),
            _ => Err(DecoderError::UnsupportedPixelFormat(value.to_string())),
        }
    }
}

impl TryFrom<Pixel> for PixelFormat {
    type Error = DecoderError;

    fn try_from(pixel: Pixel) -> Result<Self, Self::Error> {
        match pixel {
            Pixel::RGB24 => Ok(PixelFormat::Rgb),
            Pixel::BGR24 => Ok(PixelFormat::Bgr),
            other => Err(DecoderError::UnsupportedPixelFormat(format!("{other:?}"))),
        }
    }
}

/// Compression standard of the incoming elementary stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Compression {
    /// H.264 / AVC. This is the default.
    #[default]
    H264,
    /// H.265 / HEVC.
    H265,
}

impl Compression {
    /// Map to the corresponding FFmpeg codec id.
    pub(crate) fn to_codec_id(self) -> Id {
        match self {
            Compression::H264 => Id::H264,
            Compression::H265 => Id::HEVC,
        }
    }
}

impl Display for Compression {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Compression::H264 => f.write_str("H.264"),
            Compression::H265 => f.write_str("H.265"),
        }
    }
}

impl FromStr for Compression {
    type Err = DecoderError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().replace('.', "").as_str() {
            "h264" | "avc" => Ok(Compression::H264),
            "h265" | "hevc" => Ok(Compression::H265),
            _ => Err(DecoderError::UnsupportedCompression(value.to_string())),
        }
    }
}

impl TryFrom<Id> for Compression {
    type Error = DecoderError;

    fn try_from(id: Id) -> Result<Self, Self::Error> {
        match id {
            Id::H264 => Ok(Compression::H264),
            Id::HEVC => Ok(Compression::H265),
            other => Err(DecoderError::UnsupportedCompression(format!("{other:?}"))),
        }
    }
}

/// Interpolation filter used when converting decoded pictures.
///
/// Source and destination geometry are always equal, so the filter only
/// affects chroma upsampling. The choice is fixed for the decoder lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScalingFilter {
    /// Bilinear interpolation. This is the default.
    #[default]
    Bilinear,
    /// Faster, lower-precision bilinear interpolation.
    FastBilinear,
    /// Bicubic interpolation.
    Bicubic,
    /// Nearest-neighbour sampling.
    Point,
    /// Area averaging.
    Area,
}

impl ScalingFilter {
    pub(crate) fn to_ffmpeg_flags(self) -> ScalingFlags {
        match self {
            ScalingFilter::Bilinear => ScalingFlags::BILINEAR,
            ScalingFilter::FastBilinear => ScalingFlags::FAST_BILINEAR,
            ScalingFilter::Bicubic => ScalingFlags::BICUBIC,
            ScalingFilter::Point => ScalingFlags::POINT,
            ScalingFilter::Area => ScalingFlags::AREA,
        }
    }
}

/// Largest accepted row alignment, in bytes.
pub const MAX_ROW_ALIGNMENT: usize = 4096;

/// Settings fixed at [`Decoder`](crate::Decoder) construction.
///
/// All fields have defaults: RGB output, H.264 input, bilinear filter,
/// tightly packed rows and a single codec thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderOptions {
    pub(crate) pixel_format: PixelFormat,
    pub(crate) compression: Compression,
    pub(crate) scaling_filter: ScalingFilter,
    pub(crate) row_alignment: usize,
    pub(crate) thread_count: usize,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl DecoderOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self {
            pixel_format: PixelFormat::default(),
            compression: Compression::default(),
            scaling_filter: ScalingFilter::default(),
            row_alignment: 1,
            thread_count: 1,
        }
    }

    /// Set the output pixel layout.
    #[must_use]
    pub fn with_pixel_format(mut self, format: PixelFormat) -> Self {
        self.pixel_format = format;
        self
    }

    /// Set the compression standard of the input stream.
    #[must_use]
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Set the conversion filter.
    #[must_use]
    pub fn with_scaling_filter(mut self, filter: ScalingFilter) -> Self {
        self.scaling_filter = filter;
        self
    }

    /// Pad every output row to a multiple of `alignment` bytes.
    ///
    /// Rounded up to the next power of two and clamped to
    /// `1..=`[`MAX_ROW_ALIGNMENT`]; 1 means no padding.
    #[must_use]
    pub fn with_row_alignment(mut self, alignment: usize) -> Self {
        self.row_alignment = conversion::normalize_alignment(alignment);
        self
    }

    /// Number of codec worker threads. Clamped to a minimum of 1.
    ///
    /// More than one thread lets FFmpeg use frame threading, which delays
    /// output by up to `count - 1` pictures; call
    /// [`Decoder::finish`](crate::Decoder::finish) at end of stream to
    /// collect them.
    #[must_use]
    pub fn with_thread_count(mut self, count: usize) -> Self {
        self.thread_count = count.max(1);
        self
    }

    /// The configured output pixel layout.
    pub fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }

    /// The configured compression standard.
    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// The configured scaling filter.
    pub fn scaling_filter(&self) -> ScalingFilter {
        self.scaling_filter
    }

    /// The configured row alignment in bytes.
    pub fn row_alignment(&self) -> usize {
        self.row_alignment
    }

    /// The configured codec thread count.
    pub fn thread_count(&self) -> usize {
        self.thread_count
    }
}
