//! Color conversion of decoded pictures.
//!
//! [`ColorConverter`] turns a native decoder picture into a packed 24-bit
//! buffer the caller allocated. [`ScalingConverter`] implements it with
//! libswscale, caching the scaling context across pictures of the same
//! geometry and source format.

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::os::raw::c_int;
use std::ptr;

use ffmpeg_next::{
    format::Pixel, frame::Video as VideoFrame, software::scaling::Context as ScalingContext,
};

use crate::{
    configuration::{PixelFormat, ScalingFilter},
    conversion,
    engine::NativePicture,
    error::DecoderError,
};

/// Converts native pictures of type `P` into a fixed packed layout.
pub trait ColorConverter<P: NativePicture + ?Sized> {
    /// The output layout.
    fn pixel_format(&self) -> PixelFormat;

    /// Exact byte length of one converted picture of this geometry,
    /// including row padding.
    ///
    /// # Errors
    ///
    /// [`DecoderError::ConversionFailed`] for zero or overflowing geometry.
    fn predict_size(&self, width: u32, height: u32) -> Result<usize, DecoderError>;

    /// Convert `picture` into `output`, which must be exactly
    /// [`predict_size`](ColorConverter::predict_size) bytes long. Returns
    /// the row stride used.
    ///
    /// # Errors
    ///
    /// [`DecoderError::ConversionFailed`] if the geometry is invalid, the
    /// buffer has the wrong length or the conversion itself fails.
    fn convert(&mut self, picture: &P, output: &mut [u8]) -> Result<usize, DecoderError>;
}

/// Geometry and source format a scaling context was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ContextKey {
    width: u32,
    height: u32,
    format: Pixel,
}

struct CachedContext {
    key: ContextKey,
    scaler: ScalingContext,
}

/// libswscale-backed [`ColorConverter`] for [`VideoFrame`] pictures.
///
/// The scaling context is built on the first conversion and rebuilt only
/// when width, height or source pixel format change. Output geometry always
/// equals input geometry.
pub struct ScalingConverter {
    pixel_format: PixelFormat,
    filter: ScalingFilter,
    row_alignment: usize,
    context: Option<CachedContext>,
    context_builds: u64,
}

impl Debug for ScalingConverter {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ScalingConverter")
            .field("pixel_format", &self.pixel_format)
            .field("filter", &self.filter)
            .field("row_alignment", &self.row_alignment)
            .field("cached", &self.context.as_ref().map(|cached| cached.key))
            .field("context_builds", &self.context_builds)
            .finish()
    }
}

impl ScalingConverter {
    /// Create a converter. No scaling context is built until the first
    /// [`convert`](ColorConverter::convert).
    ///
    /// `row_alignment` is rounded up to a power of two and clamped to
    /// `1..=`[`MAX_ROW_ALIGNMENT`](crate::MAX_ROW_ALIGNMENT).
    pub fn new(pixel_format: PixelFormat, filter: ScalingFilter, row_alignment: usize) -> Self {
        Self {
            pixel_format,
            filter,
            row_alignment: conversion::normalize_alignment(row_alignment),
            context: None,
            context_builds: 0,
        }
    }

    /// How many scaling contexts have been built so far.
    pub fn context_builds(&self) -> u64 {
        self.context_builds
    }

    /// Whether a scaling context is currently cached.
    pub fn has_context(&self) -> bool {
        self.context.is_some()
    }

    /// Drop the cached scaling context.
    pub fn release(&mut self) {
        if self.context.take().is_some() {
            log::debug!("Released scaling context");
        }
    }

    /// Row stride for a picture `width` pixels wide.
    pub fn stride(&self, width: u32) -> usize {
        conversion::packed_stride(
            width,
            self.pixel_format.bytes_per_pixel(),
            self.row_alignment,
        )
    }

    fn scaler_for(&mut self, key: ContextKey) -> Result<&mut ScalingContext, DecoderError> {
        let cached = match self.context.take() {
            Some(cached) if cached.key == key => cached,
            previous => {
                log::debug!(
                    "Building scaling context {:?} {}x{} -> {} (previous={:?})",
                    key.format,
                    key.width,
                    key.height,
                    self.pixel_format,
                    previous.as_ref().map(|cached| cached.key),
                );
                drop(previous);
                let scaler = ScalingContext::get(
                    key.format,
                    key.width,
                    key.height,
                    self.pixel_format.to_ffmpeg_pixel(),
                    key.width,
                    key.height,
                    self.filter.to_ffmpeg_flags(),
                )
                .map_err(|error| {
                    DecoderError::ConversionFailed(format!(
                        "cannot build scaling context for {:?} {}x{}: {error}",
                        key.format, key.width, key.height
                    ))
                })?;
                self.context_builds += 1;
                CachedContext { key, scaler }
            }
        };
        Ok(&mut self.context.insert(cached).scaler)
    }
}

impl ColorConverter<VideoFrame> for ScalingConverter {
    fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }

    fn predict_size(&self, width: u32, height: u32) -> Result<usize, DecoderError> {
        if width == 0 || height == 0 {
            return Err(DecoderError::ConversionFailed(format!(
                "invalid picture geometry {width}x{height}"
            )));
        }
        conversion::packed_size(
            width,
            height,
            self.pixel_format.bytes_per_pixel(),
            self.row_alignment,
        )
        .ok_or_else(|| {
            DecoderError::ConversionFailed(format!("picture {width}x{height} is too large"))
        })
    }

    fn convert(&mut self, picture: &VideoFrame, output: &mut [u8]) -> Result<usize, DecoderError> {
        let key = ContextKey {
            width: NativePicture::width(picture),
            height: NativePicture::height(picture),
            format: NativePicture::format(picture),
        };
        let expected = self.predict_size(key.width, key.height)?;
        if output.len() != expected {
            return Err(DecoderError::ConversionFailed(format!(
                "output buffer is {} bytes, expected {expected}",
                output.len()
            )));
        }
        let stride = self.stride(key.width);
        let line_size = c_int::try_from(stride).map_err(|_| {
            DecoderError::ConversionFailed(format!("stride {stride} exceeds FFmpeg limits"))
        })?;
        let rows = c_int::try_from(key.height).map_err(|_| {
            DecoderError::ConversionFailed(format!("height {} exceeds FFmpeg limits", key.height))
        })?;

        let scaler = self.scaler_for(key)?;
        let planes: [*mut u8; 4] = [
            output.as_mut_ptr(),
            ptr::null_mut(),
            ptr::null_mut(),
            ptr::null_mut(),
        ];
        let line_sizes: [c_int; 4] = [line_size, 0, 0, 0];

        // SAFETY: the scaler was built for this picture's geometry and
        // format; `output` holds `stride * height` bytes, enough for every
        // destination row; source planes and line sizes come from a frame
        // the decoder just filled.
        let written = unsafe {
            let source = picture.as_ptr();
            ffmpeg_sys_next::sws_scale(
                scaler.as_mut_ptr(),
                (*source).data.as_ptr() as *const *const u8,
                (*source).linesize.as_ptr(),
                0,
                rows,
                planes.as_ptr(),
                line_sizes.as_ptr(),
            )
        };

        if written != rows {
            return Err(DecoderError::ConversionFailed(format!(
                "scaler produced {written} of {rows} rows"
            )));
        }
        Ok(stride)
    }
}
