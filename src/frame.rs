//! Decoded frames and zero-copy views over them.
//!
//! A [`Frame`] owns one converted picture: a packed RGB24 or BGR24 buffer
//! whose rows may be padded past `width * 3` bytes. [`FrameView`] borrows
//! that buffer and implements [`image::GenericImageView`], so frames can be
//! handed to `image` operations without copying.
//!
//! # Example
//!
//! ```no_run
//! use h26x_stream::{Compression, Decoder, PixelFormat};
//! use image::GenericImageView;
//!
//! let mut decoder = Decoder::new(PixelFormat::Rgb, Compression::H264)?;
//! let chunk = std::fs::read("stream.h264")?;
//! for frame in decoder.decode(&chunk)?.frames {
//!     let view = frame.view();
//!     let thumbnail = image::imageops::thumbnail(&view, 64, 36);
//!     thumbnail.save("thumb.png")?;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::Path;

use image::{GenericImageView, Rgb, RgbImage};

use crate::{configuration::PixelFormat, conversion, error::DecoderError};

/// One decoded picture in a packed 24-bit layout.
///
/// `data().len() == stride() * height()` and `stride() >= width() * 3`
/// always hold. The buffer is owned by the frame alone; later decode calls
/// never touch it.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    stride: usize,
    pixel_format: PixelFormat,
}

impl Debug for Frame {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stride", &self.stride)
            .field("pixel_format", &self.pixel_format)
            .field("data_len", &self.data.len())
            .finish()
    }
}

impl Frame {
    /// Wrap a converted pixel buffer.
    ///
    /// # Errors
    ///
    /// Returns [`DecoderError::ConversionFailed`] if `stride` is shorter
    /// than a row of pixels or `data` is not exactly `stride * height`
    /// bytes long.
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        stride: usize,
        pixel_format: PixelFormat,
    ) -> Result<Self, DecoderError> {
        let row_bytes = width as usize * pixel_format.bytes_per_pixel();
        if stride < row_bytes {
            return Err(DecoderError::ConversionFailed(format!(
                "stride {stride} is shorter than a {width}-pixel row ({row_bytes} bytes)"
            )));
        }
        if Some(data.len()) != stride.checked_mul(height as usize) {
            return Err(DecoderError::ConversionFailed(format!(
                "buffer of {} bytes does not match stride {stride} x height {height}",
                data.len()
            )));
        }

        Ok(Self {
            data,
            width,
            height,
            stride,
            pixel_format,
        })
    }

    /// Raw pixel bytes, `stride * height` long.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Take ownership of the pixel buffer.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Picture width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Picture height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per row, including padding.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Byte order of each pixel.
    pub fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }

    /// Borrow the frame as a rectangular view at origin (0, 0).
    pub fn view(&self) -> FrameView<'_> {
        FrameView {
            data: &self.data,
            width: self.width,
            height: self.height,
            stride: self.stride,
            pixel_format: self.pixel_format,
        }
    }

    /// Copy the frame into a tightly-packed [`RgbImage`].
    ///
    /// Row padding is dropped and BGR frames are reordered to RGB.
    ///
    /// # Errors
    ///
    /// Returns [`DecoderError::ConversionFailed`] if the image buffer cannot
    /// be constructed.
    pub fn to_rgb_image(&self) -> Result<RgbImage, DecoderError> {
        let row_bytes = self.width as usize * self.pixel_format.bytes_per_pixel();
        let mut buffer = conversion::strip_row_padding(
            &self.data,
            self.stride,
            row_bytes,
            self.height as usize,
        );

        if self.pixel_format == PixelFormat::Bgr {
            for pixel in buffer.chunks_exact_mut(3) {
                pixel.swap(0, 2);
            }
        }

        RgbImage::from_raw(self.width, self.height, buffer).ok_or_else(|| {
            DecoderError::ConversionFailed(
                "Failed to construct RGB image from frame data".to_string(),
            )
        })
    }

    /// Encode the frame to an image file. The format is inferred from the
    /// file extension.
    ///
    /// # Errors
    ///
    /// Returns [`DecoderError::ImageError`] if encoding or writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), DecoderError> {
        self.to_rgb_image()?.save(path)?;
        Ok(())
    }
}

/// A borrowed, strided view over a [`Frame`]'s pixels.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
    stride: usize,
    pixel_format: PixelFormat,
}

impl<'a> FrameView<'a> {
    /// Bytes per row, including padding.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Byte order of each pixel.
    pub fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }

    /// The visible bytes of row `y`, without padding.
    ///
    /// # Panics
    ///
    /// Panics if `y >= height`.
    pub fn row(&self, y: u32) -> &'a [u8] {
        assert!(y < self.height, "row {y} out of bounds (height {})", self.height);
        let data = self.data;
        let start = y as usize * self.stride;
        &data[start..start + self.width as usize * self.pixel_format.bytes_per_pixel()]
    }

    /// Iterate over the visible bytes of every row, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &'a [u8]> + 'a {
        let data = self.data;
        let row_bytes = self.width as usize * self.pixel_format.bytes_per_pixel();
        data.chunks(self.stride.max(1))
            .take(self.height as usize)
            .map(move |row| &row[..row_bytes])
    }

    /// The three bytes of pixel `(x, y)` in stored order.
    pub fn raw_pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let offset = x as usize * 3;
        let row = self.row(y);
        [row[offset], row[offset + 1], row[offset + 2]]
    }
}

impl GenericImageView for FrameView<'_> {
    type Pixel = Rgb<u8>;

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn get_pixel(&self, x: u32, y: u32) -> Self::Pixel {
        let [a, b, c] = self.raw_pixel(x, y);
        match self.pixel_format {
            PixelFormat::Rgb => Rgb([a, b, c]),
            PixelFormat::Bgr => Rgb([c, b, a]),
        }
    }
}
