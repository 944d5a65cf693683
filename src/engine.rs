//! The decoding-engine seam.
//!
//! [`CodecEngine`] is everything the [`FrameAssembler`](crate::FrameAssembler)
//! needs from a bitstream decoder: split incoming bytes into coded units,
//! decode a ready unit, and hand back finished pictures. The production
//! implementation is [`FfmpegEngine`](crate::FfmpegEngine); tests drive the
//! assembler with in-memory engines.

use ffmpeg_next::{format::Pixel, frame::Video as VideoFrame};

use crate::error::DecoderError;

/// Result of one incremental parse step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParseProgress {
    /// Input bytes the parser took ownership of.
    pub consumed: usize,
    /// Whether a complete coded unit is now pending for
    /// [`CodecEngine::decode_unit`].
    pub unit_ready: bool,
}

impl ParseProgress {
    /// No bytes consumed and nothing ready.
    pub fn stalled(&self) -> bool {
        self.consumed == 0 && !self.unit_ready
    }
}

/// A decoded picture in the engine's native format.
pub trait NativePicture {
    /// Width in pixels, as coded in the stream.
    fn width(&self) -> u32;

    /// Height in pixels, as coded in the stream.
    fn height(&self) -> u32;

    /// Native pixel format, e.g. `YUV420P`.
    fn format(&self) -> Pixel;
}

impl NativePicture for VideoFrame {
    fn width(&self) -> u32 {
        VideoFrame::width(self)
    }

    fn height(&self) -> u32 {
        VideoFrame::height(self)
    }

    fn format(&self) -> Pixel {
        VideoFrame::format(self)
    }
}

/// An incremental bitstream decoder for one compression standard.
///
/// Implementations keep undigested input and partial units internally, so
/// callers may split the stream at any byte. Resources are released on
/// drop.
pub trait CodecEngine {
    /// Picture type produced by [`receive_picture`](CodecEngine::receive_picture).
    type Picture: NativePicture;

    /// Feed bytes to the parser.
    ///
    /// The parser consumes a prefix of `input` (possibly all of it,
    /// possibly none) and reports whether a coded unit became ready.
    ///
    /// # Errors
    ///
    /// A stream-fatal error such as [`DecoderError::StreamCorrupted`] when
    /// the parser reports negative progress.
    fn parse(&mut self, input: &[u8]) -> Result<ParseProgress, DecoderError>;

    /// Signal end of input to the parser, releasing any unit it still
    /// buffers.
    ///
    /// # Errors
    ///
    /// Stream-fatal errors, as for [`parse`](CodecEngine::parse).
    fn flush_parser(&mut self) -> Result<ParseProgress, DecoderError>;

    /// Decode the pending coded unit.
    ///
    /// # Errors
    ///
    /// [`DecoderError::UnitDecodeFailed`] if only this unit is damaged.
    fn decode_unit(&mut self) -> Result<(), DecoderError>;

    /// Tell the decoder no more units follow, so delayed pictures drain.
    ///
    /// # Errors
    ///
    /// Any error the decoder reports while entering draining mode.
    fn end_of_stream(&mut self) -> Result<(), DecoderError>;

    /// Take the next finished picture, or `None` if the decoder needs more
    /// input. The picture stays valid until the next call on the engine.
    ///
    /// # Errors
    ///
    /// [`DecoderError::UnitDecodeFailed`] if decoding a buffered picture
    /// failed.
    fn receive_picture(&mut self) -> Result<Option<&Self::Picture>, DecoderError>;

    /// Drop all parser and decoder state so a new stream can start.
    ///
    /// # Errors
    ///
    /// Construction-class errors if parser state cannot be rebuilt.
    fn reset(&mut self) -> Result<(), DecoderError>;
}
