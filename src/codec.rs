//! FFmpeg-backed [`CodecEngine`].
//!
//! [`FfmpegEngine`] pairs a libavcodec bitstream parser with an opened video
//! decoder. The parser splits arbitrary input chunks into coded units and
//! keeps partial units in its own buffer between calls; each finished unit
//! is copied into a reusable pending buffer and sent to the decoder.

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::os::raw::c_int;
use std::ptr;

use ffmpeg_next::{
    Error as FfmpegError, Packet,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    frame::Video as VideoFrame,
    util::error::EAGAIN,
};
use ffmpeg_sys_next::{AV_NOPTS_VALUE, AVCodecID, AVCodecParserContext};

use crate::{
    configuration::Compression,
    engine::{CodecEngine, ParseProgress},
    error::DecoderError,
};

/// Owned libavcodec parser context, closed on drop.
struct Parser {
    ptr: *mut AVCodecParserContext,
}

impl Parser {
    fn new(compression: Compression) -> Result<Self, DecoderError> {
        let codec_id: AVCodecID = compression.to_codec_id().into();
        // SAFETY: av_parser_init only looks up a registered parser; a null
        // return means none exists for this id.
        let ptr = unsafe { ffmpeg_sys_next::av_parser_init(codec_id as c_int) };
        if ptr.is_null() {
            return Err(DecoderError::ParserInitFailed(compression.to_string()));
        }
        Ok(Self { ptr })
    }

    /// Run one parse step. A null `input` flushes the parser.
    ///
    /// Returns the raw consumed count and the completed unit, if any. The
    /// unit slice borrows either parser memory or `input` and is only valid
    /// until the next call.
    fn parse<'a>(
        &'a mut self,
        context: &mut CodecContext,
        input: Option<&'a [u8]>,
    ) -> (c_int, &'a [u8]) {
        let (buffer, length) = match input {
            Some(bytes) => (bytes.as_ptr(), bytes.len().min(c_int::MAX as usize) as c_int),
            None => (ptr::null(), 0),
        };
        let mut unit_data: *mut u8 = ptr::null_mut();
        let mut unit_size: c_int = 0;

        // SAFETY: `self.ptr` is a live parser and `context` a live codec
        // context; `buffer` is valid for `length` bytes or null with zero
        // length, which requests a flush.
        let consumed = unsafe {
            ffmpeg_sys_next::av_parser_parse2(
                self.ptr,
                context.as_mut_ptr(),
                &mut unit_data,
                &mut unit_size,
                buffer,
                length,
                AV_NOPTS_VALUE,
                AV_NOPTS_VALUE,
                0,
            )
        };

        let unit = if unit_data.is_null() || unit_size <= 0 {
            &[][..]
        } else {
            // SAFETY: the parser guarantees `unit_data` points at
            // `unit_size` readable bytes until its next invocation, which
            // the borrow on `self` rules out.
            unsafe { std::slice::from_raw_parts(unit_data, unit_size as usize) }
        };
        (consumed, unit)
    }
}

impl Drop for Parser {
    fn drop(&mut self) {
        // SAFETY: `self.ptr` came from av_parser_init and is closed once.
        unsafe { ffmpeg_sys_next::av_parser_close(self.ptr) };
    }
}

/// Incremental H.264/H.265 decoder built on libavcodec.
///
/// Holds the codec context, the parser, a pending coded-unit buffer and a
/// scratch picture reused for every decoded frame. All of them are
/// released when the engine is dropped.
pub struct FfmpegEngine {
    decoder: VideoDecoder,
    parser: Parser,
    compression: Compression,
    pending: Vec<u8>,
    picture: VideoFrame,
}

impl Debug for FfmpegEngine {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("FfmpegEngine")
            .field("compression", &self.compression)
            .field("pending_len", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl FfmpegEngine {
    /// Open a decoder and parser for `compression`.
    ///
    /// `thread_count` is forwarded to the codec context; 1 disables
    /// threading.
    ///
    /// # Errors
    ///
    /// - [`DecoderError::EngineUnavailable`] if FFmpeg has no decoder for
    ///   the standard.
    /// - [`DecoderError::ContextAllocationFailed`] if the codec context
    ///   cannot be allocated.
    /// - [`DecoderError::ContextOpenFailed`] if the decoder refuses to open.
    /// - [`DecoderError::ParserInitFailed`] if no parser can be created.
    pub fn open(compression: Compression, thread_count: usize) -> Result<Self, DecoderError> {
        crate::ffmpeg::initialize()?;

        let codec = ffmpeg_next::decoder::find(compression.to_codec_id())
            .ok_or_else(|| DecoderError::EngineUnavailable(compression.to_string()))?;
        let codec_name = codec.name().to_string();

        // SAFETY: `codec` is a registered decoder; a null return signals
        // allocation failure.
        let raw_context = unsafe { ffmpeg_sys_next::avcodec_alloc_context3(codec.as_ptr()) };
        if raw_context.is_null() {
            return Err(DecoderError::ContextAllocationFailed);
        }
        // SAFETY: `raw_context` is a fresh, unopened context we own. Wrapping
        // it without an owner hands freeing over to the wrapper's drop.
        let context = unsafe {
            (*raw_context).thread_count = thread_count.min(c_int::MAX as usize) as c_int;
            CodecContext::wrap(raw_context, None)
        };

        let decoder = context
            .decoder()
            .open_as(codec)
            .and_then(|opened| opened.video())
            .map_err(|error| DecoderError::ContextOpenFailed(error.to_string()))?;

        let parser = Parser::new(compression)?;

        log::debug!(
            "Opened {} engine (decoder={}, threads={})",
            compression,
            codec_name,
            thread_count
        );

        Ok(Self {
            decoder,
            parser,
            compression,
            pending: Vec::new(),
            picture: VideoFrame::empty(),
        })
    }

    /// The compression standard this engine decodes.
    pub fn compression(&self) -> Compression {
        self.compression
    }

    fn run_parser(&mut self, input: Option<&[u8]>) -> Result<ParseProgress, DecoderError> {
        let (consumed, unit) = self.parser.parse(&mut self.decoder, input);
        if consumed < 0 {
            return Err(DecoderError::StreamCorrupted { code: consumed });
        }

        let unit_ready = !unit.is_empty();
        if unit_ready {
            self.pending.clear();
            self.pending
                .try_reserve(unit.len())
                .map_err(|_| DecoderError::PacketAllocationFailed { size: unit.len() })?;
            self.pending.extend_from_slice(unit);
            log::trace!("Parsed {} unit of {} bytes", self.compression, unit.len());
        }

        Ok(ParseProgress {
            consumed: consumed as usize,
            unit_ready,
        })
    }
}

impl CodecEngine for FfmpegEngine {
    type Picture = VideoFrame;

    fn parse(&mut self, input: &[u8]) -> Result<ParseProgress, DecoderError> {
        self.run_parser(Some(input))
    }

    fn flush_parser(&mut self) -> Result<ParseProgress, DecoderError> {
        self.run_parser(None)
    }

    fn decode_unit(&mut self) -> Result<(), DecoderError> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let packet = Packet::copy(&self.pending);
        self.pending.clear();
        self.decoder
            .send_packet(&packet)
            .map_err(|error| DecoderError::UnitDecodeFailed(error.to_string()))
    }

    fn end_of_stream(&mut self) -> Result<(), DecoderError> {
        match self.decoder.send_eof() {
            Ok(()) | Err(FfmpegError::Eof) => Ok(()),
            Err(error) => Err(error.into()),
        }
    }

    fn receive_picture(&mut self) -> Result<Option<&VideoFrame>, DecoderError> {
        match self.decoder.receive_frame(&mut self.picture) {
            Ok(()) => Ok(Some(&self.picture)),
            Err(FfmpegError::Eof) => Ok(None),
            Err(FfmpegError::Other { errno }) if errno == EAGAIN => Ok(None),
            Err(error) => Err(DecoderError::UnitDecodeFailed(error.to_string())),
        }
    }

    fn reset(&mut self) -> Result<(), DecoderError> {
        // SAFETY: the decoder context is open; flushing drops buffered
        // pictures and leaves draining mode.
        unsafe { ffmpeg_sys_next::avcodec_flush_buffers(self.decoder.as_mut_ptr()) };
        self.parser = Parser::new(self.compression)?;
        self.pending.clear();
        log::debug!("Reset {} engine", self.compression);
        Ok(())
    }
}
