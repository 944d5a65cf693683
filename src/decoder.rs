//! The public streaming decoder.
//!
//! [`Decoder`] is a [`FrameAssembler`] over FFmpeg: an [`FfmpegEngine`] for
//! the chosen compression standard and a [`ScalingConverter`] for the chosen
//! output layout. Native resources are released by [`Decoder::close`] or,
//! failing that, when the decoder is dropped.

use std::fmt::{Debug, Formatter, Result as FmtResult};

use crate::{
    assembler::{AssemblerStatistics, DecodeFailure, DecodeOutput, FrameAssembler},
    codec::FfmpegEngine,
    configuration::{Compression, DecoderOptions, PixelFormat},
    converter::ScalingConverter,
    error::DecoderError,
};

/// Streaming H.264/H.265 decoder producing packed RGB or BGR frames.
///
/// Push chunks of an Annex-B elementary stream with
/// [`decode`](Decoder::decode); chunks may be any size and split the stream
/// at any byte. Call [`finish`](Decoder::finish) at end of stream to collect
/// pictures still buffered inside FFmpeg.
///
/// # Example
///
/// ```no_run
/// use std::{fs::File, io::Read};
///
/// use h26x_stream::{Compression, Decoder, PixelFormat};
///
/// let mut decoder = Decoder::new(PixelFormat::Rgb, Compression::H264)?;
/// let mut source = File::open("stream.h264")?;
/// let mut chunk = [0u8; 2048];
/// let mut frames = Vec::new();
///
/// loop {
///     let read = source.read(&mut chunk)?;
///     if read == 0 {
///         break;
///     }
///     let output = decoder.decode(&chunk[..read])?;
///     for error in &output.unit_errors {
///         eprintln!("skipped unit: {error}");
///     }
///     frames.extend(output.frames);
/// }
/// frames.extend(decoder.finish()?.frames);
/// decoder.close();
///
/// println!("decoded {} frames", frames.len());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Decoder {
    assembler: Option<FrameAssembler<FfmpegEngine, ScalingConverter>>,
    options: DecoderOptions,
    statistics: AssemblerStatistics,
}

impl Debug for Decoder {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Decoder")
            .field("options", &self.options)
            .field("closed", &self.is_closed())
            .field("statistics", &self.statistics())
            .finish()
    }
}

impl Decoder {
    /// Create a decoder with default options for the given output layout and
    /// compression standard.
    ///
    /// # Errors
    ///
    /// See [`with_options`](Decoder::with_options).
    pub fn new(pixel_format: PixelFormat, compression: Compression) -> Result<Self, DecoderError> {
        Self::with_options(
            DecoderOptions::new()
                .with_pixel_format(pixel_format)
                .with_compression(compression),
        )
    }

    /// Create a decoder from a full set of options.
    ///
    /// Initialises FFmpeg if needed, opens the codec and parser, and
    /// prepares a converter. The scaling context is built lazily once the
    /// first picture's geometry is known. Anything acquired before a
    /// failure is released before returning.
    ///
    /// # Errors
    ///
    /// - [`DecoderError::FfmpegError`] if FFmpeg initialisation fails.
    /// - [`DecoderError::EngineUnavailable`],
    ///   [`DecoderError::ContextAllocationFailed`],
    ///   [`DecoderError::ContextOpenFailed`] or
    ///   [`DecoderError::ParserInitFailed`] if the engine cannot be opened.
    pub fn with_options(options: DecoderOptions) -> Result<Self, DecoderError> {
        log::debug!("Creating decoder: {options:?}");

        let engine = FfmpegEngine::open(options.compression, options.thread_count)?;
        let converter = ScalingConverter::new(
            options.pixel_format,
            options.scaling_filter,
            options.row_alignment,
        );

        Ok(Self {
            assembler: Some(FrameAssembler::new(engine, converter)),
            options,
            statistics: AssemblerStatistics::default(),
        })
    }

    /// Decode one chunk of the elementary stream.
    ///
    /// Returns the frames completed by this chunk in decoder output order.
    /// Trailing bytes that do not yet form a complete unit are kept for the
    /// next call. Damaged units are skipped and listed in
    /// [`DecodeOutput::unit_errors`].
    ///
    /// # Errors
    ///
    /// - [`DecoderError::Closed`] after [`close`](Decoder::close).
    /// - [`DecoderError::StreamCorrupted`] if the parser fails outright.
    /// - [`DecoderError::BufferAllocationFailed`] if a frame buffer cannot
    ///   be allocated.
    ///
    /// Frames produced before the error are in [`DecodeFailure::output`].
    pub fn decode(&mut self, chunk: &[u8]) -> Result<DecodeOutput, DecodeFailure> {
        let assembler = self.assembler.as_mut().ok_or(DecoderError::Closed)?;
        assembler.decode(chunk)
    }

    /// End the current stream and collect every frame still buffered.
    ///
    /// The decoder stays open and can take a new stream afterwards.
    ///
    /// # Errors
    ///
    /// As for [`decode`](Decoder::decode).
    pub fn finish(&mut self) -> Result<DecodeOutput, DecodeFailure> {
        let assembler = self.assembler.as_mut().ok_or(DecoderError::Closed)?;
        assembler.finish()
    }

    /// Release the codec, parser, scratch buffers and scaling context.
    ///
    /// Calling `close` more than once is a no-op. Later
    /// [`decode`](Decoder::decode) and [`finish`](Decoder::finish) calls
    /// return [`DecoderError::Closed`]. Dropping the decoder releases the
    /// same resources.
    pub fn close(&mut self) {
        if let Some(assembler) = self.assembler.take() {
            self.statistics = assembler.statistics();
            log::debug!("Closing decoder: {:?}", self.statistics);
        }
    }

    /// Whether [`close`](Decoder::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.assembler.is_none()
    }

    /// The output pixel layout.
    pub fn pixel_format(&self) -> PixelFormat {
        self.options.pixel_format
    }

    /// The input compression standard.
    pub fn compression(&self) -> Compression {
        self.options.compression
    }

    /// The options the decoder was built with.
    pub fn options(&self) -> &DecoderOptions {
        &self.options
    }

    /// Totals since construction. Frozen at their final values once closed.
    pub fn statistics(&self) -> AssemblerStatistics {
        self.assembler
            .as_ref()
            .map_or(self.statistics, FrameAssembler::statistics)
    }

    /// Number of frames emitted so far.
    pub fn frames_decoded(&self) -> u64 {
        self.statistics().frames_emitted
    }

    /// Number of input bytes consumed so far.
    pub fn bytes_consumed(&self) -> u64 {
        self.statistics().bytes_consumed
    }

    /// How many times the scaling context has been built. Zero once closed.
    pub fn scaling_context_builds(&self) -> u64 {
        self.assembler
            .as_ref()
            .map_or(0, |assembler| assembler.converter().context_builds())
    }
}
