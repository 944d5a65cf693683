//! Chunk-to-frame assembly.
//!
//! [`FrameAssembler`] is the stateful core of the crate. It feeds each
//! input chunk through a [`CodecEngine`], decodes every coded unit the
//! parser completes, and converts each finished picture into a [`Frame`]
//! with a [`ColorConverter`]. Partial units stay inside the engine between
//! calls, so the caller may split the stream anywhere.
//!
//! Failures come in two kinds. A damaged unit or a picture that fails to
//! convert is recorded in [`DecodeOutput::unit_errors`] and scanning moves
//! on. Negative parser progress or a failed output allocation aborts the
//! call with a [`DecodeFailure`] that still carries everything produced up
//! to that point.

use thiserror::Error;

use crate::{
    converter::ColorConverter,
    engine::{CodecEngine, NativePicture},
    error::DecoderError,
    frame::Frame,
};

/// Picture errors tolerated in a row before a drain stops asking the engine
/// for more.
pub const MAX_CONSECUTIVE_PICTURE_ERRORS: usize = 16;

/// Frames and recoverable errors produced by one call.
#[derive(Debug, Default)]
pub struct DecodeOutput {
    /// Converted frames in engine output order.
    pub frames: Vec<Frame>,
    /// Unit-local failures, in the order they occurred.
    pub unit_errors: Vec<DecoderError>,
}

impl DecodeOutput {
    /// `true` if neither frames nor errors were produced.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty() && self.unit_errors.is_empty()
    }
}

/// A decode call that stopped on a stream-fatal error.
///
/// `output` holds the frames and unit errors produced before the abort.
#[derive(Debug, Error)]
#[error("Decoding aborted after {} frame(s): {error}", .output.frames.len())]
pub struct DecodeFailure {
    /// Output produced before the failure.
    pub output: DecodeOutput,
    /// The error that stopped decoding.
    #[source]
    pub error: DecoderError,
}

impl From<DecoderError> for DecodeFailure {
    fn from(error: DecoderError) -> Self {
        Self {
            output: DecodeOutput::default(),
            error,
        }
    }
}

impl From<DecodeFailure> for DecoderError {
    fn from(failure: DecodeFailure) -> Self {
        failure.error
    }
}

/// Running totals kept by a [`FrameAssembler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AssemblerStatistics {
    /// Input bytes the parser consumed.
    pub bytes_consumed: u64,
    /// Coded units handed to the decoder.
    pub units_decoded: u64,
    /// Frames emitted.
    pub frames_emitted: u64,
    /// Unit-local errors recorded.
    pub unit_errors: u64,
}

/// Drives a [`CodecEngine`] and a [`ColorConverter`] over input chunks.
///
/// Not reentrant: every operation takes `&mut self`.
#[derive(Debug)]
pub struct FrameAssembler<E, C> {
    engine: E,
    converter: C,
    statistics: AssemblerStatistics,
}

impl<E, C> FrameAssembler<E, C>
where
    E: CodecEngine,
    C: ColorConverter<E::Picture>,
{
    /// Pair an engine with a converter.
    pub fn new(engine: E, converter: C) -> Self {
        Self {
            engine,
            converter,
            statistics: AssemblerStatistics::default(),
        }
    }

    /// The wrapped engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The wrapped converter.
    pub fn converter(&self) -> &C {
        &self.converter
    }

    /// Totals since construction.
    pub fn statistics(&self) -> AssemblerStatistics {
        self.statistics
    }

    /// Decode one chunk of the elementary stream.
    ///
    /// Returns every frame completed while consuming `chunk`. Bytes that do
    /// not yet form a complete unit are kept by the engine and joined with
    /// the next chunk; an empty result is normal for small chunks.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeFailure`] on a stream-fatal error. Its `output`
    /// holds what was produced before the failure.
    pub fn decode(&mut self, chunk: &[u8]) -> Result<DecodeOutput, DecodeFailure> {
        let mut output = DecodeOutput::default();
        let mut cursor = 0;

        while cursor < chunk.len() {
            let progress = match self.engine.parse(&chunk[cursor..]) {
                Ok(progress) => progress,
                Err(error) => return Err(abort(output, error)),
            };

            let consumed = progress.consumed.min(chunk.len() - cursor);
            cursor += consumed;
            self.statistics.bytes_consumed += consumed as u64;

            if progress.stalled() {
                log::trace!("Parser stalled with {} bytes left", chunk.len() - cursor);
                break;
            }

            if progress.unit_ready {
                if let Err(error) = self.decode_pending_unit(&mut output) {
                    return Err(abort(output, error));
                }
            }
        }

        Ok(output)
    }

    /// Signal end of stream and collect every remaining frame.
    ///
    /// Flushes the unit the parser still buffers, drains pictures the
    /// decoder held back for reordering, then resets the engine so a new
    /// stream can be decoded.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeFailure`] on a stream-fatal error. The engine is
    /// reset in either case.
    pub fn finish(&mut self) -> Result<DecodeOutput, DecodeFailure> {
        let mut output = DecodeOutput::default();
        let drained = self.drain(&mut output);
        let reset = self.engine.reset();

        log::debug!(
            "Finished stream: {} frame(s) drained, {} unit error(s)",
            output.frames.len(),
            output.unit_errors.len()
        );

        match drained.and(reset) {
            Ok(()) => Ok(output),
            Err(error) => Err(abort(output, error)),
        }
    }

    fn drain(&mut self, output: &mut DecodeOutput) -> Result<(), DecoderError> {
        if self.engine.flush_parser()?.unit_ready {
            self.decode_pending_unit(output)?;
        }
        self.engine.end_of_stream()?;
        self.receive_pictures(output)
    }

    fn decode_pending_unit(&mut self, output: &mut DecodeOutput) -> Result<(), DecoderError> {
        self.statistics.units_decoded += 1;
        if let Err(error) = self.engine.decode_unit() {
            return record_unit_error(&mut self.statistics, output, error);
        }
        self.receive_pictures(output)
    }

    /// Take pictures until the engine has none left.
    ///
    /// A picture that fails to decode does not end the drain: later
    /// pictures may still be buffered behind it. After
    /// [`MAX_CONSECUTIVE_PICTURE_ERRORS`] failures in a row the drain gives
    /// up.
    fn receive_pictures(&mut self, output: &mut DecodeOutput) -> Result<(), DecoderError> {
        let mut consecutive_errors = 0;
        loop {
            let picture = match self.engine.receive_picture() {
                Ok(Some(picture)) => picture,
                Ok(None) => return Ok(()),
                Err(error) => {
                    record_unit_error(&mut self.statistics, output, error)?;
                    consecutive_errors += 1;
                    if consecutive_errors >= MAX_CONSECUTIVE_PICTURE_ERRORS {
                        log::warn!(
                            "Giving up on buffered pictures after {consecutive_errors} errors in a row"
                        );
                        return Ok(());
                    }
                    continue;
                }
            };
            consecutive_errors = 0;

            match assemble(&mut self.converter, picture) {
                Ok(frame) => {
                    self.statistics.frames_emitted += 1;
                    output.frames.push(frame);
                }
                Err(error) => record_unit_error(&mut self.statistics, output, error)?,
            }
        }
    }
}

fn abort(output: DecodeOutput, error: DecoderError) -> DecodeFailure {
    log::warn!(
        "Aborting decode after {} frame(s): {error}",
        output.frames.len()
    );
    DecodeFailure { output, error }
}

/// Keep a unit-local error and carry on, or hand a fatal one back.
fn record_unit_error(
    statistics: &mut AssemblerStatistics,
    output: &mut DecodeOutput,
    error: DecoderError,
) -> Result<(), DecoderError> {
    if error.is_stream_fatal() {
        return Err(error);
    }
    log::warn!("Skipping coded unit: {error}");
    statistics.unit_errors += 1;
    output.unit_errors.push(error);
    Ok(())
}

/// Convert one picture into a freshly allocated frame.
///
/// The buffer is allocated at exactly the predicted size and moved into the
/// frame, so no frame ever shares storage with engine scratch memory.
fn assemble<P, C>(converter: &mut C, picture: &P) -> Result<Frame, DecoderError>
where
    P: NativePicture,
    C: ColorConverter<P>,
{
    let width = picture.width();
    let height = picture.height();
    let size = converter.predict_size(width, height)?;

    let mut data = Vec::new();
    data.try_reserve_exact(size)
        .map_err(|_| DecoderError::BufferAllocationFailed { size })?;
    data.resize(size, 0);

    let stride = converter.convert(picture, &mut data)?;
    Frame::new(data, width, height, stride, converter.pixel_format())
}
