//! Decoder integration tests against FFmpeg.
//!
//! Stream tests require fixture files from
//! `tests/fixtures/generate_fixtures.sh` and are skipped when those are
//! absent.

use std::path::Path;

use h26x_stream::{Compression, Decoder, DecoderError, DecoderOptions, Frame, PixelFormat};

/// Pictures in each generated fixture.
const FIXTURE_FRAMES: usize = 10;

fn sample_h264_path() -> &'static str {
    "tests/fixtures/sample.h264"
}

fn sample_h265_path() -> &'static str {
    "tests/fixtures/sample.h265"
}

fn resolution_change_path() -> &'static str {
    "tests/fixtures/resolution_change.h264"
}

fn read_fixture(path: &str) -> Option<Vec<u8>> {
    if !Path::new(path).exists() {
        return None;
    }
    Some(std::fs::read(path).expect("Failed to read fixture"))
}

/// Decode `bytes` in `chunk_size` pieces, then flush.
fn decode_all(decoder: &mut Decoder, bytes: &[u8], chunk_size: usize) -> Vec<Frame> {
    let mut frames = Vec::new();
    for chunk in bytes.chunks(chunk_size) {
        let output = decoder.decode(chunk).expect("Decode failed");
        assert!(
            output.unit_errors.is_empty(),
            "Unexpected unit errors: {:?}",
            output.unit_errors
        );
        frames.extend(output.frames);
    }
    frames.extend(decoder.finish().expect("Finish failed").frames);
    frames
}

fn assert_frame_invariants(frame: &Frame) {
    assert_eq!(frame.data().len(), frame.stride() * frame.height() as usize);
    assert!(frame.stride() >= frame.width() as usize * 3);
}

// ── construction and lifecycle ─────────────────────────────────────

#[test]
fn open_h264_decoder() {
    let decoder = Decoder::new(PixelFormat::Rgb, Compression::H264).expect("Failed to open");
    assert_eq!(decoder.pixel_format(), PixelFormat::Rgb);
    assert_eq!(decoder.compression(), Compression::H264);
    assert!(!decoder.is_closed());
    assert_eq!(decoder.scaling_context_builds(), 0);
}

#[test]
fn open_h265_decoder() {
    let decoder = Decoder::new(PixelFormat::Bgr, Compression::H265).expect("Failed to open");
    assert_eq!(decoder.compression(), Compression::H265);
}

#[test]
fn close_is_idempotent() {
    let mut decoder = Decoder::new(PixelFormat::Rgb, Compression::H264).expect("Failed to open");
    decoder.close();
    decoder.close();
    assert!(decoder.is_closed());
}

#[test]
fn decode_after_close_returns_closed() {
    let mut decoder = Decoder::new(PixelFormat::Rgb, Compression::H264).expect("Failed to open");
    decoder.close();

    let failure = decoder.decode(&[0, 0, 0, 1]).expect_err("Closed decoder decoded");
    assert!(matches!(failure.error, DecoderError::Closed));
    assert!(failure.output.is_empty());

    let failure = decoder.finish().expect_err("Closed decoder finished");
    assert!(matches!(failure.error, DecoderError::Closed));
}

// ── input without pictures ─────────────────────────────────────────

#[test]
fn empty_chunk_yields_nothing() {
    let mut decoder = Decoder::new(PixelFormat::Rgb, Compression::H264).expect("Failed to open");
    let output = decoder.decode(&[]).expect("Decode failed");
    assert!(output.is_empty());
}

#[test]
fn chunk_without_start_code_yields_nothing() {
    let mut decoder = Decoder::new(PixelFormat::Rgb, Compression::H264).expect("Failed to open");
    let output = decoder
        .decode(b"this is not an elementary stream")
        .expect("Garbage should not be fatal");
    assert!(output.frames.is_empty());
}

// ── end to end ─────────────────────────────────────────────────────

#[test]
fn decode_h264_in_2048_byte_chunks() {
    let Some(bytes) = read_fixture(sample_h264_path()) else {
        return;
    };

    let mut decoder = Decoder::new(PixelFormat::Rgb, Compression::H264).expect("Failed to open");
    let frames = decode_all(&mut decoder, &bytes, 2048);

    assert_eq!(frames.len(), FIXTURE_FRAMES);
    for frame in &frames {
        assert_frame_invariants(frame);
        assert_eq!((frame.width(), frame.height()), (64, 48));
    }
    assert_eq!(decoder.frames_decoded(), FIXTURE_FRAMES as u64);
    assert_eq!(decoder.bytes_consumed(), bytes.len() as u64);
    assert_eq!(decoder.scaling_context_builds(), 1);

    decoder.close();
    assert_eq!(decoder.frames_decoded(), FIXTURE_FRAMES as u64);
}

#[test]
fn decode_h265_in_2048_byte_chunks() {
    let Some(bytes) = read_fixture(sample_h265_path()) else {
        return;
    };

    let mut decoder = Decoder::new(PixelFormat::Rgb, Compression::H265).expect("Failed to open");
    let frames = decode_all(&mut decoder, &bytes, 2048);

    assert_eq!(frames.len(), FIXTURE_FRAMES);
    frames.iter().for_each(assert_frame_invariants);
}

#[test]
fn chunk_size_does_not_change_output() {
    let Some(bytes) = read_fixture(sample_h264_path()) else {
        return;
    };

    let mut decoder = Decoder::new(PixelFormat::Rgb, Compression::H264).expect("Failed to open");
    let reference = decode_all(&mut decoder, &bytes, bytes.len());
    assert_eq!(reference.len(), FIXTURE_FRAMES);

    for chunk_size in [1, 16, 2048] {
        let mut decoder =
            Decoder::new(PixelFormat::Rgb, Compression::H264).expect("Failed to open");
        let frames = decode_all(&mut decoder, &bytes, chunk_size);
        assert_eq!(frames, reference, "Mismatch with {chunk_size}-byte chunks");
    }
}

#[test]
fn frames_stay_valid_across_calls() {
    let Some(bytes) = read_fixture(sample_h264_path()) else {
        return;
    };

    let mut decoder = Decoder::new(PixelFormat::Rgb, Compression::H264).expect("Failed to open");
    let frames = decode_all(&mut decoder, &bytes, 512);
    let snapshot: Vec<Vec<u8>> = frames.iter().map(|frame| frame.data().to_vec()).collect();

    // Decoding the stream again must not disturb frames already handed out.
    let again = decode_all(&mut decoder, &bytes, 512);
    assert_eq!(again.len(), frames.len());
    for (frame, original) in frames.iter().zip(&snapshot) {
        assert_eq!(frame.data(), original.as_slice());
    }

    let mut frames = frames;
    let mut first = frames.remove(0).into_data();
    first.fill(0);
    assert_eq!(frames[0].data(), snapshot[1].as_slice());
}

#[test]
fn bgr_output_swaps_channels() {
    let Some(bytes) = read_fixture(sample_h264_path()) else {
        return;
    };

    let mut rgb = Decoder::new(PixelFormat::Rgb, Compression::H264).expect("Failed to open");
    let mut bgr = Decoder::new(PixelFormat::Bgr, Compression::H264).expect("Failed to open");
    let rgb_frames = decode_all(&mut rgb, &bytes, 2048);
    let bgr_frames = decode_all(&mut bgr, &bytes, 2048);

    let rgb_pixel = rgb_frames[0].view().raw_pixel(10, 10);
    let bgr_pixel = bgr_frames[0].view().raw_pixel(10, 10);
    assert_eq!(rgb_pixel, [bgr_pixel[2], bgr_pixel[1], bgr_pixel[0]]);
    assert_eq!(
        rgb_frames[0].to_rgb_image().unwrap(),
        bgr_frames[0].to_rgb_image().unwrap()
    );
}

#[test]
fn row_alignment_pads_stride() {
    let Some(bytes) = read_fixture(sample_h264_path()) else {
        return;
    };

    let options = DecoderOptions::new().with_row_alignment(128);
    let mut decoder = Decoder::with_options(options).expect("Failed to open");
    let frames = decode_all(&mut decoder, &bytes, 2048);

    for frame in &frames {
        assert_eq!(frame.stride(), 256);
        assert_frame_invariants(frame);
    }
}

#[test]
fn resolution_change_is_followed() {
    let Some(bytes) = read_fixture(resolution_change_path()) else {
        return;
    };

    let mut decoder = Decoder::new(PixelFormat::Rgb, Compression::H264).expect("Failed to open");
    let frames = decode_all(&mut decoder, &bytes, 2048);

    let geometry: Vec<_> = frames
        .iter()
        .map(|frame| (frame.width(), frame.height()))
        .collect();
    let mut expected = vec![(64, 48); FIXTURE_FRAMES / 2];
    expected.extend(vec![(96, 64); FIXTURE_FRAMES / 2]);
    assert_eq!(geometry, expected);
    frames.iter().for_each(assert_frame_invariants);
    assert_eq!(decoder.scaling_context_builds(), 2);
}

#[test]
fn finish_allows_a_new_stream() {
    let Some(bytes) = read_fixture(sample_h264_path()) else {
        return;
    };

    let mut decoder = Decoder::new(PixelFormat::Rgb, Compression::H264).expect("Failed to open");
    let first = decode_all(&mut decoder, &bytes, 4096);
    let second = decode_all(&mut decoder, &bytes, 4096);
    assert_eq!(first, second);
}

#[test]
fn truncated_stream_is_not_fatal() {
    let Some(bytes) = read_fixture(sample_h264_path()) else {
        return;
    };

    let mut decoder = Decoder::new(PixelFormat::Rgb, Compression::H264).expect("Failed to open");
    // Drop the start of the stream, parameter sets included.
    let mut produced = 0;
    for chunk in bytes[bytes.len() / 2..].chunks(2048) {
        match decoder.decode(chunk) {
            Ok(output) => produced += output.frames.len(),
            Err(failure) => panic!("Unexpected fatal error: {failure}"),
        }
    }
    assert!(produced <= FIXTURE_FRAMES);
}
