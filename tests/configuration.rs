//! DecoderOptions, PixelFormat, Compression and error classification tests.

use ffmpeg_next::{codec::Id, format::Pixel};
use h26x_stream::{
    Compression, DecodeFailure, DecoderError, DecoderOptions, FfmpegLogLevel, MAX_ROW_ALIGNMENT,
    PixelFormat, ScalingFilter,
};

// ── DecoderOptions builder ─────────────────────────────────────────

#[test]
fn options_defaults() {
    let options = DecoderOptions::new();
    assert_eq!(options.pixel_format(), PixelFormat::Rgb);
    assert_eq!(options.compression(), Compression::H264);
    assert_eq!(options.scaling_filter(), ScalingFilter::Bilinear);
    assert_eq!(options.row_alignment(), 1);
    assert_eq!(options.thread_count(), 1);
    assert_eq!(options, DecoderOptions::default());
}

#[test]
fn options_builder_sets_fields() {
    let options = DecoderOptions::new()
        .with_pixel_format(PixelFormat::Bgr)
        .with_compression(Compression::H265)
        .with_scaling_filter(ScalingFilter::Point)
        .with_row_alignment(32)
        .with_thread_count(4);

    assert_eq!(options.pixel_format(), PixelFormat::Bgr);
    assert_eq!(options.compression(), Compression::H265);
    assert_eq!(options.scaling_filter(), ScalingFilter::Point);
    assert_eq!(options.row_alignment(), 32);
    assert_eq!(options.thread_count(), 4);
}

#[test]
fn row_alignment_rounds_to_power_of_two() {
    assert_eq!(DecoderOptions::new().with_row_alignment(0).row_alignment(), 1);
    assert_eq!(DecoderOptions::new().with_row_alignment(3).row_alignment(), 4);
    assert_eq!(DecoderOptions::new().with_row_alignment(16).row_alignment(), 16);
}

#[test]
fn row_alignment_is_capped() {
    assert_eq!(
        DecoderOptions::new().with_row_alignment(usize::MAX).row_alignment(),
        MAX_ROW_ALIGNMENT
    );
    assert_eq!(
        DecoderOptions::new()
            .with_row_alignment(MAX_ROW_ALIGNMENT + 1)
            .row_alignment(),
        MAX_ROW_ALIGNMENT
    );
}

#[test]
fn thread_count_clamps_zero() {
    assert_eq!(DecoderOptions::new().with_thread_count(0).thread_count(), 1);
}

// ── PixelFormat ────────────────────────────────────────────────────

#[test]
fn pixel_format_parses_names() {
    assert_eq!("rgb".parse::<PixelFormat>().unwrap(), PixelFormat::Rgb);
    assert_eq!("BGR24".parse::<PixelFormat>().unwrap(), PixelFormat::Bgr);
    assert_eq!(PixelFormat::Bgr.to_string(), "bgr24");
    assert_eq!(PixelFormat::Rgb.bytes_per_pixel(), 3);
}

#[test]
fn pixel_format_rejects_unknown_names() {
    let error = "rgba".parse::<PixelFormat>().unwrap_err();
    assert!(matches!(error, DecoderError::UnsupportedPixelFormat(ref name) if name == "rgba"));
    assert!(error.to_string().contains("Unsupported pixel format"));
}

#[test]
fn pixel_format_from_ffmpeg_pixel() {
    assert_eq!(PixelFormat::try_from(Pixel::RGB24).unwrap(), PixelFormat::Rgb);
    assert_eq!(PixelFormat::try_from(Pixel::BGR24).unwrap(), PixelFormat::Bgr);
    assert!(matches!(
        PixelFormat::try_from(Pixel::YUV420P),
        Err(DecoderError::UnsupportedPixelFormat(_))
    ));
}

// ── Compression ────────────────────────────────────────────────────

#[test]
fn compression_parses_names() {
    assert_eq!("h264".parse::<Compression>().unwrap(), Compression::H264);
    assert_eq!("H.264".parse::<Compression>().unwrap(), Compression::H264);
    assert_eq!("hevc".parse::<Compression>().unwrap(), Compression::H265);
    assert_eq!("h.265".parse::<Compression>().unwrap(), Compression::H265);
    assert_eq!(Compression::H265.to_string(), "H.265");
}

#[test]
fn compression_rejects_other_codecs() {
    assert!(matches!(
        "vp9".parse::<Compression>(),
        Err(DecoderError::UnsupportedCompression(_))
    ));
    assert!(matches!(
        Compression::try_from(Id::MPEG4),
        Err(DecoderError::UnsupportedCompression(_))
    ));
    assert_eq!(Compression::try_from(Id::HEVC).unwrap(), Compression::H265);
}

// ── error classification ───────────────────────────────────────────

#[test]
fn unit_local_errors_are_not_fatal() {
    assert!(!DecoderError::UnitDecodeFailed("slice".into()).is_stream_fatal());
    assert!(!DecoderError::ConversionFailed("geometry".into()).is_stream_fatal());
}

#[test]
fn stream_errors_are_fatal() {
    assert!(DecoderError::StreamCorrupted { code: -22 }.is_stream_fatal());
    assert!(DecoderError::BufferAllocationFailed { size: 1 }.is_stream_fatal());
    assert!(DecoderError::PacketAllocationFailed { size: 1 }.is_stream_fatal());
    assert!(DecoderError::Closed.is_stream_fatal());
}

#[test]
fn decode_failure_wraps_error_as_source() {
    let failure = DecodeFailure::from(DecoderError::Closed);
    assert!(failure.output.is_empty());
    assert_eq!(
        failure.to_string(),
        "Decoding aborted after 0 frame(s): Decoder is closed"
    );

    let source = std::error::Error::source(&failure).expect("Missing source");
    assert_eq!(source.to_string(), "Decoder is closed");
}

// ── FFmpeg log level ───────────────────────────────────────────────

#[test]
fn ffmpeg_log_level_round_trips() {
    h26x_stream::ffmpeg::initialize().expect("Failed to initialise FFmpeg");
    let previous = h26x_stream::get_ffmpeg_log_level();

    h26x_stream::set_ffmpeg_log_level(FfmpegLogLevel::Error);
    assert_eq!(h26x_stream::get_ffmpeg_log_level(), Some(FfmpegLogLevel::Error));

    h26x_stream::set_ffmpeg_log_level(previous.unwrap_or(FfmpegLogLevel::Warning));
}
