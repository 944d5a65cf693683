//! Internal buffer-layout helpers.
//!
//! Row stride and buffer size arithmetic for packed pixel layouts, and
//! row-wise copies out of strided buffers.

use crate::configuration::MAX_ROW_ALIGNMENT;

/// Clamp a requested row alignment to a power of two in
/// `1..=MAX_ROW_ALIGNMENT`.
pub(crate) fn normalize_alignment(alignment: usize) -> usize {
    alignment
        .clamp(1, MAX_ROW_ALIGNMENT)
        .checked_next_power_of_two()
        .unwrap_or(MAX_ROW_ALIGNMENT)
}

/// Round `value` up to the next multiple of `alignment` (a power of two).
pub(crate) fn align_up(value: usize, alignment: usize) -> usize {
    debug_assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}

/// Row stride of a packed picture `width` pixels wide.
pub(crate) fn packed_stride(width: u32, bytes_per_pixel: usize, alignment: usize) -> usize {
    align_up(width as usize * bytes_per_pixel, alignment)
}

/// Total byte size of a packed picture, or `None` on overflow.
pub(crate) fn packed_size(
    width: u32,
    height: u32,
    bytes_per_pixel: usize,
    alignment: usize,
) -> Option<usize> {
    (width as usize)
        .checked_mul(bytes_per_pixel)
        .and_then(|row| row.checked_add(alignment - 1))
        .map(|row| row & !(alignment - 1))
        .and_then(|stride| stride.checked_mul(height as usize))
}

/// Copy the visible part of a strided buffer into a tightly-packed one.
///
/// `row_bytes` is the number of meaningful bytes per row (width times bytes
/// per pixel). When `stride == row_bytes` this is a single copy.
pub(crate) fn strip_row_padding(
    data: &[u8],
    stride: usize,
    row_bytes: usize,
    height: usize,
) -> Vec<u8> {
    if stride == row_bytes {
        data[..row_bytes * height].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(row_bytes * height);
        for row in data.chunks(stride).take(height) {
            buffer.extend_from_slice(&row[..row_bytes]);
        }
        buffer
    }
}
