//! BGR(A) ↔ RGB(A) channel reordering between engine memory and arrays.
//!
//! Engines keep 8-bit colour pixels in blue-green-red order on little-endian
//! hosts. Arrays handed to callers are always red-green-blue. Only 8-bit
//! arrays with 3 or 4 channels are affected; every other layout is copied
//! unchanged.

use crate::array::OwnedArray;
use crate::error::BitmapError;
use crate::pixel::ElementType;
use crate::view::{BitmapViewMut, check_same_shape, is_byte_samples};

/// Whether an array of this element type and channel axis needs the swap.
fn needs_swap(element: ElementType, channels: Option<usize>, little_endian: bool) -> bool {
    little_endian && is_byte_samples(element) && matches!(channels, Some(3 | 4))
}

/// Read-path fixup: turn a materialized copy of engine pixels into RGB(A).
///
/// Swaps channels 0 and 2 in place. A no-op unless `little_endian` and the
/// array is 8-bit with 3 or 4 channels.
pub fn to_logical_order(array: &mut OwnedArray, little_endian: bool) {
    let channels = array.channels();
    if !needs_swap(array.element_type(), channels, little_endian) {
        return;
    }
    let c = array.channel_count();
    if let Some(samples) = array.as_mut_slice::<u8>() {
        swap_red_blue(samples, c);
    }
}

/// Write-path fixup: copy `src` into engine memory in the engine's order.
///
/// Destination channel 0 receives source channel 2, channel 1 stays, channel
/// 2 receives source channel 0 and alpha stays in place. Without a swap the
/// rows are copied verbatim.
pub fn to_physical_order(
    src: &OwnedArray,
    dst: &mut BitmapViewMut<'_>,
    little_endian: bool,
) -> Result<(), BitmapError> {
    check_same_shape(src, dst.descriptor())?;
    if !needs_swap(src.element_type(), src.channels(), little_endian) {
        return dst.copy_from(src);
    }
    let c = src.channel_count();
    let Some(samples) = src.as_slice::<u8>() else {
        return dst.copy_from(src);
    };
    let per_row = src.width() * c;
    for y in 0..src.height() {
        let row = dst.row_mut(y);
        row.copy_from_slice(&samples[y * per_row..(y + 1) * per_row]);
        swap_red_blue(row, c);
    }
    Ok(())
}

/// Swap the first and third byte of every `channels`-byte pixel.
#[cfg(feature = "simd")]
pub(crate) fn swap_red_blue(pixels: &mut [u8], channels: usize) {
    if pixels.is_empty() {
        return;
    }
    let swizzled = match channels {
        3 => garb::bytes::rgb_to_bgr_inplace(pixels).is_ok(),
        4 => garb::bytes::rgba_to_bgra_inplace(pixels).is_ok(),
        _ => false,
    };
    if !swizzled {
        swap_red_blue_scalar(pixels, channels);
    }
}

/// Swap the first and third byte of every `channels`-byte pixel.
#[cfg(not(feature = "simd"))]
pub(crate) fn swap_red_blue(pixels: &mut [u8], channels: usize) {
    swap_red_blue_scalar(pixels, channels);
}

fn swap_red_blue_scalar(pixels: &mut [u8], channels: usize) {
    if channels < 3 {
        return;
    }
    for px in pixels.chunks_exact_mut(channels) {
        px.swap(0, 2);
    }
}
