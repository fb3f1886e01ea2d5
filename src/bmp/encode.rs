//! BMP writer: uncompressed BI_RGB, or BI_BITFIELDS for 16-bit masks.

use tracing::warn;

use super::decode::to_host_order;
use crate::dib::{DibBitmap, no_pixels};
use crate::error::CodecError;
use crate::flags::IoFlags;

const FILE_HEADER_LEN: usize = 14;
const INFO_HEADER_LEN: usize = 40;
/// 72 DPI in pixels per metre.
const DEFAULT_PPM: u32 = 2835;

/// Encode a `Bitmap`-type image at its own depth.
pub(crate) fn encode_bmp(bitmap: &DibBitmap, flags: IoFlags) -> Result<Vec<u8>, CodecError> {
    let bits = bitmap.bits().ok_or_else(no_pixels)?;
    if flags.contains(IoFlags::BMP_SAVE_RLE) && flags != IoFlags::BMP_DEFAULT {
        warn!("RLE BMP output is not supported, writing uncompressed");
    }
    let bpp = bitmap.bpp();
    let width = bitmap.width();
    let height = bitmap.height();
    let too_large = || CodecError::DimensionsTooLarge { width, height };

    let palette_len = if bpp <= 8 { 4usize << bpp } else { 0 };
    let masks = if bpp == 16 { bitmap.colour_masks } else { None };
    let masks_len = if masks.is_some() { 12 } else { 0 };
    let data_offset = FILE_HEADER_LEN + INFO_HEADER_LEN + masks_len + palette_len;
    let pixel_data_size = bitmap.pitch().checked_mul(height as usize).ok_or_else(too_large)?;
    let file_size = pixel_data_size.checked_add(data_offset).ok_or_else(too_large)?;
    let file_size_field = u32::try_from(file_size).map_err(|_| too_large())?;

    let mut out = Vec::with_capacity(file_size);
    write_bmp_header(
        &mut out,
        BmpHeaderFields {
            file_size: file_size_field,
            data_offset: data_offset as u32,
            pixel_data_size: pixel_data_size as u32,
            width,
            height,
            bpp: bpp as u16,
            compression: if masks.is_some() { 3 } else { 0 },
            colours_used: if bpp <= 8 { 1 << bpp } else { 0 },
        },
    );
    if let Some([r, g, b]) = masks {
        for m in [r, g, b] {
            out.extend_from_slice(&m.to_le_bytes());
        }
    }
    for i in 0..palette_len / 4 {
        let [r, g, b] = bitmap.palette_entry(i);
        out.extend_from_slice(&[b, g, r, 0]);
    }

    // Both layouts store the bottom scanline first with the same pitch.
    let row_len = bitmap.row_len();
    for row in bits.chunks_exact(bitmap.pitch()) {
        let start = out.len();
        out.extend_from_slice(row);
        to_host_order(&mut out[start..start + row_len], bpp as u16);
    }
    Ok(out)
}

struct BmpHeaderFields {
    file_size: u32,
    data_offset: u32,
    pixel_data_size: u32,
    width: u32,
    height: u32,
    bpp: u16,
    compression: u32,
    colours_used: u32,
}

fn write_bmp_header(out: &mut Vec<u8>, h: BmpHeaderFields) {
    // File header (14 bytes)
    out.extend_from_slice(b"BM");
    out.extend_from_slice(&h.file_size.to_le_bytes());
    out.extend_from_slice(&[0u8; 4]); // reserved
    out.extend_from_slice(&h.data_offset.to_le_bytes());

    // DIB header (BITMAPINFOHEADER, 40 bytes)
    out.extend_from_slice(&(INFO_HEADER_LEN as u32).to_le_bytes());
    out.extend_from_slice(&(h.width as i32).to_le_bytes());
    out.extend_from_slice(&(h.height as i32).to_le_bytes()); // positive = bottom-up
    out.extend_from_slice(&1u16.to_le_bytes()); // planes
    out.extend_from_slice(&h.bpp.to_le_bytes());
    out.extend_from_slice(&h.compression.to_le_bytes());
    out.extend_from_slice(&h.pixel_data_size.to_le_bytes());
    out.extend_from_slice(&DEFAULT_PPM.to_le_bytes()); // h resolution
    out.extend_from_slice(&DEFAULT_PPM.to_le_bytes()); // v resolution
    out.extend_from_slice(&h.colours_used.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes()); // important colors
}
