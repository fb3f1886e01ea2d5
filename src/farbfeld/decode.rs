//! Farbfeld decoder.
//!
//! Forked from zune-farbfeld 0.5.2 by Caleb Etemesi (MIT/Apache-2.0/Zlib).

use crate::dib::DibBitmap;
use crate::error::CodecError;
use crate::flags::IoFlags;
use crate::limits::Limits;
use crate::pixel::PixelType;

/// Parse farbfeld header, returning (width, height).
pub(crate) fn parse_header(data: &[u8]) -> Result<(u32, u32), CodecError> {
    if data.len() < 16 {
        return Err(CodecError::UnexpectedEof);
    }
    if &data[0..8] != b"farbfeld" {
        return Err(CodecError::UnrecognizedFormat);
    }
    let width = u32::from_be_bytes([data[8], data[9], data[10], data[11]]);
    let height = u32::from_be_bytes([data[12], data[13], data[14], data[15]]);

    if width == 0 {
        return Err(CodecError::InvalidHeader("farbfeld width is zero".into()));
    }
    if height == 0 {
        return Err(CodecError::InvalidHeader("farbfeld height is zero".into()));
    }
    Ok((width, height))
}

/// Decode a farbfeld file into an `Rgba16` bitmap.
pub(crate) fn decode_farbfeld(
    data: &[u8],
    flags: IoFlags,
    limits: &Limits,
) -> Result<DibBitmap, CodecError> {
    let (width, height) = parse_header(data)?;
    let with_pixels = !flags.contains(IoFlags::LOAD_NOPIXELS);
    let mut bitmap = DibBitmap::new(PixelType::Rgba16, width, height, 64, limits, with_pixels)?;
    if !with_pixels {
        return Ok(bitmap);
    }

    let input_bytes = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(8))
        .ok_or(CodecError::DimensionsTooLarge { width, height })?;
    let pixel_data = data
        .get(16..16 + input_bytes)
        .ok_or(CodecError::UnexpectedEof)?;

    // Convert each u16 from big-endian to native endian
    let samples: Vec<u16> = pixel_data
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    bitmap.set_samples(&samples)?;
    Ok(bitmap)
}
