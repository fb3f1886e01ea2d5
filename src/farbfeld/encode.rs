//! Farbfeld encoder.
//!
//! Forked from zune-farbfeld 0.5.2 by Caleb Etemesi (MIT/Apache-2.0/Zlib).

use crate::dib::DibBitmap;
use crate::error::CodecError;
use crate::pixel::PixelType;

/// Encode an `Rgba16` bitmap to farbfeld format.
pub(crate) fn encode_farbfeld(bitmap: &DibBitmap) -> Result<Vec<u8>, CodecError> {
    if bitmap.pixel_type() != PixelType::Rgba16 {
        return Err(CodecError::UnsupportedVariant(format!(
            "farbfeld stores RGBA16 only, got {:?}",
            bitmap.pixel_type()
        )));
    }
    let width = bitmap.width();
    let height = bitmap.height();
    let samples = bitmap.samples::<u16>()?;

    // Output: 16 header + w*h*8 pixel bytes
    let total = samples
        .len()
        .checked_mul(2)
        .and_then(|n| n.checked_add(16))
        .ok_or(CodecError::DimensionsTooLarge { width, height })?;
    let mut out = Vec::with_capacity(total);

    // Header
    out.extend_from_slice(b"farbfeld");
    out.extend_from_slice(&width.to_be_bytes());
    out.extend_from_slice(&height.to_be_bytes());

    for s in samples {
        out.extend_from_slice(&s.to_be_bytes());
    }
    Ok(out)
}
