//! QOI files via `rapid-qoi`. Loads as 24 or 32 bpp bitmaps.

use rapid_qoi::{Colors, Qoi};

use crate::dib::DibBitmap;
use crate::error::CodecError;
use crate::flags::IoFlags;
use crate::limits::Limits;
use crate::pixel::PixelType;

pub(crate) fn decode(data: &[u8], flags: IoFlags, limits: &Limits) -> Result<DibBitmap, CodecError> {
    let header = Qoi::decode_header(data).map_err(|e| CodecError::InvalidHeader(format!("{e:?}")))?;
    let bpp = if header.colors.has_alpha() { 32 } else { 24 };
    let with_pixels = !flags.contains(IoFlags::LOAD_NOPIXELS);
    let mut bitmap = DibBitmap::new(PixelType::Bitmap, header.width, header.height, bpp, limits, with_pixels)?;
    if !with_pixels {
        return Ok(bitmap);
    }

    let (_, pixels) = Qoi::decode_alloc(data).map_err(|e| CodecError::InvalidData(format!("{e:?}")))?;
    let row_len = bitmap.row_len();
    for (y, row) in pixels.chunks_exact(row_len).enumerate() {
        bitmap.set_rgb8_row(y, row)?;
    }
    Ok(bitmap)
}

pub(crate) fn encode(bitmap: &DibBitmap, _flags: IoFlags) -> Result<Vec<u8>, CodecError> {
    let colors = match bitmap.bpp() {
        24 => Colors::Rgb,
        32 => Colors::Rgba,
        bpp => {
            return Err(CodecError::UnsupportedVariant(format!(
                "QOI stores 24 or 32 bpp, got {bpp}"
            )));
        }
    };
    let mut pixels = Vec::with_capacity(bitmap.row_len() * bitmap.height() as usize);
    for y in 0..bitmap.height() as usize {
        pixels.extend_from_slice(&bitmap.rgb8_row(y)?);
    }
    let qoi = Qoi {
        width: bitmap.width(),
        height: bitmap.height(),
        colors,
    };
    qoi.encode_alloc(&pixels)
        .map_err(|e| CodecError::InvalidData(format!("{e:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgba_round_trip() {
        let mut b = DibBitmap::new(PixelType::Bitmap, 2, 1, 32, &Limits::default(), true).unwrap();
        b.set_rgb8_row(0, &[1, 2, 3, 4, 250, 251, 252, 253]).unwrap();
        let file = encode(&b, IoFlags::DEFAULT).unwrap();
        assert_eq!(&file[..4], b"qoif");
        let back = decode(&file, IoFlags::DEFAULT, &Limits::default()).unwrap();
        assert_eq!(back.bpp(), 32);
        assert_eq!(back.rgb8_row(0).unwrap(), vec![1, 2, 3, 4, 250, 251, 252, 253]);
    }

    #[test]
    fn header_only() {
        let b = DibBitmap::new(PixelType::Bitmap, 3, 3, 24, &Limits::default(), true).unwrap();
        let file = encode(&b, IoFlags::DEFAULT).unwrap();
        let back = decode(&file, IoFlags::LOAD_NOPIXELS, &Limits::default()).unwrap();
        assert!(!back.has_pixels());
        assert_eq!(back.bpp(), 24);
    }
}
