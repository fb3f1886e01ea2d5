//! BMP/DIB files.
//!
//! Reads 1, 4, 8, 16, 24 and 32 bpp uncompressed and bitfield files,
//! keeping the stored depth and palette. RLE-compressed files are
//! rejected. Writes BI_RGB, or BI_BITFIELDS for 16-bit bitmaps with
//! non-5-5-5 masks.

mod decode;
mod encode;
mod utils;

use crate::dib::DibBitmap;
use crate::error::CodecError;
use crate::flags::IoFlags;
use crate::limits::Limits;

pub(crate) fn decode(data: &[u8], flags: IoFlags, limits: &Limits) -> Result<DibBitmap, CodecError> {
    decode::decode_bmp(data, flags, limits)
}

pub(crate) fn encode(bitmap: &DibBitmap, flags: IoFlags) -> Result<Vec<u8>, CodecError> {
    encode::encode_bmp(bitmap, flags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel::PixelType;

    fn bitmap(bpp: u32, width: u32, height: u32) -> DibBitmap {
        DibBitmap::new(PixelType::Bitmap, width, height, bpp, &Limits::default(), true).unwrap()
    }

    #[test]
    fn rgb_round_trip_keeps_rows_and_order() {
        let mut b = bitmap(24, 3, 2);
        b.set_rgb8_row(0, &[255, 0, 0, 0, 255, 0, 0, 0, 255]).unwrap();
        b.set_rgb8_row(1, &[1, 2, 3, 4, 5, 6, 7, 8, 9]).unwrap();
        let file = encode(&b, IoFlags::DEFAULT).unwrap();
        assert_eq!(&file[..2], b"BM");
        // Bottom row first, stored blue first.
        assert_eq!(&file[54..57], &[3, 2, 1]);

        let back = decode(&file, IoFlags::DEFAULT, &Limits::default()).unwrap();
        assert_eq!(back.bpp(), 24);
        assert_eq!(back.rgb8_row(0).unwrap(), vec![255, 0, 0, 0, 255, 0, 0, 0, 255]);
        assert_eq!(back.rgb8_row(1).unwrap(), vec![1, 2, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn palettes_survive() {
        let mut b = bitmap(4, 5, 1);
        b.set_palette_entry(3, 10, 20, 30);
        b.scanline_mut(0).unwrap().copy_from_slice(&[0x30, 0x00, 0x00]);
        let file = encode(&b, IoFlags::DEFAULT).unwrap();
        let back = decode(&file, IoFlags::DEFAULT, &Limits::default()).unwrap();
        assert_eq!(back.bpp(), 4);
        assert_eq!(back.palette_entry(3), [10, 20, 30]);
        assert_eq!(back.scanline(0).unwrap(), &[0x30, 0x00, 0x00]);
    }

    #[test]
    fn sixteen_bit_masks_survive() {
        let mut b = bitmap(16, 1, 1);
        b.colour_masks = Some([0xF800, 0x07E0, 0x001F]);
        let file = encode(&b, IoFlags::DEFAULT).unwrap();
        let back = decode(&file, IoFlags::DEFAULT, &Limits::default()).unwrap();
        assert_eq!(back.colour_masks, Some([0xF800, 0x07E0, 0x001F]));

        let plain = encode(&bitmap(16, 1, 1), IoFlags::DEFAULT).unwrap();
        let back = decode(&plain, IoFlags::DEFAULT, &Limits::default()).unwrap();
        assert_eq!(back.colour_masks, None);
    }

    #[test]
    fn header_only_load() {
        let file = encode(&bitmap(8, 4, 4), IoFlags::DEFAULT).unwrap();
        let b = decode(&file, IoFlags::LOAD_NOPIXELS, &Limits::default()).unwrap();
        assert!(!b.has_pixels());
        assert_eq!((b.width(), b.height()), (4, 4));
    }

    #[test]
    fn truncated_pixels_fail() {
        let file = encode(&bitmap(24, 4, 4), IoFlags::DEFAULT).unwrap();
        let cut = &file[..file.len() - 1];
        assert!(matches!(
            decode(cut, IoFlags::DEFAULT, &Limits::default()),
            Err(CodecError::UnexpectedEof)
        ));
    }

    #[test]
    fn rle_is_rejected() {
        let mut file = encode(&bitmap(8, 2, 2), IoFlags::DEFAULT).unwrap();
        file[30] = 1; // BI_RLE8
        assert!(matches!(
            decode(&file, IoFlags::DEFAULT, &Limits::default()),
            Err(CodecError::UnsupportedVariant(_))
        ));
    }

    #[test]
    fn top_down_files_are_flipped() {
        let mut b = bitmap(8, 1, 2);
        b.scanline_mut(0).unwrap()[0] = 7;
        let mut file = encode(&b, IoFlags::DEFAULT).unwrap();
        // Negate the height and reverse the two 4-byte rows.
        file[22..26].copy_from_slice(&(-2i32).to_le_bytes());
        let offset = file.len() - 8;
        file[offset..].rotate_left(4);
        let back = decode(&file, IoFlags::DEFAULT, &Limits::default()).unwrap();
        assert_eq!(back.scanline(0).unwrap(), &[7]);
        assert_eq!(back.scanline(1).unwrap(), &[0]);
    }
}
