//! TIFF files via the `tiff` crate.
//!
//! Every image file directory is one page. Baseline descriptive tags map to
//! the EXIF_MAIN model under their EXIF key names, and are written back on
//! save. Output is LZW-compressed unless the flags ask for `TIFF_NONE` or
//! `TIFF_PACKBITS`.

mod decode;
mod encode;

use crate::dib::DibBitmap;
use crate::error::CodecError;
use crate::flags::IoFlags;
use crate::limits::Limits;

/// ASCII baseline tags: code and EXIF_MAIN key.
const TEXT_TAGS: &[(u16, &str)] = &[
    (270, "ImageDescription"),
    (271, "Make"),
    (272, "Model"),
    (305, "Software"),
    (306, "DateTime"),
    (315, "Artist"),
    (33432, "Copyright"),
];
const ORIENTATION: (u16, &str) = (274, "Orientation");
const X_RESOLUTION: (u16, &str) = (282, "XResolution");
const Y_RESOLUTION: (u16, &str) = (283, "YResolution");
const RESOLUTION_UNIT: (u16, &str) = (296, "ResolutionUnit");

/// Decode the first page.
pub(crate) fn decode(data: &[u8], flags: IoFlags, limits: &Limits) -> Result<DibBitmap, CodecError> {
    decode::decode_first(data, flags, limits)
}

pub(crate) fn decode_pages(data: &[u8], flags: IoFlags, limits: &Limits) -> Result<Vec<DibBitmap>, CodecError> {
    decode::decode_all(data, flags, limits)
}

pub(crate) fn encode_pages(pages: &[&DibBitmap], flags: IoFlags) -> Result<Vec<u8>, CodecError> {
    encode::encode_all(pages, flags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{MetadataModel, TagType};
    use crate::pixel::PixelType;

    fn bitmap(pixel_type: PixelType, bpp: u32) -> DibBitmap {
        DibBitmap::new(pixel_type, 3, 2, bpp, &Limits::default(), true).unwrap()
    }

    fn load(data: &[u8]) -> DibBitmap {
        decode(data, IoFlags::DEFAULT, &Limits::default()).unwrap()
    }

    #[test]
    fn rgb_round_trip() {
        let mut b = bitmap(PixelType::Bitmap, 24);
        b.set_rgb8_row(0, &[1, 2, 3, 4, 5, 6, 7, 8, 9]).unwrap();
        b.set_rgb8_row(1, &[9, 8, 7, 6, 5, 4, 3, 2, 1]).unwrap();
        let back = load(&encode_pages(&[&b], IoFlags::DEFAULT).unwrap());
        assert_eq!((back.pixel_type(), back.bpp()), (PixelType::Bitmap, 24));
        assert_eq!(back.rgb8_row(0).unwrap(), vec![1, 2, 3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(back.rgb8_row(1).unwrap(), vec![9, 8, 7, 6, 5, 4, 3, 2, 1]);
    }

    #[test]
    fn signed_and_float_types_round_trip() {
        let mut b = bitmap(PixelType::Int16, 16);
        b.set_samples(&[-3i16, 0, 3, i16::MIN, i16::MAX, 7]).unwrap();
        let back = load(&encode_pages(&[&b], IoFlags::TIFF_NONE).unwrap());
        assert_eq!(back.pixel_type(), PixelType::Int16);
        assert_eq!(back.samples::<i16>().unwrap(), vec![-3, 0, 3, i16::MIN, i16::MAX, 7]);

        let mut b = bitmap(PixelType::Double, 64);
        b.set_samples(&[0.5f64, -1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        let back = load(&encode_pages(&[&b], IoFlags::TIFF_PACKBITS).unwrap());
        assert_eq!(back.pixel_type(), PixelType::Double);
        assert_eq!(back.samples::<f64>().unwrap()[..2], [0.5, -1.0]);
    }

    #[test]
    fn complex_is_stored_as_two_float_bands() {
        let mut b = bitmap(PixelType::Complex, 128);
        let parts = [1.0f64, -1.0, 0.5, 2.5, 0.0, 0.0, 3.0, 4.0, -5.0, 6.0, 7.0, -8.5];
        b.set_samples(&parts).unwrap();
        let file = encode_pages(&[&b], IoFlags::TIFF_PACKBITS).unwrap();
        let back = load(&file);
        assert_eq!((back.pixel_type(), back.bpp()), (PixelType::Complex, 128));
        assert_eq!(back.samples::<f64>().unwrap(), parts.to_vec());
    }

    #[test]
    fn grey_loads_with_identity_palette() {
        let mut b = bitmap(PixelType::Bitmap, 8);
        b.install_greyscale_palette().unwrap();
        b.scanline_mut(1).unwrap().copy_from_slice(&[10, 20, 30]);
        let back = load(&encode_pages(&[&b], IoFlags::DEFAULT).unwrap());
        assert!(back.is_greyscale());
        assert_eq!(back.scanline(1).unwrap(), &[10, 20, 30]);
    }

    #[test]
    fn pages_stay_in_order() {
        let a = bitmap(PixelType::Float, 32);
        let b = bitmap(PixelType::RgbaF, 128);
        let file = encode_pages(&[&a, &b], IoFlags::DEFAULT).unwrap();
        let pages = decode_pages(&file, IoFlags::DEFAULT, &Limits::default()).unwrap();
        let types: Vec<_> = pages.iter().map(DibBitmap::pixel_type).collect();
        assert_eq!(types, vec![PixelType::Float, PixelType::RgbaF]);
    }

    #[test]
    fn baseline_tags_round_trip() {
        let mut b = bitmap(PixelType::Uint16, 16);
        b.set_text(MetadataModel::ExifMain, "Artist", "somebody");
        b.set_metadata(MetadataModel::ExifMain, "Orientation", TagType::Short, 6u16.to_ne_bytes().to_vec());
        let file = encode_pages(&[&b], IoFlags::DEFAULT).unwrap();
        let back = decode(&file, IoFlags::LOAD_NOPIXELS, &Limits::default()).unwrap();
        assert!(!back.has_pixels());
        assert_eq!(back.text(MetadataModel::ExifMain, "Artist").as_deref(), Some("somebody"));
        let orientation = back.tag(MetadataModel::ExifMain, "Orientation").unwrap();
        assert_eq!(orientation.value, 6u16.to_ne_bytes().to_vec());
        let x_res = back.tag(MetadataModel::ExifMain, "XResolution").unwrap();
        assert_eq!(x_res.type_code, TagType::Rational.code());
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(decode(b"II*\0garbage", IoFlags::DEFAULT, &Limits::default()).is_err());
    }
}
