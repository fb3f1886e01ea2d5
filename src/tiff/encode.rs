//! TIFF writer: one image file directory per page.

use std::io::{Cursor, Seek, Write};

use ::tiff::encoder::colortype::{self, ColorType};
use ::tiff::encoder::{Compression, Rational, TiffEncoder, TiffValue};
use ::tiff::tags::{PhotometricInterpretation, ResolutionUnit, SampleFormat, Tag};
use tracing::debug;

use super::{ORIENTATION, RESOLUTION_UNIT, TEXT_TAGS, X_RESOLUTION, Y_RESOLUTION};
use crate::dib::DibBitmap;
use crate::error::CodecError;
use crate::flags::IoFlags;
use crate::metadata::{MetadataModel, TagType};
use crate::pixel::PixelType;

/// Compression chosen by the save flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Codec {
    None,
    Lzw,
    PackBits,
}

impl Codec {
    fn compression(self) -> Compression {
        match self {
            Self::None => Compression::Uncompressed,
            Self::Lzw => Compression::Lzw,
            Self::PackBits => Compression::Packbits,
        }
    }

    fn from_flags(flags: IoFlags) -> Self {
        if flags.contains(IoFlags::TIFF_NONE) {
            Self::None
        } else if flags.contains(IoFlags::TIFF_PACKBITS) {
            Self::PackBits
        } else {
            if !flags.contains(IoFlags::TIFF_LZW) && flags != IoFlags::TIFF_DEFAULT {
                debug!(flags = flags.bits(), "unsupported TIFF compression, using LZW");
            }
            Self::Lzw
        }
    }
}

/// Encode pages into one TIFF file.
pub(crate) fn encode_all(pages: &[&DibBitmap], flags: IoFlags) -> Result<Vec<u8>, CodecError> {
    let codec = Codec::from_flags(flags);
    let mut out = Cursor::new(Vec::new());
    {
        let mut encoder = TiffEncoder::new(&mut out)?.with_compression(codec.compression());
        for page in pages {
            write_page(&mut encoder, page)?;
        }
    }
    Ok(out.into_inner())
}

/// Complex samples as two float bands, real then imaginary.
struct ComplexF64;

impl ColorType for ComplexF64 {
    type Inner = f64;
    const TIFF_VALUE: PhotometricInterpretation = PhotometricInterpretation::BlackIsZero;
    const BITS_PER_SAMPLE: &'static [u16] = &[64, 64];
    const SAMPLE_FORMAT: &'static [SampleFormat] = &[SampleFormat::IEEEFP, SampleFormat::IEEEFP];

    // Only reached with a horizontal predictor, which is never set.
    fn horizontal_predict(row: &[f64], result: &mut Vec<f64>) {
        result.extend_from_slice(row);
    }
}

fn write_page<W: Write + Seek>(encoder: &mut TiffEncoder<W>, page: &DibBitmap) -> Result<(), CodecError> {
    match (page.pixel_type(), page.bpp()) {
        (PixelType::Bitmap, 8) => {
            let data = rows(page, DibBitmap::grey8_row)?;
            write_as::<_, colortype::Gray8>(encoder, page, &data)
        }
        (PixelType::Bitmap, 24) => {
            let data = rows(page, DibBitmap::rgb8_row)?;
            write_as::<_, colortype::RGB8>(encoder, page, &data)
        }
        (PixelType::Bitmap, 32) => {
            let data = rows(page, DibBitmap::rgb8_row)?;
            write_as::<_, colortype::RGBA8>(encoder, page, &data)
        }
        (PixelType::Uint16, _) => write_as::<_, colortype::Gray16>(encoder, page, &page.samples::<u16>()?),
        (PixelType::Int16, _) => write_as::<_, colortype::GrayI16>(encoder, page, &page.samples::<i16>()?),
        (PixelType::Uint32, _) => write_as::<_, colortype::Gray32>(encoder, page, &page.samples::<u32>()?),
        (PixelType::Int32, _) => write_as::<_, colortype::GrayI32>(encoder, page, &page.samples::<i32>()?),
        (PixelType::Float, _) => {
            write_as::<_, colortype::Gray32Float>(encoder, page, &page.samples::<f32>()?)
        }
        (PixelType::Double, _) => {
            write_as::<_, colortype::Gray64Float>(encoder, page, &page.samples::<f64>()?)
        }
        (PixelType::Rgb16, _) => write_as::<_, colortype::RGB16>(encoder, page, &page.samples::<u16>()?),
        (PixelType::Rgba16, _) => write_as::<_, colortype::RGBA16>(encoder, page, &page.samples::<u16>()?),
        (PixelType::RgbF, _) => {
            write_as::<_, colortype::RGB32Float>(encoder, page, &page.samples::<f32>()?)
        }
        (PixelType::RgbaF, _) => {
            write_as::<_, colortype::RGBA32Float>(encoder, page, &page.samples::<f32>()?)
        }
        (PixelType::Complex, _) => write_as::<_, ComplexF64>(encoder, page, &page.samples::<f64>()?),
        (other, bpp) => Err(CodecError::UnsupportedVariant(format!(
            "cannot encode {other:?} at {bpp} bpp as TIFF"
        ))),
    }
}

fn rows(
    page: &DibBitmap,
    row: fn(&DibBitmap, usize) -> Result<Vec<u8>, CodecError>,
) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::with_capacity(page.row_len() * page.height() as usize);
    for y in 0..page.height() as usize {
        out.extend_from_slice(&row(page, y)?);
    }
    Ok(out)
}

fn write_as<W, C>(encoder: &mut TiffEncoder<W>, page: &DibBitmap, data: &[C::Inner]) -> Result<(), CodecError>
where
    W: Write + Seek,
    C: ColorType,
    [C::Inner]: TiffValue,
{
    let mut image = encoder.new_image::<C>(page.width(), page.height())?;
    for &(code, key) in TEXT_TAGS {
        if let Some(text) = page.text(MetadataModel::ExifMain, key) {
            image.encoder().write_tag(Tag::from_u16_exhaustive(code), text.as_str())?;
        }
    }
    if let Some(v) = short_tag(page, ORIENTATION.1) {
        image.encoder().write_tag(Tag::from_u16_exhaustive(ORIENTATION.0), v)?;
    }
    let unit = short_tag(page, RESOLUTION_UNIT.1)
        .and_then(ResolutionUnit::from_u16)
        .unwrap_or(ResolutionUnit::Inch);
    image.resolution_unit(unit);
    image.x_resolution(rational_tag(page, X_RESOLUTION.1).unwrap_or(Rational { n: 72, d: 1 }));
    image.y_resolution(rational_tag(page, Y_RESOLUTION.1).unwrap_or(Rational { n: 72, d: 1 }));
    image.write_data(data)?;
    Ok(())
}

fn short_tag(page: &DibBitmap, key: &str) -> Option<u16> {
    let tag = page.tag(MetadataModel::ExifMain, key)?;
    let raw: [u8; 2] = tag.value.get(..2)?.try_into().ok()?;
    (tag.type_code == TagType::Short.code()).then(|| u16::from_ne_bytes(raw))
}

fn rational_tag(page: &DibBitmap, key: &str) -> Option<Rational> {
    let tag = page.tag(MetadataModel::ExifMain, key)?;
    if tag.type_code != TagType::Rational.code() {
        return None;
    }
    let n: [u8; 4] = tag.value.get(..4)?.try_into().ok()?;
    let d: [u8; 4] = tag.value.get(4..8)?.try_into().ok()?;
    let d = u32::from_ne_bytes(d);
    (d != 0).then(|| Rational {
        n: u32::from_ne_bytes(n),
        d,
    })
}
