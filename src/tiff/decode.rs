//! TIFF reader: one bitmap per image file directory.

use std::io::Cursor;

use ::tiff::ColorType;
use ::tiff::decoder::ifd::Value;
use ::tiff::decoder::{Decoder, DecodingResult};
use ::tiff::tags::Tag;
use tracing::debug;

use super::{ORIENTATION, RESOLUTION_UNIT, TEXT_TAGS, X_RESOLUTION, Y_RESOLUTION};
use crate::dib::{DibBitmap, no_pixels};
use crate::error::CodecError;
use crate::flags::IoFlags;
use crate::limits::Limits;
use crate::metadata::{MetadataModel, TagType};
use crate::pixel::PixelType;

const SAMPLE_UINT: u16 = 1;
const SAMPLE_INT: u16 = 2;
const SAMPLE_FLOAT: u16 = 3;

type TiffDecoder<'a> = Decoder<Cursor<&'a [u8]>>;

/// Decode the first image of a TIFF file.
pub(crate) fn decode_first(data: &[u8], flags: IoFlags, limits: &Limits) -> Result<DibBitmap, CodecError> {
    let mut decoder = Decoder::new(Cursor::new(data))?;
    decode_page(&mut decoder, flags, limits)
}

/// Decode every image of a TIFF file, in order.
pub(crate) fn decode_all(data: &[u8], flags: IoFlags, limits: &Limits) -> Result<Vec<DibBitmap>, CodecError> {
    let mut decoder = Decoder::new(Cursor::new(data))?;
    let mut pages = vec![decode_page(&mut decoder, flags, limits)?];
    while decoder.more_images() {
        decoder.next_image()?;
        pages.push(decode_page(&mut decoder, flags, limits)?);
    }
    Ok(pages)
}

fn decode_page(decoder: &mut TiffDecoder<'_>, flags: IoFlags, limits: &Limits) -> Result<DibBitmap, CodecError> {
    let (width, height) = decoder.dimensions()?;
    let colortype = decoder.colortype()?;
    let sample_format = find(decoder, Tag::SampleFormat)
        .and_then(first_u16)
        .unwrap_or(SAMPLE_UINT);
    let (pixel_type, bpp) = target(colortype, sample_format)?;
    let with_pixels = !flags.contains(IoFlags::LOAD_NOPIXELS);
    let mut bitmap = DibBitmap::new(pixel_type, width, height, bpp, limits, with_pixels)?;

    if colortype == ColorType::Palette(8) {
        read_colour_map(decoder, &mut bitmap)?;
    } else if pixel_type == PixelType::Bitmap && bpp == 8 {
        bitmap.install_greyscale_palette()?;
    }
    read_tags(decoder, &mut bitmap);

    if with_pixels {
        match decoder.read_image()? {
            DecodingResult::U8(buf) => fill_bytes(&mut bitmap, &buf)?,
            DecodingResult::U16(buf) => bitmap.set_samples(&buf)?,
            DecodingResult::I16(buf) => bitmap.set_samples(&buf)?,
            DecodingResult::U32(buf) => bitmap.set_samples(&buf)?,
            DecodingResult::I32(buf) => bitmap.set_samples(&buf)?,
            DecodingResult::F32(buf) => bitmap.set_samples(&buf)?,
            DecodingResult::F64(buf) => bitmap.set_samples(&buf)?,
            _ => {
                return Err(CodecError::UnsupportedVariant(format!(
                    "TIFF sample type of {colortype:?}"
                )));
            }
        }
    }
    Ok(bitmap)
}

/// Bitmap type and depth for a colour type and SampleFormat.
fn target(colortype: ColorType, sample_format: u16) -> Result<(PixelType, u32), CodecError> {
    Ok(match (colortype, sample_format) {
        (ColorType::Gray(8) | ColorType::Palette(8), SAMPLE_UINT) => (PixelType::Bitmap, 8),
        (ColorType::RGB(8), SAMPLE_UINT) => (PixelType::Bitmap, 24),
        (ColorType::RGBA(8), SAMPLE_UINT) => (PixelType::Bitmap, 32),
        (ColorType::Gray(16), SAMPLE_UINT) => (PixelType::Uint16, 16),
        (ColorType::Gray(16), SAMPLE_INT) => (PixelType::Int16, 16),
        (ColorType::Gray(32), SAMPLE_UINT) => (PixelType::Uint32, 32),
        (ColorType::Gray(32), SAMPLE_INT) => (PixelType::Int32, 32),
        (ColorType::Gray(32), SAMPLE_FLOAT) => (PixelType::Float, 32),
        (ColorType::Gray(64), SAMPLE_FLOAT) => (PixelType::Double, 64),
        (ColorType::RGB(16), SAMPLE_UINT) => (PixelType::Rgb16, 48),
        (ColorType::RGBA(16), SAMPLE_UINT) => (PixelType::Rgba16, 64),
        (ColorType::RGB(32), SAMPLE_FLOAT) => (PixelType::RgbF, 96),
        (ColorType::RGBA(32), SAMPLE_FLOAT) => (PixelType::RgbaF, 128),
        // Two float bands hold real and imaginary parts.
        (
            ColorType::Multiband {
                bit_depth: 64,
                num_samples: 2,
            },
            SAMPLE_FLOAT,
        ) => (PixelType::Complex, 128),
        (other, format) => {
            return Err(CodecError::UnsupportedVariant(format!(
                "TIFF {other:?} with sample format {format}"
            )));
        }
    })
}

/// Tag lookup that treats unreadable values as absent.
fn find(decoder: &mut TiffDecoder<'_>, tag: Tag) -> Option<Value> {
    match decoder.find_tag(tag) {
        Ok(value) => value,
        Err(e) => {
            debug!(?tag, error = %e, "ignoring unreadable TIFF tag");
            None
        }
    }
}

fn first_u16(value: Value) -> Option<u16> {
    match value {
        Value::Short(v) => Some(v),
        Value::Byte(v) => Some(v.into()),
        Value::Unsigned(v) => u16::try_from(v).ok(),
        Value::List(values) => values.into_iter().next().and_then(first_u16),
        _ => None,
    }
}

fn read_colour_map(decoder: &mut TiffDecoder<'_>, bitmap: &mut DibBitmap) -> Result<(), CodecError> {
    let Some(Value::List(values)) = find(decoder, Tag::ColorMap) else {
        return Err(CodecError::InvalidHeader("palette TIFF without a colour map".into()));
    };
    let map: Vec<u16> = values.into_iter().filter_map(first_u16).collect();
    if map.len() < 3 * 256 {
        return Err(CodecError::InvalidHeader(format!(
            "TIFF colour map has {} entries, need 768",
            map.len()
        )));
    }
    for i in 0..256 {
        let [r, g, b] = [map[i], map[256 + i], map[512 + i]].map(|c| (c >> 8) as u8);
        bitmap.set_palette_entry(i, r, g, b);
    }
    Ok(())
}

/// Baseline tags become EXIF_MAIN metadata.
fn read_tags(decoder: &mut TiffDecoder<'_>, bitmap: &mut DibBitmap) {
    for &(code, key) in TEXT_TAGS {
        if let Some(text) = find(decoder, Tag::from_u16_exhaustive(code)).and_then(|v| v.into_string().ok()) {
            bitmap.set_text(MetadataModel::ExifMain, key, text.trim_end_matches('\0'));
        }
    }
    for (code, key) in [ORIENTATION, RESOLUTION_UNIT] {
        if let Some(v) = find(decoder, Tag::from_u16_exhaustive(code)).and_then(first_u16) {
            bitmap.set_metadata(MetadataModel::ExifMain, key, TagType::Short, v.to_ne_bytes().to_vec());
        }
    }
    for (code, key) in [X_RESOLUTION, Y_RESOLUTION] {
        if let Some(Value::Rational(n, d)) = find(decoder, Tag::from_u16_exhaustive(code)) {
            let mut raw = n.to_ne_bytes().to_vec();
            raw.extend_from_slice(&d.to_ne_bytes());
            bitmap.set_metadata(MetadataModel::ExifMain, key, TagType::Rational, raw);
        }
    }
}

/// 8-bit samples: grey or palette indices as stored, colour in host order.
fn fill_bytes(bitmap: &mut DibBitmap, buf: &[u8]) -> Result<(), CodecError> {
    let row_len = bitmap.row_len();
    if buf.len() < row_len * bitmap.height() as usize {
        return Err(CodecError::UnexpectedEof);
    }
    for (y, row) in buf.chunks_exact(row_len).take(bitmap.height() as usize).enumerate() {
        if bitmap.bpp() == 8 {
            bitmap.scanline_mut(y).ok_or_else(no_pixels)?.copy_from_slice(row);
        } else {
            bitmap.set_rgb8_row(y, row)?;
        }
    }
    Ok(())
}
