//! BMP reader: file header, info header, palette and uncompressed scanlines.
//!
//! Pixels keep their stored depth. Scanlines are DWORD-aligned in BMP files
//! exactly as in the engine's bitmaps, so rows copy straight across.

use super::utils::{field_shift, shift_signed};
use crate::dib::{DibBitmap, colour_is_bgr};
use crate::error::CodecError;
use crate::flags::IoFlags;
use crate::limits::Limits;
use crate::pixel::PixelType;

/// 5-5-5 masks, the meaning of 16 bpp without bitfields.
pub(crate) const MASKS_555: [u32; 3] = [0x7C00, 0x03E0, 0x001F];
const MASKS_8888: [u32; 3] = [0x00FF_0000, 0x0000_FF00, 0x0000_00FF];

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
enum Compression {
    Rgb,
    Rle8,
    Rle4,
    Bitfields,
}

impl Compression {
    fn from_u32(num: u32) -> Result<Self, CodecError> {
        match num {
            0 => Ok(Self::Rgb),
            1 => Ok(Self::Rle8),
            2 => Ok(Self::Rle4),
            3 | 6 => Ok(Self::Bitfields), // 6 = BI_ALPHABITFIELDS
            other => Err(CodecError::UnsupportedVariant(format!(
                "BMP compression scheme {other}"
            ))),
        }
    }
}

// ── Cursor for reading from &[u8] ───────────────────────────────────

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn set_position(&mut self, pos: usize) -> Result<(), CodecError> {
        if pos > self.data.len() {
            return Err(CodecError::UnexpectedEof);
        }
        self.pos = pos;
        Ok(())
    }

    fn skip(&mut self, n: usize) -> Result<(), CodecError> {
        let new_pos = self.pos.checked_add(n).ok_or(CodecError::UnexpectedEof)?;
        self.set_position(new_pos)
    }

    fn read_fixed_bytes<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let end = self.pos.checked_add(N).ok_or(CodecError::UnexpectedEof)?;
        let src = self.data.get(self.pos..end).ok_or(CodecError::UnexpectedEof)?;
        let mut buf = [0u8; N];
        buf.copy_from_slice(src);
        self.pos = end;
        Ok(buf)
    }

    fn get_u16_le(&mut self) -> Result<u16, CodecError> {
        self.read_fixed_bytes().map(u16::from_le_bytes)
    }

    fn get_u32_le(&mut self) -> Result<u32, CodecError> {
        self.read_fixed_bytes().map(u32::from_le_bytes)
    }
}

// ── Parsed headers ──────────────────────────────────────────────────

#[derive(Debug)]
pub(crate) struct BmpHeader {
    data_offset: usize,
    pub width: u32,
    pub height: u32,
    top_down: bool,
    pub bpp: u16,
    compression: Compression,
    /// Red, green, blue, alpha.
    masks: [u32; 4],
    palette_offset: usize,
    palette_entry_size: usize,
    colours: usize,
}

/// Parse the file and info headers.
pub(crate) fn parse_header(data: &[u8]) -> Result<BmpHeader, CodecError> {
    let mut bytes = Cursor::new(data);
    if bytes.read_fixed_bytes::<2>()? != *b"BM" {
        return Err(CodecError::UnrecognizedFormat);
    }
    let _file_size = bytes.get_u32_le()?;
    bytes.skip(4)?;
    let hsize = bytes.get_u32_le()?;
    let ihsize = bytes.get_u32_le()?;
    if ihsize.saturating_add(14) > hsize {
        return Err(CodecError::InvalidHeader("invalid BMP header size".into()));
    }

    let mut masks = [0u32; 4];
    let mut colours_used = 0u32;
    let (width, raw_height, planes, bpp, compression);
    match ihsize {
        12 => {
            // OS/2 BMPv1
            width = i32::from(bytes.get_u16_le()?);
            raw_height = i32::from(bytes.get_u16_le()?);
            planes = bytes.get_u16_le()?;
            bpp = bytes.get_u16_le()?;
            compression = Compression::Rgb;
        }
        16 | 40 | 52 | 56 | 64 | 108 | 124 => {
            width = bytes.get_u32_le()? as i32;
            raw_height = bytes.get_u32_le()? as i32;
            planes = bytes.get_u16_le()?;
            bpp = bytes.get_u16_le()?;
            compression = if ihsize >= 40 {
                Compression::from_u32(bytes.get_u32_le()?)?
            } else {
                Compression::Rgb
            };
            if ihsize > 16 {
                let _image_size = bytes.get_u32_le()?;
                let _x_ppm = bytes.get_u32_le()?;
                let _y_ppm = bytes.get_u32_le()?;
                colours_used = bytes.get_u32_le()?;
                let _important = bytes.get_u32_le()?;
                // Masks sit inside V2+ headers, or right after a 40-byte
                // header when compression is BI_BITFIELDS.
                if ihsize >= 52 || compression == Compression::Bitfields {
                    masks[0] = bytes.get_u32_le()?;
                    masks[1] = bytes.get_u32_le()?;
                    masks[2] = bytes.get_u32_le()?;
                }
                if ihsize >= 56 {
                    masks[3] = bytes.get_u32_le()?;
                }
            }
        }
        _ => {
            return Err(CodecError::InvalidHeader(format!(
                "unknown BMP info header size: {ihsize}"
            )));
        }
    }

    if planes != 1 {
        return Err(CodecError::InvalidHeader(format!(
            "BMP planes field is {planes}, expected 1"
        )));
    }
    if width <= 0 || raw_height == 0 {
        return Err(CodecError::InvalidHeader(format!(
            "BMP dimensions {width}x{raw_height} are invalid"
        )));
    }
    match compression {
        Compression::Rle4 | Compression::Rle8 => {
            return Err(CodecError::UnsupportedVariant("RLE-compressed BMP".into()));
        }
        Compression::Bitfields if !matches!(bpp, 16 | 32) => {
            return Err(CodecError::InvalidHeader(format!(
                "bitfields are not valid at {bpp} bpp"
            )));
        }
        _ => {}
    }
    if !matches!(bpp, 1 | 4 | 8 | 16 | 24 | 32) {
        return Err(CodecError::UnsupportedVariant(format!("BMP bit depth {bpp}")));
    }

    let palette_entry_size = if ihsize == 12 { 3 } else { 4 };
    let mut palette_offset = 14 + ihsize as usize;
    // External masks follow a 40-byte header and precede the palette.
    if ihsize == 40 && compression == Compression::Bitfields {
        palette_offset += 12;
    }
    let max_colours = if bpp <= 8 { 1usize << bpp } else { 0 };
    let colours = match colours_used as usize {
        0 => max_colours,
        n if n <= max_colours => n,
        n => {
            return Err(CodecError::InvalidHeader(format!(
                "BMP palette count ({n}) exceeds max for {bpp}-bit depth ({max_colours})"
            )));
        }
    };

    Ok(BmpHeader {
        data_offset: hsize as usize,
        width: width as u32,
        height: raw_height.unsigned_abs(),
        top_down: raw_height < 0,
        bpp,
        compression,
        masks,
        palette_offset,
        palette_entry_size,
        colours,
    })
}

/// Decode a BMP file into a bitmap of the same depth.
pub(crate) fn decode_bmp(data: &[u8], flags: IoFlags, limits: &Limits) -> Result<DibBitmap, CodecError> {
    let header = parse_header(data)?;
    let with_pixels = !flags.contains(IoFlags::LOAD_NOPIXELS);
    let mut bitmap = DibBitmap::new(
        PixelType::Bitmap,
        header.width,
        header.height,
        u32::from(header.bpp),
        limits,
        with_pixels,
    )?;

    read_palette(data, &header, &mut bitmap)?;
    if header.bpp == 16 && header.compression == Compression::Bitfields {
        let rgb = [header.masks[0], header.masks[1], header.masks[2]];
        bitmap.colour_masks = (rgb != MASKS_555).then_some(rgb);
    }
    if with_pixels {
        read_pixels(data, &header, &mut bitmap)?;
    }
    Ok(bitmap)
}

fn read_palette(data: &[u8], header: &BmpHeader, bitmap: &mut DibBitmap) -> Result<(), CodecError> {
    if header.colours == 0 {
        return Ok(());
    }
    let mut bytes = Cursor::new(data);
    bytes.set_position(header.palette_offset)?;
    for i in 0..header.colours {
        let [b, g, r] = bytes.read_fixed_bytes::<3>()?;
        if header.palette_entry_size == 4 {
            bytes.skip(1)?;
        }
        bitmap.set_palette_entry(i, r, g, b);
    }
    Ok(())
}

fn read_pixels(data: &[u8], header: &BmpHeader, bitmap: &mut DibBitmap) -> Result<(), CodecError> {
    let pitch = bitmap.pitch();
    let height = header.height as usize;
    let needed = pitch
        .checked_mul(height)
        .and_then(|n| n.checked_add(header.data_offset))
        .ok_or(CodecError::DimensionsTooLarge {
            width: header.width,
            height: header.height,
        })?;
    if data.len() < needed {
        return Err(CodecError::UnexpectedEof);
    }
    let pixels = &data[header.data_offset..needed];
    let convert_32 = header.bpp == 32
        && header.compression == Compression::Bitfields
        && (header.masks[..3] != MASKS_8888 || !(header.masks[3] == 0 || header.masks[3] == 0xFF00_0000));

    for (r, src) in pixels.chunks_exact(pitch).enumerate() {
        let y = if header.top_down { r } else { height - 1 - r };
        let row = bitmap.scanline_mut(y).ok_or_else(crate::dib::no_pixels)?;
        if convert_32 {
            unpack_bitfields_32(&src[..row.len()], row, header.masks);
        } else {
            row.copy_from_slice(&src[..row.len()]);
            to_host_order(row, header.bpp);
        }
    }
    Ok(())
}

/// Expand arbitrary 32-bit bitfields to 8-bit samples in host colour order.
fn unpack_bitfields_32(src: &[u8], dst: &mut [u8], masks: [u32; 4]) {
    let [mr, mg, mb, ma] = masks;
    let field = |v: u32, mask: u32| shift_signed(v & mask, field_shift(mask), mask.count_ones()) as u8;
    for (px, out) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)) {
        let v = u32::from_le_bytes([px[0], px[1], px[2], px[3]]);
        let (r, g, b) = (field(v, mr), field(v, mg), field(v, mb));
        let a = if ma == 0 { 255 } else { field(v, ma) };
        let quad = if colour_is_bgr() { [b, g, r, a] } else { [r, g, b, a] };
        out.copy_from_slice(&quad);
    }
}

/// BMP stores BGR(A) bytes and little-endian words; big-endian hosts
/// keep RGB(A) and native words.
pub(crate) fn to_host_order(row: &mut [u8], bpp: u16) {
    if colour_is_bgr() {
        return;
    }
    match bpp {
        24 | 32 => crate::reorder::swap_red_blue(row, usize::from(bpp / 8)),
        16 => row.chunks_exact_mut(2).for_each(|w| w.swap(0, 1)),
        _ => {}
    }
}
