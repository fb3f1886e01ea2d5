//! PNM header parsing and raster decoding.
//!
//! Credits: Draws from zune-ppm by Caleb Etemesi (MIT/Apache-2.0/Zlib).

use super::PnmKind;
use crate::dib::DibBitmap;
use crate::error::CodecError;
use crate::flags::IoFlags;
use crate::limits::Limits;
use crate::metadata::MetadataModel;
use crate::pixel::PixelType;

/// Parsed PNM header.
#[derive(Debug)]
pub(crate) struct PnmHeader {
    pub kind: PnmKind,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub maxval: u32,
    pub pfm_little_endian: bool,
    pub data_offset: usize,
    pub comments: Vec<String>,
}

struct HeaderReader<'a> {
    data: &'a [u8],
    pos: usize,
    comments: Vec<String>,
}

impl<'a> HeaderReader<'a> {
    fn skip_space_and_comments(&mut self) {
        loop {
            while self.data.get(self.pos).is_some_and(u8::is_ascii_whitespace) {
                self.pos += 1;
            }
            if self.data.get(self.pos) != Some(&b'#') {
                return;
            }
            let line = self.rest_of_line();
            self.comments.push(line.trim_start_matches('#').trim().to_owned());
        }
    }

    fn rest_of_line(&mut self) -> &'a str {
        let start = self.pos;
        while self.data.get(self.pos).is_some_and(|&b| b != b'\n') {
            self.pos += 1;
        }
        let line = &self.data[start..self.pos];
        core::str::from_utf8(line).unwrap_or("")
    }

    fn token(&mut self) -> Result<&'a str, CodecError> {
        self.skip_space_and_comments();
        let start = self.pos;
        while self
            .data
            .get(self.pos)
            .is_some_and(|&b| !b.is_ascii_whitespace() && b != b'#')
        {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(CodecError::UnexpectedEof);
        }
        core::str::from_utf8(&self.data[start..self.pos])
            .map_err(|_| CodecError::InvalidHeader("non-ASCII header token".into()))
    }

    fn number(&mut self, what: &str) -> Result<u32, CodecError> {
        let token = self.token()?;
        token
            .parse()
            .map_err(|_| CodecError::InvalidHeader(format!("bad {what}: {token:?}")))
    }

    /// The single whitespace byte that ends a header.
    fn end_of_header(&mut self) -> Result<usize, CodecError> {
        match self.data.get(self.pos) {
            Some(b) if b.is_ascii_whitespace() => Ok(self.pos + 1),
            Some(_) => Err(CodecError::InvalidHeader("missing whitespace after header".into())),
            None => Err(CodecError::UnexpectedEof),
        }
    }
}

/// Parse a P5, P6, P7 or PFM header.
pub(crate) fn parse_header(data: &[u8]) -> Result<PnmHeader, CodecError> {
    let kind = match data.get(..2) {
        Some(b"P5") => PnmKind::Pgm,
        Some(b"P6") => PnmKind::Ppm,
        Some(b"P7") => PnmKind::Pam,
        Some(b"Pf") | Some(b"PF") => PnmKind::Pfm,
        Some(_) => return Err(CodecError::UnrecognizedFormat),
        None => return Err(CodecError::UnexpectedEof),
    };
    let mut r = HeaderReader {
        data,
        pos: 2,
        comments: Vec::new(),
    };
    let mut header = PnmHeader {
        kind,
        width: 0,
        height: 0,
        depth: 1,
        maxval: 255,
        pfm_little_endian: false,
        data_offset: 0,
        comments: Vec::new(),
    };

    match kind {
        PnmKind::Pgm | PnmKind::Ppm => {
            header.width = r.number("width")?;
            header.height = r.number("height")?;
            header.maxval = r.number("maxval")?;
            header.depth = if kind == PnmKind::Ppm { 3 } else { 1 };
        }
        PnmKind::Pam => {
            let mut tupltype = String::new();
            loop {
                match r.token()? {
                    "WIDTH" => header.width = r.number("width")?,
                    "HEIGHT" => header.height = r.number("height")?,
                    "DEPTH" => header.depth = r.number("depth")?,
                    "MAXVAL" => header.maxval = r.number("maxval")?,
                    "TUPLTYPE" => tupltype = r.rest_of_line().trim().to_owned(),
                    "ENDHDR" => break,
                    other => {
                        return Err(CodecError::InvalidHeader(format!(
                            "unknown PAM header field {other:?}"
                        )));
                    }
                }
            }
            if tupltype.ends_with("_ALPHA") && header.depth == 2 {
                return Err(CodecError::UnsupportedVariant(
                    "grey + alpha PAM files".into(),
                ));
            }
        }
        PnmKind::Pfm => {
            header.width = r.number("width")?;
            header.height = r.number("height")?;
            let token = r.token()?;
            let scale: f32 = token
                .parse()
                .map_err(|_| CodecError::InvalidHeader(format!("bad PFM scale: {token:?}")))?;
            if scale == 0.0 || !scale.is_finite() {
                return Err(CodecError::InvalidHeader("PFM scale must be non-zero".into()));
            }
            header.pfm_little_endian = scale < 0.0;
            header.depth = if data[1] == b'F' { 3 } else { 1 };
        }
    }
    header.data_offset = r.end_of_header()?;
    header.comments = r.comments;

    if header.width == 0 || header.height == 0 {
        return Err(CodecError::InvalidHeader(format!(
            "PNM dimensions {}x{} are empty",
            header.width, header.height
        )));
    }
    if kind != PnmKind::Pfm && !(1..=65535).contains(&header.maxval) {
        return Err(CodecError::InvalidHeader(format!(
            "maxval {} out of range",
            header.maxval
        )));
    }
    Ok(header)
}

/// Bitmap type and depth for a header.
fn target(header: &PnmHeader) -> Result<(PixelType, u32), CodecError> {
    let wide = header.maxval > 255;
    Ok(match (header.kind, header.depth, wide) {
        (PnmKind::Pfm, 1, _) => (PixelType::Float, 32),
        (PnmKind::Pfm, 3, _) => (PixelType::RgbF, 96),
        (_, 1, false) => (PixelType::Bitmap, 8),
        (_, 3, false) => (PixelType::Bitmap, 24),
        (_, 4, false) => (PixelType::Bitmap, 32),
        (_, 1, true) => (PixelType::Uint16, 16),
        (_, 3, true) => (PixelType::Rgb16, 48),
        (_, 4, true) => (PixelType::Rgba16, 64),
        (_, depth, _) => {
            return Err(CodecError::UnsupportedVariant(format!(
                "PAM depth {depth}"
            )));
        }
    })
}

pub(crate) fn decode_pnm(data: &[u8], flags: IoFlags, limits: &Limits) -> Result<DibBitmap, CodecError> {
    let header = parse_header(data)?;
    let (pixel_type, bpp) = target(&header)?;
    let with_pixels = !flags.contains(IoFlags::LOAD_NOPIXELS);
    let mut bitmap = DibBitmap::new(pixel_type, header.width, header.height, bpp, limits, with_pixels)?;
    if pixel_type == PixelType::Bitmap && bpp == 8 {
        bitmap.install_greyscale_palette()?;
    }
    if !header.comments.is_empty() {
        bitmap.set_text(MetadataModel::Comments, "Comment", &header.comments.join("\n"));
    }
    if !with_pixels {
        return Ok(bitmap);
    }

    let pixel_data = data.get(header.data_offset..).ok_or(CodecError::UnexpectedEof)?;
    let samples = (header.width as usize)
        .checked_mul(header.height as usize)
        .and_then(|n| n.checked_mul(header.depth as usize))
        .ok_or(CodecError::DimensionsTooLarge {
            width: header.width,
            height: header.height,
        })?;
    match pixel_type {
        PixelType::Bitmap => decode_bytes(pixel_data, &header, samples, &mut bitmap)?,
        PixelType::Float | PixelType::RgbF => decode_pfm(pixel_data, &header, samples, &mut bitmap)?,
        _ => decode_words(pixel_data, samples, &mut bitmap)?,
    }
    Ok(bitmap)
}

/// 8-bit samples, rescaled to 0..=255 when maxval is smaller.
fn decode_bytes(
    data: &[u8],
    header: &PnmHeader,
    samples: usize,
    bitmap: &mut DibBitmap,
) -> Result<(), CodecError> {
    let src = data.get(..samples).ok_or(CodecError::UnexpectedEof)?;
    let maxval = header.maxval;
    let scaled: Vec<u8>;
    let src = if maxval == 255 {
        src
    } else {
        scaled = src
            .iter()
            .map(|&v| ((u32::from(v).min(maxval) * 255 + maxval / 2) / maxval) as u8)
            .collect();
        &scaled
    };
    let row_len = header.width as usize * header.depth as usize;
    for (y, row) in src.chunks_exact(row_len).enumerate() {
        if header.depth == 1 {
            bitmap
                .scanline_mut(y)
                .ok_or_else(crate::dib::no_pixels)?
                .copy_from_slice(row);
        } else {
            bitmap.set_rgb8_row(y, row)?;
        }
    }
    Ok(())
}

/// Big-endian 16-bit samples, stored as read.
fn decode_words(data: &[u8], samples: usize, bitmap: &mut DibBitmap) -> Result<(), CodecError> {
    let src = data.get(..samples * 2).ok_or(CodecError::UnexpectedEof)?;
    let words: Vec<u16> = src
        .chunks_exact(2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .collect();
    bitmap.set_samples(&words)
}

/// PFM rows run bottom to top.
fn decode_pfm(
    data: &[u8],
    header: &PnmHeader,
    samples: usize,
    bitmap: &mut DibBitmap,
) -> Result<(), CodecError> {
    let src = data.get(..samples * 4).ok_or(CodecError::UnexpectedEof)?;
    let row_len = header.width as usize * header.depth as usize;
    let mut values = vec![0f32; samples];
    for (r, row) in src.chunks_exact(row_len * 4).enumerate() {
        let y = header.height as usize - 1 - r;
        let dst = &mut values[y * row_len..(y + 1) * row_len];
        for (v, b) in dst.iter_mut().zip(row.chunks_exact(4)) {
            let raw = [b[0], b[1], b[2], b[3]];
            *v = if header.pfm_little_endian {
                f32::from_le_bytes(raw)
            } else {
                f32::from_be_bytes(raw)
            };
        }
    }
    bitmap.set_samples(&values)
}
