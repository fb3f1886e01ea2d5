//! PNM encoder: P5, P6, P7, PFM.
//!
//! Credits: Draws from zune-ppm by Caleb Etemesi (MIT/Apache-2.0/Zlib).

use super::PnmKind;
use crate::dib::DibBitmap;
use crate::error::CodecError;
use crate::metadata::MetadataModel;
use crate::pixel::PixelType;

/// Encode a bitmap as the given PNM sub-format.
pub(crate) fn encode_pnm(bitmap: &DibBitmap, kind: PnmKind) -> Result<Vec<u8>, CodecError> {
    let width = bitmap.width();
    let height = bitmap.height();
    let pixel_type = bitmap.pixel_type();
    let comments = comment_lines(bitmap);

    match (kind, pixel_type) {
        (PnmKind::Pfm, _) => encode_pfm(bitmap),
        (_, PixelType::Bitmap) => {
            let (magic, depth) = match (kind, bitmap.bpp()) {
                (PnmKind::Pgm, 8) => ("P5", 1),
                (PnmKind::Ppm, 24) => ("P6", 3),
                (PnmKind::Pam, 8) => ("P7", 1),
                (PnmKind::Pam, 24) => ("P7", 3),
                (PnmKind::Pam, 32) => ("P7", 4),
                (_, bpp) => return Err(unsupported(kind, pixel_type, bpp)),
            };
            let header = header(magic, &comments, width, height, depth, 255);
            let mut out = Vec::with_capacity(header.len() + width as usize * height as usize * depth);
            out.extend_from_slice(header.as_bytes());
            for y in 0..height as usize {
                let row = if depth == 1 {
                    bitmap.grey8_row(y)?
                } else {
                    bitmap.rgb8_row(y)?
                };
                out.extend_from_slice(&row);
            }
            Ok(out)
        }
        (_, PixelType::Uint16 | PixelType::Rgb16 | PixelType::Rgba16) => {
            let (magic, depth) = match (kind, pixel_type) {
                (PnmKind::Pgm, PixelType::Uint16) => ("P5", 1),
                (PnmKind::Ppm, PixelType::Rgb16) => ("P6", 3),
                (PnmKind::Pam, PixelType::Uint16) => ("P7", 1),
                (PnmKind::Pam, PixelType::Rgb16) => ("P7", 3),
                (PnmKind::Pam, PixelType::Rgba16) => ("P7", 4),
                _ => return Err(unsupported(kind, pixel_type, bitmap.bpp())),
            };
            let header = header(magic, &comments, width, height, depth, 65535);
            let words = bitmap.samples::<u16>()?;
            let mut out = Vec::with_capacity(header.len() + words.len() * 2);
            out.extend_from_slice(header.as_bytes());
            for w in words {
                out.extend_from_slice(&w.to_be_bytes());
            }
            Ok(out)
        }
        _ => Err(unsupported(kind, pixel_type, bitmap.bpp())),
    }
}

fn unsupported(kind: PnmKind, pixel_type: PixelType, bpp: u32) -> CodecError {
    CodecError::UnsupportedVariant(format!(
        "cannot encode {pixel_type:?} at {bpp} bpp as {kind:?}"
    ))
}

fn comment_lines(bitmap: &DibBitmap) -> String {
    let Some(text) = bitmap.text(MetadataModel::Comments, "Comment") else {
        return String::new();
    };
    text.lines().map(|line| format!("# {line}\n")).collect()
}

fn header(magic: &str, comments: &str, width: u32, height: u32, depth: usize, maxval: u32) -> String {
    if magic == "P7" {
        let tupltype = match depth {
            1 => "GRAYSCALE",
            3 => "RGB",
            _ => "RGB_ALPHA",
        };
        format!(
            "P7\n{comments}WIDTH {width}\nHEIGHT {height}\nDEPTH {depth}\nMAXVAL {maxval}\nTUPLTYPE {tupltype}\nENDHDR\n"
        )
    } else {
        format!("{magic}\n{comments}{width} {height}\n{maxval}\n")
    }
}

fn encode_pfm(bitmap: &DibBitmap) -> Result<Vec<u8>, CodecError> {
    let (magic, depth) = match bitmap.pixel_type() {
        PixelType::Float => ("Pf", 1),
        PixelType::RgbF => ("PF", 3),
        other => return Err(unsupported(PnmKind::Pfm, other, bitmap.bpp())),
    };
    let width = bitmap.width() as usize;
    let header = format!("{magic}\n{} {}\n-1.0\n", bitmap.width(), bitmap.height());
    let values = bitmap.samples::<f32>()?;
    let row_len = width * depth;
    let mut out = Vec::with_capacity(header.len() + values.len() * 4);
    out.extend_from_slice(header.as_bytes());

    // PFM stores bottom-to-top
    for row in values.chunks_exact(row_len).rev() {
        for v in row {
            out.extend_from_slice(&v.to_le_bytes());
        }
    }
    Ok(out)
}
