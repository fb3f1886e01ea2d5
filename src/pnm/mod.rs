//! PNM family: P5 (PGM), P6 (PPM), P7 (PAM), PFM.
//!
//! 8-bit files load as `Bitmap` images (greyscale palette for one channel)
//! and samples below a maxval of 255 are rescaled to the full range.
//! 16-bit files load as `Uint16`/`Rgb16`/`Rgba16` with samples kept as
//! stored. `#` comments become the `Comment` tag of the COMMENTS model and
//! are written back on save.
//!
//! Credits: Implementation draws from [zune-ppm](https://github.com/etemesi254/zune-image)
//! by Caleb Etemesi (MIT/Apache-2.0/Zlib licensed).

mod decode;
mod encode;

use crate::dib::DibBitmap;
use crate::engine::FileType;
use crate::error::CodecError;
use crate::flags::IoFlags;
use crate::limits::Limits;

/// Which PNM sub-format a file uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PnmKind {
    /// P5: binary grayscale (PGM).
    Pgm,
    /// P6: binary RGB (PPM).
    Ppm,
    /// P7: PAM (arbitrary channels, with TUPLTYPE header).
    Pam,
    /// PFM: floating-point (grayscale or RGB, 32-bit float).
    Pfm,
}

pub(crate) fn decode(data: &[u8], flags: IoFlags, limits: &Limits) -> Result<DibBitmap, CodecError> {
    decode::decode_pnm(data, flags, limits)
}

pub(crate) fn encode(bitmap: &DibBitmap, file_type: FileType, flags: IoFlags) -> Result<Vec<u8>, CodecError> {
    let kind = match file_type {
        FileType::Pgm => PnmKind::Pgm,
        FileType::Ppm => PnmKind::Ppm,
        FileType::Pam => PnmKind::Pam,
        FileType::Pfm => PnmKind::Pfm,
        other => {
            return Err(CodecError::UnsupportedVariant(format!(
                "{other:?} is not a PNM format"
            )));
        }
    };
    if kind != PnmKind::Pfm && flags.contains(IoFlags::PNM_SAVE_ASCII) && flags != IoFlags::PNM_DEFAULT {
        return Err(CodecError::UnsupportedVariant("ASCII PNM output".into()));
    }
    encode::encode_pnm(bitmap, kind)
}
