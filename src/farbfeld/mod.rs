//! Farbfeld image format decoder and encoder.
//!
//! Farbfeld is a simple lossless format: 8-byte magic ("farbfeld"),
//! width/height as u32 big-endian, then RGBA u16 big-endian pixels.
//! Files load as `Rgba16` bitmaps.
//!
//! Implementation draws from [zune-farbfeld](https://github.com/etemesi254/zune-image)
//! by Caleb Etemesi (MIT/Apache-2.0/Zlib licensed).

mod decode;
mod encode;

use crate::dib::DibBitmap;
use crate::error::CodecError;
use crate::flags::IoFlags;
use crate::limits::Limits;

pub(crate) fn decode(data: &[u8], flags: IoFlags, limits: &Limits) -> Result<DibBitmap, CodecError> {
    decode::decode_farbfeld(data, flags, limits)
}

pub(crate) fn encode(bitmap: &DibBitmap, _flags: IoFlags) -> Result<Vec<u8>, CodecError> {
    encode::encode_farbfeld(bitmap)
}
