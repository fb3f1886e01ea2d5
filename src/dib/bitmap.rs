//! In-memory device-independent bitmaps.

use std::collections::BTreeMap;

use crate::array::Element;
use crate::engine::RawTag;
use crate::error::CodecError;
use crate::limits::Limits;
use crate::metadata::{MetadataModel, TagType};
use crate::palette;
use crate::pixel::PixelType;

/// Bytes from one scanline to the next: rows are padded to 32 bits.
pub(crate) fn pitch_for(width: u32, bpp: u32) -> Option<usize> {
    let bits = (width as usize).checked_mul(bpp as usize)?;
    Some(bits.checked_add(31)? / 32 * 4)
}

/// Whether 8-bit colour pixels are stored blue first on this host.
pub(crate) const fn colour_is_bgr() -> bool {
    cfg!(target_endian = "little")
}

/// Bit depths a `Bitmap`-type image may have.
const BITMAP_DEPTHS: [u32; 6] = [1, 4, 8, 16, 24, 32];

/// A metadata tag owned by a bitmap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct StoredTag {
    pub key: String,
    pub type_code: u16,
    pub value: Vec<u8>,
}

impl StoredTag {
    pub fn as_raw(&self) -> RawTag<'_> {
        RawTag {
            key: &self.key,
            type_code: self.type_code,
            value: &self.value,
        }
    }
}

/// A bitmap owned by [`DibEngine`](super::DibEngine).
///
/// Scanlines are stored bottom-up, each padded to a multiple of four bytes.
/// 8-bit colour samples follow the host colour order (BGR(A) on
/// little-endian hosts). Wider samples are native-endian R, G, B[, A].
/// Bitmaps of 8 bpp or less carry a palette of `2^bpp` RGBQUADs.
#[derive(Clone, Debug)]
pub struct DibBitmap {
    pixel_type: PixelType,
    width: u32,
    height: u32,
    bpp: u32,
    pitch: usize,
    bits: Option<Vec<u8>>,
    palette: Option<Vec<u8>>,
    /// Red, green and blue masks of a 16-bit bitmap; `None` means 5-5-5.
    pub(crate) colour_masks: Option<[u32; 3]>,
    metadata: BTreeMap<MetadataModel, Vec<StoredTag>>,
    /// Set while the bitmap is checked out of a multi-page container.
    pub(crate) page_index: Option<usize>,
}

impl DibBitmap {
    /// Create a zeroed bitmap, or a header-only one without `with_pixels`.
    pub(crate) fn new(
        pixel_type: PixelType,
        width: u32,
        height: u32,
        bpp: u32,
        limits: &Limits,
        with_pixels: bool,
    ) -> Result<Self, CodecError> {
        let valid_depth = match pixel_type {
            PixelType::Bitmap => BITMAP_DEPTHS.contains(&bpp),
            PixelType::Unknown => false,
            other => other.fixed_bpp() == Some(bpp),
        };
        if !valid_depth {
            return Err(CodecError::UnsupportedVariant(format!(
                "{pixel_type:?} bitmaps cannot have {bpp} bits per pixel"
            )));
        }
        if width == 0 || height == 0 {
            return Err(CodecError::InvalidHeader(format!(
                "bitmap dimensions {width}x{height} are empty"
            )));
        }
        let pitch = pitch_for(width, bpp).ok_or(CodecError::DimensionsTooLarge { width, height })?;
        let bytes = limits.check_bitmap(width, height, pitch)?;
        let palette = (pixel_type == PixelType::Bitmap && bpp <= 8).then(|| vec![0u8; 4 << bpp]);
        Ok(Self {
            pixel_type,
            width,
            height,
            bpp,
            pitch,
            bits: with_pixels.then(|| vec![0u8; bytes]),
            palette,
            colour_masks: None,
            metadata: BTreeMap::new(),
            page_index: None,
        })
    }

    pub fn pixel_type(&self) -> PixelType {
        self.pixel_type
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bpp(&self) -> u32 {
        self.bpp
    }

    pub fn pitch(&self) -> usize {
        self.pitch
    }

    /// False for bitmaps loaded with `LOAD_NOPIXELS`.
    pub fn has_pixels(&self) -> bool {
        self.bits.is_some()
    }

    pub fn bits(&self) -> Option<&[u8]> {
        self.bits.as_deref()
    }

    pub fn bits_mut(&mut self) -> Option<&mut [u8]> {
        self.bits.as_deref_mut()
    }

    pub fn palette(&self) -> Option<&[u8]> {
        self.palette.as_deref()
    }

    pub fn palette_mut(&mut self) -> Option<&mut [u8]> {
        self.palette.as_deref_mut()
    }

    /// Bytes of pixel data in one scanline, padding excluded.
    pub(crate) fn row_len(&self) -> usize {
        (self.width as usize * self.bpp as usize).div_ceil(8)
    }

    fn row_start(&self, y: usize) -> usize {
        (self.height as usize - 1 - y) * self.pitch
    }

    /// Scanline `y`, counted from the top of the image.
    pub(crate) fn scanline(&self, y: usize) -> Option<&[u8]> {
        let start = self.row_start(y);
        let len = self.row_len();
        self.bits.as_deref().map(|b| &b[start..start + len])
    }

    /// Scanline `y`, counted from the top of the image.
    pub(crate) fn scanline_mut(&mut self, y: usize) -> Option<&mut [u8]> {
        let start = self.row_start(y);
        let len = self.row_len();
        self.bits.as_deref_mut().map(|b| &mut b[start..start + len])
    }

    /// Samples of the whole image, top row first, without padding.
    pub(crate) fn samples<T: Element>(&self) -> Result<Vec<T>, CodecError> {
        let size = T::TYPE.size();
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize);
        for y in 0..self.height as usize {
            let row = self.scanline(y).ok_or_else(no_pixels)?;
            out.extend(row.chunks_exact(size).map(T::read_ne));
        }
        Ok(out)
    }

    /// Fill the pixels from top-down samples of `T`.
    pub(crate) fn set_samples<T: Element>(&mut self, samples: &[T]) -> Result<(), CodecError> {
        let size = T::TYPE.size();
        let per_row = self.row_len() / size;
        if samples.len() < per_row * self.height as usize {
            return Err(CodecError::UnexpectedEof);
        }
        for (y, src) in samples.chunks_exact(per_row).take(self.height as usize).enumerate() {
            let row = self.scanline_mut(y).ok_or_else(no_pixels)?;
            for (dst, v) in row.chunks_exact_mut(size).zip(src) {
                v.write_ne(dst);
            }
        }
        Ok(())
    }

    /// Store a top-down row of 8-bit RGB or RGBA samples in host colour order.
    pub(crate) fn set_rgb8_row(&mut self, y: usize, rgb: &[u8]) -> Result<(), CodecError> {
        let channels = (self.bpp / 8) as usize;
        let row = self.scanline_mut(y).ok_or_else(no_pixels)?;
        row.copy_from_slice(&rgb[..row.len()]);
        if colour_is_bgr() {
            crate::reorder::swap_red_blue(row, channels);
        }
        Ok(())
    }

    /// Row `y` as 8-bit RGB(A) samples, for 24 and 32 bpp bitmaps.
    pub(crate) fn rgb8_row(&self, y: usize) -> Result<Vec<u8>, CodecError> {
        let channels = (self.bpp / 8) as usize;
        let mut row = self.scanline(y).ok_or_else(no_pixels)?.to_vec();
        if colour_is_bgr() {
            crate::reorder::swap_red_blue(&mut row, channels);
        }
        Ok(row)
    }

    /// Set palette entry `index` from red, green and blue.
    pub(crate) fn set_palette_entry(&mut self, index: usize, r: u8, g: u8, b: u8) {
        if let Some(p) = self.palette.as_deref_mut() {
            if let Some(entry) = p.get_mut(index * 4..index * 4 + 4) {
                let quad = if colour_is_bgr() { [b, g, r, 0] } else { [r, g, b, 0] };
                entry.copy_from_slice(&quad);
            }
        }
    }

    /// Red, green and blue of palette entry `index`.
    pub(crate) fn palette_entry(&self, index: usize) -> [u8; 3] {
        match self.palette.as_deref().and_then(|p| p.get(index * 4..index * 4 + 3)) {
            Some(e) if colour_is_bgr() => [e[2], e[1], e[0]],
            Some(e) => [e[0], e[1], e[2]],
            None => [0, 0, 0],
        }
    }

    pub(crate) fn install_greyscale_palette(&mut self) -> Result<(), CodecError> {
        palette::install_greyscale_ramp(self.palette.as_deref_mut())
            .map_err(|e| CodecError::InvalidData(e.to_string()))
    }

    /// Whether this is an 8-bit bitmap with the identity grey palette.
    pub(crate) fn is_greyscale(&self) -> bool {
        self.pixel_type == PixelType::Bitmap
            && self.bpp == 8
            && self.palette.as_deref().is_some_and(palette::is_greyscale_ramp)
    }

    /// Row `y` of an 8-bit bitmap as grey levels.
    ///
    /// Indices go through the palette unless it is the grey ramp; colour
    /// entries are reduced to Rec. 601 luma.
    pub(crate) fn grey8_row(&self, y: usize) -> Result<Vec<u8>, CodecError> {
        let row = self.scanline(y).ok_or_else(no_pixels)?;
        if self.is_greyscale() {
            return Ok(row.to_vec());
        }
        Ok(row
            .iter()
            .map(|&i| {
                let [r, g, b] = self.palette_entry(i as usize);
                luma(r, g, b)
            })
            .collect())
    }

    /// Attach a tag, replacing any tag of the same model and key.
    pub fn set_metadata(&mut self, model: MetadataModel, key: impl Into<String>, ty: TagType, value: Vec<u8>) {
        let key = key.into();
        let tags = self.metadata.entry(model).or_default();
        let tag = StoredTag {
            key,
            type_code: ty.code(),
            value,
        };
        match tags.iter_mut().find(|t| t.key == tag.key) {
            Some(existing) => *existing = tag,
            None => tags.push(tag),
        }
    }

    /// Attach an ASCII tag.
    pub fn set_text(&mut self, model: MetadataModel, key: impl Into<String>, text: &str) {
        let mut value = text.as_bytes().to_vec();
        value.push(0);
        self.set_metadata(model, key, TagType::Ascii, value);
    }

    /// Remove every tag of `model`.
    pub fn clear_metadata(&mut self, model: MetadataModel) {
        self.metadata.remove(&model);
    }

    pub(crate) fn tags(&self, model: MetadataModel) -> &[StoredTag] {
        self.metadata.get(&model).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn tag(&self, model: MetadataModel, key: &str) -> Option<&StoredTag> {
        self.tags(model).iter().find(|t| t.key == key)
    }

    /// Text of an ASCII tag, without its terminator.
    pub(crate) fn text(&self, model: MetadataModel, key: &str) -> Option<String> {
        let tag = self.tag(model, key)?;
        if tag.type_code != TagType::Ascii.code() {
            return None;
        }
        let end = tag.value.iter().position(|&b| b == 0).unwrap_or(tag.value.len());
        Some(String::from_utf8_lossy(&tag.value[..end]).into_owned())
    }
}

pub(crate) fn no_pixels() -> CodecError {
    CodecError::InvalidData("bitmap was loaded without pixels".into())
}

/// Rec. 601 luma, rounded.
pub(crate) fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((u32::from(r) * 299 + u32::from(g) * 587 + u32::from(b) * 114 + 500) / 1000) as u8
}
