//! Pixel-type registry: engine pixel-type tags ↔ typed array layouts.

use crate::error::BitmapError;

/// Storage type of one array element.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementType {
    U8,
    U16,
    I16,
    U32,
    I32,
    F32,
    F64,
    /// Two `f64`s: real then imaginary part.
    Complex64,
}

impl ElementType {
    /// Width of one element in bytes.
    pub const fn size(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 | Self::F32 => 4,
            Self::F64 => 8,
            Self::Complex64 => 16,
        }
    }
}

/// Engine-side pixel-type tag of a bitmap.
///
/// `Bitmap` is the generic palettised/colour bitmap whose layout depends on
/// its bit depth; every other tag fixes both element type and channel count.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PixelType {
    Unknown = 0,
    Bitmap = 1,
    Uint16 = 2,
    Int16 = 3,
    Uint32 = 4,
    Int32 = 5,
    Float = 6,
    Double = 7,
    Complex = 8,
    Rgb16 = 9,
    Rgba16 = 10,
    RgbF = 11,
    RgbaF = 12,
}

impl PixelType {
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => Self::Unknown,
            1 => Self::Bitmap,
            2 => Self::Uint16,
            3 => Self::Int16,
            4 => Self::Uint32,
            5 => Self::Int32,
            6 => Self::Float,
            7 => Self::Double,
            8 => Self::Complex,
            9 => Self::Rgb16,
            10 => Self::Rgba16,
            11 => Self::RgbF,
            12 => Self::RgbaF,
            _ => return None,
        })
    }

    /// Element type and extra (channel) dimension for this tag.
    ///
    /// `Bitmap` resolves only through its bit depth, see [`resolve`].
    const fn layout(self) -> Option<(ElementType, Option<usize>)> {
        Some(match self {
            Self::Uint16 => (ElementType::U16, None),
            Self::Int16 => (ElementType::I16, None),
            Self::Uint32 => (ElementType::U32, None),
            Self::Int32 => (ElementType::I32, None),
            Self::Float => (ElementType::F32, None),
            Self::Double => (ElementType::F64, None),
            Self::Complex => (ElementType::Complex64, None),
            Self::Rgb16 => (ElementType::U16, Some(3)),
            Self::Rgba16 => (ElementType::U16, Some(4)),
            Self::RgbF => (ElementType::F32, Some(3)),
            Self::RgbaF => (ElementType::F32, Some(4)),
            Self::Unknown | Self::Bitmap => return None,
        })
    }

    /// Bits per pixel of a bitmap of this type, or `None` for `Bitmap`
    /// (whose depth is free) and `Unknown`.
    pub const fn fixed_bpp(self) -> Option<u32> {
        match self.layout() {
            Some((element, channels)) => {
                let channels = match channels {
                    Some(c) => c,
                    None => 1,
                };
                Some((element.size() * channels * 8) as u32)
            }
            None => None,
        }
    }
}

/// Typed layout of a bitmap's pixels, derived from handle introspection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelDescriptor {
    pub element: ElementType,
    pub width: usize,
    pub height: usize,
    /// `None` for single-channel images (2-D arrays).
    pub channels: Option<usize>,
}

impl PixelDescriptor {
    /// Channel count, treating the 2-D case as one channel.
    pub fn channel_count(&self) -> usize {
        self.channels.unwrap_or(1)
    }

    /// Array shape: `[width, height]` or `[width, height, channels]`.
    pub fn shape(&self) -> Vec<usize> {
        match self.channels {
            Some(c) => vec![self.width, self.height, c],
            None => vec![self.width, self.height],
        }
    }

    /// Bytes of one logical row without pitch padding.
    pub fn row_bytes(&self) -> usize {
        self.width * self.channel_count() * self.element.size()
    }
}

/// Resolve the typed layout of a `width`×`height` bitmap of `pixel_type`
/// at `bpp` bits per pixel.
pub fn resolve(
    pixel_type: PixelType,
    bpp: u32,
    width: usize,
    height: usize,
) -> Result<PixelDescriptor, BitmapError> {
    let (element, channels) = match pixel_type {
        PixelType::Bitmap => match bpp {
            8 => (ElementType::U8, None),
            24 => (ElementType::U8, Some(3)),
            32 => (ElementType::U8, Some(4)),
            _ => {
                return Err(BitmapError::UnsupportedFormat(format!(
                    "cannot convert {bpp} bpp bitmap"
                )));
            }
        },
        other => other.layout().ok_or_else(|| {
            BitmapError::UnsupportedFormat(format!("unknown image pixel type {other:?}"))
        })?,
    };
    Ok(PixelDescriptor {
        element,
        width,
        height,
        channels,
    })
}

/// Pixel-type tag for an array of `element` with `channels` channels.
///
/// Only exact pairs are accepted; there is no nearest match, so a
/// conversion can never silently lose precision.
pub fn pixel_type_for(element: ElementType, channels: usize) -> Result<PixelType, BitmapError> {
    use ElementType as E;
    Ok(match (element, channels) {
        (E::U8, 1 | 3 | 4) => PixelType::Bitmap,
        (E::U16, 1) => PixelType::Uint16,
        (E::I16, 1) => PixelType::Int16,
        (E::U32, 1) => PixelType::Uint32,
        (E::I32, 1) => PixelType::Int32,
        (E::F32, 1) => PixelType::Float,
        (E::F64, 1) => PixelType::Double,
        (E::Complex64, 1) => PixelType::Complex,
        (E::U16, 3) => PixelType::Rgb16,
        (E::U16, 4) => PixelType::Rgba16,
        (E::F32, 3) => PixelType::RgbF,
        (E::F32, 4) => PixelType::RgbaF,
        _ => {
            return Err(BitmapError::UnsupportedFormat(format!(
                "cannot write arrays of {element:?} with {channels} channel(s)"
            )));
        }
    })
}
