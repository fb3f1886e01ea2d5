//! Owned, typed pixel arrays detached from engine memory.

use num_complex::Complex;

use crate::error::BitmapError;
use crate::pixel::ElementType;

/// Typed element storage of an [`OwnedArray`].
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq)]
pub enum ArrayData {
    U8(Vec<u8>),
    U16(Vec<u16>),
    I16(Vec<i16>),
    U32(Vec<u32>),
    I32(Vec<i32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    Complex(Vec<Complex<f64>>),
}

impl ArrayData {
    pub fn element_type(&self) -> ElementType {
        match self {
            Self::U8(_) => ElementType::U8,
            Self::U16(_) => ElementType::U16,
            Self::I16(_) => ElementType::I16,
            Self::U32(_) => ElementType::U32,
            Self::I32(_) => ElementType::I32,
            Self::F32(_) => ElementType::F32,
            Self::F64(_) => ElementType::F64,
            Self::Complex(_) => ElementType::Complex64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::U8(v) => v.len(),
            Self::U16(v) => v.len(),
            Self::I16(v) => v.len(),
            Self::U32(v) => v.len(),
            Self::I32(v) => v.len(),
            Self::F32(v) => v.len(),
            Self::F64(v) => v.len(),
            Self::Complex(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A scalar type that can be stored in an [`OwnedArray`].
///
/// Elements move between arrays and engine memory as native-endian bytes.
pub trait Element: Copy + PartialEq + core::fmt::Debug + Sized + 'static {
    const TYPE: ElementType;

    /// Decode one element from exactly `TYPE.size()` native-endian bytes.
    fn read_ne(bytes: &[u8]) -> Self;

    /// Encode into exactly `TYPE.size()` bytes, native endian.
    fn write_ne(self, out: &mut [u8]);

    fn wrap(values: Vec<Self>) -> ArrayData;

    fn slice(data: &ArrayData) -> Option<&[Self]>;

    fn slice_mut(data: &mut ArrayData) -> Option<&mut [Self]>;
}

macro_rules! primitive_element {
    ($t:ty, $variant:ident, $n:literal) => {
        impl Element for $t {
            const TYPE: ElementType = ElementType::$variant;

            fn read_ne(bytes: &[u8]) -> Self {
                let mut raw = [0u8; $n];
                raw.copy_from_slice(&bytes[..$n]);
                <$t>::from_ne_bytes(raw)
            }

            fn write_ne(self, out: &mut [u8]) {
                out[..$n].copy_from_slice(&self.to_ne_bytes());
            }

            fn wrap(values: Vec<Self>) -> ArrayData {
                ArrayData::$variant(values)
            }

            fn slice(data: &ArrayData) -> Option<&[Self]> {
                match data {
                    ArrayData::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn slice_mut(data: &mut ArrayData) -> Option<&mut [Self]> {
                match data {
                    ArrayData::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

primitive_element!(u8, U8, 1);
primitive_element!(u16, U16, 2);
primitive_element!(i16, I16, 2);
primitive_element!(u32, U32, 4);
primitive_element!(i32, I32, 4);
primitive_element!(f32, F32, 4);
primitive_element!(f64, F64, 8);

impl Element for Complex<f64> {
    const TYPE: ElementType = ElementType::Complex64;

    fn read_ne(bytes: &[u8]) -> Self {
        Complex::new(f64::read_ne(&bytes[..8]), f64::read_ne(&bytes[8..16]))
    }

    fn write_ne(self, out: &mut [u8]) {
        self.re.write_ne(&mut out[..8]);
        self.im.write_ne(&mut out[8..16]);
    }

    fn wrap(values: Vec<Self>) -> ArrayData {
        ArrayData::Complex(values)
    }

    fn slice(data: &ArrayData) -> Option<&[Self]> {
        match data {
            ArrayData::Complex(v) => Some(v),
            _ => None,
        }
    }

    fn slice_mut(data: &mut ArrayData) -> Option<&mut [Self]> {
        match data {
            ArrayData::Complex(v) => Some(v),
            _ => None,
        }
    }
}

/// Dispatch `$body` over the typed vector inside an [`ArrayData`], binding it
/// to `$v` and the element type to `$t`.
macro_rules! with_array_data {
    ($data:expr, |$v:ident: $t:ident| $body:expr) => {
        match $data {
            $crate::array::ArrayData::U8($v) => {
                type $t = u8;
                $body
            }
            $crate::array::ArrayData::U16($v) => {
                type $t = u16;
                $body
            }
            $crate::array::ArrayData::I16($v) => {
                type $t = i16;
                $body
            }
            $crate::array::ArrayData::U32($v) => {
                type $t = u32;
                $body
            }
            $crate::array::ArrayData::I32($v) => {
                type $t = i32;
                $body
            }
            $crate::array::ArrayData::F32($v) => {
                type $t = f32;
                $body
            }
            $crate::array::ArrayData::F64($v) => {
                type $t = f64;
                $body
            }
            $crate::array::ArrayData::Complex($v) => {
                type $t = num_complex::Complex<f64>;
                $body
            }
        }
    };
}
pub(crate) use with_array_data;

/// Accept only `[width, height]` and `[width, height, channels]` shapes.
pub(crate) fn check_rank(shape: &[usize]) -> Result<(), BitmapError> {
    match shape.len() {
        2 | 3 => Ok(()),
        ndim => Err(BitmapError::InvalidShape { ndim }),
    }
}

/// A detached copy of a bitmap's pixels.
///
/// Shape is `[width, height]` or `[width, height, channels]`. Element
/// `(x, y, c)` is stored at `(y * width + x) * channels + c`: scanlines of
/// pixels, top row first, no padding.
#[derive(Clone, Debug, PartialEq)]
pub struct OwnedArray {
    width: usize,
    height: usize,
    channels: Option<usize>,
    data: ArrayData,
}

impl OwnedArray {
    /// Build an array from typed storage. `channels = None` makes a 2-D array.
    pub fn new(
        width: usize,
        height: usize,
        channels: Option<usize>,
        data: ArrayData,
    ) -> Result<Self, BitmapError> {
        let needed = width
            .checked_mul(height)
            .and_then(|wh| wh.checked_mul(channels.unwrap_or(1)))
            .ok_or_else(|| BitmapError::ShapeMismatch(format!("{width}x{height} overflows")))?;
        if channels == Some(0) {
            return Err(BitmapError::ShapeMismatch("zero channels".into()));
        }
        if data.len() != needed {
            return Err(BitmapError::LengthMismatch {
                expected: needed,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// Build an array from a vector of elements.
    pub fn from_vec<T: Element>(
        width: usize,
        height: usize,
        channels: Option<usize>,
        values: Vec<T>,
    ) -> Result<Self, BitmapError> {
        Self::new(width, height, channels, T::wrap(values))
    }

    /// Build an array from an arbitrary shape, validating its rank.
    ///
    /// Only rank 2 (`[w, h]`) and rank 3 (`[w, h, c]`) are accepted.
    pub fn from_shape<T: Element>(shape: &[usize], values: Vec<T>) -> Result<Self, BitmapError> {
        check_rank(shape)?;
        match *shape {
            [w, h] => Self::from_vec(w, h, None, values),
            [w, h, c] => Self::from_vec(w, h, Some(c), values),
            _ => Err(BitmapError::InvalidShape { ndim: shape.len() }),
        }
    }

    /// A zero-filled array.
    pub fn zeros(
        element: ElementType,
        width: usize,
        height: usize,
        channels: Option<usize>,
    ) -> Result<Self, BitmapError> {
        let n = width
            .checked_mul(height)
            .and_then(|wh| wh.checked_mul(channels.unwrap_or(1)))
            .ok_or_else(|| {
                BitmapError::AllocationError(format!(
                    "{width}x{height}x{} {element:?} array overflows",
                    channels.unwrap_or(1)
                ))
            })?;
        let data = match element {
            ElementType::U8 => ArrayData::U8(vec![0; n]),
            ElementType::U16 => ArrayData::U16(vec![0; n]),
            ElementType::I16 => ArrayData::I16(vec![0; n]),
            ElementType::U32 => ArrayData::U32(vec![0; n]),
            ElementType::I32 => ArrayData::I32(vec![0; n]),
            ElementType::F32 => ArrayData::F32(vec![0.0; n]),
            ElementType::F64 => ArrayData::F64(vec![0.0; n]),
            ElementType::Complex64 => ArrayData::Complex(vec![Complex::new(0.0, 0.0); n]),
        };
        Self::new(width, height, channels, data)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Channel axis length, `None` for 2-D arrays.
    pub fn channels(&self) -> Option<usize> {
        self.channels
    }

    /// Channel count, treating 2-D arrays as one channel.
    pub fn channel_count(&self) -> usize {
        self.channels.unwrap_or(1)
    }

    pub fn ndim(&self) -> usize {
        if self.channels.is_some() { 3 } else { 2 }
    }

    pub fn shape(&self) -> Vec<usize> {
        match self.channels {
            Some(c) => vec![self.width, self.height, c],
            None => vec![self.width, self.height],
        }
    }

    pub fn element_type(&self) -> ElementType {
        self.data.element_type()
    }

    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut ArrayData {
        &mut self.data
    }

    pub fn into_data(self) -> ArrayData {
        self.data
    }

    /// Typed element slice, or `None` if `T` is not the element type.
    pub fn as_slice<T: Element>(&self) -> Option<&[T]> {
        T::slice(&self.data)
    }

    pub fn as_mut_slice<T: Element>(&mut self) -> Option<&mut [T]> {
        T::slice_mut(&mut self.data)
    }

    /// Linear index of element `(x, y, c)`.
    pub fn index(&self, x: usize, y: usize, c: usize) -> usize {
        (y * self.width + x) * self.channel_count() + c
    }

    /// Element at `(x, y, c)`; `c` must be 0 for 2-D arrays.
    pub fn get<T: Element>(&self, x: usize, y: usize, c: usize) -> Option<T> {
        if x >= self.width || y >= self.height || c >= self.channel_count() {
            return None;
        }
        self.as_slice::<T>().map(|s| s[self.index(x, y, c)])
    }

    /// Typed RGB pixels, for 8-bit 3-channel arrays.
    #[cfg(feature = "rgb")]
    pub fn as_rgb8(&self) -> Option<&[rgb::Rgb<u8>]> {
        use rgb::AsPixels as _;
        match (&self.data, self.channels) {
            (ArrayData::U8(v), Some(3)) => Some(v.as_pixels()),
            _ => None,
        }
    }

    /// Typed RGBA pixels, for 8-bit 4-channel arrays.
    #[cfg(feature = "rgb")]
    pub fn as_rgba8(&self) -> Option<&[rgb::Rgba<u8>]> {
        use rgb::AsPixels as _;
        match (&self.data, self.channels) {
            (ArrayData::U8(v), Some(4)) => Some(v.as_pixels()),
            _ => None,
        }
    }

    /// Copy into an [`imgref::ImgVec`] of single-channel elements.
    ///
    /// Returns `None` for multi-channel arrays or a mismatched `T`.
    #[cfg(feature = "imgref")]
    pub fn to_imgvec<T: Element>(&self) -> Option<imgref::ImgVec<T>> {
        if self.channels.is_some() {
            return None;
        }
        let pixels = self.as_slice::<T>()?;
        Some(imgref::ImgVec::new(pixels.to_vec(), self.width, self.height))
    }
}
