//! Metadata type registry: tag type codes and typed decoding of raw payloads.

use tracing::{debug, warn};

/// Data type code of a metadata tag.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum TagType {
    /// 8-bit unsigned integer.
    Byte = 1,
    /// 8-bit bytes, NUL terminated.
    Ascii = 2,
    /// 16-bit unsigned integer.
    Short = 3,
    /// 32-bit unsigned integer.
    Long = 4,
    /// Two 32-bit unsigned integers: numerator, denominator.
    Rational = 5,
    SByte = 6,
    /// 8-bit untyped data.
    Undefined = 7,
    SShort = 8,
    SLong = 9,
    /// Two 32-bit signed integers: numerator, denominator.
    SRational = 10,
    Float = 11,
    Double = 12,
    /// 32-bit offset.
    Ifd = 13,
    /// 32-bit RGBQUAD.
    Palette = 14,
    Long8 = 16,
    SLong8 = 17,
    /// 64-bit offset.
    Ifd8 = 18,
}

impl TagType {
    pub fn from_code(code: u16) -> Option<Self> {
        Some(match code {
            1 => Self::Byte,
            2 => Self::Ascii,
            3 => Self::Short,
            4 => Self::Long,
            5 => Self::Rational,
            6 => Self::SByte,
            7 => Self::Undefined,
            8 => Self::SShort,
            9 => Self::SLong,
            10 => Self::SRational,
            11 => Self::Float,
            12 => Self::Double,
            13 => Self::Ifd,
            14 => Self::Palette,
            16 => Self::Long8,
            17 => Self::SLong8,
            18 => Self::Ifd8,
            _ => return None,
        })
    }

    pub const fn code(self) -> u16 {
        self as u16
    }

    /// Bytes of one element of this type.
    pub const fn element_size(self) -> usize {
        match self {
            Self::Byte | Self::Ascii | Self::SByte | Self::Undefined => 1,
            Self::Short | Self::SShort => 2,
            Self::Long | Self::SLong | Self::Float | Self::Ifd | Self::Palette => 4,
            Self::Rational
            | Self::SRational
            | Self::Double
            | Self::Long8
            | Self::SLong8
            | Self::Ifd8 => 8,
        }
    }
}

/// One decoded element of a non-text tag.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Scalar {
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    F32(f32),
    F64(f64),
    /// `(numerator, denominator)`
    Rational(u32, u32),
    /// `(numerator, denominator)`
    SRational(i32, i32),
    /// Raw palette quad, in stored byte order.
    Palette([u8; 4]),
}

impl Scalar {
    /// Integer view of the element, if it is an integer type.
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Self::U8(v) => Some(u64::from(v)),
            Self::U16(v) => Some(u64::from(v)),
            Self::U32(v) => Some(u64::from(v)),
            Self::U64(v) => Some(v),
            Self::I8(v) => u64::try_from(v).ok(),
            Self::I16(v) => u64::try_from(v).ok(),
            Self::I32(v) => u64::try_from(v).ok(),
            Self::I64(v) => u64::try_from(v).ok(),
            _ => None,
        }
    }
}

/// A decoded metadata tag value.
#[derive(Clone, Debug, PartialEq)]
pub enum TagValue {
    /// An ASCII tag, without its terminator.
    Text(String),
    /// A payload of exactly one element.
    Scalar(Scalar),
    /// Zero or several elements.
    Array(Vec<Scalar>),
}

impl TagValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Scalar]> {
        match self {
            Self::Array(v) => Some(v),
            _ => None,
        }
    }
}

/// Decode a raw tag payload according to its type code.
///
/// ASCII payloads are cut at the first NUL and decoded lossily as UTF-8.
/// Other payloads are split into native-endian elements; a payload of
/// exactly one element collapses to [`TagValue::Scalar`].
pub fn decode(type_code: u16, raw: &[u8]) -> TagValue {
    let ty = match TagType::from_code(type_code) {
        Some(ty) => ty,
        None => {
            debug!(type_code, "unknown metadata type, keeping raw bytes");
            TagType::Undefined
        }
    };
    if ty == TagType::Ascii {
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        return TagValue::Text(String::from_utf8_lossy(&raw[..end]).into_owned());
    }

    let size = ty.element_size();
    let chunks = raw.chunks_exact(size);
    if !chunks.remainder().is_empty() {
        warn!(
            ?ty,
            len = raw.len(),
            "metadata payload is not a whole number of elements, dropping trailing bytes"
        );
    }
    let mut values: Vec<Scalar> = chunks.map(|c| element(ty, c)).collect();
    if values.len() == 1 {
        TagValue::Scalar(values.remove(0))
    } else {
        TagValue::Array(values)
    }
}

fn element(ty: TagType, b: &[u8]) -> Scalar {
    let u16_at = |i: usize| u16::from_ne_bytes([b[i], b[i + 1]]);
    let u32_at = |i: usize| u32::from_ne_bytes([b[i], b[i + 1], b[i + 2], b[i + 3]]);
    let u64_at = |i: usize| {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&b[i..i + 8]);
        u64::from_ne_bytes(raw)
    };
    match ty {
        TagType::Byte | TagType::Undefined | TagType::Ascii => Scalar::U8(b[0]),
        TagType::SByte => Scalar::I8(b[0] as i8),
        TagType::Short => Scalar::U16(u16_at(0)),
        TagType::SShort => Scalar::I16(u16_at(0) as i16),
        TagType::Long | TagType::Ifd => Scalar::U32(u32_at(0)),
        TagType::SLong => Scalar::I32(u32_at(0) as i32),
        TagType::Float => Scalar::F32(f32::from_bits(u32_at(0))),
        TagType::Palette => Scalar::Palette([b[0], b[1], b[2], b[3]]),
        TagType::Rational => Scalar::Rational(u32_at(0), u32_at(4)),
        TagType::SRational => Scalar::SRational(u32_at(0) as i32, u32_at(4) as i32),
        TagType::Double => Scalar::F64(f64::from_bits(u64_at(0))),
        TagType::Long8 | TagType::Ifd8 => Scalar::U64(u64_at(0)),
        TagType::SLong8 => Scalar::I64(u64_at(0) as i64),
    }
}

/// Encode `values` as a native-endian payload of type `ty`.
///
/// Text and elements that do not belong to `ty` are skipped.
pub fn encode(ty: TagType, value: &TagValue) -> Vec<u8> {
    match value {
        TagValue::Text(s) => {
            let mut out = s.as_bytes().to_vec();
            out.push(0);
            out
        }
        TagValue::Scalar(s) => encode_scalars(ty, core::slice::from_ref(s)),
        TagValue::Array(v) => encode_scalars(ty, v),
    }
}

fn encode_scalars(ty: TagType, values: &[Scalar]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * ty.element_size());
    for v in values {
        match (ty, *v) {
            (TagType::Byte | TagType::Undefined, Scalar::U8(x)) => out.push(x),
            (TagType::SByte, Scalar::I8(x)) => out.extend_from_slice(&x.to_ne_bytes()),
            (TagType::Short, Scalar::U16(x)) => out.extend_from_slice(&x.to_ne_bytes()),
            (TagType::SShort, Scalar::I16(x)) => out.extend_from_slice(&x.to_ne_bytes()),
            (TagType::Long | TagType::Ifd, Scalar::U32(x)) => out.extend_from_slice(&x.to_ne_bytes()),
            (TagType::SLong, Scalar::I32(x)) => out.extend_from_slice(&x.to_ne_bytes()),
            (TagType::Float, Scalar::F32(x)) => out.extend_from_slice(&x.to_ne_bytes()),
            (TagType::Double, Scalar::F64(x)) => out.extend_from_slice(&x.to_ne_bytes()),
            (TagType::Long8 | TagType::Ifd8, Scalar::U64(x)) => out.extend_from_slice(&x.to_ne_bytes()),
            (TagType::SLong8, Scalar::I64(x)) => out.extend_from_slice(&x.to_ne_bytes()),
            (TagType::Palette, Scalar::Palette(q)) => out.extend_from_slice(&q),
            (TagType::Rational, Scalar::Rational(n, d)) => {
                out.extend_from_slice(&n.to_ne_bytes());
                out.extend_from_slice(&d.to_ne_bytes());
            }
            (TagType::SRational, Scalar::SRational(n, d)) => {
                out.extend_from_slice(&n.to_ne_bytes());
                out.extend_from_slice(&d.to_ne_bytes());
            }
            (ty, other) => debug!(?ty, ?other, "skipping element of the wrong type"),
        }
    }
    out
}
