//! Load/save option bitmask.
//!
//! Most flags are format-specific and only meaningful to the plugin that
//! handles the file. [`IoFlags::LOAD_NOPIXELS`] is the one generic flag the
//! bridge itself relies on.

use core::ops::{BitOr, BitOrAssign};

/// Bitmask of load/save options, OR-ed together with `|`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct IoFlags(pub u32);

impl IoFlags {
    pub const DEFAULT: Self = Self(0);

    /// Loading: read the header and metadata only, skip pixel decoding.
    pub const LOAD_NOPIXELS: Self = Self(0x8000);

    pub const BMP_DEFAULT: Self = Self(0);
    /// Saving: RLE-compress 8-bit BMPs (not supported by the built-in engine).
    pub const BMP_SAVE_RLE: Self = Self(1);

    pub const PNM_DEFAULT: Self = Self(0);
    /// Saving: raw (binary) samples. The built-in engine always writes raw.
    pub const PNM_SAVE_RAW: Self = Self(0);
    /// Saving: ASCII samples (P2/P3). Not supported by the built-in engine.
    pub const PNM_SAVE_ASCII: Self = Self(1);

    pub const PFM_DEFAULT: Self = Self(0);

    pub const TIFF_DEFAULT: Self = Self(0);
    /// Reads/stores tags for separated CMYK.
    pub const TIFF_CMYK: Self = Self(0x0001);
    pub const TIFF_PACKBITS: Self = Self(0x0100);
    pub const TIFF_DEFLATE: Self = Self(0x0200);
    pub const TIFF_ADOBE_DEFLATE: Self = Self(0x0400);
    /// Saving: no compression.
    pub const TIFF_NONE: Self = Self(0x0800);
    pub const TIFF_CCITTFAX3: Self = Self(0x1000);
    pub const TIFF_CCITTFAX4: Self = Self(0x2000);
    /// Saving: LZW compression.
    pub const TIFF_LZW: Self = Self(0x4000);
    pub const TIFF_JPEG: Self = Self(0x8000);
    pub const TIFF_LOGLUV: Self = Self(0x10000);

    pub const QOI_DEFAULT: Self = Self(0);

    pub const FARBFELD_DEFAULT: Self = Self(0);

    /// Whether every bit of `other` is set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn bits(self) -> u32 {
        self.0
    }
}

impl BitOr for IoFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for IoFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl From<u32> for IoFlags {
    fn from(bits: u32) -> Self {
        Self(bits)
    }
}
