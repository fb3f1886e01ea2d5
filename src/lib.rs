//! # zendib
//!
//! Moves pixels and metadata between device-independent bitmaps owned by a
//! decoder engine and plain, typed, owned arrays.
//!
//! Engine bitmaps store scanlines bottom-up, padded to 32 bits, with 8-bit
//! colour in the host's byte order (BGR(A) on little-endian machines).
//! Arrays produced here are `[width, height]` or `[width, height, channels]`
//! with the top row first and 8-bit colour in RGB(A) order, whatever the
//! engine's layout.
//!
//! ## Operations
//!
//! - [`read`] / [`read_multipage`]: decode a file into arrays
//! - [`read_metadata`] / [`read_multipage_metadata`]: decode tags only
//! - [`write`] / [`write_multipage`]: encode arrays into a file
//!
//! The free functions use a process-wide [`Bridge`] over the built-in
//! [`DibEngine`]. Build a `Bridge` yourself to use another [`Engine`] or an
//! engine with [`Limits`].
//!
//! ## Built-in formats
//!
//! | Format | Read | Write |
//! |--------|------|-------|
//! | BMP (`bmp` feature) | 1/4/8/16/24/32 bpp, bitfields | 1/4/8/16/24/32 bpp |
//! | PGM / PPM / PAM | 8-bit and 16-bit | 8-bit and 16-bit |
//! | PFM | grey and RGB `f32` | grey and RGB `f32` |
//! | farbfeld | RGBA16 | RGBA16 |
//! | TIFF (`tiff` feature) | multi-page, integer and float samples | multi-page |
//! | QOI (`qoi` feature) | RGB, RGBA | RGB, RGBA |
//!
//! ## Usage
//!
//! ```no_run
//! use zendib::{IoFlags, OwnedArray};
//!
//! let pixels: Vec<u8> = (0..4 * 3 * 3).map(|i| i as u8).collect();
//! let image = OwnedArray::from_vec(4, 3, Some(3), pixels)?;
//! zendib::write(&image, "out.tif", IoFlags::DEFAULT)?;
//!
//! let back = zendib::read("out.tif", IoFlags::DEFAULT)?;
//! assert_eq!(back, image);
//!
//! let tags = zendib::read_metadata("out.tif")?;
//! for (model, key, value) in tags.iter() {
//!     println!("{model}/{key}: {value:?}");
//! }
//! # Ok::<(), zendib::BitmapError>(())
//! ```
//!
//! ## Credits
//!
//! The BMP, PNM and farbfeld readers draw from
//! [zune-image](https://github.com/etemesi254/zune-image) by Caleb Etemesi
//! (MIT/Apache-2.0/Zlib licensed).

#![forbid(unsafe_code)]

mod array;
mod bridge;
mod dib;
mod engine;
mod error;
mod fault;
mod flags;
mod handle;
mod limits;
pub mod metadata;
pub mod palette;
mod pixel;
mod read;
pub mod reorder;
mod view;
mod write;

#[cfg(feature = "bmp")]
mod bmp;
mod farbfeld;
mod pnm;
#[cfg(feature = "qoi")]
mod qoi;
#[cfg(feature = "tiff")]
mod tiff;

// Re-exports
pub use array::{ArrayData, Element, OwnedArray};
pub use bridge::{Bridge, global};
pub use dib::{DibBitmap, DibEngine, DibMultiBitmap, DibTagCursor, EngineStats};
pub use engine::{Engine, FileType, OutputMessageFn, RawTag};
pub use error::{BitmapError, CodecError};
pub use flags::IoFlags;
pub use handle::{ImageHandle, Session};
pub use limits::Limits;
pub use metadata::{MetadataMap, MetadataModel, Scalar, TagType, TagValue};
pub use pixel::{ElementType, PixelDescriptor, PixelType, pixel_type_for, resolve};
pub use read::{read, read_metadata, read_multipage, read_multipage_metadata};
pub use view::{BitmapView, BitmapViewMut, ViewLayout};
pub use write::{write, write_multipage};
