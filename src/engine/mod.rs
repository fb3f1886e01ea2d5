//! The decoder-engine contract the bridge drives.
//!
//! An engine owns bitmap memory and knows file formats. The bridge only
//! asks it to sniff, load, allocate, save and describe bitmaps, to manage
//! multi-page containers and to iterate metadata. Null results are `None`;
//! pixel and palette memory is lent out as byte slices.
//!
//! [`DibEngine`](crate::DibEngine) is the built-in implementation.

use std::path::Path;

use crate::flags::IoFlags;
use crate::metadata::MetadataModel;
use crate::pixel::PixelType;

/// Image container formats known to the engines of this crate.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FileType {
    Bmp,
    /// P5 greyscale.
    Pgm,
    /// P6 RGB.
    Ppm,
    /// P7 arbitrary tuples.
    Pam,
    /// Portable float map.
    Pfm,
    Farbfeld,
    Tiff,
    Qoi,
}

impl FileType {
    pub const ALL: [Self; 8] = [
        Self::Bmp,
        Self::Pgm,
        Self::Ppm,
        Self::Pam,
        Self::Pfm,
        Self::Farbfeld,
        Self::Tiff,
        Self::Qoi,
    ];

    /// Lowercase extensions, preferred one first.
    pub const fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Bmp => &["bmp", "dib"],
            Self::Pgm => &["pgm"],
            Self::Ppm => &["ppm", "pnm"],
            Self::Pam => &["pam"],
            Self::Pfm => &["pfm"],
            Self::Farbfeld => &["ff", "farbfeld"],
            Self::Tiff => &["tif", "tiff"],
            Self::Qoi => &["qoi"],
        }
    }

    /// Match a file extension, case-insensitively.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|ft| ft.extensions().contains(&ext.as_str()))
    }
}

/// One metadata tag as the engine stores it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawTag<'a> {
    pub key: &'a str,
    /// See [`TagType`](crate::metadata::TagType).
    pub type_code: u16,
    /// Native-endian payload; its length is the tag's byte length.
    pub value: &'a [u8],
}

/// Process-wide callback through which an engine reports internal faults.
pub type OutputMessageFn = fn(Option<FileType>, &str);

/// A bitmap engine.
///
/// All methods take `&self`: resources are owned by the values the engine
/// hands out, and releasing one consumes it.
pub trait Engine {
    /// A single in-memory bitmap.
    type Bitmap;
    /// An open multi-page container.
    type MultiBitmap;
    /// Iteration state over one model's tags, borrowing the bitmap.
    type TagCursor<'b>
    where
        Self: 'b;

    /// Identify a file from its content.
    fn sniff_file_type(&self, path: &Path) -> Option<FileType>;

    /// Identify a file type from a path's extension.
    fn file_type_from_extension(&self, path: &Path) -> Option<FileType>;

    fn load(&self, file_type: FileType, path: &Path, flags: IoFlags) -> Option<Self::Bitmap>;

    fn unload(&self, bitmap: Self::Bitmap);

    /// Allocate a zeroed bitmap. 8-bit and smaller bitmaps get a zeroed
    /// palette.
    fn allocate(
        &self,
        pixel_type: PixelType,
        width: u32,
        height: u32,
        bpp: u32,
    ) -> Option<Self::Bitmap>;

    fn save(&self, file_type: FileType, bitmap: &Self::Bitmap, path: &Path, flags: IoFlags)
    -> bool;

    fn width(&self, bitmap: &Self::Bitmap) -> u32;

    fn height(&self, bitmap: &Self::Bitmap) -> u32;

    fn pixel_type(&self, bitmap: &Self::Bitmap) -> PixelType;

    fn bpp(&self, bitmap: &Self::Bitmap) -> u32;

    /// Bytes from one stored scanline to the next.
    fn pitch(&self, bitmap: &Self::Bitmap) -> usize;

    /// Pixel memory, bottom scanline first. `None` for header-only bitmaps.
    fn bits<'b>(&self, bitmap: &'b Self::Bitmap) -> Option<&'b [u8]>;

    fn bits_mut<'b>(&self, bitmap: &'b mut Self::Bitmap) -> Option<&'b mut [u8]>;

    /// Palette memory (RGBQUADs), for bitmaps of 8 bpp or less.
    fn palette<'b>(&self, bitmap: &'b Self::Bitmap) -> Option<&'b [u8]>;

    fn palette_mut<'b>(&self, bitmap: &'b mut Self::Bitmap) -> Option<&'b mut [u8]>;

    /// Byte order of the running host, which decides the colour order of
    /// 8-bit pixels.
    fn is_little_endian(&self) -> bool;

    fn open_multi(
        &self,
        file_type: FileType,
        path: &Path,
        create_new: bool,
        read_only: bool,
        keep_cache_in_memory: bool,
        flags: IoFlags,
    ) -> Option<Self::MultiBitmap>;

    fn page_count(&self, multi: &Self::MultiBitmap) -> usize;

    /// Check a page out of the container. A page can be locked once at a time.
    fn lock_page(&self, multi: &mut Self::MultiBitmap, page: usize) -> Option<Self::Bitmap>;

    /// Return a locked page, marking the container dirty if `changed`.
    fn unlock_page(&self, multi: &mut Self::MultiBitmap, page: Self::Bitmap, changed: bool);

    /// Append a page; the container takes ownership of it.
    fn append_page(&self, multi: &mut Self::MultiBitmap, page: Self::Bitmap);

    /// Close the container, writing it out if it was opened for writing.
    fn close_multi(&self, multi: Self::MultiBitmap, flags: IoFlags) -> bool;

    /// Whether `Bitmap`-type images of `bpp` can be saved as `file_type`.
    fn supports_export_bpp(&self, file_type: FileType, bpp: u32) -> bool;

    /// Whether images of `pixel_type` can be saved as `file_type`.
    fn supports_export_type(&self, file_type: FileType, pixel_type: PixelType) -> bool;

    /// Start iterating `model`'s tags. `None` when the model has no tags.
    fn find_first_metadata<'b>(
        &self,
        model: MetadataModel,
        bitmap: &'b Self::Bitmap,
    ) -> Option<(Self::TagCursor<'b>, RawTag<'b>)>
    where
        Self: 'b;

    fn find_next_metadata<'b>(&self, cursor: &mut Self::TagCursor<'b>) -> Option<RawTag<'b>>
    where
        Self: 'b;

    fn find_close_metadata<'b>(&self, cursor: Self::TagCursor<'b>)
    where
        Self: 'b;

    /// Install the fault callback. Engines keep the first callback installed
    /// and ignore later calls.
    fn set_output_message(&self, hook: OutputMessageFn);
}
