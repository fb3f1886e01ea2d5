//! The built-in bitmap engine.
//!
//! [`DibEngine`] keeps bitmaps as bottom-up, DWORD-aligned scanlines in the
//! device-independent layout and dispatches file I/O to the format modules
//! of this crate. Plugin failures are reported through the output-message
//! hook, and the call returns a null result.

mod bitmap;
mod multipage;

use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, warn};

pub use bitmap::DibBitmap;
pub use multipage::DibMultiBitmap;

pub(crate) use bitmap::{StoredTag, colour_is_bgr, no_pixels};

use crate::engine::{Engine, FileType, OutputMessageFn, RawTag};
use crate::error::CodecError;
use crate::flags::IoFlags;
use crate::limits::Limits;
use crate::metadata::MetadataModel;
use crate::pixel::PixelType;

static OUTPUT_MESSAGE: OnceLock<OutputMessageFn> = OnceLock::new();

/// Send a fault to the installed hook, or to the log when none is set.
fn report(format: Option<FileType>, message: &str) {
    match OUTPUT_MESSAGE.get() {
        Some(hook) => hook(format, message),
        None => warn!(?format, message, "bitmap engine fault"),
    }
}

/// Counts of live engine resources.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Standalone bitmaps handed out and not yet unloaded.
    pub bitmaps: usize,
    /// Pages locked out of containers.
    pub locked_pages: usize,
    /// Open multi-page containers.
    pub sessions: usize,
    /// Open metadata cursors.
    pub cursors: usize,
}

impl EngineStats {
    /// Whether every resource has been released.
    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Default)]
struct Counters {
    bitmaps: AtomicUsize,
    locked_pages: AtomicUsize,
    sessions: AtomicUsize,
    cursors: AtomicUsize,
}

fn acquire(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::Relaxed);
}

fn release(counter: &AtomicUsize) {
    // Saturate: releasing a value the engine did not count is not an error.
    let _ = counter.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
}

/// Iteration state over one model's tags.
#[derive(Debug)]
pub struct DibTagCursor<'b> {
    tags: &'b [StoredTag],
    next: usize,
}

/// The built-in engine: BMP, PNM, farbfeld, TIFF and QOI over
/// [`DibBitmap`]s.
///
/// ```no_run
/// use zendib::{DibEngine, Engine, FileType, IoFlags};
///
/// let engine = DibEngine::new();
/// let data = std::fs::read("photo.tif").unwrap();
/// let bitmap = engine
///     .load_from_memory(FileType::Tiff, &data, IoFlags::DEFAULT)
///     .unwrap();
/// println!("{}x{}", bitmap.width(), bitmap.height());
/// engine.unload(bitmap);
/// ```
#[derive(Debug, Default)]
pub struct DibEngine {
    limits: Limits,
    counters: Counters,
}

impl DibEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// An engine that refuses bitmaps beyond `limits`.
    pub fn with_limits(limits: Limits) -> Self {
        Self {
            limits,
            counters: Counters::default(),
        }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Snapshot of live resources.
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            bitmaps: self.counters.bitmaps.load(Ordering::Relaxed),
            locked_pages: self.counters.locked_pages.load(Ordering::Relaxed),
            sessions: self.counters.sessions.load(Ordering::Relaxed),
            cursors: self.counters.cursors.load(Ordering::Relaxed),
        }
    }

    /// Identify a format from the first bytes of a file.
    pub fn sniff_bytes(data: &[u8]) -> Option<FileType> {
        let ft = match data {
            [b'B', b'M', ..] => FileType::Bmp,
            [b'P', b'5', ws, ..] if ws.is_ascii_whitespace() => FileType::Pgm,
            [b'P', b'6', ws, ..] if ws.is_ascii_whitespace() => FileType::Ppm,
            [b'P', b'7', ws, ..] if ws.is_ascii_whitespace() => FileType::Pam,
            [b'P', b'f' | b'F', ws, ..] if ws.is_ascii_whitespace() => FileType::Pfm,
            [b'f', b'a', b'r', b'b', b'f', b'e', b'l', b'd', ..] => FileType::Farbfeld,
            [b'I', b'I', 42, 0, ..] | [b'M', b'M', 0, 42, ..] => FileType::Tiff,
            [b'q', b'o', b'i', b'f', ..] => FileType::Qoi,
            _ => return None,
        };
        is_enabled(ft).then_some(ft)
    }

    /// Decode an in-memory file. Release the bitmap with
    /// [`Engine::unload`].
    pub fn load_from_memory(&self, file_type: FileType, data: &[u8], flags: IoFlags) -> Option<DibBitmap> {
        match decode(file_type, data, flags, &self.limits) {
            Ok(bitmap) => {
                acquire(&self.counters.bitmaps);
                Some(bitmap)
            }
            Err(e) => {
                report(Some(file_type), &e.to_string());
                None
            }
        }
    }

    /// Encode a bitmap into an in-memory file.
    pub fn save_to_memory(&self, file_type: FileType, bitmap: &DibBitmap, flags: IoFlags) -> Option<Vec<u8>> {
        encode(file_type, bitmap, flags)
            .map_err(|e| report(Some(file_type), &e.to_string()))
            .ok()
    }
}

/// Whether support for `ft` is compiled in.
fn is_enabled(ft: FileType) -> bool {
    match ft {
        FileType::Bmp => cfg!(feature = "bmp"),
        FileType::Tiff => cfg!(feature = "tiff"),
        FileType::Qoi => cfg!(feature = "qoi"),
        _ => true,
    }
}

fn not_compiled(ft: FileType) -> CodecError {
    CodecError::UnsupportedVariant(format!("{ft:?} support is not compiled in"))
}

fn decode(ft: FileType, data: &[u8], flags: IoFlags, limits: &Limits) -> Result<DibBitmap, CodecError> {
    match ft {
        #[cfg(feature = "bmp")]
        FileType::Bmp => crate::bmp::decode(data, flags, limits),
        FileType::Pgm | FileType::Ppm | FileType::Pam | FileType::Pfm => {
            crate::pnm::decode(data, flags, limits)
        }
        FileType::Farbfeld => crate::farbfeld::decode(data, flags, limits),
        #[cfg(feature = "tiff")]
        FileType::Tiff => crate::tiff::decode(data, flags, limits),
        #[cfg(feature = "qoi")]
        FileType::Qoi => crate::qoi::decode(data, flags, limits),
        #[allow(unreachable_patterns)]
        other => Err(not_compiled(other)),
    }
}

fn encode(ft: FileType, bitmap: &DibBitmap, flags: IoFlags) -> Result<Vec<u8>, CodecError> {
    if !export_supported(ft, bitmap.pixel_type(), bitmap.bpp()) {
        return Err(CodecError::UnsupportedVariant(format!(
            "{ft:?} cannot store {:?} bitmaps at {} bpp",
            bitmap.pixel_type(),
            bitmap.bpp()
        )));
    }
    match ft {
        #[cfg(feature = "bmp")]
        FileType::Bmp => crate::bmp::encode(bitmap, flags),
        FileType::Pgm | FileType::Ppm | FileType::Pam | FileType::Pfm => {
            crate::pnm::encode(bitmap, ft, flags)
        }
        FileType::Farbfeld => crate::farbfeld::encode(bitmap, flags),
        #[cfg(feature = "tiff")]
        FileType::Tiff => crate::tiff::encode_pages(&[bitmap], flags),
        #[cfg(feature = "qoi")]
        FileType::Qoi => crate::qoi::encode(bitmap, flags),
        #[allow(unreachable_patterns)]
        other => Err(not_compiled(other)),
    }
}

/// Bit depths of `Bitmap`-type images each format can store.
const fn export_depths(ft: FileType) -> &'static [u32] {
    match ft {
        FileType::Bmp => &[1, 4, 8, 16, 24, 32],
        FileType::Pgm => &[8],
        FileType::Ppm => &[24],
        FileType::Pam | FileType::Tiff => &[8, 24, 32],
        FileType::Qoi => &[24, 32],
        FileType::Pfm | FileType::Farbfeld => &[],
    }
}

/// Non-`Bitmap` pixel types each format can store.
const fn export_types(ft: FileType) -> &'static [PixelType] {
    match ft {
        FileType::Pgm => &[PixelType::Uint16],
        FileType::Ppm => &[PixelType::Rgb16],
        FileType::Pam => &[PixelType::Uint16, PixelType::Rgb16, PixelType::Rgba16],
        FileType::Pfm => &[PixelType::Float, PixelType::RgbF],
        FileType::Farbfeld => &[PixelType::Rgba16],
        FileType::Tiff => &[
            PixelType::Uint16,
            PixelType::Int16,
            PixelType::Uint32,
            PixelType::Int32,
            PixelType::Float,
            PixelType::Double,
            PixelType::Rgb16,
            PixelType::Rgba16,
            PixelType::RgbF,
            PixelType::RgbaF,
            PixelType::Complex,
        ],
        FileType::Bmp | FileType::Qoi => &[],
    }
}

fn export_supported(ft: FileType, pixel_type: PixelType, bpp: u32) -> bool {
    is_enabled(ft)
        && match pixel_type {
            PixelType::Bitmap => export_depths(ft).contains(&bpp),
            other => export_types(ft).contains(&other),
        }
}

impl Engine for DibEngine {
    type Bitmap = DibBitmap;
    type MultiBitmap = DibMultiBitmap;
    type TagCursor<'b> = DibTagCursor<'b>;

    fn sniff_file_type(&self, path: &Path) -> Option<FileType> {
        let mut head = Vec::with_capacity(16);
        let read = std::fs::File::open(path).and_then(|f| f.take(16).read_to_end(&mut head));
        if let Err(e) = read {
            debug!(path = %path.display(), error = %e, "cannot read file signature");
            return None;
        }
        Self::sniff_bytes(&head)
    }

    fn file_type_from_extension(&self, path: &Path) -> Option<FileType> {
        let ext = path.extension()?.to_str()?;
        FileType::from_extension(ext).filter(|&ft| is_enabled(ft))
    }

    fn load(&self, file_type: FileType, path: &Path, flags: IoFlags) -> Option<DibBitmap> {
        match std::fs::read(path) {
            Ok(data) => self.load_from_memory(file_type, &data, flags),
            Err(e) => {
                report(Some(file_type), &format!("{}: {e}", path.display()));
                None
            }
        }
    }

    fn unload(&self, bitmap: DibBitmap) {
        release(&self.counters.bitmaps);
        drop(bitmap);
    }

    fn allocate(&self, pixel_type: PixelType, width: u32, height: u32, bpp: u32) -> Option<DibBitmap> {
        match DibBitmap::new(pixel_type, width, height, bpp, &self.limits, true) {
            Ok(bitmap) => {
                acquire(&self.counters.bitmaps);
                Some(bitmap)
            }
            Err(e) => {
                report(None, &e.to_string());
                None
            }
        }
    }

    fn save(&self, file_type: FileType, bitmap: &DibBitmap, path: &Path, flags: IoFlags) -> bool {
        let Some(bytes) = self.save_to_memory(file_type, bitmap, flags) else {
            return false;
        };
        match std::fs::write(path, bytes) {
            Ok(()) => true,
            Err(e) => {
                report(Some(file_type), &format!("{}: {e}", path.display()));
                false
            }
        }
    }

    fn width(&self, bitmap: &DibBitmap) -> u32 {
        bitmap.width()
    }

    fn height(&self, bitmap: &DibBitmap) -> u32 {
        bitmap.height()
    }

    fn pixel_type(&self, bitmap: &DibBitmap) -> PixelType {
        bitmap.pixel_type()
    }

    fn bpp(&self, bitmap: &DibBitmap) -> u32 {
        bitmap.bpp()
    }

    fn pitch(&self, bitmap: &DibBitmap) -> usize {
        bitmap.pitch()
    }

    fn bits<'b>(&self, bitmap: &'b DibBitmap) -> Option<&'b [u8]> {
        bitmap.bits()
    }

    fn bits_mut<'b>(&self, bitmap: &'b mut DibBitmap) -> Option<&'b mut [u8]> {
        bitmap.bits_mut()
    }

    fn palette<'b>(&self, bitmap: &'b DibBitmap) -> Option<&'b [u8]> {
        bitmap.palette()
    }

    fn palette_mut<'b>(&self, bitmap: &'b mut DibBitmap) -> Option<&'b mut [u8]> {
        bitmap.palette_mut()
    }

    fn is_little_endian(&self) -> bool {
        cfg!(target_endian = "little")
    }

    fn open_multi(
        &self,
        file_type: FileType,
        path: &Path,
        create_new: bool,
        read_only: bool,
        keep_cache_in_memory: bool,
        flags: IoFlags,
    ) -> Option<DibMultiBitmap> {
        debug!(?file_type, create_new, read_only, keep_cache_in_memory, "opening container");
        let opened = if create_new {
            DibMultiBitmap::create(file_type, path)
        } else {
            DibMultiBitmap::open(file_type, path, read_only, flags, &self.limits)
        };
        match opened {
            Ok(multi) => {
                acquire(&self.counters.sessions);
                Some(multi)
            }
            Err(e) => {
                report(Some(file_type), &e.to_string());
                None
            }
        }
    }

    fn page_count(&self, multi: &DibMultiBitmap) -> usize {
        multi.page_count()
    }

    fn lock_page(&self, multi: &mut DibMultiBitmap, page: usize) -> Option<DibBitmap> {
        let bitmap = multi.lock(page)?;
        acquire(&self.counters.locked_pages);
        Some(bitmap)
    }

    fn unlock_page(&self, multi: &mut DibMultiBitmap, page: DibBitmap, changed: bool) {
        match multi.unlock(page, changed) {
            Ok(()) => release(&self.counters.locked_pages),
            Err(_) => report(Some(multi.format()), "unlocked a bitmap that is not a locked page"),
        }
    }

    fn append_page(&self, multi: &mut DibMultiBitmap, page: DibBitmap) {
        // The container takes the page even when it refuses it.
        release(&self.counters.bitmaps);
        let format = multi.format();
        if let Err(e) = multi.append(page) {
            report(Some(format), &e.to_string());
        }
    }

    fn close_multi(&self, multi: DibMultiBitmap, flags: IoFlags) -> bool {
        release(&self.counters.sessions);
        let format = multi.format();
        match multi.close(flags) {
            Ok(()) => true,
            Err(e) => {
                report(Some(format), &e.to_string());
                false
            }
        }
    }

    fn supports_export_bpp(&self, file_type: FileType, bpp: u32) -> bool {
        export_supported(file_type, PixelType::Bitmap, bpp)
    }

    fn supports_export_type(&self, file_type: FileType, pixel_type: PixelType) -> bool {
        match pixel_type {
            PixelType::Bitmap => is_enabled(file_type) && !export_depths(file_type).is_empty(),
            other => export_supported(file_type, other, 0),
        }
    }

    fn find_first_metadata<'b>(
        &self,
        model: MetadataModel,
        bitmap: &'b DibBitmap,
    ) -> Option<(DibTagCursor<'b>, RawTag<'b>)>
    where
        Self: 'b,
    {
        let tags = bitmap.tags(model);
        let first = tags.first()?.as_raw();
        acquire(&self.counters.cursors);
        Some((DibTagCursor { tags, next: 1 }, first))
    }

    fn find_next_metadata<'b>(&self, cursor: &mut DibTagCursor<'b>) -> Option<RawTag<'b>>
    where
        Self: 'b,
    {
        let tags: &'b [StoredTag] = cursor.tags;
        let tag = tags.get(cursor.next)?;
        cursor.next += 1;
        Some(tag.as_raw())
    }

    fn find_close_metadata<'b>(&self, _cursor: DibTagCursor<'b>)
    where
        Self: 'b,
    {
        release(&self.counters.cursors);
    }

    fn set_output_message(&self, hook: OutputMessageFn) {
        if OUTPUT_MESSAGE.set(hook).is_err() {
            debug!("output-message hook already installed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_magic_bytes() {
        assert_eq!(DibEngine::sniff_bytes(b"P5\n3 3\n255\n"), Some(FileType::Pgm));
        assert_eq!(DibEngine::sniff_bytes(b"P7\nWIDTH 1\n"), Some(FileType::Pam));
        assert_eq!(DibEngine::sniff_bytes(b"PF\n1 1\n-1.0\n"), Some(FileType::Pfm));
        assert_eq!(DibEngine::sniff_bytes(b"farbfeld\0\0\0\x01"), Some(FileType::Farbfeld));
        assert_eq!(DibEngine::sniff_bytes(b"P9\n"), None);
        assert_eq!(DibEngine::sniff_bytes(b""), None);
    }

    #[cfg(feature = "tiff")]
    #[test]
    fn sniffs_both_tiff_byte_orders() {
        assert_eq!(DibEngine::sniff_bytes(b"II*\0\x08\0\0\0"), Some(FileType::Tiff));
        assert_eq!(DibEngine::sniff_bytes(b"MM\0*\0\0\0\x08"), Some(FileType::Tiff));
    }

    #[test]
    fn export_table() {
        let engine = DibEngine::new();
        assert!(engine.supports_export_type(FileType::Pfm, PixelType::RgbF));
        assert!(!engine.supports_export_type(FileType::Pfm, PixelType::Bitmap));
        assert!(engine.supports_export_type(FileType::Pgm, PixelType::Bitmap));
        assert!(engine.supports_export_bpp(FileType::Pam, 32));
        assert!(!engine.supports_export_bpp(FileType::Ppm, 8));
        assert!(!engine.supports_export_type(FileType::Farbfeld, PixelType::Complex));
        assert_eq!(
            engine.supports_export_type(FileType::Tiff, PixelType::Complex),
            cfg!(feature = "tiff")
        );
    }

    #[test]
    fn allocation_is_counted() {
        let engine = DibEngine::new();
        let b = engine.allocate(PixelType::Float, 4, 4, 32).unwrap();
        assert_eq!(engine.stats().bitmaps, 1);
        engine.unload(b);
        assert!(engine.stats().is_idle());
        assert!(engine.allocate(PixelType::Float, 4, 4, 8).is_none());
        assert!(engine.stats().is_idle());
    }

    #[test]
    fn limits_refuse_large_bitmaps() {
        let engine = DibEngine::with_limits(Limits {
            max_pixels: Some(10),
            ..Default::default()
        });
        assert!(engine.allocate(PixelType::Bitmap, 4, 4, 8).is_none());
        assert!(engine.allocate(PixelType::Bitmap, 2, 4, 8).is_some());
    }

    #[test]
    fn metadata_cursor_walks_tags_in_order() {
        let engine = DibEngine::new();
        let mut b = engine.allocate(PixelType::Bitmap, 1, 1, 8).unwrap();
        b.set_text(MetadataModel::Comments, "A", "x");
        b.set_text(MetadataModel::Comments, "B", "y");
        assert!(engine.find_first_metadata(MetadataModel::Xmp, &b).is_none());
        let (mut cursor, first) = engine.find_first_metadata(MetadataModel::Comments, &b).unwrap();
        assert_eq!(first.key, "A");
        assert_eq!(engine.find_next_metadata(&mut cursor).unwrap().key, "B");
        assert!(engine.find_next_metadata(&mut cursor).is_none());
        assert_eq!(engine.stats().cursors, 1);
        engine.find_close_metadata(cursor);
        assert_eq!(engine.stats().cursors, 0);
        engine.unload(b);
    }
}
