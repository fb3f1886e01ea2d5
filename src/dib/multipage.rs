//! Multi-page containers of the built-in engine.
//!
//! A container keeps every page in memory. Pages are checked out by
//! moving them out of their slot and checked back in by index; a container
//! opened for writing is encoded and written to disk when it is closed.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::DibBitmap;
use crate::engine::FileType;
use crate::error::CodecError;
use crate::flags::IoFlags;
use crate::limits::Limits;

/// An open multi-page file.
#[derive(Debug)]
pub struct DibMultiBitmap {
    format: FileType,
    path: PathBuf,
    read_only: bool,
    created: bool,
    /// `None` while a page is locked.
    pages: Vec<Option<DibBitmap>>,
    dirty: bool,
}

impl DibMultiBitmap {
    pub(crate) fn create(format: FileType, path: &Path) -> Result<Self, CodecError> {
        check_multipage(format)?;
        Ok(Self {
            format,
            path: path.to_path_buf(),
            read_only: false,
            created: true,
            pages: Vec::new(),
            dirty: false,
        })
    }

    pub(crate) fn open(
        format: FileType,
        path: &Path,
        read_only: bool,
        flags: IoFlags,
        limits: &Limits,
    ) -> Result<Self, CodecError> {
        check_multipage(format)?;
        let data = std::fs::read(path)?;
        let pages = decode_pages(format, &data, flags, limits)?;
        debug!(path = %path.display(), pages = pages.len(), "opened multi-page container");
        Ok(Self {
            format,
            path: path.to_path_buf(),
            read_only,
            created: false,
            pages: pages.into_iter().map(Some).collect(),
            dirty: false,
        })
    }

    pub fn format(&self) -> FileType {
        self.format
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Number of pages currently checked out.
    pub fn locked_count(&self) -> usize {
        self.pages.iter().filter(|p| p.is_none()).count()
    }

    pub(crate) fn lock(&mut self, index: usize) -> Option<DibBitmap> {
        let mut page = self.pages.get_mut(index)?.take()?;
        page.page_index = Some(index);
        Some(page)
    }

    /// Check a page back in. Bitmaps that were never locked from this
    /// container are handed back.
    pub(crate) fn unlock(&mut self, mut page: DibBitmap, changed: bool) -> Result<(), DibBitmap> {
        let Some(index) = page.page_index.take() else {
            return Err(page);
        };
        match self.pages.get_mut(index) {
            Some(slot) if slot.is_none() => {
                *slot = Some(page);
                self.dirty |= changed && !self.read_only;
                Ok(())
            }
            _ => {
                page.page_index = Some(index);
                Err(page)
            }
        }
    }

    pub(crate) fn append(&mut self, mut page: DibBitmap) -> Result<(), CodecError> {
        if self.read_only {
            return Err(CodecError::InvalidData(
                "cannot append to a read-only container".into(),
            ));
        }
        page.page_index = None;
        self.pages.push(Some(page));
        self.dirty = true;
        Ok(())
    }

    /// Write the container out if it was created or changed.
    pub(crate) fn close(self, flags: IoFlags) -> Result<(), CodecError> {
        if self.read_only || !(self.created || self.dirty) {
            return Ok(());
        }
        let locked = self.locked_count();
        if locked > 0 {
            return Err(CodecError::InvalidData(format!(
                "{locked} pages are still locked"
            )));
        }
        let pages: Vec<&DibBitmap> = self.pages.iter().flatten().collect();
        if pages.is_empty() {
            return Err(CodecError::InvalidData("container has no pages".into()));
        }
        let bytes = encode_pages(self.format, &pages, flags)?;
        std::fs::write(&self.path, bytes)?;
        debug!(path = %self.path.display(), pages = pages.len(), "wrote multi-page container");
        Ok(())
    }
}

fn check_multipage(format: FileType) -> Result<(), CodecError> {
    match format {
        #[cfg(feature = "tiff")]
        FileType::Tiff => Ok(()),
        other => Err(CodecError::UnsupportedVariant(format!(
            "{other:?} files cannot hold multiple pages"
        ))),
    }
}

#[cfg(feature = "tiff")]
fn decode_pages(
    _format: FileType,
    data: &[u8],
    flags: IoFlags,
    limits: &Limits,
) -> Result<Vec<DibBitmap>, CodecError> {
    crate::tiff::decode_pages(data, flags, limits)
}

#[cfg(not(feature = "tiff"))]
fn decode_pages(
    format: FileType,
    _data: &[u8],
    _flags: IoFlags,
    _limits: &Limits,
) -> Result<Vec<DibBitmap>, CodecError> {
    check_multipage(format).map(|()| Vec::new())
}

#[cfg(feature = "tiff")]
fn encode_pages(_format: FileType, pages: &[&DibBitmap], flags: IoFlags) -> Result<Vec<u8>, CodecError> {
    crate::tiff::encode_pages(pages, flags)
}

#[cfg(not(feature = "tiff"))]
fn encode_pages(format: FileType, _pages: &[&DibBitmap], _flags: IoFlags) -> Result<Vec<u8>, CodecError> {
    check_multipage(format).map(|()| Vec::new())
}

#[cfg(all(test, feature = "tiff"))]
mod tests {
    use super::*;
    use crate::pixel::PixelType;

    fn page() -> DibBitmap {
        DibBitmap::new(PixelType::Uint16, 2, 2, 16, &Limits::default(), true).unwrap()
    }

    #[test]
    fn only_tiff_holds_pages() {
        assert!(DibMultiBitmap::create(FileType::Tiff, Path::new("x.tif")).is_ok());
        assert!(DibMultiBitmap::create(FileType::Bmp, Path::new("x.bmp")).is_err());
    }

    #[test]
    fn lock_is_exclusive_until_unlocked() {
        let mut m = DibMultiBitmap::create(FileType::Tiff, Path::new("x.tif")).unwrap();
        m.append(page()).unwrap();
        let p = m.lock(0).unwrap();
        assert!(m.lock(0).is_none());
        assert_eq!(m.locked_count(), 1);
        m.unlock(p, false).unwrap();
        assert!(m.lock(0).is_some());
        assert!(m.lock(7).is_none());
    }

    #[test]
    fn foreign_bitmap_is_handed_back() {
        let mut m = DibMultiBitmap::create(FileType::Tiff, Path::new("x.tif")).unwrap();
        assert!(m.unlock(page(), true).is_err());
    }

    #[test]
    fn empty_created_container_fails_to_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.tif");
        let m = DibMultiBitmap::create(FileType::Tiff, &path).unwrap();
        assert!(m.close(IoFlags::DEFAULT).is_err());
        assert!(!path.exists());
    }
}
