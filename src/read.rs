//! Read path: files → owned arrays and metadata maps.

use std::path::Path;

use tracing::debug;

use crate::array::OwnedArray;
use crate::bridge::{Bridge, global};
use crate::engine::Engine;
use crate::error::BitmapError;
use crate::flags::IoFlags;
use crate::handle::{ImageHandle, Session};
use crate::metadata::MetadataMap;

impl<E: Engine> Bridge<E> {
    /// Read an image as a `[width, height]` or `[width, height, channels]`
    /// array. 8-bit colour comes back in RGB(A) order.
    pub fn read(&self, path: impl AsRef<Path>, flags: IoFlags) -> Result<OwnedArray, BitmapError> {
        let handle = self.open(path, flags)?;
        handle.to_array()
    }

    /// Read the metadata of an image without decoding its pixels.
    pub fn read_metadata(&self, path: impl AsRef<Path>) -> Result<MetadataMap, BitmapError> {
        let handle = self.open(path, IoFlags::LOAD_NOPIXELS)?;
        Ok(handle.metadata())
    }

    /// Read every page of a multi-page image.
    ///
    /// All or nothing: if any page fails, every page and the container are
    /// released and no partial list is returned.
    pub fn read_multipage(
        &self,
        path: impl AsRef<Path>,
        flags: IoFlags,
    ) -> Result<Vec<OwnedArray>, BitmapError> {
        let session = self.open_multipage(path, flags)?;
        each_page(session, |page| page.to_array())
    }

    /// Read the metadata of every page without decoding pixels.
    pub fn read_multipage_metadata(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<Vec<MetadataMap>, BitmapError> {
        let session = self.open_multipage(path, IoFlags::LOAD_NOPIXELS)?;
        each_page(session, |page| Ok(page.metadata()))
    }
}

fn each_page<E: Engine, T>(
    mut session: Session<'_, E>,
    mut per_page: impl FnMut(&ImageHandle<'_, E>) -> Result<T, BitmapError>,
) -> Result<Vec<T>, BitmapError> {
    let pages = session.page_count();
    debug!(pages, "reading multi-page image");
    let mut out = Vec::with_capacity(pages);
    for index in 0..pages {
        let page = session.lock(index)?;
        out.push(per_page(&page)?);
    }
    session.close()?;
    Ok(out)
}

/// Read an image with the built-in engine. See [`Bridge::read`].
pub fn read(path: impl AsRef<Path>, flags: IoFlags) -> Result<OwnedArray, BitmapError> {
    global().read(path, flags)
}

/// Read every page of an image with the built-in engine.
/// See [`Bridge::read_multipage`].
pub fn read_multipage(path: impl AsRef<Path>, flags: IoFlags) -> Result<Vec<OwnedArray>, BitmapError> {
    global().read_multipage(path, flags)
}

/// Read an image's metadata with the built-in engine.
pub fn read_metadata(path: impl AsRef<Path>) -> Result<MetadataMap, BitmapError> {
    global().read_metadata(path)
}

/// Read every page's metadata with the built-in engine.
pub fn read_multipage_metadata(path: impl AsRef<Path>) -> Result<Vec<MetadataMap>, BitmapError> {
    global().read_multipage_metadata(path)
}
