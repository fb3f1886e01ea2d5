//! Scoped guards over engine-owned bitmaps and multi-page containers.
//!
//! Every bitmap the bridge obtains lives in an [`ImageHandle`] and every
//! container in a [`Session`]. Both release their resource when dropped, so
//! early returns and `?` can never leak engine memory or file locks. Pixel
//! memory is only reachable inside [`ImageHandle::with_view`] and
//! [`ImageHandle::with_view_mut`], whose closures cannot smuggle the view
//! past the guard.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::array::OwnedArray;
use crate::engine::{Engine, FileType};
use crate::error::BitmapError;
use crate::fault;
use crate::flags::IoFlags;
use crate::metadata::{self, MetadataMap};
use crate::palette;
use crate::pixel::{self, PixelDescriptor, PixelType};
use crate::reorder;
use crate::view::{BitmapView, BitmapViewMut};

/// Where a handle's bitmap came from, for error context.
#[derive(Clone, Debug)]
pub(crate) enum Origin {
    File { path: PathBuf, format: FileType },
    Allocated,
}

enum Owner<'a, E: Engine> {
    /// Released with [`Engine::unload`].
    Standalone,
    /// Released with [`Engine::unlock_page`].
    Page(&'a mut E::MultiBitmap),
}

/// An open bitmap. Dropping the handle unloads it, or unlocks it if it is
/// a page of a [`Session`].
pub struct ImageHandle<'a, E: Engine> {
    engine: &'a E,
    /// `Some` until the handle is consumed by [`Session::append`].
    bitmap: Option<E::Bitmap>,
    owner: Owner<'a, E>,
    origin: Origin,
}

impl<'a, E: Engine> ImageHandle<'a, E> {
    pub(crate) fn standalone(engine: &'a E, bitmap: E::Bitmap, origin: Origin) -> Self {
        Self {
            engine,
            bitmap: Some(bitmap),
            owner: Owner::Standalone,
            origin,
        }
    }

    fn page(engine: &'a E, bitmap: E::Bitmap, multi: &'a mut E::MultiBitmap, origin: Origin) -> Self {
        Self {
            engine,
            bitmap: Some(bitmap),
            owner: Owner::Page(multi),
            origin,
        }
    }

    /// The engine bitmap behind this handle.
    pub fn bitmap(&self) -> &E::Bitmap {
        match &self.bitmap {
            Some(b) => b,
            None => unreachable!("bitmap is present until the handle is consumed"),
        }
    }

    fn bitmap_mut(&mut self) -> &mut E::Bitmap {
        match &mut self.bitmap {
            Some(b) => b,
            None => unreachable!("bitmap is present until the handle is consumed"),
        }
    }

    pub fn width(&self) -> u32 {
        self.engine.width(self.bitmap())
    }

    pub fn height(&self) -> u32 {
        self.engine.height(self.bitmap())
    }

    pub fn pixel_type(&self) -> PixelType {
        self.engine.pixel_type(self.bitmap())
    }

    pub fn bpp(&self) -> u32 {
        self.engine.bpp(self.bitmap())
    }

    pub fn pitch(&self) -> usize {
        self.engine.pitch(self.bitmap())
    }

    /// Typed layout of the pixels, or `UnsupportedFormat` if the pixel type
    /// and depth have no array representation.
    pub fn descriptor(&self) -> Result<PixelDescriptor, BitmapError> {
        pixel::resolve(
            self.pixel_type(),
            self.bpp(),
            self.width() as usize,
            self.height() as usize,
        )
    }

    pub fn palette(&self) -> Option<&[u8]> {
        self.engine.palette(self.bitmap())
    }

    fn missing_pixels(&self) -> BitmapError {
        match &self.origin {
            Origin::File { path, format } => BitmapError::LoadFailed {
                path: path.clone(),
                format: *format,
                reason: "bitmap has no pixel data",
            },
            Origin::Allocated => BitmapError::AllocationError("bitmap has no pixel data".into()),
        }
    }

    /// Run `f` with a read-only view of the live pixel memory.
    pub fn with_view<R>(&self, f: impl FnOnce(BitmapView<'_>) -> R) -> Result<R, BitmapError> {
        let descriptor = self.descriptor()?;
        let pitch = self.pitch();
        let bits = self
            .engine
            .bits(self.bitmap())
            .ok_or_else(|| self.missing_pixels())?;
        let view = BitmapView::wrap(bits, pitch, descriptor)?;
        Ok(f(view))
    }

    /// Run `f` with a writable view of the live pixel memory.
    pub fn with_view_mut<R>(
        &mut self,
        f: impl FnOnce(BitmapViewMut<'_>) -> R,
    ) -> Result<R, BitmapError> {
        let descriptor = self.descriptor()?;
        let pitch = self.pitch();
        let missing = self.missing_pixels();
        let engine = self.engine;
        let bits = engine.bits_mut(self.bitmap_mut()).ok_or(missing)?;
        let view = BitmapViewMut::wrap(bits, pitch, descriptor)?;
        Ok(f(view))
    }

    /// Copy the pixels out as a top-down RGB(A)-ordered array.
    pub fn to_array(&self) -> Result<OwnedArray, BitmapError> {
        let mut array = self.with_view(|view| view.to_array())??;
        reorder::to_logical_order(&mut array, self.engine.is_little_endian());
        Ok(array)
    }

    /// Copy `array` into the pixels, converting to the engine's channel order.
    pub fn copy_from_array(&mut self, array: &OwnedArray) -> Result<(), BitmapError> {
        let little_endian = self.engine.is_little_endian();
        self.with_view_mut(|mut view| reorder::to_physical_order(array, &mut view, little_endian))?
    }

    /// Install the greyscale ramp as this bitmap's palette.
    pub fn install_greyscale_palette(&mut self) -> Result<(), BitmapError> {
        let engine = self.engine;
        palette::install_greyscale_ramp(engine.palette_mut(self.bitmap_mut()))
    }

    /// Every metadata tag of this bitmap.
    pub fn metadata(&self) -> MetadataMap {
        metadata::extract(self.engine, self.bitmap())
    }

    /// Give up ownership of a standalone bitmap without releasing it.
    fn into_standalone(mut self) -> Result<E::Bitmap, Self> {
        match self.owner {
            Owner::Standalone => match self.bitmap.take() {
                Some(b) => Ok(b),
                None => unreachable!("bitmap is present until the handle is consumed"),
            },
            Owner::Page(_) => Err(self),
        }
    }
}

impl<E: Engine> Drop for ImageHandle<'_, E> {
    fn drop(&mut self) {
        let Some(bitmap) = self.bitmap.take() else {
            return;
        };
        match &mut self.owner {
            Owner::Standalone => self.engine.unload(bitmap),
            Owner::Page(multi) => self.engine.unlock_page(multi, bitmap, false),
        }
    }
}

impl<E: Engine> core::fmt::Debug for ImageHandle<'_, E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ImageHandle")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("pixel_type", &self.pixel_type())
            .field("bpp", &self.bpp())
            .field("origin", &self.origin)
            .finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Read,
    Write,
}

/// An open multi-page container.
///
/// Call [`Session::close`] to learn whether closing (and, for written
/// containers, saving) succeeded. Dropping an unclosed session closes it
/// and only logs a failure.
pub struct Session<'a, E: Engine> {
    engine: &'a E,
    /// `Some` until the session is closed.
    multi: Option<E::MultiBitmap>,
    path: PathBuf,
    format: FileType,
    mode: Mode,
    close_flags: IoFlags,
}

impl<'a, E: Engine> Session<'a, E> {
    /// Open an existing container read-only, with pages cached in memory.
    pub(crate) fn open_read(
        engine: &'a E,
        format: FileType,
        path: &Path,
        flags: IoFlags,
    ) -> Result<Self, BitmapError> {
        let multi = fault::guarded(
            Some(path),
            || engine.open_multi(format, path, false, true, true, flags),
            || BitmapError::LoadFailed {
                path: path.to_path_buf(),
                format,
                reason: "could not open as a multi-page image",
            },
        )?;
        debug!(path = %path.display(), ?format, "opened multi-page session");
        Ok(Self {
            engine,
            multi: Some(multi),
            path: path.to_path_buf(),
            format,
            mode: Mode::Read,
            close_flags: IoFlags::DEFAULT,
        })
    }

    /// Create a new container, written out on close with `flags`.
    pub(crate) fn create(
        engine: &'a E,
        format: FileType,
        path: &Path,
        flags: IoFlags,
    ) -> Result<Self, BitmapError> {
        let multi = fault::guarded(
            Some(path),
            || engine.open_multi(format, path, true, false, true, IoFlags::DEFAULT),
            || BitmapError::SaveFailed {
                path: path.to_path_buf(),
                format,
            },
        )?;
        debug!(path = %path.display(), ?format, "created multi-page session");
        Ok(Self {
            engine,
            multi: Some(multi),
            path: path.to_path_buf(),
            format,
            mode: Mode::Write,
            close_flags: flags,
        })
    }

    fn multi(&self) -> &E::MultiBitmap {
        match &self.multi {
            Some(m) => m,
            None => unreachable!("container is open until the session is closed"),
        }
    }

    pub fn page_count(&self) -> usize {
        self.engine.page_count(self.multi())
    }

    pub fn format(&self) -> FileType {
        self.format
    }

    /// Lock page `index`. The page is unlocked when the handle drops.
    pub fn lock(&mut self, index: usize) -> Result<ImageHandle<'_, E>, BitmapError> {
        let engine = self.engine;
        let origin = Origin::File {
            path: self.path.clone(),
            format: self.format,
        };
        let format = self.format;
        let multi = match &mut self.multi {
            Some(m) => m,
            None => unreachable!("container is open until the session is closed"),
        };
        let bitmap = fault::guarded(
            Some(self.path.as_path()),
            || engine.lock_page(multi, index),
            || BitmapError::LoadFailed {
                path: self.path.clone(),
                format,
                reason: "could not lock page",
            },
        )?;
        Ok(ImageHandle::page(engine, bitmap, multi, origin))
    }

    /// Append a standalone bitmap. The container takes ownership of it.
    pub fn append(&mut self, page: ImageHandle<'_, E>) -> Result<(), BitmapError> {
        let bitmap = page.into_standalone().map_err(|_page| BitmapError::SaveFailed {
            path: self.path.clone(),
            format: self.format,
        })?;
        let engine = self.engine;
        let multi = match &mut self.multi {
            Some(m) => m,
            None => unreachable!("container is open until the session is closed"),
        };
        fault::checked(Some(self.path.as_path()), || engine.append_page(multi, bitmap))
    }

    fn close_error(&self) -> BitmapError {
        match self.mode {
            Mode::Read => BitmapError::LoadFailed {
                path: self.path.clone(),
                format: self.format,
                reason: "could not close multi-page image",
            },
            Mode::Write => BitmapError::SaveFailed {
                path: self.path.clone(),
                format: self.format,
            },
        }
    }

    /// Close the container and report whether that succeeded.
    pub fn close(mut self) -> Result<(), BitmapError> {
        let Some(multi) = self.multi.take() else {
            return Ok(());
        };
        let engine = self.engine;
        let flags = self.close_flags;
        debug!(path = %self.path.display(), "closing multi-page session");
        fault::guarded_bool(
            Some(self.path.as_path()),
            || engine.close_multi(multi, flags),
            || self.close_error(),
        )
    }
}

impl<E: Engine> Drop for Session<'_, E> {
    fn drop(&mut self) {
        let Some(multi) = self.multi.take() else {
            return;
        };
        if !self.engine.close_multi(multi, self.close_flags) {
            warn!(
                path = %self.path.display(),
                format = ?self.format,
                "multi-page session failed to close while unwinding an error"
            );
        }
    }
}
