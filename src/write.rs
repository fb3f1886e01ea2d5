//! Write path: owned arrays → files.

use std::path::Path;

use tracing::debug;

use crate::array::{OwnedArray, check_rank};
use crate::bridge::{Bridge, global};
use crate::engine::{Engine, FileType};
use crate::error::BitmapError;
use crate::fault;
use crate::flags::IoFlags;
use crate::handle::ImageHandle;
use crate::pixel::{PixelType, pixel_type_for};

impl<E: Engine> Bridge<E> {
    /// Write `array` to `path`; the file type follows the extension.
    ///
    /// 8-bit arrays are taken as RGB(A) and single-channel 8-bit arrays are
    /// written with a greyscale palette.
    pub fn write(
        &self,
        array: &OwnedArray,
        path: impl AsRef<Path>,
        flags: IoFlags,
    ) -> Result<(), BitmapError> {
        let path = path.as_ref();
        let format = self.target_type(path)?;
        let handle = self.bitmap_from_array(array)?;
        self.check_exportable(format, &handle, path)?;
        debug!(path = %path.display(), ?format, flags = flags.bits(), "saving bitmap");
        fault::guarded_bool(
            Some(path),
            || self.engine().save(format, handle.bitmap(), path, flags),
            || BitmapError::SaveFailed {
                path: path.to_path_buf(),
                format,
            },
        )
    }

    /// Write `arrays` as the pages of one file, in order.
    ///
    /// Every page is converted and checked against the format's export
    /// capabilities before the container is created, so a rejected page
    /// leaves nothing at `path`.
    pub fn write_multipage(
        &self,
        arrays: &[OwnedArray],
        path: impl AsRef<Path>,
        flags: IoFlags,
    ) -> Result<(), BitmapError> {
        let path = path.as_ref();
        let format = self.target_type(path)?;
        let mut pages = Vec::with_capacity(arrays.len());
        for array in arrays {
            let page = self.bitmap_from_array(array)?;
            self.check_exportable(format, &page, path)?;
            pages.push(page);
        }
        let mut session = self.create_multipage(path, flags)?;
        for page in pages {
            session.append(page)?;
        }
        debug!(path = %path.display(), pages = arrays.len(), "writing multi-page image");
        session.close()
    }

    /// Allocate an engine bitmap holding a copy of `array`.
    pub fn bitmap_from_array(&self, array: &OwnedArray) -> Result<ImageHandle<'_, E>, BitmapError> {
        check_rank(&array.shape())?;
        let channels = array.channel_count();
        let pixel_type = pixel_type_for(array.element_type(), channels)?;
        let bpp = pixel_type
            .fixed_bpp()
            .unwrap_or(8 * channels as u32);
        let (width, height) = match (u32::try_from(array.width()), u32::try_from(array.height())) {
            (Ok(w), Ok(h)) => (w, h),
            _ => {
                return Err(BitmapError::AllocationError(format!(
                    "{}x{} exceeds the engine's dimension range",
                    array.width(),
                    array.height()
                )));
            }
        };
        let mut handle = self.allocate(pixel_type, width, height, bpp)?;
        handle.copy_from_array(array)?;
        if pixel_type == PixelType::Bitmap && channels == 1 {
            handle.install_greyscale_palette()?;
        }
        Ok(handle)
    }

    fn check_exportable(
        &self,
        format: FileType,
        handle: &ImageHandle<'_, E>,
        path: &Path,
    ) -> Result<(), BitmapError> {
        let pixel_type = handle.pixel_type();
        let bpp = handle.bpp();
        let supported = if pixel_type == PixelType::Bitmap {
            self.engine().supports_export_bpp(format, bpp)
        } else {
            self.engine().supports_export_type(format, pixel_type)
        };
        if supported {
            Ok(())
        } else {
            Err(BitmapError::IncompatibleFormat {
                path: path.to_path_buf(),
                format,
                pixel_type,
                bpp,
            })
        }
    }
}

/// Write an image with the built-in engine. See [`Bridge::write`].
pub fn write(array: &OwnedArray, path: impl AsRef<Path>, flags: IoFlags) -> Result<(), BitmapError> {
    global().write(array, path, flags)
}

/// Write a multi-page image with the built-in engine.
/// See [`Bridge::write_multipage`].
pub fn write_multipage(
    arrays: &[OwnedArray],
    path: impl AsRef<Path>,
    flags: IoFlags,
) -> Result<(), BitmapError> {
    global().write_multipage(arrays, path, flags)
}
