use std::path::Path;
use std::sync::OnceLock;

use tracing::debug;

use crate::dib::DibEngine;
use crate::engine::{Engine, FileType};
use crate::error::BitmapError;
use crate::fault;
use crate::flags::IoFlags;
use crate::handle::{ImageHandle, Origin, Session};
use crate::pixel::PixelType;

/// Moves pixels and metadata between an [`Engine`] and owned arrays.
///
/// Creating a bridge installs the crate's fault hook into the engine, so
/// engine faults surface as [`BitmapError::DecoderFault`].
#[derive(Debug)]
pub struct Bridge<E: Engine> {
    engine: E,
}

impl<E: Engine> Bridge<E> {
    pub fn new(engine: E) -> Self {
        fault::install(&engine);
        Self { engine }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub(crate) fn sniff(&self, path: &Path) -> Result<FileType, BitmapError> {
        self.engine
            .sniff_file_type(path)
            .ok_or_else(|| BitmapError::UnknownFileType {
                path: path.to_path_buf(),
            })
    }

    pub(crate) fn target_type(&self, path: &Path) -> Result<FileType, BitmapError> {
        self.engine
            .file_type_from_extension(path)
            .ok_or_else(|| BitmapError::UnknownFileType {
                path: path.to_path_buf(),
            })
    }

    /// Sniff and load a file, returning the live bitmap.
    pub fn open(
        &self,
        path: impl AsRef<Path>,
        flags: IoFlags,
    ) -> Result<ImageHandle<'_, E>, BitmapError> {
        let path = path.as_ref();
        let format = self.sniff(path)?;
        debug!(path = %path.display(), ?format, flags = flags.bits(), "loading bitmap");
        let bitmap = fault::guarded(
            Some(path),
            || self.engine.load(format, path, flags),
            || BitmapError::LoadFailed {
                path: path.to_path_buf(),
                format,
                reason: "engine returned no bitmap",
            },
        )?;
        Ok(ImageHandle::standalone(
            &self.engine,
            bitmap,
            Origin::File {
                path: path.to_path_buf(),
                format,
            },
        ))
    }

    /// Allocate a zeroed bitmap owned by the engine.
    pub fn allocate(
        &self,
        pixel_type: PixelType,
        width: u32,
        height: u32,
        bpp: u32,
    ) -> Result<ImageHandle<'_, E>, BitmapError> {
        let bitmap = fault::guarded(
            None,
            || self.engine.allocate(pixel_type, width, height, bpp),
            || {
                BitmapError::AllocationError(format!(
                    "could not allocate {width}x{height} {pixel_type:?} bitmap at {bpp} bpp"
                ))
            },
        )?;
        Ok(ImageHandle::standalone(&self.engine, bitmap, Origin::Allocated))
    }

    /// Open an existing multi-page file read-only.
    pub fn open_multipage(
        &self,
        path: impl AsRef<Path>,
        flags: IoFlags,
    ) -> Result<Session<'_, E>, BitmapError> {
        let path = path.as_ref();
        let format = self.sniff(path)?;
        Session::open_read(&self.engine, format, path, flags)
    }

    /// Create a multi-page file whose type follows the path's extension.
    ///
    /// `flags` are the save flags used when the session is closed.
    pub fn create_multipage(
        &self,
        path: impl AsRef<Path>,
        flags: IoFlags,
    ) -> Result<Session<'_, E>, BitmapError> {
        let path = path.as_ref();
        let format = self.target_type(path)?;
        Session::create(&self.engine, format, path, flags)
    }
}

impl Default for Bridge<DibEngine> {
    fn default() -> Self {
        Self::new(DibEngine::new())
    }
}

/// The bridge behind the crate-level free functions.
pub fn global() -> &'static Bridge<DibEngine> {
    static GLOBAL: OnceLock<Bridge<DibEngine>> = OnceLock::new();
    GLOBAL.get_or_init(Bridge::default)
}
