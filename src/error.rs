use std::path::PathBuf;

use crate::engine::FileType;
use crate::pixel::PixelType;

/// Errors surfaced by the bridge's public read/write operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BitmapError {
    #[error("cannot determine file type of {}", .path.display())]
    UnknownFileType { path: PathBuf },

    #[error("could not load {} as {format:?}: {reason}", .path.display())]
    LoadFailed {
        path: PathBuf,
        format: FileType,
        reason: &'static str,
    },

    #[error("could not save {} as {format:?}", .path.display())]
    SaveFailed { path: PathBuf, format: FileType },

    #[error("allocation failed: {0}")]
    AllocationError(String),

    #[error("unsupported pixel format: {0}")]
    UnsupportedFormat(String),

    #[error("only (width, height) or (width, height, channels) arrays are permitted, got {ndim} dimensions")]
    InvalidShape { ndim: usize },

    #[error("cannot save {pixel_type:?} ({bpp} bpp) to {format:?} file {}", .path.display())]
    IncompatibleFormat {
        path: PathBuf,
        format: FileType,
        pixel_type: PixelType,
        bpp: u32,
    },

    #[error(
        "decoder error{} ({format:?}): {message}",
        .path.as_ref().map(|p| format!(" in {}", p.display())).unwrap_or_default()
    )]
    DecoderFault {
        /// File being read or written; `None` for in-memory allocations.
        path: Option<PathBuf>,
        format: Option<FileType>,
        message: String,
    },

    #[error("buffer too small: need {needed} bytes, got {actual}")]
    BufferTooSmall { needed: usize, actual: usize },

    #[error("array shape needs {expected} elements, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
}

/// Errors raised inside the built-in engine's format plugins.
///
/// These never reach bridge callers directly: the engine reports them
/// through the output-message hook and returns a null result.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CodecError {
    #[error("unrecognized format magic bytes")]
    UnrecognizedFormat,

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("unsupported format variant: {0}")]
    UnsupportedVariant(String),

    #[error("invalid pixel data: {0}")]
    InvalidData(String),

    #[error("dimensions too large: {width}x{height}")]
    DimensionsTooLarge { width: u32, height: u32 },

    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "tiff")]
    #[error("TIFF error: {0}")]
    Tiff(#[from] ::tiff::TiffError),
}
