use crate::error::CodecError;

/// Resource limits applied by [`DibEngine`](crate::DibEngine) whenever it
/// creates a bitmap, whether by loading a file or by allocation.
///
/// All fields default to `None` (no limit).
#[derive(Clone, Debug, Default)]
pub struct Limits {
    pub max_width: Option<u64>,
    pub max_height: Option<u64>,
    /// Maximum pixel count (width * height).
    pub max_pixels: Option<u64>,
    /// Maximum bytes for one bitmap's pixel buffer (pitch * height).
    pub max_memory_bytes: Option<u64>,
}

impl Limits {
    /// Validate a bitmap of the given geometry and return its buffer size.
    pub(crate) fn check_bitmap(
        &self,
        width: u32,
        height: u32,
        pitch: usize,
    ) -> Result<usize, CodecError> {
        exceeds("width", u64::from(width), self.max_width)?;
        exceeds("height", u64::from(height), self.max_height)?;
        exceeds(
            "pixel count",
            u64::from(width) * u64::from(height),
            self.max_pixels,
        )?;
        let bytes = pitch
            .checked_mul(height as usize)
            .ok_or(CodecError::DimensionsTooLarge { width, height })?;
        exceeds("allocation bytes", bytes as u64, self.max_memory_bytes)?;
        Ok(bytes)
    }
}

fn exceeds(what: &str, value: u64, limit: Option<u64>) -> Result<(), CodecError> {
    match limit {
        Some(max) if value > max => Err(CodecError::LimitExceeded(format!(
            "{what} {value} exceeds limit {max}"
        ))),
        _ => Ok(()),
    }
}
