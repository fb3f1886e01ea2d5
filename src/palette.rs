//! Greyscale palette for single-channel 8-bit bitmaps.

use crate::error::BitmapError;

/// Palette entries of an 8-bit bitmap.
pub const PALETTE_ENTRIES: usize = 256;

/// Bytes of one palette entry (blue, green, red, reserved).
pub const ENTRY_BYTES: usize = 4;

/// Fill `palette` with the identity greyscale ramp.
///
/// Entry `v` becomes the bytes `[v, v, v, 0]`, which read as a little-endian
/// `u32` is `0x00vvvvvv`. A missing palette or one shorter than 256 entries
/// is an [`BitmapError::AllocationError`].
pub fn install_greyscale_ramp(palette: Option<&mut [u8]>) -> Result<(), BitmapError> {
    let palette = palette.ok_or_else(|| BitmapError::AllocationError("could not get image palette".into()))?;
    let needed = PALETTE_ENTRIES * ENTRY_BYTES;
    if palette.len() < needed {
        return Err(BitmapError::AllocationError(format!(
            "palette holds {} bytes, need {needed}",
            palette.len()
        )));
    }
    for (v, entry) in palette.chunks_exact_mut(ENTRY_BYTES).take(PALETTE_ENTRIES).enumerate() {
        let v = v as u8;
        entry.copy_from_slice(&[v, v, v, 0]);
    }
    Ok(())
}

/// Whether the first 256 entries of `palette` form the greyscale ramp.
///
/// The reserved byte is ignored.
pub fn is_greyscale_ramp(palette: &[u8]) -> bool {
    palette.len() >= PALETTE_ENTRIES * ENTRY_BYTES
        && palette
            .chunks_exact(ENTRY_BYTES)
            .take(PALETTE_ENTRIES)
            .enumerate()
            .all(|(v, e)| e[0] as usize == v && e[1] as usize == v && e[2] as usize == v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_v_is_zero_v_v_v() {
        let mut palette = vec![0xFFu8; 1024];
        install_greyscale_ramp(Some(&mut palette)).unwrap();
        for (v, entry) in palette.chunks_exact(4).enumerate() {
            let word = u32::from_le_bytes([entry[0], entry[1], entry[2], entry[3]]);
            assert_eq!(word, 0x0001_0101 * v as u32);
            assert_eq!(word.to_be_bytes(), [0, v as u8, v as u8, v as u8]);
        }
        assert!(is_greyscale_ramp(&palette));
    }

    #[test]
    fn missing_palette_fails() {
        assert!(matches!(
            install_greyscale_ramp(None),
            Err(BitmapError::AllocationError(_))
        ));
        let mut short = vec![0u8; 1020];
        assert!(matches!(
            install_greyscale_ramp(Some(&mut short)),
            Err(BitmapError::AllocationError(_))
        ));
    }

    #[test]
    fn colour_palette_is_not_a_ramp() {
        let mut palette = vec![0u8; 1024];
        install_greyscale_ramp(Some(&mut palette)).unwrap();
        palette[4 * 7] = 0;
        assert!(!is_greyscale_ramp(&palette));
    }
}
