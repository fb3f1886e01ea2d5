//! Strided, non-owning views over engine-owned pixel memory.
//!
//! Engines store scanlines bottom-up: the first `pitch` bytes of the buffer
//! hold the visual bottom row. A view starts at the last stored scanline and
//! walks the height axis with a stride of `-pitch`, so logical row 0 is the
//! top of the image and no data is moved.
//!
//! Byte address of element `(x, y, c)`:
//!
//! ```text
//! offset + x * strides[0] + y * strides[1] + c * strides[2]
//! offset     = pitch * (height - 1)
//! strides    = [channels * esize, -pitch, esize]   (3-D)
//!            = [esize, -pitch]                     (2-D)
//! ```

use crate::array::{Element, OwnedArray, with_array_data};
use crate::error::BitmapError;
use crate::pixel::{ElementType, PixelDescriptor};

/// Geometry shared by the shared and mutable views.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewLayout {
    descriptor: PixelDescriptor,
    pitch: usize,
}

impl ViewLayout {
    fn new(descriptor: PixelDescriptor, pitch: usize, available: usize) -> Result<Self, BitmapError> {
        let row_bytes = descriptor.row_bytes();
        if pitch < row_bytes {
            return Err(BitmapError::UnsupportedFormat(format!(
                "row pitch {pitch} is shorter than a {row_bytes}-byte scanline"
            )));
        }
        let span = pitch
            .checked_mul(descriptor.height)
            .ok_or_else(|| BitmapError::ShapeMismatch("pitch * height overflows".into()))?;
        if available < span {
            return Err(BitmapError::BufferTooSmall {
                needed: span,
                actual: available,
            });
        }
        Ok(Self { descriptor, pitch })
    }

    pub fn descriptor(&self) -> &PixelDescriptor {
        &self.descriptor
    }

    pub fn pitch(&self) -> usize {
        self.pitch
    }

    /// Byte offset of logical row 0 (the last stored scanline).
    pub fn offset(&self) -> usize {
        self.pitch * self.descriptor.height.saturating_sub(1)
    }

    /// Per-axis strides in bytes, `[width, height, channel]`.
    ///
    /// 2-D views report two strides.
    pub fn strides(&self) -> Vec<isize> {
        let esize = self.descriptor.element.size() as isize;
        let row = -(self.pitch as isize);
        match self.descriptor.channels {
            Some(c) => vec![c as isize * esize, row, esize],
            None => vec![esize, row],
        }
    }

    /// Total addressable bytes, `pitch * height`.
    pub fn byte_len(&self) -> usize {
        self.pitch * self.descriptor.height
    }

    /// Byte offset of logical row `y`.
    pub fn row_offset(&self, y: usize) -> usize {
        debug_assert!(y < self.descriptor.height);
        self.offset() - y * self.pitch
    }

    /// Byte offset of element `(x, y, c)`.
    pub fn element_offset(&self, x: usize, y: usize, c: usize) -> usize {
        let esize = self.descriptor.element.size();
        self.row_offset(y) + (x * self.descriptor.channel_count() + c) * esize
    }

    fn row_range(&self, y: usize) -> core::ops::Range<usize> {
        let start = self.row_offset(y);
        start..start + self.descriptor.row_bytes()
    }
}

/// Read-only view over a bitmap's pixel memory.
///
/// Borrowing the engine's buffer ties the view's lifetime to the open handle.
#[derive(Clone, Copy, Debug)]
pub struct BitmapView<'a> {
    bits: &'a [u8],
    layout: ViewLayout,
}

impl<'a> BitmapView<'a> {
    /// Wrap `bits` (at least `pitch * height` bytes) as a top-down view.
    pub fn wrap(bits: &'a [u8], pitch: usize, descriptor: PixelDescriptor) -> Result<Self, BitmapError> {
        let layout = ViewLayout::new(descriptor, pitch, bits.len())?;
        Ok(Self { bits, layout })
    }

    pub fn layout(&self) -> &ViewLayout {
        &self.layout
    }

    pub fn descriptor(&self) -> &PixelDescriptor {
        &self.layout.descriptor
    }

    /// The contiguous bytes of logical row `y`, padding excluded.
    pub fn row(&self, y: usize) -> &'a [u8] {
        &self.bits[self.layout.row_range(y)]
    }

    /// Element at `(x, y, c)`. Panics if `T` is not the view's element type
    /// or the index is out of range.
    pub fn get<T: Element>(&self, x: usize, y: usize, c: usize) -> T {
        assert_eq!(T::TYPE, self.layout.descriptor.element, "element type mismatch");
        let at = self.layout.element_offset(x, y, c);
        T::read_ne(&self.bits[at..at + T::TYPE.size()])
    }

    /// Copy into an owned array in logical (top-down, unpadded) order.
    pub fn to_array(&self) -> Result<OwnedArray, BitmapError> {
        let d = self.layout.descriptor;
        let mut out = OwnedArray::zeros(d.element, d.width, d.height, d.channels)?;
        let per_row = d.width * d.channel_count();
        with_array_data!(out.data_mut(), |dst: T| {
            let esize = <T as Element>::TYPE.size();
            for y in 0..d.height {
                let src = self.row(y);
                let row = &mut dst[y * per_row..(y + 1) * per_row];
                for (value, raw) in row.iter_mut().zip(src.chunks_exact(esize)) {
                    *value = <T as Element>::read_ne(raw);
                }
            }
        });
        Ok(out)
    }
}

/// Writable view over a bitmap's pixel memory.
#[derive(Debug)]
pub struct BitmapViewMut<'a> {
    bits: &'a mut [u8],
    layout: ViewLayout,
}

impl<'a> BitmapViewMut<'a> {
    /// Wrap `bits` (at least `pitch * height` bytes) as a writable top-down view.
    pub fn wrap(
        bits: &'a mut [u8],
        pitch: usize,
        descriptor: PixelDescriptor,
    ) -> Result<Self, BitmapError> {
        let layout = ViewLayout::new(descriptor, pitch, bits.len())?;
        Ok(Self { bits, layout })
    }

    pub fn layout(&self) -> &ViewLayout {
        &self.layout
    }

    pub fn descriptor(&self) -> &PixelDescriptor {
        &self.layout.descriptor
    }

    pub fn as_view(&self) -> BitmapView<'_> {
        BitmapView {
            bits: self.bits,
            layout: self.layout,
        }
    }

    pub fn row(&self, y: usize) -> &[u8] {
        &self.bits[self.layout.row_range(y)]
    }

    /// The contiguous bytes of logical row `y`, padding excluded.
    pub fn row_mut(&mut self, y: usize) -> &mut [u8] {
        let range = self.layout.row_range(y);
        &mut self.bits[range]
    }

    /// Store `value` at `(x, y, c)`. Panics on type mismatch or out of range.
    pub fn set<T: Element>(&mut self, x: usize, y: usize, c: usize, value: T) {
        assert_eq!(T::TYPE, self.layout.descriptor.element, "element type mismatch");
        let at = self.layout.element_offset(x, y, c);
        value.write_ne(&mut self.bits[at..at + T::TYPE.size()]);
    }

    /// Copy `src` element for element into the view, no reordering.
    pub fn copy_from(&mut self, src: &OwnedArray) -> Result<(), BitmapError> {
        check_same_shape(src, &self.layout.descriptor)?;
        let d = self.layout.descriptor;
        let per_row = d.width * d.channel_count();
        with_array_data!(src.data(), |values: T| {
            let esize = <T as Element>::TYPE.size();
            for y in 0..d.height {
                let row = &values[y * per_row..(y + 1) * per_row];
                let dst = self.row_mut(y);
                for (raw, value) in dst.chunks_exact_mut(esize).zip(row) {
                    <T as Element>::write_ne(*value, raw);
                }
            }
        });
        Ok(())
    }
}

/// Fail unless `array` has exactly the element type and shape of `d`.
pub(crate) fn check_same_shape(array: &OwnedArray, d: &PixelDescriptor) -> Result<(), BitmapError> {
    if array.element_type() != d.element
        || array.width() != d.width
        || array.height() != d.height
        || array.channel_count() != d.channel_count()
    {
        return Err(BitmapError::ShapeMismatch(format!(
            "array {:?} {:?} does not match view {:?} {:?}",
            array.element_type(),
            array.shape(),
            d.element,
            d.shape()
        )));
    }
    Ok(())
}

/// Whether element type `e` is the 8-bit integer type the channel swap
/// applies to.
pub(crate) fn is_byte_samples(e: ElementType) -> bool {
    e == ElementType::U8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(width: usize, height: usize, channels: Option<usize>) -> PixelDescriptor {
        PixelDescriptor {
            element: ElementType::U8,
            width,
            height,
            channels,
        }
    }

    #[test]
    fn row_zero_is_last_scanline() {
        // 3 px of RGB = 9 bytes, padded to a 12-byte pitch.
        let pitch = 12;
        let height = 4;
        let bits = vec![0u8; pitch * height];
        let view = BitmapView::wrap(&bits, pitch, descriptor(3, height, Some(3))).unwrap();
        let layout = view.layout();
        assert_eq!(layout.offset(), pitch * (height - 1));
        assert_eq!(layout.row_offset(0), pitch * (height - 1));
        assert_eq!(layout.row_offset(height - 1), 0);
        assert_eq!(layout.strides(), vec![3, -(pitch as isize), 1]);
        assert_eq!(layout.byte_len(), 48);
    }

    #[test]
    fn two_dimensional_strides() {
        let bits = vec![0u8; 16 * 2];
        let d = PixelDescriptor {
            element: ElementType::U32,
            width: 3,
            height: 2,
            channels: None,
        };
        let view = BitmapView::wrap(&bits, 16, d).unwrap();
        assert_eq!(view.layout().strides(), vec![4, -16]);
        assert_eq!(view.layout().element_offset(2, 0, 0), 16 + 8);
    }

    #[test]
    fn copy_skips_padding_and_flips_rows() {
        // Two 2-px grey rows at a 4-byte pitch, stored bottom-up.
        let bits = vec![
            10, 11, 0xAA, 0xAA, // physical row 0 = visual bottom
            20, 21, 0xAA, 0xAA, // physical row 1 = visual top
        ];
        let view = BitmapView::wrap(&bits, 4, descriptor(2, 2, None)).unwrap();
        let array = view.to_array().unwrap();
        assert_eq!(array.as_slice::<u8>().unwrap(), &[20, 21, 10, 11]);
        assert_eq!(view.get::<u8>(1, 1, 0), 11);
    }

    #[test]
    fn writes_land_bottom_up() {
        let mut bits = vec![0u8; 8];
        let mut view = BitmapViewMut::wrap(&mut bits, 4, descriptor(2, 2, None)).unwrap();
        let src = OwnedArray::from_vec(2, 2, None, vec![1u8, 2, 3, 4]).unwrap();
        view.copy_from(&src).unwrap();
        assert_eq!(bits, vec![3, 4, 0, 0, 1, 2, 0, 0]);
    }

    #[test]
    fn short_buffer_is_rejected() {
        let bits = vec![0u8; 7];
        let err = BitmapView::wrap(&bits, 4, descriptor(2, 2, None)).unwrap_err();
        assert!(matches!(err, BitmapError::BufferTooSmall { needed: 8, actual: 7 }));
        assert_eq!(err.to_string(), "buffer too small: need 8 bytes, got 7");
    }

    #[test]
    fn signed_elements_keep_their_sign() {
        let mut bits = vec![0u8; 4 * 1];
        let d = PixelDescriptor {
            element: ElementType::I16,
            width: 2,
            height: 1,
            channels: None,
        };
        let mut view = BitmapViewMut::wrap(&mut bits, 4, d).unwrap();
        view.set::<i16>(0, 0, 0, -2);
        view.set::<i16>(1, 0, 0, i16::MAX);
        let array = view.as_view().to_array().unwrap();
        assert_eq!(array.as_slice::<i16>().unwrap(), &[-2, i16::MAX]);
    }
}
