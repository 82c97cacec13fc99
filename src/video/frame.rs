//! Packed RGB24 video frame

use crate::error::{OverlayError, Result};

/// Bytes per pixel in a packed RGB24 buffer
pub const BYTES_PER_PIXEL: usize = 3;

/// A decoded video frame in packed RGB24 layout (row-major, no padding)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Frame {
    /// Black frame of the given size
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, [0, 0, 0])
    }

    /// Frame filled with a single color
    #[must_use]
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take(Self::byte_len(width, height))
            .collect();
        Self {
            width,
            height,
            data,
        }
    }

    /// Wrap an existing buffer, checking it matches the dimensions
    pub fn from_rgb(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let frame = Self {
            width,
            height,
            data,
        };
        frame.validate()?;
        Ok(frame)
    }

    /// Buffer size for a `width` x `height` frame
    #[must_use]
    pub fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * BYTES_PER_PIXEL
    }

    /// Fails with `InvalidFrame` for zero dimensions or a short/long buffer
    pub fn validate(&self) -> Result<()> {
        if self.width == 0
            || self.height == 0
            || self.data.len() != Self::byte_len(self.width, self.height)
        {
            return Err(OverlayError::InvalidFrame {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL
    }

    /// Pixel at (x, y), or `None` outside the frame
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.offset(x, y);
        Some([self.data[i], self.data[i + 1], self.data[i + 2]])
    }

    /// Set pixel at (x, y); out-of-bounds writes are ignored
    pub fn put_pixel(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = self.offset(x, y);
        self.data[i..i + BYTES_PER_PIXEL].copy_from_slice(&rgb);
    }

    /// Mutable view of one row's pixels in `[x0, x1)`
    pub fn row_span_mut(&mut self, y: u32, x0: u32, x1: u32) -> &mut [u8] {
        let start = self.offset(x0, y);
        let end = self.offset(x1, y);
        &mut self.data[start..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filled_frame_has_expected_layout() {
        let frame = Frame::filled(4, 2, [1, 2, 3]);
        assert_eq!(frame.data.len(), 24);
        assert_eq!(frame.pixel(3, 1), Some([1, 2, 3]));
        assert_eq!(frame.pixel(4, 0), None);
    }

    #[test]
    fn from_rgb_rejects_mismatched_buffer() {
        assert!(Frame::from_rgb(2, 2, vec![0; 12]).is_ok());
        assert!(matches!(
            Frame::from_rgb(2, 2, vec![0; 11]),
            Err(OverlayError::InvalidFrame { width: 2, height: 2 })
        ));
        assert!(Frame::from_rgb(0, 2, Vec::new()).is_err());
    }

    #[test]
    fn put_pixel_ignores_out_of_bounds() {
        let mut frame = Frame::new(2, 2);
        frame.put_pixel(5, 5, [9, 9, 9]);
        frame.put_pixel(1, 0, [9, 8, 7]);
        assert_eq!(frame.pixel(1, 0), Some([9, 8, 7]));
        assert_eq!(frame.data.iter().filter(|&&b| b != 0).count(), 3);
    }
}
