//! RGBA frames
//!
//! Every pixel buffer in LUMA is 4 bytes per pixel, RGBA channel order,
//! row-major, no row padding.

use std::fmt;

use crate::{LumaError, LumaResult};

/// Bytes per RGBA pixel
pub const BYTES_PER_PIXEL: usize = 4;

/// Frame dimensions in pixels
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        FrameSize { width, height }
    }

    #[inline]
    pub fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Length of an RGBA buffer of this size
    #[inline]
    pub fn byte_len(self) -> usize {
        self.pixel_count() * BYTES_PER_PIXEL
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Debug for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// An RGBA frame owned by the host
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    size: FrameSize,
    data: Vec<u8>,
}

impl Frame {
    /// Fully transparent black frame
    pub fn new(size: FrameSize) -> Self {
        Frame {
            size,
            data: vec![0; size.byte_len()],
        }
    }

    /// Frame with every pixel set to `rgba`
    pub fn filled(size: FrameSize, rgba: [u8; 4]) -> Self {
        let mut data = Vec::with_capacity(size.byte_len());
        for _ in 0..size.pixel_count() {
            data.extend_from_slice(&rgba);
        }
        Frame { size, data }
    }

    /// Wrap raw RGBA bytes, checking they match the geometry
    pub fn from_rgba(size: FrameSize, data: Vec<u8>) -> LumaResult<Self> {
        if data.len() != size.byte_len() {
            return Err(LumaError::InvalidGeometry {
                width: size.width,
                height: size.height,
                expected: size.byte_len(),
                actual: data.len(),
            });
        }
        Ok(Frame { size, data })
    }

    /// Build a frame pixel by pixel
    pub fn from_fn(size: FrameSize, mut f: impl FnMut(u32, u32) -> [u8; 4]) -> Self {
        let mut data = Vec::with_capacity(size.byte_len());
        for y in 0..size.height {
            for x in 0..size.width {
                data.extend_from_slice(&f(x, y));
            }
        }
        Frame { size, data }
    }

    #[inline]
    pub fn size(&self) -> FrameSize {
        self.size
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.size.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.size.height
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Pixel at (x, y)
    ///
    /// # Panics
    /// Panics if the coordinate is outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.offset(x, y);
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let i = self.offset(x, y);
        self.data[i..i + BYTES_PER_PIXEL].copy_from_slice(&rgba);
    }

    pub fn pixels(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks_exact(BYTES_PER_PIXEL)
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        assert!(x < self.size.width && y < self.size.height);
        (y as usize * self.size.width as usize + x as usize) * BYTES_PER_PIXEL
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("size", &self.size)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Rec. 601 luma, rounded to the nearest integer
#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    let y = 0.299f32 * r as f32 + 0.587f32 * g as f32 + 0.114f32 * b as f32;
    y.round().clamp(0.0, 255.0) as u8
}
