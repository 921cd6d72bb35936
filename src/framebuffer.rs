//! The 128x64 monochrome framebuffer scripts draw into.
//!
//! Pixels are packed row-major, one bit each, most significant bit first:
//! pixel (x, y) lives in byte `(y * 128 + x) / 8` at bit `7 - (y * 128 + x) % 8`.

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::{DrawTarget, OriginDimensions, Pixel, Size};
use std::convert::Infallible;
use std::fmt;

pub const WIDTH: i32 = 128;
pub const HEIGHT: i32 = 64;
pub const BUFFER_BYTES: usize = (WIDTH as usize * HEIGHT as usize) / 8;

#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    bytes: [u8; BUFFER_BYTES],
}

impl PixelBuffer {
    pub fn new() -> Self {
        Self {
            bytes: [0; BUFFER_BYTES],
        }
    }

    /// Copies a packed buffer; any length other than 1024 bytes is rejected.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; BUFFER_BYTES] = bytes.try_into().ok()?;
        Some(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes.to_vec()
    }

    pub fn in_bounds(x: i64, y: i64) -> bool {
        (0..WIDTH as i64).contains(&x) && (0..HEIGHT as i64).contains(&y)
    }

    /// Out-of-range coordinates read as off.
    pub fn get(&self, x: i64, y: i64) -> bool {
        if !Self::in_bounds(x, y) {
            return false;
        }
        let (byte, mask) = Self::locate(x, y);
        self.bytes[byte] & mask != 0
    }

    /// Out-of-range coordinates are ignored.
    pub fn set(&mut self, x: i64, y: i64, on: bool) {
        if !Self::in_bounds(x, y) {
            return;
        }
        let (byte, mask) = Self::locate(x, y);
        if on {
            self.bytes[byte] |= mask;
        } else {
            self.bytes[byte] &= !mask;
        }
    }

    pub fn fill(&mut self, on: bool) {
        self.bytes.fill(if on { 0xFF } else { 0x00 });
    }

    pub fn invert(&mut self) {
        for byte in self.bytes.iter_mut() {
            *byte = !*byte;
        }
    }

    pub fn count_set(&self) -> usize {
        self.bytes.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Coordinates of every lit pixel, row by row.
    pub fn lit_pixels(&self) -> Vec<(i32, i32)> {
        let mut lit = Vec::new();
        for y in 0..HEIGHT {
            for x in 0..WIDTH {
                if self.get(x as i64, y as i64) {
                    lit.push((x, y));
                }
            }
        }
        lit
    }

    /// Terminal rendering: `#` for lit pixels, `.` otherwise, one row per line.
    pub fn to_ascii(&self) -> String {
        let mut out = String::with_capacity((WIDTH as usize + 1) * HEIGHT as usize);
        for y in 0..HEIGHT {
            for x in 0..WIDTH {
                out.push(if self.get(x as i64, y as i64) { '#' } else { '.' });
            }
            out.push('\n');
        }
        out
    }

    fn locate(x: i64, y: i64) -> (usize, u8) {
        let bit_index = (y * WIDTH as i64 + x) as usize;
        (bit_index >> 3, 1 << (7 - (bit_index & 7)))
    }
}

impl Default for PixelBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "PixelBuffer({} lit)", self.count_set())
    }
}

impl OriginDimensions for PixelBuffer {
    fn size(&self) -> Size {
        Size::new(WIDTH as u32, HEIGHT as u32)
    }
}

impl DrawTarget for PixelBuffer {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.set(point.x as i64, point.y as i64, color.is_on());
        }
        Ok(())
    }
}
