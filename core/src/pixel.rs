//! Raw pixel buffer formats and conversions.
//!
//! Buffers are row-major with no header. Binary images are packed MSB-first
//! as one continuous bit stream; all other formats use a fixed byte stride
//! per pixel. RGB565 words can be stored in either byte order.

extern crate alloc;

use alloc::vec;
use alloc::vec::Vec;
use core::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 1 bit per pixel, packed MSB-first.
    Binary,
    /// 8-bit grayscale.
    Gray8,
    /// 16-bit 5/6/5, byte order selectable.
    Rgb565,
    /// 24-bit RGB.
    Rgb888,
    /// 32-bit RGBA.
    Rgba8888,
}

impl PixelFormat {
    pub const fn bits_per_pixel(self) -> usize {
        match self {
            PixelFormat::Binary => 1,
            PixelFormat::Gray8 => 8,
            PixelFormat::Rgb565 => 16,
            PixelFormat::Rgb888 => 24,
            PixelFormat::Rgba8888 => 32,
        }
    }

    /// Expected buffer length for a `width` x `height` image.
    /// Binary packs `width * height` bits with no row padding.
    pub const fn buffer_len(self, width: u32, height: u32) -> usize {
        let pixels = width as usize * height as usize;
        match self {
            PixelFormat::Binary => (pixels + 7) / 8,
            PixelFormat::Gray8 => pixels,
            PixelFormat::Rgb565 => pixels * 2,
            PixelFormat::Rgb888 => pixels * 3,
            PixelFormat::Rgba8888 => pixels * 4,
        }
    }

    /// Distance in bytes between two consecutive rows.
    pub const fn stride(self, width: u32) -> usize {
        (width as usize * self.bits_per_pixel() + 7) / 8
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            PixelFormat::Binary => "BINARY",
            PixelFormat::Gray8 => "GRAYSCALE",
            PixelFormat::Rgb565 => "RGB565",
            PixelFormat::Rgb888 => "RGB888",
            PixelFormat::Rgba8888 => "RGBA",
        }
    }
}

impl FromStr for PixelFormat {
    type Err = ();

    /// Accepts the configuration strings the host's declarative loader uses.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "binary" => Ok(PixelFormat::Binary),
            "grayscale" | "gray8" => Ok(PixelFormat::Gray8),
            "rgb565" => Ok(PixelFormat::Rgb565),
            "rgb" | "rgb888" => Ok(PixelFormat::Rgb888),
            "rgba" | "rgba8888" => Ok(PixelFormat::Rgba8888),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    LittleEndian,
    BigEndian,
}

impl ByteOrder {
    pub const fn as_str(self) -> &'static str {
        match self {
            ByteOrder::LittleEndian => "LITTLE_ENDIAN",
            ByteOrder::BigEndian => "BIG_ENDIAN",
        }
    }
}

impl Default for ByteOrder {
    fn default() -> Self {
        ByteOrder::BigEndian
    }
}

impl FromStr for ByteOrder {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "little_endian" => Ok(ByteOrder::LittleEndian),
            "big_endian" => Ok(ByteOrder::BigEndian),
            _ => Err(()),
        }
    }
}

/// One decoded pixel, always expanded to 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);
    pub const BLACK: Rgba = Rgba::new(0, 0, 0, 0xFF);
    pub const WHITE: Rgba = Rgba::new(0xFF, 0xFF, 0xFF, 0xFF);
}

/// Integer BT.601 luma, used when collapsing RGB to grayscale or binary.
pub const fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 77 + g as u32 * 150 + b as u32 * 29) >> 8) as u8
}

/// Read the pixel at `(x, y)` from a raw buffer.
///
/// Caller guarantees `x < width` and that the buffer holds at least
/// `buffer_len` bytes for its dimensions.
pub fn get_pixel(
    data: &[u8],
    x: u32,
    y: u32,
    width: u32,
    format: PixelFormat,
    order: ByteOrder,
) -> Rgba {
    let index = y as usize * width as usize + x as usize;
    match format {
        PixelFormat::Binary => {
            let set = data[index / 8] & (0x80 >> (index % 8)) != 0;
            if set { Rgba::WHITE } else { Rgba::BLACK }
        }
        PixelFormat::Gray8 => {
            let gray = data[index];
            Rgba::new(gray, gray, gray, 0xFF)
        }
        PixelFormat::Rgb565 => {
            let pos = index * 2;
            let word = match order {
                ByteOrder::BigEndian => u16::from_be_bytes([data[pos], data[pos + 1]]),
                ByteOrder::LittleEndian => u16::from_le_bytes([data[pos], data[pos + 1]]),
            };
            let r = ((word & 0xF800) >> 11) as u8;
            let g = ((word & 0x07E0) >> 5) as u8;
            let b = (word & 0x001F) as u8;
            // Replicate high bits into the low bits so full scale is reachable.
            Rgba::new((r << 3) | (r >> 2), (g << 2) | (g >> 4), (b << 3) | (b >> 2), 0xFF)
        }
        PixelFormat::Rgb888 => {
            let pos = index * 3;
            Rgba::new(data[pos], data[pos + 1], data[pos + 2], 0xFF)
        }
        PixelFormat::Rgba8888 => {
            let pos = index * 4;
            Rgba::new(data[pos], data[pos + 1], data[pos + 2], data[pos + 3])
        }
    }
}

/// Write the pixel at `(x, y)` into a raw buffer, collapsing channels as the
/// target format requires.
pub fn set_pixel(
    data: &mut [u8],
    x: u32,
    y: u32,
    width: u32,
    format: PixelFormat,
    order: ByteOrder,
    pixel: Rgba,
) {
    let index = y as usize * width as usize + x as usize;
    match format {
        PixelFormat::Binary => {
            let mask = 0x80 >> (index % 8);
            if luma(pixel.r, pixel.g, pixel.b) >= 0x80 {
                data[index / 8] |= mask;
            } else {
                data[index / 8] &= !mask;
            }
        }
        PixelFormat::Gray8 => {
            data[index] = luma(pixel.r, pixel.g, pixel.b);
        }
        PixelFormat::Rgb565 => {
            let word = ((pixel.r as u16 >> 3) << 11)
                | ((pixel.g as u16 >> 2) << 5)
                | (pixel.b as u16 >> 3);
            let bytes = match order {
                ByteOrder::BigEndian => word.to_be_bytes(),
                ByteOrder::LittleEndian => word.to_le_bytes(),
            };
            let pos = index * 2;
            data[pos] = bytes[0];
            data[pos + 1] = bytes[1];
        }
        PixelFormat::Rgb888 => {
            let pos = index * 3;
            data[pos] = pixel.r;
            data[pos + 1] = pixel.g;
            data[pos + 2] = pixel.b;
        }
        PixelFormat::Rgba8888 => {
            let pos = index * 4;
            data[pos] = pixel.r;
            data[pos + 1] = pixel.g;
            data[pos + 2] = pixel.b;
            data[pos + 3] = pixel.a;
        }
    }
}

/// Re-encode a whole buffer into another pixel format.
pub fn convert_pixel_format(
    src: &[u8],
    width: u32,
    height: u32,
    from: PixelFormat,
    from_order: ByteOrder,
    to: PixelFormat,
    to_order: ByteOrder,
) -> Vec<u8> {
    let mut out = vec![0u8; to.buffer_len(width, height)];
    for y in 0..height {
        for x in 0..width {
            let px = get_pixel(src, x, y, width, from, from_order);
            set_pixel(&mut out, x, y, width, to, to_order, px);
        }
    }
    out
}

/// Swap the two bytes of every RGB565 word in place. Applying it twice
/// restores the original buffer.
pub fn convert_byte_order(data: &mut [u8]) {
    for word in data.chunks_exact_mut(2) {
        word.swap(0, 1);
    }
}

/// Invert an image in place: all bits for binary, the gray value for
/// grayscale, only the alpha channel for RGBA. Formats without an alpha
/// channel are left untouched.
pub fn invert(data: &mut [u8], format: PixelFormat) {
    match format {
        PixelFormat::Binary | PixelFormat::Gray8 => {
            for byte in data.iter_mut() {
                *byte ^= 0xFF;
            }
        }
        PixelFormat::Rgba8888 => {
            for pixel in data.chunks_exact_mut(4) {
                pixel[3] ^= 0xFF;
            }
        }
        PixelFormat::Rgb565 | PixelFormat::Rgb888 => {}
    }
}
