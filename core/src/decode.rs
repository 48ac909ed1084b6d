//! Image container sniffing and placeholder decoders.
//!
//! PNG and JPEG files are recognized by signature and their dimensions are
//! parsed from the real headers, but the pixel data is synthesized as a test
//! pattern instead of being decompressed. Anything else is treated as a raw
//! pixel buffer and validated against the configured dimensions.

extern crate alloc;

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use log::warn;

use crate::pixel::PixelFormat;

pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
pub const JPEG_SIGNATURE: [u8; 3] = [0xFF, 0xD8, 0xFF];

// Memory guard for the synthesized buffers.
const MAX_PIXELS: u32 = 2048 * 2048;

// JPEG markers.
const M_SOF0: u8 = 0xC0;
const M_SOF1: u8 = 0xC1;
const M_SOF2: u8 = 0xC2;
const M_SOI: u8 = 0xD8;
const M_EOI: u8 = 0xD9;
const M_SOS: u8 = 0xDA;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    Io,
    Decode,
    Unsupported,
    InvalidDimensions,
    SizeMismatch { expected: usize, actual: usize },
    Message(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Png,
    Jpeg,
    Raw,
}

pub fn detect(data: &[u8]) -> Container {
    if data.starts_with(&PNG_SIGNATURE) {
        Container::Png
    } else if data.starts_with(&JPEG_SIGNATURE) {
        Container::Jpeg
    } else {
        Container::Raw
    }
}

/// An image held in memory, always row-major with no header.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Vec<u8>,
}

/// Read width and height from the IHDR chunk, which is always the first
/// chunk after the signature.
pub fn png_dimensions(data: &[u8]) -> Result<(u32, u32), ImageError> {
    if !data.starts_with(&PNG_SIGNATURE) || data.len() < 24 {
        return Err(ImageError::Decode);
    }
    if &data[12..16] != b"IHDR" {
        return Err(ImageError::Decode);
    }
    let width = u32::from_be_bytes([data[16], data[17], data[18], data[19]]);
    let height = u32::from_be_bytes([data[20], data[21], data[22], data[23]]);
    check_dimensions(width, height)?;
    Ok((width, height))
}

/// Scan markers until a start-of-frame and read the image dimensions from
/// it. Segments we do not care about are skipped by their length field.
pub fn jpeg_dimensions(data: &[u8]) -> Result<(u32, u32), ImageError> {
    if !data.starts_with(&JPEG_SIGNATURE) {
        return Err(ImageError::Decode);
    }
    let mut pos = 2;
    loop {
        if pos + 4 > data.len() {
            return Err(ImageError::Decode);
        }
        if data[pos] != 0xFF {
            return Err(ImageError::Decode);
        }
        // Fill bytes before a marker are legal.
        while pos < data.len() && data[pos] == 0xFF {
            pos += 1;
        }
        if pos >= data.len() {
            return Err(ImageError::Decode);
        }
        let marker = data[pos];
        pos += 1;
        match marker {
            M_SOF0 | M_SOF1 | M_SOF2 => {
                // length(2) precision(1) height(2) width(2)
                if pos + 7 > data.len() {
                    return Err(ImageError::Decode);
                }
                let height = u16::from_be_bytes([data[pos + 3], data[pos + 4]]) as u32;
                let width = u16::from_be_bytes([data[pos + 5], data[pos + 6]]) as u32;
                check_dimensions(width, height)?;
                return Ok((width, height));
            }
            M_SOI | 0x01 | 0xD0..=0xD7 => {} // no payload
            M_EOI | M_SOS => return Err(ImageError::Decode),
            _ => {
                if pos + 2 > data.len() {
                    return Err(ImageError::Decode);
                }
                let len = u16::from_be_bytes([data[pos], data[pos + 1]]) as usize;
                if len < 2 {
                    return Err(ImageError::Decode);
                }
                pos += len;
            }
        }
    }
}

/// Placeholder decoder: honors the real header dimensions but fills the
/// image with a checkerboard instead of decompressing IDAT data.
pub fn decode_png(data: &[u8]) -> Result<DecodedImage, ImageError> {
    let (width, height) = png_dimensions(data)?;
    warn!(
        "PNG decoder is a placeholder, rendering {}x{} checkerboard",
        width, height
    );
    let mut out = vec![0u8; PixelFormat::Rgb888.buffer_len(width, height)];
    for y in 0..height {
        for x in 0..width {
            let value = if ((x / 8) + (y / 8)) % 2 == 0 { 0xFF } else { 0x40 };
            let pos = (y as usize * width as usize + x as usize) * 3;
            out[pos] = value;
            out[pos + 1] = value;
            out[pos + 2] = value;
        }
    }
    Ok(DecodedImage {
        width,
        height,
        format: PixelFormat::Rgb888,
        data: out,
    })
}

/// Placeholder decoder: honors the real header dimensions but fills the
/// image with a two-axis gradient instead of running the DCT pipeline.
pub fn decode_jpeg(data: &[u8]) -> Result<DecodedImage, ImageError> {
    let (width, height) = jpeg_dimensions(data)?;
    warn!(
        "JPEG decoder is a placeholder, rendering {}x{} gradient",
        width, height
    );
    let mut out = vec![0u8; PixelFormat::Rgb888.buffer_len(width, height)];
    for y in 0..height {
        for x in 0..width {
            let pos = (y as usize * width as usize + x as usize) * 3;
            out[pos] = (x * 255 / width.max(1)) as u8;
            out[pos + 1] = (y * 255 / height.max(1)) as u8;
            out[pos + 2] = 0x80;
        }
    }
    Ok(DecodedImage {
        width,
        height,
        format: PixelFormat::Rgb888,
        data: out,
    })
}

/// Accept a raw pixel buffer if its length matches the configured
/// dimensions exactly.
pub fn load_raw(
    data: Vec<u8>,
    width: u32,
    height: u32,
    format: PixelFormat,
) -> Result<DecodedImage, ImageError> {
    check_dimensions(width, height)?;
    let expected = format.buffer_len(width, height);
    if data.len() != expected {
        return Err(ImageError::SizeMismatch {
            expected,
            actual: data.len(),
        });
    }
    Ok(DecodedImage {
        width,
        height,
        format,
        data,
    })
}

fn check_dimensions(width: u32, height: u32) -> Result<(), ImageError> {
    if width == 0 || height == 0 {
        return Err(ImageError::InvalidDimensions);
    }
    if width.saturating_mul(height) > MAX_PIXELS {
        return Err(ImageError::InvalidDimensions);
    }
    Ok(())
}
