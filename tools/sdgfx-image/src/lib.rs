//! Converts ordinary image files into the raw, headerless pixel buffers
//! the SD image component consumes at runtime.

use std::path::Path;

use sdgfx_core::pixel::{self, ByteOrder, PixelFormat, Rgba};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DitherMode {
    None,
    /// Ordered 4x4 Bayer dithering, only meaningful for binary output.
    Bayer,
}

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub format: PixelFormat,
    pub byte_order: ByteOrder,
    pub size: Option<(u32, u32)>,
    pub dither: DitherMode,
    pub invert: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            format: PixelFormat::Rgb565,
            byte_order: ByteOrder::BigEndian,
            size: None,
            dither: DitherMode::None,
            invert: false,
        }
    }
}

#[derive(Debug)]
pub enum ConvertError {
    Decode,
}

pub struct RawImage {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Vec<u8>,
}

const BAYER_4X4: [[u8; 4]; 4] = [
    [0, 8, 2, 10],
    [12, 4, 14, 6],
    [3, 11, 1, 9],
    [15, 7, 13, 5],
];

pub fn convert_bytes(data: &[u8], options: &ConvertOptions) -> Result<RawImage, ConvertError> {
    let mut img = image::load_from_memory(data).map_err(|_| ConvertError::Decode)?;
    if let Some((width, height)) = options.size {
        img = img.resize_exact(width, height, image::imageops::FilterType::Triangle);
    }
    Ok(encode(&img.to_rgba8(), options))
}

fn encode(img: &image::RgbaImage, options: &ConvertOptions) -> RawImage {
    let (width, height) = img.dimensions();
    let mut data = vec![0u8; options.format.buffer_len(width, height)];
    for (x, y, src) in img.enumerate_pixels() {
        let [r, g, b, a] = src.0;
        if options.format == PixelFormat::Binary && options.dither == DitherMode::Bayer {
            let threshold = BAYER_4X4[y as usize % 4][x as usize % 4] as u16 * 16 + 8;
            let on = pixel::luma(r, g, b) as u16 >= threshold;
            let white = if on { 0xFF } else { 0x00 };
            pixel::set_pixel(
                &mut data,
                x,
                y,
                width,
                PixelFormat::Binary,
                options.byte_order,
                Rgba::new(white, white, white, 0xFF),
            );
        } else {
            pixel::set_pixel(
                &mut data,
                x,
                y,
                width,
                options.format,
                options.byte_order,
                Rgba::new(r, g, b, a),
            );
        }
    }
    if options.invert {
        pixel::invert(&mut data, options.format);
    }
    RawImage {
        width,
        height,
        format: options.format,
        data,
    }
}

pub fn write_raw<P: AsRef<Path>>(path: P, raw: &RawImage) -> std::io::Result<()> {
    std::fs::write(path, &raw.data)
}
