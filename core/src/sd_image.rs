//! Image component backed by a file on the SD card.
//!
//! The host's configuration loader fills in an [`ImageConfig`]; the image
//! bytes are fetched lazily on the first draw (or eagerly when `preload`
//! is set) and decoded per [`crate::decode`]. RGB565 buffers are
//! normalized to big-endian in memory so pixel reads never branch on the
//! source byte order again.

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;

use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::{DrawTarget, Point};
use embedded_graphics::Pixel;
use log::{debug, info, warn};

use crate::decode::{self, Container, ImageError};
use crate::pixel::{self, ByteOrder, PixelFormat, Rgba};
use crate::sd::SdCard;
use crate::storage::{is_valid_path, normalize_path};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transparency {
    Opaque,
    /// A reserved color marks transparent pixels: gray 1 for grayscale,
    /// (0, 1, 0) for RGB, the raw word 0x0020 for RGB565. Binary images
    /// skip their off pixels.
    ChromaKey,
    /// RGBA carries its own alpha; grayscale is interpreted as an alpha
    /// mask over black.
    AlphaChannel,
}

#[derive(Debug, Clone)]
pub struct ImageConfig {
    pub path: String,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub byte_order: ByteOrder,
    pub transparency: Transparency,
    pub invert_alpha: bool,
    /// Keep the byte buffer resident between draws. When disabled the
    /// buffer is dropped after each draw and re-read from the card.
    pub cache: bool,
    /// Load during setup instead of on first use.
    pub preload: bool,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            width: 0,
            height: 0,
            format: PixelFormat::Rgb565,
            byte_order: ByteOrder::BigEndian,
            transparency: Transparency::Opaque,
            invert_alpha: false,
            cache: true,
            preload: false,
        }
    }
}

pub struct SdImage<'c, C: SdCard> {
    card: &'c C,
    config: ImageConfig,
    data: Option<Vec<u8>>,
    // Actual properties after load; stub decoders override the configured
    // dimensions and format with what the container header says.
    width: u32,
    height: u32,
    format: PixelFormat,
    failed: bool,
}

impl<'c, C: SdCard> SdImage<'c, C> {
    pub fn new(card: &'c C, config: ImageConfig) -> Self {
        let (width, height, format) = (config.width, config.height, config.format);
        Self {
            card,
            config,
            data: None,
            width,
            height,
            format,
            failed: false,
        }
    }

    pub fn config(&self) -> &ImageConfig {
        &self.config
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn stride(&self) -> usize {
        self.format.stride(self.width)
    }

    pub fn loaded(&self) -> bool {
        self.data.is_some()
    }

    pub fn failed(&self) -> bool {
        self.failed
    }

    // Component lifecycle

    pub fn setup(&mut self) {
        if !is_valid_path(&self.config.path) {
            warn!("invalid image path: '{}'", self.config.path);
            self.failed = true;
            return;
        }
        if self.config.width == 0 || self.config.height == 0 {
            warn!(
                "invalid image dimensions {}x{} for {}",
                self.config.width, self.config.height, self.config.path
            );
            self.failed = true;
            return;
        }
        if self.config.preload {
            if let Err(err) = self.load() {
                warn!("preload of {} failed: {:?}", self.config.path, err);
            }
        }
    }

    pub fn dump_config(&self) {
        info!("SD Image:");
        info!("  Path: {}", self.config.path);
        info!("  Dimensions: {}x{}", self.config.width, self.config.height);
        info!("  Format: {}", self.config.format.as_str());
        if self.config.format == PixelFormat::Rgb565 {
            info!("  Byte order: {}", self.config.byte_order.as_str());
        }
        info!("  Cache: {}, preload: {}", self.config.cache, self.config.preload);
    }

    // Actions

    /// Read and decode the image. A no-op when already resident.
    pub fn load(&mut self) -> Result<(), ImageError> {
        if self.data.is_some() {
            return Ok(());
        }
        if !self.card.is_ready() {
            warn!("SD card not ready, cannot load {}", self.config.path);
            return Err(ImageError::Io);
        }
        let raw = self.read_bytes()?;
        let decoded = match decode::detect(&raw) {
            Container::Png => decode::decode_png(&raw)?,
            Container::Jpeg => decode::decode_jpeg(&raw)?,
            Container::Raw => decode::load_raw(
                raw,
                self.config.width,
                self.config.height,
                self.config.format,
            )?,
        };
        self.width = decoded.width;
        self.height = decoded.height;
        self.format = decoded.format;
        let mut data = decoded.data;
        // Canonicalize RGB565 to big-endian once, at load time.
        if self.format == PixelFormat::Rgb565 && self.config.byte_order == ByteOrder::LittleEndian {
            pixel::convert_byte_order(&mut data);
        }
        if self.config.invert_alpha {
            pixel::invert(&mut data, self.format);
        }
        debug!(
            "loaded {} ({}x{} {}, {} bytes)",
            self.config.path,
            self.width,
            self.height,
            self.format.as_str(),
            data.len()
        );
        self.data = Some(data);
        Ok(())
    }

    /// Drop the in-RAM buffer; the next draw re-reads the card.
    pub fn unload(&mut self) {
        if self.data.take().is_some() {
            debug!("unloaded {}", self.config.path);
        }
    }

    pub fn reload(&mut self) -> Result<(), ImageError> {
        self.unload();
        self.load()
    }

    // Pixel access

    /// Pixel at `(x, y)` with transparency applied. Out-of-bounds reads and
    /// reads of an unloaded image return transparent black.
    pub fn get_pixel(&self, x: u32, y: u32) -> Rgba {
        let Some(data) = self.data.as_ref() else {
            return Rgba::TRANSPARENT;
        };
        if x >= self.width || y >= self.height {
            return Rgba::TRANSPARENT;
        }
        let px = pixel::get_pixel(data, x, y, self.width, self.format, ByteOrder::BigEndian);
        self.apply_transparency(px)
    }

    /// Draw at `origin` by pushing every visible pixel at the target, the
    /// way the host display API expects. Pixels with alpha below 0x80 are
    /// skipped. A load failure is logged and the draw becomes a no-op.
    pub fn draw<D>(&mut self, origin: Point, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb888>,
    {
        if let Err(err) = self.load() {
            warn!("cannot draw {}: {:?}", self.config.path, err);
            return Ok(());
        }
        let (width, height) = (self.width, self.height);
        let pixels = (0..height).flat_map(|y| (0..width).map(move |x| (x, y)));
        let this = &*self;
        target.draw_iter(pixels.filter_map(|(x, y)| {
            let px = this.get_pixel(x, y);
            if px.a < 0x80 {
                return None;
            }
            let point = origin + Point::new(x as i32, y as i32);
            Some(Pixel(point, Rgb888::new(px.r, px.g, px.b)))
        }))?;
        if !self.config.cache {
            self.unload();
        }
        Ok(())
    }

    fn apply_transparency(&self, px: Rgba) -> Rgba {
        match self.config.transparency {
            Transparency::Opaque => px,
            Transparency::ChromaKey => {
                let transparent = match self.format {
                    // Off pixels decode to opaque black.
                    PixelFormat::Binary => px == Rgba::BLACK,
                    PixelFormat::Gray8 => px.r == 1 && px.g == 1 && px.b == 1,
                    PixelFormat::Rgb888 | PixelFormat::Rgba8888 => {
                        px.r == 0 && px.g == 1 && px.b == 0
                    }
                    // Raw word 0x0020 expands to (0, 4, 0).
                    PixelFormat::Rgb565 => px.r == 0 && px.g == 4 && px.b == 0,
                };
                if transparent { Rgba::TRANSPARENT } else { px }
            }
            Transparency::AlphaChannel => match self.format {
                PixelFormat::Gray8 => Rgba::new(0, 0, 0, px.r),
                _ => px,
            },
        }
    }

    fn read_bytes(&self) -> Result<Vec<u8>, ImageError> {
        use crate::sd::{File, Mode};
        use embedded_io::Read;

        let path = normalize_path(&self.config.path);
        match self.card.exists(&path) {
            Ok(true) => {}
            Ok(false) => {
                warn!("image file not found: {}", path);
                return Err(ImageError::Io);
            }
            Err(err) => {
                warn!("stat failed for {}: {:?}", path, err);
                return Err(ImageError::Io);
            }
        }
        let mut file = self.card.open(&path, Mode::Read).map_err(|err| {
            warn!("open failed for {}: {:?}", path, err);
            ImageError::Io
        })?;
        let mut data = alloc::vec![0u8; file.size()];
        file.read_exact(&mut data).map_err(|err| {
            warn!("read failed for {}: {:?}", path, err);
            ImageError::Io
        })?;
        Ok(data)
    }
}
