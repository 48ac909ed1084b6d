use std::cell::RefCell;
use std::collections::BTreeMap;

use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::{DrawTarget, OriginDimensions, Point, Size};
use embedded_graphics::Pixel;

use crate::actions::{FileExistsAction, ReadFileAction, StreamFileAction};
use crate::decode::{self, Container, ImageError};
use crate::pixel::{self, ByteOrder, PixelFormat, Rgba};
use crate::sd::{Mode, SdCard};
use crate::sd_image::{ImageConfig, SdImage, Transparency};
use crate::storage::{self, Storage, StorageError};

// In-memory SD card fixture

#[derive(Debug)]
struct MemError;

impl embedded_io::Error for MemError {
    fn kind(&self) -> embedded_io::ErrorKind {
        embedded_io::ErrorKind::Other
    }
}

struct MemCard {
    ready: bool,
    files: RefCell<BTreeMap<String, Vec<u8>>>,
}

impl MemCard {
    fn new() -> Self {
        Self {
            ready: true,
            files: RefCell::new(BTreeMap::new()),
        }
    }

    fn with_file(path: &str, data: &[u8]) -> Self {
        let card = Self::new();
        card.insert(path, data);
        card
    }

    fn insert(&self, path: &str, data: &[u8]) {
        self.files.borrow_mut().insert(path.to_string(), data.to_vec());
    }
}

struct MemFile<'a> {
    card: &'a MemCard,
    path: String,
    data: Vec<u8>,
    pos: usize,
    dirty: bool,
}

impl embedded_io::ErrorType for MemCard {
    type Error = MemError;
}

impl embedded_io::ErrorType for MemFile<'_> {
    type Error = MemError;
}

impl embedded_io::Read for MemFile<'_> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, MemError> {
        let available = self.data.len().saturating_sub(self.pos);
        let n = buf.len().min(available);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

impl embedded_io::Write for MemFile<'_> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, MemError> {
        let end = self.pos + buf.len();
        if self.data.len() < end {
            self.data.resize(end, 0);
        }
        self.data[self.pos..end].copy_from_slice(buf);
        self.pos = end;
        self.dirty = true;
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), MemError> {
        if self.dirty {
            self.card
                .files
                .borrow_mut()
                .insert(self.path.clone(), self.data.clone());
            self.dirty = false;
        }
        Ok(())
    }
}

impl embedded_io::Seek for MemFile<'_> {
    fn seek(&mut self, pos: embedded_io::SeekFrom) -> Result<u64, MemError> {
        use embedded_io::SeekFrom;
        let next = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::Current(offset) => self.pos as i64 + offset,
            SeekFrom::End(offset) => self.data.len() as i64 + offset,
        };
        if next < 0 {
            return Err(MemError);
        }
        self.pos = next as usize;
        Ok(self.pos as u64)
    }
}

impl crate::sd::File for MemFile<'_> {
    fn size(&self) -> usize {
        self.data.len()
    }
}

impl SdCard for MemCard {
    type File<'a>
        = MemFile<'a>
    where
        Self: 'a;

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn mount_path(&self) -> &str {
        "/sd"
    }

    fn open(&self, path: &str, mode: Mode) -> Result<MemFile<'_>, MemError> {
        let data = match mode {
            Mode::Write => Vec::new(),
            Mode::Read | Mode::ReadWrite => self
                .files
                .borrow()
                .get(path)
                .cloned()
                .ok_or(MemError)?,
        };
        Ok(MemFile {
            card: self,
            path: path.to_string(),
            data,
            pos: 0,
            dirty: false,
        })
    }

    fn exists(&self, path: &str) -> Result<bool, MemError> {
        Ok(self.files.borrow().contains_key(path))
    }

    fn size(&self, path: &str) -> Result<usize, MemError> {
        self.files.borrow().get(path).map(Vec::len).ok_or(MemError)
    }
}

// Capture draw output

struct Frame {
    width: u32,
    height: u32,
    pixels: BTreeMap<(i32, i32), Rgb888>,
}

impl Frame {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: BTreeMap::new(),
        }
    }
}

impl OriginDimensions for Frame {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for Frame {
    type Color = Rgb888;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.pixels.insert((point.x, point.y), color);
        }
        Ok(())
    }
}

// Pixel math

#[test]
fn rgb565_rgb888_round_trip() {
    let mut buf = [0u8; 2];
    for r5 in 0..32u16 {
        for g6 in [0u16, 1, 21, 42, 63] {
            let word = (r5 << 11) | (g6 << 5) | (31 - r5);
            buf.copy_from_slice(&word.to_be_bytes());
            let px = pixel::get_pixel(&buf, 0, 0, 1, PixelFormat::Rgb565, ByteOrder::BigEndian);
            let mut back = [0u8; 2];
            pixel::set_pixel(
                &mut back,
                0,
                0,
                1,
                PixelFormat::Rgb565,
                ByteOrder::BigEndian,
                px,
            );
            assert_eq!(back, buf, "word {:04x} did not survive the round trip", word);
        }
    }
}

#[test]
fn rgb565_little_endian_read() {
    // 0xF800 = pure red.
    let buf = [0x00, 0xF8];
    let px = pixel::get_pixel(&buf, 0, 0, 1, PixelFormat::Rgb565, ByteOrder::LittleEndian);
    assert_eq!(px, Rgba::new(0xFF, 0, 0, 0xFF));
}

#[test]
fn binary_bit_packing_is_continuous() {
    // 10 pixels per row; bit 9 and bit 10 sit next to each other in byte 1
    // because rows are not padded.
    let width = 10;
    let mut buf = vec![0u8; PixelFormat::Binary.buffer_len(width, 3)];
    pixel::set_pixel(&mut buf, 9, 0, width, PixelFormat::Binary, ByteOrder::BigEndian, Rgba::WHITE);
    pixel::set_pixel(&mut buf, 0, 1, width, PixelFormat::Binary, ByteOrder::BigEndian, Rgba::WHITE);
    assert_eq!(buf[0], 0x00);
    assert_eq!(buf[1], 0b0110_0000);
    let on = pixel::get_pixel(&buf, 9, 0, width, PixelFormat::Binary, ByteOrder::BigEndian);
    let also_on = pixel::get_pixel(&buf, 0, 1, width, PixelFormat::Binary, ByteOrder::BigEndian);
    let off = pixel::get_pixel(&buf, 1, 1, width, PixelFormat::Binary, ByteOrder::BigEndian);
    assert_eq!(on, Rgba::WHITE);
    assert_eq!(also_on, Rgba::WHITE);
    assert_eq!(off, Rgba::BLACK);
}

#[test]
fn binary_buffer_len_has_no_row_padding() {
    assert_eq!(PixelFormat::Binary.buffer_len(10, 3), 4); // 30 bits
    assert_eq!(PixelFormat::Binary.buffer_len(8, 3), 3);
    assert_eq!(PixelFormat::Binary.buffer_len(1, 1), 1);
}

#[test]
fn byte_swap_is_an_involution() {
    let original: Vec<u8> = (0u8..32).collect();
    let mut buf = original.clone();
    pixel::convert_byte_order(&mut buf);
    assert_ne!(buf, original);
    assert_eq!(buf[0], 1);
    assert_eq!(buf[1], 0);
    pixel::convert_byte_order(&mut buf);
    assert_eq!(buf, original);
}

#[test]
fn convert_gray_to_rgb888_replicates_channels() {
    let src = [0x00, 0x7F, 0xFF, 0x10];
    let out = pixel::convert_pixel_format(
        &src,
        4,
        1,
        PixelFormat::Gray8,
        ByteOrder::BigEndian,
        PixelFormat::Rgb888,
        ByteOrder::BigEndian,
    );
    assert_eq!(out, [0, 0, 0, 0x7F, 0x7F, 0x7F, 0xFF, 0xFF, 0xFF, 0x10, 0x10, 0x10]);
}

#[test]
fn convert_rgb_to_binary_thresholds_on_luma() {
    let mut src = vec![0u8; PixelFormat::Rgb888.buffer_len(8, 1)];
    // First four pixels white, rest stay black.
    for px in 0..4 {
        src[px * 3..px * 3 + 3].copy_from_slice(&[0xFF, 0xFF, 0xFF]);
    }
    let out = pixel::convert_pixel_format(
        &src,
        8,
        1,
        PixelFormat::Rgb888,
        ByteOrder::BigEndian,
        PixelFormat::Binary,
        ByteOrder::BigEndian,
    );
    assert_eq!(out, [0b1111_0000]);
}

#[test]
fn invert_touches_only_the_alpha_of_rgba() {
    let mut rgba = vec![0x10, 0x20, 0x30, 0x00, 0x40, 0x50, 0x60, 0xFF];
    pixel::invert(&mut rgba, PixelFormat::Rgba8888);
    assert_eq!(rgba, [0x10, 0x20, 0x30, 0xFF, 0x40, 0x50, 0x60, 0x00]);

    let mut gray = vec![0x00, 0xFF, 0x80];
    pixel::invert(&mut gray, PixelFormat::Gray8);
    assert_eq!(gray, [0xFF, 0x00, 0x7F]);

    let mut rgb = vec![1, 2, 3];
    pixel::invert(&mut rgb, PixelFormat::Rgb888);
    assert_eq!(rgb, [1, 2, 3]);
}

#[test]
fn pixel_format_strings_parse() {
    assert_eq!("RGB565".parse(), Ok(PixelFormat::Rgb565));
    assert_eq!("grayscale".parse(), Ok(PixelFormat::Gray8));
    assert_eq!("Binary".parse(), Ok(PixelFormat::Binary));
    assert_eq!("rgba".parse(), Ok(PixelFormat::Rgba8888));
    assert_eq!("rgb888".parse(), Ok(PixelFormat::Rgb888));
    assert!("bmp".parse::<PixelFormat>().is_err());
    assert_eq!("LITTLE_ENDIAN".parse(), Ok(ByteOrder::LittleEndian));
    assert_eq!("big_endian".parse(), Ok(ByteOrder::BigEndian));
}

// Path handling

#[test]
fn path_normalization() {
    assert_eq!(storage::normalize_path("images//logo.raw"), "/images/logo.raw");
    assert_eq!(storage::normalize_path("/a/./b/"), "/a/b");
    assert_eq!(storage::normalize_path("a"), "/a");
    assert_eq!(storage::normalize_path("/"), "/");
}

#[test]
fn path_validation() {
    assert!(storage::is_valid_path("/images/logo.raw"));
    assert!(storage::is_valid_path("logo.raw"));
    assert!(!storage::is_valid_path(""));
    assert!(!storage::is_valid_path("/a/../b"));
    assert!(!storage::is_valid_path("a\0b"));
}

// Container detection and stub decoders

fn png_header(width: u32, height: u32) -> Vec<u8> {
    let mut data = decode::PNG_SIGNATURE.to_vec();
    data.extend_from_slice(&13u32.to_be_bytes());
    data.extend_from_slice(b"IHDR");
    data.extend_from_slice(&width.to_be_bytes());
    data.extend_from_slice(&height.to_be_bytes());
    data.extend_from_slice(&[8, 2, 0, 0, 0]); // depth, color, the rest
    data
}

fn jpeg_header(width: u16, height: u16) -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8];
    // APP0 segment the parser has to skip by length.
    data.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x10]);
    data.extend_from_slice(&[0u8; 14]);
    // SOF0: length, precision, height, width.
    data.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x11, 0x08]);
    data.extend_from_slice(&height.to_be_bytes());
    data.extend_from_slice(&width.to_be_bytes());
    data
}

#[test]
fn container_detection() {
    assert_eq!(decode::detect(&png_header(1, 1)), Container::Png);
    assert_eq!(decode::detect(&jpeg_header(1, 1)), Container::Jpeg);
    assert_eq!(decode::detect(&[0u8; 16]), Container::Raw);
    assert_eq!(decode::detect(&[]), Container::Raw);
}

#[test]
fn png_dimension_parsing() {
    assert_eq!(decode::png_dimensions(&png_header(320, 240)), Ok((320, 240)));
    assert_eq!(
        decode::png_dimensions(&decode::PNG_SIGNATURE),
        Err(ImageError::Decode)
    );
    assert_eq!(
        decode::png_dimensions(&png_header(0, 240)),
        Err(ImageError::InvalidDimensions)
    );
}

#[test]
fn jpeg_dimension_parsing() {
    assert_eq!(decode::jpeg_dimensions(&jpeg_header(320, 240)), Ok((320, 240)));
    // Truncated right after the APP0 segment.
    let truncated = &jpeg_header(320, 240)[..20];
    assert_eq!(decode::jpeg_dimensions(truncated), Err(ImageError::Decode));
}

#[test]
fn stub_decoders_honor_header_dimensions() {
    let png = decode::decode_png(&png_header(16, 8)).unwrap();
    assert_eq!((png.width, png.height), (16, 8));
    assert_eq!(png.format, PixelFormat::Rgb888);
    assert_eq!(png.data.len(), 16 * 8 * 3);

    let jpeg = decode::decode_jpeg(&jpeg_header(16, 8)).unwrap();
    assert_eq!((jpeg.width, jpeg.height), (16, 8));
    assert_eq!(jpeg.data.len(), 16 * 8 * 3);
    // Gradient: red channel grows along x.
    assert!(jpeg.data[15 * 3] > jpeg.data[0]);
}

#[test]
fn raw_loads_validate_size() {
    let ok = decode::load_raw(vec![0u8; 32], 4, 4, PixelFormat::Rgb565);
    assert!(ok.is_ok());
    let err = decode::load_raw(vec![0u8; 31], 4, 4, PixelFormat::Rgb565);
    assert_eq!(
        err.unwrap_err(),
        ImageError::SizeMismatch {
            expected: 32,
            actual: 31
        }
    );
    assert_eq!(
        decode::load_raw(vec![], 0, 4, PixelFormat::Gray8).unwrap_err(),
        ImageError::InvalidDimensions
    );
}

// Storage component

#[test]
fn cached_reads_count_hits_and_misses() {
    let card = MemCard::with_file("/a.bin", &[1, 2, 3, 4]);
    let mut storage = Storage::new(&card);
    storage.setup();
    assert!(!storage.is_failed());

    assert_eq!(storage.read_file("a.bin").unwrap(), vec![1, 2, 3, 4]);
    assert_eq!(storage.read_file("/a.bin").unwrap(), vec![1, 2, 3, 4]);
    assert_eq!(storage.cache_misses(), 1);
    assert_eq!(storage.cache_hits(), 1);
    assert_eq!(storage.cache_usage(), 4);
}

#[test]
fn lru_eviction_under_capacity_pressure() {
    let card = MemCard::new();
    card.insert("/a", &[0; 4]);
    card.insert("/b", &[0; 4]);
    card.insert("/c", &[0; 4]);
    let mut storage = Storage::new(&card);
    storage.set_cache_size(8);

    storage.tick(1);
    storage.read_file("/a").unwrap();
    storage.tick(2);
    storage.read_file("/b").unwrap();
    storage.tick(3);
    storage.read_file("/a").unwrap(); // refresh a; b is now the oldest
    storage.tick(4);
    storage.read_file("/c").unwrap(); // evicts b

    assert_eq!(storage.cache_usage(), 8);
    assert_eq!(storage.cache_hits(), 1);
    assert_eq!(storage.cache_misses(), 3);
    storage.read_file("/b").unwrap();
    assert_eq!(storage.cache_misses(), 4);
}

#[test]
fn oversized_entries_are_not_cached() {
    let card = MemCard::with_file("/big", &[0; 64]);
    let mut storage = Storage::new(&card);
    storage.set_cache_size(16);
    storage.read_file("/big").unwrap();
    assert_eq!(storage.cache_usage(), 0);
    storage.read_file("/big").unwrap();
    assert_eq!(storage.cache_misses(), 2);
}

#[test]
fn zero_cache_size_always_reads_direct() {
    let card = MemCard::with_file("/a", &[9; 8]);
    let mut storage = Storage::new(&card);
    storage.set_cache_size(0);
    storage.read_file("/a").unwrap();
    storage.read_file("/a").unwrap();
    assert_eq!(storage.cache_hits(), 0);
    assert_eq!(storage.cache_misses(), 0);
    assert_eq!(storage.direct_reads(), 2);
}

#[test]
fn missing_files_and_bad_paths_error() {
    let card = MemCard::new();
    let mut storage = Storage::new(&card);
    assert_eq!(storage.read_file("/nope"), Err(StorageError::NotFound));
    assert_eq!(storage.read_file("/../etc"), Err(StorageError::InvalidPath));
    assert_eq!(storage.read_file(""), Err(StorageError::InvalidPath));
    assert!(!storage.file_exists_direct("/nope"));
}

#[test]
fn setup_fails_without_a_ready_card() {
    let mut card = MemCard::new();
    card.ready = false;
    let mut storage = Storage::new(&card);
    storage.setup();
    assert!(storage.is_failed());
    assert_eq!(storage.read_file("/a"), Err(StorageError::SdUnavailable));
}

#[test]
fn streaming_respects_chunk_size() {
    let card = MemCard::with_file("/audio.pcm", &[7u8; 10]);
    let mut storage = Storage::new(&card);
    let mut chunks = Vec::new();
    let total = storage
        .stream_file_chunked("/audio.pcm", 4, &mut |chunk| chunks.push(chunk.len()))
        .unwrap();
    assert_eq!(total, 10);
    assert_eq!(chunks, vec![4, 4, 2]);
}

#[test]
fn streaming_uses_configured_chunk_size() {
    let card = MemCard::with_file("/audio.pcm", &[7u8; 10]);
    let mut storage = Storage::new(&card);
    storage.add_file_with_id("audio", "/audio.pcm", 3);
    let mut chunks = Vec::new();
    storage
        .stream_file("/audio.pcm", &mut |chunk| chunks.push(chunk.len()))
        .unwrap();
    assert_eq!(chunks, vec![3, 3, 3, 1]);
}

#[test]
fn zero_byte_files_stream_empty() {
    let card = MemCard::with_file("/empty", &[]);
    let mut storage = Storage::new(&card);
    let mut called = false;
    let total = storage
        .stream_file("/empty", &mut |_| called = true)
        .unwrap();
    assert_eq!(total, 0);
    assert!(!called);
    assert_eq!(storage.read_file("/empty").unwrap(), Vec::<u8>::new());
}

#[test]
fn writes_land_on_the_card_and_invalidate_the_cache() {
    let card = MemCard::with_file("/cfg", &[1]);
    let mut storage = Storage::new(&card);
    assert_eq!(storage.read_file("/cfg").unwrap(), vec![1]);
    storage.write_file_direct("/cfg", &[2, 3]).unwrap();
    assert_eq!(storage.read_file("/cfg").unwrap(), vec![2, 3]);
    assert_eq!(storage.file_size_direct("/cfg").unwrap(), 2);
}

// SD image component

fn gray_4x4() -> Vec<u8> {
    (0u8..16).map(|v| v * 16).collect()
}

#[test]
fn raw_image_loads_and_reads_pixels() {
    let card = MemCard::with_file("/img/g.raw", &gray_4x4());
    let mut image = SdImage::new(
        &card,
        ImageConfig {
            path: "img/g.raw".into(),
            width: 4,
            height: 4,
            format: PixelFormat::Gray8,
            ..ImageConfig::default()
        },
    );
    image.setup();
    assert!(!image.failed());
    image.load().unwrap();
    assert!(image.loaded());
    assert_eq!(image.get_pixel(0, 0), Rgba::new(0, 0, 0, 0xFF));
    assert_eq!(image.get_pixel(3, 3), Rgba::new(240, 240, 240, 0xFF));
    // Out of bounds reads come back transparent.
    assert_eq!(image.get_pixel(4, 0), Rgba::TRANSPARENT);
    assert_eq!(image.stride(), 4);
}

#[test]
fn raw_size_mismatch_is_rejected() {
    let card = MemCard::with_file("/img/short.raw", &[0u8; 15]);
    let mut image = SdImage::new(
        &card,
        ImageConfig {
            path: "/img/short.raw".into(),
            width: 4,
            height: 4,
            format: PixelFormat::Gray8,
            ..ImageConfig::default()
        },
    );
    assert_eq!(
        image.load().unwrap_err(),
        ImageError::SizeMismatch {
            expected: 16,
            actual: 15
        }
    );
}

#[test]
fn little_endian_rgb565_is_normalized_at_load() {
    // One red pixel (0xF800) stored little-endian.
    let card = MemCard::with_file("/img/red.raw", &[0x00, 0xF8]);
    let mut image = SdImage::new(
        &card,
        ImageConfig {
            path: "/img/red.raw".into(),
            width: 1,
            height: 1,
            format: PixelFormat::Rgb565,
            byte_order: ByteOrder::LittleEndian,
            ..ImageConfig::default()
        },
    );
    image.load().unwrap();
    assert_eq!(image.get_pixel(0, 0), Rgba::new(0xFF, 0, 0, 0xFF));
}

#[test]
fn invert_alpha_inverts_grayscale() {
    let card = MemCard::with_file("/img/g.raw", &[0x00]);
    let mut image = SdImage::new(
        &card,
        ImageConfig {
            path: "/img/g.raw".into(),
            width: 1,
            height: 1,
            format: PixelFormat::Gray8,
            invert_alpha: true,
            ..ImageConfig::default()
        },
    );
    image.load().unwrap();
    assert_eq!(image.get_pixel(0, 0), Rgba::WHITE);
}

#[test]
fn chroma_key_masks_the_reserved_color() {
    let card = MemCard::with_file("/img/g.raw", &[0x01, 0x02]);
    let mut image = SdImage::new(
        &card,
        ImageConfig {
            path: "/img/g.raw".into(),
            width: 2,
            height: 1,
            format: PixelFormat::Gray8,
            transparency: Transparency::ChromaKey,
            ..ImageConfig::default()
        },
    );
    image.load().unwrap();
    assert_eq!(image.get_pixel(0, 0), Rgba::TRANSPARENT);
    assert_eq!(image.get_pixel(1, 0), Rgba::new(2, 2, 2, 0xFF));
}

#[test]
fn alpha_channel_grayscale_is_an_alpha_mask() {
    let card = MemCard::with_file("/img/mask.raw", &[0x00, 0xC0]);
    let mut image = SdImage::new(
        &card,
        ImageConfig {
            path: "/img/mask.raw".into(),
            width: 2,
            height: 1,
            format: PixelFormat::Gray8,
            transparency: Transparency::AlphaChannel,
            ..ImageConfig::default()
        },
    );
    image.load().unwrap();
    assert_eq!(image.get_pixel(0, 0), Rgba::new(0, 0, 0, 0x00));
    assert_eq!(image.get_pixel(1, 0), Rgba::new(0, 0, 0, 0xC0));
}

#[test]
fn setup_flags_invalid_dimensions() {
    let card = MemCard::new();
    let mut image = SdImage::new(
        &card,
        ImageConfig {
            path: "/img/x.raw".into(),
            width: 0,
            height: 4,
            format: PixelFormat::Gray8,
            ..ImageConfig::default()
        },
    );
    image.setup();
    assert!(image.failed());
}

#[test]
fn draw_skips_transparent_pixels() {
    let card = MemCard::with_file("/img/g.raw", &[0x01, 0x80, 0x01, 0xFF]);
    let mut image = SdImage::new(
        &card,
        ImageConfig {
            path: "/img/g.raw".into(),
            width: 2,
            height: 2,
            format: PixelFormat::Gray8,
            transparency: Transparency::ChromaKey,
            ..ImageConfig::default()
        },
    );
    let mut frame = Frame::new(4, 4);
    image.draw(Point::new(1, 1), &mut frame).unwrap();
    assert_eq!(frame.pixels.len(), 2);
    assert_eq!(
        frame.pixels.get(&(2, 1)),
        Some(&Rgb888::new(0x80, 0x80, 0x80))
    );
    assert_eq!(frame.pixels.get(&(2, 2)), Some(&Rgb888::new(0xFF, 0xFF, 0xFF)));
}

#[test]
fn uncached_images_are_dropped_after_draw() {
    let card = MemCard::with_file("/img/g.raw", &[0x40]);
    let mut image = SdImage::new(
        &card,
        ImageConfig {
            path: "/img/g.raw".into(),
            width: 1,
            height: 1,
            format: PixelFormat::Gray8,
            cache: false,
            ..ImageConfig::default()
        },
    );
    let mut frame = Frame::new(1, 1);
    image.draw(Point::zero(), &mut frame).unwrap();
    assert_eq!(frame.pixels.len(), 1);
    assert!(!image.loaded());
}

#[test]
fn png_files_decode_to_the_stub_pattern() {
    let card = MemCard::with_file("/img/p.png", &png_header(8, 8));
    let mut image = SdImage::new(
        &card,
        ImageConfig {
            path: "/img/p.png".into(),
            width: 4, // header wins over configured dimensions
            height: 4,
            format: PixelFormat::Gray8,
            ..ImageConfig::default()
        },
    );
    image.load().unwrap();
    assert_eq!((image.width(), image.height()), (8, 8));
    assert_eq!(image.format(), PixelFormat::Rgb888);
}

#[test]
fn unload_and_reload_round_trip() {
    let card = MemCard::with_file("/img/g.raw", &[0x11]);
    let mut image = SdImage::new(
        &card,
        ImageConfig {
            path: "/img/g.raw".into(),
            width: 1,
            height: 1,
            format: PixelFormat::Gray8,
            ..ImageConfig::default()
        },
    );
    image.load().unwrap();
    image.unload();
    assert!(!image.loaded());
    assert_eq!(image.get_pixel(0, 0), Rgba::TRANSPARENT);
    image.reload().unwrap();
    assert_eq!(image.get_pixel(0, 0), Rgba::new(0x11, 0x11, 0x11, 0xFF));
}

// Actions

#[test]
fn read_file_action_truncates_to_max_size() {
    let card = MemCard::with_file("/data.bin", &[1, 2, 3, 4, 5]);
    let mut storage = Storage::new(&card);
    let action = ReadFileAction {
        file_path: "/data.bin".into(),
        max_size: 3,
    };
    assert_eq!(action.play(&mut storage).unwrap(), vec![1, 2, 3]);
    let unlimited = ReadFileAction {
        file_path: "/data.bin".into(),
        max_size: 0,
    };
    assert_eq!(unlimited.play(&mut storage).unwrap().len(), 5);
}

#[test]
fn stream_file_action_overrides_chunk_size() {
    let card = MemCard::with_file("/data.bin", &[0u8; 6]);
    let mut storage = Storage::new(&card);
    let action = StreamFileAction {
        file_path: "/data.bin".into(),
        chunk_size: 4,
    };
    let mut chunks = Vec::new();
    action
        .play(&mut storage, &mut |chunk| chunks.push(chunk.len()))
        .unwrap();
    assert_eq!(chunks, vec![4, 2]);
}

#[test]
fn file_exists_action() {
    let card = MemCard::with_file("/here", &[0]);
    let storage = Storage::new(&card);
    assert!(FileExistsAction { file_path: "/here".into() }.play(&storage));
    assert!(!FileExistsAction { file_path: "/gone".into() }.play(&storage));
}
