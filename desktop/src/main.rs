use std::time::Instant;

use embedded_graphics::prelude::Point;

use sdgfx_core::component::Component;
use sdgfx_core::pixel::{ByteOrder, PixelFormat};
use sdgfx_core::sd_image::{ImageConfig, SdImage, Transparency};
use sdgfx_core::storage::Storage;

use crate::sd::DirSdCard;

mod display;
mod sd;

fn usage() -> ! {
    eprintln!(
        "Usage:\n  sdgfx-desktop <sd-root-dir> <image-path> [--size WxH] [--format binary|grayscale|rgb565|rgb888|rgba] [--byte-order big_endian|little_endian] [--transparency opaque|chroma_key|alpha_channel] [--invert-alpha] [--no-cache] [--preload]\n\nDefaults: --size 320x240 --format rgb565 --byte-order big_endian"
    );
    std::process::exit(2);
}

fn parse_size(value: &str) -> Option<(u32, u32)> {
    let (w, h) = value.split_once('x')?;
    Some((w.parse().ok()?, h.parse().ok()?))
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let root = args.next().unwrap_or_default();
    let path = args.next().unwrap_or_default();
    if root.is_empty() || path.is_empty() {
        usage();
    }

    let mut config = ImageConfig {
        path,
        width: 320,
        height: 240,
        preload: true,
        ..ImageConfig::default()
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--size" => {
                let value = args.next().unwrap_or_default();
                match parse_size(&value) {
                    Some((w, h)) => {
                        config.width = w;
                        config.height = h;
                    }
                    None => usage(),
                }
            }
            "--format" => {
                let value = args.next().unwrap_or_default();
                config.format = match value.parse::<PixelFormat>() {
                    Ok(format) => format,
                    Err(_) => usage(),
                };
            }
            "--byte-order" => {
                let value = args.next().unwrap_or_default();
                config.byte_order = match value.parse::<ByteOrder>() {
                    Ok(order) => order,
                    Err(_) => usage(),
                };
            }
            "--transparency" => {
                config.transparency = match args.next().unwrap_or_default().as_str() {
                    "opaque" => Transparency::Opaque,
                    "chroma_key" => Transparency::ChromaKey,
                    "alpha_channel" => Transparency::AlphaChannel,
                    _ => usage(),
                };
            }
            "--invert-alpha" => config.invert_alpha = true,
            "--no-cache" => config.cache = false,
            "--preload" => config.preload = true,
            _ => usage(),
        }
    }

    log::info!("sdgfx desktop host started, mounting {}", root);

    let card = DirSdCard::new(&root);
    let mut storage = Storage::new(&card);
    storage.add_file(&config.path, 2048);
    storage.setup();
    storage.dump_config();
    if storage.is_failed() {
        log::error!("{} is not a directory", root);
        std::process::exit(1);
    }

    let mut image = SdImage::new(&card, config);
    Component::setup(&mut image);
    image.dump_config();
    if image.failed() {
        std::process::exit(1);
    }

    // PNG/JPEG headers override the configured dimensions, so size the
    // window after the image is resident.
    let (width, height) = if image.loaded() {
        (image.width() as usize, image.height() as usize)
    } else {
        (image.config().width as usize, image.config().height as usize)
    };

    let mut display = match display::WindowDisplay::new("sdgfx desktop", width, height) {
        Ok(display) => display,
        Err(err) => {
            log::error!("unable to open window: {}", err);
            std::process::exit(1);
        }
    };

    let started = Instant::now();
    while display.is_open() {
        storage.tick(started.elapsed().as_millis() as u32);
        display.clear(0xFF000000);
        if let Err(err) = image.draw(Point::zero(), &mut display) {
            log::error!("draw failed: {:?}", err);
            break;
        }
        if display.present().is_err() {
            break;
        }
    }
}
