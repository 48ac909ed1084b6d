use std::env;
use std::path::Path;

use sdgfx_image::{ConvertOptions, DitherMode};

fn usage() -> ! {
    eprintln!(
        "Usage:\n  sdgfx-image convert <input> <output> [--format binary|grayscale|rgb565|rgb888|rgba] [--byte-order big_endian|little_endian] [--size WxH] [--dither bayer|none] [--invert]\n\nDefaults: --format rgb565 --byte-order big_endian --dither none"
    );
    std::process::exit(2);
}

fn parse_size(value: &str) -> Option<(u32, u32)> {
    let (w, h) = value.split_once('x')?;
    let w = w.parse().ok()?;
    let h = h.parse().ok()?;
    Some((w, h))
}

fn main() {
    let mut args = env::args().skip(1);
    let cmd = args.next().unwrap_or_default();
    if cmd != "convert" {
        usage();
    }

    let input = args.next().unwrap_or_default();
    let output = args.next().unwrap_or_default();
    if input.is_empty() || output.is_empty() {
        usage();
    }

    let mut options = ConvertOptions::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--format" => {
                let value = args.next().unwrap_or_default();
                options.format = match value.parse() {
                    Ok(format) => format,
                    Err(_) => usage(),
                };
            }
            "--byte-order" => {
                let value = args.next().unwrap_or_default();
                options.byte_order = match value.parse() {
                    Ok(order) => order,
                    Err(_) => usage(),
                };
            }
            "--size" => {
                let value = args.next().unwrap_or_default();
                if let Some((w, h)) = parse_size(&value) {
                    options.size = Some((w, h));
                } else {
                    usage();
                }
            }
            "--dither" => {
                let value = args.next().unwrap_or_default();
                options.dither = match value.as_str() {
                    "bayer" => DitherMode::Bayer,
                    "none" => DitherMode::None,
                    _ => usage(),
                };
            }
            "--invert" => options.invert = true,
            _ => usage(),
        }
    }

    let data = match std::fs::read(Path::new(&input)) {
        Ok(data) => data,
        Err(err) => {
            eprintln!("Failed to read input: {err}");
            std::process::exit(1);
        }
    };

    let raw = match sdgfx_image::convert_bytes(&data, &options) {
        Ok(raw) => raw,
        Err(err) => {
            eprintln!("Conversion failed: {err:?}");
            std::process::exit(1);
        }
    };

    println!(
        "{}x{} {} ({} bytes)",
        raw.width,
        raw.height,
        raw.format.as_str(),
        raw.data.len()
    );

    if let Err(err) = sdgfx_image::write_raw(Path::new(&output), &raw) {
        eprintln!("Failed to write output: {err}");
        std::process::exit(1);
    }
}
