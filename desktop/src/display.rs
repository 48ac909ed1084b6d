//! minifb window standing in for the host's pixel-oriented display.

use embedded_graphics::pixelcolor::{Rgb888, RgbColor};
use embedded_graphics::prelude::{DrawTarget, OriginDimensions, Size};
use embedded_graphics::Pixel;

pub struct WindowDisplay {
    window: minifb::Window,
    buffer: Vec<u32>,
    width: usize,
    height: usize,
}

impl WindowDisplay {
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self, minifb::Error> {
        let mut window =
            minifb::Window::new(title, width, height, minifb::WindowOptions::default())?;
        window.set_target_fps(60);
        Ok(Self {
            window,
            buffer: vec![0xFF000000; width * height],
            width,
            height,
        })
    }

    pub fn is_open(&self) -> bool {
        self.window.is_open() && !self.window.is_key_down(minifb::Key::Escape)
    }

    pub fn clear(&mut self, argb: u32) {
        self.buffer.fill(argb);
    }

    pub fn present(&mut self) -> Result<(), minifb::Error> {
        self.window
            .update_with_buffer(&self.buffer, self.width, self.height)
    }
}

impl OriginDimensions for WindowDisplay {
    fn size(&self) -> Size {
        Size::new(self.width as u32, self.height as u32)
    }
}

impl DrawTarget for WindowDisplay {
    type Color = Rgb888;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x < 0
                || point.y < 0
                || point.x as usize >= self.width
                || point.y as usize >= self.height
            {
                continue;
            }
            let index = point.y as usize * self.width + point.x as usize;
            self.buffer[index] = 0xFF000000
                | ((color.r() as u32) << 16)
                | ((color.g() as u32) << 8)
                | color.b() as u32;
        }
        Ok(())
    }
}
