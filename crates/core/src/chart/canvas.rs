use crate::chart::glyph::{self, ADVANCE, GLYPH_W};
use crate::chart::{ChartError, ChartImage};
use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

pub(crate) const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
pub(crate) const AXIS: Rgb<u8> = Rgb([68, 68, 68]);
pub(crate) const GRID: Rgb<u8> = Rgb([229, 236, 246]);

/// Clipped rectangle/line primitives over an RGB buffer.
pub(crate) struct Canvas {
    img: RgbImage,
}

impl Canvas {
    pub(crate) fn new(width: u32, height: u32, background: Rgb<u8>) -> Self {
        Self {
            img: RgbImage::from_pixel(width, height, background),
        }
    }

    pub(crate) fn width(&self) -> u32 {
        self.img.width()
    }

    pub(crate) fn height(&self) -> u32 {
        self.img.height()
    }

    /// Fills `[x0, x1) × [y0, y1)`, clipped to the canvas.
    pub(crate) fn fill_rect(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb<u8>) {
        let (w, h) = (i64::from(self.img.width()), i64::from(self.img.height()));
        let (x0, x1) = (x0.min(x1).clamp(0, w), x0.max(x1).clamp(0, w));
        let (y0, y1) = (y0.min(y1).clamp(0, h), y0.max(y1).clamp(0, h));
        for y in y0..y1 {
            for x in x0..x1 {
                self.img.put_pixel(x as u32, y as u32, color);
            }
        }
    }

    pub(crate) fn hline(&mut self, x0: i64, x1: i64, y: i64, thickness: i64, color: Rgb<u8>) {
        self.fill_rect(x0, y, x1, y + thickness.max(1), color);
    }

    pub(crate) fn vline(&mut self, x: i64, y0: i64, y1: i64, thickness: i64, color: Rgb<u8>) {
        self.fill_rect(x, y0, x + thickness.max(1), y1, color);
    }

    /// Draws `text` with its top-left corner at `(x, y)`, each glyph pixel
    /// a `scale`-sized square.
    pub(crate) fn text(&mut self, x: i64, y: i64, text: &str, scale: i64, color: Rgb<u8>) {
        let scale = scale.max(1);
        for (i, c) in text.chars().enumerate() {
            let gx = x + i as i64 * ADVANCE * scale;
            for (row, bits) in glyph::glyph(c).iter().enumerate() {
                for col in 0..GLYPH_W {
                    if bits & (1 << (GLYPH_W - 1 - col)) != 0 {
                        let px = gx + col * scale;
                        let py = y + row as i64 * scale;
                        self.fill_rect(px, py, px + scale, py + scale, color);
                    }
                }
            }
        }
    }

    pub(crate) fn into_png(self) -> Result<ChartImage, ChartError> {
        let (width, height) = self.img.dimensions();
        let mut buf = Cursor::new(Vec::new());
        self.img.write_to(&mut buf, ImageFormat::Png)?;
        Ok(ChartImage::png(buf.into_inner(), width, height))
    }
}
