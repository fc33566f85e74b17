use crate::chart::canvas::{Canvas, AXIS, GRID, WHITE};
use crate::chart::{ChartError, ChartImage, ChartRenderer};
use crate::domain::candle::Candle;
use image::Rgb;

const INCREASING: Rgb<u8> = Rgb([0x3D, 0x99, 0x70]);
const DECREASING: Rgb<u8> = Rgb([0xFF, 0x41, 0x36]);
const GRID_LINES: i64 = 5;

#[derive(Debug, Clone)]
pub struct CandlestickChart {
    candles: Vec<Candle>,
}

impl CandlestickChart {
    pub fn new(candles: Vec<Candle>) -> Self {
        Self { candles }
    }

    fn price_range(&self) -> (f64, f64) {
        let (lo, hi) = self
            .candles
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| {
                (lo.min(c.low), hi.max(c.high))
            });
        if !(hi > lo) {
            let mid = if lo.is_finite() { lo } else { 0.0 };
            return (mid - 1.0, mid + 1.0);
        }
        // 5% headroom each side.
        let pad = (hi - lo) * 0.05;
        (lo - pad, hi + pad)
    }
}

impl ChartRenderer for CandlestickChart {
    fn chart_name(&self) -> &str {
        "candlestick"
    }

    fn render(&self, width_px: u32) -> Result<ChartImage, ChartError> {
        if width_px < 100 {
            return Err(ChartError::InvalidWidth(width_px));
        }
        let height_px = width_px / 2;
        let mut canvas = Canvas::new(width_px, height_px, WHITE);
        let w = i64::from(canvas.width());
        let h = i64::from(canvas.height());

        let left = w * 8 / 100;
        let right = w * 96 / 100;
        let top = h * 8 / 100;
        let bottom = h * 88 / 100;

        for i in 0..=GRID_LINES {
            let y = top + (bottom - top) * i / GRID_LINES;
            canvas.hline(left, right, y, 1, GRID);
        }

        let (lo, hi) = self.price_range();
        let to_y = |price: f64| -> i64 {
            let t = (price - lo) / (hi - lo);
            bottom - ((bottom - top) as f64 * t).round() as i64
        };

        if !self.candles.is_empty() {
            let n = self.candles.len() as i64;
            let slot = (right - left) / n;
            let body = (slot * 6 / 10).max(1);
            let wick = (slot / 12).clamp(1, 4);

            for (i, candle) in self.candles.iter().enumerate() {
                let center = left + slot * i as i64 + slot / 2;
                let color = if candle.is_increasing() {
                    INCREASING
                } else {
                    DECREASING
                };

                canvas.vline(center - wick / 2, to_y(candle.high), to_y(candle.low), wick, color);

                let (y_open, y_close) = (to_y(candle.open), to_y(candle.close));
                let (y0, y1) = (y_open.min(y_close), y_open.max(y_close));
                canvas.fill_rect(center - body / 2, y0, center + body / 2, y1.max(y0 + 2), color);
            }
        }

        canvas.hline(left, right, bottom, 2, AXIS);
        canvas.vline(left - 2, top, bottom + 2, 2, AXIS);

        canvas.into_png()
    }
}
