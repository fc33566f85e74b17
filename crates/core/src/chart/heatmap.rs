use crate::chart::canvas::{Canvas, AXIS, WHITE};
use crate::chart::glyph::{self, GLYPH_H};
use crate::chart::{ChartError, ChartImage, ChartRenderer};
use crate::domain::row::Row;
use colorgrad::Gradient;
use image::Rgb;

// ColorBrewer RdYlGn, low → high.
const RD_YL_GN: [&str; 11] = [
    "#a50026", "#d73027", "#f46d43", "#fdae61", "#fee08b", "#ffffbf", "#d9ef8b", "#a6d96a",
    "#66bd63", "#1a9850", "#006837",
];

/// Single-row heatmap of gap-up probability, one cell per symbol.
#[derive(Debug, Clone)]
pub struct HeatmapChart {
    cells: Vec<(String, f64)>,
}

impl HeatmapChart {
    pub fn new(cells: Vec<(String, f64)>) -> Self {
        Self { cells }
    }

    pub fn from_rows(rows: &[Row]) -> Self {
        Self::new(
            rows.iter()
                .map(|r| (r.symbol.clone(), r.probability))
                .collect(),
        )
    }

    /// Position of `value` on the color scale, from the data's own min..max.
    fn scale_position(&self, value: f64) -> f32 {
        let (min, max) = self
            .cells
            .iter()
            .map(|(_, v)| *v)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        if !(max > min) {
            return 0.5;
        }
        ((value - min) / (max - min)) as f32
    }
}

impl ChartRenderer for HeatmapChart {
    fn chart_name(&self) -> &str {
        "heatmap"
    }

    fn render(&self, width_px: u32) -> Result<ChartImage, ChartError> {
        if width_px < 100 {
            return Err(ChartError::InvalidWidth(width_px));
        }
        let height_px = width_px * 2 / 5;
        let grad = colorgrad::GradientBuilder::new()
            .html_colors(&RD_YL_GN)
            .build::<colorgrad::LinearGradient>()
            .map_err(|e| ChartError::Other(format!("invalid heatmap gradient: {e}")))?;

        let mut canvas = Canvas::new(width_px, height_px, WHITE);
        let w = i64::from(canvas.width());
        let h = i64::from(canvas.height());

        let left = w * 8 / 100;
        let right = w * 84 / 100;
        let top = h * 10 / 100;
        let bottom = h * 88 / 100;

        if !self.cells.is_empty() {
            let n = self.cells.len() as i64;
            let span = right - left;
            let label_top = bottom + 4;
            let max_scale = ((h - label_top) / (GLYPH_H + 2)).max(1);
            for (i, (symbol, value)) in self.cells.iter().enumerate() {
                let i = i as i64;
                let x0 = left + span * i / n;
                let x1 = left + span * (i + 1) / n;
                let color = to_rgb(grad.at(self.scale_position(*value)));
                canvas.fill_rect(x0, top, x1, bottom, color);
                if i > 0 {
                    canvas.vline(x0, top, bottom, 2, WHITE);
                }

                // Symbol under its cell, shrunk to the cell width.
                let unit = glyph::text_width(symbol, 1).max(1);
                let scale = ((x1 - x0) / unit).clamp(1, max_scale);
                let x = x0 + ((x1 - x0) - glyph::text_width(symbol, scale)) / 2;
                canvas.text(x, label_top, symbol, scale, AXIS);
            }
        }

        // Axes.
        canvas.hline(left, right, bottom, 2, AXIS);
        canvas.vline(left - 2, top, bottom + 2, 2, AXIS);

        // Color bar, high values on top.
        let bar_left = w * 88 / 100;
        let bar_right = w * 92 / 100;
        let bar_span = (bottom - top).max(1);
        for y in top..bottom {
            let t = 1.0 - (y - top) as f32 / bar_span as f32;
            canvas.hline(bar_left, bar_right, y, 1, to_rgb(grad.at(t)));
        }

        canvas.into_png()
    }
}

fn to_rgb(color: colorgrad::Color) -> Rgb<u8> {
    let rgba8 = color.to_rgba8();
    Rgb([rgba8[0], rgba8[1], rgba8[2]])
}
