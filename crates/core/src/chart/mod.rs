pub mod candlestick;
mod canvas;
mod glyph;
pub mod heatmap;

use crate::report::error::ReportError;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub use candlestick::CandlestickChart;
pub use heatmap::HeatmapChart;

pub const HEATMAP_TITLE: &str = "Heatmap";
pub const CANDLESTICK_TITLE: &str = "Candlestick Chart";
pub const PNG_MIME: &str = "image/png";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
}

/// Rendered raster output. The report composer never looks at the pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartImage {
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
    pub width_px: u32,
    pub height_px: u32,
}

impl ChartImage {
    pub fn png(bytes: Vec<u8>, width_px: u32, height_px: u32) -> Self {
        Self {
            format: ImageFormat::Png,
            bytes,
            width_px,
            height_px,
        }
    }

    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }
}

#[derive(Debug, Clone)]
pub struct NamedChart {
    pub title: String,
    pub image: ChartImage,
}

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("invalid target width {0}px")]
    InvalidWidth(u32),

    #[error("png encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    #[error("{0}")]
    Other(String),
}

pub trait ChartRenderer: Send + Sync {
    fn chart_name(&self) -> &str;

    /// Same dataset and width must give the same bytes.
    fn render(&self, width_px: u32) -> Result<ChartImage, ChartError>;
}

/// A chart to render and the page title it is filed under.
#[derive(Clone)]
pub struct ChartJob {
    pub title: String,
    pub renderer: Arc<dyn ChartRenderer>,
}

impl ChartJob {
    pub fn new(title: impl Into<String>, renderer: Arc<dyn ChartRenderer>) -> Self {
        Self {
            title: title.into(),
            renderer,
        }
    }
}

/// Runs the render on the blocking pool. A render that outlives `limit` is
/// abandoned and reported as a render failure.
pub async fn render_with_timeout(
    job: &ChartJob,
    width_px: u32,
    limit: Duration,
) -> Result<NamedChart, ReportError> {
    let renderer = Arc::clone(&job.renderer);
    let started = std::time::Instant::now();
    let task = tokio::task::spawn_blocking(move || renderer.render(width_px));

    let image = match tokio::time::timeout(limit, task).await {
        Ok(Ok(Ok(image))) => image,
        Ok(Ok(Err(err))) => return Err(ReportError::render(&job.title, err)),
        Ok(Err(join_err)) => {
            return Err(ReportError::render(
                &job.title,
                format!("renderer task failed: {join_err}"),
            ))
        }
        Err(_) => {
            return Err(ReportError::render(
                &job.title,
                format!("timed out after {}ms", limit.as_millis()),
            ))
        }
    };

    tracing::debug!(
        chart = job.renderer.chart_name(),
        width_px = image.width_px,
        height_px = image.height_px,
        bytes = image.byte_len(),
        elapsed_ms = started.elapsed().as_millis(),
        "chart rendered"
    );

    Ok(NamedChart {
        title: job.title.clone(),
        image,
    })
}
