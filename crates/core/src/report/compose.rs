use crate::chart::{ImageFormat, NamedChart};
use crate::domain::row::{validate_rows, RowRecord};
use crate::domain::{DISCLAIMER, REPORT_TITLE};
use crate::report::error::ReportError;
use crate::report::scratch::Scratch;

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub pages: Vec<Page>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Page {
    Text(TextPage),
    Image(ImagePage),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextPage {
    pub title: String,
    pub notice: String,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImagePage {
    pub title: String,
    pub image: RasterImage,
}

/// Decoded 8-bit RGB pixels, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

impl Report {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn text_pages(&self) -> impl Iterator<Item = &TextPage> {
        self.pages.iter().filter_map(|p| match p {
            Page::Text(t) => Some(t),
            Page::Image(_) => None,
        })
    }
}

/// Assembles the summary page followed by one page per chart, in order.
///
/// Each chart image goes through `scratch` (written, then read back) before it
/// is decoded, so an image that cannot be stored or decoded fails the whole
/// composition. Whatever `scratch` holds is released by its owner.
pub fn compose(
    records: &[RowRecord],
    charts: &[NamedChart],
    scratch: &mut Scratch<'_>,
) -> Result<Report, ReportError> {
    let rows = validate_rows(records)?;

    let mut pages = Vec::with_capacity(1 + charts.len());
    pages.push(Page::Text(TextPage {
        title: REPORT_TITLE.to_string(),
        notice: DISCLAIMER.to_string(),
        lines: rows.iter().map(|r| r.summary_line()).collect(),
    }));

    for chart in charts {
        let image = embed(chart, scratch)?;
        pages.push(Page::Image(ImagePage {
            title: chart.title.clone(),
            image,
        }));
    }

    Ok(Report { pages })
}

fn embed(chart: &NamedChart, scratch: &mut Scratch<'_>) -> Result<RasterImage, ReportError> {
    let ext = match chart.image.format {
        ImageFormat::Png => "png",
    };
    let key = scratch
        .stash(&format!("{}.{ext}", chart.title), &chart.image.bytes)
        .map_err(|e| ReportError::render(&chart.title, format!("write failed: {e}")))?;
    let bytes = scratch
        .load(&key)
        .map_err(|e| ReportError::render(&chart.title, format!("read back failed: {e}")))?;

    let format = match chart.image.format {
        ImageFormat::Png => image::ImageFormat::Png,
    };
    let decoded = image::load_from_memory_with_format(&bytes, format)
        .map_err(|e| ReportError::render(&chart.title, format!("unreadable image: {e}")))?
        .to_rgb8();

    let (width, height) = decoded.dimensions();
    if width == 0 || height == 0 {
        return Err(ReportError::render(&chart.title, "image has no pixels"));
    }
    if (width, height) != (chart.image.width_px, chart.image.height_px) {
        tracing::warn!(
            chart = %chart.title,
            declared_w = chart.image.width_px,
            declared_h = chart.image.height_px,
            width,
            height,
            "chart image dimensions differ from the declared ones; using decoded"
        );
    }

    Ok(RasterImage {
        width,
        height,
        rgb: decoded.into_raw(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{CandlestickChart, ChartImage, ChartRenderer, HeatmapChart};
    use crate::domain::candle::Candle;
    use crate::domain::row::Row;
    use crate::report::scratch::MemoryStore;

    fn records(n: usize) -> Vec<RowRecord> {
        (0..n)
            .map(|i| RowRecord::from(&Row::new(format!("T{i}"), 50.0, 50.0, 0.1)))
            .collect()
    }

    fn charts() -> Vec<NamedChart> {
        let rows = vec![Row::new("AAPL", 75.0, 65.0, 1.2)];
        vec![
            NamedChart {
                title: "Heatmap".to_string(),
                image: HeatmapChart::from_rows(&rows).render(300).unwrap(),
            },
            NamedChart {
                title: "Candlestick Chart".to_string(),
                image: CandlestickChart::new(Candle::sample_session())
                    .render(300)
                    .unwrap(),
            },
        ]
    }

    #[test]
    fn two_charts_give_three_pages_for_any_row_count() {
        let charts = charts();
        for n in [0, 1, 4, 60] {
            let store = MemoryStore::new();
            let mut scratch = Scratch::new(&store);
            let report = compose(&records(n), &charts, &mut scratch).unwrap();
            assert_eq!(report.page_count(), 3);
            assert!(matches!(report.pages[0], Page::Text(_)));
            assert!(matches!(report.pages[1], Page::Image(_)));
            assert!(matches!(report.pages[2], Page::Image(_)));
        }
    }

    #[test]
    fn text_page_has_title_notice_and_ordered_lines() {
        let recs = vec![
            RowRecord::from(&Row::new("MSFT", 62.0, 48.0, -0.5)),
            RowRecord::from(&Row::new("AAPL", 75.0, 65.0, 1.2)),
        ];
        let store = MemoryStore::new();
        let mut scratch = Scratch::new(&store);
        let report = compose(&recs, &[], &mut scratch).unwrap();

        assert_eq!(report.page_count(), 1);
        let page = report.text_pages().next().unwrap();
        assert_eq!(page.title, "Nasdaq Gap-Up Prediction Report");
        assert_eq!(page.notice, DISCLAIMER);
        assert_eq!(
            page.lines,
            vec![
                "MSFT: Gap-Up Probability 62% | RSI 48 | MACD -0.5",
                "AAPL: Gap-Up Probability 75% | RSI 65 | MACD 1.2",
            ]
        );
    }

    #[test]
    fn empty_rows_leave_only_title_and_notice() {
        let store = MemoryStore::new();
        let mut scratch = Scratch::new(&store);
        let report = compose(&[], &[], &mut scratch).unwrap();
        let page = report.text_pages().next().unwrap();
        assert!(page.lines.is_empty());
    }

    #[test]
    fn charts_pass_through_scratch() {
        let store = MemoryStore::new();
        let mut scratch = Scratch::new(&store);
        compose(&records(1), &charts(), &mut scratch).unwrap();
        assert_eq!(scratch.held(), 2);
        assert_eq!(store.len(), 2);
        drop(scratch);
        assert!(store.is_empty());
    }

    #[test]
    fn unreadable_image_fails_and_scratch_is_released() {
        let mut charts = charts();
        charts[1].image = ChartImage::png(b"not a png".to_vec(), 300, 150);

        let store = MemoryStore::new();
        let result = {
            let mut scratch = Scratch::new(&store);
            compose(&records(2), &charts, &mut scratch)
        };

        match result {
            Err(ReportError::ArtifactRender { artifact, .. }) => {
                assert_eq!(artifact, "Candlestick Chart")
            }
            other => panic!("expected ArtifactRender, got {other:?}"),
        }
        assert!(store.is_empty());
    }

    #[test]
    fn malformed_row_is_reported_before_charts_are_touched() {
        let mut recs = records(3);
        recs[2].macd = None;

        let store = MemoryStore::new();
        let mut scratch = Scratch::new(&store);
        let err = compose(&recs, &charts(), &mut scratch).unwrap_err();
        assert!(matches!(
            err,
            ReportError::MalformedRow {
                index: 2,
                field: "macd",
                ..
            }
        ));
        assert_eq!(scratch.held(), 0);
    }
}
