use crate::chart::{
    render_with_timeout, CandlestickChart, ChartJob, HeatmapChart, CANDLESTICK_TITLE,
    HEATMAP_TITLE,
};
use crate::config::StoreKind;
use crate::domain::candle::Candle;
use crate::domain::row::{validate_rows, Row, RowRecord};
use crate::report::csv::to_csv;
use crate::report::error::ReportError;
use crate::report::scratch::{ArtifactStore, DiskStore, MemoryStore, Scratch};
use crate::report::{compose, pdf::PDF_FILENAME};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct ExportOptions {
    pub chart_width_px: u32,
    pub render_timeout: Duration,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            chart_width_px: 1000,
            render_timeout: Duration::from_secs(10),
        }
    }
}

impl From<&crate::config::Settings> for ExportOptions {
    fn from(settings: &crate::config::Settings) -> Self {
        Self {
            chart_width_px: settings.chart_width_px,
            render_timeout: settings.render_timeout,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReportExport {
    pub csv: Vec<u8>,
    pub pdf: Vec<u8>,
}

/// A fresh store for one invocation. Without an explicit directory the disk
/// store lives in its own temp dir.
pub fn open_store(kind: StoreKind, dir: Option<&Path>) -> std::io::Result<Box<dyn ArtifactStore>> {
    Ok(match (kind, dir) {
        (StoreKind::Memory, _) => Box::new(MemoryStore::new()),
        (StoreKind::Disk, Some(dir)) => Box::new(DiskStore::in_dir(dir)?),
        (StoreKind::Disk, None) => Box::new(DiskStore::ephemeral()?),
    })
}

/// Heatmap of the rows followed by the sample candlestick session.
pub fn gapup_charts(rows: &[Row], candles: Vec<Candle>) -> Vec<ChartJob> {
    vec![
        ChartJob::new(HEATMAP_TITLE, Arc::new(HeatmapChart::from_rows(rows))),
        ChartJob::new(CANDLESTICK_TITLE, Arc::new(CandlestickChart::new(candles))),
    ]
}

/// Runs render → compose → serialize for one request. Both outputs are
/// returned together or not at all; every transient artifact is released
/// before this returns.
pub async fn export_report(
    records: &[RowRecord],
    charts: &[ChartJob],
    store: &dyn ArtifactStore,
    options: &ExportOptions,
) -> Result<ReportExport, ReportError> {
    let rows = validate_rows(records)?;

    let mut rendered = Vec::with_capacity(charts.len());
    for job in charts {
        let chart =
            render_with_timeout(job, options.chart_width_px, options.render_timeout).await?;
        rendered.push(chart);
    }

    let mut scratch = Scratch::new(store);
    let report = compose(records, &rendered, &mut scratch)?;
    drop(rendered);

    let pdf = report.to_pdf()?;
    let key = scratch
        .stash(PDF_FILENAME, &pdf)
        .map_err(|e| ReportError::render(PDF_FILENAME, format!("write failed: {e}")))?;
    let pdf = scratch
        .load(&key)
        .map_err(|e| ReportError::render(PDF_FILENAME, format!("read back failed: {e}")))?;

    let csv = to_csv(&rows)?;

    tracing::info!(
        rows = rows.len(),
        pages = report.page_count(),
        artifacts = scratch.held(),
        pdf_bytes = pdf.len(),
        csv_bytes = csv.len(),
        "report exported"
    );

    Ok(ReportExport { csv, pdf })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{ChartError, ChartImage, ChartRenderer};

    struct FailingRenderer;

    impl ChartRenderer for FailingRenderer {
        fn chart_name(&self) -> &str {
            "failing"
        }

        fn render(&self, _width_px: u32) -> Result<ChartImage, ChartError> {
            Err(ChartError::Other("simulated renderer failure".to_string()))
        }
    }

    struct GarbageRenderer;

    impl ChartRenderer for GarbageRenderer {
        fn chart_name(&self) -> &str {
            "garbage"
        }

        fn render(&self, width_px: u32) -> Result<ChartImage, ChartError> {
            Ok(ChartImage::png(vec![0u8; 64], width_px, width_px / 2))
        }
    }

    fn records() -> Vec<RowRecord> {
        vec![
            RowRecord::from(&Row::new("AAPL", 75.0, 65.0, 1.2)),
            RowRecord::from(&Row::new("MSFT", 62.0, 48.0, -0.5)),
        ]
    }

    fn options() -> ExportOptions {
        ExportOptions {
            chart_width_px: 400,
            render_timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn exports_csv_and_three_page_pdf() {
        let records = records();
        let rows = validate_rows(&records).unwrap();
        let charts = gapup_charts(&rows, Candle::sample_session());
        let store = MemoryStore::new();

        let export = export_report(&records, &charts, &store, &options())
            .await
            .unwrap();

        let csv = String::from_utf8(export.csv).unwrap();
        assert_eq!(csv.lines().count(), 3);
        let doc = lopdf::Document::load_mem(&export.pdf).unwrap();
        assert_eq!(doc.get_pages().len(), 3);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn heatmap_failure_aborts_with_no_output() {
        let charts = vec![
            ChartJob::new(HEATMAP_TITLE, Arc::new(FailingRenderer)),
            ChartJob::new(
                CANDLESTICK_TITLE,
                Arc::new(CandlestickChart::new(Candle::sample_session())),
            ),
        ];
        let store = MemoryStore::new();

        let result = export_report(&records(), &charts, &store, &options()).await;
        match result {
            Err(ReportError::ArtifactRender { artifact, reason }) => {
                assert_eq!(artifact, "Heatmap");
                assert!(reason.contains("simulated"));
            }
            other => panic!("expected ArtifactRender, got {other:?}"),
        }
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn failed_composition_leaves_disk_store_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::in_dir(dir.path()).unwrap();
        let rows = validate_rows(&records()).unwrap();
        let charts = vec![
            ChartJob::new(HEATMAP_TITLE, Arc::new(HeatmapChart::from_rows(&rows))),
            ChartJob::new(CANDLESTICK_TITLE, Arc::new(GarbageRenderer)),
        ];

        let err = export_report(&records(), &charts, &store, &options())
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::ArtifactRender { .. }));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn malformed_row_fails_before_rendering() {
        let mut records = records();
        records[0].symbol = None;
        let charts = vec![ChartJob::new(HEATMAP_TITLE, Arc::new(FailingRenderer))];
        let store = MemoryStore::new();

        let err = export_report(&records, &charts, &store, &options())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ReportError::MalformedRow {
                index: 0,
                field: "symbol",
                ..
            }
        ));
    }

    #[test]
    fn open_store_round_trips_for_every_kind() {
        let dir = tempfile::tempdir().unwrap();
        let pinned = dir.path().join("artifacts");
        for (kind, root) in [
            (StoreKind::Memory, None),
            (StoreKind::Disk, None),
            (StoreKind::Disk, Some(pinned.as_path())),
        ] {
            let store = open_store(kind, root).unwrap();
            let mut scratch = Scratch::new(store.as_ref());
            let key = scratch.stash(PDF_FILENAME, b"%PDF").unwrap();
            assert_eq!(scratch.load(&key).unwrap(), b"%PDF");
        }
        assert_eq!(std::fs::read_dir(&pinned).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn disk_export_without_a_directory_succeeds() {
        let records = records();
        let rows = validate_rows(&records).unwrap();
        let charts = gapup_charts(&rows, Candle::sample_session());
        let store = open_store(StoreKind::Disk, None).unwrap();

        let export = export_report(&records, &charts, store.as_ref(), &options())
            .await
            .unwrap();
        assert!(export.pdf.starts_with(b"%PDF-"));
    }

    #[tokio::test]
    async fn empty_selection_still_exports() {
        let charts = gapup_charts(&[], Candle::sample_session());
        let store = MemoryStore::new();
        let export = export_report(&[], &charts, &store, &options())
            .await
            .unwrap();
        assert_eq!(
            String::from_utf8(export.csv).unwrap(),
            "Symbol,Gap-Up Probability,RSI,MACD\n"
        );
        let doc = lopdf::Document::load_mem(&export.pdf).unwrap();
        assert_eq!(doc.get_pages().len(), 3);
    }
}
