use anyhow::Context;
use clap::Parser;
use gapup_core::config::StoreKind;
use gapup_core::domain::candle::Candle;
use gapup_core::domain::row::Row;
use gapup_core::export::{export_report, gapup_charts, open_store, ExportOptions, ReportExport};
use gapup_core::ingest;
use gapup_core::report::csv::CSV_FILENAME;
use gapup_core::report::pdf::PDF_FILENAME;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "gapup_worker")]
struct Args {
    /// Comma-separated tickers. Defaults to AAPL.
    #[arg(long)]
    tickers: Option<String>,

    /// Directory that receives gapup_report.csv and gapup_report.pdf.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Transient artifact store (memory or disk). Overrides ARTIFACT_STORE.
    #[arg(long)]
    store: Option<StoreKind>,

    /// Fetch predictions and log the plan without rendering or writing.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = gapup_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let tickers = match args.tickers.as_deref() {
        Some(raw) => ingest::parse_tickers(raw),
        None => ingest::default_tickers(),
    };

    let provider = ingest::provider_from_settings(&settings)?;
    let records = match provider.predict(&tickers).await {
        Ok(records) => records,
        Err(err) => {
            if err.downcast_ref::<ingest::UnknownTickerError>().is_none() {
                sentry_anyhow::capture_anyhow(&err);
            }
            tracing::error!(provider = provider.provider_name(), error = %err, "prediction fetch failed");
            return Err(err);
        }
    };

    if args.dry_run {
        tracing::info!(
            tickers = %tickers.join(","),
            rows = records.len(),
            provider = provider.provider_name(),
            dry_run = true,
            "gap-up export plan"
        );
        return Ok(());
    }

    let store_kind = args.store.unwrap_or(settings.artifact_store);
    let store = open_store(store_kind, settings.artifact_dir.as_deref())
        .context("failed to open artifact store")?;

    let rows: Vec<Row> = records
        .iter()
        .enumerate()
        .filter_map(|(i, r)| r.validate_and_into_row(i).ok())
        .collect();
    let charts = gapup_charts(&rows, Candle::sample_session());
    let options = ExportOptions::from(&settings);

    let export = match export_report(&records, &charts, store.as_ref(), &options).await {
        Ok(export) => export,
        Err(e) => {
            let err = anyhow::Error::new(e).context("report export failed");
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(error = %err, "report export failed");
            return Err(err);
        }
    };

    let (csv_path, pdf_path) = write_report(&args.out_dir, &export)?;
    tracing::info!(
        csv = %csv_path.display(),
        pdf = %pdf_path.display(),
        rows = records.len(),
        "report written"
    );

    Ok(())
}

/// Writes both files or neither. Each report is staged as a temp file in
/// `out_dir` and only moved into place once both are fully written.
fn write_report(out_dir: &Path, export: &ReportExport) -> anyhow::Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    let csv_path = out_dir.join(CSV_FILENAME);
    let pdf_path = out_dir.join(PDF_FILENAME);
    let staged_csv = stage(out_dir, &export.csv, &csv_path)?;
    let staged_pdf = stage(out_dir, &export.pdf, &pdf_path)?;

    staged_pdf
        .persist(&pdf_path)
        .map_err(|e| e.error)
        .with_context(|| format!("failed to write {}", pdf_path.display()))?;
    if let Err(e) = staged_csv.persist(&csv_path) {
        let _ = std::fs::remove_file(&pdf_path);
        return Err(e.error).with_context(|| format!("failed to write {}", csv_path.display()));
    }

    Ok((csv_path, pdf_path))
}

fn stage(out_dir: &Path, bytes: &[u8], target: &Path) -> anyhow::Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix(".gapup-")
        .tempfile_in(out_dir)
        .with_context(|| format!("failed to stage {}", target.display()))?;
    file.write_all(bytes)
        .and_then(|()| file.flush())
        .with_context(|| format!("failed to write {}", target.display()))?;
    Ok(file)
}

fn init_sentry(settings: &gapup_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags() {
        let args = Args::try_parse_from([
            "gapup_worker",
            "--tickers",
            "aapl,msft",
            "--out-dir",
            "/tmp/out",
            "--store",
            "disk",
            "--dry-run",
        ])
        .unwrap();
        assert_eq!(args.tickers.as_deref(), Some("aapl,msft"));
        assert_eq!(args.out_dir, PathBuf::from("/tmp/out"));
        assert_eq!(args.store, Some(StoreKind::Disk));
        assert!(args.dry_run);
    }

    #[test]
    fn rejects_unknown_store() {
        assert!(Args::try_parse_from(["gapup_worker", "--store", "s3"]).is_err());
    }

    #[test]
    fn writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested");
        let export = ReportExport {
            csv: b"Symbol,Gap-Up Probability,RSI,MACD\n".to_vec(),
            pdf: b"%PDF-1.5".to_vec(),
        };

        let (csv, pdf) = write_report(&out, &export).unwrap();
        assert_eq!(csv, out.join("gapup_report.csv"));
        assert_eq!(std::fs::read(&csv).unwrap(), export.csv);
        assert_eq!(std::fs::read(&pdf).unwrap(), export.pdf);
        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 2);
    }

    #[test]
    fn failed_pdf_write_leaves_no_csv() {
        let dir = tempfile::tempdir().unwrap();
        // A directory squatting on the PDF name makes the final rename fail.
        std::fs::create_dir(dir.path().join("gapup_report.pdf")).unwrap();
        let export = ReportExport {
            csv: b"Symbol,Gap-Up Probability,RSI,MACD\n".to_vec(),
            pdf: b"%PDF-1.5".to_vec(),
        };

        assert!(write_report(dir.path(), &export).is_err());
        assert!(!dir.path().join("gapup_report.csv").exists());
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("gapup_report.pdf")]);
    }

    #[test]
    fn failed_csv_write_rolls_back_the_pdf() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("gapup_report.csv")).unwrap();
        let export = ReportExport {
            csv: b"Symbol,Gap-Up Probability,RSI,MACD\n".to_vec(),
            pdf: b"%PDF-1.5".to_vec(),
        };

        assert!(write_report(dir.path(), &export).is_err());
        assert!(!dir.path().join("gapup_report.pdf").exists());
    }
}
