use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use gapup_core::chart::{
    render_with_timeout, CandlestickChart, ChartJob, HeatmapChart, CANDLESTICK_TITLE,
    HEATMAP_TITLE, PNG_MIME,
};
use gapup_core::config::StoreKind;
use gapup_core::domain::candle::Candle;
use gapup_core::domain::row::{validate_rows, Row, RowRecord};
use gapup_core::export::{export_report, gapup_charts, open_store, ExportOptions};
use gapup_core::ingest::{self, PredictionProvider, UnknownTickerError};
use gapup_core::report::csv::{to_csv, CSV_FILENAME, CSV_MIME};
use gapup_core::report::pdf::{PDF_FILENAME, PDF_MIME};

mod view;

const EXPORT_FAILED: &str = "report export failed";

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

    let provider = ingest::provider_from_settings(&settings)?;
    tracing::info!(provider = provider.provider_name(), "prediction provider ready");

    let state = AppState {
        provider,
        options: ExportOptions::from(&settings),
        store_kind: settings.artifact_store,
        artifact_dir: settings.artifact_dir.clone(),
    };

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

#[derive(Clone)]
struct AppState {
    provider: Arc<dyn PredictionProvider>,
    options: ExportOptions,
    store_kind: StoreKind,
    artifact_dir: Option<PathBuf>,
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/", get(dashboard))
        .route("/api/predictions", get(get_predictions))
        .route("/charts/heatmap.png", get(get_heatmap))
        .route("/charts/candlestick.png", get(get_candlestick))
        .route("/reports/gapup_report.csv", get(get_csv_report))
        .route("/reports/gapup_report.pdf", get(get_pdf_report))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Default, Deserialize)]
struct Selection {
    tickers: Option<String>,
}

impl Selection {
    fn tickers(&self) -> Vec<String> {
        match self.tickers.as_deref() {
            Some(raw) => ingest::parse_tickers(raw),
            None => ingest::default_tickers(),
        }
    }
}

type ApiError = (StatusCode, String);

#[derive(Debug, Serialize)]
struct ApiPredictions {
    provider: &'static str,
    rows: Vec<Row>,
}

async fn dashboard(
    State(state): State<AppState>,
    Query(selection): Query<Selection>,
) -> Result<Html<String>, ApiError> {
    let tickers = selection.tickers();
    let rows = fetch_rows(&state, &tickers).await?;
    Ok(Html(view::render_dashboard(&rows, &tickers)))
}

async fn get_predictions(
    State(state): State<AppState>,
    Query(selection): Query<Selection>,
) -> Result<Json<ApiPredictions>, ApiError> {
    let rows = fetch_rows(&state, &selection.tickers()).await?;
    Ok(Json(ApiPredictions {
        provider: state.provider.provider_name(),
        rows,
    }))
}

async fn get_heatmap(
    State(state): State<AppState>,
    Query(selection): Query<Selection>,
) -> Result<Response, ApiError> {
    let rows = fetch_rows(&state, &selection.tickers()).await?;
    let job = ChartJob::new(HEATMAP_TITLE, Arc::new(HeatmapChart::from_rows(&rows)));
    chart_response(&state, &job).await
}

async fn get_candlestick(State(state): State<AppState>) -> Result<Response, ApiError> {
    let chart = CandlestickChart::new(Candle::sample_session());
    let job = ChartJob::new(CANDLESTICK_TITLE, Arc::new(chart));
    chart_response(&state, &job).await
}

async fn chart_response(state: &AppState, job: &ChartJob) -> Result<Response, ApiError> {
    let options = &state.options;
    let chart = render_with_timeout(job, options.chart_width_px, options.render_timeout)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, chart = %job.title, "chart render failed");
            export_failed()
        })?;

    Ok(([(header::CONTENT_TYPE, PNG_MIME)], chart.image.bytes).into_response())
}

async fn get_csv_report(
    State(state): State<AppState>,
    Query(selection): Query<Selection>,
) -> Result<Response, ApiError> {
    let records = fetch_records(&state, &selection.tickers()).await?;

    let csv = validate_rows(&records)
        .and_then(|rows| to_csv(&rows))
        .map_err(|e| {
            tracing::error!(error = %e, "csv export failed");
            export_failed()
        })?;

    Ok(attachment(CSV_MIME, CSV_FILENAME, csv))
}

async fn get_pdf_report(
    State(state): State<AppState>,
    Query(selection): Query<Selection>,
) -> Result<Response, ApiError> {
    let records = fetch_records(&state, &selection.tickers()).await?;
    let export_id = Uuid::new_v4();

    let store = open_store(state.store_kind, state.artifact_dir.as_deref()).map_err(|e| {
        let err = anyhow::Error::new(e).context("failed to open artifact store");
        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(%export_id, error = %err, "pdf export failed");
        export_failed()
    })?;

    // Rows with missing fields only break the heatmap; the export reports them itself.
    let rows: Vec<Row> = records
        .iter()
        .enumerate()
        .filter_map(|(i, r)| r.validate_and_into_row(i).ok())
        .collect();
    let charts = gapup_charts(&rows, Candle::sample_session());

    let export = export_report(&records, &charts, store.as_ref(), &state.options)
        .await
        .map_err(|e| {
            tracing::error!(%export_id, error = %e, "pdf export failed");
            export_failed()
        })?;

    tracing::info!(%export_id, pdf_bytes = export.pdf.len(), "pdf export served");
    Ok(attachment(PDF_MIME, PDF_FILENAME, export.pdf))
}

async fn fetch_records(state: &AppState, tickers: &[String]) -> Result<Vec<RowRecord>, ApiError> {
    state.provider.predict(tickers).await.map_err(|e| {
        if let Some(unknown) = e.downcast_ref::<UnknownTickerError>() {
            return (StatusCode::BAD_REQUEST, unknown.to_string());
        }
        sentry_anyhow::capture_anyhow(&e);
        tracing::error!(
            provider = state.provider.provider_name(),
            error = %e,
            "prediction fetch failed"
        );
        (StatusCode::BAD_GATEWAY, "prediction provider failed".to_string())
    })
}

async fn fetch_rows(state: &AppState, tickers: &[String]) -> Result<Vec<Row>, ApiError> {
    let records = fetch_records(state, tickers).await?;
    validate_rows(&records).map_err(|e| {
        tracing::error!(
            provider = state.provider.provider_name(),
            error = %e,
            "provider returned malformed rows"
        );
        (StatusCode::BAD_GATEWAY, e.to_string())
    })
}

fn attachment(mime: &'static str, filename: &str, body: Vec<u8>) -> Response {
    let disposition = format!("attachment; filename=\"{filename}\"");
    (
        [
            (header::CONTENT_TYPE, mime.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response()
}

fn export_failed() -> ApiError {
    (StatusCode::INTERNAL_SERVER_ERROR, EXPORT_FAILED.to_string())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
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
