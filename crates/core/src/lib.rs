pub mod chart;
pub mod domain;
pub mod export;
pub mod ingest;
pub mod report;

pub mod config {
    use anyhow::Context;
    use std::path::PathBuf;
    use std::time::Duration;

    const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 10;
    const DEFAULT_CHART_WIDTH_PX: u32 = 1000;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum StoreKind {
        Memory,
        Disk,
    }

    impl std::str::FromStr for StoreKind {
        type Err = anyhow::Error;

        fn from_str(s: &str) -> anyhow::Result<Self> {
            match s.trim().to_ascii_lowercase().as_str() {
                "memory" | "mem" => Ok(Self::Memory),
                "disk" | "fs" => Ok(Self::Disk),
                other => anyhow::bail!("unknown artifact store kind: {other}"),
            }
        }
    }

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub sentry_dsn: Option<String>,
        pub prediction_provider_base_url: Option<String>,
        pub prediction_provider_api_key: Option<String>,
        pub render_timeout: Duration,
        pub chart_width_px: u32,
        pub artifact_store: StoreKind,
        pub artifact_dir: Option<PathBuf>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let render_timeout = render_timeout(std::env::var("RENDER_TIMEOUT_SECS").ok())?;

            let chart_width_px = std::env::var("CHART_WIDTH_PX")
                .ok()
                .and_then(|s| s.parse::<u32>().ok())
                .unwrap_or(DEFAULT_CHART_WIDTH_PX);
            anyhow::ensure!(
                (200..=4000).contains(&chart_width_px),
                "CHART_WIDTH_PX must be 200..=4000 (got {chart_width_px})"
            );

            let artifact_store = match std::env::var("ARTIFACT_STORE") {
                Ok(s) => s.parse().context("invalid ARTIFACT_STORE")?,
                Err(_) => StoreKind::Memory,
            };

            Ok(Self {
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                prediction_provider_base_url: std::env::var("PREDICTION_PROVIDER_BASE_URL")
                    .ok()
                    .filter(|s| !s.trim().is_empty()),
                prediction_provider_api_key: std::env::var("PREDICTION_PROVIDER_API_KEY").ok(),
                render_timeout,
                chart_width_px,
                artifact_store,
                artifact_dir: std::env::var("ARTIFACT_DIR").ok().map(PathBuf::from),
            })
        }

        pub fn require_prediction_provider_base_url(&self) -> anyhow::Result<&str> {
            self.prediction_provider_base_url
                .as_deref()
                .context("PREDICTION_PROVIDER_BASE_URL is required")
        }
    }

    fn render_timeout(raw: Option<String>) -> anyhow::Result<Duration> {
        let secs = raw
            .and_then(|s| s.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_RENDER_TIMEOUT_SECS);
        anyhow::ensure!(secs >= 1, "RENDER_TIMEOUT_SECS must be at least 1 (got {secs})");
        Ok(Duration::from_secs(secs))
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn parses_store_kind() {
            assert_eq!("memory".parse::<StoreKind>().unwrap(), StoreKind::Memory);
            assert_eq!(" Disk ".parse::<StoreKind>().unwrap(), StoreKind::Disk);
            assert!("s3".parse::<StoreKind>().is_err());
        }

        #[test]
        fn render_timeout_must_be_positive() {
            assert!(render_timeout(Some("0".to_string())).is_err());
            assert_eq!(
                render_timeout(Some("3".to_string())).unwrap(),
                Duration::from_secs(3)
            );
            assert_eq!(render_timeout(None).unwrap(), Duration::from_secs(10));
        }
    }
}
