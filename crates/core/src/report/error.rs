use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    /// A chart image could not be produced, written to scratch storage, or read back.
    #[error("failed to render artifact `{artifact}`: {reason}")]
    ArtifactRender { artifact: String, reason: String },

    #[error("row {index} is malformed: `{field}` {reason}")]
    MalformedRow {
        index: usize,
        field: &'static str,
        reason: &'static str,
    },

    #[error("failed to encode {format} output: {reason}")]
    Encode { format: &'static str, reason: String },
}

impl ReportError {
    pub fn missing_field(index: usize, field: &'static str) -> Self {
        Self::MalformedRow {
            index,
            field,
            reason: "is missing",
        }
    }

    pub fn render(artifact: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::ArtifactRender {
            artifact: artifact.into(),
            reason: reason.to_string(),
        }
    }

    pub fn encode(format: &'static str, reason: impl std::fmt::Display) -> Self {
        Self::Encode {
            format,
            reason: reason.to_string(),
        }
    }
}

/// Non-fatal: a transient artifact outlived its scope. Logged, never returned.
#[derive(Debug, Error)]
#[error("failed to release transient artifact {key}: {source}")]
pub struct ArtifactCleanupWarning {
    pub key: String,
    #[source]
    pub source: std::io::Error,
}
