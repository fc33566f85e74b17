pub mod compose;
pub mod csv;
pub mod error;
pub mod pdf;
pub mod scratch;
pub mod text;

pub use compose::{compose, Page, Report};
pub use error::{ArtifactCleanupWarning, ReportError};
pub use scratch::{ArtifactStore, DiskStore, MemoryStore, Scratch};
