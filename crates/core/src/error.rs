// crates/core/src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while planning ranges over, or aggregating, the input log.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Input log not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Permission denied reading input log: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The slug was never interned by the discovery scan. Widen the discovery
    /// prefix rather than dropping the record.
    #[error("Unknown path '{slug}' at byte {offset} in {path} (not seen by discovery)")]
    UnknownPath {
        path: PathBuf,
        slug: String,
        offset: u64,
    },

    #[error("Record at byte {offset} in {path} is longer than the {chunk}-byte read chunk")]
    RecordTooLong {
        path: PathBuf,
        offset: u64,
        chunk: usize,
    },
}

impl ScanError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io { path, source },
        }
    }
}

/// Errors reading or writing a worker's partial-result artifact.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("Partial artifact not found: {path}")]
    NotFound { path: PathBuf },

    #[error("IO error on partial artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Bad magic in partial artifact {path}")]
    BadMagic { path: PathBuf },

    #[error("Unsupported partial artifact version {version} in {path}")]
    UnsupportedVersion { path: PathBuf, version: u8 },

    #[error("Partial artifact {path} has {found} cells, expected {expected}")]
    ShapeMismatch {
        path: PathBuf,
        expected: usize,
        found: usize,
    },

    #[error("Partial artifact {path} references cell {index} outside a {cells}-cell matrix")]
    IndexOutOfBounds {
        path: PathBuf,
        index: u32,
        cells: usize,
    },

    #[error("Partial artifact {path} is corrupt: {message}")]
    Corrupt { path: PathBuf, message: String },

    #[error("Matrix of {cells} cells is too large for the partial artifact format")]
    TooLarge { cells: usize },
}

impl WireError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }
}

/// Errors enumerating the supplementary visit source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Visit source not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Permission denied reading visit source: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("IO error reading visit source {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed JSON in visit source {path}: {message}")]
    MalformedJson { path: PathBuf, message: String },

    #[error("Visit source was already drained")]
    AlreadyDrained,
}

impl SourceError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io { path, source },
        }
    }
}

/// Errors writing the JSON report.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("IO error writing report {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ReportError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Top-level error for a whole aggregation run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Worker {task} failed: {source}")]
    WorkerFailed {
        task: usize,
        #[source]
        source: Box<RunError>,
    },

    #[error("Worker {task} panicked")]
    WorkerPanicked { task: usize },

    #[error("Failed to spawn worker {task}: {source}")]
    Spawn {
        task: usize,
        #[source]
        source: std::io::Error,
    },
}
