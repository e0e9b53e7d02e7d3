// crates/core/src/config.rs
//! Run configuration: worker count, read chunk size, discovery prefix and
//! scratch directory.

use std::path::PathBuf;
use tracing::warn;

use crate::error::RunError;

/// Default number of byte ranges (and therefore parallel tasks, counting the
/// coordinator).
pub const DEFAULT_WORKERS: usize = 10;

/// Default aggregation read size: 128KB.
pub const DEFAULT_READ_CHUNK: usize = 128 * 1024;

/// Default size of the file prefix scanned for path discovery: 2MB.
pub const DEFAULT_DISCOVER_BYTES: u64 = 2 * 1024 * 1024;

/// Smallest accepted read chunk: one record with a slug of up to 12 bytes.
/// Records longer than the configured chunk fail the run with
/// `ScanError::RecordTooLong`, so real logs want a much larger chunk.
pub const MIN_READ_CHUNK: usize = 64;

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub workers: usize,
    pub read_chunk: usize,
    /// Path discovery only looks at this many leading bytes of the input.
    /// Paths that first appear later fail the run with `UnknownPath`.
    pub discover_bytes: u64,
    pub temp_dir: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            read_chunk: DEFAULT_READ_CHUNK,
            discover_bytes: DEFAULT_DISCOVER_BYTES,
            temp_dir: std::env::temp_dir(),
        }
    }
}

impl RunConfig {
    /// Defaults overlaid with `VISIT_REPORT_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(n) = parse_var(&lookup, "VISIT_REPORT_WORKERS") {
            self.workers = n;
        }
        if let Some(n) = parse_var(&lookup, "VISIT_REPORT_READ_CHUNK") {
            self.read_chunk = n;
        }
        if let Some(n) = parse_var(&lookup, "VISIT_REPORT_DISCOVER_BYTES") {
            self.discover_bytes = n;
        }
        if let Some(dir) = lookup("VISIT_REPORT_TEMP_DIR").filter(|d| !d.is_empty()) {
            self.temp_dir = PathBuf::from(dir);
        }
        self
    }

    pub fn validate(&self) -> Result<(), RunError> {
        if self.workers == 0 {
            return Err(RunError::InvalidConfig("workers must be at least 1".into()));
        }
        if self.read_chunk < MIN_READ_CHUNK {
            return Err(RunError::InvalidConfig(format!(
                "read chunk must be at least {MIN_READ_CHUNK} bytes, got {}",
                self.read_chunk
            )));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring unparseable environment override");
            None
        }
    }
}
