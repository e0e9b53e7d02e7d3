// crates/core/src/merge.rs
//! Reduce step: fold worker artifacts into the coordinator's matrix.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::WireError;
use crate::matrix::CountMatrix;
use crate::wire::read_partial;

/// A worker's artifact on disk, owned by that worker until the coordinator
/// consumes it.
#[derive(Debug)]
pub struct PartialResult {
    pub task: usize,
    pub path: PathBuf,
}

impl PartialResult {
    /// Artifact for `task` of run `run_id` inside `dir`.
    ///
    /// The process id and run id keep concurrent runs sharing a temp
    /// directory apart.
    pub fn for_task(dir: &Path, run_id: &str, task: usize) -> Self {
        let name = format!("visit-report-{}-{run_id}-{task}.part", std::process::id());
        Self {
            task,
            path: dir.join(name),
        }
    }

    /// Add the artifact into `into`, then delete it. The file is removed
    /// even when decoding fails.
    pub fn consume(self, into: &mut CountMatrix) -> Result<u32, WireError> {
        let result = read_partial(&self.path, into);
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "Failed to remove partial artifact");
            }
        }
        if let Ok(pairs) = &result {
            debug!(task = self.task, pairs, "Merged partial artifact");
        }
        result
    }

    /// Delete the artifact without reading it.
    pub fn discard(self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(task = self.task, "Discarded partial artifact"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove partial artifact"
            ),
        }
    }
}

/// Consume every artifact into `into`. Stops at the first failure after
/// discarding the remaining artifacts.
pub fn merge_partials(
    partials: impl IntoIterator<Item = PartialResult>,
    into: &mut CountMatrix,
) -> Result<u64, WireError> {
    let mut partials = partials.into_iter();
    let mut pairs = 0u64;
    while let Some(partial) = partials.next() {
        match partial.consume(into) {
            Ok(n) => pairs += u64::from(n),
            Err(e) => {
                partials.for_each(PartialResult::discard);
                return Err(e);
            }
        }
    }
    Ok(pairs)
}
