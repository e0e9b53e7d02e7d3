// crates/core/src/ranges.rs
//! Splitting the input into line-aligned byte ranges, one per worker.

use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;
use tracing::debug;

use crate::error::ScanError;

/// Half-open byte range `[start, end)` of the input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Plan `workers` contiguous ranges covering `[0, file_len)`.
///
/// Each interior boundary is found by jumping to `file_len * i / workers` and
/// skipping past the next newline, so it always sits right after one. Ranges
/// may be empty when the file has fewer lines than workers.
pub fn plan_ranges(path: &Path, workers: usize) -> Result<Vec<ByteRange>, ScanError> {
    let file = File::open(path).map_err(|e| ScanError::io(path, e))?;
    let file_len = file.metadata().map_err(|e| ScanError::io(path, e))?.len();
    let workers = workers.max(1) as u64;

    let mut reader = BufReader::with_capacity(4096, file);
    let mut boundaries = Vec::with_capacity(workers as usize + 1);
    boundaries.push(0u64);

    let mut scratch = Vec::new();
    for i in 1..workers {
        let candidate = (u128::from(file_len) * u128::from(i) / u128::from(workers)) as u64;
        let prev = *boundaries.last().unwrap_or(&0);
        if candidate < prev {
            // Already past this point: the previous line was longer than a slice.
            boundaries.push(prev);
            continue;
        }

        reader
            .seek(SeekFrom::Start(candidate))
            .map_err(|e| ScanError::io(path, e))?;
        scratch.clear();
        let skipped = reader
            .read_until(b'\n', &mut scratch)
            .map_err(|e| ScanError::io(path, e))?;
        boundaries.push((candidate + skipped as u64).min(file_len));
    }
    boundaries.push(file_len);

    let ranges: Vec<ByteRange> = boundaries
        .windows(2)
        .map(|w| ByteRange::new(w[0], w[1]))
        .collect();
    debug!(file_len, ranges = ?ranges, "Planned byte ranges");
    Ok(ranges)
}
