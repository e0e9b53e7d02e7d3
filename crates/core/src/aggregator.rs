// crates/core/src/aggregator.rs
//! Hot path: count `(path, date)` pairs in one byte range of the log.

use memchr::{memchr, memchr2, memrchr};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::debug;

use crate::calendar::CalendarIndex;
use crate::error::ScanError;
use crate::matrix::CountMatrix;
use crate::path_index::PathIndex;
use crate::ranges::ByteRange;
use crate::record::{DATE_GAP, DATE_LEN, DELIMITER, TAIL_LEN, URI_PREFIX_LEN};

/// Calendar and path tables, built once before any worker starts and only
/// read afterwards.
#[derive(Debug, Clone)]
pub struct Indexes {
    pub calendar: CalendarIndex,
    pub paths: PathIndex,
}

impl Indexes {
    pub fn new(calendar: CalendarIndex, paths: PathIndex) -> Self {
        Self { calendar, paths }
    }

    /// An all-zero matrix shaped for these tables.
    pub fn empty_matrix(&self) -> CountMatrix {
        CountMatrix::new(self.paths.len(), self.calendar.len())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RangeStats {
    /// Records counted into the matrix.
    pub records: u64,
    /// Non-empty lines that did not fit the record layout or had a date
    /// outside the calendar.
    pub skipped: u64,
    pub bytes: u64,
}

impl RangeStats {
    pub fn absorb(&mut self, other: RangeStats) {
        self.records += other.records;
        self.skipped += other.skipped;
        self.bytes += other.bytes;
    }
}

/// Aggregate one range into a fresh matrix.
pub fn aggregate_range(
    path: &Path,
    range: ByteRange,
    indexes: &Indexes,
    read_chunk: usize,
) -> Result<(CountMatrix, RangeStats), ScanError> {
    let mut matrix = indexes.empty_matrix();
    let stats = RangeAggregator::new(path, indexes, read_chunk).run(range, &mut matrix)?;
    Ok((matrix, stats))
}

/// Reads a range in fixed-size chunks and tokenizes every complete record.
pub struct RangeAggregator<'a> {
    path: &'a Path,
    indexes: &'a Indexes,
    read_chunk: usize,
}

impl<'a> RangeAggregator<'a> {
    pub fn new(path: &'a Path, indexes: &'a Indexes, read_chunk: usize) -> Self {
        Self {
            path,
            indexes,
            read_chunk,
        }
    }

    pub fn run(&self, range: ByteRange, matrix: &mut CountMatrix) -> Result<RangeStats, ScanError> {
        let mut stats = RangeStats::default();
        if range.is_empty() {
            return Ok(stats);
        }

        let io_err = |e| ScanError::io(self.path, e);
        let mut file = File::open(self.path).map_err(io_err)?;
        file.seek(SeekFrom::Start(range.start)).map_err(io_err)?;

        // One spare byte for the newline synthesized after an unterminated
        // final record.
        let mut buf = vec![0u8; self.read_chunk + 1];
        let mut remaining = range.len();
        let mut offset = range.start;

        while remaining > 0 {
            let want = remaining.min(self.read_chunk as u64) as usize;
            let got = read_full(&mut file, &mut buf[..want]).map_err(io_err)?;
            if got == 0 {
                break;
            }
            remaining -= got as u64;

            let mut end = got;
            if remaining == 0 && buf[got - 1] != b'\n' {
                buf[got] = b'\n';
                end += 1;
            }

            let Some(last_newline) = memrchr(b'\n', &buf[..end]) else {
                return Err(ScanError::RecordTooLong {
                    path: self.path.to_path_buf(),
                    offset,
                    chunk: self.read_chunk,
                });
            };

            // Incomplete trailing record: rewind so the next read starts on it.
            let tail = end - last_newline - 1;
            if tail > 0 {
                file.seek(SeekFrom::Current(-(tail as i64))).map_err(io_err)?;
                remaining += tail as u64;
            }

            self.scan(&buf[..=last_newline], offset, matrix, &mut stats)?;
            offset += (last_newline + 1) as u64;
        }

        stats.bytes = range.len();
        debug!(
            start = range.start,
            end = range.end,
            records = stats.records,
            skipped = stats.skipped,
            "Aggregated range"
        );
        Ok(stats)
    }

    /// Tokenize a buffer of whole lines. `base` is the file offset of
    /// `chunk[0]`.
    fn scan(
        &self,
        chunk: &[u8],
        base: u64,
        matrix: &mut CountMatrix,
        stats: &mut RangeStats,
    ) -> Result<(), ScanError> {
        let len = chunk.len();
        let calendar = &self.indexes.calendar;
        let paths = &self.indexes.paths;
        let mut line_start = 0;

        while line_start < len {
            let slug_start = line_start + URI_PREFIX_LEN;

            // First delimiter or newline. The URI prefix holds neither, so a
            // hit before the slug means a short line.
            let hit = match memchr2(DELIMITER, b'\n', &chunk[line_start..]) {
                Some(rel) => line_start + rel,
                None => break,
            };

            if chunk[hit] == DELIMITER && hit >= slug_start {
                let newline = hit + TAIL_LEN;
                if newline < len
                    && chunk[newline] == b'\n'
                    && memchr(b'\n', &chunk[hit + 1..newline]).is_none()
                {
                    let date_start = hit + DATE_GAP;
                    match calendar.decode(&chunk[date_start..date_start + DATE_LEN]) {
                        Some(date) => {
                            let slug = &chunk[slug_start..hit];
                            match paths.get(slug) {
                                Some(path_id) => {
                                    matrix.increment(path_id, date);
                                    stats.records += 1;
                                }
                                // Non-UTF-8 slugs are never interned.
                                None => match std::str::from_utf8(slug) {
                                    Ok(slug) => {
                                        return Err(ScanError::UnknownPath {
                                            path: self.path.to_path_buf(),
                                            slug: slug.to_owned(),
                                            offset: base + line_start as u64,
                                        });
                                    }
                                    Err(_) => stats.skipped += 1,
                                },
                            }
                        }
                        None => stats.skipped += 1,
                    }
                    line_start = newline + 1;
                    continue;
                }
            }

            // Off-layout line: resynchronise on the next newline.
            let newline = if chunk[hit] == b'\n' {
                hit
            } else {
                memchr(b'\n', &chunk[hit..]).map_or(len - 1, |rel| hit + rel)
            };
            if newline > line_start {
                stats.skipped += 1;
            }
            line_start = newline + 1;
        }

        Ok(())
    }
}

/// Fill `buf` unless EOF comes first. Returns the number of bytes read.
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
