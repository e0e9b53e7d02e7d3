// crates/core/src/record.rs
//! Fixed-offset record schema for the access log.
//!
//! One record per line:
//!
//! ```text
//! https://stitcher.io/blog/<slug>,2024-01-24T01:16:58+00:00\n
//! |------- 25 bytes ------|      |------- 25 bytes -------|
//! ```
//!
//! The slug starts 25 bytes into the line and runs to the first `,`. The
//! timestamp after the delimiter has a fixed width, so the newline always sits
//! [`TAIL_LEN`] bytes past the delimiter and the next slug starts
//! [`RECORD_STRIDE`] bytes past it, whatever the slug length.

/// URI scheme and host prefix every record (and every supplementary URI)
/// starts with.
pub const URI_PREFIX: &str = "https://stitcher.io/blog/";
pub const URI_PREFIX_LEN: usize = URI_PREFIX.len();

pub const DELIMITER: u8 = b',';

/// Offset of the `YY-MM-DD` token from the delimiter (skips `,20`).
pub const DATE_GAP: usize = 3;
pub const DATE_LEN: usize = 8;

/// `YYYY-MM-DDTHH:MM:SS+00:00`
pub const TIMESTAMP_LEN: usize = 25;

/// Distance from the delimiter to the terminating newline.
pub const TAIL_LEN: usize = 1 + TIMESTAMP_LEN;

/// Distance from one record's delimiter to the next record's slug.
pub const RECORD_STRIDE: usize = TAIL_LEN + 1 + URI_PREFIX_LEN;

/// Shortest well-formed line (empty slug), newline excluded.
pub const MIN_LINE_LEN: usize = URI_PREFIX_LEN + TAIL_LEN;

/// A decoded record, borrowing from the line it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record<'a> {
    pub slug: &'a str,
    /// `YY-MM-DD`
    pub date: &'a [u8],
}

impl<'a> Record<'a> {
    /// Bounds-checked decode of one line (without its newline).
    ///
    /// The delimiter must sit [`TAIL_LEN`] bytes before the line end and be
    /// the first `,` on the line, which is what the stride-based scanner in
    /// the aggregator assumes. The slug must be valid UTF-8.
    pub fn parse(line: &'a [u8]) -> Option<Self> {
        if line.len() < MIN_LINE_LEN {
            return None;
        }
        let delimiter = line.len() - TAIL_LEN;
        if line[delimiter] != DELIMITER || memchr::memchr(DELIMITER, &line[..delimiter]).is_some() {
            return None;
        }
        let slug = std::str::from_utf8(&line[URI_PREFIX_LEN..delimiter]).ok()?;
        let date_start = delimiter + DATE_GAP;
        Some(Self {
            slug,
            date: &line[date_start..date_start + DATE_LEN],
        })
    }
}

/// Slug of a supplementary URI: everything after the fixed prefix.
///
/// `None` when the URI is shorter than the prefix or the prefix length does
/// not fall on a character boundary.
pub fn slug_from_uri(uri: &str) -> Option<&str> {
    uri.get(URI_PREFIX_LEN..)
}

/// Render one log line. Used for fixtures and by anything that needs to
/// produce logs in the same shape.
pub fn format_record(slug: &str, timestamp: &str) -> String {
    format!("{URI_PREFIX}{slug},{timestamp}\n")
}
