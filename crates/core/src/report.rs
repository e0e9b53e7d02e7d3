// crates/core/src/report.rs
//! JSON report: path -> date -> visit count.
//!
//! Paths appear in discovery order and dates in calendar order. Paths with no
//! visits at all and zero cells are left out. The byte layout is stable:
//!
//! ```text
//! {
//!     "\/blog\/p\/alpha": {
//!         "2020-01-05": 2
//!     }
//! }
//! ```

use std::io::{self, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::info;

use crate::aggregator::Indexes;
use crate::error::ReportError;
use crate::matrix::CountMatrix;

/// Literal path segment every slug is reported under.
pub const PATH_KEY_PREFIX: &str = "/blog/";

const WRITE_BUFFER: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportSummary {
    pub paths: usize,
    pub cells: usize,
}

/// Quoted JSON key for a slug, with every `/` written as `\/`.
pub fn escape_path_key(slug: &str) -> String {
    let key = serde_json::Value::String(format!("{PATH_KEY_PREFIX}{slug}"));
    key.to_string().replace('/', "\\/")
}

/// Write the report for `matrix` into `out`.
pub fn render_report<W: Write>(
    out: &mut W,
    matrix: &CountMatrix,
    indexes: &Indexes,
) -> Result<ReportSummary, ReportError> {
    render(out, matrix, indexes).map_err(|e| ReportError::io("<report>", e))
}

/// Write the report to `path` atomically: rendered into a temp file next to
/// it, then renamed over it.
pub fn write_report(
    path: &Path,
    matrix: &CountMatrix,
    indexes: &Indexes,
) -> Result<ReportSummary, ReportError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| ReportError::io(path, e))?;

    let summary = {
        let mut writer = BufWriter::with_capacity(WRITE_BUFFER, tmp.as_file_mut());
        let summary =
            render(&mut writer, matrix, indexes).map_err(|e| ReportError::io(path, e))?;
        writer.flush().map_err(|e| ReportError::io(path, e))?;
        summary
    };

    tmp.persist(path).map_err(|e| ReportError::io(path, e.error))?;
    info!(
        path = %path.display(),
        paths = summary.paths,
        cells = summary.cells,
        "Wrote report"
    );
    Ok(summary)
}

fn render<W: Write>(
    out: &mut W,
    matrix: &CountMatrix,
    indexes: &Indexes,
) -> io::Result<ReportSummary> {
    let calendar = &indexes.calendar;
    let mut summary = ReportSummary::default();

    out.write_all(b"{")?;
    for (path_id, slug) in indexes.paths.iter() {
        let row = matrix.row(path_id);
        if row.iter().all(|&c| c == 0) {
            continue;
        }

        let key = escape_path_key(slug);
        let lead = if summary.paths == 0 { "\n    " } else { ",\n    " };
        write!(out, "{lead}{key}: {{\n")?;

        let mut first_date = true;
        for (date_id, &count) in row.iter().enumerate() {
            if count == 0 {
                continue;
            }
            let label = calendar.label(date_id as u32).unwrap_or_default();
            if !first_date {
                out.write_all(b",\n")?;
            }
            first_date = false;
            write!(out, "        \"{label}\": {count}")?;
            summary.cells += 1;
        }

        out.write_all(b"\n    }")?;
        summary.paths += 1;
    }
    out.write_all(if summary.paths == 0 { b"}" } else { b"\n}" })?;
    Ok(summary)
}
