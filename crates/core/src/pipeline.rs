// crates/core/src/pipeline.rs
//! End-to-end run: indexes, ranges, parallel aggregation, report.

use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::aggregator::{Indexes, RangeStats};
use crate::calendar::CalendarIndex;
use crate::config::RunConfig;
use crate::error::RunError;
use crate::matrix::CountMatrix;
use crate::path_index::PathIndex;
use crate::ranges::plan_ranges;
use crate::record::slug_from_uri;
use crate::report::{write_report, ReportSummary};
use crate::source::{SourceVisit, VisitSource};
use crate::workers::aggregate_ranges;

/// Merged counts plus everything needed to interpret them.
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub indexes: Indexes,
    pub matrix: CountMatrix,
    pub stats: RangeStats,
    pub ranges: usize,
    /// Supplementary visits counted into the matrix.
    pub folded: u64,
    /// Supplementary visits with a timestamp outside the calendar.
    pub unfolded: u64,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub paths: usize,
    pub dates: usize,
    pub ranges: usize,
    pub records: u64,
    pub skipped: u64,
    pub supplementary_folded: u64,
    pub report: ReportSummary,
    pub elapsed: Duration,
}

/// Build the frozen indexes. The source is drained here, exactly once.
pub fn build_indexes(
    input: &Path,
    source: &mut dyn VisitSource,
    config: &RunConfig,
) -> Result<(Indexes, Vec<SourceVisit>), RunError> {
    let calendar = CalendarIndex::new();

    let mut paths = PathIndex::new();
    paths.discover(input, config.discover_bytes)?;

    let visits = source.drain()?;
    let added = paths.extend_from_visits(&visits);
    info!(
        dates = calendar.len(),
        paths = paths.len(),
        from_source = added,
        visits = visits.len(),
        "Built indexes"
    );

    Ok((Indexes::new(calendar, paths), visits))
}

/// Count every record of `input`, plus dated supplementary visits.
pub fn aggregate(
    input: &Path,
    source: &mut dyn VisitSource,
    config: &RunConfig,
) -> Result<Aggregation, RunError> {
    config.validate()?;
    let (indexes, visits) = build_indexes(input, source, config)?;

    let ranges = plan_ranges(input, config.workers)?;
    info!(ranges = ranges.len(), "Planned ranges");

    let (mut matrix, stats) = aggregate_ranges(input, &ranges, &indexes, config)?;
    if stats.skipped > 0 {
        warn!(skipped = stats.skipped, "Skipped records that did not match the log layout");
    }

    let (folded, unfolded) = fold_visits(&visits, &indexes, &mut matrix);
    if unfolded > 0 {
        warn!(unfolded, "Supplementary visits with undecodable dates only contributed paths");
    }

    Ok(Aggregation {
        indexes,
        matrix,
        stats,
        ranges: ranges.len(),
        folded,
        unfolded,
    })
}

/// Aggregate `input` and write the report to `output`.
pub fn run(
    input: &Path,
    output: &Path,
    source: &mut dyn VisitSource,
    config: &RunConfig,
) -> Result<RunSummary, RunError> {
    let started = Instant::now();
    let agg = aggregate(input, source, config)?;
    let report = write_report(output, &agg.matrix, &agg.indexes)?;

    Ok(RunSummary {
        paths: agg.indexes.paths.len(),
        dates: agg.indexes.calendar.len(),
        ranges: agg.ranges,
        records: agg.stats.records,
        skipped: agg.stats.skipped,
        supplementary_folded: agg.folded,
        report,
        elapsed: started.elapsed(),
    })
}

fn fold_visits(visits: &[SourceVisit], indexes: &Indexes, matrix: &mut CountMatrix) -> (u64, u64) {
    let mut folded = 0;
    let mut unfolded = 0;
    for visit in visits {
        let Some(visited_at) = visit.visited_at.as_deref() else {
            continue;
        };
        let date = indexes.calendar.decode_timestamp(visited_at);
        let path = slug_from_uri(&visit.uri).and_then(|slug| indexes.paths.get(slug.as_bytes()));
        match (path, date) {
            (Some(path), Some(date)) => {
                matrix.increment(path, date);
                folded += 1;
            }
            _ => unfolded += 1,
        }
    }
    (folded, unfolded)
}
