// crates/core/src/workers.rs
//! Fan the byte ranges out to worker threads and collect their artifacts.
//!
//! `W` ranges run as `W - 1` named threads plus the coordinator, which scans
//! the last range itself. Workers only borrow the frozen [`Indexes`]; each
//! returns its counts through a private artifact file.

use std::path::Path;
use std::thread::{self, ScopedJoinHandle};
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::aggregator::{aggregate_range, Indexes, RangeStats};
use crate::config::RunConfig;
use crate::error::RunError;
use crate::matrix::CountMatrix;
use crate::merge::{merge_partials, PartialResult};
use crate::ranges::ByteRange;
use crate::wire::write_partial;

type WorkerHandle<'scope> = ScopedJoinHandle<'scope, Result<RangeStats, RunError>>;

/// Aggregate every range and reduce to one matrix.
pub fn aggregate_ranges(
    input: &Path,
    ranges: &[ByteRange],
    indexes: &Indexes,
    config: &RunConfig,
) -> Result<(CountMatrix, RangeStats), RunError> {
    let Some((own, delegated)) = ranges.split_last() else {
        return Ok((indexes.empty_matrix(), RangeStats::default()));
    };
    let run_id = Uuid::new_v4().simple().to_string();
    let read_chunk = config.read_chunk;

    thread::scope(|scope| -> Result<(CountMatrix, RangeStats), RunError> {
        let mut failure: Option<RunError> = None;
        let mut pending: Vec<(PartialResult, WorkerHandle<'_>)> =
            Vec::with_capacity(delegated.len());

        for (task, &range) in delegated.iter().enumerate() {
            let partial = PartialResult::for_task(&config.temp_dir, &run_id, task);
            let artifact = partial.path.clone();
            let spawned = thread::Builder::new()
                .name(format!("visit-worker-{task}"))
                .spawn_scoped(scope, move || {
                    run_task(input, range, indexes, read_chunk, &artifact)
                });
            match spawned {
                Ok(handle) => pending.push((partial, handle)),
                Err(source) => {
                    failure = Some(RunError::Spawn { task, source });
                    break;
                }
            }
        }
        debug!(workers = pending.len(), run_id = %run_id, "Spawned workers");

        let mut total = indexes.empty_matrix();
        let mut stats = RangeStats::default();
        if failure.is_none() {
            match aggregate_range(input, *own, indexes, read_chunk) {
                Ok((matrix, own_stats)) => {
                    total = matrix;
                    stats = own_stats;
                }
                Err(e) => failure = Some(e.into()),
            }
        }

        // Poll for any finished worker, otherwise block on the oldest.
        let mut finished = Vec::with_capacity(pending.len());
        while !pending.is_empty() {
            let next = pending
                .iter()
                .position(|(_, handle)| handle.is_finished())
                .unwrap_or(0);
            let (partial, handle) = pending.remove(next);
            let task = partial.task;

            match handle.join() {
                Ok(Ok(task_stats)) => {
                    debug!(task, records = task_stats.records, "Worker finished");
                    stats.absorb(task_stats);
                    finished.push(partial);
                }
                Ok(Err(e)) => {
                    partial.discard();
                    failure.get_or_insert(RunError::WorkerFailed {
                        task,
                        source: Box::new(e),
                    });
                }
                Err(_) => {
                    partial.discard();
                    failure.get_or_insert(RunError::WorkerPanicked { task });
                }
            }
        }

        if let Some(e) = failure {
            finished.into_iter().for_each(PartialResult::discard);
            return Err(e);
        }

        let started = Instant::now();
        let artifacts = finished.len();
        let pairs = merge_partials(finished, &mut total)?;
        info!(
            artifacts,
            pairs,
            records = stats.records,
            merge_ms = started.elapsed().as_millis() as u64,
            "Merged partial results"
        );
        Ok((total, stats))
    })
}

/// Body of one worker: aggregate, then hand the counts over on disk.
fn run_task(
    input: &Path,
    range: ByteRange,
    indexes: &Indexes,
    read_chunk: usize,
    artifact: &Path,
) -> Result<RangeStats, RunError> {
    let (matrix, stats) = aggregate_range(input, range, indexes, read_chunk)?;
    write_partial(artifact, &matrix)?;
    Ok(stats)
}
