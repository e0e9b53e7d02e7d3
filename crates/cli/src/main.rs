// crates/cli/src/main.rs
//! visit-report binary.
//!
//! Counts blog visits per path and day in a web access log and writes the
//! nested JSON report.
//!
//! ```bash
//! visit-report access.log report.json --workers 8
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use visit_report_core::{run, JsonVisitFile, NoVisits, RunConfig, VisitSource};

/// Aggregate blog visits per path and day.
#[derive(Parser, Debug)]
#[command(name = "visit-report", version)]
#[command(about = "Aggregate web access log visits into a per-path, per-day JSON report")]
struct Args {
    /// Access log: one `<uri>,<timestamp>` record per line
    input: PathBuf,

    /// Where to write the JSON report (replaced atomically)
    output: PathBuf,

    /// JSON array of supplementary visits ({"uri", "visitedAt"?})
    #[arg(long)]
    visits: Option<PathBuf>,

    /// Number of byte ranges scanned in parallel
    #[arg(long, env = "VISIT_REPORT_WORKERS")]
    workers: Option<usize>,

    /// Read size per aggregation chunk, in bytes
    #[arg(long, env = "VISIT_REPORT_READ_CHUNK")]
    read_chunk: Option<usize>,

    /// Leading bytes of the input scanned to discover paths
    #[arg(long, env = "VISIT_REPORT_DISCOVER_BYTES")]
    discover_bytes: Option<u64>,

    /// Directory for worker artifacts
    #[arg(long, env = "VISIT_REPORT_TEMP_DIR")]
    temp_dir: Option<PathBuf>,
}

impl Args {
    fn config(&self) -> RunConfig {
        let mut config = RunConfig::from_env();
        if let Some(n) = self.workers {
            config.workers = n;
        }
        if let Some(n) = self.read_chunk {
            config.read_chunk = n;
        }
        if let Some(n) = self.discover_bytes {
            config.discover_bytes = n;
        }
        if let Some(dir) = &self.temp_dir {
            config.temp_dir = dir.clone();
        }
        config
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,visit_report=info,visit_report_core=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match execute(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("visit-report: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn execute(args: Args) -> Result<()> {
    let config = args.config();
    let mut source: Box<dyn VisitSource> = match &args.visits {
        Some(path) => Box::new(JsonVisitFile::new(path)),
        None => Box::new(NoVisits),
    };

    let summary = run(&args.input, &args.output, source.as_mut(), &config).with_context(|| {
        format!(
            "failed to aggregate {} into {}",
            args.input.display(),
            args.output.display()
        )
    })?;

    info!(
        paths = summary.paths,
        dates = summary.dates,
        ranges = summary.ranges,
        records = summary.records,
        skipped = summary.skipped,
        supplementary = summary.supplementary_folded,
        reported_paths = summary.report.paths,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "Report complete"
    );
    Ok(())
}
