// crates/core/src/lib.rs
pub mod aggregator;
pub mod calendar;
pub mod config;
pub mod error;
pub mod matrix;
pub mod merge;
pub mod path_index;
pub mod pipeline;
pub mod ranges;
pub mod record;
pub mod report;
pub mod source;
pub mod wire;
pub mod workers;

pub use aggregator::{aggregate_range, Indexes, RangeAggregator, RangeStats};
pub use calendar::{CalendarIndex, DateId};
pub use config::RunConfig;
pub use error::*;
pub use matrix::CountMatrix;
pub use path_index::{PathId, PathIndex};
pub use pipeline::{aggregate, build_indexes, run, Aggregation, RunSummary};
pub use ranges::{plan_ranges, ByteRange};
pub use report::{render_report, write_report, ReportSummary};
pub use source::{JsonVisitFile, NoVisits, SourceVisit, StaticVisits, VisitSource};
