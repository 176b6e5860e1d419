//! Trace and stat log analysis for two-PAN interference simulations.
//!
//! This module turns per-run simulator logs into per-slot delivery metrics
//! and folds many runs into mean and standard-error series.

pub mod types;
pub mod line_classifier;
pub mod retry_ledger;
pub mod counters;
pub mod formulas;
pub mod run_file;
pub mod trace_parser;
pub mod stat_parser;
pub mod position;
pub mod aggregator;
pub mod run_key;
pub mod sweep;
pub mod report;

pub use types::*;
pub use run_file::RunFileError;
pub use trace_parser::{parse_trace, parse_trace_file, TraceRun};
pub use stat_parser::{parse_stat, parse_stat_file, StatRun};
pub use position::{parse_position_file, Position};
pub use aggregator::{device_mean, AggregateError, AggregateSeries, SeriesAggregator};
pub use run_key::{GroupBy, RunKey, SeriesKey};
pub use sweep::{analyze_scenario, discover_runs, ScenarioSeries, SweepOptions};
pub use report::{generate_json_report, generate_text_report, ReportMetadata, SweepReport};
