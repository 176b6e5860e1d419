//! # PanMetrics - Log analysis for two-PAN interference simulations
//!
//! This library turns the trace and stat logs written by a discrete-event
//! wireless simulator into delivery metrics for two co-located personal area
//! networks, and reduces many seeded runs to mean and standard-error series.
//!
//! ## Overview
//!
//! Each simulated network has a coordinator and `n` devices. Nodes occupy
//! fixed slots: the PAN coordinators are slots 1 and 2, PAN-1 devices are
//! `3..n+3` and PAN-2 devices are `n+3..2n+3`. All per-slot vectors have
//! `3n` entries.
//!
//! ## Key Features
//!
//! - **Trace analysis**: acknowledgment based PDR and retry ratios per slot
//! - **Stat analysis**: per-PAN PDR, throughput and end-to-end delay
//! - **Sweeps**: runs grouped by distance, offered load, bandwidth or seed
//! - **Reports**: JSON for plotting and a human-readable text summary
//!
//! ## Architecture
//!
//! - `analysis::line_classifier`: tokenizes trace and stat lines into events
//! - `analysis::trace_parser` / `analysis::stat_parser`: per-run parsers
//! - `analysis::formulas`: PDR, retry, loss, success and throughput math
//! - `analysis::aggregator`: cross-run mean and standard error
//! - `analysis::sweep`: parallel batch orchestration
//! - `config`: YAML configuration with defaults and validation
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use panmetrics::analysis::{parse_trace_file, PanLayout, PdrMetric};
//!
//! let run = parse_trace_file(Path::new("run.trace"), PanLayout::new(12), "Mac")?;
//! let metrics = run.delivery_metrics();
//! println!("slot 3 two-way PDR: {}", metrics.slot(3).get(PdrMetric::TwoWayPdr));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod analysis;
pub mod config;

pub use config::{load_config, AnalysisConfig};
