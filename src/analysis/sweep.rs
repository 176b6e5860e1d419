//! Batch analysis of a parameter sweep.
//!
//! Run files in one directory are discovered by scenario prefix, parsed in
//! parallel, and folded into one series per metric keyed by the chosen
//! experiment parameter.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use color_eyre::eyre::{Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::aggregator::{AggregateError, AggregateSeries, SeriesAggregator, MEAN_DECIMALS};
use super::position::{parse_position_file, Position};
use super::run_key::{FileKind, GroupBy, RunKey, SeriesKey};
use super::stat_parser::parse_stat_file;
use super::trace_parser::parse_trace_file;
use super::types::*;

/// Parameters shared by every run in a sweep
#[derive(Debug, Clone)]
pub struct SweepOptions {
    pub layout: PanLayout,
    pub layer_marker: String,
    pub sim_duration: Duration,
    pub group_by: GroupBy,
}

/// A run file whose name matched a known convention
#[derive(Debug, Clone, PartialEq)]
pub struct RunFile {
    pub key: RunKey,
    pub path: PathBuf,
}

/// Find the run files of one scenario, sorted by path.
///
/// Names that match no convention are skipped with a warning; names from
/// other scenarios are skipped silently.
pub fn discover_runs(dir: &Path, scenario: &str) -> Result<Vec<RunFile>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read input directory {}", dir.display()))?;

    let mut runs = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("Failed to list {}", dir.display()))?
            .path();
        if !path.is_file() {
            continue;
        }
        let is_run_file = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("trace" | "stat" | "pos")
        );
        if !is_run_file {
            continue;
        }
        match RunKey::from_path(&path) {
            Some(key) if key.scenario == scenario => runs.push(RunFile { key, path }),
            Some(_) => {}
            None => log::warn!("Skipping {}: unrecognized run file name", path.display()),
        }
    }
    runs.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(runs)
}

/// Per-slot and per-PAN series for one link ratio mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSeries {
    pub slots: BTreeMap<LinkDirection, AggregateSeries<SeriesKey>>,
    /// Two entries per point: PAN-1 then PAN-2
    pub pans: BTreeMap<LinkDirection, AggregateSeries<SeriesKey>>,
}

/// Initial node placement for one configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSet {
    pub key: SeriesKey,
    pub seed: u32,
    pub nodes: BTreeMap<NodeSlot, Position>,
}

/// Every series produced for one scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSeries {
    pub scenario: String,
    pub group_by: GroupBy,
    pub trace_runs: usize,
    pub stat_runs: usize,
    /// Files that could not be read, or whose runs were rejected
    pub skipped_files: usize,
    pub delivery: BTreeMap<PdrMetric, AggregateSeries<SeriesKey>>,
    pub loss: LinkSeries,
    pub success: LinkSeries,
    pub stat_scalars: BTreeMap<StatMetric, AggregateSeries<SeriesKey>>,
    pub end_to_end_delay: AggregateSeries<SeriesKey>,
    pub positions: Vec<PositionSet>,
}

/// Metric vectors extracted from one parsed file
#[derive(Debug)]
enum ParsedRun {
    Trace {
        metrics: RunMetrics,
        loss: LinkRatioSet,
        success: LinkRatioSet,
    },
    Stat(RunSummary),
    Position(BTreeMap<NodeSlot, Position>),
}

fn parse_run(run: &RunFile, options: &SweepOptions) -> Option<ParsedRun> {
    let parsed = match run.key.kind {
        FileKind::Trace => parse_trace_file(&run.path, options.layout, &options.layer_marker).map(|trace| {
            ParsedRun::Trace {
                metrics: trace.delivery_metrics(),
                loss: trace.loss_ratios(),
                success: trace.success_ratios(),
            }
        }),
        FileKind::Stat => parse_stat_file(&run.path, options.layout, &options.layer_marker)
            .map(|stat| ParsedRun::Stat(stat.summarize(options.sim_duration))),
        FileKind::Position => parse_position_file(&run.path).map(ParsedRun::Position),
    };
    match parsed {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            log::warn!("Failed to parse {}: {}", run.path.display(), e);
            None
        }
    }
}

/// Link ratio aggregators for one mode
struct LinkAggregators {
    slots: BTreeMap<LinkDirection, SeriesAggregator<SeriesKey>>,
    pans: BTreeMap<LinkDirection, SeriesAggregator<SeriesKey>>,
}

impl LinkAggregators {
    fn new() -> Self {
        let make = || {
            LinkDirection::ALL
                .into_iter()
                .map(|d| (d, SeriesAggregator::rounded(MEAN_DECIMALS)))
                .collect()
        };
        Self { slots: make(), pans: make() }
    }

    fn check_width(&self, key: &SeriesKey, ratios: &LinkRatioSet) -> Result<(), AggregateError> {
        for agg in self.slots.values() {
            agg.check_width(key, ratios.slots.len())?;
        }
        for agg in self.pans.values() {
            agg.check_width(key, ratios.pans.len())?;
        }
        Ok(())
    }

    fn push(&mut self, key: SeriesKey, ratios: &LinkRatioSet) -> Result<(), AggregateError> {
        for direction in LinkDirection::ALL {
            if let Some(agg) = self.slots.get_mut(&direction) {
                agg.push(key, ratios.column(direction))?;
            }
            if let Some(agg) = self.pans.get_mut(&direction) {
                agg.push(key, Pan::ALL.iter().map(|&p| ratios.pan(p).get(direction)).collect())?;
            }
        }
        Ok(())
    }

    fn finish(&self) -> LinkSeries {
        LinkSeries {
            slots: self.slots.iter().map(|(d, agg)| (*d, agg.finish())).collect(),
            pans: self.pans.iter().map(|(d, agg)| (*d, agg.finish())).collect(),
        }
    }
}

/// Fold runs into series
struct ScenarioAggregator {
    delivery: BTreeMap<PdrMetric, SeriesAggregator<SeriesKey>>,
    loss: LinkAggregators,
    success: LinkAggregators,
    stat_scalars: BTreeMap<StatMetric, SeriesAggregator<SeriesKey>>,
    end_to_end_delay: SeriesAggregator<SeriesKey>,
    positions: BTreeMap<SeriesKey, (u32, BTreeMap<NodeSlot, Position>)>,
    trace_runs: usize,
    stat_runs: usize,
}

impl ScenarioAggregator {
    fn new() -> Self {
        Self {
            delivery: PdrMetric::ALL
                .into_iter()
                .map(|m| (m, SeriesAggregator::rounded(MEAN_DECIMALS)))
                .collect(),
            loss: LinkAggregators::new(),
            success: LinkAggregators::new(),
            stat_scalars: StatMetric::ALL
                .into_iter()
                .map(|m| (m, SeriesAggregator::new()))
                .collect(),
            end_to_end_delay: SeriesAggregator::rounded(MEAN_DECIMALS),
            positions: BTreeMap::new(),
            trace_runs: 0,
            stat_runs: 0,
        }
    }

    /// Fold one run into every series it feeds, or into none of them
    fn add(&mut self, key: SeriesKey, seed: u32, run: ParsedRun) -> Result<(), AggregateError> {
        match run {
            ParsedRun::Trace { metrics, loss, success } => {
                for agg in self.delivery.values() {
                    agg.check_width(&key, metrics.slots.len())?;
                }
                self.loss.check_width(&key, &loss)?;
                self.success.check_width(&key, &success)?;

                for (metric, agg) in self.delivery.iter_mut() {
                    agg.push(key, metrics.column(*metric))?;
                }
                self.loss.push(key, &loss)?;
                self.success.push(key, &success)?;
                self.trace_runs += 1;
            }
            ParsedRun::Stat(summary) => {
                for agg in self.stat_scalars.values() {
                    agg.check_width(&key, 1)?;
                }
                self.end_to_end_delay.check_width(&key, summary.end_to_end_delay.len())?;

                for (metric, agg) in self.stat_scalars.iter_mut() {
                    agg.push_scalar(key, summary.scalar(*metric))?;
                }
                self.end_to_end_delay.push(key, summary.end_to_end_delay)?;
                self.stat_runs += 1;
            }
            ParsedRun::Position(nodes) => {
                // Lowest seed wins; placements are identical across seeds
                let replace = self.positions.get(&key).map_or(true, |(s, _)| seed < *s);
                if replace {
                    self.positions.insert(key, (seed, nodes));
                }
            }
        }
        Ok(())
    }

    fn finish(self, scenario: &str, group_by: GroupBy, skipped_files: usize) -> ScenarioSeries {
        ScenarioSeries {
            scenario: scenario.to_string(),
            group_by,
            trace_runs: self.trace_runs,
            stat_runs: self.stat_runs,
            skipped_files,
            delivery: self.delivery.iter().map(|(m, agg)| (*m, agg.finish())).collect(),
            loss: self.loss.finish(),
            success: self.success.finish(),
            stat_scalars: self.stat_scalars.iter().map(|(m, agg)| (*m, agg.finish())).collect(),
            end_to_end_delay: self.end_to_end_delay.finish(),
            positions: self
                .positions
                .into_iter()
                .map(|(key, (seed, nodes))| PositionSet { key, seed, nodes })
                .collect(),
        }
    }
}

/// Parse and fold an already discovered set of runs
pub fn analyze_runs(scenario: &str, runs: &[RunFile], options: &SweepOptions) -> ScenarioSeries {
    let expected_devices = options.layout.devices_per_pan;
    let usable: Vec<(&RunFile, SeriesKey)> = runs
        .iter()
        .filter_map(|run| {
            if let Some(n) = run.key.devices_per_pan.filter(|&n| n != expected_devices) {
                log::warn!(
                    "Skipping {}: {} devices per PAN, layout expects {}",
                    run.path.display(),
                    n,
                    expected_devices
                );
                return None;
            }
            match run.key.series_key(options.group_by) {
                Some(key) => Some((run, key)),
                None => {
                    log::warn!(
                        "Skipping {}: name carries no {:?} parameter",
                        run.path.display(),
                        options.group_by
                    );
                    None
                }
            }
        })
        .collect();

    log::info!("Parsing {} run files for scenario '{}' in parallel...", usable.len(), scenario);

    let parsed: Vec<(SeriesKey, u32, &Path, ParsedRun)> = usable
        .par_iter()
        .filter_map(|(run, key)| {
            parse_run(run, options).map(|parsed| (*key, run.key.seed, run.path.as_path(), parsed))
        })
        .collect();

    let mut skipped_files = runs.len() - parsed.len();
    let mut aggregator = ScenarioAggregator::new();
    for (key, seed, path, run) in parsed {
        if let Err(e) = aggregator.add(key, seed, run) {
            log::warn!("Rejected {}: {}", path.display(), e);
            skipped_files += 1;
        }
    }

    let series = aggregator.finish(scenario, options.group_by, skipped_files);
    log::info!(
        "Scenario '{}': {} trace runs, {} stat runs, {} files skipped",
        scenario,
        series.trace_runs,
        series.stat_runs,
        series.skipped_files
    );
    series
}

/// Discover, parse and fold every run of `scenario` found in `dir`
pub fn analyze_scenario(dir: &Path, scenario: &str, options: &SweepOptions) -> Result<ScenarioSeries> {
    let runs = discover_runs(dir, scenario)?;
    log::info!("Found {} run files for scenario '{}'", runs.len(), scenario);
    Ok(analyze_runs(scenario, &runs, options))
}
