//! Report generation for sweep analysis.
//!
//! Generates both JSON and human-readable text reports.

use std::fs;
use std::path::Path;

use color_eyre::eyre::{Context, Result};
use serde::{Deserialize, Serialize};

use super::aggregator::{device_mean, AggregateSeries};
use super::run_key::{GroupBy, SeriesKey};
use super::sweep::ScenarioSeries;
use super::types::*;

/// Complete sweep report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepReport {
    pub metadata: ReportMetadata,
    pub scenarios: Vec<ScenarioSeries>,
}

/// Report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub analysis_timestamp: String,
    pub input_dir: String,
    pub devices_per_pan: usize,
    pub sim_duration_secs: f64,
    pub layer_marker: String,
    pub group_by: GroupBy,
}

impl SweepReport {
    pub fn layout(&self) -> PanLayout {
        PanLayout::new(self.metadata.devices_per_pan)
    }
}

/// Generate JSON report
pub fn generate_json_report(report: &SweepReport, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)
        .context("Failed to serialize report to JSON")?;

    fs::write(output_path, json)
        .with_context(|| format!("Failed to write JSON report to {}", output_path.display()))?;

    log::info!("JSON report written to {}", output_path.display());
    Ok(())
}

fn device_means(series: &AggregateSeries<SeriesKey>, layout: &PanLayout) -> Vec<(SeriesKey, f64)> {
    series
        .points
        .iter()
        .map(|p| (p.key, device_mean(&p.mean, layout)))
        .collect()
}

fn banner(lines: &mut Vec<String>, title: &str) {
    lines.push("=".repeat(80));
    lines.push(format!("{:^80}", title));
    lines.push("=".repeat(80));
    lines.push(String::new());
}

/// Render the text report body
pub fn render_text_report(report: &SweepReport) -> String {
    let layout = report.layout();
    let mut lines: Vec<String> = Vec::new();

    banner(&mut lines, "TWO-PAN INTERFERENCE SWEEP ANALYSIS");

    lines.push(format!("Analysis Date: {}", report.metadata.analysis_timestamp));
    lines.push(format!("Data Directory: {}", report.metadata.input_dir));
    lines.push(format!("Devices per PAN: {}", report.metadata.devices_per_pan));
    lines.push(format!("Simulation Duration: {:.1}s", report.metadata.sim_duration_secs));
    lines.push(format!("Grouped By: {:?}", report.metadata.group_by));
    lines.push(String::new());

    for scenario in &report.scenarios {
        banner(&mut lines, &format!("SCENARIO: {}", scenario.scenario));

        lines.push(format!(
            "Runs: {} trace, {} stat ({} files skipped)",
            scenario.trace_runs, scenario.stat_runs, scenario.skipped_files
        ));
        lines.push(String::new());

        if scenario.stat_runs > 0 {
            lines.push("Network Delivery (stat files):".to_string());
            let pdr1 = &scenario.stat_scalars[&StatMetric::Pan1Pdr];
            let pdr2 = &scenario.stat_scalars[&StatMetric::Pan2Pdr];
            let tput1 = &scenario.stat_scalars[&StatMetric::Pan1ThroughputKbps];
            let tput2 = &scenario.stat_scalars[&StatMetric::Pan2ThroughputKbps];
            for key in pdr1.keys() {
                let (p1, p1_se) = pdr1.scalar(key).unwrap_or_default();
                let (p2, p2_se) = pdr2.scalar(key).unwrap_or_default();
                let (t1, _) = tput1.scalar(key).unwrap_or_default();
                let (t2, _) = tput2.scalar(key).unwrap_or_default();
                lines.push(format!(
                    "  {:<18} PDR {:.3} ± {:.3} / {:.3} ± {:.3}   throughput {:.2} / {:.2} kbps",
                    key.to_string(),
                    p1,
                    p1_se,
                    p2,
                    p2_se,
                    t1,
                    t2
                ));
            }
            lines.push(String::new());

            lines.push("End-to-End Delay (device average):".to_string());
            for (key, mean) in device_means(&scenario.end_to_end_delay, &layout) {
                lines.push(format!("  {:<18} {:.4}s", key.to_string(), mean));
            }
            lines.push(String::new());
        }

        if scenario.trace_runs > 0 {
            lines.push("Acknowledged Delivery (trace files, device average):".to_string());
            for (metric, series) in &scenario.delivery {
                lines.push(format!("  {}:", metric.name()));
                for (key, mean) in device_means(series, &layout) {
                    lines.push(format!("    {:<18} {:.3}", key.to_string(), mean));
                }
            }
            lines.push(String::new());

            for (label, link) in [("Loss", &scenario.loss), ("Success", &scenario.success)] {
                lines.push(format!("{} Ratios per PAN (PAN-1 / PAN-2):", label));
                for (direction, series) in &link.pans {
                    for point in &series.points {
                        lines.push(format!(
                            "  {:<9} {:<18} {:.2} / {:.2}",
                            format!("{:?}", direction),
                            point.key.to_string(),
                            point.mean.first().copied().unwrap_or_default(),
                            point.mean.get(1).copied().unwrap_or_default()
                        ));
                    }
                }
                lines.push(String::new());
            }
        }

        if !scenario.positions.is_empty() {
            lines.push("Node Placement:".to_string());
            for set in &scenario.positions {
                lines.push(format!(
                    "  {} (seed {}): {} nodes",
                    set.key,
                    set.seed,
                    set.nodes.len()
                ));
            }
            lines.push(String::new());
        }
    }

    lines.push("=".repeat(80));
    lines.join("\n")
}

/// Generate human-readable text report
pub fn generate_text_report(report: &SweepReport, output_path: &Path) -> Result<()> {
    let content = render_text_report(report);
    fs::write(output_path, content)
        .with_context(|| format!("Failed to write text report to {}", output_path.display()))?;

    log::info!("Text report written to {}", output_path.display());
    Ok(())
}

/// Print a summary to stdout
pub fn print_summary(report: &SweepReport) {
    let layout = report.layout();
    println!("\n=== TWO-PAN SWEEP ANALYSIS SUMMARY ===\n");
    println!("Devices per PAN: {}", report.metadata.devices_per_pan);
    println!("Grouped by: {:?}", report.metadata.group_by);

    for scenario in &report.scenarios {
        println!("\nScenario {}:", scenario.scenario);
        println!("  Runs: {} trace, {} stat", scenario.trace_runs, scenario.stat_runs);
        if scenario.skipped_files > 0 {
            println!("  Skipped files: {}", scenario.skipped_files);
        }

        let pdr1 = &scenario.stat_scalars[&StatMetric::Pan1Pdr];
        let pdr2 = &scenario.stat_scalars[&StatMetric::Pan2Pdr];
        for key in pdr1.keys() {
            println!(
                "  {}: PAN-1 PDR {:.3}, PAN-2 PDR {:.3}",
                key,
                pdr1.scalar(key).unwrap_or_default().0,
                pdr2.scalar(key).unwrap_or_default().0
            );
        }

        let two_way = &scenario.delivery[&PdrMetric::TwoWayPdr];
        for (key, mean) in device_means(two_way, &layout) {
            println!("  {}: two-way PDR (device average) {:.3}", key, mean);
        }
    }

    println!();
}
