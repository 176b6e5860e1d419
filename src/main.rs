//! Trace and stat log analysis CLI for two-PAN interference simulations.
//!
//! Inspects single trace, stat or position files, or analyzes a whole
//! parameter sweep and writes JSON and text reports.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Context, Result};

use panmetrics::analysis::{
    self,
    position::parse_position_file,
    report::print_summary,
    GroupBy, LinkDirection, Pan, PdrMetric, ReportMetadata, SweepOptions, SweepReport,
};
use panmetrics::config::{load_config, AnalysisConfig};

#[derive(Parser)]
#[command(name = "panmetrics")]
#[command(about = "Trace and stat log analysis for two-PAN interference simulations")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory containing run files (overrides config)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output directory for reports (overrides config)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Devices per PAN (overrides config)
    #[arg(long)]
    devices_per_pan: Option<usize>,

    /// Simulated duration used for throughput, e.g. "30s" (overrides config)
    #[arg(long, value_parser = parse_duration)]
    sim_duration: Option<Duration>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Number of parallel workers (0 = auto-detect)
    #[arg(short = 'j', long, default_value = "0")]
    threads: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Per-slot PDR and retry ratios from one trace file
    Trace {
        file: PathBuf,
    },

    /// Per-PAN PDR, throughput and delay from one stat file
    Stat {
        file: PathBuf,
    },

    /// Initial node positions from one position file
    Positions {
        file: PathBuf,
    },

    /// Analyze every run in the input directory
    Sweep {
        /// Experiment parameter runs are grouped by
        #[arg(long, value_enum, default_value_t = GroupBy::Distance)]
        group_by: GroupBy,
    },
}

/// Parse a human-readable duration such as "30s" or "1m 10s"
fn parse_duration(s: &str) -> Result<Duration, String> {
    use serde::de::value::{Error, StrDeserializer};
    use serde::de::IntoDeserializer;

    let deserializer: StrDeserializer<Error> = s.into_deserializer();
    humantime_serde::deserialize(deserializer).map_err(|e: Error| e.to_string())
}

impl Cli {
    /// Load the configuration file, if any, and apply command line overrides
    fn resolve_config(&self) -> Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => AnalysisConfig::default(),
        };
        if let Some(dir) = &self.input {
            config.input.dir = dir.clone();
        }
        if let Some(dir) = &self.output {
            config.output.dir = dir.clone();
        }
        if let Some(n) = self.devices_per_pan {
            config.layout.devices_per_pan = n;
        }
        if let Some(duration) = self.sim_duration {
            config.run.sim_duration = duration;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level))
        .init();

    // Set thread pool size
    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .context("Failed to configure thread pool")?;
    }

    let config = cli.resolve_config()?;

    match &cli.command {
        Commands::Trace { file } => show_trace(file, &config)?,
        Commands::Stat { file } => show_stat(file, &config)?,
        Commands::Positions { file } => {
            let positions = parse_position_file(file)?;
            println!("\n=== NODE POSITIONS: {} ===\n", file.display());
            for (node, pos) in &positions {
                println!("  node {:>3}: ({:.2}, {:.2})", node, pos.x, pos.y);
            }
            println!();
        }
        Commands::Sweep { group_by } => run_sweep(&config, *group_by)?,
    }

    Ok(())
}

fn show_trace(file: &Path, config: &AnalysisConfig) -> Result<()> {
    let layout = config.pan_layout();
    let run = analysis::parse_trace_file(file, layout, &config.parsing.layer_marker)?;
    let metrics = run.delivery_metrics();
    let loss = run.loss_ratios();
    let success = run.success_ratios();
    let stats = run.stats();

    println!("\n=== TRACE ANALYSIS: {} ===\n", file.display());
    println!(
        "Lines: {} ({} malformed, {} ignored)",
        stats.lines, stats.malformed, stats.ignored
    );
    println!();
    println!(
        "{:>5} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}",
        "slot", "c->d", "d->c", "2way", "d_1rt", "d_Nrt", "c_1rt", "c_Nrt"
    );
    for slot in layout.device_slots() {
        let m = metrics.slot(slot);
        let values: Vec<String> = PdrMetric::ALL
            .iter()
            .map(|&metric| format!("{:>8.3}", m.get(metric)))
            .collect();
        println!("{:>5} {}", slot, values.join(" "));
    }
    println!();

    println!(
        "Device average two-way PDR: {:.3}",
        analysis::device_mean(&metrics.column(PdrMetric::TwoWayPdr), &layout)
    );
    for pan in Pan::ALL {
        println!(
            "{}: loss uplink {:.3} downlink {:.3}, success uplink {:.3} downlink {:.3}",
            pan,
            loss.pan(pan).get(LinkDirection::Uplink),
            loss.pan(pan).get(LinkDirection::Downlink),
            success.pan(pan).get(LinkDirection::Uplink),
            success.pan(pan).get(LinkDirection::Downlink)
        );
    }
    println!();
    Ok(())
}

fn show_stat(file: &Path, config: &AnalysisConfig) -> Result<()> {
    let layout = config.pan_layout();
    let run = analysis::parse_stat_file(file, layout, &config.parsing.layer_marker)?;
    let summary = run.summarize(config.run.sim_duration);

    println!("\n=== STAT ANALYSIS: {} ===\n", file.display());
    for pan in Pan::ALL {
        let s = summary.pan(pan);
        println!(
            "{}: sent {}, received {}, PDR {:.3}, throughput {:.3} kbps",
            pan, s.frames_sent, s.frames_received, s.pdr, s.throughput_kbps
        );
    }
    println!(
        "Device average end-to-end delay: {:.4}s",
        analysis::device_mean(&summary.end_to_end_delay, &layout)
    );
    let stats = run.stats();
    println!(
        "Lines: {} ({} malformed, {} ignored)",
        stats.lines, stats.malformed, stats.ignored
    );
    println!();
    Ok(())
}

fn run_sweep(config: &AnalysisConfig, group_by: GroupBy) -> Result<()> {
    let options = SweepOptions {
        layout: config.pan_layout(),
        layer_marker: config.parsing.layer_marker.clone(),
        sim_duration: config.run.sim_duration,
        group_by,
    };

    log::info!("Analyzing sweep in {}...", config.input.dir.display());
    let mut scenarios = Vec::with_capacity(config.input.prefixes.len());
    for prefix in &config.input.prefixes {
        scenarios.push(analysis::analyze_scenario(&config.input.dir, prefix, &options)?);
    }

    let report = SweepReport {
        metadata: ReportMetadata {
            analysis_timestamp: chrono::Utc::now().to_rfc3339(),
            input_dir: config.input.dir.display().to_string(),
            devices_per_pan: config.layout.devices_per_pan,
            sim_duration_secs: config.run.sim_duration.as_secs_f64(),
            layer_marker: config.parsing.layer_marker.clone(),
            group_by,
        },
        scenarios,
    };

    // Create output directory
    let output_dir = &config.output.dir;
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

    analysis::generate_json_report(&report, &output_dir.join("sweep_report.json"))?;
    analysis::generate_text_report(&report, &output_dir.join("sweep_report.txt"))?;
    print_summary(&report);

    log::info!("Analysis complete. Reports written to {}", output_dir.display());
    Ok(())
}
