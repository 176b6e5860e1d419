//! End-to-end tests over run files written to a temporary directory.

use std::fs;
use std::path::Path;
use std::time::Duration;

use tempfile::TempDir;

use panmetrics::analysis::run_key::Param;
use panmetrics::analysis::{
    self, GroupBy, LinkDirection, Pan, PanLayout, PdrMetric, ReportMetadata, SeriesKey, StatMetric,
    SweepOptions, SweepReport,
};

const DEVICES: usize = 2;

fn line(actor: &str, event: &str, packet: &str, value: &str, tag: &str) -> String {
    format!("0 1.000 n {actor} x DrIotMac a b c {event} d {packet} e {value} f {tag}\n")
}

/// Ten dequeues each way for slot 3, `delivered` frames acknowledged both ways
fn slot3_trace(delivered: usize) -> String {
    let mut text = String::new();
    for _ in 0..10 {
        text += &line("1", "DataFrameDequeued", "1_0", "0", "3");
        text += &line("3", "DataFrameDequeued", "3_0", "0", "1");
    }
    for _ in 0..delivered {
        text += &line("1", "Tx-DATA", "1_0", "0", "-");
        text += &line("1", "RxFrame", "3_0", "0", "DataFrame");
        text += &line("3", "Tx-DATA", "3_0", "0", "-");
        text += &line("3", "RxFrame", "1_0", "0", "ACK");
        text += &line("1", "RxFrame", "3_0", "0", "ACK");
    }
    text
}

fn stat_file(sent: u64, received: u64, bytes: u64) -> String {
    format!(
        "3 DrIotMac.FramesDequeued = {sent}\n\
         1 DrIotMac.Data_FramesReceived = {received}\n\
         1 DrIotMac.BytesSentToUpperLayer = {bytes}\n\
         3 DrIotMac.DataFrameEndToEndDelay = 0.02\n"
    )
}

fn run_name(dist: &str, seed: u32, ext: &str) -> String {
    format!("interference_dist_{dist}km_bw_150.0and600.0khz_num_device{DEVICES}_seed{seed}.{ext}")
}

fn options() -> SweepOptions {
    SweepOptions {
        layout: PanLayout::new(DEVICES),
        layer_marker: "Mac".to_string(),
        sim_duration: Duration::from_secs(30),
        group_by: GroupBy::Distance,
    }
}

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

#[test]
fn test_identical_seeds_reduce_to_single_run() {
    let dir = TempDir::new().unwrap();
    for seed in 0..3 {
        write(dir.path(), &run_name("1.0", seed, "trace"), &slot3_trace(8));
    }

    let series = analysis::analyze_scenario(dir.path(), "interference", &options()).unwrap();
    assert_eq!(series.trace_runs, 3);

    let key = SeriesKey::Distance(Param(1.0));
    let point = series.delivery[&PdrMetric::TwoWayPdr].get(&key).unwrap();
    assert_eq!(point.runs, 3);
    assert_eq!(point.mean, vec![0.0, 0.0, 0.0, 0.8, 0.0, 0.0]);
    assert_eq!(point.std_error, vec![0.0; 6]);

    let retry = series.delivery[&PdrMetric::DeviceSingleRetryRatio].get(&key).unwrap();
    assert!(retry.mean.iter().all(|v| *v == 0.0));

    let loss = series.loss.pans[&LinkDirection::Uplink].get(&key).unwrap();
    assert_eq!(loss.mean.len(), 2);
}

#[test]
fn test_seeds_spread_into_std_error() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), &run_name("0.5", 0, "trace"), &slot3_trace(6));
    write(dir.path(), &run_name("0.5", 1, "trace"), &slot3_trace(10));
    write(dir.path(), &run_name("2.0", 0, "trace"), &slot3_trace(2));

    let series = analysis::analyze_scenario(dir.path(), "interference", &options()).unwrap();
    let pdr = &series.delivery[&PdrMetric::CoordinatorToDevicePdr];
    assert_eq!(pdr.len(), 2);

    let near = pdr.get(&SeriesKey::Distance(Param(0.5))).unwrap();
    assert_eq!(near.mean[3], 0.8);
    // values 0.6 and 1.0: sample std = 0.2828.., se = 0.2
    assert!((near.std_error[3] - 0.2).abs() < 1e-9);

    let far = pdr.get(&SeriesKey::Distance(Param(2.0))).unwrap();
    assert_eq!(far.mean[3], 0.2);
    assert_eq!(far.std_error[3], 0.0);
}

#[test]
fn test_stat_sweep_reports_pdr_and_throughput() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), &run_name("1.0", 0, "stat"), &stat_file(100, 75, 9375));
    write(dir.path(), &run_name("1.0", 1, "stat"), &stat_file(100, 75, 9375));

    let series = analysis::analyze_scenario(dir.path(), "interference", &options()).unwrap();
    let key = SeriesKey::Distance(Param(1.0));
    assert_eq!(series.stat_scalars[&StatMetric::Pan1Pdr].scalar(&key), Some((0.75, 0.0)));
    let (tput, se) = series.stat_scalars[&StatMetric::Pan1ThroughputKbps].scalar(&key).unwrap();
    assert!((tput - 2.5).abs() < 1e-12);
    assert_eq!(se, 0.0);
    assert_eq!(series.stat_scalars[&StatMetric::Pan2Pdr].scalar(&key), Some((0.0, 0.0)));
    assert_eq!(series.end_to_end_delay.get(&key).unwrap().mean[3], 0.02);
}

#[test]
fn test_parsing_is_deterministic() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(run_name("1.0", 0, "trace"));
    let mut text = slot3_trace(7);
    text += "garbage\n1 2 3\n";
    fs::write(&path, text).unwrap();

    let layout = PanLayout::new(DEVICES);
    let first = analysis::parse_trace_file(&path, layout, "Mac").unwrap();
    let second = analysis::parse_trace_file(&path, layout, "Mac").unwrap();
    assert_eq!(first, second);
    assert_eq!(first.delivery_metrics(), second.delivery_metrics());
    assert_eq!(first.counters().group(Pan::One).coordinator.dequeued, 10);
}

#[test]
fn test_missing_and_unreadable_are_distinct() {
    let dir = TempDir::new().unwrap();
    let layout = PanLayout::new(DEVICES);

    let missing = analysis::parse_stat_file(&dir.path().join("absent.stat"), layout, "Mac").unwrap_err();
    assert!(missing.is_not_found());

    // A directory opens on some platforms but can never be read as lines
    match analysis::parse_stat_file(dir.path(), layout, "Mac") {
        Err(e) => assert!(!e.is_not_found()),
        Ok(run) => assert_eq!(run.stats().lines, 0),
    }
}

#[test]
fn test_json_report_round_trips_series() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), &run_name("1.0", 0, "trace"), &slot3_trace(8));
    write(dir.path(), &run_name("1.0", 0, "stat"), &stat_file(100, 75, 9375));
    write(dir.path(), &run_name("1.0", 0, "pos"), "1 0 0 0 0\n3 0 10 5 0\n");

    let series = analysis::analyze_scenario(dir.path(), "interference", &options()).unwrap();
    let report = SweepReport {
        metadata: ReportMetadata {
            analysis_timestamp: "2026-01-01T00:00:00+00:00".to_string(),
            input_dir: dir.path().display().to_string(),
            devices_per_pan: DEVICES,
            sim_duration_secs: 30.0,
            layer_marker: "Mac".to_string(),
            group_by: GroupBy::Distance,
        },
        scenarios: vec![series],
    };

    let out = dir.path().join("out.json");
    analysis::generate_json_report(&report, &out).unwrap();
    let parsed: SweepReport = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    let scenario = &parsed.scenarios[0];
    assert_eq!((scenario.trace_runs, scenario.stat_runs), (1, 1));
    assert_eq!(scenario.delivery, report.scenarios[0].delivery);
    assert_eq!(scenario.stat_scalars, report.scenarios[0].stat_scalars);
    assert_eq!(scenario.positions[0].nodes.len(), 2);
}
