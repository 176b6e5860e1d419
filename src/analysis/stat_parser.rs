//! Whole-run summary from a stat file.

use std::io::BufRead;
use std::path::Path;
use std::time::Duration;

use super::formulas;
use super::line_classifier::{classify_stat_line, LineClass, StatValue};
use super::run_file::{open_run_file, read_lines, RunFileError};
use super::types::*;

/// Raw per-PAN totals before the duration-dependent derivation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PanTotals {
    pub frames_sent: u64,
    pub frames_received: u64,
    pub bytes_to_upper_layer: u64,
}

/// Stateful parser for one stat file
#[derive(Debug, Clone)]
pub struct StatRunParser {
    layout: PanLayout,
    layer_marker: String,
    totals: [PanTotals; 2],
    end_to_end_delay: Vec<f64>,
    stats: LineStats,
}

impl StatRunParser {
    pub fn new(layout: PanLayout, layer_marker: &str) -> Self {
        Self {
            layout,
            layer_marker: layer_marker.to_string(),
            totals: [PanTotals::default(); 2],
            end_to_end_delay: vec![0.0; layout.slot_count()],
            stats: LineStats::default(),
        }
    }

    pub fn feed_line(&mut self, line: &str) {
        self.stats.lines += 1;
        let record = match classify_stat_line(line, &self.layer_marker) {
            LineClass::Record(record) => record,
            LineClass::Irrelevant => {
                self.stats.ignored += 1;
                return;
            }
            LineClass::Malformed => {
                self.stats.malformed += 1;
                return;
            }
        };

        let Ok(node) = record.node.parse::<NodeSlot>() else {
            self.stats.malformed += 1;
            return;
        };

        match record.value {
            StatValue::EndToEndDelay(sample) => match self.end_to_end_delay.get_mut(node) {
                // Last sample for a node wins
                Some(delay) => *delay = sample.unwrap_or(0.0),
                None => self.stats.malformed += 1,
            },
            // Oversized counts saturate
            StatValue::FramesDequeued(n) => {
                self.add_to_pan(node, |t| t.frames_sent = t.frames_sent.saturating_add(n))
            }
            StatValue::DataFramesReceived(n) => {
                self.add_to_pan(node, |t| t.frames_received = t.frames_received.saturating_add(n))
            }
            StatValue::BytesSentToUpperLayer(n) => self.add_to_pan(node, |t| {
                t.bytes_to_upper_layer = t.bytes_to_upper_layer.saturating_add(n)
            }),
        }
    }

    fn add_to_pan(&mut self, node: NodeSlot, update: impl FnOnce(&mut PanTotals)) {
        // Senders outside both PANs are not part of either network total
        match self.layout.pan_of_member(node) {
            Some(pan) => update(&mut self.totals[pan.index()]),
            None => self.stats.ignored += 1,
        }
    }

    pub fn finish(self) -> StatRun {
        StatRun {
            totals: self.totals,
            end_to_end_delay: self.end_to_end_delay,
            stats: self.stats,
        }
    }
}

/// Totals collected from one complete stat file
#[derive(Debug, Clone, PartialEq)]
pub struct StatRun {
    totals: [PanTotals; 2],
    end_to_end_delay: Vec<f64>,
    stats: LineStats,
}

impl StatRun {
    pub fn totals(&self, pan: Pan) -> PanTotals {
        self.totals[pan.index()]
    }

    pub fn stats(&self) -> LineStats {
        self.stats
    }

    /// Derive PDR and throughput.
    ///
    /// `sim_duration` must be the measured duration the simulator ran with;
    /// the stat file does not record it.
    pub fn summarize(&self, sim_duration: Duration) -> RunSummary {
        RunSummary {
            pans: self.totals.map(|t| PanSummary {
                frames_sent: t.frames_sent,
                frames_received: t.frames_received,
                bytes_to_upper_layer: t.bytes_to_upper_layer,
                pdr: formulas::delivery_ratio(t.frames_received, t.frames_sent),
                throughput_kbps: formulas::throughput_kbps(t.bytes_to_upper_layer, sim_duration),
            }),
            end_to_end_delay: self.end_to_end_delay.clone(),
        }
    }
}

/// Parse a stat log from any buffered reader
pub fn parse_stat<R: BufRead>(reader: R, layout: PanLayout, layer_marker: &str) -> std::io::Result<StatRun> {
    let mut parser = StatRunParser::new(layout, layer_marker);
    let undecodable = read_lines(reader, |line| parser.feed_line(line))?;
    let mut run = parser.finish();
    run.stats.lines += undecodable;
    run.stats.malformed += undecodable;
    Ok(run)
}

/// Parse a single stat file
pub fn parse_stat_file(path: &Path, layout: PanLayout, layer_marker: &str) -> Result<StatRun, RunFileError> {
    let reader = open_run_file(path)?;
    let run = parse_stat(reader, layout, layer_marker).map_err(|e| RunFileError::from_io(path, e))?;
    log::debug!(
        "Parsed {}: {} lines, {} malformed",
        path.display(),
        run.stats.lines,
        run.stats.malformed
    );
    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str, devices_per_pan: usize) -> StatRun {
        parse_stat(text.as_bytes(), PanLayout::new(devices_per_pan), "Mac").unwrap()
    }

    #[test]
    fn test_pdr_and_throughput() {
        let text = "\
3 DrIotMac.FramesDequeued = 60
4 DrIotMac.FramesDequeued = 40
1 DrIotMac.Data_FramesReceived = 75
1 DrIotMac.BytesSentToUpperLayer = 9375
";
        let summary = parse(text, 2).summarize(Duration::from_secs(30));
        let pan1 = summary.pan(Pan::One);
        assert_eq!(pan1.frames_sent, 100);
        assert_eq!(pan1.frames_received, 75);
        assert_eq!(pan1.pdr, 0.75);
        assert!((pan1.throughput_kbps - 2.5).abs() < 1e-12);
        assert_eq!(summary.scalar(StatMetric::Pan1Pdr), 0.75);
        assert_eq!(*summary.pan(Pan::Two), PanSummary::default());
    }

    #[test]
    fn test_pan_membership() {
        // Two devices per PAN: PAN-1 = {1, 3, 4}, PAN-2 = {2, 5, 6}
        let text = "\
5 DrIotMac.FramesDequeued = 10
2 DrIotMac.FramesDequeued = 10
2 DrIotMac.Data_FramesReceived = 5
9 DrIotMac.FramesDequeued = 999
0 DrIotMac.FramesDequeued = 999
";
        let run = parse(text, 2);
        assert_eq!(run.totals(Pan::Two).frames_sent, 20);
        assert_eq!(run.totals(Pan::Two).frames_received, 5);
        assert_eq!(run.totals(Pan::One), PanTotals::default());
        assert_eq!(run.summarize(Duration::from_secs(1)).pan(Pan::Two).pdr, 0.25);
    }

    #[test]
    fn test_end_to_end_delay_samples() {
        let text = "\
3 DrIotMac.DataFrameEndToEndDelay = 0.5
4 DrIotMac.DataFrameEndToEndDelay = -
3 DrIotMac.DataFrameEndToEndDelay = 0.25
99 DrIotMac.DataFrameEndToEndDelay = 1.0
";
        let run = parse(text, 12);
        let summary = run.summarize(Duration::from_secs(30));
        assert_eq!(summary.end_to_end_delay.len(), 36);
        assert_eq!(summary.end_to_end_delay[3], 0.25);
        assert_eq!(summary.end_to_end_delay[4], 0.0);
        assert_eq!(run.stats().malformed, 1);
    }

    #[test]
    fn test_nothing_sent_gives_zero_pdr() {
        let run = parse("1 DrIotMac.Data_FramesReceived = 7\n", 12);
        let summary = run.summarize(Duration::from_secs(30));
        assert_eq!(summary.pan(Pan::One).pdr, 0.0);
    }

    #[test]
    fn test_huge_counts_saturate() {
        let max = u64::MAX;
        let text = format!(
            "3 DrIotMac.FramesDequeued = {max}\n\
             4 DrIotMac.FramesDequeued = {max}\n\
             1 DrIotMac.BytesSentToUpperLayer = {max}\n\
             1 DrIotMac.BytesSentToUpperLayer = 5\n"
        );
        let run = parse(&text, 2);
        assert_eq!(run.totals(Pan::One).frames_sent, max);
        assert_eq!(run.totals(Pan::One).bytes_to_upper_layer, max);
        assert!(run.summarize(Duration::from_secs(30)).pan(Pan::One).throughput_kbps.is_finite());
    }

    #[test]
    fn test_bad_lines_are_skipped() {
        let text = "\
short line
3 DrIotMac.FramesDequeued = ten
x DrIotMac.FramesDequeued = 10
3 DrIotMac.FramesDequeued = 10
";
        let run = parse(text, 12);
        assert_eq!(run.totals(Pan::One).frames_sent, 10);
        assert_eq!(run.stats().malformed, 3);
    }
}
