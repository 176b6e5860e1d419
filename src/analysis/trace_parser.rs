//! Single-pass fold of a MAC trace file into per-node counters.
//!
//! Lines must be fed in the order the simulator wrote them: the retry count
//! of a `Tx-DATA` line is only associated with an acknowledgment through the
//! ledger state left behind for a later line.

use std::io::BufRead;
use std::path::Path;

use super::counters::NodeCounterSet;
use super::formulas;
use super::line_classifier::{classify_trace_line, Actor, FrameKind, LineClass, TraceEvent};
use super::retry_ledger::LinkScratch;
use super::run_file::{open_run_file, read_lines, RunFileError};
use super::types::*;

/// Stateful parser for one trace file
#[derive(Debug, Clone)]
pub struct TraceRunParser {
    layer_marker: String,
    counters: NodeCounterSet,
    scratch: LinkScratch,
    stats: LineStats,
}

impl TraceRunParser {
    pub fn new(layout: PanLayout, layer_marker: &str) -> Self {
        Self {
            layer_marker: layer_marker.to_string(),
            counters: NodeCounterSet::new(layout),
            scratch: LinkScratch::new(),
            stats: LineStats::default(),
        }
    }

    /// Fold one line into the counters
    pub fn feed_line(&mut self, line: &str) {
        self.stats.lines += 1;
        let record = match classify_trace_line(line, &self.layer_marker) {
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

        let applied = match record.actor {
            Actor::Coordinator(pan) => self.apply_coordinator(pan, record.event),
            Actor::Device(slot) => self.apply_device(slot, record.event),
        };
        if !applied {
            self.stats.malformed += 1;
        }
    }

    fn apply_coordinator(&mut self, pan: Pan, event: TraceEvent) -> bool {
        match event {
            TraceEvent::TxData { retries } => match self.scratch.last_destination(pan) {
                Some(destination) => {
                    self.scratch.coordinator.record(destination, retries);
                    true
                }
                // An attempt before any dequeue has no peer to charge
                None => true,
            },
            TraceEvent::Dequeued { destination } => {
                let Some(destination) = destination else {
                    return false;
                };
                if !self
                    .counters
                    .update_with_group(destination, Role::Coordinator, |c| c.dequeued += 1)
                {
                    return false;
                }
                self.scratch.set_last_destination(pan, destination);
                true
            }
            TraceEvent::RxFrame { kind, sender } => {
                let Some(sender) = sender else {
                    return false;
                };
                match kind {
                    FrameKind::Data => {
                        self.counters
                            .update_with_group(sender, Role::Coordinator, |c| c.data_received += 1)
                    }
                    FrameKind::Ack => {
                        let retries = self.scratch.coordinator.last_retries(sender);
                        self.counters
                            .update_own(sender, Role::Coordinator, |c| c.record_ack(retries))
                    }
                }
            }
        }
    }

    fn apply_device(&mut self, slot: NodeSlot, event: TraceEvent) -> bool {
        if !self.counters.layout().contains(slot) {
            return false;
        }
        match event {
            TraceEvent::TxData { retries } => {
                self.scratch.device.record(slot, retries);
                true
            }
            TraceEvent::Dequeued { .. } => {
                self.counters.update_with_group(slot, Role::Device, |c| c.dequeued += 1)
            }
            TraceEvent::RxFrame { kind: FrameKind::Data, .. } => {
                self.counters.update_with_group(slot, Role::Device, |c| c.data_received += 1)
            }
            TraceEvent::RxFrame { kind: FrameKind::Ack, .. } => {
                let retries = self.scratch.device.last_retries(slot);
                self.counters.update_own(slot, Role::Device, |c| c.record_ack(retries))
            }
        }
    }

    pub fn finish(self) -> TraceRun {
        TraceRun {
            counters: self.counters,
            stats: self.stats,
        }
    }
}

/// Counters collected from one complete trace file
#[derive(Debug, Clone, PartialEq)]
pub struct TraceRun {
    counters: NodeCounterSet,
    stats: LineStats,
}

impl TraceRun {
    pub fn counters(&self) -> &NodeCounterSet {
        &self.counters
    }

    pub fn stats(&self) -> LineStats {
        self.stats
    }

    /// Acknowledgment based PDR and retry ratios per slot
    pub fn delivery_metrics(&self) -> RunMetrics {
        RunMetrics {
            slots: self
                .counters
                .iter_own()
                .map(|(_, c)| formulas::delivery_metrics(c))
                .collect(),
        }
    }

    /// Loss ratios per slot and per PAN device group
    pub fn loss_ratios(&self) -> LinkRatioSet {
        self.link_ratios(formulas::loss_ratios)
    }

    /// Success ratios per slot and per PAN device group
    pub fn success_ratios(&self) -> LinkRatioSet {
        self.link_ratios(formulas::success_ratios)
    }

    fn link_ratios(&self, formula: fn(&NodeCounters) -> LinkRatios) -> LinkRatioSet {
        LinkRatioSet {
            slots: self.counters.iter_own().map(|(_, c)| formula(c)).collect(),
            pans: Pan::ALL.map(|pan| formula(self.counters.group(pan))),
        }
    }
}

/// Parse a trace from any buffered reader
pub fn parse_trace<R: BufRead>(reader: R, layout: PanLayout, layer_marker: &str) -> std::io::Result<TraceRun> {
    let mut parser = TraceRunParser::new(layout, layer_marker);
    let undecodable = read_lines(reader, |line| parser.feed_line(line))?;
    let mut run = parser.finish();
    run.stats.lines += undecodable;
    run.stats.malformed += undecodable;
    Ok(run)
}

/// Parse a single trace file
pub fn parse_trace_file(path: &Path, layout: PanLayout, layer_marker: &str) -> Result<TraceRun, RunFileError> {
    let reader = open_run_file(path)?;
    let run = parse_trace(reader, layout, layer_marker).map_err(|e| RunFileError::from_io(path, e))?;
    log::debug!(
        "Parsed {}: {} lines, {} malformed, {} ignored",
        path.display(),
        run.stats.lines,
        run.stats.malformed,
        run.stats.ignored
    );
    Ok(run)
}
