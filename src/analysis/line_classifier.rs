//! Field extraction for trace and stat log lines.
//!
//! Both formats are whitespace separated with fixed load-bearing positions.
//! Classification never fails hard: a line is either a typed record, a line
//! we have no interest in, or a malformed line the caller counts and skips.

use super::types::{NodeSlot, Pan};

// Trace layout positions
const TRACE_ACTOR: usize = 3;
const TRACE_LAYER: usize = 5;
const TRACE_EVENT: usize = 9;
const TRACE_PACKET_ID: usize = 11;
const TRACE_VALUE: usize = 13;
const TRACE_TAG: usize = 15;

// Stat layout positions
const STAT_NODE: usize = 0;
const STAT_METRIC: usize = 1;
const STAT_VALUE: usize = 3;

/// Marker written in place of a delay value when a node has no sample
pub const NO_SAMPLE: &str = "-";

/// Outcome of classifying one line
#[derive(Debug, Clone, PartialEq)]
pub enum LineClass<T> {
    Record(T),
    /// Well formed, but not a layer or event we track
    Irrelevant,
    /// Too few fields or a non-numeric value where a number is required
    Malformed,
}

/// Node that wrote a trace line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Coordinator(Pan),
    Device(NodeSlot),
}

/// Frame type carried by an `RxFrame` event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Data,
    Ack,
}

/// MAC events that drive the per-node counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceEvent {
    /// A transmission attempt and the retry count it was made with
    TxData { retries: u32 },
    /// A data frame left the queue; coordinators name the destination
    Dequeued { destination: Option<NodeSlot> },
    /// A frame arrived; `sender` is the slot prefix of the packet id
    RxFrame { kind: FrameKind, sender: Option<NodeSlot> },
}

/// One classified trace line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceRecord {
    pub actor: Actor,
    pub event: TraceEvent,
}

/// Metric sample from a stat line
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatValue {
    FramesDequeued(u64),
    DataFramesReceived(u64),
    BytesSentToUpperLayer(u64),
    /// `None` for the "-" marker
    EndToEndDelay(Option<f64>),
}

/// One classified stat line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatRecord<'a> {
    pub node: &'a str,
    pub value: StatValue,
}

/// Slot prefix of a `<senderSlot>_<sequence>` packet id
pub fn packet_sender(packet_id: &str) -> Option<NodeSlot> {
    let (sender, _) = packet_id.split_once('_')?;
    sender.parse().ok()
}

/// Classify one trace line.
///
/// `layer_marker` must appear in the protocol-layer tag for the line to be
/// considered at all.
pub fn classify_trace_line(line: &str, layer_marker: &str) -> LineClass<TraceRecord> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.is_empty() {
        return LineClass::Irrelevant;
    }
    if fields.len() <= TRACE_EVENT {
        return LineClass::Malformed;
    }
    if !fields[TRACE_LAYER].contains(layer_marker) {
        return LineClass::Irrelevant;
    }

    let actor_tag = fields[TRACE_ACTOR];
    let actor = match Pan::from_coordinator_tag(actor_tag) {
        Some(pan) => Actor::Coordinator(pan),
        None => match actor_tag.parse::<NodeSlot>() {
            Ok(slot) => Actor::Device(slot),
            Err(_) => return LineClass::Malformed,
        },
    };

    let event_tag = fields[TRACE_EVENT];
    let event = if event_tag.contains("Tx-DATA") {
        match fields.get(TRACE_VALUE).map(|v| v.parse::<u32>()) {
            Some(Ok(retries)) => TraceEvent::TxData { retries },
            _ => return LineClass::Malformed,
        }
    } else if event_tag.contains("DataFrameDequeued") {
        let destination = match (actor, fields.get(TRACE_TAG)) {
            (Actor::Coordinator(_), Some(tag)) => match tag.parse::<NodeSlot>() {
                Ok(slot) => Some(slot),
                Err(_) => return LineClass::Malformed,
            },
            (Actor::Coordinator(_), None) => return LineClass::Malformed,
            (Actor::Device(_), tag) => tag.and_then(|t| t.parse().ok()),
        };
        TraceEvent::Dequeued { destination }
    } else if event_tag.contains("RxFrame") {
        let Some(tag) = fields.get(TRACE_TAG) else {
            return LineClass::Malformed;
        };
        let kind = if tag.contains("ACK") {
            FrameKind::Ack
        } else if tag.contains("Data") {
            FrameKind::Data
        } else {
            return LineClass::Irrelevant;
        };
        let sender = fields.get(TRACE_PACKET_ID).and_then(|id| packet_sender(id));
        if sender.is_none() && matches!(actor, Actor::Coordinator(_)) {
            return LineClass::Malformed;
        }
        TraceEvent::RxFrame { kind, sender }
    } else {
        return LineClass::Irrelevant;
    };

    LineClass::Record(TraceRecord {
        actor,
        event,
    })
}

/// Classify one stat line.
pub fn classify_stat_line<'a>(line: &'a str, layer_marker: &str) -> LineClass<StatRecord<'a>> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.is_empty() {
        return LineClass::Irrelevant;
    }
    if fields.len() <= STAT_VALUE {
        return LineClass::Malformed;
    }

    let metric = fields[STAT_METRIC];
    if !metric.contains(layer_marker) {
        return LineClass::Irrelevant;
    }
    let raw = fields[STAT_VALUE];

    let value = if metric.contains("DataFrameEndToEndDelay") {
        if raw == NO_SAMPLE {
            StatValue::EndToEndDelay(None)
        } else {
            match raw.parse::<f64>() {
                Ok(delay) if delay.is_finite() => StatValue::EndToEndDelay(Some(delay)),
                _ => return LineClass::Malformed,
            }
        }
    } else {
        let build: fn(u64) -> StatValue = if metric.contains("Data_FramesReceived") {
            StatValue::DataFramesReceived
        } else if metric.contains("FramesDequeued") {
            StatValue::FramesDequeued
        } else if metric.contains("BytesSentToUpperLayer") {
            StatValue::BytesSentToUpperLayer
        } else {
            return LineClass::Irrelevant;
        };
        match raw.parse::<u64>() {
            Ok(count) => build(count),
            Err(_) => return LineClass::Malformed,
        }
    };

    LineClass::Record(StatRecord {
        node: fields[STAT_NODE],
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trace_line(actor: &str, layer: &str, event: &str, packet: &str, value: &str, tag: &str) -> String {
        format!("0 0.123 x {actor} y {layer} a b c {event} d {packet} e {value} f {tag}")
    }

    #[test]
    fn test_packet_sender() {
        assert_eq!(packet_sender("3_17"), Some(3));
        assert_eq!(packet_sender("14_0"), Some(14));
        assert_eq!(packet_sender("x_1"), None);
        assert_eq!(packet_sender("317"), None);
    }

    #[test]
    fn test_coordinator_dequeue() {
        let line = trace_line("1", "DrIotMac", "DataFrameDequeued", "1_4", "0", "5");
        match classify_trace_line(&line, "Mac") {
            LineClass::Record(rec) => {
                assert_eq!(rec.actor, Actor::Coordinator(Pan::One));
                assert_eq!(rec.event, TraceEvent::Dequeued { destination: Some(5) });
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_tx_data_retry_count() {
        let line = trace_line("7", "DrIotMac", "Tx-DATA", "7_2", "3", "x");
        let LineClass::Record(rec) = classify_trace_line(&line, "Mac") else {
            panic!("expected record");
        };
        assert_eq!(rec.actor, Actor::Device(7));
        assert_eq!(rec.event, TraceEvent::TxData { retries: 3 });
    }

    #[test]
    fn test_rx_frame_kinds() {
        let data = trace_line("2", "DrIotMac", "RxFrame", "16_9", "0", "DataFrame");
        let ack = trace_line("2", "DrIotMac", "RxFrame", "16_9", "0", "ACK");
        assert!(matches!(
            classify_trace_line(&data, "Mac"),
            LineClass::Record(TraceRecord {
                event: TraceEvent::RxFrame { kind: FrameKind::Data, sender: Some(16) },
                ..
            })
        ));
        assert!(matches!(
            classify_trace_line(&ack, "Mac"),
            LineClass::Record(TraceRecord {
                event: TraceEvent::RxFrame { kind: FrameKind::Ack, sender: Some(16) },
                ..
            })
        ));
    }

    #[test]
    fn test_trace_record_ignores_writer_field() {
        let a = trace_line("3", "DrIotMac", "Tx-DATA", "3_1", "2", "x");
        let b = a.replacen('0', "41", 1);
        assert_ne!(a, b);
        assert_eq!(classify_trace_line(&a, "Mac"), classify_trace_line(&b, "Mac"));
    }

    #[test]
    fn test_other_layers_are_irrelevant() {
        let line = trace_line("1", "DrIotPhy", "RxEnd", "3_1", "-80.5", "x");
        assert_eq!(classify_trace_line(&line, "Mac"), LineClass::Irrelevant);
        assert_eq!(classify_trace_line("", "Mac"), LineClass::Irrelevant);
    }

    #[test]
    fn test_short_and_non_numeric_lines_are_malformed() {
        assert_eq!(classify_trace_line("1 2 3", "Mac"), LineClass::Malformed);
        let bad_retry = trace_line("1", "DrIotMac", "Tx-DATA", "1_1", "many", "x");
        assert_eq!(classify_trace_line(&bad_retry, "Mac"), LineClass::Malformed);
        let bad_dest = trace_line("1", "DrIotMac", "DataFrameDequeued", "1_1", "0", "dev");
        assert_eq!(classify_trace_line(&bad_dest, "Mac"), LineClass::Malformed);
        let bad_actor = trace_line("dev", "DrIotMac", "Tx-DATA", "1_1", "0", "x");
        assert_eq!(classify_trace_line(&bad_actor, "Mac"), LineClass::Malformed);
        // RxFrame without the frame type field
        let truncated = "0 0.1 x 1 y DrIotMac a b c RxFrame d 3_1 e 0";
        assert_eq!(classify_trace_line(truncated, "Mac"), LineClass::Malformed);
    }

    #[test]
    fn test_stat_lines() {
        let LineClass::Record(rec) = classify_stat_line("4 DrIotMac.FramesDequeued = 120", "Mac") else {
            panic!("expected record");
        };
        assert_eq!(rec.node, "4");
        assert_eq!(rec.value, StatValue::FramesDequeued(120));

        assert_eq!(
            classify_stat_line("1 DrIotMac.Data_FramesReceived = 90", "Mac"),
            LineClass::Record(StatRecord { node: "1", value: StatValue::DataFramesReceived(90) })
        );
        assert_eq!(
            classify_stat_line("5 DrIotMac.DataFrameEndToEndDelay = -", "Mac"),
            LineClass::Record(StatRecord { node: "5", value: StatValue::EndToEndDelay(None) })
        );
        assert_eq!(
            classify_stat_line("5 DrIotMac.DataFrameEndToEndDelay = 0.25", "Mac"),
            LineClass::Record(StatRecord { node: "5", value: StatValue::EndToEndDelay(Some(0.25)) })
        );
        assert_eq!(classify_stat_line("5 DrIotMac.FramesDequeued", "Mac"), LineClass::Malformed);
        assert_eq!(classify_stat_line("5 DrIotMac.FramesDequeued = lots", "Mac"), LineClass::Malformed);
        assert_eq!(classify_stat_line("5 DrIotPhy.RxCount = 3", "Mac"), LineClass::Irrelevant);
        assert_eq!(classify_stat_line("5 DrIotMac.CcaBusy = 3", "Mac"), LineClass::Irrelevant);
    }
}
