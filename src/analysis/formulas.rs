//! Ratio formulas over node counters.
//!
//! Three families of link ratios exist and they are not interchangeable:
//!
//! - [`delivery_metrics`]: acknowledgment based PDR and retry ratios, only
//!   reported when all four gating counters are nonzero
//! - [`loss_ratios`]: fraction of dequeued frames the peer never received
//! - [`success_ratios`]: fraction of dequeued frames the peer did receive
//!
//! No formula here divides by zero; a zero denominator yields 0.

use std::time::Duration;

use super::types::{LinkRatios, NodeCounters, SlotMetrics};

/// Decimal places kept for per-slot PDR values
pub const PDR_DECIMALS: usize = 3;

/// Round to `decimals` places by scaling first, ties to even.
///
/// The scaled product is itself rounded to a float, so a value just above a
/// decimal tie can land on the tie. Use [`round_exact`] where the stored
/// binary value must decide.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}

/// Round the exact binary value of `value` to `decimals` places.
///
/// 1/80 is stored slightly above 0.0125 and rounds to 0.013 here, where
/// [`round_to`] gives 0.012.
pub fn round_exact(value: f64, decimals: usize) -> f64 {
    format!("{:.*}", decimals, value).parse().unwrap_or(value)
}

/// `numerator / denominator`, or `None` when the denominator is zero
pub fn ratio(numerator: u64, denominator: u64) -> Option<f64> {
    (denominator != 0).then(|| numerator as f64 / denominator as f64)
}

pub fn ratio_or_zero(numerator: u64, denominator: u64) -> f64 {
    ratio(numerator, denominator).unwrap_or(0.0)
}

/// PDR and retry ratios for one slot.
///
/// Coordinator dequeues, device dequeues, device acks and coordinator acks
/// must all be nonzero; otherwise every field is 0.
pub fn delivery_metrics(counters: &NodeCounters) -> SlotMetrics {
    let coord = &counters.coordinator;
    let device = &counters.device;

    let gated = [coord.dequeued, device.dequeued, device.acked, coord.acked]
        .iter()
        .all(|c| *c != 0);
    if !gated {
        return SlotMetrics::default();
    }

    let two_way_dequeued = coord.dequeued + device.dequeued;
    let two_way_acked = coord.acked + device.acked;

    SlotMetrics {
        coordinator_to_device_pdr: round_exact(ratio_or_zero(coord.acked, coord.dequeued), PDR_DECIMALS),
        device_to_coordinator_pdr: round_exact(ratio_or_zero(device.acked, device.dequeued), PDR_DECIMALS),
        two_way_pdr: round_exact(ratio_or_zero(two_way_acked, two_way_dequeued), PDR_DECIMALS),
        device_single_retry_ratio: ratio_or_zero(device.acked_single_retry, device.acked),
        device_multiple_retry_ratio: ratio_or_zero(device.acked_multiple_retry, device.acked),
        coordinator_single_retry_ratio: ratio_or_zero(coord.acked_single_retry, coord.acked),
        coordinator_multiple_retry_ratio: ratio_or_zero(coord.acked_multiple_retry, coord.acked),
    }
}

/// Loss ratios: uplink `(deviceDequeued - coordReceived) / deviceDequeued`,
/// downlink `(coordDequeued - deviceReceived) / coordDequeued`.
///
/// Both directions are 0 unless both denominators are nonzero. The result is
/// negative when a receiver logged more frames than the sender dequeued.
pub fn loss_ratios(counters: &NodeCounters) -> LinkRatios {
    let coord = &counters.coordinator;
    let device = &counters.device;
    if coord.dequeued == 0 || device.dequeued == 0 {
        return LinkRatios::default();
    }
    LinkRatios {
        uplink: (device.dequeued as f64 - coord.data_received as f64) / device.dequeued as f64,
        downlink: (coord.dequeued as f64 - device.data_received as f64) / coord.dequeued as f64,
    }
}

/// Success ratios: uplink `coordReceived / deviceDequeued`, downlink
/// `deviceReceived / coordDequeued`, with the same guard as [`loss_ratios`].
pub fn success_ratios(counters: &NodeCounters) -> LinkRatios {
    let coord = &counters.coordinator;
    let device = &counters.device;
    if coord.dequeued == 0 || device.dequeued == 0 {
        return LinkRatios::default();
    }
    LinkRatios {
        uplink: ratio_or_zero(coord.data_received, device.dequeued),
        downlink: ratio_or_zero(device.data_received, coord.dequeued),
    }
}

/// Network PDR from stat totals; 0 when nothing was sent
pub fn delivery_ratio(received: u64, sent: u64) -> f64 {
    ratio_or_zero(received, sent)
}

/// `bytes * 8 / seconds / 1000`; 0 for a zero-length run
pub fn throughput_kbps(bytes: u64, sim_duration: Duration) -> f64 {
    let seconds = sim_duration.as_secs_f64();
    if seconds == 0.0 {
        return 0.0;
    }
    bytes as f64 * 8.0 / seconds / 1000.0
}
