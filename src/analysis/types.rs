//! Core data types for trace and stat log analysis.

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Index into the per-run slot arrays.
///
/// Slot 0 is unused, slots 1 and 2 are the PAN coordinators and device ids
/// start at [`FIRST_DEVICE_SLOT`].
pub type NodeSlot = usize;

/// First device slot; device ids follow the two coordinators
pub const FIRST_DEVICE_SLOT: NodeSlot = 3;

/// One of the two personal-area networks in an interference run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Pan {
    One,
    Two,
}

impl Pan {
    pub const ALL: [Pan; 2] = [Pan::One, Pan::Two];

    /// Position of this PAN in two-element arrays
    pub fn index(self) -> usize {
        match self {
            Pan::One => 0,
            Pan::Two => 1,
        }
    }

    /// Slot of this PAN's coordinator
    pub fn coordinator_slot(self) -> NodeSlot {
        match self {
            Pan::One => 1,
            Pan::Two => 2,
        }
    }

    /// Coordinators are written as the literal ids "1" and "2" in both log formats
    pub fn from_coordinator_tag(tag: &str) -> Option<Pan> {
        match tag {
            "1" => Some(Pan::One),
            "2" => Some(Pan::Two),
            _ => None,
        }
    }
}

impl std::fmt::Display for Pan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pan::One => write!(f, "PAN-1"),
            Pan::Two => write!(f, "PAN-2"),
        }
    }
}

/// Slot layout shared by every run of an experiment.
///
/// PAN-1 devices occupy `3..n+3`, PAN-2 devices `n+3..2n+3`, and the slot
/// arrays are sized `3 * n` where `n` is the device count per PAN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanLayout {
    pub devices_per_pan: usize,
}

impl PanLayout {
    pub fn new(devices_per_pan: usize) -> Self {
        Self { devices_per_pan }
    }

    pub fn slot_count(&self) -> usize {
        3 * self.devices_per_pan
    }

    pub fn contains(&self, slot: NodeSlot) -> bool {
        slot < self.slot_count()
    }

    /// Device ids that belong to `pan`
    pub fn device_range(&self, pan: Pan) -> Range<NodeSlot> {
        let n = self.devices_per_pan;
        match pan {
            Pan::One => FIRST_DEVICE_SLOT..FIRST_DEVICE_SLOT + n,
            Pan::Two => FIRST_DEVICE_SLOT + n..FIRST_DEVICE_SLOT + 2 * n,
        }
    }

    /// PAN whose device group contains `slot`; coordinators are not devices
    pub fn pan_of_device(&self, slot: NodeSlot) -> Option<Pan> {
        Pan::ALL
            .into_iter()
            .find(|pan| self.device_range(*pan).contains(&slot))
    }

    /// PAN that `slot` is a member of, counting the coordinator itself
    pub fn pan_of_member(&self, slot: NodeSlot) -> Option<Pan> {
        Pan::ALL
            .into_iter()
            .find(|pan| pan.coordinator_slot() == slot)
            .or_else(|| self.pan_of_device(slot))
    }

    /// All device slots of both PANs that fit inside the slot arrays
    pub fn device_slots(&self) -> impl Iterator<Item = NodeSlot> + '_ {
        (FIRST_DEVICE_SLOT..FIRST_DEVICE_SLOT + 2 * self.devices_per_pan)
            .filter(move |slot| self.contains(*slot))
    }
}

impl Default for PanLayout {
    fn default() -> Self {
        Self::new(12)
    }
}

/// Which side of a coordinator/device link a counter describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Coordinator,
    Device,
}

/// The six counters kept for one role at one slot.
///
/// Counters only ever increase within a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleCounters {
    pub dequeued: u64,
    pub data_received: u64,
    pub acked: u64,
    pub acked_zero_retry: u64,
    pub acked_single_retry: u64,
    pub acked_multiple_retry: u64,
}

impl RoleCounters {
    /// Count an acknowledgment and file it under the bucket for `retries`
    pub fn record_ack(&mut self, retries: u32) {
        self.acked += 1;
        match retries {
            0 => self.acked_zero_retry += 1,
            1 => self.acked_single_retry += 1,
            _ => self.acked_multiple_retry += 1,
        }
    }
}

/// Coordinator-role and device-role counters for one slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeCounters {
    pub coordinator: RoleCounters,
    pub device: RoleCounters,
}

impl NodeCounters {
    pub fn role(&self, role: Role) -> &RoleCounters {
        match role {
            Role::Coordinator => &self.coordinator,
            Role::Device => &self.device,
        }
    }

    pub fn role_mut(&mut self, role: Role) -> &mut RoleCounters {
        match role {
            Role::Coordinator => &mut self.coordinator,
            Role::Device => &mut self.device,
        }
    }
}

/// The seven per-slot ratios derived from a trace file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PdrMetric {
    CoordinatorToDevicePdr,
    DeviceToCoordinatorPdr,
    TwoWayPdr,
    DeviceSingleRetryRatio,
    DeviceMultipleRetryRatio,
    CoordinatorSingleRetryRatio,
    CoordinatorMultipleRetryRatio,
}

impl PdrMetric {
    pub const ALL: [PdrMetric; 7] = [
        PdrMetric::CoordinatorToDevicePdr,
        PdrMetric::DeviceToCoordinatorPdr,
        PdrMetric::TwoWayPdr,
        PdrMetric::DeviceSingleRetryRatio,
        PdrMetric::DeviceMultipleRetryRatio,
        PdrMetric::CoordinatorSingleRetryRatio,
        PdrMetric::CoordinatorMultipleRetryRatio,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PdrMetric::CoordinatorToDevicePdr => "coordinator_to_device_pdr",
            PdrMetric::DeviceToCoordinatorPdr => "device_to_coordinator_pdr",
            PdrMetric::TwoWayPdr => "two_way_pdr",
            PdrMetric::DeviceSingleRetryRatio => "device_single_retry_ratio",
            PdrMetric::DeviceMultipleRetryRatio => "device_multiple_retry_ratio",
            PdrMetric::CoordinatorSingleRetryRatio => "coordinator_single_retry_ratio",
            PdrMetric::CoordinatorMultipleRetryRatio => "coordinator_multiple_retry_ratio",
        }
    }
}

/// Derived ratios for one slot; all zero when the run lacked evidence
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SlotMetrics {
    pub coordinator_to_device_pdr: f64,
    pub device_to_coordinator_pdr: f64,
    pub two_way_pdr: f64,
    pub device_single_retry_ratio: f64,
    pub device_multiple_retry_ratio: f64,
    pub coordinator_single_retry_ratio: f64,
    pub coordinator_multiple_retry_ratio: f64,
}

impl SlotMetrics {
    pub fn get(&self, metric: PdrMetric) -> f64 {
        match metric {
            PdrMetric::CoordinatorToDevicePdr => self.coordinator_to_device_pdr,
            PdrMetric::DeviceToCoordinatorPdr => self.device_to_coordinator_pdr,
            PdrMetric::TwoWayPdr => self.two_way_pdr,
            PdrMetric::DeviceSingleRetryRatio => self.device_single_retry_ratio,
            PdrMetric::DeviceMultipleRetryRatio => self.device_multiple_retry_ratio,
            PdrMetric::CoordinatorSingleRetryRatio => self.coordinator_single_retry_ratio,
            PdrMetric::CoordinatorMultipleRetryRatio => self.coordinator_multiple_retry_ratio,
        }
    }
}

/// Per-slot PDR and retry ratios for one trace file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub slots: Vec<SlotMetrics>,
}

impl RunMetrics {
    /// Metrics for `slot`, zero for slots outside the run's arrays
    pub fn slot(&self, slot: NodeSlot) -> SlotMetrics {
        self.slots.get(slot).copied().unwrap_or_default()
    }

    /// One metric across every slot, indexed by slot
    pub fn column(&self, metric: PdrMetric) -> Vec<f64> {
        self.slots.iter().map(|m| m.get(metric)).collect()
    }
}

/// Direction of a coordinator/device link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkDirection {
    /// Device to coordinator
    Uplink,
    /// Coordinator to device
    Downlink,
}

impl LinkDirection {
    pub const ALL: [LinkDirection; 2] = [LinkDirection::Uplink, LinkDirection::Downlink];
}

/// Uplink and downlink ratio for one slot or one PAN
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkRatios {
    pub uplink: f64,
    pub downlink: f64,
}

impl LinkRatios {
    pub fn get(&self, direction: LinkDirection) -> f64 {
        match direction {
            LinkDirection::Uplink => self.uplink,
            LinkDirection::Downlink => self.downlink,
        }
    }
}

/// Link ratios per slot plus the per-PAN group totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRatioSet {
    pub slots: Vec<LinkRatios>,
    pub pans: [LinkRatios; 2],
}

impl LinkRatioSet {
    pub fn column(&self, direction: LinkDirection) -> Vec<f64> {
        self.slots.iter().map(|r| r.get(direction)).collect()
    }

    pub fn pan(&self, pan: Pan) -> LinkRatios {
        self.pans[pan.index()]
    }
}

/// Network-level totals for one PAN from a stat file
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PanSummary {
    pub frames_sent: u64,
    pub frames_received: u64,
    pub bytes_to_upper_layer: u64,
    pub pdr: f64,
    pub throughput_kbps: f64,
}

/// Whole-run summary derived from one stat file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub pans: [PanSummary; 2],
    /// End-to-end delay per slot, 0 when the run had no sample
    pub end_to_end_delay: Vec<f64>,
}

impl RunSummary {
    pub fn pan(&self, pan: Pan) -> &PanSummary {
        &self.pans[pan.index()]
    }

    pub fn scalar(&self, metric: StatMetric) -> f64 {
        match metric {
            StatMetric::Pan1Pdr => self.pans[0].pdr,
            StatMetric::Pan2Pdr => self.pans[1].pdr,
            StatMetric::Pan1ThroughputKbps => self.pans[0].throughput_kbps,
            StatMetric::Pan2ThroughputKbps => self.pans[1].throughput_kbps,
        }
    }
}

/// Scalar metrics reported per stat file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatMetric {
    Pan1Pdr,
    Pan2Pdr,
    Pan1ThroughputKbps,
    Pan2ThroughputKbps,
}

impl StatMetric {
    pub const ALL: [StatMetric; 4] = [
        StatMetric::Pan1Pdr,
        StatMetric::Pan2Pdr,
        StatMetric::Pan1ThroughputKbps,
        StatMetric::Pan2ThroughputKbps,
    ];
}

/// Line accounting for one parsed file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineStats {
    /// Lines read
    pub lines: usize,
    /// Lines that looked relevant but were short or had bad numbers
    pub malformed: usize,
    /// Lines that were well formed but not an event we track
    pub ignored: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_ranges() {
        let layout = PanLayout::new(12);
        assert_eq!(layout.slot_count(), 36);
        assert_eq!(layout.device_range(Pan::One), 3..15);
        assert_eq!(layout.device_range(Pan::Two), 15..27);
        assert_eq!(layout.pan_of_device(3), Some(Pan::One));
        assert_eq!(layout.pan_of_device(14), Some(Pan::One));
        assert_eq!(layout.pan_of_device(15), Some(Pan::Two));
        assert_eq!(layout.pan_of_device(27), None);
        assert_eq!(layout.pan_of_device(1), None);
        assert_eq!(layout.pan_of_member(1), Some(Pan::One));
        assert_eq!(layout.pan_of_member(2), Some(Pan::Two));
        assert_eq!(layout.device_slots().count(), 24);
    }

    #[test]
    fn test_small_layout_device_slots_stay_in_bounds() {
        // With one device per PAN the second device id does not fit in 3 slots
        let layout = PanLayout::new(1);
        let slots: Vec<NodeSlot> = layout.device_slots().collect();
        assert_eq!(slots, Vec::<NodeSlot>::new());

        let layout = PanLayout::new(2);
        let slots: Vec<NodeSlot> = layout.device_slots().collect();
        assert_eq!(slots, vec![3, 4, 5]);
    }

    #[test]
    fn test_record_ack_buckets() {
        let mut counters = RoleCounters::default();
        counters.record_ack(0);
        counters.record_ack(1);
        counters.record_ack(2);
        counters.record_ack(7);
        assert_eq!(counters.acked, 4);
        assert_eq!(counters.acked_zero_retry, 1);
        assert_eq!(counters.acked_single_retry, 1);
        assert_eq!(counters.acked_multiple_retry, 2);
    }

    #[test]
    fn test_run_metrics_out_of_range_slot_is_zero() {
        let metrics = RunMetrics { slots: vec![SlotMetrics::default(); 4] };
        assert_eq!(metrics.slot(100), SlotMetrics::default());
    }
}
