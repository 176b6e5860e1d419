//! Last-seen retry counts for in-flight transmissions.
//!
//! A `Tx-DATA` line records the retry count for a peer and the next
//! acknowledgment from that peer reads it back. Nothing but line order ties
//! the two together, so a trace whose lines were reordered produces a wrong
//! bucket and there is no way to detect it here.

use std::collections::HashMap;

use super::types::{NodeSlot, Pan};

/// Retry count per peer slot for one role
#[derive(Debug, Clone, Default)]
pub struct RetryLedger {
    entries: HashMap<NodeSlot, u32>,
}

impl RetryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the retry count for `peer`
    pub fn record(&mut self, peer: NodeSlot, retries: u32) {
        self.entries.insert(peer, retries);
    }

    /// Retry count for `peer`. Peers never seen in a `Tx-DATA` line read as 0.
    ///
    /// The entry is left in place; the next acknowledgment from the same peer
    /// without an intervening attempt sees the same count.
    pub fn last_retries(&self, peer: NodeSlot) -> u32 {
        self.entries.get(&peer).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Scratch state threaded through one trace file.
///
/// Coordinators log `Tx-DATA` without a destination, so the destination of
/// their latest dequeue stands in for it.
#[derive(Debug, Clone, Default)]
pub struct LinkScratch {
    /// Coordinator ledger keyed by destination device
    pub coordinator: RetryLedger,
    /// Device ledger keyed by the device's own slot
    pub device: RetryLedger,
    last_destination: [Option<NodeSlot>; 2],
}

impl LinkScratch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_last_destination(&mut self, pan: Pan, destination: NodeSlot) {
        self.last_destination[pan.index()] = Some(destination);
    }

    /// Destination of the coordinator's most recent dequeue, if any
    pub fn last_destination(&self, pan: Pan) -> Option<NodeSlot> {
        self.last_destination[pan.index()]
    }
}
