//! Per-run counter storage.

use super::types::{NodeCounters, NodeSlot, Pan, PanLayout, Role, RoleCounters};

/// Counters accumulated over one trace file.
///
/// `own` is indexed by slot. The coordinator entries (slots 1 and 2) hold
/// only what was logged against the coordinator itself; totals over a PAN's
/// device group live in `group` and are never mixed into `own`.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeCounterSet {
    layout: PanLayout,
    own: Vec<NodeCounters>,
    group: [NodeCounters; 2],
}

impl NodeCounterSet {
    pub fn new(layout: PanLayout) -> Self {
        Self {
            layout,
            own: vec![NodeCounters::default(); layout.slot_count()],
            group: [NodeCounters::default(); 2],
        }
    }

    pub fn layout(&self) -> PanLayout {
        self.layout
    }

    pub fn slot_count(&self) -> usize {
        self.own.len()
    }

    pub fn own(&self, slot: NodeSlot) -> Option<&NodeCounters> {
        self.own.get(slot)
    }

    /// Totals over the device group of `pan`
    pub fn group(&self, pan: Pan) -> &NodeCounters {
        &self.group[pan.index()]
    }

    pub fn iter_own(&self) -> impl Iterator<Item = (NodeSlot, &NodeCounters)> {
        self.own.iter().enumerate()
    }

    /// Apply `update` to the `role` counters of a device slot and to the group
    /// total of the PAN that device belongs to.
    ///
    /// Returns false, touching nothing, when `slot` is outside the arrays.
    pub fn update_with_group(&mut self, slot: NodeSlot, role: Role, update: impl Fn(&mut RoleCounters)) -> bool {
        let Some(counters) = self.own.get_mut(slot) else {
            return false;
        };
        update(counters.role_mut(role));
        if let Some(pan) = self.layout.pan_of_device(slot) {
            update(self.group[pan.index()].role_mut(role));
        }
        true
    }

    /// Apply `update` to the `role` counters of `slot` only
    pub fn update_own(&mut self, slot: NodeSlot, role: Role, update: impl FnOnce(&mut RoleCounters)) -> bool {
        match self.own.get_mut(slot) {
            Some(counters) => {
                update(counters.role_mut(role));
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_totals_do_not_alias_coordinator_slots() {
        let mut set = NodeCounterSet::new(PanLayout::new(4));
        assert!(set.update_with_group(3, Role::Coordinator, |c| c.dequeued += 1));
        assert!(set.update_with_group(8, Role::Device, |c| c.data_received += 1));

        assert_eq!(set.group(Pan::One).coordinator.dequeued, 1);
        assert_eq!(set.group(Pan::Two).device.data_received, 1);
        assert_eq!(set.own(1).unwrap().coordinator.dequeued, 0);
        assert_eq!(set.own(2).unwrap().device.data_received, 0);
        assert_eq!(set.own(3).unwrap().coordinator.dequeued, 1);
    }

    #[test]
    fn test_out_of_range_slot_is_rejected() {
        let mut set = NodeCounterSet::new(PanLayout::new(4));
        assert!(!set.update_with_group(12, Role::Device, |c| c.dequeued += 1));
        assert!(!set.update_own(40, Role::Device, |c| c.acked += 1));
        assert!(set.iter_own().all(|(_, c)| *c == NodeCounters::default()));
        assert_eq!(*set.group(Pan::Two), NodeCounters::default());
    }

    #[test]
    fn test_slot_outside_both_groups_has_no_group_total() {
        // 3 * 4 = 12 slots, devices 3..11; slot 11 belongs to neither PAN
        let mut set = NodeCounterSet::new(PanLayout::new(4));
        assert!(set.update_with_group(11, Role::Device, |c| c.dequeued += 1));
        assert_eq!(set.own(11).unwrap().device.dequeued, 1);
        assert_eq!(*set.group(Pan::One), NodeCounters::default());
        assert_eq!(*set.group(Pan::Two), NodeCounters::default());
    }
}
