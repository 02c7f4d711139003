//! The ordered chain of deltas kept for a zone.

use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Unbounded};

use tracing::trace;

use crate::base::Serial;
use crate::config::ZoneIxfrConfig;

use super::delta::IxfrDelta;

//------------ ZoneIxfr ------------------------------------------------------

/// The IXFR version history of a single zone.
///
/// Deltas are kept ordered by their old serial. In a chain fit for
/// service each delta's new serial equals the next delta's old serial and
/// the last delta's new serial equals the zone's current serial;
/// [`connected`][Self::connected] checks exactly that.
///
/// The map is keyed by the raw serial integer. Since eviction bounds how
/// many versions are resident at once, the chain cannot span a serial
/// wrap-around in practice; [`find`][Self::find] uses equality only and
/// is therefore safe even for wrapped values.
#[derive(Clone, Debug, Default)]
pub struct ZoneIxfr {
    deltas: BTreeMap<u32, IxfrDelta>,
    total_size: u64,
    num_files: u32,
}

impl ZoneIxfr {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of deltas in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    /// Returns whether the chain is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    /// Returns the summed size of all deltas in the chain.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Returns the number of files the chain is persisted in.
    #[must_use]
    pub fn num_files(&self) -> u32 {
        self.num_files
    }

    pub(crate) fn set_num_files(&mut self, num_files: u32) {
        self.num_files = num_files
    }

    /// Returns the delta that upgrades from the given serial.
    #[must_use]
    pub fn find(&self, old_serial: Serial) -> Option<&IxfrDelta> {
        self.deltas.get(&old_serial.into_int())
    }

    /// Inserts a delta into the chain.
    ///
    /// A delta already keyed by the same old serial is replaced.
    pub fn add(&mut self, delta: IxfrDelta) {
        self.total_size += delta.size();
        if let Some(old) =
            self.deltas.insert(delta.old_serial().into_int(), delta)
        {
            self.total_size -= old.size();
        }
    }

    /// Removes and returns the delta with the given old serial.
    pub fn remove(&mut self, old_serial: Serial) -> Option<IxfrDelta> {
        let delta = self.deltas.remove(&old_serial.into_int())?;
        self.total_size -= delta.size();
        Some(delta)
    }

    /// Removes the oldest delta from the chain.
    pub fn remove_oldest(&mut self) {
        if let Some(&oldest) = self.deltas.keys().next() {
            trace!(
                "evicting IXFR delta {} -> {}",
                self.deltas[&oldest].old_serial(),
                self.deltas[&oldest].new_serial()
            );
            self.remove(Serial(oldest));
        }
    }

    /// Removes all deltas.
    pub fn clear(&mut self) {
        self.deltas.clear();
        self.total_size = 0;
    }

    /// Returns the oldest delta.
    #[must_use]
    pub fn first(&self) -> Option<&IxfrDelta> {
        self.deltas.values().next()
    }

    /// Returns the newest delta.
    #[must_use]
    pub fn last(&self) -> Option<&IxfrDelta> {
        self.deltas.values().next_back()
    }

    /// Returns the delta following the one with the given old serial.
    #[must_use]
    pub fn next_after(&self, old_serial: Serial) -> Option<&IxfrDelta> {
        self.deltas
            .range((Excluded(old_serial.into_int()), Unbounded))
            .map(|(_, delta)| delta)
            .next()
    }

    /// Returns the delta preceding the one with the given old serial.
    #[must_use]
    pub fn previous(&self, old_serial: Serial) -> Option<&IxfrDelta> {
        self.deltas
            .range((Unbounded, Excluded(old_serial.into_int())))
            .map(|(_, delta)| delta)
            .next_back()
    }

    /// Iterates over the deltas from oldest to newest.
    pub fn iter(
        &self,
    ) -> impl DoubleEndedIterator<Item = &IxfrDelta> + '_ {
        self.deltas.values()
    }

    pub(crate) fn iter_mut(
        &mut self,
    ) -> impl DoubleEndedIterator<Item = &mut IxfrDelta> + '_ {
        self.deltas.values_mut()
    }

    /// Checks that the chain is connected from `start` onwards.
    ///
    /// Walks forward from the delta keyed by `start`, checking that each
    /// delta's new serial is the next delta's old serial. Returns the
    /// final new serial, or `None` if `start` is unknown or the chain has
    /// a gap.
    #[must_use]
    pub fn connected(&self, start: Serial) -> Option<Serial> {
        let mut delta = self.find(start)?;
        loop {
            match self.next_after(delta.old_serial()) {
                Some(next) => {
                    if delta.new_serial() != next.old_serial() {
                        // A delta in between was evicted; the remainder
                        // cannot be served from here.
                        return None;
                    }
                    delta = next;
                }
                None => return Some(delta.new_serial()),
            }
        }
    }

    /// Makes room for a delta of the given size within the budgets.
    ///
    /// Evicts oldest deltas until both the count and, if configured, the
    /// size budget can accommodate the candidate. Returns `false` if the
    /// candidate cannot fit even into an empty chain, in which case the
    /// caller must discard it.
    pub fn make_space(
        &mut self,
        added: u64,
        config: &ZoneIxfrConfig,
    ) -> bool {
        if config.ixfr_number == 0 {
            return false;
        }

        while self.len() >= config.ixfr_number as usize {
            self.remove_oldest();
        }

        if config.ixfr_size == 0 {
            // no size limits imposed
            return true;
        }

        while !self.is_empty()
            && self.total_size + added > config.ixfr_size
        {
            self.remove_oldest();
        }

        // if deleting the oldest elements did not work, the candidate is
        // too big to store at all
        self.total_size + added <= config.ixfr_size
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;
    use bytes::Bytes;

    fn delta(old: u32, new: u32) -> IxfrDelta {
        IxfrDelta::new(
            Serial(old),
            Serial(new),
            Bytes::from_static(b"n"),
            Bytes::from_static(b"o"),
            Bytes::new(),
            Bytes::new(),
            None,
        )
    }

    fn config(number: u32, size: u64) -> ZoneIxfrConfig {
        ZoneIxfrConfig {
            store_ixfr: false,
            ixfr_number: number,
            ixfr_size: size,
        }
    }

    #[test]
    fn ordering_and_lookup() {
        let mut chain = ZoneIxfr::new();
        chain.add(delta(11, 12));
        chain.add(delta(10, 11));
        chain.add(delta(12, 13));

        assert_eq!(chain.len(), 3);
        assert_eq!(chain.first().unwrap().old_serial(), Serial(10));
        assert_eq!(chain.last().unwrap().new_serial(), Serial(13));
        assert_eq!(
            chain
                .iter()
                .map(|d| d.old_serial().into_int())
                .collect::<Vec<_>>(),
            [10, 11, 12]
        );
        assert_eq!(chain.find(Serial(11)).unwrap().new_serial(), Serial(12));
        assert!(chain.find(Serial(13)).is_none());
        assert_eq!(
            chain.next_after(Serial(10)).unwrap().old_serial(),
            Serial(11)
        );
        assert_eq!(
            chain.previous(Serial(11)).unwrap().old_serial(),
            Serial(10)
        );
        assert!(chain.previous(Serial(10)).is_none());
        assert!(chain.next_after(Serial(12)).is_none());
    }

    #[test]
    fn connectedness() {
        let mut chain = ZoneIxfr::new();
        chain.add(delta(10, 11));
        chain.add(delta(11, 12));
        chain.add(delta(12, 13));
        assert_eq!(chain.connected(Serial(10)), Some(Serial(13)));
        assert_eq!(chain.connected(Serial(12)), Some(Serial(13)));
        assert_eq!(chain.connected(Serial(9)), None);

        // a gap in the middle breaks connectedness from before the gap
        chain.remove(Serial(11)).unwrap();
        assert_eq!(chain.connected(Serial(10)), None);
        assert_eq!(chain.connected(Serial(12)), Some(Serial(13)));
    }

    #[test]
    fn total_size_tracking() {
        let mut chain = ZoneIxfr::new();
        let d = delta(10, 11);
        let size = d.size();
        chain.add(d);
        chain.add(delta(11, 12));
        assert_eq!(chain.total_size(), size + chain.last().unwrap().size());
        chain.remove_oldest();
        assert_eq!(chain.total_size(), chain.last().unwrap().size());
        chain.clear();
        assert_eq!(chain.total_size(), 0);
        chain.remove_oldest(); // no-op on empty
    }

    #[test]
    fn make_space_count_budget() {
        let mut chain = ZoneIxfr::new();
        chain.add(delta(10, 11));
        chain.add(delta(11, 12));
        assert!(chain.make_space(delta(12, 13).size(), &config(2, 0)));
        assert_eq!(chain.len(), 1);
        assert!(chain.find(Serial(10)).is_none());
        assert!(chain.find(Serial(11)).is_some());
    }

    #[test]
    fn make_space_disabled() {
        let mut chain = ZoneIxfr::new();
        assert!(!chain.make_space(1, &config(0, 0)));
    }

    #[test]
    fn make_space_size_budget() {
        let unit = delta(10, 11).size();
        let mut chain = ZoneIxfr::new();
        chain.add(delta(10, 11));
        chain.add(delta(11, 12));
        // room for three by count, but only two by size
        assert!(chain.make_space(unit, &config(10, 2 * unit)));
        assert_eq!(chain.len(), 1);
        // a candidate too large even for an empty chain is refused
        assert!(!chain.make_space(3 * unit, &config(10, 2 * unit)));
    }
}
