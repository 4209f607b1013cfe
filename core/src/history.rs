//! Session history with tier-based retention.
//!
//! # Retention
//!
//! | Tier | Capacity | Pinned entries |
//! |------|----------|----------------|
//! | Free | 1 | not protected; every addition replaces the list |
//! | Pro  | [`PRO_CAPACITY`] | kept ahead of unpinned entries, so the tail trim only evicts unpinned ones |
//!
//! At most [`MAX_PINNED`] entries may be pinned at once. The limit is checked
//! when pinning, not when adding.

use jifra_types::{EntryId, HistoryEntry, Tier};

pub const FREE_CAPACITY: usize = 1;
pub const PRO_CAPACITY: usize = 20;
pub const MAX_PINNED: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PinRejected {
    #[error("pin limit reached ({limit} entries max)")]
    LimitReached { limit: usize },
}

/// Result of an accepted pin/unpin request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinOutcome {
    Changed,
    /// Entry already had the requested state, or no entry has that id.
    Unchanged,
}

/// Newest-first list of past results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryList {
    entries: Vec<HistoryEntry>,
}

impl HistoryList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: EntryId) -> Option<&HistoryEntry> {
        self.entries.iter().find(|entry| entry.id() == id)
    }

    #[must_use]
    pub fn pinned_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.is_pinned()).count()
    }

    /// Insert a fresh result at the front and apply the tier's retention rule.
    pub fn add_entry(&mut self, entry: HistoryEntry, tier: Tier) {
        self.entries.insert(0, entry.with_pinned(false));

        match tier {
            Tier::Free => self.entries.truncate(FREE_CAPACITY),
            Tier::Pro => {
                let (mut kept, unpinned): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
                    .into_iter()
                    .partition(HistoryEntry::is_pinned);
                kept.extend(unpinned);
                kept.truncate(PRO_CAPACITY);
                self.entries = kept;
            }
        }
    }

    /// Pin or unpin an entry.
    ///
    /// Pinning is refused when [`MAX_PINNED`] entries are already pinned.
    /// Requests that would not change anything succeed as `Unchanged`.
    pub fn set_pinned(&mut self, id: EntryId, pinned: bool) -> Result<PinOutcome, PinRejected> {
        let pinned_before = self.pinned_count();
        let Some(entry) = self.entries.iter_mut().find(|entry| entry.id() == id) else {
            return Ok(PinOutcome::Unchanged);
        };
        if entry.is_pinned() == pinned {
            return Ok(PinOutcome::Unchanged);
        }
        if pinned && pinned_before >= MAX_PINNED {
            return Err(PinRejected::LimitReached { limit: MAX_PINNED });
        }
        entry.set_pinned(pinned);
        Ok(PinOutcome::Changed)
    }

    /// Drop every unpinned entry, keeping the order of the rest.
    pub fn clear_unpinned(&mut self) {
        self.entries.retain(HistoryEntry::is_pinned);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jifra_types::{EntryIdGenerator, Style};

    struct Fixture {
        ids: EntryIdGenerator,
        list: HistoryList,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                ids: EntryIdGenerator::new(),
                list: HistoryList::new(),
            }
        }

        fn add(&mut self, tier: Tier) -> EntryId {
            let id = self.ids.next_id();
            let entry = HistoryEntry::new(id, Style::Casual, &format!("in {id}"), format!("out {id}"));
            self.list.add_entry(entry, tier);
            id
        }

        fn ids(&self) -> Vec<u64> {
            self.list.entries().iter().map(|e| e.id().value()).collect()
        }
    }

    #[test]
    fn free_tier_keeps_only_latest() {
        let mut fx = Fixture::new();
        for _ in 0..7 {
            fx.add(Tier::Free);
        }
        assert_eq!(fx.list.len(), 1);
        assert_eq!(fx.ids(), vec![6]);
        assert_eq!(fx.list.entries()[0].result(), "out 6");
    }

    #[test]
    fn free_tier_discards_pinned_entries() {
        let mut fx = Fixture::new();
        let first = fx.add(Tier::Pro);
        fx.list.set_pinned(first, true).unwrap();
        let latest = fx.add(Tier::Free);
        assert_eq!(fx.ids(), vec![latest.value()]);
        assert_eq!(fx.list.pinned_count(), 0);
    }

    #[test]
    fn pro_tier_caps_at_twenty_newest_first() {
        let mut fx = Fixture::new();
        for _ in 0..30 {
            fx.add(Tier::Pro);
        }
        assert_eq!(fx.list.len(), PRO_CAPACITY);
        let expected: Vec<u64> = (10..30).rev().collect();
        assert_eq!(fx.ids(), expected);
    }

    #[test]
    fn pro_tier_protects_pinned_from_eviction() {
        let mut fx = Fixture::new();
        let oldest = fx.add(Tier::Pro);
        let second = fx.add(Tier::Pro);
        fx.list.set_pinned(oldest, true).unwrap();
        fx.list.set_pinned(second, true).unwrap();
        for _ in 0..40 {
            fx.add(Tier::Pro);
        }
        assert_eq!(fx.list.len(), PRO_CAPACITY);
        // pinned partition keeps its own newest-first order
        assert_eq!(fx.ids()[..2], [second.value(), oldest.value()]);
        let unpinned: Vec<u64> = fx.ids()[2..].to_vec();
        let expected: Vec<u64> = (24..42).rev().collect();
        assert_eq!(unpinned, expected);
    }

    #[test]
    fn new_entries_always_arrive_unpinned() {
        let mut list = HistoryList::new();
        let entry = HistoryEntry::new(EntryId::new(9), Style::Sns, "x", "y").with_pinned(true);
        list.add_entry(entry, Tier::Pro);
        assert_eq!(list.pinned_count(), 0);
    }

    #[test]
    fn sixth_pin_is_rejected() {
        let mut fx = Fixture::new();
        let ids: Vec<EntryId> = (0..6).map(|_| fx.add(Tier::Pro)).collect();
        for id in &ids[..5] {
            assert_eq!(fx.list.set_pinned(*id, true), Ok(PinOutcome::Changed));
        }
        let before = fx.list.clone();
        assert_eq!(
            fx.list.set_pinned(ids[5], true),
            Err(PinRejected::LimitReached { limit: MAX_PINNED })
        );
        assert_eq!(fx.list, before);
        assert_eq!(fx.list.pinned_count(), 5);
    }

    #[test]
    fn unpin_always_allowed_and_decrements() {
        let mut fx = Fixture::new();
        let ids: Vec<EntryId> = (0..5).map(|_| fx.add(Tier::Pro)).collect();
        for id in &ids {
            fx.list.set_pinned(*id, true).unwrap();
        }
        assert_eq!(fx.list.set_pinned(ids[2], false), Ok(PinOutcome::Changed));
        assert_eq!(fx.list.pinned_count(), 4);
    }

    #[test]
    fn pin_is_idempotent() {
        let mut fx = Fixture::new();
        let ids: Vec<EntryId> = (0..5).map(|_| fx.add(Tier::Pro)).collect();
        for id in &ids {
            fx.list.set_pinned(*id, true).unwrap();
        }
        // already pinned at the limit: no-op, not a rejection
        assert_eq!(fx.list.set_pinned(ids[0], true), Ok(PinOutcome::Unchanged));
        let extra = fx.add(Tier::Pro);
        assert_eq!(fx.list.set_pinned(extra, false), Ok(PinOutcome::Unchanged));
    }

    #[test]
    fn unknown_id_is_a_no_op() {
        let mut fx = Fixture::new();
        fx.add(Tier::Pro);
        assert_eq!(
            fx.list.set_pinned(EntryId::new(999), true),
            Ok(PinOutcome::Unchanged)
        );
    }

    #[test]
    fn clear_unpinned_keeps_pinned_in_order_and_is_idempotent() {
        let mut fx = Fixture::new();
        let ids: Vec<EntryId> = (0..6).map(|_| fx.add(Tier::Pro)).collect();
        fx.list.set_pinned(ids[1], true).unwrap();
        fx.list.set_pinned(ids[4], true).unwrap();
        fx.list.clear_unpinned();
        assert_eq!(fx.ids(), vec![ids[4].value(), ids[1].value()]);
        let once = fx.list.clone();
        fx.list.clear_unpinned();
        assert_eq!(fx.list, once);
    }

    #[test]
    fn pinning_does_not_reorder_until_next_add() {
        let mut fx = Fixture::new();
        let a = fx.add(Tier::Pro);
        let b = fx.add(Tier::Pro);
        fx.list.set_pinned(a, true).unwrap();
        assert_eq!(fx.ids(), vec![b.value(), a.value()]);
        let c = fx.add(Tier::Pro);
        assert_eq!(fx.ids(), vec![a.value(), c.value(), b.value()]);
    }
}
