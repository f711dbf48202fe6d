//! Bounded journal of accepted lifecycle events.
//!
//! The journal keeps the most recent events in arrival order so a failing
//! sanity check can be explained after the fact. When full, the oldest entry
//! is dropped. A capacity of zero disables recording.

use std::collections::VecDeque;

use lineage_core::id::{AsyncId, Stamp};
use lineage_core::resource::LifecycleEvent;
use serde::Serialize;

/// One accepted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JournalEntry {
    /// When the event was accepted.
    pub stamp: Stamp,
    /// Which event.
    pub event: LifecycleEvent,
    /// The resource it applied to.
    pub uid: AsyncId,
}

/// Ring buffer of [`JournalEntry`] values.
#[derive(Debug, Clone)]
pub struct Journal {
    capacity: usize,
    entries: VecDeque<JournalEntry>,
    dropped: u64,
}

impl Journal {
    /// Creates a journal holding at most `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity.min(64)),
            dropped: 0,
        }
    }

    /// Appends an entry, evicting the oldest one when full.
    pub fn record(&mut self, stamp: Stamp, event: LifecycleEvent, uid: AsyncId) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
            self.dropped += 1;
        }
        self.entries.push_back(JournalEntry { stamp, event, uid });
    }

    /// Iterates over retained entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &JournalEntry> {
        self.entries.iter()
    }

    /// Returns retained entries concerning `uid`, oldest first.
    #[must_use]
    pub fn entries_for(&self, uid: AsyncId) -> Vec<JournalEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.uid == uid)
            .copied()
            .collect()
    }

    /// Returns the number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the maximum number of retained entries.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns how many entries were evicted.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oldest_entries_are_evicted() {
        let mut journal = Journal::with_capacity(2);
        journal.record(Stamp::new(1), LifecycleEvent::Init, AsyncId::new(2));
        journal.record(Stamp::new(2), LifecycleEvent::Before, AsyncId::new(2));
        journal.record(Stamp::new(3), LifecycleEvent::After, AsyncId::new(2));

        let events: Vec<LifecycleEvent> = journal.iter().map(|entry| entry.event).collect();
        assert_eq!(events, vec![LifecycleEvent::Before, LifecycleEvent::After]);
        assert_eq!(journal.dropped(), 1);
    }

    #[test]
    fn zero_capacity_records_nothing() {
        let mut journal = Journal::with_capacity(0);
        journal.record(Stamp::new(1), LifecycleEvent::Init, AsyncId::new(2));
        assert!(journal.is_empty());
        assert_eq!(journal.dropped(), 0);
    }

    #[test]
    fn entries_for_filters_by_resource() {
        let mut journal = Journal::with_capacity(8);
        journal.record(Stamp::new(1), LifecycleEvent::Init, AsyncId::new(2));
        journal.record(Stamp::new(2), LifecycleEvent::Init, AsyncId::new(3));
        journal.record(Stamp::new(3), LifecycleEvent::Destroy, AsyncId::new(2));

        let entries = journal.entries_for(AsyncId::new(2));
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].event, LifecycleEvent::Destroy);
    }
}
