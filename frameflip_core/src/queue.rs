// Copyright 2026 the Frameflip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fixed-length event history.

use std::collections::VecDeque;
use std::num::NonZeroUsize;

/// Keeps the last `limit` recorded entries and counts what it evicted.
#[derive(Debug, Clone)]
pub(crate) struct History<T> {
    entries: VecDeque<T>,
    limit: NonZeroUsize,
    evicted: u64,
}

impl<T> History<T> {
    /// A history of at most `limit` entries; a zero limit keeps one.
    pub(crate) fn new(limit: usize) -> Self {
        let limit = NonZeroUsize::new(limit).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: VecDeque::with_capacity(limit.get()),
            limit,
            evicted: 0,
        }
    }

    /// Appends `entry`, returning the entry it pushed out, if any.
    pub(crate) fn record(&mut self, entry: T) -> Option<T> {
        let evicted = (self.entries.len() >= self.limit.get())
            .then(|| self.entries.pop_front())
            .flatten();
        if evicted.is_some() {
            self.evicted += 1;
        }
        self.entries.push_back(entry);
        evicted
    }

    /// Entries, oldest first.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    /// Entries pushed out since creation.
    pub(crate) fn evicted(&self) -> u64 {
        self.evicted
    }

    /// Forgets every entry and the eviction count.
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.evicted = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::History;

    #[test]
    fn oldest_entry_is_evicted_at_the_limit() {
        let mut history = History::new(2);
        assert_eq!(history.record('a'), None);
        assert_eq!(history.record('b'), None);
        assert_eq!(history.record('c'), Some('a'));
        assert_eq!(history.iter().copied().collect::<String>(), "bc");
        assert_eq!(history.evicted(), 1);
    }

    #[test]
    fn zero_limit_keeps_the_latest_entry() {
        let mut history = History::new(0);
        history.record(1_u8);
        history.record(2_u8);
        assert_eq!(history.iter().collect::<Vec<_>>(), [&2]);
        history.clear();
        assert_eq!(history.iter().count(), 0);
        assert_eq!(history.evicted(), 0, "clear resets the count");
    }
}
