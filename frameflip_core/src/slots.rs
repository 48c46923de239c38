// Copyright 2026 the Frameflip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fixed-size frame slot pool with a tagged lifecycle.
//!
//! Every slot carries exactly one [`SlotState`], so the pool is always a
//! partition of `0..len`: a slot can never be in two collections at once
//! and the presenting slot is a singleton. FIFO order within the free,
//! queued and discard collections is recovered from a monotonically
//! increasing arrival stamp written on every transition.
//!
//! ```text
//!             enqueue              present
//!   Free ───────────────► Queued ───────────► Presenting
//!    ▲                      │                     │
//!    │        release       ▼ discard             │ replaced
//!    └──────────────────  Discard ◄───────────────┘
//! ```
//!
//! Transitions check their source state and leave the pool untouched when
//! it does not match.

use crate::slot::SlotIndex;
use crate::time::{MediaTime, NOPTS};
use crate::timing::{PresentField, PresentMethod};

/// Which lifecycle collection a slot belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SlotState {
    /// Available for the producer to fill.
    Free,
    /// Filled and waiting for selection.
    Queued,
    /// Currently shown by the backend.
    Presenting,
    /// Retired, waiting for the backend to let go of it.
    Discard,
}

/// One entry of the pool.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameSlot {
    /// Presentation timestamp of the queued content.
    pub pts: MediaTime,
    /// Field shown first.
    pub field: PresentField,
    /// How the frame is rendered.
    pub method: PresentMethod,
    state: SlotState,
    arrival: u64,
}

impl FrameSlot {
    const fn new(state: SlotState, arrival: u64) -> Self {
        Self {
            pts: NOPTS,
            field: PresentField::None,
            method: PresentMethod::Single,
            state,
            arrival,
        }
    }

    /// Returns the collection this slot belongs to.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> SlotState {
        self.state
    }
}

/// Per-collection occupancy counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SlotCounts {
    /// Free slots.
    pub free: usize,
    /// Queued slots.
    pub queued: usize,
    /// Discarded slots.
    pub discard: usize,
    /// Presenting slots (0 or 1).
    pub presenting: usize,
}

impl SlotCounts {
    /// Sum over all collections.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.free + self.queued + self.discard + self.presenting
    }
}

/// The slot pool.
#[derive(Clone, Debug, PartialEq)]
pub struct SlotPool {
    slots: Vec<FrameSlot>,
    next_arrival: u64,
}

impl SlotPool {
    /// Creates a pool of `len` slots: slot 0 presenting, the rest free in
    /// index order.
    #[must_use]
    pub fn new(len: usize) -> Self {
        let mut pool = Self {
            slots: Vec::new(),
            next_arrival: 0,
        };
        pool.reset(len);
        pool
    }

    /// Reinitializes the pool to `len` slots with the [`new`](Self::new)
    /// layout.
    pub fn reset(&mut self, len: usize) {
        self.slots.clear();
        self.next_arrival = 0;
        for index in 0..len {
            let state = if index == 0 {
                SlotState::Presenting
            } else {
                SlotState::Free
            };
            let arrival = self.stamp();
            self.slots.push(FrameSlot::new(state, arrival));
        }
    }

    /// Number of slots.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if the pool has no slots.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns the slot at `index`.
    #[must_use]
    pub fn get(&self, index: SlotIndex) -> Option<&FrameSlot> {
        self.slots.get(index.0)
    }

    /// Returns the collection of the slot at `index`.
    #[must_use]
    pub fn state_of(&self, index: SlotIndex) -> Option<SlotState> {
        self.get(index).map(FrameSlot::state)
    }

    /// Returns the state of every slot in index order.
    #[must_use]
    pub fn states(&self) -> Vec<SlotState> {
        self.slots.iter().map(FrameSlot::state).collect()
    }

    /// Oldest member of `state`.
    #[must_use]
    pub fn front(&self, state: SlotState) -> Option<SlotIndex> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.state == state)
            .min_by_key(|(_, slot)| slot.arrival)
            .map(|(index, _)| SlotIndex(index))
    }

    /// Members of `state`, oldest first.
    #[must_use]
    pub fn members(&self, state: SlotState) -> Vec<SlotIndex> {
        let mut members: Vec<(u64, SlotIndex)> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.state == state)
            .map(|(index, slot)| (slot.arrival, SlotIndex(index)))
            .collect();
        members.sort_unstable_by_key(|(arrival, _)| *arrival);
        members.into_iter().map(|(_, index)| index).collect()
    }

    /// Number of members of `state`.
    #[must_use]
    pub fn count(&self, state: SlotState) -> usize {
        self.slots.iter().filter(|slot| slot.state == state).count()
    }

    /// Occupancy of every collection.
    #[must_use]
    pub fn counts(&self) -> SlotCounts {
        let mut counts = SlotCounts::default();
        for slot in &self.slots {
            match slot.state {
                SlotState::Free => counts.free += 1,
                SlotState::Queued => counts.queued += 1,
                SlotState::Presenting => counts.presenting += 1,
                SlotState::Discard => counts.discard += 1,
            }
        }
        counts
    }

    /// The slot currently shown.
    #[must_use]
    pub fn presenting(&self) -> Option<SlotIndex> {
        self.front(SlotState::Presenting)
    }

    /// Moves a free slot to the back of the queue with its frame attributes.
    pub fn enqueue(
        &mut self,
        index: SlotIndex,
        pts: MediaTime,
        field: PresentField,
        method: PresentMethod,
    ) -> bool {
        if !self.transition(index, SlotState::Free, SlotState::Queued) {
            return false;
        }
        let slot = &mut self.slots[index.0];
        slot.pts = pts;
        slot.field = field;
        slot.method = method;
        true
    }

    /// Makes a queued slot the presenting one; the previous presenting
    /// slot moves to the back of the discard collection.
    pub fn present(&mut self, index: SlotIndex) -> bool {
        if self.state_of(index) != Some(SlotState::Queued) {
            return false;
        }
        if let Some(previous) = self.presenting() {
            self.transition(previous, SlotState::Presenting, SlotState::Discard);
        }
        self.transition(index, SlotState::Queued, SlotState::Presenting)
    }

    /// Retires a queued slot without showing it.
    pub fn discard(&mut self, index: SlotIndex) -> bool {
        self.transition(index, SlotState::Queued, SlotState::Discard)
    }

    /// Returns a discarded slot to the free collection.
    pub fn release(&mut self, index: SlotIndex) -> bool {
        self.transition(index, SlotState::Discard, SlotState::Free)
    }

    /// Checks that the pool partitions `0..len` with at most one
    /// presenting slot.
    #[must_use]
    pub fn is_partition(&self) -> bool {
        let counts = self.counts();
        counts.total() == self.slots.len() && counts.presenting <= 1
    }

    fn transition(&mut self, index: SlotIndex, from: SlotState, to: SlotState) -> bool {
        let arrival = self.next_arrival;
        match self.slots.get_mut(index.0) {
            Some(slot) if slot.state == from => {
                slot.state = to;
                slot.arrival = arrival;
                self.next_arrival += 1;
                true
            }
            _ => false,
        }
    }

    fn stamp(&mut self) -> u64 {
        let arrival = self.next_arrival;
        self.next_arrival += 1;
        arrival
    }
}

impl Default for SlotPool {
    fn default() -> Self {
        Self::new(0)
    }
}
