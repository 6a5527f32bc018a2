//! Time-ordered event queue measured in fractional microseconds.
//!
//! Each event identity owns at most one live entry. Arming an identity that is
//! already pending moves it instead of adding a duplicate.

use std::cmp::Ordering;

/// Slack used when deciding whether an entry is due, absorbing `f64` drift
/// accumulated by repeated fractional advances.
pub const DUE_EPSILON_USEC: f64 = 1e-9;

/// Timed callbacks owned by the machine.
///
/// Declaration order is the dispatch priority for entries due at the same
/// instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum SchedulerEvent {
    /// Video half-line tick.
    HalfLine,
}

/// One due event handed back by [`EventQueue::pop_due`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DueEvent<E> {
    /// Event identity.
    pub event: E,
    /// Absolute time the event was armed for, in microseconds.
    pub time: f64,
}

#[derive(Debug, Clone, Copy)]
struct Entry<E> {
    time: f64,
    event: E,
    active: bool,
    sequence: u64,
}

/// Absolute-time event queue with one live entry per event identity.
#[derive(Debug, Clone)]
pub struct EventQueue<E> {
    now: f64,
    entries: Vec<Entry<E>>,
    next_sequence: u64,
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self {
            now: 0.0,
            entries: Vec::new(),
            next_sequence: 0,
        }
    }
}

impl<E: Copy + Ord> EventQueue<E> {
    /// Creates an empty queue at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current emulated time in microseconds.
    #[must_use]
    pub const fn now(&self) -> f64 {
        self.now
    }

    /// Arms `event` to fire `delay_usec` after the current time.
    ///
    /// Negative or non-finite delays fire at the current time.
    pub fn schedule_in(&mut self, event: E, delay_usec: f64) {
        let delay = if delay_usec.is_finite() {
            delay_usec.max(0.0)
        } else {
            0.0
        };
        self.schedule_at(event, self.now + delay);
    }

    /// Arms `event` at absolute time `time_usec`, replacing any live entry.
    ///
    /// A time already in the past is kept as is, so the entry is due at once
    /// and still sorts before later deadlines. Non-finite times fire now.
    pub fn schedule_at(&mut self, event: E, time_usec: f64) {
        let time = if time_usec.is_finite() {
            time_usec
        } else {
            self.now
        };
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);

        if let Some(entry) = self.entries.iter_mut().find(|entry| entry.event == event) {
            entry.time = time;
            entry.active = true;
            entry.sequence = sequence;
        } else {
            self.entries.push(Entry {
                time,
                event,
                active: true,
                sequence,
            });
        }
    }

    /// Disarms `event`. Returns `true` when a live entry was removed.
    pub fn cancel(&mut self, event: E) -> bool {
        self.entries
            .iter_mut()
            .find(|entry| entry.event == event && entry.active)
            .is_some_and(|entry| {
                entry.active = false;
                true
            })
    }

    /// Returns `true` when `event` has a live entry.
    #[must_use]
    pub fn is_armed(&self, event: E) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.event == event && entry.active)
    }

    /// Number of live entries.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.entries.iter().filter(|entry| entry.active).count()
    }

    /// Time from now until the soonest live entry, or `None` when idle.
    #[must_use]
    pub fn time_to_next_event(&self) -> Option<f64> {
        self.next_entry()
            .map(|entry| (entry.time - self.now).max(0.0))
    }

    /// Moves the current time forward by `duration_usec`.
    ///
    /// Negative or non-finite durations are ignored.
    #[allow(clippy::missing_const_for_fn)]
    pub fn advance(&mut self, duration_usec: f64) {
        if duration_usec.is_finite() && duration_usec > 0.0 {
            self.now += duration_usec;
        }
    }

    /// Takes the earliest due entry, if any.
    ///
    /// Entries are ordered by time, then by event priority, then by arm order.
    /// Call repeatedly until `None`; entries re-armed by a handler are
    /// returned again when they are already due.
    pub fn pop_due(&mut self) -> Option<DueEvent<E>> {
        let limit = self.now + DUE_EPSILON_USEC;
        let entry = self
            .entries
            .iter_mut()
            .filter(|entry| entry.active && entry.time <= limit)
            .min_by(|a, b| compare_entries(a, b))?;
        entry.active = false;
        Some(DueEvent {
            event: entry.event,
            time: entry.time,
        })
    }

    /// Drops every entry and rewinds time to zero.
    pub fn reset(&mut self) {
        self.now = 0.0;
        self.entries.clear();
        self.next_sequence = 0;
    }

    fn next_entry(&self) -> Option<&Entry<E>> {
        self.entries
            .iter()
            .filter(|entry| entry.active)
            .min_by(|a, b| compare_entries(a, b))
    }
}

fn compare_entries<E: Ord>(a: &Entry<E>, b: &Entry<E>) -> Ordering {
    a.time
        .total_cmp(&b.time)
        .then_with(|| a.event.cmp(&b.event))
        .then_with(|| a.sequence.cmp(&b.sequence))
}
