//! Bounded instruction history used by crash reports.

use crate::CpuRegisters;

/// Number of instruction boundaries retained for post-mortem traces.
pub const INSTRUCTION_HISTORY_CAPACITY: usize = 1024;

/// CPU state captured at one instruction boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct InstructionRecord {
    /// Register file as the instruction began.
    pub registers: CpuRegisters,
    /// First opcode word of the instruction.
    pub opcode: u16,
}

/// Fixed-capacity ring that overwrites its oldest entry when full.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    slots: Vec<T>,
    capacity: usize,
    next: usize,
}

impl<T: Clone> RingBuffer<T> {
    /// Creates an empty ring holding at most `capacity` items (minimum 1).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            next: 0,
        }
    }

    /// Maximum number of retained items.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of retained items.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` when nothing has been recorded.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Appends `item`, evicting the oldest entry when full.
    pub fn push(&mut self, item: T) {
        if self.slots.len() < self.capacity {
            self.slots.push(item);
        } else {
            self.slots[self.next] = item;
        }
        self.next = (self.next + 1) % self.capacity;
    }

    /// Most recently pushed item.
    #[must_use]
    pub fn latest(&self) -> Option<&T> {
        let index = (self.next + self.capacity - 1) % self.capacity;
        self.slots.get(index)
    }

    /// Iterates from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let split = if self.slots.len() < self.capacity {
            0
        } else {
            self.next
        };
        self.slots[split..].iter().chain(self.slots[..split].iter())
    }

    /// Copies the retained items, oldest first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }

    /// Forgets every item.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.next = 0;
    }
}

impl<T: Clone> Default for RingBuffer<T> {
    fn default() -> Self {
        Self::with_capacity(INSTRUCTION_HISTORY_CAPACITY)
    }
}
