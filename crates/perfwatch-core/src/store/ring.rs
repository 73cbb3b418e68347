//! Fixed-capacity log with stable sequence numbers

use std::collections::VecDeque;

/// Append-only ring that evicts its oldest entry once full.
///
/// Every pushed entry gets a sequence number that never changes and is never
/// reused, so callers can keep `seq` handles in side indexes and resolve them
/// in O(1) for as long as the entry is retained.
#[derive(Debug)]
pub struct BoundedLog<T> {
    entries: VecDeque<T>,
    capacity: usize,
    /// Sequence number of `entries[0]`
    head_seq: u64,
}

impl<T> BoundedLog<T> {
    /// Create an empty log; `capacity` must be non-zero
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than 0");
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            head_seq: 0,
        }
    }

    /// Append an entry, returning its sequence number and the evicted entry if
    /// the log was full
    pub fn push(&mut self, entry: T) -> (u64, Option<T>) {
        let evicted = if self.entries.len() == self.capacity {
            self.head_seq += 1;
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(entry);
        (self.next_seq() - 1, evicted)
    }

    /// Entry with the given sequence number, if still retained
    pub fn get(&self, seq: u64) -> Option<&T> {
        let offset = seq.checked_sub(self.head_seq)?;
        self.entries.get(usize::try_from(offset).ok()?)
    }

    /// Mutable access by sequence number
    pub fn get_mut(&mut self, seq: u64) -> Option<&mut T> {
        let offset = seq.checked_sub(self.head_seq)?;
        self.entries.get_mut(usize::try_from(offset).ok()?)
    }

    /// Sequence number the next push will receive
    pub fn next_seq(&self) -> u64 {
        self.head_seq + self.entries.len() as u64
    }

    /// Oldest to newest
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
