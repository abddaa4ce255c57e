//! Sequence numbers and the table of requests awaiting a response.
//!
//! Sequence numbers run 0..=254 and wrap. The table has no expiry: an entry
//! lives until its response arrives or until the counter wraps around and a
//! new command reuses the slot, silently replacing it. With 255 slots that is
//! the capacity limit for outstanding requests.

use std::collections::HashMap;

/// Number of distinct sequence values (0..=254).
pub const SEQUENCE_SPACE: u16 = 255;

/// Wrapping sequence counter.
#[derive(Debug, Clone, Default)]
pub struct SequenceCounter {
    next: u8,
}

impl SequenceCounter {
    /// Create a counter starting at 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the current value and advance, wrapping 254 -> 0.
    pub fn next(&mut self) -> u8 {
        let seq = self.next;
        self.next = ((u16::from(seq) + 1) % SEQUENCE_SPACE) as u8;
        seq
    }

    /// Value the next call to [`next`](Self::next) will return.
    #[inline]
    pub fn peek(&self) -> u8 {
        self.next
    }

    /// Reset to 0.
    pub fn reset(&mut self) {
        self.next = 0;
    }
}

/// The command a pending sequence number belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PendingRequest {
    /// Subsystem the command was addressed to.
    pub device_id: u8,
    /// Operation within the subsystem.
    pub command_id: u8,
}

impl PendingRequest {
    /// Create a new pending entry.
    pub fn new(device_id: u8, command_id: u8) -> Self {
        Self {
            device_id,
            command_id,
        }
    }
}

/// Map from sequence number to the request awaiting a response.
#[derive(Debug, Default)]
pub struct PendingTable {
    entries: HashMap<u8, PendingRequest>,
}

impl PendingTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request, returning the entry it replaced (sequence reuse).
    pub fn insert(&mut self, sequence: u8, request: PendingRequest) -> Option<PendingRequest> {
        self.entries.insert(sequence, request)
    }

    /// Remove and return the entry for a sequence number.
    pub fn resolve(&mut self, sequence: u8) -> Option<PendingRequest> {
        self.entries.remove(&sequence)
    }

    /// Look up an entry without removing it.
    pub fn get(&self, sequence: u8) -> Option<&PendingRequest> {
        self.entries.get(&sequence)
    }

    /// Check if a sequence number is outstanding.
    pub fn contains(&self, sequence: u8) -> bool {
        self.entries.contains_key(&sequence)
    }

    /// Number of outstanding requests.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is outstanding.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_starts_at_zero() {
        let mut counter = SequenceCounter::new();
        assert_eq!(counter.next(), 0);
        assert_eq!(counter.next(), 1);
        assert_eq!(counter.peek(), 2);
    }

    #[test]
    fn test_counter_wraps_after_254() {
        let mut counter = SequenceCounter::new();
        let values: Vec<u8> = (0..256).map(|_| counter.next()).collect();

        assert_eq!(values[254], 254);
        assert_eq!(values[255], 0);
        assert!(!values.contains(&255));
    }

    #[test]
    fn test_counter_reset() {
        let mut counter = SequenceCounter::new();
        counter.next();
        counter.next();
        counter.reset();
        assert_eq!(counter.next(), 0);
    }

    #[test]
    fn test_table_insert_resolve() {
        let mut table = PendingTable::new();
        assert!(table.insert(3, PendingRequest::new(0x1A, 0x1C)).is_none());
        assert!(table.contains(3));
        assert_eq!(table.len(), 1);

        assert_eq!(table.resolve(3), Some(PendingRequest::new(0x1A, 0x1C)));
        assert!(table.resolve(3).is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn test_table_overwrite_returns_previous() {
        let mut table = PendingTable::new();
        table.insert(0, PendingRequest::new(0x1A, 0x1C));

        let old = table.insert(0, PendingRequest::new(0x1A, 0x2F));

        assert_eq!(old, Some(PendingRequest::new(0x1A, 0x1C)));
        assert_eq!(table.get(0), Some(&PendingRequest::new(0x1A, 0x2F)));
        assert_eq!(table.len(), 1);
    }
}
