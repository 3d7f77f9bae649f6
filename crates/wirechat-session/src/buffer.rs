//! Bounded FIFO of envelopes written while the link is down.

use std::collections::VecDeque;

use crate::SessionError;

/// Holds outbound envelopes until a connection is available.
///
/// Envelopes come out in the order they went in. Once `capacity` is
/// reached, new envelopes are rejected and the existing ones are kept.
#[derive(Debug)]
pub struct OutboundBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> OutboundBuffer<T> {
    /// Default capacity when none is configured.
    pub const DEFAULT_CAPACITY: usize = 100;

    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::new(),
            capacity,
        }
    }

    /// Appends `item` to the back of the queue.
    ///
    /// # Errors
    /// [`SessionError::BufferFull`] if the buffer already holds
    /// `capacity` envelopes. `item` is dropped.
    pub fn push(&mut self, item: T) -> Result<(), SessionError> {
        if self.is_full() {
            tracing::debug!(capacity = self.capacity, "outbound buffer full, rejecting envelope");
            return Err(SessionError::BufferFull {
                capacity: self.capacity,
            });
        }
        self.items.push_back(item);
        Ok(())
    }

    /// Puts `item` back at the front, used when a flush fails part way.
    ///
    /// Ignores the capacity: the envelope was already accepted once.
    pub fn push_front(&mut self, item: T) {
        self.items.push_front(item);
    }

    /// Removes and returns everything, oldest first.
    pub fn take_all(&mut self) -> Vec<T> {
        self.items.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T> Default for OutboundBuffer<T> {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_all_preserves_order() {
        let mut buf = OutboundBuffer::new(10);
        for i in 0..5 {
            buf.push(i).unwrap();
        }
        assert_eq!(buf.take_all(), vec![0, 1, 2, 3, 4]);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_overflow_rejects_new_and_keeps_existing() {
        let mut buf = OutboundBuffer::new(3);
        for i in 0..3 {
            buf.push(i).unwrap();
        }
        assert!(buf.is_full());

        assert_eq!(buf.push(99), Err(SessionError::BufferFull { capacity: 3 }));
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.take_all(), vec![0, 1, 2]);
    }

    #[test]
    fn test_push_front_requeues_ahead_of_rest() {
        let mut buf = OutboundBuffer::new(2);
        buf.push("b").unwrap();
        buf.push("c").unwrap();

        buf.push_front("a");

        assert_eq!(buf.len(), 3);
        assert_eq!(buf.take_all(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_zero_capacity_rejects_everything() {
        let mut buf = OutboundBuffer::new(0);
        assert!(buf.push(1).is_err());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_default_capacity() {
        let buf: OutboundBuffer<u8> = OutboundBuffer::default();
        assert_eq!(buf.capacity(), 100);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn never_exceeds_capacity(capacity in 0usize..50, pushes in 0usize..200) {
                let mut buf = OutboundBuffer::new(capacity);
                let mut accepted = Vec::new();
                for i in 0..pushes {
                    if buf.push(i).is_ok() {
                        accepted.push(i);
                    }
                }
                prop_assert_eq!(buf.len(), pushes.min(capacity));
                prop_assert_eq!(buf.take_all(), accepted);
            }
        }
    }
}
