//! # Ring Buffer
//!
//! Fixed-capacity circular buffer with overwrite-oldest semantics.

/// A bounded FIFO that overwrites its oldest element once full.
///
/// Storage is allocated once in [`RingBuffer::with_capacity`] and is never
/// resized. Slots are addressed by modular index, so the `capacity + 1`-th push
/// lands in slot 0 again.
///
/// # Example
///
/// ```rust
/// use lodestone_core::RingBuffer;
///
/// let mut ring = RingBuffer::with_capacity(2);
/// assert_eq!(ring.push('a'), None);
/// assert_eq!(ring.push('b'), None);
/// assert_eq!(ring.push('c'), Some('a'));
/// assert_eq!(ring.slot(0), Some(&'c'));
/// ```
#[derive(Clone, Debug)]
pub struct RingBuffer<T> {
    /// Backing storage, one entry per slot.
    slots: Box<[Option<T>]>,
    /// Slot the next push writes to.
    head: usize,
    /// Number of occupied slots.
    len: usize,
}

impl<T> RingBuffer<T> {
    /// Creates an empty ring with `capacity` slots.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than zero");

        let slots: Vec<Option<T>> = (0..capacity).map(|_| None).collect();
        Self {
            slots: slots.into_boxed_slice(),
            head: 0,
            len: 0,
        }
    }

    /// Returns the fixed number of slots.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the number of stored elements.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if nothing has been pushed since creation or the last clear.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns true once every slot is occupied.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Index of the slot the next [`push`](Self::push) writes to.
    #[inline]
    #[must_use]
    pub const fn next_slot(&self) -> usize {
        self.head
    }

    /// Pushes a value, returning the evicted oldest value when full.
    pub fn push(&mut self, value: T) -> Option<T> {
        let evicted = self.slots[self.head].replace(value);
        self.head = (self.head + 1) % self.capacity();
        if evicted.is_none() {
            self.len += 1;
        }
        evicted
    }

    /// Returns the value stored in a physical slot.
    #[inline]
    #[must_use]
    pub fn slot(&self, index: usize) -> Option<&T> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Returns the most recently pushed value.
    #[must_use]
    pub fn latest(&self) -> Option<&T> {
        if self.len == 0 {
            return None;
        }
        let index = (self.head + self.capacity() - 1) % self.capacity();
        self.slot(index)
    }

    /// Iterates from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let capacity = self.capacity();
        let start = (self.head + capacity - self.len) % capacity;
        (0..self.len).filter_map(move |offset| self.slots[(start + offset) % capacity].as_ref())
    }

    /// Iterates over the `count` newest values, oldest of them first.
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &T> + '_ {
        let skip = self.len.saturating_sub(count);
        self.iter().skip(skip)
    }

    /// Drops every stored value; capacity is unchanged.
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_until_full() {
        let mut ring = RingBuffer::with_capacity(3);
        assert!(ring.is_empty());

        ring.push(1);
        ring.push(2);
        assert_eq!(ring.len(), 2);
        assert!(!ring.is_full());

        ring.push(3);
        assert!(ring.is_full());
        assert_eq!(ring.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_overwrite_oldest() {
        let mut ring = RingBuffer::with_capacity(3);
        for i in 0..5 {
            ring.push(i);
        }

        // Strict FIFO: 0 and 1 evicted
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.capacity(), 3);
        assert_eq!(ring.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(ring.latest(), Some(&4));
    }

    #[test]
    fn test_round_robin_slots() {
        let mut ring = RingBuffer::with_capacity(8);
        for i in 0..8 {
            assert_eq!(ring.next_slot(), i);
            ring.push(i * 10);
        }

        // The ninth push wraps to slot 0
        assert_eq!(ring.next_slot(), 0);
        assert_eq!(ring.push(999), Some(0));
        assert_eq!(ring.slot(0), Some(&999));
        assert_eq!(ring.slot(1), Some(&10));
    }

    #[test]
    fn test_recent_window() {
        let mut ring = RingBuffer::with_capacity(10);
        for i in 0..25 {
            ring.push(i);
        }

        let last_four: Vec<_> = ring.recent(4).copied().collect();
        assert_eq!(last_four, vec![21, 22, 23, 24]);

        // Asking for more than stored yields everything
        assert_eq!(ring.recent(100).count(), 10);
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut ring = RingBuffer::with_capacity(4);
        ring.push("a");
        ring.push("b");
        ring.clear();

        assert!(ring.is_empty());
        assert_eq!(ring.capacity(), 4);
        assert_eq!(ring.latest(), None);
        assert_eq!(ring.slot(0), None);
    }

    #[test]
    #[should_panic(expected = "Capacity must be greater than zero")]
    fn test_zero_capacity_rejected() {
        let _ring: RingBuffer<u8> = RingBuffer::with_capacity(0);
    }
}
