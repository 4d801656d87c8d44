//! Ring Buffer Implementation

use crate::RingBufferError;

/// Fixed-capacity circular buffer that overwrites its oldest entry when full
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    /// Pre-allocated slots
    slots: Box<[Option<T>]>,
    /// Next slot to write
    head: usize,
    /// Number of occupied slots
    len: usize,
    /// Total entries pushed (for statistics)
    total_written: u64,
}

impl<T> RingBuffer<T> {
    /// Create a new ring buffer holding at most `capacity` entries
    pub fn new(capacity: usize) -> Result<Self, RingBufferError> {
        if capacity == 0 {
            return Err(RingBufferError::ZeroCapacity);
        }
        let slots: Vec<Option<T>> = (0..capacity).map(|_| None).collect();
        Ok(Self {
            slots: slots.into_boxed_slice(),
            head: 0,
            len: 0,
            total_written: 0,
        })
    }

    /// Push an entry as the newest, returning the evicted oldest entry if full
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = self.slots[self.head].replace(item);
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        }
        self.total_written += 1;
        evicted
    }

    /// Newest entry
    pub fn latest(&self) -> Option<&T> {
        self.get(0)
    }

    /// Entry at `age` positions from the newest (0 is the newest)
    pub fn get(&self, age: usize) -> Option<&T> {
        if age >= self.len {
            return None;
        }
        let capacity = self.capacity();
        let idx = (self.head + capacity - 1 - age) % capacity;
        self.slots[idx].as_ref()
    }

    /// Iterate entries newest-first
    pub fn iter_newest(&self) -> Iter<'_, T> {
        Iter { buffer: self, age: 0 }
    }

    /// Get the number of entries currently held
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Check if the next push will evict an entry
    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Get the buffer capacity
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Get fill ratio (0.0 to 1.0)
    pub fn fill_ratio(&self) -> f64 {
        self.len as f64 / self.capacity() as f64
    }

    /// Get total entries ever pushed, including evicted ones
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Drop every entry; capacity and statistics are kept
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }
}

impl<T: Clone> RingBuffer<T> {
    /// Read the last N entries (most recent first)
    pub fn read_last(&self, count: usize) -> Vec<T> {
        self.iter_newest().take(count).cloned().collect()
    }
}

/// Newest-first iterator over a [`RingBuffer`]
pub struct Iter<'a, T> {
    buffer: &'a RingBuffer<T>,
    age: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.buffer.get(self.age)?;
        self.age += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.buffer.len().saturating_sub(self.age);
        (remaining, Some(remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<'a, T> IntoIterator for &'a RingBuffer<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_newest()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_zero_capacity_rejected() {
        assert_eq!(
            RingBuffer::<u32>::new(0).unwrap_err(),
            RingBufferError::ZeroCapacity
        );
    }

    #[test]
    fn test_push_and_read() {
        let mut buffer = RingBuffer::new(10).unwrap();

        for i in 0..5u32 {
            buffer.push(i * 100);
        }

        assert_eq!(buffer.len(), 5);

        let entries = buffer.read_last(3);
        assert_eq!(entries, vec![400, 300, 200]); // Most recent first
        assert_eq!(buffer.latest(), Some(&400));
    }

    #[test]
    fn test_overwrite_oldest() {
        let mut buffer = RingBuffer::new(5).unwrap();

        let mut evicted = Vec::new();
        for i in 0..8u32 {
            if let Some(old) = buffer.push(i) {
                evicted.push(old);
            }
        }

        assert_eq!(buffer.len(), 5);
        assert!(buffer.is_full());
        assert_eq!(evicted, vec![0, 1, 2]);
        assert_eq!(buffer.read_last(10), vec![7, 6, 5, 4, 3]);
        assert_eq!(buffer.total_written(), 8);
    }

    #[test]
    fn test_read_more_than_len() {
        let mut buffer = RingBuffer::new(4).unwrap();
        buffer.push("a");
        buffer.push("b");

        assert_eq!(buffer.read_last(50), vec!["b", "a"]);
        assert_eq!(buffer.iter_newest().len(), 2);
    }

    #[test]
    fn test_empty_buffer() {
        let buffer = RingBuffer::<u8>::new(3).unwrap();
        assert!(buffer.is_empty());
        assert!(buffer.latest().is_none());
        assert!(buffer.read_last(3).is_empty());
    }

    #[test]
    fn test_fill_ratio() {
        let mut buffer = RingBuffer::new(100).unwrap();
        assert_eq!(buffer.fill_ratio(), 0.0);

        for i in 0..50 {
            buffer.push(i);
        }

        assert!((buffer.fill_ratio() - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_clear() {
        let mut buffer = RingBuffer::new(3).unwrap();
        for i in 0..5 {
            buffer.push(i);
        }
        buffer.clear();

        assert!(buffer.is_empty());
        assert_eq!(buffer.total_written(), 5);

        buffer.push(42);
        assert_eq!(buffer.read_last(3), vec![42]);
    }

    proptest! {
        #[test]
        fn retains_newest_in_order(capacity in 1usize..64, count in 0usize..256) {
            let mut buffer = RingBuffer::new(capacity).unwrap();
            for i in 0..count {
                buffer.push(i);
            }

            let kept = count.min(capacity);
            let expected: Vec<usize> = (count - kept..count).rev().collect();
            prop_assert_eq!(buffer.len(), kept);
            prop_assert_eq!(buffer.read_last(capacity), expected);
            prop_assert_eq!(buffer.latest().copied(), count.checked_sub(1));
        }
    }
}
