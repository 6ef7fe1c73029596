//! Capacity-bounded worklist used by mesh refinement.

use std::collections::VecDeque;

/// Default capacity of a [`RefinementQueue`].
pub const DEFAULT_QUEUE_CAPACITY: usize = 1 << 16;

/// A worklist holding at most `capacity` items.
///
/// Pushing onto a full queue drops the item and counts it instead of growing.
/// Items come back out most-recent first.
///
/// # Examples
///
/// ```rust
/// use delaunay_refine::core::collections::RefinementQueue;
///
/// let mut queue = RefinementQueue::with_capacity(2);
/// assert!(queue.push("a"));
/// assert!(queue.push("b"));
/// assert!(!queue.push("c"));
/// assert_eq!(queue.dropped(), 1);
/// assert_eq!(queue.pop(), Some("b"));
/// ```
#[derive(Debug, Clone)]
pub struct RefinementQueue<T> {
    items: VecDeque<T>,
    capacity: usize,
    dropped: usize,
}

impl<T> RefinementQueue<T> {
    /// Creates an empty queue bounded by `capacity`.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity.min(DEFAULT_QUEUE_CAPACITY)),
            capacity,
            dropped: 0,
        }
    }

    /// Adds `item`, returning `false` (and counting a drop) when the queue is full.
    pub fn push(&mut self, item: T) -> bool {
        if self.items.len() >= self.capacity {
            self.dropped += 1;
            return false;
        }
        self.items.push_back(item);
        true
    }

    /// Removes the most recently pushed item.
    pub fn pop(&mut self) -> Option<T> {
        self.items.pop_back()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of items rejected because the queue was full.
    #[must_use]
    pub const fn dropped(&self) -> usize {
        self.dropped
    }
}

impl<T> Default for RefinementQueue<T> {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }
}
