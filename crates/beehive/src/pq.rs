//! Thread-safe binary heap keyed by priority.

use parking_lot::Mutex;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Selects whether [`PriorityQueue::try_pop`] returns the maximum or the
/// minimum key first. `MaxFirst` is the default, matching
/// `beehive::Priority`'s "higher values dispatch first".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    MaxFirst,
    MinFirst,
}

impl Default for Order {
    fn default() -> Self {
        Order::MaxFirst
    }
}

struct Entry<K, V> {
    key: K,
    sequence: u64,
    value: V,
    order: Order,
}

impl<K: Ord, V> PartialEq for Entry<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<K: Ord, V> Eq for Entry<K, V> {}

impl<K: Ord, V> PartialOrd for Entry<K, V> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: Ord, V> Ord for Entry<K, V> {
    fn cmp(&self, other: &Self) -> Ordering {
        let key_order = match self.order {
            Order::MaxFirst => self.key.cmp(&other.key),
            Order::MinFirst => other.key.cmp(&self.key),
        };
        // `BinaryHeap` is a max-heap over this `Ord`, and ties must resolve
        // FIFO by push order, so among equal keys the *earlier* sequence
        // number must compare as *greater*.
        key_order.then_with(|| other.sequence.cmp(&self.sequence))
    }
}

struct Inner<K, V> {
    next_sequence: u64,
    heap: BinaryHeap<Entry<K, V>>,
}

/// A synchronized priority queue: a mapping from priority keys `K` to a bag
/// of values `V`, organized as a heap. `try_pop` always returns the value
/// with the extremal key among those currently resident (§4.2); ties
/// between equal keys resolve FIFO by push order.
pub struct PriorityQueue<K, V> {
    order: Order,
    inner: Mutex<Inner<K, V>>,
}

impl<K: Ord, V> PriorityQueue<K, V> {
    pub fn new(order: Order) -> Self {
        Self {
            order,
            inner: Mutex::new(Inner {
                next_sequence: 0,
                heap: BinaryHeap::new(),
            }),
        }
    }

    pub fn push(&self, key: K, value: V) {
        let mut inner = self.inner.lock();
        let sequence = inner.next_sequence;
        inner.next_sequence += 1;
        inner.heap.push(Entry {
            key,
            sequence,
            value,
            order: self.order,
        });
    }

    /// Removes and returns the extremal `(key, value)` pair, or `None` if
    /// the queue is empty. Never blocks.
    pub fn try_pop(&self) -> Option<(K, V)> {
        self.inner.lock().heap.pop().map(|entry| (entry.key, entry.value))
    }

    pub fn empty(&self) -> bool {
        self.inner.lock().heap.is_empty()
    }

    pub fn size(&self) -> usize {
        self.inner.lock().heap.len()
    }
}

impl<K: Ord, V> Default for PriorityQueue<K, V> {
    fn default() -> Self {
        Self::new(Order::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn try_pop_on_empty_queue_returns_none() {
        let pq: PriorityQueue<u8, &str> = PriorityQueue::default();
        assert_eq!(pq.try_pop(), None);
    }

    #[test]
    fn max_first_returns_highest_priority_first() {
        let pq = PriorityQueue::new(Order::MaxFirst);
        pq.push(1u8, "low");
        pq.push(255u8, "max");
        pq.push(127u8, "default");
        assert_eq!(pq.try_pop(), Some((255, "max")));
        assert_eq!(pq.try_pop(), Some((127, "default")));
        assert_eq!(pq.try_pop(), Some((1, "low")));
    }

    #[test]
    fn min_first_returns_lowest_priority_first() {
        let pq = PriorityQueue::new(Order::MinFirst);
        pq.push(3u8, "c");
        pq.push(1u8, "a");
        pq.push(2u8, "b");
        assert_eq!(pq.try_pop(), Some((1, "a")));
        assert_eq!(pq.try_pop(), Some((2, "b")));
        assert_eq!(pq.try_pop(), Some((3, "c")));
    }

    #[test]
    fn equal_priority_ties_resolve_fifo() {
        let pq = PriorityQueue::new(Order::MaxFirst);
        pq.push(5u8, "first");
        pq.push(5u8, "second");
        pq.push(5u8, "third");
        assert_eq!(pq.try_pop(), Some((5, "first")));
        assert_eq!(pq.try_pop(), Some((5, "second")));
        assert_eq!(pq.try_pop(), Some((5, "third")));
    }

    proptest! {
        // P4: try_pop always returns an extremal priority among resident entries.
        #[test]
        fn try_pop_is_always_extremal(mut priorities in prop::collection::vec(0u8..=255, 1..64)) {
            let pq = PriorityQueue::new(Order::MaxFirst);
            for &p in &priorities {
                pq.push(p, p);
            }
            priorities.sort_unstable();
            while let Some(expected) = priorities.pop() {
                let (key, _value) = pq.try_pop().unwrap();
                prop_assert_eq!(key, expected);
            }
            prop_assert!(pq.empty());
        }
    }
}
