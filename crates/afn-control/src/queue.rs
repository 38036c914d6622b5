//! Bounded event queue that drops its oldest entry instead of blocking.
//!
//! Producers never wait: when the queue is full the oldest pending item is
//! discarded to make room. A single consumer awaits items with [`recv`].
//!
//! [`recv`]: DropOldestQueue::recv

use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::debug;

pub struct DropOldestQueue<T> {
    items: Mutex<VecDeque<T>>,
    capacity: usize,
    notify: Notify,
}

impl<T> DropOldestQueue<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            notify: Notify::new(),
        }
    }

    /// Enqueue an item. Returns the evicted item if the queue was full.
    pub fn push(&self, item: T) -> Option<T> {
        let dropped = {
            let mut items = self.items.lock();
            let dropped = if items.len() >= self.capacity {
                items.pop_front()
            } else {
                None
            };
            items.push_back(item);
            dropped
        };
        if dropped.is_some() {
            debug!(capacity = self.capacity, "Event queue full, dropped oldest entry");
        }
        self.notify.notify_one();
        dropped
    }

    pub fn try_recv(&self) -> Option<T> {
        self.items.lock().pop_front()
    }

    /// Wait for the next item.
    pub async fn recv(&self) -> T {
        loop {
            if let Some(item) = self.try_recv() {
                return item;
            }
            self.notify.notified().await;
        }
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use tokio_test::{assert_pending, assert_ready_eq, task};

    #[test]
    fn test_drops_oldest_when_full() {
        let queue = DropOldestQueue::new(2);
        assert_eq!(queue.push(1), None);
        assert_eq!(queue.push(2), None);
        assert_eq!(queue.push(3), Some(1));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.try_recv(), Some(2));
        assert_eq!(queue.try_recv(), Some(3));
        assert_eq!(queue.try_recv(), None);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let queue = DropOldestQueue::new(0);
        assert_eq!(queue.capacity(), 1);
        queue.push("a");
        assert_eq!(queue.push("b"), Some("a"));
    }

    #[tokio::test]
    async fn test_recv_wakes_on_push() {
        let queue = Arc::new(DropOldestQueue::new(4));
        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.recv().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.push(7u32);
        let got = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .expect("consumer should wake")
            .unwrap();
        assert_eq!(got, 7);
    }

    #[tokio::test]
    async fn test_recv_returns_buffered_items_in_order() {
        let queue = DropOldestQueue::new(4);
        queue.push(1);
        queue.push(2);
        assert_eq!(queue.recv().await, 1);
        assert_eq!(queue.recv().await, 2);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_recv_pending_until_push() {
        let queue = DropOldestQueue::new(2);
        let mut recv = task::spawn(queue.recv());
        assert_pending!(recv.poll());

        queue.push(5);
        assert!(recv.is_woken());
        assert_ready_eq!(recv.poll(), 5);
    }
}
