//! Bounded per-subscriber outbound queue with drop-oldest overflow.
//!
//! The router is the only producer and one session task is the only consumer.
//! `push` never waits, so a stalled overlay can never stall the router: when
//! the queue is full the oldest buffered event is evicted to make room.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

use super::events::OverlayEvent;

/// Default (and minimum) number of events buffered per subscriber.
pub const SUBSCRIBER_QUEUE_CAPACITY: usize = 256;

/// Result of a single [`OutboundQueue::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Queued,
    /// The queue was full; the oldest event was discarded.
    DroppedOldest,
    /// The queue has been closed; the event was not enqueued.
    Closed,
}

struct QueueInner {
    buf: VecDeque<Arc<OverlayEvent>>,
    closed: bool,
    dropped: u64,
}

pub struct OutboundQueue {
    inner: Mutex<QueueInner>,
    notify: Notify,
    capacity: usize,
}

impl OutboundQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(QueueInner {
                buf: VecDeque::with_capacity(capacity),
                closed: false,
                dropped: 0,
            }),
            notify: Notify::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.inner.lock().buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Total number of events evicted by overflow since creation.
    pub fn dropped(&self) -> u64 {
        self.inner.lock().dropped
    }

    /// Enqueue an event, evicting the oldest one if the queue is full.
    pub fn push(&self, event: Arc<OverlayEvent>) -> PushOutcome {
        let outcome = {
            let mut q = self.inner.lock();
            if q.closed {
                return PushOutcome::Closed;
            }
            let mut outcome = PushOutcome::Queued;
            while q.buf.len() >= self.capacity {
                q.buf.pop_front();
                q.dropped += 1;
                outcome = PushOutcome::DroppedOldest;
            }
            q.buf.push_back(event);
            outcome
        };
        self.notify.notify_one();
        outcome
    }

    /// Wait for the next event. Returns `None` once the queue is closed and
    /// everything buffered before the close has been handed out.
    pub async fn recv(&self) -> Option<Arc<OverlayEvent>> {
        loop {
            {
                let mut q = self.inner.lock();
                if let Some(event) = q.buf.pop_front() {
                    return Some(event);
                }
                if q.closed {
                    return None;
                }
            }
            // A push between the check above and this await leaves a stored
            // permit, so the wakeup is not lost.
            self.notify.notified().await;
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv).
    pub fn try_recv(&self) -> Option<Arc<OverlayEvent>> {
        self.inner.lock().buf.pop_front()
    }

    /// Mark end-of-stream. Buffered events remain readable. Idempotent.
    pub fn close(&self) {
        {
            let mut q = self.inner.lock();
            if q.closed {
                return;
            }
            q.closed = true;
        }
        self.notify.notify_one();
    }

    /// Discard all buffered events, returning how many were discarded.
    pub fn drain(&self) -> usize {
        let mut q = self.inner.lock();
        let n = q.buf.len();
        q.buf.clear();
        n
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use overlay_common::{ChannelId, ViewerId};

    use super::*;

    fn part(n: usize) -> Arc<OverlayEvent> {
        Arc::new(OverlayEvent::Part {
            channel: ChannelId::from("c"),
            viewer_id: ViewerId::new(format!("u{n}")),
        })
    }

    fn viewer_of(event: &OverlayEvent) -> String {
        event.viewer_id().to_string()
    }

    #[tokio::test]
    async fn delivers_in_fifo_order() {
        let q = OutboundQueue::new(8);
        for i in 0..3 {
            assert_eq!(q.push(part(i)), PushOutcome::Queued);
        }
        for i in 0..3 {
            assert_eq!(viewer_of(&q.recv().await.unwrap()), format!("u{i}"));
        }
        assert!(q.is_empty());
    }

    #[test]
    fn overflow_drops_oldest_and_never_exceeds_capacity() {
        let q = OutboundQueue::new(4);
        for i in 0..4 {
            assert_eq!(q.push(part(i)), PushOutcome::Queued);
        }
        assert_eq!(q.push(part(4)), PushOutcome::DroppedOldest);
        assert_eq!(q.push(part(5)), PushOutcome::DroppedOldest);
        assert_eq!(q.len(), 4);
        assert_eq!(q.dropped(), 2);

        let remaining: Vec<String> = std::iter::from_fn(|| q.try_recv())
            .map(|e| viewer_of(&e))
            .collect();
        assert_eq!(remaining, vec!["u2", "u3", "u4", "u5"]);
    }

    #[tokio::test]
    async fn close_lets_consumer_drain_then_ends() {
        let q = OutboundQueue::new(4);
        q.push(part(1));
        q.close();
        assert_eq!(q.push(part(2)), PushOutcome::Closed);

        assert_eq!(viewer_of(&q.recv().await.unwrap()), "u1");
        assert!(q.recv().await.is_none());
        assert!(q.recv().await.is_none());
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let q = OutboundQueue::new(4);
        q.close();
        q.close();
        assert!(q.is_closed());
        assert!(q.recv().await.is_none());
    }

    #[tokio::test]
    async fn recv_wakes_on_push_from_another_task() {
        let q = Arc::new(OutboundQueue::new(4));
        let consumer = {
            let q = q.clone();
            tokio::spawn(async move { q.recv().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        q.push(part(7));

        let got = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .expect("consumer woke")
            .unwrap()
            .unwrap();
        assert_eq!(viewer_of(&got), "u7");
    }

    #[tokio::test]
    async fn recv_wakes_on_close() {
        let q = Arc::new(OutboundQueue::new(4));
        let consumer = {
            let q = q.clone();
            tokio::spawn(async move { q.recv().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        q.close();

        let got = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .expect("consumer woke")
            .unwrap();
        assert!(got.is_none());
    }

    #[test]
    fn drain_discards_buffered_events() {
        let q = OutboundQueue::new(4);
        q.push(part(1));
        q.push(part(2));
        assert_eq!(q.drain(), 2);
        assert!(q.is_empty());
    }
}
