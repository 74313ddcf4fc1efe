//! Lossless in-process fan-out between stages.
//!
//! Each subscriber gets its own unbounded channel, so a slow stage never
//! causes another stage to miss a snapshot. Subscribers whose receiver has
//! been dropped are pruned on the next publish.

use crate::error::{PipelineError, Result};
use lagline_core::Snapshot;
use parking_lot::Mutex;
use tokio::sync::mpsc;

/// Anything that emits snapshots to subscribers.
pub trait SnapshotFeed: Send + Sync {
    /// Register a new subscriber. Fails once the feed has closed.
    fn subscribe(&self) -> Result<mpsc::UnboundedReceiver<Snapshot>>;
}

struct TopicState<T> {
    subscribers: Vec<mpsc::UnboundedSender<T>>,
    closed: bool,
}

/// Named fan-out point with an explicit closed state.
pub struct Topic<T> {
    name: &'static str,
    state: Mutex<TopicState<T>>,
}

impl<T: Clone> Topic<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Mutex::new(TopicState {
                subscribers: Vec::new(),
                closed: false,
            }),
        }
    }

    pub fn subscribe(&self) -> Result<mpsc::UnboundedReceiver<T>> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(PipelineError::SubscriptionSetup { topic: self.name });
        }

        let (tx, rx) = mpsc::unbounded_channel();
        state.subscribers.push(tx);
        Ok(rx)
    }

    /// Deliver `value` to every live subscriber, returning how many got it.
    pub fn publish(&self, value: T) -> usize {
        let mut state = self.state.lock();
        if state.closed {
            return 0;
        }
        state
            .subscribers
            .retain(|tx| tx.send(value.clone()).is_ok());
        state.subscribers.len()
    }

    /// Close the topic. Existing receivers drain what they already hold and
    /// then end; new subscriptions fail.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        state.subscribers.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.lock().subscribers.len()
    }
}

impl SnapshotFeed for Topic<Snapshot> {
    fn subscribe(&self) -> Result<mpsc::UnboundedReceiver<Snapshot>> {
        Topic::subscribe(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_every_subscriber() {
        let topic: Topic<u32> = Topic::new("numbers");
        let mut rx1 = topic.subscribe().unwrap();
        let mut rx2 = topic.subscribe().unwrap();

        assert_eq!(topic.publish(7), 2);

        assert_eq!(rx1.recv().await, Some(7));
        assert_eq!(rx2.recv().await, Some(7));
    }

    #[tokio::test]
    async fn test_dropped_subscribers_are_pruned() {
        let topic: Topic<u32> = Topic::new("numbers");
        let rx1 = topic.subscribe().unwrap();
        let mut rx2 = topic.subscribe().unwrap();

        drop(rx1);
        assert_eq!(topic.publish(1), 1);
        assert_eq!(topic.subscriber_count(), 1);
        assert_eq!(rx2.recv().await, Some(1));
    }

    #[tokio::test]
    async fn test_close_rejects_new_subscribers() {
        let topic: Topic<u32> = Topic::new("numbers");
        let mut rx = topic.subscribe().unwrap();
        topic.publish(1);
        topic.close();

        assert!(topic.is_closed());
        assert_eq!(
            topic.subscribe().unwrap_err(),
            PipelineError::SubscriptionSetup { topic: "numbers" }
        );
        assert_eq!(topic.publish(2), 0);

        // Already-queued values still drain before the channel ends.
        assert_eq!(rx.recv().await, Some(1));
        assert_eq!(rx.recv().await, None);
    }
}
