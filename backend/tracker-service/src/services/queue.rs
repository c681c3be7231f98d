//! Unbounded multi-producer queue feeding the batch accumulator.
//!
//! Submission never blocks and never reports failure to the request path.
//! Capacity is bounded only by memory; under sustained overload with a
//! stalled accumulator the queue grows without limit.

use crate::models::IncrementOperation;
use tokio::sync::mpsc;
use tracing::warn;

/// Producer handle, cloned into every request handler.
#[derive(Debug, Clone)]
pub struct EventQueue {
    tx: mpsc::UnboundedSender<IncrementOperation>,
}

/// Consumer side, owned by the single accumulator task.
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::UnboundedReceiver<IncrementOperation>,
}

pub fn event_queue() -> (EventQueue, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventQueue { tx }, EventReceiver { rx })
}

impl EventQueue {
    pub fn submit(&self, op: IncrementOperation) {
        if let Err(err) = self.tx.send(op) {
            warn!(key = %err.0.key, "Event queue closed, dropping increment");
        }
    }

    pub fn submit_all(&self, ops: impl IntoIterator<Item = IncrementOperation>) {
        for op in ops {
            self.submit(op);
        }
    }
}

impl EventReceiver {
    /// Next queued operation, or `None` once every producer is dropped.
    pub async fn recv(&mut self) -> Option<IncrementOperation> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fifo_order() {
        let (queue, mut receiver) = event_queue();
        queue.submit_all([
            IncrementOperation::hincrby("a", "1"),
            IncrementOperation::hincrby("b", "2"),
        ]);

        assert_eq!(receiver.recv().await.map(|op| op.key), Some("a".to_string()));
        assert_eq!(receiver.recv().await.map(|op| op.key), Some("b".to_string()));
    }

    #[tokio::test]
    async fn test_submit_after_consumer_dropped_is_silent() {
        let (queue, receiver) = event_queue();
        drop(receiver);
        queue.submit(IncrementOperation::hincrby("a", "1"));
    }

    #[tokio::test]
    async fn test_closes_when_producers_dropped() {
        let (queue, mut receiver) = event_queue();
        let producer = queue.clone();
        drop(queue);
        producer.submit(IncrementOperation::hincrby("a", "1"));
        drop(producer);

        assert!(receiver.recv().await.is_some());
        assert!(receiver.recv().await.is_none());
    }
}
