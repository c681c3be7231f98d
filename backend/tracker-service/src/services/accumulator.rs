use std::num::NonZeroUsize;
use tracing::{debug, info};

use crate::metrics::TrackerMetrics;
use crate::models::IncrementOperation;
use crate::services::executor::PersistenceExecutor;
use crate::services::queue::EventReceiver;

/// Groups queued operations into fixed-size batches.
///
/// A batch is dispatched exactly when it reaches `batch_size`. There is no
/// time-based flush; a partial batch is held until it fills and is lost if
/// the process exits first.
pub struct BatchAccumulator {
    batch_size: NonZeroUsize,
    batch: Vec<IncrementOperation>,
    metrics: TrackerMetrics,
}

impl BatchAccumulator {
    pub fn new(batch_size: NonZeroUsize, metrics: TrackerMetrics) -> Self {
        Self {
            batch_size,
            batch: Vec::with_capacity(batch_size.get()),
            metrics,
        }
    }

    /// Append `op`; returns the full batch once it reaches the threshold.
    pub fn push(&mut self, op: IncrementOperation) -> Option<Vec<IncrementOperation>> {
        self.batch.push(op);
        self.metrics.events_batched.inc();

        if self.batch.len() < self.batch_size.get() {
            return None;
        }

        Some(std::mem::replace(
            &mut self.batch,
            Vec::with_capacity(self.batch_size.get()),
        ))
    }

    /// Operations held in the current, not yet full, batch.
    pub fn pending(&self) -> usize {
        self.batch.len()
    }

    /// Drain the queue until it closes, handing each full batch to the
    /// executor without waiting for it to be persisted.
    pub async fn run(mut self, mut receiver: EventReceiver, executor: PersistenceExecutor) {
        info!(batch_size = self.batch_size.get(), "Batch accumulator started");

        while let Some(op) = receiver.recv().await {
            if let Some(batch) = self.push(op) {
                debug!(operations = batch.len(), "Dispatching batch");
                let _ = executor.dispatch(batch);
            }
        }

        info!(
            dropped = self.pending(),
            "Event queue closed, batch accumulator stopping"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::Registry;

    fn accumulator(size: usize) -> (BatchAccumulator, TrackerMetrics) {
        let metrics = TrackerMetrics::new(&Registry::new()).unwrap();
        let acc = BatchAccumulator::new(NonZeroUsize::new(size).unwrap(), metrics.clone());
        (acc, metrics)
    }

    fn op(n: usize) -> IncrementOperation {
        IncrementOperation::hincrby(format!("campaign:{}", n), "source:ad:status:1")
    }

    #[test]
    fn test_dispatches_exactly_at_threshold() {
        let (mut acc, metrics) = accumulator(3);

        assert!(acc.push(op(1)).is_none());
        assert!(acc.push(op(2)).is_none());
        assert_eq!(acc.pending(), 2);

        let batch = acc.push(op(3)).expect("third push fills the batch");
        assert_eq!(batch, vec![op(1), op(2), op(3)]);
        assert_eq!(acc.pending(), 0);
        assert_eq!(metrics.events_batched.get(), 3);

        assert!(acc.push(op(4)).is_none());
        assert_eq!(acc.pending(), 1);
    }

    #[test]
    fn test_batch_size_one_dispatches_every_op() {
        let (mut acc, _) = accumulator(1);
        for n in 0..5 {
            assert_eq!(acc.push(op(n)), Some(vec![op(n)]));
            assert_eq!(acc.pending(), 0);
        }
    }

    #[test]
    fn test_partial_batch_is_held() {
        let (mut acc, _) = accumulator(10);
        for n in 0..9 {
            assert!(acc.push(op(n)).is_none());
        }
        assert_eq!(acc.pending(), 9);
    }
}
