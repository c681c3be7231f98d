use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::error::StoreError;
use crate::metrics::TrackerMetrics;
use crate::models::IncrementOperation;
use crate::services::reporter::ErrorReporter;
use crate::services::store::CounterStore;

/// Applies dispatched batches on independent tasks.
///
/// Batches in flight at the same time may land in any order. Nothing is
/// retried: a failed batch is dropped.
#[derive(Clone)]
pub struct PersistenceExecutor {
    store: Arc<dyn CounterStore>,
    metrics: TrackerMetrics,
    reporter: Arc<dyn ErrorReporter>,
}

impl PersistenceExecutor {
    pub fn new(
        store: Arc<dyn CounterStore>,
        metrics: TrackerMetrics,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self {
            store,
            metrics,
            reporter,
        }
    }

    /// Spawn persistence of `batch`. Callers on the hot path drop the handle.
    pub fn dispatch(&self, batch: Vec<IncrementOperation>) -> JoinHandle<()> {
        let executor = self.clone();
        tokio::spawn(async move { executor.persist(batch).await })
    }

    async fn persist(&self, batch: Vec<IncrementOperation>) {
        let result = self.store.apply_batch(&batch).await;
        self.metrics.batches_sent.inc();

        match result {
            Ok(()) => {}
            Err(err @ StoreError::Connection(_)) => {
                self.metrics.batches_failed.inc();
                error!(operations = batch.len(), error = %err, "Dropping batch, store unavailable");
                self.reporter.capture("persist_batch", &err);
            }
            Err(err @ StoreError::Command(_)) => {
                self.metrics.batches_failed.inc();
                debug!(operations = batch.len(), error = %err, "Batch commands failed");
            }
        }
    }
}
