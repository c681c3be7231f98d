use prometheus::Registry;
use std::sync::Arc;
use std::time::Duration;

use crate::metrics::TrackerMetrics;
use crate::services::{
    event_queue, BatchAccumulator, CounterStore, ErrorReporter, EventQueue, PersistenceExecutor,
};

/// Deadline for handling a single `/track` request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Shared handles used by request handlers. Built once per process.
#[derive(Clone)]
pub struct AppContext {
    pub queue: EventQueue,
    pub metrics: TrackerMetrics,
    pub registry: Registry,
    pub request_timeout: Duration,
}

impl AppContext {
    /// Build the context and start the batch accumulator on the current
    /// runtime. The accumulator lives until every queue handle is dropped.
    pub fn start(
        batch_size: std::num::NonZeroUsize,
        store: Arc<dyn CounterStore>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> prometheus::Result<Self> {
        let registry = Registry::new();
        let metrics = TrackerMetrics::new(&registry)?;
        let (queue, receiver) = event_queue();

        let executor = PersistenceExecutor::new(store, metrics.clone(), reporter);
        let accumulator = BatchAccumulator::new(batch_size, metrics.clone());
        tokio::spawn(accumulator.run(receiver, executor));

        Ok(Self {
            queue,
            metrics,
            registry,
            request_timeout: REQUEST_TIMEOUT,
        })
    }
}
