pub mod accumulator;
pub mod classifier;
pub mod executor;
pub mod queue;
pub mod reporter;
pub mod store;

pub use accumulator::BatchAccumulator;
pub use classifier::{classify, Classification};
pub use executor::PersistenceExecutor;
pub use queue::{event_queue, EventQueue, EventReceiver};
pub use reporter::{ErrorReporter, HttpErrorReporter, TracingErrorReporter};
pub use store::{CounterStore, RedisCounterStore};
