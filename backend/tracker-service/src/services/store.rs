use async_trait::async_trait;
use redis_utils::RedisPool;
use tracing::debug;

use crate::error::StoreError;
use crate::models::IncrementOperation;

/// Backend that applies a batch of increments as one grouped unit.
#[async_trait]
pub trait CounterStore: Send + Sync {
    async fn apply_batch(&self, batch: &[IncrementOperation]) -> Result<(), StoreError>;
}

/// Redis-backed counter store. Each batch runs as a `MULTI`/`EXEC` block on
/// its own pooled connection.
#[derive(Clone)]
pub struct RedisCounterStore {
    pool: RedisPool,
}

impl RedisCounterStore {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }
}

/// Build the transaction for a batch, preserving operation order.
pub fn build_pipeline(batch: &[IncrementOperation]) -> redis::Pipeline {
    let mut pipe = redis::pipe();
    pipe.atomic();
    for op in batch {
        pipe.cmd(op.command.as_str())
            .arg(&op.key)
            .arg(&op.field)
            .arg(op.amount)
            .ignore();
    }
    pipe
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn apply_batch(&self, batch: &[IncrementOperation]) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await?;
        let pipe = build_pipeline(batch);

        pipe.query_async::<_, ()>(&mut *conn).await?;
        debug!(operations = batch.len(), "Batch applied");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_wraps_batch_in_transaction() {
        let batch = vec![
            IncrementOperation::hincrby("tag_requests", "vip"),
            IncrementOperation::hincrby("campaign:c1", "source:tag:status:1:tag:vip"),
        ];

        let packed = String::from_utf8(build_pipeline(&batch).get_packed_pipeline())
            .expect("resp is utf8 here");

        let multi = packed.find("MULTI").expect("MULTI present");
        let first = packed.find("tag_requests").expect("first op present");
        let second = packed.find("campaign:c1").expect("second op present");
        let exec = packed.find("EXEC").expect("EXEC present");

        assert!(multi < first && first < second && second < exec);
        assert_eq!(packed.matches("HINCRBY").count(), 2);
    }
}
