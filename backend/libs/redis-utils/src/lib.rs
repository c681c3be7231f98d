//! Bounded Redis connection pool
//!
//! Wraps a `deadpool` managed pool around dedicated multiplexed Redis
//! connections. Connections idle for longer than the staleness threshold are
//! probed with `PING` before being handed out again; a failed probe discards
//! the connection and the next checkout dials a fresh one.

use deadpool::managed::{self, Metrics, Pool, RecycleResult, Timeouts};
use deadpool::Runtime;
use redis::aio::MultiplexedConnection;
use redis::{Client, IntoConnectionInfo, RedisError};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Connection checked out of the pool. Returned to the pool on drop.
pub type PooledConnection = managed::Object<RedisConnectionManager>;

/// Error returned when checking a connection out of the pool.
pub type PoolError = managed::PoolError<RedisError>;

/// Connections not checked out for longer than this are probed before reuse.
pub const DEFAULT_PROBE_AFTER: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum PoolInitError {
    #[error("invalid redis connection url: {0}")]
    InvalidUrl(#[source] RedisError),

    #[error("failed to build redis pool: {0}")]
    Build(String),
}

/// Pool configuration
#[derive(Debug, Clone)]
pub struct RedisPoolConfig {
    /// Redis connection URL (`redis://` or `rediss://`)
    pub url: String,
    /// Maximum number of idle connections kept around by the reaper
    pub max_idle: usize,
    /// Maximum number of connections checked out at once (0 = pool default)
    pub max_active: usize,
    /// Idle connections older than this are closed (zero disables).
    /// The idle clock starts when a connection is checked out, not when it
    /// is returned, so a connection held past this window is pruned as soon
    /// as the reaper sees it idle.
    pub idle_timeout: Duration,
    /// Time since last checkout after which a connection is probed with
    /// `PING` on its next checkout
    pub probe_after: Duration,
    /// Upper bound on dialing a new connection
    pub connect_timeout: Duration,
}

impl RedisPoolConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

impl Default for RedisPoolConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            max_idle: 10,
            max_active: 50,
            idle_timeout: Duration::from_secs(240),
            probe_after: DEFAULT_PROBE_AFTER,
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// Dials and health-checks pooled connections.
pub struct RedisConnectionManager {
    client: Client,
    probe_after: Duration,
}

impl RedisConnectionManager {
    pub fn new(url: &str, probe_after: Duration) -> Result<Self, PoolInitError> {
        let info = url
            .into_connection_info()
            .map_err(PoolInitError::InvalidUrl)?;
        let client = Client::open(info).map_err(PoolInitError::InvalidUrl)?;
        Ok(Self {
            client,
            probe_after,
        })
    }
}

impl managed::Manager for RedisConnectionManager {
    type Type = MultiplexedConnection;
    type Error = RedisError;

    async fn create(&self) -> Result<MultiplexedConnection, RedisError> {
        let conn = self.client.get_multiplexed_async_connection().await?;
        debug!("Dialed new redis connection");
        Ok(conn)
    }

    async fn recycle(
        &self,
        conn: &mut MultiplexedConnection,
        metrics: &Metrics,
    ) -> RecycleResult<RedisError> {
        if metrics.last_used() < self.probe_after {
            return Ok(());
        }

        redis::cmd("PING").query_async::<_, String>(conn).await?;
        Ok(())
    }
}

/// Snapshot of pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    pub max_size: usize,
    pub size: usize,
    pub available: usize,
}

/// Bounded pool of Redis connections.
#[derive(Clone)]
pub struct RedisPool {
    pool: Pool<RedisConnectionManager>,
    max_idle: usize,
    idle_timeout: Duration,
}

impl RedisPool {
    /// Build the pool. No connection is dialed until the first checkout.
    pub fn new(config: RedisPoolConfig) -> Result<Self, PoolInitError> {
        let manager = RedisConnectionManager::new(&config.url, config.probe_after)?;

        let mut builder = Pool::builder(manager)
            .runtime(Runtime::Tokio1)
            .timeouts(Timeouts {
                wait: None,
                create: Some(config.connect_timeout),
                recycle: Some(config.connect_timeout),
            });
        if config.max_active > 0 {
            builder = builder.max_size(config.max_active);
        }

        let pool = builder
            .build()
            .map_err(|e| PoolInitError::Build(e.to_string()))?;

        info!(
            max_active = pool.status().max_size,
            max_idle = config.max_idle,
            idle_timeout_secs = config.idle_timeout.as_secs(),
            "Redis pool configured"
        );

        Ok(Self {
            pool,
            max_idle: config.max_idle,
            idle_timeout: config.idle_timeout,
        })
    }

    /// Check out a connection, waiting while every connection is in use.
    pub async fn get(&self) -> Result<PooledConnection, PoolError> {
        self.pool.get().await
    }

    pub fn status(&self) -> PoolStatus {
        let status = self.pool.status();
        PoolStatus {
            max_size: status.max_size,
            size: status.size,
            available: status.available,
        }
    }

    /// Close idle connections past the idle timeout and trim the idle set
    /// down to `max_idle`. Returns the number of connections closed.
    pub fn prune_idle(&self) -> usize {
        let idle_timeout = self.idle_timeout;
        let max_idle = self.max_idle;
        let mut kept = 0usize;

        self.pool
            .retain(|_, metrics| {
                let expired = !idle_timeout.is_zero() && metrics.last_used() >= idle_timeout;
                if expired || kept >= max_idle {
                    false
                } else {
                    kept += 1;
                    true
                }
            })
            .removed
            .len()
    }

    /// Periodically prune idle connections for the life of the process.
    pub fn spawn_idle_reaper(&self, interval: Duration) -> JoinHandle<()> {
        let pool = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = pool.prune_idle();
                if removed > 0 {
                    debug!(removed, status = ?pool.status(), "Pruned idle redis connections");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url_rejected() {
        let result = RedisPool::new(RedisPoolConfig::new("not a url"));
        assert!(matches!(result, Err(PoolInitError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_pool_is_lazy() {
        let pool = RedisPool::new(RedisPoolConfig {
            max_active: 3,
            ..RedisPoolConfig::new("redis://127.0.0.1:1/")
        })
        .expect("pool builds without dialing");

        let status = pool.status();
        assert_eq!(status.max_size, 3);
        assert_eq!(status.size, 0);
        assert_eq!(pool.prune_idle(), 0);
    }

    #[tokio::test]
    async fn test_dial_failure_surfaces_as_backend_error() {
        let pool = RedisPool::new(RedisPoolConfig {
            connect_timeout: Duration::from_secs(2),
            ..RedisPoolConfig::new("redis://127.0.0.1:1/")
        })
        .expect("pool builds");

        let err = pool.get().await.err().expect("nothing listens on port 1");
        assert!(matches!(
            err,
            managed::PoolError::Backend(_) | managed::PoolError::Timeout(_)
        ));
    }

    #[test]
    fn test_default_config() {
        let config = RedisPoolConfig::default();
        assert_eq!(config.probe_after, DEFAULT_PROBE_AFTER);
        assert_eq!(config.max_active, 50);
    }
}
