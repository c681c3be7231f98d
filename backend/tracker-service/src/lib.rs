//! Pixel tracking service
//!
//! `/track` requests are classified into counter increments, queued, grouped
//! into fixed-size batches by a single accumulator task and written to Redis
//! as `MULTI`/`EXEC` blocks on pooled connections. The caller always gets a
//! transparent pixel back without waiting on the store.

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod services;
pub mod state;

pub use config::Config;
pub use state::AppContext;
