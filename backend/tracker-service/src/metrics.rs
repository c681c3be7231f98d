use actix_web::{web, HttpResponse};
use prometheus::{Encoder, IntCounter, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::state::AppContext;

/// Pipeline counters. Diagnostic only.
#[derive(Clone)]
pub struct TrackerMetrics {
    /// Requests that matched at least one intent
    pub events_received: IntCounter,
    /// Operations appended to the accumulator
    pub events_batched: IntCounter,
    /// Batches handed to the store
    pub batches_sent: IntCounter,
    /// Batches whose store call returned an error
    pub batches_failed: IntCounter,
}

impl TrackerMetrics {
    pub fn new(registry: &Registry) -> prometheus::Result<Self> {
        let events_received = register_counter(
            registry,
            "tracker_events_received_total",
            "Tracking requests that matched at least one intent",
        )?;
        let events_batched = register_counter(
            registry,
            "tracker_events_batched_total",
            "Increment operations appended to a pending batch",
        )?;
        let batches_sent = register_counter(
            registry,
            "tracker_batches_sent_total",
            "Batches handed to the counter store",
        )?;
        let batches_failed = register_counter(
            registry,
            "tracker_batches_failed_total",
            "Batches dropped after a store error",
        )?;

        Ok(Self {
            events_received,
            events_batched,
            batches_sent,
            batches_failed,
        })
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_processed: self.events_received.get(),
            events_pipelined: self.events_batched.get(),
            events_sent: self.batches_sent.get(),
        }
    }
}

fn register_counter(registry: &Registry, name: &str, help: &str) -> prometheus::Result<IntCounter> {
    let counter = IntCounter::with_opts(Opts::new(name, help))?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

/// Counter values under their `/debug/vars` names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub events_processed: u64,
    pub events_pipelined: u64,
    pub events_sent: u64,
}

pub async fn serve_metrics(ctx: web::Data<AppContext>) -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = ctx.registry.gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}

pub async fn serve_debug_vars(ctx: web::Data<AppContext>) -> HttpResponse {
    HttpResponse::Ok().json(ctx.metrics.snapshot())
}
