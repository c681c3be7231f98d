use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::{Context, Result};
use redis_utils::RedisPool;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tracker_service::handlers;
use tracker_service::services::{
    CounterStore, ErrorReporter, HttpErrorReporter, RedisCounterStore, TracingErrorReporter,
};
use tracker_service::{AppContext, Config};

const SERVICE_NAME: &str = "tracker-service";

#[actix_web::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info,tracker_service=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting {}", SERVICE_NAME);

    let config = Config::from_env().context("Failed to load configuration")?;
    config.log_config();

    let pool = RedisPool::new(config.redis_pool_config()).context("Failed to create Redis pool")?;
    pool.spawn_idle_reaper(config.reap_interval());

    let reporter: Arc<dyn ErrorReporter> = match config.error_reporter_url.as_deref() {
        Some(url) if !url.is_empty() => Arc::new(
            HttpErrorReporter::new(url, SERVICE_NAME)
                .context("Failed to build error reporter client")?,
        ),
        _ => {
            tracing::warn!("ERROR_REPORTER_URL not set, store errors will only be logged");
            Arc::new(TracingErrorReporter)
        }
    };

    let store: Arc<dyn CounterStore> = Arc::new(RedisCounterStore::new(pool));
    let ctx = AppContext::start(config.batch_size(), store, reporter)
        .context("Failed to register metrics")?;

    let bind_addr = config.bind_addr();
    tracing::info!("Starting HTTP server on {}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(ctx.clone()))
            .wrap(Logger::default())
            .configure(handlers::configure(ctx.request_timeout))
    })
    .client_request_timeout(config.read_timeout())
    .client_disconnect_timeout(config.write_timeout())
    .bind(&bind_addr)
    .with_context(|| format!("Failed to bind on {bind_addr}"))?
    .run()
    .await
    .context("HTTP server error")
}
