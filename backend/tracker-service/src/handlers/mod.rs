pub mod track;

use actix_web::{web, HttpResponse};
use std::time::Duration;

use crate::metrics::{serve_debug_vars, serve_metrics};
use crate::middleware::RequestDeadline;

pub use track::track;

async fn health() -> HttpResponse {
    HttpResponse::Ok().body("ok")
}

/// Register every route on an `App`. `/track` runs under `request_timeout`.
pub fn configure(request_timeout: Duration) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.service(
            web::resource("/track")
                .wrap(RequestDeadline::new(request_timeout))
                .route(web::get().to(track)),
        )
        .route("/health", web::get().to(health))
        .route("/metrics", web::get().to(serve_metrics))
        .route("/debug/vars", web::get().to(serve_debug_vars));
    }
}
