use actix_web::{web, HttpRequest, HttpResponse};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use once_cell::sync::Lazy;
use tracing::trace;

use crate::models::TrackParams;
use crate::services::classify;
use crate::state::AppContext;

const PIXEL_BASE64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABAQMAAAAl21bKAAAAA1BMVEUAAACnej3aAAAAAXRSTlMAQObYZgAAAApJREFUCNdjYAAAAAIAAeIhvDMAAAAASUVORK5CYII=";

/// 1x1 transparent PNG served for every tracking request.
pub static PIXEL_PNG: Lazy<Vec<u8>> = Lazy::new(|| {
    STANDARD
        .decode(PIXEL_BASE64)
        .expect("pixel constant is valid base64")
});

/// `GET /track`
///
/// Counters are queued for batched persistence; the response never waits on
/// the store and is identical whether or not anything was counted.
pub async fn track(req: HttpRequest, ctx: web::Data<AppContext>) -> HttpResponse {
    record_event(&ctx, req.query_string());
    pixel_response()
}

fn record_event(ctx: &AppContext, query: &str) {
    let params = TrackParams::from_query(query);
    let classification = classify(&params);

    if !classification.matched {
        trace!(query, "No tracking intent matched");
        return;
    }

    ctx.metrics.events_received.inc();
    ctx.queue.submit_all(classification.operations);
}

fn pixel_response() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("image/png")
        .body(PIXEL_PNG.as_slice())
}
