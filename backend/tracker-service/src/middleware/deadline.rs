use actix_web::{
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpResponse,
};
use futures::future::{ready, Ready};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::time::Duration;
use tracing::warn;

/// Aborts the wrapped service once `timeout` elapses and answers 503 with an
/// empty body. Work the handler already queued keeps running.
#[derive(Debug, Clone, Copy)]
pub struct RequestDeadline {
    timeout: Duration,
}

impl RequestDeadline {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequestDeadline
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RequestDeadlineService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestDeadlineService {
            service: Rc::new(service),
            timeout: self.timeout,
        }))
    }
}

pub struct RequestDeadlineService<S> {
    service: Rc<S>,
    timeout: Duration,
}

impl<S, B> Service<ServiceRequest> for RequestDeadlineService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    actix_web::dev::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let timeout = self.timeout;
        let http_req = req.request().clone();

        Box::pin(async move {
            match tokio::time::timeout(timeout, service.call(req)).await {
                Ok(res) => res.map(ServiceResponse::map_into_left_body),
                Err(_) => {
                    warn!(
                        path = %http_req.path(),
                        timeout_ms = timeout.as_millis() as u64,
                        "Request deadline exceeded"
                    );
                    let res = HttpResponse::ServiceUnavailable().finish();
                    Ok(ServiceResponse::new(http_req, res).map_into_right_body())
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test, web, App};

    async fn slow() -> HttpResponse {
        tokio::time::sleep(Duration::from_secs(2)).await;
        HttpResponse::Ok().body("late")
    }

    async fn fast() -> HttpResponse {
        HttpResponse::Ok().body("on time")
    }

    #[actix_web::test]
    async fn test_slow_handler_gets_empty_503() {
        let app = test::init_service(
            App::new().service(
                web::resource("/slow")
                    .wrap(RequestDeadline::new(Duration::from_millis(20)))
                    .route(web::get().to(slow)),
            ),
        )
        .await;

        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/slow").to_request()).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = test::read_body(resp).await;
        assert!(body.is_empty());
    }

    #[actix_web::test]
    async fn test_fast_handler_passes_through() {
        let app = test::init_service(
            App::new().service(
                web::resource("/fast")
                    .wrap(RequestDeadline::new(Duration::from_secs(1)))
                    .route(web::get().to(fast)),
            ),
        )
        .await;

        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/fast").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(test::read_body(resp).await.as_ref(), b"on time");
    }
}
