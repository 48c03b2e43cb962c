//! Request-scoped middleware: request id propagation and HTTP metrics.

use std::sync::Arc;
use std::time::Instant;

use actix_web::body::MessageBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::middleware::Next;
use actix_web::{web, Error, HttpMessage};
use uuid::Uuid;

use crate::domain::metrics::{
    KeyValue, MetricsEmitter, ACTIVE_USERS_COUNT, HTTP_REQUESTS, HTTP_REQUEST_DURATION,
    HTTP_REQUEST_ERRORS,
};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longer caller-supplied ids are replaced with a generated one.
pub const MAX_REQUEST_ID_LEN: usize = 128;

/// Request id attached to the request extensions.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Reuses the caller's `X-Request-ID` when it is at most
/// [`MAX_REQUEST_ID_LEN`] bytes, otherwise generates one, and echoes it on
/// the response.
pub async fn request_id(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LEN)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.call(req).await?;
    if let Ok(value) = HeaderValue::from_str(&id) {
        res.headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    Ok(res)
}

/// Counts requests and failures (status >= 400) and records the duration in
/// milliseconds, tagged with method, route template and status code.
pub async fn http_metrics(
    metrics: web::Data<Arc<dyn MetricsEmitter>>,
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let started = Instant::now();
    let method = req.method().to_string();
    let user_id = query_user_id(req.query_string());

    let res = next.call(req).await?;

    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    let status = res.status();
    let route = res
        .request()
        .match_pattern()
        .unwrap_or_else(|| "unknown".to_string());
    let attributes = [
        KeyValue::new("http.method", &method),
        KeyValue::new("http.route", &route),
        KeyValue::new("http.status_code", status.as_u16()),
    ];

    metrics.add(HTTP_REQUESTS, 1.0, &attributes);
    if status.as_u16() >= 400 {
        metrics.add(HTTP_REQUEST_ERRORS, 1.0, &attributes);
    }
    if let Some(user_id) = user_id {
        metrics.gauge(
            ACTIVE_USERS_COUNT,
            1.0,
            &[
                KeyValue::new("session_type", "active"),
                KeyValue::new("user_id", user_id),
            ],
        );
    }
    metrics.histogram(HTTP_REQUEST_DURATION, elapsed_ms, &attributes);

    Ok(res)
}

fn query_user_id(query: &str) -> Option<String> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "user_id")
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use actix_web::middleware::from_fn;
    use actix_web::{test, App, HttpResponse};

    use super::*;
    use crate::testing::RecordingMetrics;

    #[::core::prelude::v1::test]
    fn extracts_user_id_from_query() {
        assert_eq!(query_user_id("user_id=7&x=1"), Some("7".to_string()));
        assert_eq!(query_user_id("limit=5&user_id=abc"), Some("abc".to_string()));
        assert_eq!(query_user_id("user_id="), None);
        assert_eq!(query_user_id(""), None);
    }

    #[actix_web::test]
    async fn generates_and_echoes_request_id() {
        let app = test::init_service(
            App::new()
                .wrap(from_fn(request_id))
                .route("/ping", web::get().to(HttpResponse::Ok)),
        )
        .await;

        let generated = test::call_service(&app, test::TestRequest::get().uri("/ping").to_request()).await;
        let id = generated.headers().get(REQUEST_ID_HEADER).unwrap().to_str().unwrap();
        assert!(Uuid::parse_str(id).is_ok());

        let echoed = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/ping")
                .insert_header(("X-Request-ID", "abc-123"))
                .to_request(),
        )
        .await;
        assert_eq!(echoed.headers().get(REQUEST_ID_HEADER).unwrap(), "abc-123");
    }

    #[actix_web::test]
    async fn oversized_request_id_is_replaced() {
        let app = test::init_service(
            App::new()
                .wrap(from_fn(request_id))
                .route("/ping", web::get().to(HttpResponse::Ok)),
        )
        .await;

        let at_limit = "a".repeat(MAX_REQUEST_ID_LEN);
        let kept = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/ping")
                .insert_header(("X-Request-ID", at_limit.as_str()))
                .to_request(),
        )
        .await;
        assert_eq!(kept.headers().get(REQUEST_ID_HEADER).unwrap(), at_limit.as_str());

        let oversized = "a".repeat(MAX_REQUEST_ID_LEN + 1);
        let replaced = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/ping")
                .insert_header(("X-Request-ID", oversized.as_str()))
                .to_request(),
        )
        .await;
        let id = replaced.headers().get(REQUEST_ID_HEADER).unwrap().to_str().unwrap();
        assert_ne!(id, oversized);
        assert!(Uuid::parse_str(id).is_ok());
    }

    #[actix_web::test]
    async fn records_request_error_and_duration_metrics() {
        let recorder = RecordingMetrics::new();
        let emitter: Arc<dyn MetricsEmitter> = recorder.clone();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(emitter))
                .wrap(from_fn(http_metrics))
                .route("/items/{id}", web::get().to(HttpResponse::NotFound)),
        )
        .await;

        let res = test::call_service(
            &app,
            test::TestRequest::get().uri("/items/5?user_id=9").to_request(),
        )
        .await;
        assert_eq!(res.status(), 404);

        let requests = recorder.named(HTTP_REQUESTS);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].attr("http.method"), Some("GET"));
        assert_eq!(requests[0].attr("http.route"), Some("/items/{id}"));
        assert_eq!(requests[0].attr("http.status_code"), Some("404"));
        assert_eq!(recorder.named(HTTP_REQUEST_ERRORS).len(), 1);
        assert_eq!(recorder.named(HTTP_REQUEST_DURATION).len(), 1);
        let active = recorder.named(ACTIVE_USERS_COUNT);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].attr("user_id"), Some("9"));
    }
}
