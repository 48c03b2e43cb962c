use actix_web::http::header::CONTENT_TYPE;
use actix_web::{web, HttpResponse};
use prometheus::{Encoder, Registry, TextEncoder};

use crate::errors::AppError;

/// GET /metrics
///
/// Prometheus text exposition of every instrument recorded so far.
#[utoipa::path(
    get,
    path = "/metrics",
    responses(
        (status = 200, description = "Prometheus text format", body = String, content_type = "text/plain"),
    ),
    tag = "health"
)]
pub async fn metrics(registry: web::Data<Registry>) -> Result<HttpResponse, AppError> {
    let encoder = TextEncoder::new();
    let mut encoded = Vec::new();
    encoder
        .encode(&registry.gather(), &mut encoded)
        .map_err(|e| AppError::Internal(format!("failed to encode metrics: {e}")))?;

    Ok(HttpResponse::Ok()
        .insert_header((CONTENT_TYPE, encoder.format_type()))
        .body(encoded))
}
