use actix_web::{web, HttpResponse, Result};

use oidc_observability::Metrics;
use oidc_ports::DynAdapter;

/// Prometheus text exposition.
pub async fn system_metrics(metrics: web::Data<Metrics>) -> Result<HttpResponse> {
    let buffer = oidc_observability::encode_prometheus_text(&metrics.registry)
        .map_err(actix_web::error::ErrorInternalServerError)?;

    Ok(HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(buffer))
}

/// Health check endpoint
pub async fn health() -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "oidc_provider_demo",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

/// Readiness check endpoint
pub async fn readiness(adapter: web::Data<DynAdapter>) -> Result<HttpResponse> {
    adapter
        .healthcheck()
        .await
        .map_err(actix_web::error::ErrorServiceUnavailable)?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "ready",
        "checks": {
            "adapter": "ok"
        }
    })))
}
