use actix_web::{web, HttpResponse, Result};

use oidc_core::OidcError;
use oidc_provider::Provider;

/// Published signing keys.
pub async fn jwks(provider: web::Data<Provider>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(provider.jwks()))
}

/// Catch-all for every path the app does not route.
pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(OidcError::invalid_request("unrecognized route"))
}
