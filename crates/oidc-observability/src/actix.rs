use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;
use std::time::Instant;

use oidc_core::OidcError;

use crate::Metrics;

/// Route label for requests no resource matched (the provider catch-all).
const UNMATCHED_ROUTE: &str = "unmatched";

/// Error label for responses that did not come from an [`OidcError`].
const NO_ERROR: &str = "none";

/// Counts requests by route pattern and OAuth error code, and times them by route.
///
/// Handlers fail with [`OidcError`]; its `error` code (`session_not_found`,
/// `access_denied`, ...) becomes the `error` label so rejected interactions show
/// up without parsing response bodies.
pub struct MetricsMiddleware {
    metrics: Metrics,
}

impl MetricsMiddleware {
    pub fn new(metrics: Metrics) -> Self {
        Self { metrics }
    }
}

impl<S, B> Transform<S, ServiceRequest> for MetricsMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = MetricsService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(MetricsService {
            inner: Rc::new(service),
            metrics: self.metrics.clone(),
        }))
    }
}

pub struct MetricsService<S> {
    inner: Rc<S>,
    metrics: Metrics,
}

fn oidc_error_code<B>(res: &ServiceResponse<B>) -> String {
    res.response()
        .error()
        .and_then(|e| e.as_error::<OidcError>())
        .map_or_else(|| NO_ERROR.to_string(), |e| e.error.clone())
}

impl<S, B> Service<ServiceRequest> for MetricsService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(inner);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let started = Instant::now();
        let inner = self.inner.clone();
        let metrics = self.metrics.clone();
        let method = req.method().to_string();

        Box::pin(async move {
            let res = inner.call(req).await?;

            let route = res
                .request()
                .match_pattern()
                .unwrap_or_else(|| UNMATCHED_ROUTE.to_string());
            let status = res.status().as_u16().to_string();
            let error = oidc_error_code(&res);

            if res.status().is_server_error() {
                tracing::warn!(%route, %status, %error, "request failed");
            }

            metrics
                .http_requests_total
                .with_label_values(&[&method, &route, &status, &error])
                .inc();
            metrics
                .http_request_duration_seconds
                .with_label_values(&[&method, &route])
                .observe(started.elapsed().as_secs_f64());

            Ok(res)
        })
    }
}
