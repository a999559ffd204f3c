use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry};

/// Prometheus metrics exposed on `/metrics`.
#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    /// Labelled by method, route pattern, status and OAuth `error` code (`none` on success).
    pub http_requests_total: IntCounterVec,
    /// Labelled by method and route pattern.
    pub http_request_duration_seconds: HistogramVec,

    /// Interaction pages rendered, labelled by view (`login` / `consent`).
    pub interaction_views_total: IntCounterVec,
    pub interaction_logins_total: IntCounter,
    pub interaction_login_failures_total: IntCounter,
    pub interaction_consents_total: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("oidc_http_requests_total", "HTTP requests by route and outcome"),
            &["method", "route", "status", "error"],
        )?;
        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "oidc_http_request_duration_seconds",
                "HTTP request latency by route",
            ),
            &["method", "route"],
        )?;

        let interaction_views_total = IntCounterVec::new(
            Opts::new("oidc_interaction_views_total", "Interaction pages rendered"),
            &["view"],
        )?;
        let interaction_logins_total = IntCounter::new(
            "oidc_interaction_logins_total",
            "Login interactions completed",
        )?;
        let interaction_login_failures_total = IntCounter::new(
            "oidc_interaction_login_failures_total",
            "Login attempts rejected by the account service",
        )?;
        let interaction_consents_total = IntCounter::new(
            "oidc_interaction_consents_total",
            "Consent interactions completed",
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(interaction_views_total.clone()))?;
        registry.register(Box::new(interaction_logins_total.clone()))?;
        registry.register(Box::new(interaction_login_failures_total.clone()))?;
        registry.register(Box::new(interaction_consents_total.clone()))?;

        Ok(Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            interaction_views_total,
            interaction_logins_total,
            interaction_login_failures_total,
            interaction_consents_total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_exports_interaction_counters() {
        let metrics = Metrics::new().unwrap();
        metrics.interaction_logins_total.inc();
        metrics
            .interaction_views_total
            .with_label_values(&["login"])
            .inc();

        let text = String::from_utf8(crate::encode_prometheus_text(&metrics.registry).unwrap())
            .unwrap();
        assert!(text.contains("oidc_interaction_logins_total 1"));
        assert!(text.contains("oidc_interaction_views_total{view=\"login\"} 1"));
    }
}
