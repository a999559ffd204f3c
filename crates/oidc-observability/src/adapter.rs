use async_trait::async_trait;
use tracing::{field, Instrument};

use oidc_core::{Model, OidcError, Payload};
use oidc_ports::{Adapter, DynAdapter};

use crate::telemetry::annotate_span_with_trace_ids;

/// A thin wrapper around a `DynAdapter` that creates a tracing span for each adapter call.
///
/// Request spans (created by actix middleware) extend through the actors down into
/// persistence calls. Identifiers are credentials for most models, so only a prefix
/// is ever recorded.
pub struct ObservedAdapter {
    inner: DynAdapter,
    db_system: String,
}

impl ObservedAdapter {
    pub fn new(inner: DynAdapter, db_system: String) -> Self {
        Self { inner, db_system }
    }

    fn id_prefix(id: &str) -> String {
        id.chars().take(12).collect::<String>()
    }

    fn span(&self, operation: &'static str) -> tracing::Span {
        let span = tracing::info_span!(
            "db",
            trace_id = field::Empty,
            span_id = field::Empty,
            db_system = %self.db_system,
            db_operation = operation
        );
        annotate_span_with_trace_ids(&span);
        span
    }

    fn record_span(&self, operation: &'static str, model: Model, id: &str) -> tracing::Span {
        let span = tracing::info_span!(
            "db",
            trace_id = field::Empty,
            span_id = field::Empty,
            db_system = %self.db_system,
            db_operation = operation,
            model = %model,
            id_prefix = %Self::id_prefix(id),
            id_len = id.len()
        );
        annotate_span_with_trace_ids(&span);
        span
    }
}

#[async_trait]
impl Adapter for ObservedAdapter {
    async fn upsert(
        &self,
        model: Model,
        id: &str,
        payload: &Payload,
        expires_in: Option<u64>,
    ) -> Result<(), OidcError> {
        let span = self.record_span("upsert", model, id);
        async move {
            tracing::debug!(
                expires_in = ?expires_in,
                has_grant = payload.grant_id().is_some(),
                "upsert"
            );
            self.inner.upsert(model, id, payload, expires_in).await
        }
        .instrument(span)
        .await
    }

    async fn find(&self, model: Model, id: &str) -> Result<Option<Payload>, OidcError> {
        let span = self.record_span("find", model, id);
        async move { self.inner.find(model, id).await }
            .instrument(span)
            .await
    }

    async fn find_by_user_code(
        &self,
        model: Model,
        user_code: &str,
    ) -> Result<Option<Payload>, OidcError> {
        let span = self.record_span("find_by_user_code", model, user_code);
        async move { self.inner.find_by_user_code(model, user_code).await }
            .instrument(span)
            .await
    }

    async fn find_by_uid(&self, model: Model, uid: &str) -> Result<Option<Payload>, OidcError> {
        let span = self.record_span("find_by_uid", model, uid);
        async move { self.inner.find_by_uid(model, uid).await }
            .instrument(span)
            .await
    }

    async fn destroy(&self, model: Model, id: &str) -> Result<(), OidcError> {
        let span = self.record_span("destroy", model, id);
        async move { self.inner.destroy(model, id).await }
            .instrument(span)
            .await
    }

    async fn consume(&self, model: Model, id: &str) -> Result<(), OidcError> {
        let span = self.record_span("consume", model, id);
        async move { self.inner.consume(model, id).await }
            .instrument(span)
            .await
    }

    async fn revoke_by_grant_id(&self, grant_id: &str) -> Result<(), OidcError> {
        let span = tracing::info_span!(
            "db",
            trace_id = field::Empty,
            span_id = field::Empty,
            db_system = %self.db_system,
            db_operation = "revoke_by_grant_id",
            grant_prefix = %Self::id_prefix(grant_id)
        );
        annotate_span_with_trace_ids(&span);
        async move { self.inner.revoke_by_grant_id(grant_id).await }
            .instrument(span)
            .await
    }

    async fn healthcheck(&self) -> Result<(), OidcError> {
        let span = self.span("healthcheck");
        async move { self.inner.healthcheck().await }
            .instrument(span)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oidc_adapter_memory::MemoryAdapter;
    use std::sync::Arc;

    #[tokio::test]
    async fn delegates_to_inner_adapter() {
        let inner: DynAdapter = Arc::new(MemoryAdapter::new());
        let observed = ObservedAdapter::new(inner.clone(), "memory".to_string());

        let payload = Payload::new().with("sub", "user1");
        observed
            .upsert(Model::Session, "s1", &payload, None)
            .await
            .unwrap();

        assert_eq!(inner.find(Model::Session, "s1").await.unwrap(), Some(payload));
        observed.destroy(Model::Session, "s1").await.unwrap();
        assert!(observed.find(Model::Session, "s1").await.unwrap().is_none());
        observed.healthcheck().await.unwrap();
    }
}
