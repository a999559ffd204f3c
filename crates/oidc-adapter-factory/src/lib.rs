//! Adapter backend selection for the OIDC provider demo.
//!
//! Centralizes URL-based backend selection (Redis vs in-process) and wraps
//! the chosen implementation with `ObservedAdapter` for tracing.

use std::sync::Arc;

use oidc_core::OidcError;

pub use oidc_observability::ObservedAdapter;
pub use oidc_ports::{Adapter, DynAdapter};

pub mod redis {
    pub use oidc_adapter_redis::RedisAdapter;
}

pub mod memory {
    pub use oidc_adapter_memory::MemoryAdapter;
}

/// Create an adapter based on URL scheme.
///
/// Supported:
/// - `redis://...` and `rediss://...` -> Redis backend
/// - `memory://` -> in-process backend (single instance, not persistent)
pub async fn create_adapter(url: &str) -> Result<DynAdapter, OidcError> {
    if url.starts_with("memory://") {
        let inner: DynAdapter = Arc::new(memory::MemoryAdapter::new());
        return Ok(Arc::new(ObservedAdapter::new(inner, "memory".to_string())));
    }

    if url.starts_with("redis://") || url.starts_with("rediss://") {
        let adapter = redis::RedisAdapter::connect(url).await?;
        let inner: DynAdapter = Arc::new(adapter);
        return Ok(Arc::new(ObservedAdapter::new(inner, "redis".to_string())));
    }

    Err(OidcError::new(
        "server_error",
        Some("unsupported adapter URL scheme (expected redis://, rediss:// or memory://)"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use oidc_core::{Model, Payload};

    #[tokio::test]
    async fn memory_scheme_selects_in_process_adapter() {
        let adapter = create_adapter("memory://").await.unwrap();
        let payload = Payload::new().with("sub", "user1");
        adapter
            .upsert(Model::Session, "s1", &payload, None)
            .await
            .unwrap();
        assert_eq!(adapter.find(Model::Session, "s1").await.unwrap(), Some(payload));
    }

    #[tokio::test]
    async fn unknown_scheme_is_rejected() {
        let err = create_adapter("postgres://localhost/oidc").await.err().unwrap();
        assert_eq!(err.error, "server_error");
        assert!(err.to_string().contains("unsupported adapter URL scheme"));
    }
}
