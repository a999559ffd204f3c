use async_trait::async_trait;
use std::sync::Arc;

use oidc_core::{Model, OidcError, Payload};

/// Persistence contract the provider relies on.
///
/// A missing key is never an error: lookups return `Ok(None)` and deletes of
/// absent records succeed. Backend failures propagate unchanged, without retries.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Store `payload` under `model:id`, replacing any previous record.
    ///
    /// `expires_in` is a TTL in seconds. A `grantId`, `userCode` or `uid`
    /// attribute in the payload also maintains the matching secondary index.
    async fn upsert(
        &self,
        model: Model,
        id: &str,
        payload: &Payload,
        expires_in: Option<u64>,
    ) -> Result<(), OidcError>;

    /// Fetch a record, with the `consumed` marker merged back into the payload.
    async fn find(&self, model: Model, id: &str) -> Result<Option<Payload>, OidcError>;

    async fn find_by_user_code(
        &self,
        model: Model,
        user_code: &str,
    ) -> Result<Option<Payload>, OidcError>;

    async fn find_by_uid(&self, model: Model, uid: &str) -> Result<Option<Payload>, OidcError>;

    async fn destroy(&self, model: Model, id: &str) -> Result<(), OidcError>;

    /// Mark a record consumed without deleting it or touching its TTL.
    async fn consume(&self, model: Model, id: &str) -> Result<(), OidcError>;

    /// Delete every record issued under `grant_id`, then the grant index itself.
    async fn revoke_by_grant_id(&self, grant_id: &str) -> Result<(), OidcError>;

    /// Lightweight liveness/readiness check.
    async fn healthcheck(&self) -> Result<(), OidcError> {
        Ok(())
    }
}

pub type DynAdapter = Arc<dyn Adapter>;
