use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use oidc_core::{
    epoch_seconds, grant_key, uid_key, user_code_key, Model, OidcError, Payload, CONSUMED,
};
use oidc_ports::Adapter;

/// In-process adapter with the same key layout and expiry rules as the Redis one.
///
/// Nothing survives a restart and nothing is shared between processes; use it
/// for local development (`memory://`) and tests.
#[derive(Default)]
pub struct MemoryAdapter {
    state: RwLock<State>,
}

#[derive(Default)]
struct State {
    records: HashMap<String, Record>,
    grants: HashMap<String, GrantIndex>,
    lookups: HashMap<String, Lookup>,
}

struct Record {
    payload: Payload,
    consumed: Option<i64>,
    expires_at: Option<Instant>,
}

struct GrantIndex {
    keys: Vec<String>,
    expires_at: Option<Instant>,
}

struct Lookup {
    id: String,
    expires_at: Option<Instant>,
}

fn live(expires_at: Option<Instant>, now: Instant) -> bool {
    expires_at.map_or(true, |at| at > now)
}

impl State {
    fn purge_expired(&mut self, now: Instant) {
        self.records.retain(|_, r| live(r.expires_at, now));
        self.grants.retain(|_, g| live(g.expires_at, now));
        self.lookups.retain(|_, l| live(l.expires_at, now));
    }

    fn lookup(&self, key: &str, now: Instant) -> Option<String> {
        self.lookups
            .get(key)
            .filter(|l| live(l.expires_at, now))
            .map(|l| l.id.clone())
    }

    fn find(&self, key: &str, now: Instant) -> Option<Payload> {
        let record = self.records.get(key).filter(|r| live(r.expires_at, now))?;
        let mut payload = record.payload.clone();
        if let Some(at) = record.consumed {
            payload.insert(CONSUMED, at);
        }
        Some(payload)
    }
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live records, across all models.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.state
            .read()
            .await
            .records
            .values()
            .filter(|r| live(r.expires_at, now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl Adapter for MemoryAdapter {
    async fn upsert(
        &self,
        model: Model,
        id: &str,
        payload: &Payload,
        expires_in: Option<u64>,
    ) -> Result<(), OidcError> {
        let now = Instant::now();
        let expires_at = expires_in
            .map(|ttl| {
                now.checked_add(Duration::from_secs(ttl))
                    .ok_or_else(|| OidcError::server_error("memory: expires_in out of range"))
            })
            .transpose()?;
        let key = model.key(id);

        let mut state = self.state.write().await;
        state.purge_expired(now);

        state.records.insert(
            key.clone(),
            Record {
                payload: payload.clone(),
                consumed: None,
                expires_at,
            },
        );

        if let Some(grant_id) = payload.grant_id() {
            let grant = grant_key(grant_id);
            // The index must outlive its longest-lived member.
            let index_expiry = match (state.grants.get(&grant).map(|g| g.expires_at), expires_at) {
                (_, None) => None,
                (None, Some(new)) => Some(new),
                (Some(None), Some(_)) => None,
                (Some(Some(current)), Some(new)) => Some(current.max(new)),
            };
            let index = state.grants.entry(grant).or_insert_with(|| GrantIndex {
                keys: Vec::new(),
                expires_at: None,
            });
            index.keys.push(key);
            index.expires_at = index_expiry;
        }

        let lookups = [
            payload.user_code().map(user_code_key),
            payload.uid().map(uid_key),
        ];
        for lookup in lookups.into_iter().flatten() {
            state.lookups.insert(
                lookup,
                Lookup {
                    id: id.to_string(),
                    expires_at,
                },
            );
        }

        Ok(())
    }

    async fn find(&self, model: Model, id: &str) -> Result<Option<Payload>, OidcError> {
        let now = Instant::now();
        Ok(self.state.read().await.find(&model.key(id), now))
    }

    async fn find_by_user_code(
        &self,
        model: Model,
        user_code: &str,
    ) -> Result<Option<Payload>, OidcError> {
        let now = Instant::now();
        let state = self.state.read().await;
        Ok(state
            .lookup(&user_code_key(user_code), now)
            .and_then(|id| state.find(&model.key(&id), now)))
    }

    async fn find_by_uid(&self, model: Model, uid: &str) -> Result<Option<Payload>, OidcError> {
        let now = Instant::now();
        let state = self.state.read().await;
        Ok(state
            .lookup(&uid_key(uid), now)
            .and_then(|id| state.find(&model.key(&id), now)))
    }

    async fn destroy(&self, model: Model, id: &str) -> Result<(), OidcError> {
        self.state.write().await.records.remove(&model.key(id));
        Ok(())
    }

    async fn consume(&self, model: Model, id: &str) -> Result<(), OidcError> {
        let now = Instant::now();
        let mut state = self.state.write().await;
        if let Some(record) = state
            .records
            .get_mut(&model.key(id))
            .filter(|r| live(r.expires_at, now))
        {
            record.consumed = Some(epoch_seconds());
        }
        Ok(())
    }

    async fn revoke_by_grant_id(&self, grant_id: &str) -> Result<(), OidcError> {
        let mut state = self.state.write().await;
        if let Some(index) = state.grants.remove(&grant_key(grant_id)) {
            tracing::debug!(grant_id = %grant_id, records = index.keys.len(), "revoking grant");
            for key in index.keys {
                state.records.remove(&key);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> Payload {
        Payload::try_from(value).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn record_expires_after_its_ttl() {
        let adapter = MemoryAdapter::new();
        adapter
            .upsert(Model::Session, "s1", &payload(json!({"uid": "u1"})), Some(60))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(adapter.find(Model::Session, "s1").await.unwrap().is_some());
        assert!(adapter.find_by_uid(Model::Session, "u1").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(adapter.find(Model::Session, "s1").await.unwrap().is_none());
        assert!(adapter.find_by_uid(Model::Session, "u1").await.unwrap().is_none());
        assert!(adapter.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn grant_index_outlives_its_longest_member() {
        let adapter = MemoryAdapter::new();
        let short = payload(json!({"grantId": "g1"}));
        adapter
            .upsert(Model::AccessToken, "at", &short, Some(10))
            .await
            .unwrap();
        adapter
            .upsert(Model::RefreshToken, "rt", &short, Some(100))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(50)).await;
        adapter.revoke_by_grant_id("g1").await.unwrap();
        assert!(adapter.find(Model::RefreshToken, "rt").await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn consume_keeps_remaining_ttl() {
        let adapter = MemoryAdapter::new();
        adapter
            .upsert(Model::AuthorizationCode, "c1", &payload(json!({"sub": "x"})), Some(30))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(20)).await;
        adapter.consume(Model::AuthorizationCode, "c1").await.unwrap();
        let found = adapter.find(Model::AuthorizationCode, "c1").await.unwrap().unwrap();
        assert!(found.is_consumed());

        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(adapter.find(Model::AuthorizationCode, "c1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unrepresentable_ttl_is_rejected_without_storing() {
        let adapter = MemoryAdapter::new();
        let err = adapter
            .upsert(Model::AccessToken, "x", &payload(json!({"sub": "x"})), Some(u64::MAX))
            .await
            .unwrap_err();
        assert_eq!(err.error, "server_error");
        assert!(adapter.find(Model::AccessToken, "x").await.unwrap().is_none());
    }
}
