use async_trait::async_trait;
use redis::{aio::ConnectionManager, Script};
use std::collections::HashMap;

use oidc_core::{
    epoch_seconds, grant_key, uid_key, user_code_key, Model, OidcError, Payload, CONSUMED,
};
use oidc_ports::Adapter;

/// Prefix shared by every key this adapter writes.
pub const DEFAULT_KEY_PREFIX: &str = "oidc:";

const PAYLOAD_FIELD: &str = "payload";

// HSET on a missing key would create an orphan without a TTL.
const CONSUME_SCRIPT: &str = r"
if redis.call('EXISTS', KEYS[1]) == 1 then
  return redis.call('HSET', KEYS[1], ARGV[1], ARGV[2])
end
return 0
";

/// Redis-backed adapter.
///
/// Layout:
/// - `{prefix}{Model}:{id}`: hash with the JSON `payload` and an optional `consumed` timestamp
/// - `{prefix}grant:{grantId}`: list of record keys issued under the grant
/// - `{prefix}userCode:{code}` / `{prefix}uid:{uid}`: record id
pub struct RedisAdapter {
    conn: ConnectionManager,
    prefix: String,
    consume_script: Script,
}

/// What an upsert has to do to the TTL of a grant index it appended to.
#[derive(Debug, PartialEq, Eq)]
enum GrantTtl {
    Expire(i64),
    Persist,
    Keep,
}

/// The grant index must outlive its longest-lived member.
///
/// `current` is the `TTL` reply for the index before the append:
/// `-2` when it did not exist, `-1` when it has no expiry.
fn grant_ttl(expires_in: Option<i64>, current: i64) -> GrantTtl {
    match (expires_in, current) {
        (None, _) => GrantTtl::Persist,
        (Some(ttl), -2) => GrantTtl::Expire(ttl),
        (Some(ttl), current) if current >= 0 && ttl > current => GrantTtl::Expire(ttl),
        (Some(_), _) => GrantTtl::Keep,
    }
}

/// Redis takes signed expiry seconds.
fn expiry_seconds(expires_in: Option<u64>) -> Result<Option<i64>, OidcError> {
    expires_in
        .map(|ttl| {
            i64::try_from(ttl)
                .map_err(|_| OidcError::server_error("redis: expires_in out of range"))
        })
        .transpose()
}

impl RedisAdapter {
    /// Parse a `redis://` or `rediss://` URL. TLS URLs accept the `#insecure`
    /// fragment for servers with self-signed certificates.
    pub fn client(url: &str) -> Result<redis::Client, OidcError> {
        redis::Client::open(url).map_err(Self::redis_err)
    }

    pub async fn connect(url: &str) -> Result<Self, OidcError> {
        let client = Self::client(url)?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(Self::redis_err)?;

        Ok(Self {
            conn,
            prefix: DEFAULT_KEY_PREFIX.to_string(),
            consume_script: Script::new(CONSUME_SCRIPT),
        })
    }

    /// Use a different key prefix (e.g. to share one Redis between deployments).
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    fn prefixed(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    fn record_key(&self, model: Model, id: &str) -> String {
        self.prefixed(&model.key(id))
    }

    fn redis_err(err: redis::RedisError) -> OidcError {
        OidcError::server_error(&format!("redis: {err}"))
    }

    async fn resolve_index(&self, index_key: &str) -> Result<Option<String>, OidcError> {
        let mut conn = self.conn.clone();
        redis::cmd("GET")
            .arg(index_key)
            .query_async::<_, Option<String>>(&mut conn)
            .await
            .map_err(Self::redis_err)
    }
}

#[async_trait]
impl Adapter for RedisAdapter {
    async fn upsert(
        &self,
        model: Model,
        id: &str,
        payload: &Payload,
        expires_in: Option<u64>,
    ) -> Result<(), OidcError> {
        let expires_in = expiry_seconds(expires_in)?;
        let key = self.record_key(model, id);
        let body = payload.to_json()?;
        let mut conn = self.conn.clone();

        // Read outside MULTI; a concurrent writer can only make the index live longer.
        let grant = match payload.grant_id() {
            Some(grant_id) => {
                let index = self.prefixed(&grant_key(grant_id));
                let current: i64 = redis::cmd("TTL")
                    .arg(&index)
                    .query_async(&mut conn)
                    .await
                    .map_err(Self::redis_err)?;
                Some((index, current))
            }
            None => None,
        };

        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.cmd("DEL").arg(&key).ignore();
        pipe.cmd("HSET")
            .arg(&key)
            .arg(PAYLOAD_FIELD)
            .arg(&body)
            .ignore();
        if let Some(ttl) = expires_in {
            pipe.cmd("EXPIRE").arg(&key).arg(ttl).ignore();
        }

        if let Some((index, current)) = grant {
            pipe.cmd("RPUSH").arg(&index).arg(&key).ignore();
            match grant_ttl(expires_in, current) {
                GrantTtl::Expire(ttl) => {
                    pipe.cmd("EXPIRE").arg(&index).arg(ttl).ignore();
                }
                GrantTtl::Persist => {
                    pipe.cmd("PERSIST").arg(&index).ignore();
                }
                GrantTtl::Keep => {}
            }
        }

        let lookups = [
            payload.user_code().map(user_code_key),
            payload.uid().map(uid_key),
        ];
        for index in lookups.into_iter().flatten() {
            let index = self.prefixed(&index);
            pipe.cmd("SET").arg(&index).arg(id).ignore();
            if let Some(ttl) = expires_in {
                pipe.cmd("EXPIRE").arg(&index).arg(ttl).ignore();
            }
        }

        pipe.query_async::<_, ()>(&mut conn)
            .await
            .map_err(Self::redis_err)
    }

    async fn find(&self, model: Model, id: &str) -> Result<Option<Payload>, OidcError> {
        let key = self.record_key(model, id);
        let mut conn = self.conn.clone();

        let data: HashMap<String, String> = redis::cmd("HGETALL")
            .arg(&key)
            .query_async(&mut conn)
            .await
            .map_err(Self::redis_err)?;

        let Some(raw) = data.get(PAYLOAD_FIELD) else {
            return Ok(None);
        };

        let mut payload = Payload::from_json(raw)?;
        if let Some(consumed) = data.get(CONSUMED) {
            let at: i64 = consumed.parse().map_err(|_| {
                OidcError::server_error(&format!("malformed consumed marker on {key}"))
            })?;
            payload.insert(CONSUMED, at);
        }

        Ok(Some(payload))
    }

    async fn find_by_user_code(
        &self,
        model: Model,
        user_code: &str,
    ) -> Result<Option<Payload>, OidcError> {
        match self
            .resolve_index(&self.prefixed(&user_code_key(user_code)))
            .await?
        {
            Some(id) => self.find(model, &id).await,
            None => Ok(None),
        }
    }

    async fn find_by_uid(&self, model: Model, uid: &str) -> Result<Option<Payload>, OidcError> {
        match self.resolve_index(&self.prefixed(&uid_key(uid))).await? {
            Some(id) => self.find(model, &id).await,
            None => Ok(None),
        }
    }

    async fn destroy(&self, model: Model, id: &str) -> Result<(), OidcError> {
        let mut conn = self.conn.clone();
        redis::cmd("DEL")
            .arg(self.record_key(model, id))
            .query_async::<_, i64>(&mut conn)
            .await
            .map(|_| ())
            .map_err(Self::redis_err)
    }

    async fn consume(&self, model: Model, id: &str) -> Result<(), OidcError> {
        let mut conn = self.conn.clone();
        self.consume_script
            .key(self.record_key(model, id))
            .arg(CONSUMED)
            .arg(epoch_seconds())
            .invoke_async::<_, i64>(&mut conn)
            .await
            .map(|_| ())
            .map_err(Self::redis_err)
    }

    async fn revoke_by_grant_id(&self, grant_id: &str) -> Result<(), OidcError> {
        let index = self.prefixed(&grant_key(grant_id));
        let mut conn = self.conn.clone();

        let keys: Vec<String> = redis::cmd("LRANGE")
            .arg(&index)
            .arg(0)
            .arg(-1)
            .query_async(&mut conn)
            .await
            .map_err(Self::redis_err)?;

        tracing::debug!(grant_id = %grant_id, records = keys.len(), "revoking grant");

        let mut pipe = redis::pipe();
        pipe.atomic();
        for key in &keys {
            pipe.cmd("DEL").arg(key).ignore();
        }
        pipe.cmd("DEL").arg(&index).ignore();

        pipe.query_async::<_, ()>(&mut conn)
            .await
            .map_err(Self::redis_err)
    }

    async fn healthcheck(&self) -> Result<(), OidcError> {
        let mut conn = self.conn.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(Self::redis_err)
    }
}
