use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque record body stored by an adapter.
///
/// The provider owns the shape; adapters only look at the few attributes that
/// drive secondary indexes (`grantId`, `userCode`, `uid`) and at the
/// `consumed` marker they maintain themselves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(Map<String, Value>);

pub const GRANT_ID: &str = "grantId";
pub const USER_CODE: &str = "userCode";
pub const UID: &str = "uid";
pub const CONSUMED: &str = "consumed";

impl Payload {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.to_string(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    fn str_attr(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
    }

    pub fn grant_id(&self) -> Option<&str> {
        self.str_attr(GRANT_ID)
    }

    pub fn user_code(&self) -> Option<&str> {
        self.str_attr(USER_CODE)
    }

    pub fn uid(&self) -> Option<&str> {
        self.str_attr(UID)
    }

    /// Epoch seconds at which the record was consumed, if it was.
    pub fn consumed(&self) -> Option<i64> {
        self.0.get(CONSUMED).and_then(Value::as_i64)
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed().is_some()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Payload {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Payload {
    type Error = serde_json::Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        serde_json::from_value(value)
    }
}
