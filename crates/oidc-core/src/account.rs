use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An authenticated end-user as seen by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub account_id: String,
    pub email: String,
    #[serde(default)]
    pub email_verified: bool,
}

impl Account {
    pub fn new(account_id: String, email: String) -> Self {
        Self {
            account_id,
            email,
            email_verified: false,
        }
    }

    /// Every claim this account can release.
    pub fn claims(&self) -> Map<String, Value> {
        let mut claims = Map::new();
        claims.insert("sub".into(), Value::String(self.account_id.clone()));
        claims.insert("email".into(), Value::String(self.email.clone()));
        claims.insert("email_verified".into(), Value::Bool(self.email_verified));
        claims
    }
}
