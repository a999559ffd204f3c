use hocon::HoconLoader;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::ConfigError;

/// A statically registered relying party.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientMetadata {
    pub client_id: String,
    pub redirect_uris: Vec<String>,
    #[serde(default = "default_response_types")]
    pub response_types: Vec<String>,
    #[serde(default = "default_grant_types")]
    pub grant_types: Vec<String>,
    #[serde(default = "default_auth_method")]
    pub token_endpoint_auth_method: String,
}

fn default_response_types() -> Vec<String> {
    vec!["code".to_string()]
}

fn default_grant_types() -> Vec<String> {
    vec!["authorization_code".to_string()]
}

fn default_auth_method() -> String {
    "client_secret_basic".to_string()
}

/// Clients, scope-to-claims mapping and interaction lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(default = "default_clients")]
    pub clients: Vec<ClientMetadata>,
    #[serde(default = "default_claims")]
    pub claims: BTreeMap<String, Vec<String>>,
    #[serde(default = "default_interaction_ttl")]
    pub interaction_ttl: u64,
}

fn default_clients() -> Vec<ClientMetadata> {
    vec![ClientMetadata {
        client_id: "foo".to_string(),
        redirect_uris: vec!["https://example.com".to_string()],
        response_types: vec!["id_token token".to_string()],
        grant_types: vec!["implicit".to_string()],
        token_endpoint_auth_method: "none".to_string(),
    }]
}

fn default_claims() -> BTreeMap<String, Vec<String>> {
    BTreeMap::from([
        ("openid".to_string(), vec!["sub".to_string()]),
        (
            "email".to_string(),
            vec!["email".to_string(), "email_verified".to_string()],
        ),
    ])
}

fn default_interaction_ttl() -> u64 {
    3600
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            clients: default_clients(),
            claims: default_claims(),
            interaction_ttl: default_interaction_ttl(),
        }
    }
}

impl ProviderSettings {
    pub fn from_hocon_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let settings_err = |reason: String| ConfigError::ProviderSettings {
            path: path.display().to_string(),
            reason,
        };

        let settings: Self = HoconLoader::new()
            .load_file(path)
            .map_err(|e| settings_err(format!("failed to load HOCON file: {e}")))?
            .resolve()
            .map_err(|e| settings_err(format!("failed to parse and resolve HOCON: {e}")))?;

        settings.validate().map_err(settings_err)?;
        Ok(settings)
    }

    pub fn from_hocon_str(source: &str) -> Result<Self, ConfigError> {
        let settings_err = |reason: String| ConfigError::ProviderSettings {
            path: "<inline>".to_string(),
            reason,
        };

        let settings: Self = HoconLoader::new()
            .load_str(source)
            .map_err(|e| settings_err(format!("failed to load HOCON: {e}")))?
            .resolve()
            .map_err(|e| settings_err(format!("failed to parse and resolve HOCON: {e}")))?;

        settings.validate().map_err(settings_err)?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), String> {
        if self.interaction_ttl == 0 {
            return Err("interaction_ttl must be positive".to_string());
        }
        for client in &self.clients {
            if client.client_id.trim().is_empty() {
                return Err("client_id must not be empty".to_string());
            }
            if client.redirect_uris.is_empty() {
                return Err(format!("client {} has no redirect_uris", client.client_id));
            }
        }
        Ok(())
    }

    pub fn client(&self, client_id: &str) -> Option<&ClientMetadata> {
        self.clients.iter().find(|c| c.client_id == client_id)
    }

    /// Claim names released for a space-separated scope string.
    pub fn claims_for_scope(&self, scope: &str) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for s in scope.split_whitespace() {
            if let Some(claims) = self.claims.get(s) {
                for claim in claims {
                    if !names.contains(&claim.as_str()) {
                        names.push(claim);
                    }
                }
            }
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_register_the_demo_client() {
        let settings = ProviderSettings::default();
        let foo = settings.client("foo").unwrap();
        assert_eq!(foo.redirect_uris, vec!["https://example.com"]);
        assert_eq!(foo.response_types, vec!["id_token token"]);
        assert_eq!(foo.grant_types, vec!["implicit"]);
        assert_eq!(foo.token_endpoint_auth_method, "none");
        assert!(settings.client("bar").is_none());
        assert_eq!(settings.interaction_ttl, 3600);
    }

    #[test]
    fn claims_follow_requested_scopes() {
        let settings = ProviderSettings::default();
        assert_eq!(settings.claims_for_scope("openid"), vec!["sub"]);
        assert_eq!(
            settings.claims_for_scope("openid email profile"),
            vec!["sub", "email", "email_verified"]
        );
    }

    #[test]
    fn hocon_overrides_clients_and_keeps_default_claims() {
        let settings = ProviderSettings::from_hocon_str(
            r#"
            interaction_ttl = 600
            clients = [
              {
                client_id = "spa"
                redirect_uris = ["https://spa.example.org/callback"]
              }
            ]
            "#,
        )
        .unwrap();

        assert_eq!(settings.interaction_ttl, 600);
        let spa = settings.client("spa").unwrap();
        assert_eq!(spa.response_types, vec!["code"]);
        assert_eq!(spa.token_endpoint_auth_method, "client_secret_basic");
        assert!(settings.client("foo").is_none());
        assert_eq!(settings.claims, default_claims());
    }

    #[test]
    fn hocon_file_is_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "interaction_ttl = 120").unwrap();

        let settings = ProviderSettings::from_hocon_path(file.path()).unwrap();
        assert_eq!(settings.interaction_ttl, 120);
        assert_eq!(settings.clients, default_clients());
    }

    #[test]
    fn zero_interaction_ttl_is_rejected() {
        let err = ProviderSettings::from_hocon_str("interaction_ttl = 0").unwrap_err();
        assert!(err.to_string().contains("interaction_ttl"));
    }
}
