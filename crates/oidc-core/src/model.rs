use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Record types the provider persists through an adapter.
///
/// The string form doubles as the key namespace (`{model}:{id}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Model {
    Session,
    AccessToken,
    AuthorizationCode,
    RefreshToken,
    DeviceCode,
    ClientCredentials,
    Client,
    InitialAccessToken,
    RegistrationAccessToken,
    Interaction,
    ReplayDetection,
    PushedAuthorizationRequest,
    Grant,
    BackchannelAuthenticationRequest,
}

impl Model {
    pub const ALL: [Model; 14] = [
        Model::Session,
        Model::AccessToken,
        Model::AuthorizationCode,
        Model::RefreshToken,
        Model::DeviceCode,
        Model::ClientCredentials,
        Model::Client,
        Model::InitialAccessToken,
        Model::RegistrationAccessToken,
        Model::Interaction,
        Model::ReplayDetection,
        Model::PushedAuthorizationRequest,
        Model::Grant,
        Model::BackchannelAuthenticationRequest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Model::Session => "Session",
            Model::AccessToken => "AccessToken",
            Model::AuthorizationCode => "AuthorizationCode",
            Model::RefreshToken => "RefreshToken",
            Model::DeviceCode => "DeviceCode",
            Model::ClientCredentials => "ClientCredentials",
            Model::Client => "Client",
            Model::InitialAccessToken => "InitialAccessToken",
            Model::RegistrationAccessToken => "RegistrationAccessToken",
            Model::Interaction => "Interaction",
            Model::ReplayDetection => "ReplayDetection",
            Model::PushedAuthorizationRequest => "PushedAuthorizationRequest",
            Model::Grant => "Grant",
            Model::BackchannelAuthenticationRequest => "BackchannelAuthenticationRequest",
        }
    }

    /// Storage key of a record of this model, without any backend prefix.
    pub fn key(&self, id: &str) -> String {
        format!("{}:{}", self.as_str(), id)
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Model {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Model::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| format!("unknown model: {s}"))
    }
}

/// Key of the list holding every record key issued under a grant.
pub fn grant_key(grant_id: &str) -> String {
    format!("grant:{grant_id}")
}

/// Key resolving a device flow user code to a record id.
pub fn user_code_key(user_code: &str) -> String {
    format!("userCode:{user_code}")
}

/// Key resolving a session uid to a record id.
pub fn uid_key(uid: &str) -> String {
    format!("uid:{uid}")
}
