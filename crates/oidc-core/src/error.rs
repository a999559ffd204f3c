use serde::{Deserialize, Serialize};
use std::fmt;

#[cfg(feature = "actix")]
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};

/// Error shape shared by the adapter, the provider boundary and the HTTP layer.
///
/// Mirrors an OAuth error response so it can be rendered as-is.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OidcError {
    pub error: String,
    pub error_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_uri: Option<String>,
}

impl OidcError {
    pub fn new(error: &str, description: Option<&str>) -> Self {
        Self {
            error: error.to_string(),
            error_description: description.map(|s| s.to_string()),
            error_uri: None,
        }
    }

    pub fn server_error(description: &str) -> Self {
        Self::new("server_error", Some(description))
    }

    pub fn invalid_request(description: &str) -> Self {
        Self::new("invalid_request", Some(description))
    }

    pub fn invalid_client(description: &str) -> Self {
        Self::new("invalid_client", Some(description))
    }

    pub fn access_denied(description: &str) -> Self {
        Self::new("access_denied", Some(description))
    }

    pub fn session_not_found(description: &str) -> Self {
        Self::new("session_not_found", Some(description))
    }

    pub fn not_found(description: &str) -> Self {
        Self::new("not_found", Some(description))
    }
}

impl fmt::Display for OidcError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_description {
            Some(description) => write!(f, "{}: {}", self.error, description),
            None => f.write_str(&self.error),
        }
    }
}

impl std::error::Error for OidcError {}

impl From<serde_json::Error> for OidcError {
    fn from(err: serde_json::Error) -> Self {
        Self::server_error(&format!("malformed payload: {err}"))
    }
}

#[cfg(feature = "actix")]
impl ResponseError for OidcError {
    fn status_code(&self) -> StatusCode {
        match self.error.as_str() {
            "server_error" => StatusCode::INTERNAL_SERVER_ERROR,
            "invalid_client" => StatusCode::UNAUTHORIZED,
            "access_denied" => StatusCode::FORBIDDEN,
            "not_found" => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self)
    }
}
