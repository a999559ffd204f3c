use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Payload;

/// Why the provider handed the user agent over to the interaction UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InteractionReason {
    NoSession,
    LoginPrompt,
    MaxAge,
    IdTokenHint,
    ConsentPrompt,
    ClientNotAuthorized,
    /// A reason this app has no dedicated handling for.
    Other(String),
}

impl InteractionReason {
    pub fn as_str(&self) -> &str {
        match self {
            InteractionReason::NoSession => "no_session",
            InteractionReason::LoginPrompt => "login_prompt",
            InteractionReason::MaxAge => "max_age",
            InteractionReason::IdTokenHint => "id_token_hint",
            InteractionReason::ConsentPrompt => "consent_prompt",
            InteractionReason::ClientNotAuthorized => "client_not_authorized",
            InteractionReason::Other(reason) => reason,
        }
    }

    /// The view that resolves this reason.
    pub fn view(&self) -> InteractionView {
        match self {
            InteractionReason::ConsentPrompt | InteractionReason::ClientNotAuthorized => {
                InteractionView::Consent
            }
            InteractionReason::NoSession
            | InteractionReason::LoginPrompt
            | InteractionReason::MaxAge
            | InteractionReason::IdTokenHint
            | InteractionReason::Other(_) => InteractionView::Login,
        }
    }
}

impl From<String> for InteractionReason {
    fn from(value: String) -> Self {
        match value.as_str() {
            "no_session" => InteractionReason::NoSession,
            "login_prompt" => InteractionReason::LoginPrompt,
            "max_age" => InteractionReason::MaxAge,
            "id_token_hint" => InteractionReason::IdTokenHint,
            "consent_prompt" => InteractionReason::ConsentPrompt,
            "client_not_authorized" => InteractionReason::ClientNotAuthorized,
            _ => InteractionReason::Other(value),
        }
    }
}

impl From<InteractionReason> for String {
    fn from(value: InteractionReason) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionView {
    Login,
    Consent,
}

impl InteractionView {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionView::Login => "login",
            InteractionView::Consent => "consent",
        }
    }

    pub fn template(&self) -> &'static str {
        match self {
            InteractionView::Login => "login.html",
            InteractionView::Consent => "interaction.html",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionPrompt {
    pub reason: InteractionReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl InteractionPrompt {
    pub fn new(reason: InteractionReason) -> Self {
        Self {
            reason,
            reason_description: None,
            error: None,
            error_description: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionSession {
    pub account: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResult {
    pub account: String,
    pub acr: String,
    pub remember: bool,
    pub ts: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsentResult {}

/// Outcome the interaction UI hands back to the provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login: Option<LoginResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consent: Option<ConsentResult>,
}

impl InteractionResult {
    pub fn consent() -> Self {
        Self {
            login: None,
            consent: Some(ConsentResult::default()),
        }
    }

    pub fn login(login: LoginResult) -> Self {
        Self {
            login: Some(login),
            consent: Some(ConsentResult::default()),
        }
    }
}

/// Everything the interaction views need, persisted as an `Interaction` record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionDetails {
    pub uid: String,
    pub return_to: String,
    pub interaction: InteractionPrompt,
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<InteractionSession>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<InteractionResult>,
    /// Expiry as epoch seconds.
    pub exp: i64,
}

impl InteractionDetails {
    pub fn client_id(&self) -> Option<&str> {
        self.params.get("client_id").and_then(Value::as_str)
    }

    pub fn scope(&self) -> &str {
        self.params
            .get("scope")
            .and_then(Value::as_str)
            .unwrap_or("openid")
    }

    /// Seconds left before the record expires, never less than one.
    pub fn remaining_ttl(&self, now: i64) -> u64 {
        (self.exp - now).max(1) as u64
    }

    pub fn to_payload(&self) -> Result<Payload, serde_json::Error> {
        Payload::try_from(serde_json::to_value(self)?)
    }

    pub fn from_payload(payload: Payload) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(payload.into_inner()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn consent_reasons_select_the_consent_view() {
        assert_eq!(InteractionReason::ConsentPrompt.view(), InteractionView::Consent);
        assert_eq!(
            InteractionReason::ClientNotAuthorized.view(),
            InteractionView::Consent
        );
        assert_eq!(InteractionReason::NoSession.view(), InteractionView::Login);
        assert_eq!(
            InteractionReason::from("something_new".to_string()).view(),
            InteractionView::Login
        );
    }

    #[test]
    fn reason_round_trips_through_its_wire_name() {
        let prompt: InteractionPrompt =
            serde_json::from_value(json!({ "reason": "client_not_authorized" })).unwrap();
        assert_eq!(prompt.reason, InteractionReason::ClientNotAuthorized);

        let unknown: InteractionPrompt =
            serde_json::from_value(json!({ "reason": "acr_value" })).unwrap();
        assert_eq!(unknown.reason.as_str(), "acr_value");
        assert_eq!(serde_json::to_value(&unknown).unwrap()["reason"], "acr_value");
    }

    #[test]
    fn details_use_provider_field_names() {
        let details = InteractionDetails {
            uid: "u1".into(),
            return_to: "http://localoidc/auth/u1".into(),
            interaction: InteractionPrompt::new(InteractionReason::LoginPrompt),
            params: json!({ "client_id": "foo" }).as_object().cloned().unwrap(),
            session: None,
            result: None,
            exp: 100,
        };

        let payload = details.to_payload().unwrap();
        assert_eq!(payload.uid(), Some("u1"));
        assert_eq!(
            payload.get("returnTo").and_then(Value::as_str),
            Some("http://localoidc/auth/u1")
        );
        assert_eq!(InteractionDetails::from_payload(payload).unwrap(), details);
        assert_eq!(details.client_id(), Some("foo"));
        assert_eq!(details.scope(), "openid");
        assert_eq!(details.remaining_ttl(40), 60);
        assert_eq!(details.remaining_ttl(500), 1);
    }

    #[test]
    fn login_result_always_carries_consent() {
        let result = InteractionResult::login(LoginResult {
            account: "a".into(),
            acr: "1".into(),
            remember: true,
            ts: 1,
        });
        let json = serde_json::to_value(result).unwrap();
        assert_eq!(json["consent"], json!({}));
        assert_eq!(json["login"]["acr"], "1");
    }
}
