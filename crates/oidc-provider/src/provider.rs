use rand::{distr::Alphanumeric, Rng};
use serde_json::{Map, Value};
use std::sync::Arc;

use oidc_config::{ClientMetadata, ProviderSettings, SecureKeys};
use oidc_core::{
    epoch_seconds, Account, InteractionDetails, InteractionPrompt, InteractionReason,
    InteractionResult, InteractionSession, Model, OidcError,
};
use oidc_keystore::{JwkSet, Keystore};
use oidc_ports::{DynAccountService, DynAdapter};

const UID_LENGTH: usize = 21;

/// Provider configuration and the interaction calls the UI needs.
pub struct Provider {
    issuer: String,
    keystore: Arc<Keystore>,
    settings: ProviderSettings,
    cookie_keys: SecureKeys,
    adapter: DynAdapter,
    accounts: DynAccountService,
}

fn generate_uid() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(UID_LENGTH)
        .map(char::from)
        .collect()
}

impl Provider {
    pub fn new(
        issuer: impl Into<String>,
        keystore: Arc<Keystore>,
        settings: ProviderSettings,
        cookie_keys: SecureKeys,
        adapter: DynAdapter,
        accounts: DynAccountService,
    ) -> Self {
        Self {
            issuer: issuer.into().trim_end_matches('/').to_string(),
            keystore,
            settings,
            cookie_keys,
            adapter,
            accounts,
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    pub fn cookie_keys(&self) -> &SecureKeys {
        &self.cookie_keys
    }

    pub fn adapter(&self) -> &DynAdapter {
        &self.adapter
    }

    pub fn accounts(&self) -> &DynAccountService {
        &self.accounts
    }

    pub fn client(&self, client_id: &str) -> Option<&ClientMetadata> {
        self.settings.client(client_id)
    }

    /// Open an interaction for an authorization request that needs the user.
    ///
    /// The browser is sent to `/interaction/{uid}`; when the interaction finishes it
    /// continues at `{issuer}/auth/{uid}`.
    pub async fn start_interaction(
        &self,
        params: Map<String, Value>,
        reason: InteractionReason,
        session: Option<InteractionSession>,
    ) -> Result<InteractionDetails, OidcError> {
        let client_id = params
            .get("client_id")
            .and_then(Value::as_str)
            .ok_or_else(|| OidcError::invalid_request("missing required parameter 'client_id'"))?;
        if self.client(client_id).is_none() {
            return Err(OidcError::invalid_client("client is invalid"));
        }

        let uid = generate_uid();
        let ttl = self.settings.interaction_ttl;
        let details = InteractionDetails {
            return_to: format!("{}/auth/{}", self.issuer, uid),
            uid,
            interaction: InteractionPrompt::new(reason),
            params,
            session,
            result: None,
            exp: epoch_seconds() + ttl as i64,
        };

        self.adapter
            .upsert(
                Model::Interaction,
                &details.uid,
                &details.to_payload()?,
                Some(ttl),
            )
            .await?;

        tracing::debug!(
            uid = %details.uid,
            reason = %details.interaction.reason.as_str(),
            "interaction started"
        );
        Ok(details)
    }

    pub async fn interaction_details(&self, uid: &str) -> Result<InteractionDetails, OidcError> {
        let payload = self
            .adapter
            .find(Model::Interaction, uid)
            .await?
            .ok_or_else(|| OidcError::session_not_found("interaction session not found"))?;

        let details = InteractionDetails::from_payload(payload)?;
        if details.exp <= epoch_seconds() {
            return Err(OidcError::session_not_found("interaction session expired"));
        }
        Ok(details)
    }

    /// Record the interaction outcome and return where the browser goes next.
    pub async fn interaction_finished(
        &self,
        uid: &str,
        result: InteractionResult,
    ) -> Result<String, OidcError> {
        let mut details = self.interaction_details(uid).await?;

        if let Some(login) = &result.login {
            details.session = Some(InteractionSession {
                account: login.account.clone(),
            });
        }
        details.result = Some(result);

        let ttl = details.remaining_ttl(epoch_seconds());
        self.adapter
            .upsert(Model::Interaction, uid, &details.to_payload()?, Some(ttl))
            .await?;

        Ok(details.return_to)
    }

    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Account, OidcError> {
        self.accounts.authenticate(email, password).await
    }

    pub async fn find_account(&self, account_id: &str) -> Result<Option<Account>, OidcError> {
        self.accounts.find_by_id(account_id).await
    }

    /// Claims of `account` released for `scope`.
    pub fn claims_for(&self, account: &Account, scope: &str) -> Map<String, Value> {
        let released = self.settings.claims_for_scope(scope);
        account
            .claims()
            .into_iter()
            .filter(|(name, _)| released.contains(&name.as_str()))
            .collect()
    }

    pub fn jwks(&self) -> JwkSet {
        self.keystore.public_jwks()
    }
}
