use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use oidc_core::{Account, OidcError};
use oidc_ports::AccountService;

/// Demo directory: any non-empty email/password pair signs in.
///
/// Each lower-cased email gets one account id for the life of the process.
#[derive(Default)]
pub struct DemoAccounts {
    accounts: RwLock<HashMap<String, Account>>,
}

impl DemoAccounts {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountService for DemoAccounts {
    async fn authenticate(&self, email: &str, password: &str) -> Result<Account, OidcError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            return Err(OidcError::access_denied("email must not be empty"));
        }
        if password.is_empty() {
            return Err(OidcError::access_denied("password must not be empty"));
        }

        if let Some(account) = self
            .accounts
            .read()
            .await
            .values()
            .find(|a| a.email == email)
        {
            return Ok(account.clone());
        }

        let mut accounts = self.accounts.write().await;
        // Another login for the same email may have won the race for the write lock.
        if let Some(account) = accounts.values().find(|a| a.email == email) {
            return Ok(account.clone());
        }
        let account = Account::new(uuid::Uuid::new_v4().to_string(), email);
        tracing::info!(account_id = %account.account_id, "demo account created");
        accounts.insert(account.account_id.clone(), account.clone());
        Ok(account)
    }

    async fn find_by_id(&self, account_id: &str) -> Result<Option<Account>, OidcError> {
        Ok(self.accounts.read().await.get(account_id).cloned())
    }
}
