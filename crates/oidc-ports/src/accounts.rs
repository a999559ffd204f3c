use async_trait::async_trait;
use std::sync::Arc;

use oidc_core::{Account, OidcError};

/// Account directory used by the login interaction and by claim lookups.
#[async_trait]
pub trait AccountService: Send + Sync {
    /// Check credentials and return the matching account.
    async fn authenticate(&self, email: &str, password: &str) -> Result<Account, OidcError>;

    async fn find_by_id(&self, account_id: &str) -> Result<Option<Account>, OidcError>;
}

pub type DynAccountService = Arc<dyn AccountService>;
