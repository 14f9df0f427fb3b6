//! Account registration and sessions.

use super::{CoreError, Result};
use crate::password::PasswordHasher;
use crate::store::{self, AccountRow, Store};
use crate::token::TokenAuthority;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::info;

/// An authenticated session handed back to the client.
#[derive(Debug, Clone)]
pub struct Session {
    pub account: AccountRow,
    pub token: String,
    pub expires_at: OffsetDateTime,
}

pub struct AccountService {
    store: Store,
    hasher: PasswordHasher,
    tokens: Arc<TokenAuthority>,
}

impl AccountService {
    pub fn new(store: Store, hasher: PasswordHasher, tokens: Arc<TokenAuthority>) -> Self {
        Self {
            store,
            hasher,
            tokens,
        }
    }

    /// Register an account with its credential in one unit of work.
    pub async fn create_account(&self, account_name: &str, password: &str) -> Result<AccountRow> {
        if account_name.trim().is_empty() {
            return Err(CoreError::InvalidArgument(
                "account_name must not be empty".to_string(),
            ));
        }
        if password.is_empty() {
            return Err(CoreError::InvalidArgument(
                "password must not be empty".to_string(),
            ));
        }

        if store::get_account_by_name(self.store.pool(), account_name)
            .await
            .map_err(CoreError::from)?
            .is_some()
        {
            return Err(CoreError::AlreadyExists(
                "account name is already taken".to_string(),
            ));
        }

        let hash = self.hasher.hash(password).await?;

        let mut tx = self.store.begin().await?;
        // A concurrent registration with the same name loses here on the
        // unique constraint.
        let id = store::create_account(&mut *tx, account_name).await?;
        store::create_credential(&mut *tx, id, &hash).await?;
        tx.commit().await?;

        info!(id, account_name, "Account created");

        Ok(AccountRow {
            id,
            account_name: account_name.to_string(),
        })
    }

    /// Authenticate by name and password, issuing a session token.
    pub async fn create_session(&self, account_name: &str, password: &str) -> Result<Session> {
        let account = store::get_account_by_name(self.store.pool(), account_name)
            .await
            .map_err(CoreError::from)?
            .ok_or_else(|| CoreError::NotFound("account not found".to_string()))?;

        let credential = store::get_credential(self.store.pool(), account.id)
            .await
            .map_err(CoreError::from)?
            .ok_or_else(|| {
                CoreError::Internal(format!("account {} has no credential", account.id))
            })?;

        let matches = self.hasher.verify(password, &credential.hash).await?;
        if !matches {
            return Err(CoreError::Unauthenticated("incorrect password".to_string()));
        }

        let (token, expires_at) = self.tokens.issue(account.id)?;

        info!(account_id = account.id, "Session created");

        Ok(Session {
            account,
            token,
            expires_at,
        })
    }
}
