//! Account credential repository (1:1 with accounts).

use super::{map_insert_error, Result};
use sqlx::{FromRow, PgExecutor};

#[derive(Debug, Clone, FromRow)]
pub struct CredentialRow {
    pub of_account_id: i64,
    pub hash: String,
}

pub async fn create_credential<'e>(
    executor: impl PgExecutor<'e>,
    of_account_id: i64,
    hash: &str,
) -> Result<()> {
    sqlx::query("INSERT INTO account_passwords (of_account_id, hash) VALUES ($1, $2)")
        .bind(of_account_id)
        .bind(hash)
        .execute(executor)
        .await
        .map_err(|e| map_insert_error(e, "account credential"))?;
    Ok(())
}

pub async fn get_credential<'e>(
    executor: impl PgExecutor<'e>,
    of_account_id: i64,
) -> Result<Option<CredentialRow>> {
    let row = sqlx::query_as::<_, CredentialRow>(
        "SELECT of_account_id, hash FROM account_passwords WHERE of_account_id = $1",
    )
    .bind(of_account_id)
    .fetch_optional(executor)
    .await?;
    Ok(row)
}
