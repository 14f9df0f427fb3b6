//! Account repository.

use super::{map_insert_error, Result};
use serde::Serialize;
use sqlx::{FromRow, PgExecutor};

/// Identity principal.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AccountRow {
    pub id: i64,
    pub account_name: String,
}

pub async fn create_account<'e>(
    executor: impl PgExecutor<'e>,
    account_name: &str,
) -> Result<i64> {
    let (id,): (i64,) =
        sqlx::query_as("INSERT INTO accounts (account_name) VALUES ($1) RETURNING id")
            .bind(account_name)
            .fetch_one(executor)
            .await
            .map_err(|e| map_insert_error(e, account_name))?;
    Ok(id)
}

pub async fn get_account_by_id<'e>(
    executor: impl PgExecutor<'e>,
    id: i64,
) -> Result<Option<AccountRow>> {
    let row = sqlx::query_as::<_, AccountRow>(
        "SELECT id, account_name FROM accounts WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;
    Ok(row)
}

pub async fn get_account_by_name<'e>(
    executor: impl PgExecutor<'e>,
    account_name: &str,
) -> Result<Option<AccountRow>> {
    let row = sqlx::query_as::<_, AccountRow>(
        "SELECT id, account_name FROM accounts WHERE account_name = $1",
    )
    .bind(account_name)
    .fetch_optional(executor)
    .await?;
    Ok(row)
}
