//! Signing key repository.
//!
//! Holds the PEM-encoded public half of each token-signing key pair. One
//! row is created per process boot; rows are never mutated, so keys issued
//! by earlier processes stay resolvable even though their private halves
//! are gone.

use super::Result;
use sqlx::{FromRow, PgExecutor};

#[derive(Debug, Clone, FromRow)]
pub struct SigningKeyRow {
    pub id: i64,
    pub public_key: String,
}

pub async fn create_signing_key<'e>(
    executor: impl PgExecutor<'e>,
    public_key_pem: &str,
) -> Result<i64> {
    let (id,): (i64,) =
        sqlx::query_as("INSERT INTO public_keys (public_key) VALUES ($1) RETURNING id")
            .bind(public_key_pem)
            .fetch_one(executor)
            .await?;
    Ok(id)
}

pub async fn get_signing_key<'e>(
    executor: impl PgExecutor<'e>,
    id: i64,
) -> Result<Option<SigningKeyRow>> {
    let row = sqlx::query_as::<_, SigningKeyRow>(
        "SELECT id, public_key FROM public_keys WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;
    Ok(row)
}
