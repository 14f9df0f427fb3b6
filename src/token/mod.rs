//! Token authority
//!
//! Issues and verifies RS512 session tokens. Each process boot generates a
//! fresh RSA key pair in memory, persists the PEM-encoded public half as a
//! signing-key row, and embeds that row's id as the `kid` claim. The
//! private half never leaves the process, so a restart rotates the key and
//! invalidates every previously issued token while historical `kid`s stay
//! resolvable for inspection.

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::RsaPrivateKey;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use time::OffsetDateTime;

use crate::cache::Cache;
use crate::config::TokenConfig;
use crate::store::{self, Store};

const RSA_BITS: usize = 2048;
const RSA_FAMILY: [Algorithm; 3] = [Algorithm::RS256, Algorithm::RS384, Algorithm::RS512];

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("unexpected signing method")]
    UnexpectedSigningMethod,

    #[error("failed to read token claims")]
    MalformedClaims,

    #[error("token public key not found")]
    PublicKeyNotFound,

    #[error("invalid token")]
    InvalidToken,

    #[error("failed to sign token")]
    SignFailed,

    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    #[error("key directory error: {0}")]
    Directory(String),
}

pub type Result<T> = std::result::Result<T, TokenError>;

/// Resolves a `kid` to the PEM public key that verifies its tokens.
#[async_trait]
pub trait KeyDirectory: Send + Sync {
    async fn public_key_pem(&self, kid: i64) -> Result<Option<String>>;
}

#[async_trait]
impl KeyDirectory for Store {
    async fn public_key_pem(&self, kid: i64) -> Result<Option<String>> {
        let row = store::get_signing_key(self.pool(), kid)
            .await
            .map_err(|e| TokenError::Directory(e.to_string()))?;
        Ok(row.map(|r| r.public_key))
    }
}

/// Cache-fronted key directory. Public keys are immutable once written,
/// so cached entries never need invalidation.
pub struct CachingKeyDirectory {
    inner: Arc<dyn KeyDirectory>,
    cache: Arc<dyn Cache>,
}

impl CachingKeyDirectory {
    pub fn new(inner: Arc<dyn KeyDirectory>, cache: Arc<dyn Cache>) -> Self {
        Self { inner, cache }
    }

    fn cache_key(kid: i64) -> String {
        format!("public_key:{}", kid)
    }
}

#[async_trait]
impl KeyDirectory for CachingKeyDirectory {
    async fn public_key_pem(&self, kid: i64) -> Result<Option<String>> {
        let cache_key = Self::cache_key(kid);
        if let Some(pem) = self.cache.get(&cache_key).await {
            return Ok(Some(pem));
        }

        let pem = self.inner.public_key_pem(kid).await?;
        if let Some(ref pem) = pem {
            self.cache.set(&cache_key, pem.clone()).await;
        }
        Ok(pem)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: i64,
    exp: i64,
    kid: i64,
}

pub struct TokenAuthority {
    kid: i64,
    encoding_key: EncodingKey,
    expires_in: time::Duration,
    directory: Arc<dyn KeyDirectory>,
}

impl TokenAuthority {
    /// Generate this process's key pair, persist its public half, and
    /// return an authority signing under the new `kid`.
    pub async fn bootstrap(
        store: &Store,
        directory: Arc<dyn KeyDirectory>,
        cfg: &TokenConfig,
    ) -> Result<Self> {
        let (private_pem, public_pem) = tokio::task::spawn_blocking(generate_rsa_key_pair)
            .await
            .map_err(|e| TokenError::KeyGeneration(e.to_string()))??;

        let kid = store::create_signing_key(store.pool(), &public_pem)
            .await
            .map_err(|e| TokenError::Directory(e.to_string()))?;

        tracing::info!(kid, "Token signing key registered");

        Self::from_private_key_pem(kid, &private_pem, cfg, directory)
    }

    /// Assemble an authority from existing key material registered under
    /// `kid`.
    pub fn from_private_key_pem(
        kid: i64,
        private_pem: &str,
        cfg: &TokenConfig,
        directory: Arc<dyn KeyDirectory>,
    ) -> Result<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(private_pem.as_bytes())
            .map_err(|e| TokenError::KeyGeneration(e.to_string()))?;
        let expires_in = time::Duration::try_from(cfg.expires_in.as_std())
            .map_err(|e| TokenError::KeyGeneration(e.to_string()))?;

        Ok(Self {
            kid,
            encoding_key,
            expires_in,
            directory,
        })
    }

    /// Issue a token for an account, returning it with its expiry time.
    pub fn issue(&self, account_id: i64) -> Result<(String, OffsetDateTime)> {
        let expire_time = OffsetDateTime::now_utc() + self.expires_in;
        let claims = Claims {
            sub: account_id,
            exp: expire_time.unix_timestamp(),
            kid: self.kid,
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::RS512), &claims, &self.encoding_key)
            .map_err(|_| TokenError::SignFailed)?;

        Ok((token, expire_time))
    }

    /// Verify a token and return the account id and expiry it carries.
    pub async fn verify(&self, token: &str) -> Result<(i64, OffsetDateTime)> {
        let header = jsonwebtoken::decode_header(token).map_err(|_| TokenError::InvalidToken)?;
        if !RSA_FAMILY.contains(&header.alg) {
            return Err(TokenError::UnexpectedSigningMethod);
        }

        // The verifying key is selected by the kid claim, so the claims
        // are peeked before signature validation.
        let peeked = peek_claims(token)?;

        let pem = self
            .directory
            .public_key_pem(peeked.kid)
            .await?
            .ok_or(TokenError::PublicKeyNotFound)?;
        let decoding_key =
            DecodingKey::from_rsa_pem(pem.as_bytes()).map_err(|_| TokenError::InvalidToken)?;

        let mut validation = Validation::new(Algorithm::RS512);
        validation.algorithms = RSA_FAMILY.to_vec();
        let data = jsonwebtoken::decode::<Claims>(token, &decoding_key, &validation)
            .map_err(|_| TokenError::InvalidToken)?;

        let expire_time = OffsetDateTime::from_unix_timestamp(data.claims.exp)
            .map_err(|_| TokenError::MalformedClaims)?;
        Ok((data.claims.sub, expire_time))
    }
}

fn peek_claims(token: &str) -> Result<Claims> {
    let mut validation = Validation::new(Algorithm::RS512);
    validation.algorithms = RSA_FAMILY.to_vec();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    let data = jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map_err(|_| TokenError::MalformedClaims)?;
    Ok(data.claims)
}

/// Generate an RSA key pair, returning (private PEM, public PEM).
pub fn generate_rsa_key_pair() -> Result<(String, String)> {
    let mut rng = rand::thread_rng();
    let private_key = RsaPrivateKey::new(&mut rng, RSA_BITS)
        .map_err(|e| TokenError::KeyGeneration(e.to_string()))?;

    let private_pem = private_key
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| TokenError::KeyGeneration(e.to_string()))?
        .to_string();
    let public_pem = private_key
        .to_public_key()
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| TokenError::KeyGeneration(e.to_string()))?;

    Ok((private_pem, public_pem))
}
