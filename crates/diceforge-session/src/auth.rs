//! Authentication: turning a bearer token into a [`UserId`].
//!
//! The identity provider itself is an external collaborator — this crate
//! only verifies tokens it issues. [`Authenticator`] is the extension
//! point; [`JwksAuthenticator`] is the production implementation, backed
//! by the provider's JWKS document with a symmetric shared-secret
//! fallback for environments that haven't rotated onto asymmetric keys
//! yet.
//!
//! # Why a trait?
//!
//! Keeping authentication behind a trait lets tests and local
//! development swap in a fixture authenticator without touching the
//! edge router or any actor code.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use diceforge_protocol::UserId;
use futures_util::future::BoxFuture;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::SessionError;

/// Tolerance applied to `exp`/`nbf` checks to absorb clock drift between
/// this server and the identity provider.
pub const CLOCK_SKEW_TOLERANCE_SECONDS: u64 = 30;

/// How long a fetched JWKS document is trusted before being refetched.
const JWKS_CACHE_TTL: Duration = Duration::from_secs(600);

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
}

/// Validates a bearer token and returns the identity it names.
///
/// Boxed futures rather than an `async fn` so the edge router can hold
/// this behind `Arc<dyn Authenticator>` and pick an implementation at
/// startup instead of baking it into a generic parameter.
pub trait Authenticator: Send + Sync + 'static {
    fn authenticate<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<UserId, SessionError>>;
}

struct CachedJwks {
    jwks: JwkSet,
    fetched_at: Instant,
}

/// Verifies bearer tokens against an identity provider's JWKS endpoint,
/// preferring asymmetric algorithms (RS256/ES256) and falling back to a
/// symmetric shared secret (HS256) only when one has been configured —
/// this lets an environment keep working through a key-rotation window
/// without the edge router treating every token as untrusted.
pub struct JwksAuthenticator {
    http: reqwest::Client,
    jwks_url: String,
    audience: String,
    legacy_shared_secret: Option<String>,
    cache: RwLock<HashMap<String, CachedJwks>>,
}

impl JwksAuthenticator {
    pub fn new(jwks_url: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            jwks_url: jwks_url.into(),
            audience: audience.into(),
            legacy_shared_secret: None,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_legacy_shared_secret(mut self, secret: impl Into<String>) -> Self {
        self.legacy_shared_secret = Some(secret.into());
        self
    }

    async fn fetch_jwks(&self) -> Result<(), SessionError> {
        let response = self
            .http
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| SessionError::Jwks(e.to_string()))?;
        let jwks: JwkSet = response
            .json()
            .await
            .map_err(|e| SessionError::Jwks(e.to_string()))?;
        let mut cache = self.cache.write().await;
        cache.insert(
            self.jwks_url.clone(),
            CachedJwks {
                jwks,
                fetched_at: Instant::now(),
            },
        );
        Ok(())
    }

    async fn decoding_key_for(&self, kid: &str) -> Result<DecodingKey, SessionError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.get(&self.jwks_url) {
                if cached.fetched_at.elapsed() < JWKS_CACHE_TTL {
                    if let Some(jwk) = cached.jwks.find(kid) {
                        return DecodingKey::from_jwk(jwk)
                            .map_err(|e| SessionError::Jwks(e.to_string()));
                    }
                }
            }
        }
        self.fetch_jwks().await?;
        let cache = self.cache.read().await;
        let cached = cache
            .get(&self.jwks_url)
            .ok_or_else(|| SessionError::Jwks("jwks cache empty after fetch".to_string()))?;
        let jwk = cached
            .jwks
            .find(kid)
            .ok_or_else(|| SessionError::Jwks(format!("no key for kid {kid}")))?;
        DecodingKey::from_jwk(jwk).map_err(|e| SessionError::Jwks(e.to_string()))
    }

    fn validation_for(&self, alg: Algorithm) -> Validation {
        let mut validation = Validation::new(alg);
        validation.set_audience(&[&self.audience]);
        validation.leeway = CLOCK_SKEW_TOLERANCE_SECONDS;
        validation
    }
}

impl Authenticator for JwksAuthenticator {
    fn authenticate<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<UserId, SessionError>> {
        Box::pin(async move {
            let header = decode_header(token).map_err(|_| SessionError::InvalidSignature)?;

            let claims: Claims = match header.alg {
                Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
                    let secret = self
                        .legacy_shared_secret
                        .as_ref()
                        .ok_or(SessionError::InvalidSignature)?;
                    let key = DecodingKey::from_secret(secret.as_bytes());
                    decode(token, &key, &self.validation_for(header.alg))
                        .map_err(|_| SessionError::InvalidSignature)?
                        .claims
                }
                _ => {
                    let kid = header.kid.ok_or(SessionError::InvalidSignature)?;
                    let key = self.decoding_key_for(&kid).await?;
                    decode(token, &key, &self.validation_for(header.alg))
                        .map_err(|_| SessionError::InvalidSignature)?
                        .claims
                }
            };

            if claims.sub.is_empty() {
                return Err(SessionError::InvalidClaims("empty subject".to_string()));
            }

            Ok(UserId::from(claims.sub))
        })
    }
}

/// Accepts any non-empty token and uses it verbatim as the user id.
/// Only for local development and tests.
pub struct DevAuthenticator;

impl Authenticator for DevAuthenticator {
    fn authenticate<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<UserId, SessionError>> {
        Box::pin(async move {
            if token.is_empty() {
                return Err(SessionError::MissingToken);
            }
            Ok(UserId::from(token))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dev_authenticator_accepts_nonempty_token() {
        let auth = DevAuthenticator;
        let user = auth.authenticate("u_alice").await.unwrap();
        assert_eq!(user.as_str(), "u_alice");
    }

    #[tokio::test]
    async fn test_dev_authenticator_rejects_empty_token() {
        let auth = DevAuthenticator;
        assert!(matches!(
            auth.authenticate("").await,
            Err(SessionError::MissingToken)
        ));
    }
}
