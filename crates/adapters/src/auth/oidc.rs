// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OIDC bearer-token verification.
//!
//! Keys come from the issuer's discovery document; the JWKS is cached
//! and refetched when a token arrives signed by an unknown key id.
//! Verified claims: signature, `exp`, `iss`, `aud` = the client id.
//! The subject is the token's `sub`.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use parking_lot::RwLock;
use poiesis_core::OidcConfig;
use serde::Deserialize;

use super::{AuthError, Authenticator, Subject};

/// How long a fetched JWKS stays fresh.
const KEY_CACHE_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Deserialize)]
struct DiscoveryDocument {
    jwks_uri: String,
}

#[derive(Debug, Deserialize)]
struct JwksDocument {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    #[serde(default)]
    kid: Option<String>,
    #[serde(default)]
    kty: String,
    #[serde(default)]
    n: Option<String>,
    #[serde(default)]
    e: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
}

struct CachedKeys {
    keys: HashMap<String, DecodingKey>,
    fetched_at: Instant,
}

pub struct OidcAuthenticator {
    config: OidcConfig,
    http: reqwest::Client,
    cache: RwLock<Option<CachedKeys>>,
}

impl OidcAuthenticator {
    pub fn new(config: OidcConfig) -> Self {
        Self { config, http: reqwest::Client::new(), cache: RwLock::new(None) }
    }

    fn cached_key(&self, kid: &str) -> Option<DecodingKey> {
        let cache = self.cache.read();
        let cached = cache.as_ref()?;
        if cached.fetched_at.elapsed() > KEY_CACHE_TTL {
            return None;
        }
        cached.keys.get(kid).cloned()
    }

    async fn refresh_keys(&self) -> Result<(), AuthError> {
        let discovery_url = format!(
            "{}/.well-known/openid-configuration",
            self.config.issuer.trim_end_matches('/')
        );
        let discovery: DiscoveryDocument = self
            .http
            .get(&discovery_url)
            .send()
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| AuthError::Unavailable(e.to_string()))?
            .json()
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        let jwks: JwksDocument = self
            .http
            .get(&discovery.jwks_uri)
            .send()
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?
            .json()
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        let mut keys = HashMap::new();
        for key in jwks.keys {
            let (Some(kid), Some(n), Some(e)) = (key.kid, key.n.as_deref(), key.e.as_deref())
            else {
                continue;
            };
            if key.kty != "RSA" {
                continue;
            }
            match DecodingKey::from_rsa_components(n, e) {
                Ok(decoding_key) => {
                    keys.insert(kid, decoding_key);
                }
                Err(err) => {
                    tracing::warn!(%kid, error = %err, "skipping unusable JWK");
                }
            }
        }
        tracing::debug!(count = keys.len(), "refreshed JWKS");
        *self.cache.write() = Some(CachedKeys { keys, fetched_at: Instant::now() });
        Ok(())
    }

    async fn key_for(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        if let Some(key) = self.cached_key(kid) {
            return Ok(key);
        }
        self.refresh_keys().await?;
        self.cached_key(kid)
            .ok_or_else(|| AuthError::InvalidToken(format!("unknown signing key {kid:?}")))
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.config.client_id.as_str()]);
        validation.set_issuer(&[self.config.issuer.as_str()]);
        validation
    }
}

#[async_trait]
impl Authenticator for OidcAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<Subject, AuthError> {
        let header =
            decode_header(token).map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        let kid = header
            .kid
            .ok_or_else(|| AuthError::InvalidToken("token missing key id".to_string()))?;
        let key = self.key_for(&kid).await?;
        let data = decode::<Claims>(token, &key, &self.validation())
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        Ok(Subject { user_id: data.claims.sub })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authenticator() -> OidcAuthenticator {
        OidcAuthenticator::new(OidcConfig {
            issuer: "https://issuer.example".to_string(),
            client_id: "poiesis".to_string(),
            client_secret: None,
        })
    }

    #[tokio::test]
    async fn garbage_token_is_invalid_not_unavailable() {
        let err = authenticator().authenticate("not-a-jwt").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[test]
    fn validation_pins_issuer_and_audience() {
        let auth = authenticator();
        let validation = auth.validation();
        assert!(validation.validate_exp);
        assert!(validation.iss.as_ref().unwrap().contains("https://issuer.example"));
        assert!(validation.aud.as_ref().unwrap().contains("poiesis"));
    }
}
