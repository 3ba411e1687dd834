//! Issuer key discovery and bearer token verification.
//!
//! # Responsibilities
//! - Read the issuer (`iss`) from an unverified token payload
//! - Discover the issuer's key set via
//!   `<iss>/.well-known/openid-configuration` → `jwks_uri`
//! - Cache key sets per issuer with a TTL; refetch on expiry or unknown `kid`
//! - Evict expired issuers whenever a key set has to be fetched
//! - Verify signature, `exp`/`nbf` and issuer with `jsonwebtoken`
//!
//! # Design Decisions
//! - The cache is owned by the authorizer, not global
//! - Audience is never checked; declared claims cover that need
//! - A fetch failure is a verification failure, never a panic

use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use dashmap::DashMap;
use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet};
use jsonwebtoken::{decode, decode_header, DecodingKey, Validation};
use serde::Deserialize;
use url::Url;

use crate::auth::{AuthError, Claims};

/// How long a fetched key set is trusted.
pub const DEFAULT_KEY_TTL: Duration = Duration::from_secs(15 * 60);

const DISCOVERY_PATH: &str = ".well-known/openid-configuration";

#[derive(Debug, Clone)]
struct CachedKeys {
    set: Arc<JwkSet>,
    fetched_at: Instant,
}

#[derive(Debug, Deserialize)]
struct Discovery {
    jwks_uri: String,
}

/// Concurrent issuer → key set cache.
#[derive(Clone)]
pub struct JwksCache {
    keys: Arc<DashMap<String, CachedKeys>>,
    client: reqwest::Client,
    ttl: Duration,
}

impl JwksCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            keys: Arc::new(DashMap::new()),
            client: reqwest::Client::new(),
            ttl,
        }
    }

    /// Seed the cache with a known key set for `issuer`.
    pub fn insert(&self, issuer: impl Into<String>, set: JwkSet) {
        self.keys.insert(
            issuer.into(),
            CachedKeys {
                set: Arc::new(set),
                fetched_at: Instant::now(),
            },
        );
    }

    /// Verify `token` and return its claims.
    pub async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let header = decode_header(token)?;
        let issuer = unverified_issuer(token)?;
        let set = self.key_set(&issuer, header.kid.as_deref()).await?;

        let jwk = match header.kid.as_deref() {
            Some(kid) => set.find(kid),
            None => set.keys.first(),
        }
        .ok_or_else(|| AuthError::UnknownKey {
            issuer: issuer.clone(),
            kid: header.kid.clone(),
        })?;
        let key = decoding_key(jwk).ok_or_else(|| AuthError::UnknownKey {
            issuer: issuer.clone(),
            kid: header.kid.clone(),
        })?;

        let mut validation = Validation::new(header.alg);
        validation.set_issuer(&[issuer.as_str()]);
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = decode::<Claims>(token, &key, &validation)?;
        Ok(data.claims)
    }

    /// Cached key set for `issuer`, refetched when stale or missing `kid`.
    async fn key_set(&self, issuer: &str, kid: Option<&str>) -> Result<Arc<JwkSet>, AuthError> {
        let cached = self.keys.get(issuer).map(|entry| entry.value().clone());
        if let Some(cached) = cached {
            let fresh = cached.fetched_at.elapsed() < self.ttl;
            let knows_kid = kid.map_or(true, |kid| cached.set.find(kid).is_some());
            if fresh && knows_kid {
                return Ok(cached.set);
            }
        }

        self.evict_expired();
        let set = Arc::new(self.fetch(issuer).await?);
        tracing::debug!(issuer = %issuer, keys = set.keys.len(), "Fetched issuer key set");
        self.keys.insert(
            issuer.to_string(),
            CachedKeys {
                set: set.clone(),
                fetched_at: Instant::now(),
            },
        );
        Ok(set)
    }

    /// Drop every issuer whose key set has outlived the TTL.
    fn evict_expired(&self) {
        let before = self.keys.len();
        self.keys.retain(|_, cached| cached.fetched_at.elapsed() < self.ttl);
        let evicted = before.saturating_sub(self.keys.len());
        if evicted > 0 {
            tracing::debug!(evicted, remaining = self.keys.len(), "Evicted expired issuer key sets");
        }
    }

    async fn fetch(&self, issuer: &str) -> Result<JwkSet, AuthError> {
        let discovery_error = |reason: String| AuthError::Discovery {
            issuer: issuer.to_string(),
            reason,
        };

        let base = Url::parse(&format!("{}/", issuer.trim_end_matches('/')))
            .map_err(|e| discovery_error(e.to_string()))?;
        let discovery_url = base
            .join(DISCOVERY_PATH)
            .map_err(|e| discovery_error(e.to_string()))?;

        let discovery: Discovery = self
            .client
            .get(discovery_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| discovery_error(e.to_string()))?
            .json()
            .await
            .map_err(|e| discovery_error(e.to_string()))?;

        self.client
            .get(&discovery.jwks_uri)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| discovery_error(e.to_string()))?
            .json()
            .await
            .map_err(|e| discovery_error(e.to_string()))
    }
}

impl Default for JwksCache {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_TTL)
    }
}

/// The `iss` claim of a token, read without checking the signature.
fn unverified_issuer(token: &str) -> Result<String, AuthError> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| AuthError::MalformedToken("missing payload".into()))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| AuthError::MalformedToken(e.to_string()))?;
    let claims: Claims =
        serde_json::from_slice(&bytes).map_err(|e| AuthError::MalformedToken(e.to_string()))?;
    claims
        .get("iss")
        .and_then(|iss| iss.as_str())
        .map(str::to_string)
        .ok_or(AuthError::MissingIssuer)
}

fn decoding_key(jwk: &Jwk) -> Option<DecodingKey> {
    match &jwk.algorithm {
        // Symmetric keys are base64url per RFC 7518.
        AlgorithmParameters::OctetKey(oct) => URL_SAFE_NO_PAD
            .decode(oct.value.trim_end_matches('='))
            .ok()
            .map(|secret| DecodingKey::from_secret(&secret)),
        _ => DecodingKey::from_jwk(jwk).ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
    use serde_json::json;

    const SECRET: &[u8] = b"a-test-secret-that-is-long-enough";
    const ISSUER: &str = "https://issuer.test";

    fn key_set(kid: &str, secret: &[u8]) -> JwkSet {
        serde_json::from_value(json!({
            "keys": [{"kty": "oct", "kid": kid, "alg": "HS256", "k": URL_SAFE_NO_PAD.encode(secret)}]
        }))
        .unwrap()
    }

    fn token(kid: &str, claims: serde_json::Value) -> String {
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(kid.to_string());
        encode(&header, &claims, &EncodingKey::from_secret(SECRET)).unwrap()
    }

    #[tokio::test]
    async fn test_verifies_against_cached_key_set() {
        let cache = JwksCache::default();
        cache.insert(ISSUER, key_set("k1", SECRET));

        let claims = cache
            .verify(&token("k1", json!({"iss": ISSUER, "role": "admin"})))
            .await
            .unwrap();
        assert_eq!(claims["role"], "admin");
    }

    #[tokio::test]
    async fn test_wrong_signature_is_rejected() {
        let cache = JwksCache::default();
        cache.insert(ISSUER, key_set("k1", b"some-other-secret-entirely-here"));

        let result = cache.verify(&token("k1", json!({"iss": ISSUER}))).await;
        assert!(matches!(result, Err(AuthError::Token(_))));
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        let cache = JwksCache::default();
        cache.insert(ISSUER, key_set("k1", SECRET));

        let result = cache
            .verify(&token("k1", json!({"iss": ISSUER, "exp": 1_000})))
            .await;
        assert!(matches!(result, Err(AuthError::Token(_))));
    }

    #[tokio::test]
    async fn test_expired_issuers_are_evicted_on_fetch() {
        let cache = JwksCache::new(Duration::from_millis(500));
        cache.insert("https://stale.test", key_set("k1", SECRET));
        tokio::time::sleep(Duration::from_millis(600)).await;
        cache.insert(ISSUER, key_set("k1", SECRET));

        // Nothing listens on port 1, so the fetch fails after eviction ran.
        let result = cache
            .verify(&token("k1", json!({"iss": "http://127.0.0.1:1"})))
            .await;
        assert!(matches!(result, Err(AuthError::Discovery { .. })));
        assert!(!cache.keys.contains_key("https://stale.test"));
        assert!(cache.keys.contains_key(ISSUER));
        assert_eq!(cache.keys.len(), 1);
    }

    #[test]
    fn test_unverified_issuer() {
        let t = token("k1", json!({"iss": ISSUER}));
        assert_eq!(unverified_issuer(&t).unwrap(), ISSUER);

        let t = token("k1", json!({"sub": "joe"}));
        assert!(matches!(unverified_issuer(&t), Err(AuthError::MissingIssuer)));
        assert!(matches!(unverified_issuer("garbage"), Err(AuthError::MalformedToken(_))));
    }
}
