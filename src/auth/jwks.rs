//! Bearer JWT verification against an identity provider's JWKS.
//!
//! Keys are fetched from `<issuer>/.well-known/jwks.json` (or an explicit
//! URL) and cached for an hour. A token whose `kid` is not in the cached set
//! triggers one early refresh, rate limited so random `kid`s cannot force a
//! fetch per request.

use std::time::{Duration, Instant};

use jsonwebtoken::{
    DecodingKey, Validation, decode, decode_header,
    errors::ErrorKind,
    jwk::{Jwk, JwkSet},
};
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use super::AuthError;
use crate::config::JwtConfig;
use crate::twin::{
    Caller,
    access::{Role, UnknownRole},
};

const JWKS_TTL: Duration = Duration::from_secs(3600);
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(60);
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

struct CachedKeys {
    set: JwkSet,
    /// `None` for keys supplied up front, which never expire.
    fetched_at: Option<Instant>,
}

impl CachedKeys {
    fn usable(&self, force_refresh: bool) -> bool {
        self.usable_at(force_refresh, Instant::now())
    }

    /// A forced refresh is skipped while the last fetch is under a minute old.
    fn usable_at(&self, force_refresh: bool, now: Instant) -> bool {
        let Some(at) = self.fetched_at else {
            return true;
        };
        let age = now.saturating_duration_since(at);
        if force_refresh {
            age < MIN_REFRESH_INTERVAL
        } else {
            age < JWKS_TTL
        }
    }
}

#[derive(Debug, Deserialize)]
struct Claims {
    #[serde(default)]
    sub: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

pub struct JwtAuth {
    issuer: String,
    audience: Option<String>,
    jwks_url: String,
    role_claim: String,
    default_role: Role,
    http: reqwest::Client,
    cache: RwLock<Option<CachedKeys>>,
}

impl JwtAuth {
    pub fn new(config: &JwtConfig) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| AuthError::Jwks(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            jwks_url: config.jwks_url(),
            role_claim: config.role_claim.clone(),
            default_role: config.default_role,
            http,
            cache: RwLock::new(None),
        })
    }

    /// Verifier with a fixed key set that is never refetched.
    pub fn with_keys(config: &JwtConfig, keys: JwkSet) -> Result<Self, AuthError> {
        let auth = Self::new(config)?;
        Ok(Self {
            cache: RwLock::new(Some(CachedKeys {
                set: keys,
                fetched_at: None,
            })),
            ..auth
        })
    }

    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    pub async fn verify(&self, token: &str) -> Result<Caller, AuthError> {
        let header = decode_header(token)
            .map_err(|e| AuthError::InvalidToken(format!("malformed token header: {}", e)))?;
        let key = self.decoding_key(header.kid.as_deref()).await?;

        let mut validation = Validation::new(header.alg);
        validation.set_issuer(&self.accepted_issuers());
        match &self.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        let data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::Expired,
            _ => AuthError::InvalidToken(e.to_string()),
        })?;

        let claims = data.claims;
        let user_id = claims
            .sub
            .filter(|sub| !sub.trim().is_empty())
            .ok_or(AuthError::MissingSubject)?;
        let role = self.role_from(&claims.extra)?;

        Ok(Caller::new(user_id, role))
    }

    /// Providers differ on the trailing slash in `iss`; accept both spellings.
    fn accepted_issuers(&self) -> [String; 2] {
        let bare = self.issuer.trim_end_matches('/').to_string();
        let slashed = format!("{}/", bare);
        [bare, slashed]
    }

    fn role_from(&self, claims: &Map<String, Value>) -> Result<Role, AuthError> {
        match claims.get(&self.role_claim) {
            None | Some(Value::Null) => Ok(self.default_role),
            Some(Value::String(role)) => role
                .parse()
                .map_err(|e: UnknownRole| AuthError::InvalidRole(e.to_string())),
            Some(Value::Array(roles)) => roles
                .iter()
                .filter_map(Value::as_str)
                .find_map(|role| role.parse().ok())
                .ok_or_else(|| {
                    AuthError::InvalidRole(format!("no known role in claim '{}'", self.role_claim))
                }),
            Some(other) => Err(AuthError::InvalidRole(format!(
                "claim '{}' must be a string, got {}",
                self.role_claim, other
            ))),
        }
    }

    async fn decoding_key(&self, kid: Option<&str>) -> Result<DecodingKey, AuthError> {
        let set = self.key_set(false).await?;
        let jwk = match select(&set, kid) {
            Some(jwk) => jwk.clone(),
            None => {
                let set = self.key_set(true).await?;
                select(&set, kid).cloned().ok_or_else(|| {
                    AuthError::InvalidToken(format!("no signing key matches kid {:?}", kid))
                })?
            }
        };

        DecodingKey::from_jwk(&jwk)
            .map_err(|e| AuthError::InvalidToken(format!("unusable signing key: {}", e)))
    }

    async fn key_set(&self, force_refresh: bool) -> Result<JwkSet, AuthError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref()
                && cached.usable(force_refresh)
            {
                return Ok(cached.set.clone());
            }
        }

        let set = self.fetch().await?;
        *self.cache.write().await = Some(CachedKeys {
            set: set.clone(),
            fetched_at: Some(Instant::now()),
        });
        Ok(set)
    }

    async fn fetch(&self) -> Result<JwkSet, AuthError> {
        tracing::debug!(url = %self.jwks_url, "fetching JWKS");

        let response = self
            .http
            .get(&self.jwks_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AuthError::Jwks(e.to_string()))?;

        let set: JwkSet = response
            .json()
            .await
            .map_err(|e| AuthError::Jwks(format!("invalid JWKS document: {}", e)))?;

        tracing::info!(url = %self.jwks_url, keys = set.keys.len(), "JWKS refreshed");
        Ok(set)
    }
}

fn select<'a>(set: &'a JwkSet, kid: Option<&str>) -> Option<&'a Jwk> {
    match kid {
        Some(kid) => set.find(kid),
        None => set.keys.first(),
    }
}
