//! Bearer authentication for the HTTP transport.
//!
//! One strategy is active per server, chosen by the `auth.mode` config key:
//!
//! - `none`: development mode, every request runs as a fixed user
//! - `apiKey`: static keys mapped to user id and role
//! - `jwt`: tokens verified against the issuer's JWKS

mod api_key;
mod jwks;

use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::config::AuthConfig;
use crate::twin::Caller;

pub use api_key::ApiKeyAuth;
pub use jwks::JwtAuth;

const REALM: &str = "twin-mcp";
const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("invalid token: {0}")]
    InvalidToken(String),
    #[error("token expired")]
    Expired,
    #[error("unknown API key")]
    UnknownKey,
    #[error("token has no subject")]
    MissingSubject,
    #[error("invalid role: {0}")]
    InvalidRole(String),
    #[error("identity provider unavailable: {0}")]
    Jwks(String),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Jwks(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    /// RFC 6750 `WWW-Authenticate` challenge for 401 responses.
    fn challenge(&self) -> Option<String> {
        match self {
            AuthError::Jwks(_) => None,
            AuthError::MissingToken => Some(format!("Bearer realm=\"{}\"", REALM)),
            other => Some(format!(
                "Bearer realm=\"{}\", error=\"invalid_token\", error_description=\"{}\"",
                REALM,
                other.to_string().replace('"', "'")
            )),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match status {
            StatusCode::BAD_GATEWAY => "identity_provider_unavailable",
            _ => "unauthorized",
        };
        let body = Json(json!({
            "error": error,
            "error_description": self.to_string(),
        }));

        let mut response = (status, body).into_response();
        if let Some(challenge) = self.challenge()
            && let Ok(value) = HeaderValue::from_str(&challenge)
        {
            response.headers_mut().insert(header::WWW_AUTHENTICATE, value);
        }
        response
    }
}

pub enum Authenticator {
    Disabled(Caller),
    ApiKey(ApiKeyAuth),
    Jwt(Box<JwtAuth>),
}

impl Authenticator {
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        Ok(match config {
            AuthConfig::None { user_id, role } => Authenticator::Disabled(Caller::new(user_id.clone(), *role)),
            AuthConfig::ApiKey { keys } => Authenticator::ApiKey(ApiKeyAuth::new(keys.clone())),
            AuthConfig::Jwt(jwt) => Authenticator::Jwt(Box::new(JwtAuth::new(jwt)?)),
        })
    }

    pub fn mode(&self) -> &'static str {
        match self {
            Authenticator::Disabled(_) => "none",
            Authenticator::ApiKey(_) => "apiKey",
            Authenticator::Jwt(_) => "jwt",
        }
    }

    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<Caller, AuthError> {
        let result = self.resolve(headers).await;
        if let Err(err) = &result {
            tracing::warn!(mode = self.mode(), "authentication failed: {}", err);
        }
        result
    }

    async fn resolve(&self, headers: &HeaderMap) -> Result<Caller, AuthError> {
        match self {
            Authenticator::Disabled(caller) => Ok(caller.clone()),
            Authenticator::ApiKey(keys) => {
                let presented = bearer_token(headers)
                    .or_else(|| header_str(headers, API_KEY_HEADER))
                    .ok_or(AuthError::MissingToken)?;
                keys.lookup(presented).ok_or(AuthError::UnknownKey)
            }
            Authenticator::Jwt(jwt) => {
                let token = bearer_token(headers).ok_or(AuthError::MissingToken)?;
                jwt.verify(token).await
            }
        }
    }
}

/// Token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = header_str(headers, header::AUTHORIZATION.as_str())?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
