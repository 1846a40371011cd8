use std::time::Duration;
use axum::http;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation};
use moka::sync::Cache;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::SyncError;
use crate::models::UserIdentity;

/// Claims carried by a bearer credential
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub exp: usize,
}

// Get the auth token from a request: `token` query parameter, then the
// Authorization header, then the `auth_token` cookie
pub fn get_auth_token<B>(req: &http::Request<B>) -> Result<String, String> {
    get_auth_token_from(req.uri(), req.headers())
}

pub fn get_auth_token_from(uri: &http::Uri, headers: &http::HeaderMap) -> Result<String, String> {
    // 1. Browser WebSocket clients can only pass it in the query string
    if let Some(query) = uri.query() {
        if let Some((_, token)) = url::form_urlencoded::parse(query.as_bytes()).find(|(k, _)| k == "token") {
            if !token.is_empty() {
                return Ok(token.into_owned());
            }
        }
    }

    // 2. Authorization header
    if let Some(auth_header) = headers.get(http::header::AUTHORIZATION) {
        let auth_str = auth_header.to_str().map_err(|_| "Invalid Authorization header".to_string())?;
        return Ok(auth_str
            .strip_prefix("Bearer ")
            .unwrap_or(auth_str)
            .to_string());
    }

    // 3. Cookie
    let cookie_header = headers.get(http::header::COOKIE)
        .ok_or_else(|| "Missing token, Authorization header or Cookie".to_string())?
        .to_str()
        .map_err(|_| "Invalid Cookie header".to_string())?;

    for cookie in cookie::Cookie::split_parse(cookie_header).flatten() {
        if cookie.name() == "auth_token" {
            return Ok(cookie.value().to_string());
        }
    }
    Err("auth_token cookie not found".to_string())
}

// Validate a JWT token and return the token data
pub fn validate_jwt(token: &str, secret: &str) -> Result<TokenData<Claims>, jsonwebtoken::errors::Error> {
    let validation = Validation::new(Algorithm::HS256);
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    decode::<Claims>(token, &decoding_key, &validation)
}

/// Sign a credential for `sub`, valid for `ttl`.
pub fn issue_token(secret: &str, sub: &str, name: Option<&str>, ttl: Duration) -> Result<String, jsonwebtoken::errors::Error> {
    let exp = Utc::now().timestamp() as usize + ttl.as_secs() as usize;
    let claims = Claims {
        sub: sub.to_string(),
        name: name.map(str::to_string),
        email: None,
        exp,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
}

/// Resolves bearer credentials to identities, caching validated tokens.
#[derive(Clone)]
pub struct IdentityResolver {
    secret: Option<String>,
    cache: Cache<String, (UserIdentity, usize)>,
}

impl IdentityResolver {
    pub fn new(secret: Option<String>, time_to_idle: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(100_000)
            .time_to_idle(time_to_idle)
            .build();
        Self { secret, cache }
    }

    pub fn has_secret(&self) -> bool {
        self.secret.is_some()
    }

    /// Validate `token` and return the identity it carries.
    pub fn resolve(&self, token: &str) -> Result<UserIdentity, SyncError> {
        if token.is_empty() {
            return Err(SyncError::MissingCredential);
        }

        let now = Utc::now().timestamp() as usize;
        if let Some((identity, exp)) = self.cache.get(token) {
            if exp > now {
                return Ok(identity);
            }
            debug!("Cached identity for {} expired", identity.user_id);
            self.cache.invalidate(token);
        }

        let secret = self
            .secret
            .as_deref()
            .ok_or_else(|| SyncError::Unauthorized("no JWT secret configured".to_string()))?;
        let token_data = validate_jwt(token, secret)
            .map_err(|e| SyncError::Unauthorized(format!("JWT validation failed: {}", e)))?;

        let claims = token_data.claims;
        if claims.sub.is_empty() {
            return Err(SyncError::Unauthorized("JWT token has an empty 'sub' claim".to_string()));
        }
        info!("JWT token validated successfully for user: {}", claims.sub);

        let identity = UserIdentity {
            user_id: claims.sub,
            name: claims.name,
            email: claims.email,
        };
        self.cache.insert(token.to_string(), (identity.clone(), claims.exp));
        Ok(identity)
    }

    pub fn cached_identities(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }
}
